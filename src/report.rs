// src/report.rs
// =============================================================================
// Printing command results, either as a terminal table or as JSON.
//
// Tables go to stdout with a short summary underneath. With --json the same
// data is printed as pretty JSON and nothing else, so it can be piped.
// =============================================================================

use anyhow::Result;
use serde::Serialize;

use crate::duplicates::{BatchReport, DuplicateGroup};
use crate::handlers::AjaxResponse;
use crate::media::{format_size, MediaUsage, UnusedMedia};
use crate::paging::Page;
use crate::scan::ScanResultEntry;
use crate::site::SiteContent;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// Cuts long cells so the columns stay aligned
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[derive(Serialize)]
struct BrokenLinkRow<'a> {
    #[serde(flatten)]
    entry: &'a ScanResultEntry,
    edit_link: String,
    view_link: String,
}

pub fn print_broken_links(page: &Page<ScanResultEntry>, home_url: &str, json: bool) -> Result<()> {
    if json {
        let rows: Vec<BrokenLinkRow<'_>> = page
            .items
            .iter()
            .map(|entry| BrokenLinkRow {
                entry,
                edit_link: entry.edit_link(home_url),
                view_link: entry.view_link(home_url),
            })
            .collect();
        return print_json(&Page {
            items: rows,
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        });
    }

    if page.total_items == 0 {
        println!("✅ No broken links found");
        return Ok(());
    }

    println!("{:<50} {:<7} {:<30} {:<8}", "URL", "TYPE", "SOURCE", "KIND");
    println!("{}", "=".repeat(98));

    for entry in &page.items {
        let link_kind = match entry.link_kind {
            crate::scan::LinkKind::Url => "link",
            crate::scan::LinkKind::Image => "image",
        };
        let source = format!("{} (#{})", entry.source_title, entry.source_id);
        println!(
            "{:<50} {:<7} {:<30} {:<8}",
            truncate(&entry.url, 50),
            link_kind,
            truncate(&source, 30),
            entry.content_kind
        );
        println!("   edit: {}", entry.edit_link(home_url));
    }

    println!();
    println!("📊 Summary:");
    println!("   ❌ Broken: {}", page.total_items);
    println!("   📄 Page {} of {}", page.page, page.total_pages.max(1));
    Ok(())
}

pub fn print_duplicates(site: &SiteContent, groups: &[DuplicateGroup], json: bool) -> Result<()> {
    if json {
        return print_json(groups);
    }

    if groups.is_empty() {
        println!("✅ No duplicate images found");
        return Ok(());
    }

    for group in groups {
        println!("🖼️  {}", group.fingerprint);
        for id in &group.attachment_ids {
            let title = site.post(*id).map(|p| p.title.as_str()).unwrap_or("");
            println!("   #{:<8} {}", id, truncate(title, 60));
        }
    }

    let images: usize = groups.iter().map(|g| g.attachment_ids.len()).sum();
    println!();
    println!("📊 Summary:");
    println!("   🔁 Groups: {}", groups.len());
    println!("   🖼️  Images: {}", images);
    Ok(())
}

pub fn print_unused(page: &Page<UnusedMedia>, message: Option<&str>, json: bool) -> Result<()> {
    if json {
        return print_json(page);
    }

    if let Some(message) = message {
        println!("ℹ️  {}", message);
    }

    if page.total_items == 0 {
        println!("✅ No unused media found");
        return Ok(());
    }

    println!("{:<8} {:<30} {:<25} {:<16} {:<10} {:<10}", "ID", "TITLE", "FILE", "AUTHOR", "SIZE", "UPLOADED");
    println!("{}", "=".repeat(104));

    for media in &page.items {
        let size = media.file_size.map(format_size).unwrap_or_else(|| "missing".to_string());
        println!(
            "{:<8} {:<30} {:<25} {:<16} {:<10} {:<10}",
            media.id,
            truncate(&media.title, 30),
            truncate(&media.file_name, 25),
            truncate(&media.author, 16),
            size,
            media.uploaded.format("%Y-%m-%d")
        );
    }

    println!();
    println!("📊 Summary:");
    println!("   🗑️  Unused: {}", page.total_items);
    println!("   📄 Page {} of {}", page.page, page.total_pages.max(1));
    Ok(())
}

pub fn print_usage(attachment_id: u64, usages: &[MediaUsage], json: bool) -> Result<()> {
    if json {
        return print_json(usages);
    }

    if usages.is_empty() {
        println!("Attachment #{} is not used by any published post", attachment_id);
        return Ok(());
    }

    println!("{:<8} {:<40} {:<10} {:<12} {:<16}", "ID", "TITLE", "TYPE", "DATE", "VIA");
    println!("{}", "=".repeat(90));
    for usage in usages {
        let via = match usage.source {
            crate::media::UsageSource::FeaturedImage => "featured image",
            crate::media::UsageSource::PageBuilder => "page builder",
            crate::media::UsageSource::BlockAttribute => "block",
        };
        println!(
            "{:<8} {:<40} {:<10} {:<12} {:<16}",
            usage.post_id,
            truncate(&usage.title, 40),
            usage.post_type,
            usage.date.format("%Y-%m-%d"),
            via
        );
    }
    Ok(())
}

pub fn print_batch(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!(
        "🔢 Hashed {} of {} image(s) starting at offset {}",
        report.hashed, report.selected, report.offset
    );
    match report.next_offset {
        Some(next) => println!("   ➡️  Next tick starts at {}", next),
        None => println!("   🔄 Reached the end, next tick starts over"),
    }
    Ok(())
}

pub fn print_response(response: &AjaxResponse, json: bool) -> Result<()> {
    if json {
        return print_json(response);
    }

    let icon = if response.success { "✅" } else { "❌" };
    match response.data.as_str() {
        Some(message) => println!("{} {}", icon, message),
        None if response.data.is_null() => println!("{}", icon),
        None => println!("{} {}", icon, response.data),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        // Multi-byte characters are never split
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
