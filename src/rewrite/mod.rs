// src/rewrite/mod.rs
// =============================================================================
// The content rewriter: swaps one URL for another wherever a content source
// stores it.
//
// Submodules:
// - tree: generic walks over nested JSON values
// - blocks: parsing and re-serializing block markup
//
// What "wherever" means depends on the kind of source:
// - posts/pages/other types: post content (inline HTML and block attributes)
//   plus the page-builder JSON stored alongside the post
// - widgets: every string setting of the widget instance
// - header/footer: every string theme-mod value
// =============================================================================

mod blocks;
mod tree;

pub use tree::numeric_ids;

use blocks::{has_blocks, parse_blocks, serialize_blocks};
use tree::replace_in_value;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, TrackerError};
use crate::scan::ContentKind;
use crate::site::{SiteContent, WidgetId, PAGE_BUILDER_META};

/// Replaces every literal occurrence of `old` with `new`. When the content is
/// block markup, string values inside block attributes (at any depth, in any
/// nested block) are rewritten too, so URLs that only live in attributes are
/// not missed. Each piece of text is rewritten exactly once.
pub fn replace_url(content: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return content.to_string();
    }
    if !has_blocks(content) {
        return content.replace(old, new);
    }

    let mut parsed = parse_blocks(content);
    for block in &mut parsed {
        block.for_each_mut(&mut |block| {
            block.edit_attrs(|attrs| {
                attrs
                    .values_mut()
                    .map(|value| replace_in_value(value, old, new))
                    .sum()
            });
            for html in block.html_mut() {
                *html = html.replace(old, new);
            }
        });
    }
    serialize_blocks(&parsed)
}

/// Same replacement over a JSON document (page-builder data).
pub fn replace_url_in_json(data: &str, old: &str, new: &str) -> Result<String> {
    let mut value: Value = serde_json::from_str(data)?;
    replace_in_value(&mut value, old, new);
    Ok(serde_json::to_string(&value)?)
}

// Identifies the source a broken URL was found in
#[derive(Debug, Clone)]
pub struct LinkTarget {
    pub source_id: String,
    pub kind: ContentKind,
}

/// Rewrites `old` to `new` in the source named by `target`. Returns the
/// number of fields that changed.
pub fn replace_link(site: &mut SiteContent, target: &LinkTarget, old: &str, new: &str) -> Result<usize> {
    if old.is_empty() {
        return Err(TrackerError::EmptyUrl);
    }

    let changed = match &target.kind {
        ContentKind::Header | ContentKind::Footer => replace_in_theme_mods(site, old, new),
        ContentKind::Widget => replace_in_widget(site, &target.source_id, old, new)?,
        _ => replace_in_post(site, &target.source_id, old, new)?,
    };

    info!(
        source = %target.source_id,
        kind = %target.kind,
        changed,
        "replaced link"
    );
    Ok(changed)
}

fn replace_in_theme_mods(site: &mut SiteContent, old: &str, new: &str) -> usize {
    let mut changed = 0;
    for (key, value) in site.theme_mods.iter_mut() {
        if let Value::String(text) = value {
            if text.contains(old) {
                *text = text.replace(old, new);
                debug!(key = %key, "rewrote theme mod");
                changed += 1;
            }
        }
    }
    changed
}

fn replace_in_widget(site: &mut SiteContent, widget_id: &str, old: &str, new: &str) -> Result<usize> {
    let not_found = || TrackerError::NotFound {
        kind: "widget",
        id: widget_id.to_string(),
    };

    let id = WidgetId::parse(widget_id).ok_or_else(not_found)?;
    let instance = site.widget_mut(&id).ok_or_else(not_found)?;

    Ok(instance
        .values_mut()
        .map(|value| replace_in_value(value, old, new))
        .sum())
}

fn replace_in_post(site: &mut SiteContent, source_id: &str, old: &str, new: &str) -> Result<usize> {
    let not_found = || TrackerError::NotFound {
        kind: "post",
        id: source_id.to_string(),
    };

    let id: u64 = source_id.parse().map_err(|_| not_found())?;
    let post = site.post_mut(id).ok_or_else(not_found)?;

    let mut changed = 0;
    let content = replace_url(&post.content, old, new);
    if content != post.content {
        post.content = content;
        changed += 1;
    }

    if let Some(data) = post.page_builder_data() {
        match replace_url_in_json(data, old, new) {
            Ok(rewritten) if rewritten != data => {
                post.meta.insert(PAGE_BUILDER_META.to_string(), rewritten);
                changed += 1;
            }
            Ok(_) => {}
            Err(e) => warn!(post = id, error = %e, "leaving unreadable page-builder data as it is"),
        }
    }

    Ok(changed)
}
