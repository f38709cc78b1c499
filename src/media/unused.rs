// src/media/unused.rs
// =============================================================================
// Attachments nothing on the site refers to, and deleting them.
//
// An attachment counts as used when any post:
// - names it as featured image (`_thumbnail_id` meta)
// - embeds it in content with the `wp-image-<id>` class the editor adds
// - references it from page-builder JSON under a key named "id"
// Everything else is listed, newest upload first.
// =============================================================================

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cache::Transients;
use crate::paging::{paginate, Page};
use crate::rewrite::numeric_ids;
use crate::site::SiteContent;

pub const DELETE_MESSAGE_KEY: &str = "unused_media_delete_message";
const DELETE_MESSAGE_TTL_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnusedMedia {
    pub id: u64,
    pub title: String,
    pub file_name: String,
    pub author: String,
    /// None when the file is gone from disk
    pub file_size: Option<u64>,
    pub uploaded: NaiveDateTime,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct UnusedFilter {
    pub author: Option<u64>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
}

pub fn used_attachment_ids(site: &SiteContent) -> BTreeSet<u64> {
    let mut used = BTreeSet::new();

    for post in &site.posts {
        if let Some(id) = post.thumbnail_id() {
            used.insert(id);
        }

        used.extend(wp_image_ids(&post.content));

        if let Some(data) = post.page_builder_data() {
            match serde_json::from_str::<Value>(data) {
                Ok(value) => used.extend(numeric_ids(&value)),
                Err(e) => debug!(post = post.id, error = %e, "ignoring unreadable page-builder data"),
            }
        }
    }

    used
}

// Every number following "wp-image-" in the content
fn wp_image_ids(content: &str) -> impl Iterator<Item = u64> + '_ {
    content.match_indices("wp-image-").filter_map(|(at, marker)| {
        let digits: String = content[at + marker.len()..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    })
}

pub fn find_unused(
    site: &SiteContent,
    site_root: &Path,
    filter: &UnusedFilter,
    page: usize,
    per_page: usize,
) -> Page<UnusedMedia> {
    let used = used_attachment_ids(site);
    let needle = filter.search.as_deref().map(str::to_lowercase);

    let mut unused: Vec<UnusedMedia> = site
        .posts
        .iter()
        .filter(|post| post.is_attachment() && !used.contains(&post.id))
        .filter(|post| filter.author.map_or(true, |author| post.author == author))
        .filter(|post| {
            needle
                .as_deref()
                .map_or(true, |needle| post.title.to_lowercase().contains(needle))
        })
        .map(|post| {
            let file = post.attached_file.as_deref().unwrap_or_default();
            let file_size = (!file.is_empty())
                .then(|| fs::metadata(site_root.join(file)).ok())
                .flatten()
                .map(|meta| meta.len());

            UnusedMedia {
                id: post.id,
                title: post.title.clone(),
                file_name: file.rsplit('/').next().unwrap_or(file).to_string(),
                author: site.author_name(post.author),
                file_size,
                uploaded: post.date,
                url: post.guid.clone(),
            }
        })
        .collect();

    // Newest first; id breaks ties so the order is stable
    unused.sort_by(|a, b| b.uploaded.cmp(&a.uploaded).then(b.id.cmp(&a.id)));

    paginate(unused, page, per_page)
}

/// Removes the given attachments and their files. Ids that are not
/// attachments are ignored. Returns how many were deleted and leaves a
/// one-shot message for the next listing.
pub fn delete_unused(
    site: &mut SiteContent,
    transients: &mut Transients,
    site_root: &Path,
    ids: &[u64],
    now: DateTime<Utc>,
) -> usize {
    let mut deleted = 0;

    for &id in ids {
        let Some(index) = site.posts.iter().position(|p| p.id == id && p.is_attachment()) else {
            warn!(id, "not an attachment, skipping delete");
            continue;
        };
        let post = site.posts.remove(index);

        if let Some(file) = post.attached_file.as_deref() {
            match fs::remove_file(site_root.join(file)) {
                Ok(()) => debug!(id, file, "removed media file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(id, file, error = %e, "could not remove media file"),
            }
        }
        deleted += 1;
    }

    if deleted > 0 {
        let message = format!("{} media file(s) deleted successfully.", deleted);
        transients.set(
            DELETE_MESSAGE_KEY,
            Value::from(message),
            Some(Duration::seconds(DELETE_MESSAGE_TTL_SECS)),
            now,
        );
    }

    info!(requested = ids.len(), deleted, "deleted unused media");
    deleted
}

// Shown once: reading the message clears it
pub fn take_delete_message(transients: &mut Transients, now: DateTime<Utc>) -> Option<String> {
    let message = transients.get(DELETE_MESSAGE_KEY, now)?;
    transients.delete(DELETE_MESSAGE_KEY);
    message.as_str().map(str::to_string)
}

// Human-readable size with binary units, e.g. "12 KB"
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    format!("{} {}", (bytes as f64 / scale as f64).round(), UNITS[unit])
}
