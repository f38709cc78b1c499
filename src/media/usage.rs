// src/media/usage.rs
// =============================================================================
// Where a single attachment is used: the published posts that feature it,
// reference it from page-builder data, or carry it in a block's attributes.
// =============================================================================

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::rewrite::numeric_ids;
use crate::site::{Post, SiteContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    FeaturedImage,
    PageBuilder,
    BlockAttribute,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaUsage {
    pub post_id: u64,
    pub title: String,
    pub post_type: String,
    pub date: NaiveDateTime,
    pub source: UsageSource,
}

impl MediaUsage {
    fn new(post: &Post, source: UsageSource) -> Self {
        MediaUsage {
            post_id: post.id,
            title: post.title.clone(),
            post_type: post.post_type.clone(),
            date: post.date,
            source,
        }
    }
}

// A post appears once, under the first source that matched it
pub fn find_usage(site: &SiteContent, attachment_id: u64) -> Vec<MediaUsage> {
    let published: Vec<&Post> = site.posts.iter().filter(|p| p.is_published()).collect();
    let mut seen = BTreeSet::new();
    let mut usages = Vec::new();

    let sources = [
        UsageSource::FeaturedImage,
        UsageSource::PageBuilder,
        UsageSource::BlockAttribute,
    ];

    for source in sources {
        for post in published.iter().filter(|post| uses(post, source, attachment_id)) {
            if seen.insert(post.id) {
                usages.push(MediaUsage::new(post, source));
            }
        }
    }

    usages
}

fn uses(post: &Post, source: UsageSource, attachment_id: u64) -> bool {
    match source {
        UsageSource::FeaturedImage => post.thumbnail_id() == Some(attachment_id),
        UsageSource::PageBuilder => post
            .page_builder_data()
            .and_then(|data| serde_json::from_str::<Value>(data).ok())
            .is_some_and(|value| numeric_ids(&value).contains(&attachment_id)),
        UsageSource::BlockAttribute => references_id(&post.content, attachment_id),
    }
}

// True when the content holds `"id":<id>` with nothing more to the number
fn references_id(content: &str, id: u64) -> bool {
    let needle = format!("\"id\":{}", id);
    content.match_indices(&needle).any(|(at, _)| {
        !content[at + needle.len()..].starts_with(|c: char| c.is_ascii_digit())
    })
}
