// src/site/model.rs
// =============================================================================
// The records a site snapshot is made of.
//
// Posts, pages and attachments share one record type (Post), told apart by
// post_type, the same way the CMS stores them. Per-record key/value data
// (featured image id, page-builder JSON, our image fingerprint) lives in meta.
// =============================================================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const THUMBNAIL_META: &str = "_thumbnail_id";
pub const PAGE_BUILDER_META: &str = "_elementor_data";
pub const FINGERPRINT_META: &str = "_media_tracker_hash";

pub const ATTACHMENT_TYPE: &str = "attachment";
pub const PUBLISHED: &str = "publish";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: u64,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: u64,
    #[serde(default)]
    pub date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// File path of an attachment, relative to the site root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_file: Option<String>,
    /// Public URL of an attachment
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

fn default_post_type() -> String {
    "post".to_string()
}

fn default_status() -> String {
    PUBLISHED.to_string()
}

impl Default for Post {
    fn default() -> Self {
        Post {
            id: 0,
            post_type: default_post_type(),
            title: String::new(),
            status: default_status(),
            content: String::new(),
            author: 0,
            date: NaiveDateTime::default(),
            mime_type: None,
            attached_file: None,
            guid: String::new(),
            meta: BTreeMap::new(),
        }
    }
}

impl Post {
    pub fn is_attachment(&self) -> bool {
        self.post_type == ATTACHMENT_TYPE
    }

    pub fn is_image(&self) -> bool {
        self.is_attachment()
            && self
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.starts_with("image/"))
    }

    pub fn is_published(&self) -> bool {
        self.status == PUBLISHED
    }

    pub fn page_builder_data(&self) -> Option<&str> {
        self.meta
            .get(PAGE_BUILDER_META)
            .map(String::as_str)
            .filter(|data| !data.is_empty())
    }

    pub fn thumbnail_id(&self) -> Option<u64> {
        self.meta.get(THUMBNAIL_META)?.trim().parse().ok()
    }
}

// A widget id looks like "text-2": instance 2 of the "text" widget type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetId<'a> {
    pub widget_type: &'a str,
    pub number: u64,
}

impl<'a> WidgetId<'a> {
    pub fn parse(id: &'a str) -> Option<Self> {
        let (widget_type, number) = id.rsplit_once('-')?;
        if widget_type.is_empty() || number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(WidgetId {
            widget_type,
            number: number.parse().ok()?,
        })
    }
}

pub type WidgetInstance = Map<String, Value>;

// Everything the site itself owns. Our own bookkeeping lives in SiteState.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteContent {
    #[serde(default)]
    pub posts: Vec<Post>,
    /// Post types that are publicly queryable (and therefore scanned)
    #[serde(default = "default_public_types")]
    pub public_post_types: Vec<String>,
    /// Sidebar id -> widget ids placed in it
    #[serde(default)]
    pub sidebars: BTreeMap<String, Vec<String>>,
    /// Widget type -> instance number -> settings
    #[serde(default)]
    pub widgets: BTreeMap<String, BTreeMap<u64, WidgetInstance>>,
    /// Theme customizer values
    #[serde(default)]
    pub theme_mods: Map<String, Value>,
    /// User id -> display name
    #[serde(default)]
    pub users: BTreeMap<u64, String>,
}

fn default_public_types() -> Vec<String> {
    vec!["post".to_string(), "page".to_string()]
}

impl Default for SiteContent {
    fn default() -> Self {
        SiteContent {
            posts: Vec::new(),
            public_post_types: default_public_types(),
            sidebars: BTreeMap::new(),
            widgets: BTreeMap::new(),
            theme_mods: Map::new(),
            users: BTreeMap::new(),
        }
    }
}

impl SiteContent {
    pub fn post(&self, id: u64) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn post_mut(&mut self, id: u64) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| post.id == id)
    }

    pub fn widget(&self, id: &WidgetId<'_>) -> Option<&WidgetInstance> {
        self.widgets.get(id.widget_type)?.get(&id.number)
    }

    pub fn widget_mut(&mut self, id: &WidgetId<'_>) -> Option<&mut WidgetInstance> {
        self.widgets.get_mut(id.widget_type)?.get_mut(&id.number)
    }

    pub fn author_name(&self, author: u64) -> String {
        self.users
            .get(&author)
            .cloned()
            .unwrap_or_else(|| format!("user #{}", author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_id_parse() {
        let id = WidgetId::parse("media_image-12").unwrap();
        assert_eq!(id.widget_type, "media_image");
        assert_eq!(id.number, 12);

        let dashed = WidgetId::parse("custom-html-3").unwrap();
        assert_eq!(dashed.widget_type, "custom-html");
        assert_eq!(dashed.number, 3);

        assert!(WidgetId::parse("search").is_none());
        assert!(WidgetId::parse("text-").is_none());
        assert!(WidgetId::parse("text-2a").is_none());
    }

    #[test]
    fn test_post_defaults_from_json() {
        let post: Post = serde_json::from_str(r#"{"id": 7, "title": "Hello"}"#).unwrap();
        assert_eq!(post.post_type, "post");
        assert!(post.is_published());
        assert!(!post.is_image());
    }

    #[test]
    fn test_image_attachment() {
        let post = Post {
            id: 1,
            post_type: ATTACHMENT_TYPE.to_string(),
            mime_type: Some("image/png".to_string()),
            ..Post::default()
        };
        assert!(post.is_image());

        let pdf = Post {
            mime_type: Some("application/pdf".to_string()),
            ..post
        };
        assert!(!pdf.is_image());
    }
}
