// src/scan/sources.rs
// =============================================================================
// The content enumerator: walks every public content store of the site and
// yields one text blob per item, tagged with where it came from.
//
// Stores walked, in this order:
// 1. Published items of every public post type (post content)
// 2. Widgets placed in any sidebar (all string settings joined)
// 3. Theme customizer values that are strings (header/footer markup)
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::site::{SiteContent, WidgetId};

// Where a blob came from. Post types beyond post/page keep their own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentKind {
    Post,
    Page,
    Header,
    Footer,
    Widget,
    Other(String),
}

impl ContentKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Page => "page",
            ContentKind::Header => "header",
            ContentKind::Footer => "footer",
            ContentKind::Widget => "widget",
            ContentKind::Other(name) => name,
        }
    }

    // Theme mods are split by key name; anything not mentioning "header"
    // is filed under footer
    pub fn for_theme_mod(key: &str) -> Self {
        if key.contains("header") {
            ContentKind::Header
        } else {
            ContentKind::Footer
        }
    }
}

impl From<String> for ContentKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "post" => ContentKind::Post,
            "page" => ContentKind::Page,
            "header" => ContentKind::Header,
            "footer" => ContentKind::Footer,
            "widget" => ContentKind::Widget,
            _ => ContentKind::Other(value),
        }
    }
}

impl From<ContentKind> for String {
    fn from(kind: ContentKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentSource {
    /// Post id, widget id ("text-2") or theme mod key
    pub id: String,
    pub title: String,
    pub kind: ContentKind,
    pub body: String,
}

pub fn enumerate_sources(site: &SiteContent) -> Vec<ContentSource> {
    let mut sources = post_sources(site);
    sources.extend(widget_sources(site));
    sources.extend(theme_mod_sources(site));
    sources
}

fn post_sources(site: &SiteContent) -> Vec<ContentSource> {
    let mut sources = Vec::new();

    for post_type in &site.public_post_types {
        let kind = ContentKind::from(post_type.clone());
        for post in site
            .posts
            .iter()
            .filter(|post| &post.post_type == post_type && post.is_published())
        {
            sources.push(ContentSource {
                id: post.id.to_string(),
                title: post.title.clone(),
                kind: kind.clone(),
                body: post.content.clone(),
            });
        }
    }

    sources
}

fn widget_sources(site: &SiteContent) -> Vec<ContentSource> {
    let mut sources = Vec::new();

    for widget_ids in site.sidebars.values() {
        for widget_id in widget_ids {
            let Some(id) = WidgetId::parse(widget_id) else {
                continue;
            };
            let Some(instance) = site.widget(&id) else {
                continue;
            };

            let body: String = instance
                .values()
                .filter_map(|value| value.as_str())
                .map(|text| format!(" {}", text))
                .collect();

            sources.push(ContentSource {
                id: widget_id.clone(),
                title: format!("Widget: {}", id.widget_type),
                kind: ContentKind::Widget,
                body,
            });
        }
    }

    sources
}

fn theme_mod_sources(site: &SiteContent) -> Vec<ContentSource> {
    site.theme_mods
        .iter()
        .filter_map(|(key, value)| {
            value.as_str().map(|text| ContentSource {
                id: key.clone(),
                title: format!("Theme Mod: {}", key),
                kind: ContentKind::for_theme_mod(key),
                body: text.to_string(),
            })
        })
        .collect()
}
