// src/site/mod.rs
// =============================================================================
// The site snapshot: content records plus the state this tool persists.
//
// Submodules:
// - model: posts/attachments, widgets, theme mods, users
// - store: reading and writing the snapshot file
// =============================================================================

mod model;
mod store;

pub use model::{
    Post, SiteContent, WidgetId, WidgetInstance, ATTACHMENT_TYPE, FINGERPRINT_META, PAGE_BUILDER_META,
    THUMBNAIL_META,
};
pub use store::{SiteState, SiteStore};
