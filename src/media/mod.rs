// src/media/mod.rs
// =============================================================================
// Media library reports.
//
// Submodules:
// - unused: attachments nothing refers to, plus bulk deletion
// - usage: the published posts using one attachment
// =============================================================================

mod unused;
mod usage;

pub use unused::{delete_unused, find_unused, format_size, take_delete_message, UnusedFilter, UnusedMedia};
pub use usage::{find_usage, MediaUsage, UsageSource};
