// src/duplicates/batch.rs
// =============================================================================
// The hourly tick that warms fingerprints a window at a time.
//
// A cursor (option `media_tracker_offset`) remembers where the previous tick
// stopped. Each tick hashes up to `limit` image attachments from there and
// moves the cursor forward by `limit`. Once a tick finds nothing left in its
// window, the cursor is deleted and the next tick starts over from zero.
// =============================================================================

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use super::collect_fingerprints;
use crate::site::{SiteContent, SiteState};

pub const OFFSET_OPTION: &str = "media_tracker_offset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchCursor {
    pub offset: usize,
}

impl BatchCursor {
    // An absent or unreadable option means "start from the beginning"
    pub fn load(state: &SiteState) -> Self {
        let offset = state
            .option(OFFSET_OPTION)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        BatchCursor { offset }
    }

    pub fn store(self, state: &mut SiteState) {
        state.set_option(OFFSET_OPTION, self.offset as u64);
    }

    pub fn reset(state: &mut SiteState) {
        state.delete_option(OFFSET_OPTION);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub offset: usize,
    pub selected: usize,
    pub hashed: usize,
    /// Cursor after the tick; None once it was reset
    pub next_offset: Option<usize>,
}

pub fn process_batch(site: &mut SiteContent, state: &mut SiteState, site_root: &Path, limit: usize) -> BatchReport {
    let cursor = BatchCursor::load(state);
    let pass = collect_fingerprints(site, site_root, cursor.offset, Some(limit));

    let next_offset = if pass.selected == 0 {
        BatchCursor::reset(state);
        None
    } else {
        let next = BatchCursor {
            offset: cursor.offset + limit,
        };
        next.store(state);
        Some(next.offset)
    };

    info!(
        offset = cursor.offset,
        selected = pass.selected,
        hashed = pass.hashed,
        next = ?next_offset,
        "hash batch processed"
    );

    BatchReport {
        offset: cursor.offset,
        selected: pass.selected,
        hashed: pass.hashed,
        next_offset,
    }
}
