// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - extract: pulls anchor and image URLs out of HTML blobs
// - http: decides whether one URL is broken (disk for local, network otherwise)
// =============================================================================

mod extract;
mod http;

pub use extract::{extract_images, extract_links};
pub use http::LivenessChecker;
