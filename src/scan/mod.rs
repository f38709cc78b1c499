// src/scan/mod.rs
// =============================================================================
// The broken-link scan: enumerate every content source, extract its anchors
// and images, probe each one, and keep the broken ones.
//
// A full scan can take a while (every remote URL is a network round trip), so
// the result set is kept in a transient under one fixed key for an hour and
// only recomputed when that entry expires or is cleared.
// =============================================================================

mod sources;

pub use sources::{enumerate_sources, ContentKind, ContentSource};

use chrono::Duration;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{Clock, ResultCache, Transients};
use crate::checker::{extract_images, extract_links, LivenessChecker};
use crate::error::Result;
use crate::site::SiteContent;

/// Transient key shared by every scan
pub const SCAN_CACHE_KEY: &str = "broken_links_scan_results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Url,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    Broken,
}

// One broken URL found in one content source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResultEntry {
    pub source_id: String,
    pub source_title: String,
    /// Exactly as written in the content
    pub url: String,
    pub link_kind: LinkKind,
    pub status: LinkStatus,
    pub content_kind: ContentKind,
}

impl ScanResultEntry {
    // Screen where the source can be edited
    pub fn edit_link(&self, home_url: &str) -> String {
        match self.content_kind {
            ContentKind::Header | ContentKind::Footer => format!("{}/wp-admin/customize.php", home_url),
            ContentKind::Widget => format!("{}/wp-admin/widgets.php", home_url),
            _ => format!("{}/wp-admin/post.php?post={}&action=edit", home_url, self.source_id),
        }
    }

    // Public page showing the source
    pub fn view_link(&self, home_url: &str) -> String {
        match self.content_kind {
            ContentKind::Header | ContentKind::Footer | ContentKind::Widget => format!("{}/", home_url),
            _ => format!("{}/?p={}", home_url, self.source_id),
        }
    }
}

// A URL waiting to be probed, with enough context to report it
struct Candidate<'a> {
    source: &'a ContentSource,
    url: String,
    kind: LinkKind,
}

impl Candidate<'_> {
    fn into_entry(self) -> ScanResultEntry {
        ScanResultEntry {
            source_id: self.source.id.clone(),
            source_title: self.source.title.clone(),
            url: self.url,
            link_kind: self.kind,
            status: LinkStatus::Broken,
            content_kind: self.source.kind.clone(),
        }
    }
}

fn candidates(source: &ContentSource) -> Vec<Candidate<'_>> {
    let links = extract_links(&source.body).into_iter().map(|url| Candidate {
        source,
        url,
        kind: LinkKind::Url,
    });
    let images = extract_images(&source.body).into_iter().map(|url| Candidate {
        source,
        url,
        kind: LinkKind::Image,
    });
    links.chain(images).collect()
}

// Probes every candidate of every source. Results come back in source order
// (anchors before images within a source); `window` only bounds how many
// probes may be in flight at once.
pub async fn scan_site(site: &SiteContent, checker: &LivenessChecker, window: usize) -> Vec<ScanResultEntry> {
    let sources = enumerate_sources(site);
    let candidates: Vec<Candidate<'_>> = sources.iter().flat_map(candidates).collect();

    info!(sources = sources.len(), urls = candidates.len(), "scanning for broken links");

    let probes = candidates.into_iter().map(|candidate| async move {
        let broken = match candidate.kind {
            LinkKind::Url => checker.is_broken(&candidate.url).await,
            LinkKind::Image => checker.is_broken_image(&candidate.url).await,
        };
        (candidate, broken)
    });

    let entries: Vec<ScanResultEntry> = stream::iter(probes)
        .buffered(window.max(1))
        .filter_map(|(candidate, broken)| async move { broken.then(|| candidate.into_entry()) })
        .collect()
        .await;

    info!(broken = entries.len(), "scan finished");
    entries
}

// The scan as the list screen sees it: served from the transient while it is
// fresh, recomputed and stored otherwise
pub async fn cached_scan<C: Clock>(
    site: &SiteContent,
    transients: &mut Transients,
    clock: &C,
    checker: &LivenessChecker,
    ttl: Duration,
    window: usize,
) -> Result<Vec<ScanResultEntry>> {
    let mut cache = ResultCache::new(transients, clock);
    cache
        .get_or_compute(SCAN_CACHE_KEY, ttl, || scan_site(site, checker, window))
        .await
}
