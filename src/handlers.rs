// src/handlers.rs
// =============================================================================
// Nonce-protected requests.
//
// Each handler checks its nonce before touching anything. The two
// admin-screen requests answer with the `{"success": bool, "data": ...}`
// envelope the admin JavaScript expects; the form submissions return a
// typed Result instead.
// =============================================================================

use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};

use crate::cache::Clock;
use crate::duplicates::{collect_fingerprints, group_duplicates, render_fragment};
use crate::error::{Result, TrackerError};
use crate::media::delete_unused;
use crate::nonce::NonceGuard;
use crate::rewrite::{replace_link, LinkTarget};
use crate::scan::SCAN_CACHE_KEY;
use crate::site::{SiteContent, SiteState};

pub const CLEAR_CACHE_ACTION: &str = "clear_broken_links_transient_nonce";
pub const DUPLICATES_ACTION: &str = "media_tracker_nonce";
pub const REPLACE_LINK_ACTION: &str = "replace_broken_link";
pub const BULK_DELETE_ACTION: &str = "bulk-media";

const REJECTED_MESSAGE: &str = "Security check failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AjaxResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl AjaxResponse {
    pub fn success(data: impl Into<Value>) -> Self {
        AjaxResponse {
            success: true,
            data: data.into(),
        }
    }

    pub fn error(data: impl Into<Value>) -> Self {
        AjaxResponse {
            success: false,
            data: data.into(),
        }
    }

    fn rejected() -> Self {
        AjaxResponse::error(REJECTED_MESSAGE)
    }

    pub fn is_rejection(&self) -> bool {
        !self.success && self.data == REJECTED_MESSAGE
    }
}

pub fn clear_cached_scan<C: Clock>(state: &mut SiteState, guard: &NonceGuard<'_, C>, nonce: &str) -> AjaxResponse {
    if !guard.is_valid(CLEAR_CACHE_ACTION, nonce) {
        warn!("clear-cache request with a bad nonce");
        return AjaxResponse::rejected();
    }

    if state.transients.delete(SCAN_CACHE_KEY) {
        info!("cleared cached scan");
        AjaxResponse::success("Transient cleared successfully.")
    } else {
        AjaxResponse::error("Failed to clear transient.")
    }
}

/// Hashes any image not yet fingerprinted, then renders every duplicate as a
/// media-grid item. Fails when no two images share a fingerprint.
pub fn fetch_duplicate_images<C: Clock>(
    site: &mut SiteContent,
    guard: &NonceGuard<'_, C>,
    nonce: &str,
    site_root: &Path,
    home_url: &str,
) -> AjaxResponse {
    if !guard.is_valid(DUPLICATES_ACTION, nonce) {
        warn!("duplicate lookup with a bad nonce");
        return AjaxResponse::rejected();
    }

    let pass = collect_fingerprints(site, site_root, 0, None);
    let groups = group_duplicates(&pass.fingerprints);
    if groups.is_empty() {
        return AjaxResponse::error(Value::Null);
    }

    let html = render_fragment(site, &groups, home_url);
    AjaxResponse::success(json!({ "html": html }))
}

/// Swaps `old` for `new` in one content source and drops the cached scan so
/// the next listing reflects the change. Fails when `old` appears nowhere in
/// the source, leaving the cached scan alone.
pub fn replace_broken_link<C: Clock>(
    site: &mut SiteContent,
    state: &mut SiteState,
    guard: &NonceGuard<'_, C>,
    nonce: &str,
    target: &LinkTarget,
    old: &str,
    new: &str,
) -> Result<usize> {
    guard.verify(REPLACE_LINK_ACTION, nonce)?;

    let changed = replace_link(site, target, old, new)?;
    if changed == 0 {
        warn!(source = %target.source_id, url = old, "nothing to replace");
        return Err(TrackerError::UrlNotFound {
            url: old.to_string(),
            source_id: target.source_id.clone(),
        });
    }

    state.transients.delete(SCAN_CACHE_KEY);
    Ok(changed)
}

pub fn bulk_delete_media<C: Clock>(
    site: &mut SiteContent,
    state: &mut SiteState,
    guard: &NonceGuard<'_, C>,
    nonce: &str,
    site_root: &Path,
    ids: &[u64],
    clock: &C,
) -> Result<usize> {
    guard.verify(BULK_DELETE_ACTION, nonce)?;
    Ok(delete_unused(site, &mut state.transients, site_root, ids, clock.now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::ManualClock;
    use crate::checker::LivenessChecker;
    use crate::scan::{scan_site, ContentKind};
    use crate::site::{Post, ATTACHMENT_TYPE};
    use chrono::Duration;

    #[test]
    fn test_clear_cached_scan() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let mut state = SiteState::default();
        state
            .transients
            .set(SCAN_CACHE_KEY, json!([]), Some(Duration::hours(1)), clock.now());

        let bad = clear_cached_scan(&mut state, &guard, "nope");
        assert_eq!(bad, AjaxResponse::error("Security check failed"));
        assert!(bad.is_rejection());
        assert!(state.transients.contains(SCAN_CACHE_KEY));

        let nonce = guard.create(CLEAR_CACHE_ACTION);
        assert_eq!(
            clear_cached_scan(&mut state, &guard, &nonce),
            AjaxResponse::success("Transient cleared successfully.")
        );
        assert_eq!(
            clear_cached_scan(&mut state, &guard, &nonce),
            AjaxResponse::error("Failed to clear transient.")
        );
    }

    #[test]
    fn test_response_envelope() {
        let json = serde_json::to_value(AjaxResponse::success(json!({"html": "<li></li>"}))).unwrap();
        assert_eq!(json, json!({"success": true, "data": {"html": "<li></li>"}}));

        let json = serde_json::to_value(AjaxResponse::error(Value::Null)).unwrap();
        assert_eq!(json, json!({"success": false}));
    }

    #[test]
    fn test_fetch_duplicates_without_images_fails() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let nonce = guard.create(DUPLICATES_ACTION);
        let mut site = SiteContent::default();
        let dir = tempfile::tempdir().unwrap();

        let response = fetch_duplicate_images(&mut site, &guard, &nonce, dir.path(), "http://site.test");
        assert!(!response.success);

        let other = guard.create(CLEAR_CACHE_ACTION);
        let response = fetch_duplicate_images(&mut site, &guard, &other, dir.path(), "http://site.test");
        assert_eq!(response.data, "Security check failed");
    }

    #[test]
    fn test_fetch_duplicates_renders_stored_fingerprints() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let dir = tempfile::tempdir().unwrap();

        let mut site = SiteContent::default();
        for id in [3, 5] {
            let file = format!("{}.png", id);
            std::fs::write(dir.path().join(&file), b"unread").unwrap();
            let mut post = Post {
                id,
                post_type: ATTACHMENT_TYPE.into(),
                mime_type: Some("image/png".into()),
                attached_file: Some(file),
                ..Post::default()
            };
            post.meta
                .insert(crate::site::FINGERPRINT_META.into(), "01".repeat(32));
            site.posts.push(post);
        }

        let nonce = guard.create(DUPLICATES_ACTION);
        let response = fetch_duplicate_images(&mut site, &guard, &nonce, dir.path(), "http://site.test");
        assert!(response.success);
        let html = response.data["html"].as_str().unwrap();
        assert!(html.contains("data-id=\"3\"") && html.contains("data-id=\"5\""));
    }

    #[test]
    fn test_replace_invalidates_cache() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let mut site = SiteContent::default();
        site.posts.push(Post {
            id: 1,
            content: r#"<a href="http://old.test">x</a>"#.into(),
            ..Post::default()
        });
        let mut state = SiteState::default();
        state
            .transients
            .set(SCAN_CACHE_KEY, json!([]), Some(Duration::hours(1)), clock.now());
        let target = LinkTarget {
            source_id: "1".into(),
            kind: ContentKind::Post,
        };

        let refused = replace_broken_link(&mut site, &mut state, &guard, "bad", &target, "http://old.test", "x");
        assert!(matches!(refused, Err(TrackerError::InvalidNonce)));
        assert!(state.transients.contains(SCAN_CACHE_KEY));

        let nonce = guard.create(REPLACE_LINK_ACTION);
        let changed =
            replace_broken_link(&mut site, &mut state, &guard, &nonce, &target, "http://old.test", "http://new.test")
                .unwrap();
        assert_eq!(changed, 1);
        assert!(!state.transients.contains(SCAN_CACHE_KEY));
        assert!(site.posts[0].content.contains("http://new.test"));
    }

    #[test]
    fn test_replace_rejects_missing_and_empty_urls() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let nonce = guard.create(REPLACE_LINK_ACTION);
        let mut site = SiteContent::default();
        site.posts.push(Post {
            id: 1,
            content: "<p>nothing linked</p>".into(),
            ..Post::default()
        });
        let mut state = SiteState::default();
        state
            .transients
            .set(SCAN_CACHE_KEY, json!([]), Some(Duration::hours(1)), clock.now());
        let target = LinkTarget {
            source_id: "1".into(),
            kind: ContentKind::Post,
        };

        let missing = replace_broken_link(&mut site, &mut state, &guard, &nonce, &target, "http://old.test", "x");
        assert!(matches!(missing, Err(TrackerError::UrlNotFound { .. })));
        assert!(state.transients.contains(SCAN_CACHE_KEY));

        let empty = replace_broken_link(&mut site, &mut state, &guard, &nonce, &target, "", "x");
        assert!(matches!(empty, Err(TrackerError::EmptyUrl)));
        assert_eq!(site.posts[0].content, "<p>nothing linked</p>");
    }

    #[tokio::test]
    async fn test_scanned_url_with_entities_can_be_replaced() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let dir = tempfile::tempdir().unwrap();
        let checker =
            LivenessChecker::new("http://site.test", dir.path(), std::time::Duration::from_secs(5)).unwrap();

        let mut site = SiteContent::default();
        site.posts.push(Post {
            id: 2,
            title: "Downloads".into(),
            content: r#"<a href="http://site.test/gone.php?a=1&amp;b=2">get</a>"#.into(),
            ..Post::default()
        });
        let mut state = SiteState::default();

        let broken = scan_site(&site, &checker, 4).await;
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].url, "http://site.test/gone.php?a=1&amp;b=2");

        let target = LinkTarget {
            source_id: broken[0].source_id.clone(),
            kind: broken[0].content_kind.clone(),
        };
        let nonce = guard.create(REPLACE_LINK_ACTION);
        let changed = replace_broken_link(
            &mut site,
            &mut state,
            &guard,
            &nonce,
            &target,
            &broken[0].url,
            "http://site.test/here.php",
        )
        .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(site.posts[0].content, r#"<a href="http://site.test/here.php">get</a>"#);
        assert!(scan_site(&site, &checker, 4).await.iter().all(|e| e.url != broken[0].url));
    }

    #[test]
    fn test_bulk_delete_needs_nonce() {
        let clock = ManualClock::new();
        let guard = NonceGuard::new("salt", &clock);
        let dir = tempfile::tempdir().unwrap();
        let mut site = SiteContent::default();
        site.posts.push(Post {
            id: 9,
            post_type: ATTACHMENT_TYPE.into(),
            ..Post::default()
        });
        let mut state = SiteState::default();

        let refused = bulk_delete_media(&mut site, &mut state, &guard, "x", dir.path(), &[9], &clock);
        assert!(refused.is_err());
        assert_eq!(site.posts.len(), 1);

        let nonce = guard.create(BULK_DELETE_ACTION);
        let deleted = bulk_delete_media(&mut site, &mut state, &guard, &nonce, dir.path(), &[9], &clock).unwrap();
        assert_eq!(deleted, 1);
        assert!(site.posts.is_empty());
    }
}
