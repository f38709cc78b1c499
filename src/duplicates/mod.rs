// src/duplicates/mod.rs
// =============================================================================
// Duplicate image detection.
//
// Submodules:
// - hash: the 8x8 average hash of one image
// - batch: the periodic tick that hashes the library a window at a time
//
// Fingerprints are computed lazily and stored on the attachment (meta
// `_media_tracker_hash`), so each file is decoded at most once. Grouping then
// only compares strings.
// =============================================================================

mod batch;
mod hash;

pub use batch::{process_batch, BatchReport};

use hash::fingerprint_file;

use html_escape::encode_double_quoted_attribute;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::site::{SiteContent, FINGERPRINT_META};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFingerprint {
    pub attachment_id: u64,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: String,
    pub attachment_ids: Vec<u64>,
}

// Outcome of one pass over a window of image attachments
#[derive(Debug, Default)]
pub struct HashPass {
    /// Image attachments that fell inside the window
    pub selected: usize,
    /// Fingerprints computed (rather than read back) during this pass
    pub hashed: usize,
    pub fingerprints: Vec<ImageFingerprint>,
}

/// Fingerprints the image attachments in id order, skipping `offset` and
/// taking at most `limit` (all when None). Attachments whose file is missing
/// or cannot be decoded are left out.
pub fn collect_fingerprints(
    site: &mut SiteContent,
    site_root: &Path,
    offset: usize,
    limit: Option<usize>,
) -> HashPass {
    let mut ids: Vec<u64> = site.posts.iter().filter(|p| p.is_image()).map(|p| p.id).collect();
    ids.sort_unstable();

    let window: Vec<u64> = ids
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    let mut pass = HashPass {
        selected: window.len(),
        ..HashPass::default()
    };

    for id in window {
        let Some(post) = site.post_mut(id) else {
            continue;
        };
        let Some(file) = post.attached_file.as_deref() else {
            continue;
        };
        let path = site_root.join(file);
        if !path.exists() {
            debug!(id, path = %path.display(), "attachment file missing, skipping");
            continue;
        }

        let fingerprint = match post.meta.get(FINGERPRINT_META).filter(|h| !h.is_empty()) {
            Some(stored) => stored.clone(),
            None => match fingerprint_file(&path) {
                Ok(computed) => {
                    post.meta.insert(FINGERPRINT_META.to_string(), computed.clone());
                    pass.hashed += 1;
                    computed
                }
                Err(e) => {
                    warn!(id, error = %e, "could not hash image");
                    continue;
                }
            },
        };

        pass.fingerprints.push(ImageFingerprint {
            attachment_id: id,
            fingerprint,
        });
    }

    pass
}

/// Groups attachments sharing a fingerprint. Only groups with more than one
/// member are kept; groups come out ordered by fingerprint.
pub fn group_duplicates(fingerprints: &[ImageFingerprint]) -> Vec<DuplicateGroup> {
    let mut by_hash: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for entry in fingerprints {
        by_hash
            .entry(entry.fingerprint.as_str())
            .or_default()
            .push(entry.attachment_id);
    }

    by_hash
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(fingerprint, attachment_ids)| DuplicateGroup {
            fingerprint: fingerprint.to_string(),
            attachment_ids,
        })
        .collect()
}

// Media-library grid items for every duplicate, grouped members adjacent
pub fn render_fragment(site: &SiteContent, groups: &[DuplicateGroup], home_url: &str) -> String {
    let mut html = String::new();

    for id in groups.iter().flat_map(|group| &group.attachment_ids) {
        let Some(image) = site.post(*id) else {
            continue;
        };
        let title = encode_double_quoted_attribute(&image.title);
        let edit = format!("{}/wp-admin/post.php?post={}&action=edit", home_url, id);

        html.push_str(&format!(
            concat!(
                "<li tabindex=\"0\" role=\"checkbox\" aria-label=\"{title}\" aria-checked=\"false\" ",
                "data-id=\"{id}\" class=\"attachment save-ready\">",
                "<div class=\"attachment-preview js--select-attachment type-image\">",
                "<a href=\"{edit}\"><div class=\"thumbnail\"><div class=\"centered\">",
                "<img src=\"{src}\" alt=\"{title}\">",
                "</div></div></a></div></li>"
            ),
            title = title,
            id = id,
            edit = encode_double_quoted_attribute(&edit),
            src = encode_double_quoted_attribute(&image.guid),
        ));
    }

    debug!(bytes = html.len(), "rendered duplicate fragment");
    html
}

#[cfg(test)]
mod tests {
    use super::hash::tests::png;
    use super::*;
    use crate::site::{Post, ATTACHMENT_TYPE};
    use std::fs;

    pub(crate) fn image_post(id: u64, file: &str) -> Post {
        Post {
            id,
            post_type: ATTACHMENT_TYPE.to_string(),
            title: format!("Image {}", id),
            mime_type: Some("image/png".to_string()),
            attached_file: Some(file.to_string()),
            guid: format!("http://site.test/{}", file),
            ..Post::default()
        }
    }

    fn stripes(x: u32, _y: u32) -> [u8; 3] {
        if x % 4 < 2 {
            [250, 250, 250]
        } else {
            [10, 10, 10]
        }
    }

    #[test]
    fn test_three_shared_one_unique_makes_one_group() {
        let dir = tempfile::tempdir().unwrap();
        let shared = png(16, 16, stripes);
        for name in ["a.png", "b.png", "c.png"] {
            fs::write(dir.path().join(name), &shared).unwrap();
        }
        fs::write(
            dir.path().join("d.png"),
            png(16, 16, |_, y| if y < 8 { [255; 3] } else { [0; 3] }),
        )
        .unwrap();

        let mut site = SiteContent::default();
        site.posts = vec![
            image_post(4, "d.png"),
            image_post(1, "a.png"),
            image_post(2, "b.png"),
            image_post(3, "c.png"),
        ];

        let pass = collect_fingerprints(&mut site, dir.path(), 0, None);
        assert_eq!(pass.selected, 4);
        assert_eq!(pass.hashed, 4);

        let groups = group_duplicates(&pass.fingerprints);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].attachment_ids, vec![1, 2, 3]);
        assert_eq!(groups[0].fingerprint.len(), 64);
    }

    #[test]
    fn test_stored_fingerprint_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"corrupt").unwrap();

        let mut post = image_post(1, "a.png");
        post.meta.insert(FINGERPRINT_META.to_string(), "1".repeat(64));
        let mut site = SiteContent::default();
        site.posts.push(post);

        let pass = collect_fingerprints(&mut site, dir.path(), 0, None);
        assert_eq!(pass.hashed, 0);
        assert_eq!(pass.fingerprints[0].fingerprint, "1".repeat(64));
    }

    #[test]
    fn test_missing_and_broken_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.png"), b"not a png").unwrap();

        let mut site = SiteContent::default();
        site.posts = vec![image_post(1, "gone.png"), image_post(2, "bad.png")];

        let pass = collect_fingerprints(&mut site, dir.path(), 0, None);
        assert_eq!(pass.selected, 2);
        assert!(pass.fingerprints.is_empty());
        assert!(!site.post(2).unwrap().meta.contains_key(FINGERPRINT_META));
    }

    #[test]
    fn test_non_images_are_ignored() {
        let mut site = SiteContent::default();
        let mut pdf = image_post(1, "doc.pdf");
        pdf.mime_type = Some("application/pdf".to_string());
        site.posts = vec![pdf, Post { id: 2, ..Post::default() }];

        let pass = collect_fingerprints(&mut site, Path::new("/nonexistent"), 0, None);
        assert_eq!(pass.selected, 0);
    }

    #[test]
    fn test_render_fragment_escapes() {
        let mut site = SiteContent::default();
        let mut first = image_post(7, "x.png");
        first.title = "Cat \"big\" <1>".to_string();
        site.posts = vec![first, image_post(8, "y.png")];

        let groups = vec![DuplicateGroup {
            fingerprint: "0".repeat(64),
            attachment_ids: vec![7, 8],
        }];
        let html = render_fragment(&site, &groups, "http://site.test");

        assert_eq!(html.matches("<li ").count(), 2);
        assert!(html.contains("data-id=\"7\""));
        assert!(html.contains("aria-label=\"Cat &quot;big&quot;"));
        assert!(html.contains("post.php?post=8&amp;action=edit"));
        assert!(html.contains("src=\"http://site.test/y.png\""));
        assert!(html.find("data-id=\"7\"").unwrap() < html.find("data-id=\"8\"").unwrap());
    }
}
