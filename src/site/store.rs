// src/site/store.rs
// =============================================================================
// Loading and saving a site snapshot.
//
// On disk a snapshot is one JSON document:
//
//   {
//     "content": { "posts": [...], "sidebars": {...}, "widgets": {...}, ... },
//     "state":   { "options": {...}, "transients": {...} }
//   }
//
// `content` is what the site owns; `state` is what this tool persists between
// runs (batch cursor, cached scan, one-shot messages). Keeping them in two
// fields lets a command read content while it updates state.
// =============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::model::SiteContent;
use crate::cache::Transients;
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteState {
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub transients: Transients,
}

impl SiteState {
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    pub fn set_option(&mut self, name: &str, value: impl Into<Value>) {
        self.options.insert(name.to_string(), value.into());
    }

    pub fn delete_option(&mut self, name: &str) -> bool {
        self.options.remove(name).is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    content: SiteContent,
    #[serde(default)]
    state: SiteState,
}

#[derive(Debug)]
pub struct SiteStore {
    path: PathBuf,
    pub content: SiteContent,
    pub state: SiteState,
}

impl SiteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        debug!(
            path = %path.display(),
            posts = snapshot.content.posts.len(),
            "loaded site snapshot"
        );

        Ok(SiteStore {
            path: path.to_path_buf(),
            content: snapshot.content,
            state: snapshot.state,
        })
    }

    pub fn new(path: &Path, content: SiteContent) -> Self {
        SiteStore {
            path: path.to_path_buf(),
            content,
            state: SiteState::default(),
        }
    }

    // Writes to a sibling temp file first so a crash never leaves half a snapshot
    pub fn save(&self) -> Result<()> {
        let snapshot = SnapshotRef {
            content: &self.content,
            state: &self.state,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved site snapshot");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    content: &'a SiteContent,
    state: &'a SiteState,
}
