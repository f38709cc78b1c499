// src/config.rs
// =============================================================================
// Runtime settings.
//
// Sources, lowest priority first:
// 1. Built-in defaults (one-hour cache, 5 second probes, 300-image batches)
// 2. MediaTracker.toml in the working directory, or the file given by --config
// 3. MEDIA_TRACKER_* environment variables (e.g. MEDIA_TRACKER_HOME_URL)
// 4. --home-url / --site-root flags
// =============================================================================

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Public origin of the site; URLs under it are checked on disk
    pub home_url: String,
    /// Directory the origin maps to (the document root)
    pub site_root: PathBuf,
    pub probe_timeout_secs: u64,
    pub cache_ttl_secs: i64,
    pub batch_size: usize,
    pub per_page: usize,
    /// Probe window; results keep source order whatever the value
    pub max_concurrent_checks: usize,
    pub nonce_salt: String,
}

// Overrides coming from the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub home_url: Option<String>,
    pub site_root: Option<String>,
}

pub fn load_settings(config_path: Option<&Path>, overrides: Overrides) -> Result<Settings> {
    let file_source = match config_path {
        Some(path) => File::from(path).required(true),
        None => File::with_name("MediaTracker").required(false),
    };

    let settings = Config::builder()
        .set_default("home_url", "http://localhost")?
        .set_default("site_root", ".")?
        .set_default("probe_timeout_secs", 5_i64)?
        .set_default("cache_ttl_secs", 3600_i64)?
        .set_default("batch_size", 300_i64)?
        .set_default("per_page", 20_i64)?
        .set_default("max_concurrent_checks", 1_i64)?
        .set_default("nonce_salt", "media-tracker")?
        .add_source(file_source)
        .add_source(Environment::with_prefix("MEDIA_TRACKER"))
        .set_override_option("home_url", overrides.home_url)?
        .set_override_option("site_root", overrides.site_root)?
        .build()?;

    let mut settings: Settings = settings.try_deserialize()?;
    // "http://site/" and "http://site" must behave the same
    settings.home_url = settings.home_url.trim_end_matches('/').to_string();
    Ok(settings)
}
