// src/cli.rs
// =============================================================================
// The command-line interface, declared with clap's derive API.
//
// Every subcommand works on one site snapshot (--site, default site.json):
// it loads the snapshot, performs one request against it, and saves the
// snapshot back (content changes, cached scan, cursor, messages).
//
// Commands that stand in for a nonce-protected admin request take --nonce.
// Without it, a fresh nonce for the right action is minted, which is what an
// operator at the terminal wants; scripts can pass one from `nonce`.
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "media-tracker",
    version,
    about = "Find broken links, duplicate images and unused media in a site snapshot",
    long_about = "media-tracker scans a site snapshot for broken links and images, spots duplicate \
                  images by perceptual hash, lists media nothing uses, and rewrites URLs in place."
)]
pub struct Cli {
    /// Site snapshot to work on
    #[arg(long, global = true, default_value = "site.json")]
    pub site: PathBuf,

    /// Settings file (defaults to MediaTracker.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Public origin of the site, e.g. https://blog.example
    #[arg(long, global = true)]
    pub home_url: Option<String>,

    /// Directory the site origin is served from
    #[arg(long, global = true)]
    pub site_root: Option<String>,

    /// Output results in JSON format instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record install time and version; creates an empty snapshot if missing
    Install,

    /// List broken links and images (cached for an hour)
    ///
    /// Example: media-tracker scan --page 2
    Scan {
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Drop the cached result and scan again
        #[arg(long)]
        refresh: bool,
    },

    /// Replace a broken URL inside one content source
    ///
    /// Example: media-tracker replace-link 42 post http://old/a.png http://new/a.png
    ReplaceLink {
        /// Post id, widget id (text-2) or theme-mod key, as listed by `scan`
        source_id: String,

        /// Content kind as listed by `scan` (post, page, header, footer, widget, ...)
        kind: String,

        old_url: String,

        new_url: String,

        #[arg(long)]
        nonce: Option<String>,
    },

    /// Delete the cached scan result
    ClearCache {
        #[arg(long)]
        nonce: Option<String>,
    },

    /// Run one tick of the background image hashing
    HashBatch {
        /// Images per tick (defaults to the batch_size setting)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Find images sharing a perceptual hash
    Duplicates {
        #[arg(long)]
        nonce: Option<String>,

        /// Print the media-grid HTML fragment instead of a table
        #[arg(long)]
        html: bool,
    },

    /// List media nothing on the site refers to
    ///
    /// Example: media-tracker unused --search logo --author 3
    Unused {
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Only media uploaded by this user id
        #[arg(long)]
        author: Option<u64>,

        /// Case-insensitive title filter
        #[arg(long)]
        search: Option<String>,
    },

    /// Permanently delete attachments and their files
    DeleteUnused {
        #[arg(required = true)]
        ids: Vec<u64>,

        #[arg(long)]
        nonce: Option<String>,
    },

    /// Show the published posts using one attachment
    Usage { attachment_id: u64 },

    /// Print a nonce for a request action (e.g. bulk-media)
    Nonce { action: String },
}
