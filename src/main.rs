// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap and set up logging
// 2. Load settings and open the site snapshot
// 3. Dispatch to the appropriate subcommand handler
// 4. Save the snapshot and exit with a proper code
//    (0 = clean, 1 = findings such as broken links or duplicates, 2 = error)
// =============================================================================

mod cache; // src/cache.rs - transients and the result cache
mod checker; // src/checker/ - link extraction and liveness checks
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - layered settings
mod duplicates; // src/duplicates/ - perceptual hashing and grouping
mod error; // src/error.rs - typed errors
mod handlers; // src/handlers.rs - nonce-protected requests
mod installer; // src/installer.rs - install/version bookkeeping
mod logging; // src/logging.rs - tracing setup
mod media; // src/media/ - unused media and media usage
mod nonce; // src/nonce.rs - request nonces
mod paging; // src/paging.rs - list pagination
mod report; // src/report.rs - tables and JSON output
mod rewrite; // src/rewrite/ - URL replacement in content
mod scan; // src/scan/ - the broken-link scan
mod site; // src/site/ - snapshot model and storage

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, info};

use cache::{Clock, ResultCache, SystemClock};
use checker::LivenessChecker;
use cli::{Cli, Commands};
use config::{load_settings, Overrides, Settings};
use handlers::AjaxResponse;
use nonce::NonceGuard;
use rewrite::LinkTarget;
use scan::{ContentKind, SCAN_CACHE_KEY};
use site::{SiteContent, SiteStore};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let overrides = Overrides {
        home_url: cli.home_url.clone(),
        site_root: cli.site_root.clone(),
    };
    let settings = load_settings(cli.config.as_deref(), overrides).context("failed to load settings")?;
    debug!(home_url = %settings.home_url, site_root = %settings.site_root.display(), "settings loaded");

    // `install` is the one command allowed to start from no snapshot at all
    let mut store = match cli.command {
        Commands::Install if !cli.site.exists() => {
            info!(path = %cli.site.display(), "creating empty snapshot");
            SiteStore::new(&cli.site, SiteContent::default())
        }
        _ => SiteStore::open(&cli.site).with_context(|| format!("failed to open snapshot {}", cli.site.display()))?,
    };

    let code = dispatch(cli.command, &mut store, &settings, cli.json).await?;

    store
        .save()
        .with_context(|| format!("failed to save snapshot {}", store.path().display()))?;
    Ok(code)
}

async fn dispatch(command: Commands, store: &mut SiteStore, settings: &Settings, json: bool) -> Result<i32> {
    let clock = SystemClock;
    let guard = NonceGuard::new(&settings.nonce_salt, &clock);

    let code = match command {
        Commands::Install => {
            installer::install(&mut store.state, clock.now());
            println!("✅ Installed into {}", store.path().display());
            0
        }
        Commands::Scan { page, refresh } => handle_scan(store, settings, page, refresh, json).await?,
        Commands::ReplaceLink {
            source_id,
            kind,
            old_url,
            new_url,
            nonce,
        } => {
            let nonce = nonce.unwrap_or_else(|| guard.create(handlers::REPLACE_LINK_ACTION));
            let target = LinkTarget {
                source_id,
                kind: ContentKind::from(kind),
            };
            let changed = handlers::replace_broken_link(
                &mut store.content,
                &mut store.state,
                &guard,
                &nonce,
                &target,
                &old_url,
                &new_url,
            )?;
            report::print_response(&AjaxResponse::success(format!("{} field(s) updated", changed)), json)?;
            0
        }
        Commands::ClearCache { nonce } => {
            let nonce = nonce.unwrap_or_else(|| guard.create(handlers::CLEAR_CACHE_ACTION));
            let response = handlers::clear_cached_scan(&mut store.state, &guard, &nonce);
            report::print_response(&response, json)?;
            response_code(&response)
        }
        Commands::HashBatch { limit } => {
            let limit = limit.unwrap_or(settings.batch_size);
            let report = duplicates::process_batch(&mut store.content, &mut store.state, &settings.site_root, limit);
            report::print_batch(&report, json)?;
            0
        }
        Commands::Duplicates { nonce, html } => {
            let nonce = nonce.unwrap_or_else(|| guard.create(handlers::DUPLICATES_ACTION));
            handle_duplicates(&mut store.content, settings, &guard, &nonce, html, json)?
        }
        Commands::Unused { page, author, search } => {
            let message = media::take_delete_message(&mut store.state.transients, clock.now());
            let filter = media::UnusedFilter { author, search };
            let page = media::find_unused(&store.content, &settings.site_root, &filter, page, settings.per_page);
            report::print_unused(&page, message.as_deref(), json)?;
            if page.total_items > 0 {
                1
            } else {
                0
            }
        }
        Commands::DeleteUnused { ids, nonce } => {
            let nonce = nonce.unwrap_or_else(|| guard.create(handlers::BULK_DELETE_ACTION));
            let deleted = handlers::bulk_delete_media(
                &mut store.content,
                &mut store.state,
                &guard,
                &nonce,
                &settings.site_root,
                &ids,
                &clock,
            )?;
            info!(deleted, "bulk delete finished");
            // The message stays stored for the next `unused` listing
            let message = if deleted > 0 {
                format!("{} media file(s) deleted successfully.", deleted)
            } else {
                "No media deleted.".to_string()
            };
            report::print_response(&AjaxResponse::success(message), json)?;
            0
        }
        Commands::Usage { attachment_id } => {
            let usages = media::find_usage(&store.content, attachment_id);
            report::print_usage(attachment_id, &usages, json)?;
            0
        }
        Commands::Nonce { action } => {
            let nonce = guard.create(&action);
            if json {
                report::print_json(&serde_json::json!({ "action": action, "nonce": nonce }))?;
            } else {
                println!("{}", nonce);
            }
            0
        }
    };

    Ok(code)
}

async fn handle_scan(store: &mut SiteStore, settings: &Settings, page: usize, refresh: bool, json: bool) -> Result<i32> {
    let checker = LivenessChecker::new(
        &settings.home_url,
        &settings.site_root,
        Duration::from_secs(settings.probe_timeout_secs),
    )?;

    if refresh && ResultCache::new(&mut store.state.transients, &SystemClock).invalidate(SCAN_CACHE_KEY) {
        info!("dropped cached scan");
    }

    let entries = scan::cached_scan(
        &store.content,
        &mut store.state.transients,
        &SystemClock,
        &checker,
        chrono::Duration::seconds(settings.cache_ttl_secs),
        settings.max_concurrent_checks,
    )
    .await?;

    let page = paging::paginate(entries, page, settings.per_page);
    report::print_broken_links(&page, &settings.home_url, json)?;

    if page.total_items > 0 {
        Ok(1) // Exit code 1 = broken links found
    } else {
        Ok(0)
    }
}

fn handle_duplicates<C: Clock>(
    site: &mut SiteContent,
    settings: &Settings,
    guard: &NonceGuard<'_, C>,
    nonce: &str,
    html: bool,
    json: bool,
) -> Result<i32> {
    if html {
        let response = handlers::fetch_duplicate_images(site, guard, nonce, &settings.site_root, &settings.home_url);
        report::print_response(&response, json)?;
        return Ok(if response.success { 1 } else { response_code(&response) });
    }

    guard.verify(handlers::DUPLICATES_ACTION, nonce)?;
    let pass = duplicates::collect_fingerprints(site, &settings.site_root, 0, None);
    let groups = duplicates::group_duplicates(&pass.fingerprints);
    report::print_duplicates(site, &groups, json)?;

    Ok(if groups.is_empty() { 0 } else { 1 })
}

// A rejected nonce is an error; any other failure just means "nothing to do"
fn response_code(response: &AjaxResponse) -> i32 {
    if response.is_rejection() {
        2
    } else {
        0
    }
}
