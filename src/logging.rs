// src/logging.rs
// =============================================================================
// Sets up tracing for the CLI.
//
// Logs go to stderr so that `--json` output on stdout stays machine-readable.
// RUST_LOG wins when set; otherwise -v picks debug and the default is info.
// =============================================================================

use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logger(verbose: bool) {
    let fallback = if verbose { "media_tracker=debug" } else { "media_tracker=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // try_init: a second call (tests, embedding) must not panic
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
