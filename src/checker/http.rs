// src/checker/http.rs
// =============================================================================
// This module decides whether a single URL is broken.
//
// Two paths:
// - URLs under the site's own origin are mapped onto the site root and
//   checked on disk. No network call is made for them.
// - Everything else is probed over HTTP with a short timeout:
//     links  -> HEAD; broken on transport failure or 404
//     images -> GET;  broken on transport failure or a non-image content type
//
// A failed probe (timeout, DNS, refused connection, TLS) counts as broken
// straight away. There are no retries.
// =============================================================================

use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::extract::is_fragment_only;
use crate::error::Result;

pub struct LivenessChecker {
    client: Client,
    /// Site origin without a trailing slash, e.g. "https://blog.example"
    home_url: String,
    site_root: PathBuf,
}

impl LivenessChecker {
    pub fn new(home_url: &str, site_root: &Path, timeout: Duration) -> Result<Self> {
        // One client for every probe (connection pooling)
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(LivenessChecker {
            client,
            home_url: home_url.trim_end_matches('/').to_string(),
            site_root: site_root.to_path_buf(),
        })
    }

    /// Checks an anchor target. `url` may still carry HTML entities.
    pub async fn is_broken(&self, url: &str) -> bool {
        if is_fragment_only(url) {
            return false;
        }

        let url = html_escape::decode_html_entities(url);
        let url: &str = &url;

        // The fragment never reaches the server
        let url = url.split('#').next().unwrap_or(url);
        let url = self.resolve(url);

        if let Some(path) = self.local_path(&url) {
            return !path.exists();
        }

        match self.client.head(&url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(url = %url, status = status.as_u16(), "probed link");
                status == StatusCode::NOT_FOUND
            }
            Err(e) => {
                debug!(url = %url, reason = describe_error(&e), "link probe failed");
                true
            }
        }
    }

    /// Checks an image source. A reachable URL that does not serve an image
    /// (an HTML error page, say) is still broken.
    pub async fn is_broken_image(&self, url: &str) -> bool {
        if is_fragment_only(url) {
            return false;
        }

        let url = html_escape::decode_html_entities(url);
        let url: &str = &url;

        let url = self.resolve(url);

        if let Some(path) = self.local_path(&url) {
            return !path.exists();
        }

        match self.client.get(&url).send().await {
            Ok(response) => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                debug!(url = %url, content_type, "probed image");
                !content_type.starts_with("image/")
            }
            Err(e) => {
                debug!(url = %url, reason = describe_error(&e), "image probe failed");
                true
            }
        }
    }

    // Turns a site-relative reference ("/wp-content/a.png", "about/") into an
    // absolute URL under the site origin. Absolute URLs pass through.
    fn resolve(&self, url: &str) -> String {
        if Url::parse(url).is_ok() {
            return url.to_string();
        }

        match Url::parse(&format!("{}/", self.home_url)).and_then(|base| base.join(url)) {
            Ok(joined) => joined.to_string(),
            Err(_) => url.to_string(),
        }
    }

    // Maps "https://blog.example/wp-content/a.png" to "<site_root>/wp-content/a.png".
    // Returns None for URLs outside the origin.
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(&self.home_url)?;

        // "https://blog.example.org" is not under "https://blog.example"
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
            return None;
        }

        // Query strings (cache busters like ?ver=2) are not part of the file name
        let rest = rest.split('?').next().unwrap_or(rest);
        Some(self.site_root.join(rest.trim_start_matches('/')))
    }
}

// Names the failure class of a reqwest error, for logs
fn describe_error(error: &reqwest::Error) -> &'static str {
    let text = error.to_string().to_ascii_lowercase();

    if error.is_timeout() {
        "timeout"
    } else if error.is_redirect() {
        "too many redirects"
    } else if error.is_connect() {
        if text.contains("dns") {
            "could not resolve hostname"
        } else {
            "connection failed"
        }
    } else if text.contains("certificate") || text.contains("ssl") {
        "tls error"
    } else {
        "request error"
    }
}
