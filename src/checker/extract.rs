// src/checker/extract.rs
// =============================================================================
// This module pulls candidate URLs out of a blob of HTML.
//
// We use the `scraper` crate which:
// - Parses HTML fragments into a DOM
// - Supports CSS selectors for finding elements
// - Copes with the half-formed markup that editors and widgets produce
//
// Two kinds of candidates come out of a blob:
// - links:  every a[href]
// - images: every img[src]
//
// URLs are returned exactly as written in the markup, entities included
// (`?a=1&amp;b=2`). The checker decodes them for probing, but the rewriter
// needs the literal text to replace it.
// =============================================================================

use scraper::{Html, Selector};

// Extracts the href of every anchor in the HTML, skipping values that are
// never worth checking (empty, fragment-only, mailto:, tel:, javascript:)
//
// Example:
//   html   = r#"<a href="/docs">Docs</a> <a href="#top">Top</a>"#
//   result = ["/docs"]
pub fn extract_links(html: &str) -> Vec<String> {
    select_attr(html, "a[href]", "href")
        .into_iter()
        .filter(|url| is_checkable_link(url))
        .collect()
}

// Extracts the src of every image in the HTML, skipping inline data URIs
pub fn extract_images(html: &str) -> Vec<String> {
    select_attr(html, "img[src]", "src")
        .into_iter()
        .filter(|url| is_checkable_link(url) && !url.starts_with("data:image"))
        .collect()
}

// Fragment-only references (`#`, `#section`) point into the current page
pub fn is_fragment_only(url: &str) -> bool {
    url.starts_with('#')
}

fn select_attr(html: &str, selector: &str, attr: &str) -> Vec<String> {
    // A cheap pre-check: most theme mods and widget fields carry no markup
    if !html.contains('<') {
        return Vec::new();
    }

    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(|value| as_written(html, value.trim()))
        .collect()
}

// The parser hands back attribute values with entities decoded. Find the form
// the value actually takes in the source so it can be searched for later.
fn as_written(html: &str, decoded: &str) -> String {
    if !decoded.contains(['&', '"', '\'', '<', '>']) || html.contains(decoded) {
        return decoded.to_string();
    }

    let candidates = [
        html_escape::encode_double_quoted_attribute(decoded).into_owned(),
        html_escape::encode_single_quoted_attribute(decoded).into_owned(),
        // Editors often store a bare ampersand as a numeric reference
        decoded.replace('&', "&#038;"),
        decoded.replace('&', "&#38;"),
    ];
    candidates
        .into_iter()
        .find(|candidate| html.contains(candidate.as_str()))
        .unwrap_or_else(|| decoded.to_string())
}

// We skip:
// - empty values
// - in-page anchors
// - mailto:, tel: and javascript: pseudo-links
fn is_checkable_link(url: &str) -> bool {
    if url.is_empty() || is_fragment_only(url) {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    !(lower.starts_with("mailto:") || lower.starts_with("tel:") || lower.starts_with("javascript:"))
}
