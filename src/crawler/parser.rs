//! Search-page parser for discovering listing links
//!
//! This module turns one search-result page into the set of detail-page
//! URLs it references. Extraction of fields from the detail pages lives in
//! the `extract` module.

use crate::crawler::extract::SelectorChain;
use crate::url::resolve_listing_url;
use scraper::Html;
use std::collections::BTreeSet;
use url::Url;

/// Discovers the detail-page URLs on a search-result page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - Every anchor matched by any selector of the chain (all selectors are
///   applied, not just the first that matches)
/// - Only when its `href` contains the listing path fragment
///
/// **Exclude:**
/// - Anchors without `href`
/// - `javascript:`, `mailto:`, `tel:` and fragment-only links
/// - Links that leave HTTP(S) after resolution
///
/// Links are resolved against the site origin and canonicalised, so the set
/// holds each listing once even when the page links it several times or
/// with different query strings.
///
/// # Example
///
/// ```
/// use immo_scout::crawler::{discover_listing_urls, SelectorChain};
/// use url::Url;
///
/// let html = r#"<a href="/iad/immobilien/d/AAA">A</a><a href="/iad/immobilien/d/AAA?x=1">A again</a>"#;
/// let origin = Url::parse("https://www.willhaben.at").unwrap();
/// let chain = SelectorChain::parse(&["a"]).unwrap();
///
/// let urls = discover_listing_urls(html, &origin, &chain, "/iad/immobilien/d/");
/// assert_eq!(urls.len(), 1);
/// ```
pub fn discover_listing_urls(
    html: &str,
    origin: &Url,
    links: &SelectorChain,
    path_fragment: &str,
) -> BTreeSet<Url> {
    let document = Html::parse_document(html);

    links
        .all_matches(&document)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| href.contains(path_fragment))
        .filter_map(|href| match resolve_listing_url(href, origin, path_fragment) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Skipping link {}: {}", href, e);
                None
            }
        })
        .collect()
}
