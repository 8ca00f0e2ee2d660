use crate::UrlError;
use url::Url;

/// Query parameter carrying the result-page number
pub const PAGE_PARAM: &str = "page";

/// Resolves a listing link found on a search page to its canonical form
///
/// # Canonicalisation Steps
///
/// 1. Skip empty, fragment-only and non-navigational hrefs
/// 2. Resolve against the site origin (relative and absolute hrefs alike)
/// 3. Require an HTTP(S) scheme
/// 4. Require the listing path fragment in the resolved path
/// 5. Drop query string and fragment, strip a trailing slash
///
/// Two hrefs that differ only in their query string therefore resolve to the
/// same listing.
///
/// # Examples
///
/// ```
/// use immo_scout::url::resolve_listing_url;
/// use url::Url;
///
/// let origin = Url::parse("https://www.willhaben.at").unwrap();
/// let url = resolve_listing_url("/iad/immobilien/d/AAA?x=1", &origin, "/iad/immobilien/d/").unwrap();
/// assert_eq!(url.as_str(), "https://www.willhaben.at/iad/immobilien/d/AAA");
/// ```
pub fn resolve_listing_url(href: &str, origin: &Url, path_fragment: &str) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return Err(UrlError::NotAListing(href.to_string()));
    }

    let url = origin
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if !url.path().contains(path_fragment) {
        return Err(UrlError::NotAListing(url.to_string()));
    }

    Ok(canonical_listing_url(url))
}

/// Strips everything that does not identify the listing itself
pub fn canonical_listing_url(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    url
}

/// Builds the URL of one result page of a search
///
/// Any page parameter already present in the base query is replaced; all
/// other parameters keep their order.
pub fn paginated_url(search_url: &Url, page: u32) -> Url {
    let kept: Vec<(String, String)> = search_url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = search_url.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(PAGE_PARAM, &page.to_string());
    }

    url
}
