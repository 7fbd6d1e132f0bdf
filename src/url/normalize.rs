use crate::{UrlError, UrlResult};
use url::Url;

/// Pagination values that mean "there is no next page"
const NO_NEXT_PAGE: &[&str] = &["null", "none", "n/a"];

/// Normalizes a URL string into the canonical form used as a dedup key
///
/// Returns `None` when the input cannot be parsed as an absolute HTTP(S)
/// URL; callers treat that as "no URL".
///
/// # Examples
///
/// ```
/// use lexicrawl::url::normalize_url;
///
/// let a = normalize_url("HTTP://Example.COM/words?b=2&amp;a=1#top").unwrap();
/// let b = normalize_url("http://example.com/words?a=1&b=2").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, "http://example.com/words?a=1&b=2");
/// ```
pub fn normalize_url(raw: &str) -> Option<String> {
    match canonicalize(raw) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            tracing::debug!("Cannot normalize URL {:?}: {}", raw, e);
            None
        }
    }
}

/// Canonicalizes a URL
///
/// # Normalization Steps
///
/// 1. Trim whitespace and decode HTML entities (`&amp;` → `&`)
/// 2. Parse the URL; reject if malformed or not HTTP(S)
/// 3. Lowercase scheme and host
/// 4. Collapse repeated `/` in the path, keeping a trailing slash if present
/// 5. Remove the fragment
/// 6. Sort query parameters by key then value and re-encode them; blank
///    values are kept, an empty query is removed
pub fn canonicalize(raw: &str) -> UrlResult<Url> {
    let decoded = html_escape::decode_html_entities(raw.trim());
    let mut url = Url::parse(&decoded).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // The parser already lowercases scheme and domain hosts; IP and opaque
    // hosts are lowercased here as well
    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or(UrlError::MissingHost)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let path = collapse_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collapses redundant separators in a path
fn collapse_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut collapsed = format!("/{}", segments.join("/"));
    if path.ends_with('/') && !collapsed.ends_with('/') {
        collapsed.push('/');
    }
    collapsed
}

/// Turns a `<next_page>` value into an absolute canonical URL
///
/// Null-like markers yield `None`. Relative references are resolved against
/// the page they were found on.
pub fn resolve_next_page(page_url: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty()
        || NO_NEXT_PAGE
            .iter()
            .any(|marker| value.eq_ignore_ascii_case(marker))
    {
        return None;
    }

    let decoded = html_escape::decode_html_entities(value);
    let absolute = match Url::parse(page_url).and_then(|base| base.join(&decoded)) {
        Ok(joined) => joined.to_string(),
        Err(_) => decoded.into_owned(),
    };

    normalize_url(&absolute)
}
