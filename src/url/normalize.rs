use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a URL for fetching and for the visited set
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP(S) scheme and a host
/// 3. Remove the fragment (everything after #)
/// 4. Remove tracking query parameters, keeping the order of the rest
/// 5. Remove an empty query string (trailing ?)
///
/// Parameter order is preserved because page locators on paginated sites
/// are positional in practice (`?kalash=1&vishram=2`).
///
/// # Examples
///
/// ```
/// use pagechain::url::normalize_url;
///
/// let url = normalize_url("https://example.com/index.php?kalash=1&vishram=2#fn3").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/index.php?kalash=1&vishram=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Resolves `href` against `base` and normalizes the result
pub fn resolve_and_normalize(base: &Url, href: &str) -> Result<Url, UrlError> {
    let joined = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(joined)
}

fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keeps_query_order() {
        let result = normalize_url("https://example.com/index.php?vishram=2&kalash=1").unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/index.php?vishram=2&kalash=1"
        );
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            normalize_url("https://example.com/index.php?kalash=1&utm_source=x&fbclid=y").unwrap();
        assert_eq!(result.as_str(), "https://example.com/index.php?kalash=1");
    }

    #[test]
    fn test_all_tracking_params_removed() {
        let result = normalize_url("https://example.com/page?utm_source=a&gclid=c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_http_is_kept() {
        let result = normalize_url("http://127.0.0.1:8080/a").unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:8080/a");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_resolve_relative_href() {
        let base = Url::parse("https://example.com/book/index.php?kalash=1&vishram=1").unwrap();
        let next = resolve_and_normalize(&base, "index.php?kalash=1&vishram=2#top").unwrap();
        assert_eq!(
            next.as_str(),
            "https://example.com/book/index.php?kalash=1&vishram=2"
        );
    }

    #[test]
    fn test_resolve_rejects_javascript() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_and_normalize(&base, "javascript:void(0)").is_err());
    }
}
