//! Resolution of request targets against the app origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for appshell_core::Error {
    fn from(err: UrlError) -> Self {
        appshell_core::Error::InvalidUrl(err.to_string())
    }
}

/// Resolve a request target the way a page would.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs (any scheme) are kept; anything else is joined onto `base`
/// 3. Remove fragment (#...); http(s) hosts come back lower-cased from parsing
/// 4. Keep query string intact (do not reorder)
///
/// Non-http schemes are returned as-is so the controller can bypass them.
pub fn resolve(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://mini.example.com/").unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve("/assets/app.js", &base()).unwrap();
        assert_eq!(url.as_str(), "https://mini.example.com/assets/app.js");
    }

    #[test]
    fn test_resolve_bare_path() {
        let url = resolve("manifest.json", &base()).unwrap();
        assert_eq!(url.as_str(), "https://mini.example.com/manifest.json");
    }

    #[test]
    fn test_resolve_absolute_kept() {
        let url = resolve("https://cdn.example.net/font.woff2", &base()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.net"));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve("https://MINI.Example.COM/stats", &base()).unwrap();
        assert_eq!(url.host_str(), Some("mini.example.com"));
    }

    #[test]
    fn test_resolve_keeps_query_drops_fragment() {
        let url = resolve("/stats?tab=refs#top", &base()).unwrap();
        assert_eq!(url.query(), Some("tab=refs"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_resolve_non_http_scheme_kept() {
        let url = resolve("chrome-extension://abcdef/inject.js", &base()).unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve("  /  ", &base()).unwrap();
        assert_eq!(url.as_str(), "https://mini.example.com/");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("", &base()), Err(UrlError::Empty)));
        assert!(matches!(resolve("   ", &base()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_invalid() {
        let result = resolve("http://[::1", &base());
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }
}
