//! Request URL resolution for intercepted requests.

/// Error type for request URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("cannot-be-a-base URL: {0}")]
    NotHierarchical(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a URL as the page would see it.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve origin-relative paths (`/app.js`, `app.js`) against `origin`
/// 3. Lowercase the host (done by the URL parser for special schemes)
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Absolute URLs with any scheme are accepted so the classifier can see
/// extension schemes; `data:`/`mailto:` style URLs are rejected.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match url::Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    if parsed.cannot_be_a_base() {
        return Err(UrlError::NotHierarchical(trimmed.to_string()));
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("https://app.test/").unwrap()
    }

    #[test]
    fn test_resolve_absolute() {
        let url = resolve(&origin(), "https://cdn.test/lib.js").unwrap();
        assert_eq!(url.as_str(), "https://cdn.test/lib.js");
    }

    #[test]
    fn test_resolve_origin_relative() {
        let url = resolve(&origin(), "/styles/main.css").unwrap();
        assert_eq!(url.as_str(), "https://app.test/styles/main.css");

        let url = resolve(&origin(), "manifest.json").unwrap();
        assert_eq!(url.as_str(), "https://app.test/manifest.json");
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve(&origin(), "https://APP.TEST/Index.html").unwrap();
        assert_eq!(url.host_str(), Some("app.test"));
        assert_eq!(url.path(), "/Index.html");
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve(&origin(), "/docs#install").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/docs");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve(&origin(), "/api/items?b=2&a=1").unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_resolve_extension_scheme() {
        let url = resolve(&origin(), "chrome-extension://abcdef/content.js").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_rejects_opaque() {
        let result = resolve(&origin(), "mailto:someone@app.test");
        assert!(matches!(result, Err(UrlError::NotHierarchical(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }
}
