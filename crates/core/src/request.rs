//! Intercepted request model.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::compute_request_key;

/// How the host issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    /// Subresource load or programmatic fetch.
    #[default]
    Subresource,
}

/// An intercepted request: method, URL and navigation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: Url,
    mode: RequestMode,
}

impl Request {
    /// Build a request. The method is uppercased.
    pub fn new(method: &str, url: Url, mode: RequestMode) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url, mode }
    }

    /// A plain subresource GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Subresource)
    }

    /// A top-level navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// URL used for cache identity: the request URL without its fragment.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// Cache identity of this request (hash of method and cache URL).
    pub fn identity(&self) -> String {
        compute_request_key(&self.method, &self.cache_url())
    }

    /// Lowercased file extension of the last path segment, if any.
    pub fn extension(&self) -> Option<String> {
        let segment = self.url.path().rsplit('/').next()?;
        let (_, ext) = segment.rsplit_once('.')?;
        if ext.is_empty() { None } else { Some(ext.to_ascii_lowercase()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_method_uppercased() {
        let req = Request::new("post", url("https://app.test/api"), RequestMode::Subresource);
        assert_eq!(req.method(), "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_cache_url_drops_fragment() {
        let req = Request::get(url("https://app.test/page?x=1#section"));
        assert_eq!(req.cache_url(), "https://app.test/page?x=1");
    }

    #[test]
    fn test_identity_ignores_fragment() {
        let a = Request::get(url("https://app.test/page#one"));
        let b = Request::get(url("https://app.test/page#two"));
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_ignores_mode() {
        let a = Request::get(url("https://app.test/"));
        let b = Request::navigate(url("https://app.test/"));
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_extension() {
        assert_eq!(Request::get(url("https://app.test/a/logo.PNG")).extension().as_deref(), Some("png"));
        assert_eq!(Request::get(url("https://app.test/app.min.js?v=3")).extension().as_deref(), Some("js"));
        assert_eq!(Request::get(url("https://app.test/api/users")).extension(), None);
        assert_eq!(Request::get(url("https://app.test/")).extension(), None);
        assert_eq!(Request::get(url("https://app.test/trailing.")).extension(), None);
    }
}
