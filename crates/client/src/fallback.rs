//! Degraded-but-valid responses for when network and cache both fail.

use reqwest::StatusCode;
use tether_core::classify::is_image_request;
use tether_core::{CacheDb, Request, RequestClassification};

use crate::response::{Response, ResponseSource};

/// Placeholder served for images that are neither reachable nor cached.
pub const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"##,
    r##"<rect width="200" height="200" fill="#f0f0f0"/>"##,
    r##"<text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle" "##,
    r##"font-family="sans-serif" font-size="14" fill="#999">Image unavailable offline</text>"##,
    "</svg>"
);

pub const PLACEHOLDER_CONTENT_TYPE: &str = "image/svg+xml";

/// Supplies the offline shell for navigations and the placeholder for images.
#[derive(Clone, Debug)]
pub struct FallbackProvider {
    cache: CacheDb,
    shell: Request,
    search_order: Vec<String>,
}

impl FallbackProvider {
    /// `search_order` names the partitions tried first for the shell.
    pub fn new(cache: CacheDb, shell_url: url::Url, search_order: Vec<String>) -> Self {
        Self { cache, shell: Request::get(shell_url), search_order }
    }

    /// The fallback for a failed request, or `None` when the original
    /// error should propagate.
    pub async fn fallback_for(
        &self, classification: RequestClassification, request: &Request,
    ) -> Option<Response> {
        match classification {
            RequestClassification::Navigate => self.shell_document().await,
            RequestClassification::StaticAsset if is_image_request(request) => {
                tracing::debug!(url = %request.cache_url(), "serving placeholder image");
                Some(Self::placeholder_image(request))
            }
            _ => None,
        }
    }

    /// The most recently stored shell document.
    pub async fn shell_document(&self) -> Option<Response> {
        let order: Vec<&str> = self.search_order.iter().map(String::as_str).collect();
        match self.cache.match_preferring(&self.shell, &order).await {
            Ok(Some(stored)) => {
                tracing::debug!(url = %self.shell.cache_url(), "serving offline shell");
                Some(Response::from_stored(stored, ResponseSource::Fallback))
            }
            Ok(None) => {
                tracing::warn!(url = %self.shell.cache_url(), "offline shell is not cached");
                None
            }
            Err(e) => {
                tracing::warn!(url = %self.shell.cache_url(), "offline shell lookup failed: {e}");
                None
            }
        }
    }

    pub fn placeholder_image(request: &Request) -> Response {
        Response::with_body(
            request.cache_url(),
            StatusCode::OK,
            PLACEHOLDER_CONTENT_TYPE,
            PLACEHOLDER_SVG,
            ResponseSource::Fallback,
        )
    }
}
