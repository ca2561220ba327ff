//! Request classification.
//!
//! Every intercepted request is routed by a pure function of its method and
//! URL shape. Rules apply in priority order:
//!
//! 1. Non-GET method → `Skip`
//! 2. Browser-extension scheme → `Skip`
//! 3. Analytics/telemetry marker anywhere in the URL → `Skip`
//! 4. Top-level navigation → `Navigate`
//! 5. Static-asset file extension → `StaticAsset`
//! 6. Anything else → `ApiData`

use serde::{Deserialize, Serialize};

use crate::request::Request;

/// URL schemes used by browser extensions.
pub const EXTENSION_SCHEMES: &[&str] =
    &["chrome-extension", "moz-extension", "safari-extension", "safari-web-extension", "ms-browser-extension"];

/// File extensions served with the cache-first strategy.
pub const STATIC_EXTENSIONS: &[&str] =
    &["css", "js", "png", "jpg", "jpeg", "gif", "ico", "svg", "woff", "woff2", "ttf", "eot"];

/// Static extensions that get the placeholder image when unavailable.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "ico", "svg"];

/// Default analytics/telemetry markers.
pub const DEFAULT_ANALYTICS_MARKERS: &[&str] = &["analytics", "googletagmanager", "gtag/js"];

/// Routing decision for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestClassification {
    Navigate,
    StaticAsset,
    ApiData,
    Skip,
}

impl RequestClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::StaticAsset => "static_asset",
            Self::ApiData => "api_data",
            Self::Skip => "skip",
        }
    }
}

/// Stateless request classifier.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    analytics_markers: Vec<String>,
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ANALYTICS_MARKERS.iter().map(|m| m.to_string()))
    }
}

impl RequestClassifier {
    /// Create a classifier with the given analytics markers. Empty markers are ignored.
    pub fn new(markers: impl IntoIterator<Item = String>) -> Self {
        let analytics_markers = markers
            .into_iter()
            .map(|m| m.to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { analytics_markers }
    }

    pub fn classify(&self, request: &Request) -> RequestClassification {
        if !request.is_get() {
            return RequestClassification::Skip;
        }

        let scheme = request.url().scheme();
        if EXTENSION_SCHEMES.contains(&scheme) {
            return RequestClassification::Skip;
        }

        let url = request.url().as_str().to_ascii_lowercase();
        if self.analytics_markers.iter().any(|m| url.contains(m.as_str())) {
            return RequestClassification::Skip;
        }

        if request.is_navigation() {
            return RequestClassification::Navigate;
        }

        match request.extension() {
            Some(ext) if STATIC_EXTENSIONS.contains(&ext.as_str()) => RequestClassification::StaticAsset,
            _ => RequestClassification::ApiData,
        }
    }
}

/// Whether the request targets an image-class static asset.
pub fn is_image_request(request: &Request) -> bool {
    request
        .extension()
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
