//! Scripted network for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::StatusCode;
use tether_core::{Error, Request};

use crate::fetch::{FetchOptions, Network};
use crate::response::{Response, ResponseSource};

pub(crate) const ORIGIN: &str = "https://app.test";

pub(crate) fn url(path: &str) -> url::Url {
    url::Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Default)]
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, (u16, &'static str, Vec<u8>)>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl FakeNetwork {
    pub(crate) fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    /// Serve `body` for `path`. Unrouted paths answer 404.
    pub(crate) fn route(&self, path: &str, status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path).to_string(), (status, content_type, body.into()));
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|(u, _)| *u == target).count()
    }

    pub(crate) fn last_options(&self) -> Option<FetchOptions> {
        self.calls.lock().unwrap().last().map(|(_, o)| *o)
    }
}

#[async_trait::async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, Error> {
        let key = request.cache_url();
        self.calls.lock().unwrap().push((key.clone(), options));

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{key}: offline")));
        }

        let route = self.routes.lock().unwrap().get(&key).cloned();
        let (status, content_type, body) = route.unwrap_or((404, "text/plain", b"not found".to_vec()));
        let status = StatusCode::from_u16(status).unwrap();
        Ok(Response::with_body(key, status, content_type, body, ResponseSource::Network))
    }
}
