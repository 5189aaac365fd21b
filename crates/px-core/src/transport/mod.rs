//! HTTP boundary
//!
//! Everything the client knows about the network goes through [`Transport`]:
//! one blocking GET or POST per call, JSON in and JSON out.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpTransport;

use serde_json::Value as Json;

use crate::Result;

/// Blocking JSON request capability
pub trait Transport {
    /// GET `url` and decode the body as JSON
    fn get(&self, url: &str) -> Result<Json>;

    /// POST `body` as JSON to `url` and decode the response as JSON
    fn post(&self, url: &str, body: &Json) -> Result<Json>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<Json> {
        (**self).get(url)
    }

    fn post(&self, url: &str, body: &Json) -> Result<Json> {
        (**self).post(url, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> Result<Json> {
        (**self).get(url)
    }

    fn post(&self, url: &str, body: &Json) -> Result<Json> {
        (**self).post(url, body)
    }
}
