//! `reqwest`-backed transport

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value as Json;
use tracing::debug;

use super::Transport;
use crate::config::ClientConfig;
use crate::{PxError, Result};

/// Transport over a blocking `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// Create a transport honouring the timeout and user agent of `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| PxError::Transport {
            url: String::new(),
            message: format!("Failed to create HTTP client: {e}"),
        })?;

        Ok(Self { client })
    }

    fn send(url: &str, request: RequestBuilder) -> Result<Json> {
        let response = request.send().map_err(|e| PxError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PxError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Json>().map_err(|e| PxError::Transport {
            url: url.to_string(),
            message: format!("Failed to decode JSON: {e}"),
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Json> {
        debug!(url, "GET");
        Self::send(url, self.client.get(url))
    }

    fn post(&self, url: &str, body: &Json) -> Result<Json> {
        debug!(url, "POST");
        Self::send(url, self.client.post(url).json(body))
    }
}
