//! In-memory transport for tests

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value as Json;

use super::Transport;
use crate::{PxError, Result};

/// Serves canned JSON per URL and records every request
#[derive(Default)]
pub(crate) struct MockTransport {
    gets: HashMap<String, Json>,
    posts: HashMap<String, Json>,
    log: RefCell<Vec<(String, String)>>,
    bodies: RefCell<Vec<Json>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_get(mut self, url: &str, body: Json) -> Self {
        self.gets.insert(url.to_string(), body);
        self
    }

    pub(crate) fn with_post(mut self, url: &str, body: Json) -> Self {
        self.posts.insert(url.to_string(), body);
        self
    }

    /// Number of requests made with `method` to `url`
    pub(crate) fn count(&self, method: &str, url: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|(m, u)| m == method && u == url)
            .count()
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.log.borrow().len()
    }

    /// Bodies of all POST requests, oldest first
    pub(crate) fn posted_bodies(&self) -> Vec<Json> {
        self.bodies.borrow().clone()
    }

    fn respond(&self, method: &str, url: &str, table: &HashMap<String, Json>) -> Result<Json> {
        self.log.borrow_mut().push((method.to_string(), url.to_string()));
        table.get(url).cloned().ok_or_else(|| PxError::Http {
            url: url.to_string(),
            status: 404,
        })
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<Json> {
        self.respond("GET", url, &self.gets)
    }

    fn post(&self, url: &str, body: &Json) -> Result<Json> {
        self.bodies.borrow_mut().push(body.clone());
        self.respond("POST", url, &self.posts)
    }
}
