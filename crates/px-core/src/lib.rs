//! Client for browsing and querying PxWeb statistical databases
//!
//! A [`PxWebApi`] is a lazily populated tree over a remote PxWeb directory
//! (database → level → table). Tables describe their variables and answer
//! tabular queries as Arrow record batches, optionally memoized on disk by a
//! [`QueryCache`].

pub mod cache;
pub mod config;
pub mod model;
pub mod navigation;
pub mod query;
pub mod transport;

use arrow::error::ArrowError;
use thiserror::Error;

// Re-exports
pub use cache::QueryCache;
pub use config::ClientConfig;
pub use model::{IndexEntry, Table, Value, Variable};
pub use navigation::{statfin_url, verohallinto_url, Node, NodeId, PxWebApi};
pub use query::{Filters, Number, Selection};
pub use transport::{HttpTransport, Transport};

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PxError>;

/// Errors that can occur while browsing or querying a PxWeb API
#[derive(Error, Debug)]
pub enum PxError {
    #[error("No {kind} named '{name}' in {scope}")]
    NotFound {
        kind: &'static str,
        name: String,
        scope: String,
    },

    #[error("Ambiguous name '{name}', candidates: {}", candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid cache id '{0}'")]
    InvalidCacheId(String),
}

impl PxError {
    pub(crate) fn not_found(kind: &'static str, name: &str, scope: &str) -> Self {
        PxError::NotFound {
            kind,
            name: name.to_string(),
            scope: scope.to_string(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        PxError::MalformedResponse(message.into())
    }
}
