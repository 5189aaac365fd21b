//! Directory listing entries

use std::fmt;

use serde_json::Value as Json;

use crate::{PxError, Result};

/// Type id PxWeb uses for levels
pub const LEVEL_TYPE: &str = "l";

/// Type id PxWeb uses for tables
pub const TABLE_TYPE: &str = "t";

/// One item of a directory listing: a database, a level or a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Stable identifier used for lookup
    pub name: String,
    /// Human readable description
    pub text: String,
    /// Node kind, e.g. `l` for a level, when the API provides one
    pub type_id: Option<String>,
}

impl IndexEntry {
    /// Create an entry
    pub fn new(name: impl Into<String>, text: impl Into<String>, type_id: Option<&str>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            type_id: type_id.map(str::to_string),
        }
    }

    /// Parse one listing item.
    ///
    /// Databases are keyed by `dbid`, levels and tables by `id`. All fields
    /// are whitespace trimmed.
    pub fn from_json(j: &Json) -> Result<Self> {
        let obj = j
            .as_object()
            .ok_or_else(|| PxError::malformed("index entry is not an object"))?;

        let name = obj
            .get("id")
            .or_else(|| obj.get("dbid"))
            .and_then(Json::as_str)
            .unwrap_or("")
            .trim()
            .to_string();

        let text = obj
            .get("text")
            .and_then(Json::as_str)
            .ok_or_else(|| PxError::malformed(format!("index entry '{name}' has no text")))?
            .trim()
            .to_string();

        let type_id = obj
            .get("type")
            .and_then(Json::as_str)
            .map(|t| t.trim().to_string());

        Ok(Self { name, text, type_id })
    }

    /// Parse a whole directory listing
    pub fn parse_listing(j: &Json) -> Result<Vec<Self>> {
        j.as_array()
            .ok_or_else(|| PxError::malformed("directory listing is not an array"))?
            .iter()
            .map(Self::from_json)
            .collect()
    }

    pub fn is_level(&self) -> bool {
        self.type_id.as_deref() == Some(LEVEL_TYPE)
    }

    pub fn is_table(&self) -> bool {
        self.type_id.as_deref() == Some(TABLE_TYPE)
    }
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.type_id.as_deref().unwrap_or(" "), self.name, self.text)
    }
}
