//! Table variables and their coded values

use std::fmt;

use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::Value as Json;

use crate::{PxError, Result};

/// Possible value of a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub code: String,
    pub text: String,
}

impl Value {
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Categorical axis of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub code: String,
    pub text: String,
    pub values: Vec<Value>,
    /// Whether the variable may be left out of a query
    pub elimination: bool,
    /// Whether the variable is the time axis
    pub time: bool,
}

/// Wire form of a variable in a table descriptor
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVariable {
    code: String,
    text: String,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    value_texts: Vec<String>,
    #[serde(default)]
    elimination: bool,
    #[serde(default)]
    time: bool,
}

impl Variable {
    /// Parse a variable from a table descriptor
    pub fn from_json(j: &Json) -> Result<Self> {
        let raw = RawVariable::deserialize(j)
            .map_err(|e| PxError::malformed(format!("invalid variable: {e}")))?;

        if raw.values.len() != raw.value_texts.len() {
            return Err(PxError::malformed(format!(
                "variable '{}' has {} values but {} value texts",
                raw.code,
                raw.values.len(),
                raw.value_texts.len()
            )));
        }

        let values = raw
            .values
            .into_iter()
            .zip(raw.value_texts)
            .map(|(code, text)| Value { code, text })
            .collect();

        Ok(Self {
            code: raw.code,
            text: raw.text,
            values,
            elimination: raw.elimination,
            time: raw.time,
        })
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Codes of all values, in declaration order
    pub fn codes(&self) -> Vec<String> {
        self.values.iter().map(|v| v.code.clone()).collect()
    }

    /// Look up a value by its exact code
    pub fn value(&self, code: &str) -> Result<&Value> {
        self.values
            .iter()
            .find(|v| v.code == code)
            .ok_or_else(|| PxError::not_found("value", code, &format!("variable '{}'", self.code)))
    }

    /// Values whose text matches `pattern`, ignoring case
    pub fn find(&self, pattern: &str) -> Result<Vec<&Value>> {
        self.find_with(pattern, true)
    }

    /// Values whose text matches `pattern`
    pub fn find_with(&self, pattern: &str, case_insensitive: bool) -> Result<Vec<&Value>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(self.values.iter().filter(|v| re.is_match(&v.text)).collect())
    }
}

impl<'a> IntoIterator for &'a Variable {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.code, self.text)?;
        let width = self.values.iter().map(|v| v.code.chars().count()).max().unwrap_or(0);
        for value in &self.values {
            writeln!(f, "  {:<width$} {}", value.code, value.text)?;
        }
        Ok(())
    }
}
