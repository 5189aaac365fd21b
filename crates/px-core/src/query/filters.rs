//! Query filters and wildcard expansion

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Table;
use crate::Result;

/// Selection string meaning "every value of the variable"
pub const WILDCARD: &str = "*";

/// Filters after expansion: variable code → explicit value codes
pub type ExpandedFilters = IndexMap<String, Vec<String>>;

/// Which values of one variable to include in a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectionRepr", into = "SelectionRepr")]
pub enum Selection {
    /// A single value code
    One(String),
    /// An explicit list of value codes
    Many(Vec<String>),
    /// All known value codes of the variable
    All,
}

/// Stored form: `"*"`, a single code, or a list of codes
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    One(String),
    Many(Vec<String>),
}

impl From<SelectionRepr> for Selection {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::One(code) => Selection::from(code),
            SelectionRepr::Many(codes) => Selection::Many(codes),
        }
    }
}

impl From<Selection> for SelectionRepr {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::One(code) => SelectionRepr::One(code),
            Selection::Many(codes) => SelectionRepr::Many(codes),
            Selection::All => SelectionRepr::One(WILDCARD.to_string()),
        }
    }
}

impl From<String> for Selection {
    fn from(code: String) -> Self {
        if code == WILDCARD {
            Selection::All
        } else {
            Selection::One(code)
        }
    }
}

impl From<&str> for Selection {
    fn from(code: &str) -> Self {
        Selection::from(code.to_string())
    }
}

impl From<i64> for Selection {
    fn from(code: i64) -> Self {
        Selection::One(code.to_string())
    }
}

impl<T: ToString> From<Vec<T>> for Selection {
    fn from(codes: Vec<T>) -> Self {
        Selection::Many(codes.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for Selection {
    fn from(codes: [T; N]) -> Self {
        Selection::Many(codes.iter().map(ToString::to_string).collect())
    }
}

impl Selection {
    /// Explicit value codes for `variable` of `table`.
    ///
    /// Only the wildcard consults the table, so an unknown variable code is
    /// reported there and passed through otherwise.
    pub fn expand(&self, table: &Table, variable: &str) -> Result<Vec<String>> {
        match self {
            Selection::One(code) => Ok(vec![code.clone()]),
            Selection::Many(codes) => Ok(codes.clone()),
            Selection::All => Ok(table.variable(variable)?.codes()),
        }
    }
}

/// Variable code → selection, in insertion order.
///
/// Equality compares the filters as maps: insertion order is ignored, the
/// selections must match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(IndexMap<String, Selection>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the selection for `code`
    pub fn with(mut self, code: impl Into<String>, selection: impl Into<Selection>) -> Self {
        self.insert(code, selection);
        self
    }

    /// Select every value of `code`
    pub fn all(self, code: impl Into<String>) -> Self {
        self.with(code, Selection::All)
    }

    pub fn insert(&mut self, code: impl Into<String>, selection: impl Into<Selection>) {
        self.0.insert(code.into(), selection.into());
    }

    pub fn get(&self, code: &str) -> Option<&Selection> {
        self.0.get(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Selection> {
        self.0.iter()
    }

    /// Replace wildcards with the variable's value codes and wrap single codes
    pub fn expand(&self, table: &Table) -> Result<ExpandedFilters> {
        self.0
            .iter()
            .map(|(code, selection)| Ok((code.clone(), selection.expand(table, code)?)))
            .collect()
    }
}

impl<K: Into<String>, S: Into<Selection>> FromIterator<(K, S)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (code, selection) in iter {
            filters.insert(code, selection);
        }
        filters
    }
}

impl<'a> IntoIterator for &'a Filters {
    type Item = (&'a String, &'a Selection);
    type IntoIter = indexmap::map::Iter<'a, String, Selection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
