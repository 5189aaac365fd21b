//! Name resolution against a directory listing

use crate::model::IndexEntry;
use crate::{PxError, Result};

/// Suffix PxWeb gives table files
pub const TABLE_SUFFIX: &str = ".px";

/// Resolve `name` to exactly one entry of `index`.
///
/// An exact name wins, then `name` + `.px`. Otherwise every entry whose name
/// contains `name` is a candidate and there must be exactly one. Matching is
/// case sensitive.
pub fn find_entry<'a>(
    index: &'a [IndexEntry],
    name: &str,
    scope: &str,
) -> Result<&'a IndexEntry> {
    if let Some(entry) = index.iter().find(|e| e.name == name) {
        return Ok(entry);
    }

    let with_suffix = format!("{name}{TABLE_SUFFIX}");
    if let Some(entry) = index.iter().find(|e| e.name == with_suffix) {
        return Ok(entry);
    }

    let candidates: Vec<&IndexEntry> = index.iter().filter(|e| e.name.contains(name)).collect();
    match candidates.as_slice() {
        [] => Err(PxError::NotFound {
            kind: "entry",
            name: format!("{name} or {with_suffix}"),
            scope: scope.to_string(),
        }),
        [entry] => Ok(entry),
        _ => Err(PxError::Ambiguous {
            name: name.to_string(),
            candidates: candidates.iter().map(|e| e.name.clone()).collect(),
        }),
    }
}
