//! Request body for a table query

use serde::Serialize;
use serde_json::Value as Json;

use super::filters::ExpandedFilters;
use crate::Result;

#[derive(Serialize)]
struct Payload<'a> {
    query: Vec<QueryItem<'a>>,
    response: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct QueryItem<'a> {
    code: &'a str,
    selection: ItemSelection<'a>,
}

#[derive(Serialize)]
struct ItemSelection<'a> {
    filter: &'a str,
    values: &'a [String],
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    format: &'a str,
}

/// Build `{query: [{code, selection: {filter: "item", values}}], response: {format: "json"}}`
pub fn format_payload(filters: &ExpandedFilters) -> Result<Json> {
    let payload = Payload {
        query: filters
            .iter()
            .map(|(code, values)| QueryItem {
                code,
                selection: ItemSelection {
                    filter: "item",
                    values,
                },
            })
            .collect(),
        response: ResponseFormat { format: "json" },
    };
    Ok(serde_json::to_value(payload)?)
}
