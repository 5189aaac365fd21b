//! Tabular queries against a table endpoint
//!
//! [`Filters`] map variable codes to [`Selection`]s. Before transmission the
//! filters are expanded against the table's variables and wrapped in the
//! PxWeb request payload; the columnar JSON response is turned into an Arrow
//! [`RecordBatch`](arrow::record_batch::RecordBatch) by [`parse_result`].

pub mod filters;
pub mod payload;
pub mod result;

pub use filters::{ExpandedFilters, Filters, Selection, WILDCARD};
pub use payload::format_payload;
pub use result::{
    column_kind, key_columns, parse_result, parse_value, value_columns, ColumnKind, Number,
    KIND_METADATA_KEY, TEXT_METADATA_KEY,
};
