//! Conversion of PxWeb query responses into Arrow record batches

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde::Deserialize;
use serde_json::Value as Json;

use crate::{PxError, Result};

/// Field metadata key holding the [`ColumnKind`] of a column
pub const KIND_METADATA_KEY: &str = "pxweb.kind";

/// Field metadata key holding the column's display text, when the API sent one
pub const TEXT_METADATA_KEY: &str = "pxweb.text";

/// Column type id of measurement columns
const VALUE_COLUMN_TYPE: &str = "c";

/// Role of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Classification column, raw value codes
    Key,
    /// Measurement column, parsed numbers
    Value,
}

impl ColumnKind {
    fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Key => "key",
            ColumnKind::Value => "value",
        }
    }
}

/// Numeric cell of a value column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Parse a measurement cell.
///
/// Spaces are removed and `,` is read as the decimal separator. Empty text is
/// missing; text with a `.` is a float. Anything else is an integer, or a
/// float when it only parses as one. Text that does not parse is missing.
pub fn parse_value(raw: &str) -> Option<Number> {
    let cleaned: String = raw
        .chars()
        .filter(|&c| c != ' ')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        None
    } else if cleaned.contains('.') {
        cleaned.parse::<f64>().ok().map(Number::Float)
    } else {
        cleaned
            .parse::<i64>()
            .map(Number::Int)
            .or_else(|_| cleaned.parse::<f64>().map(Number::Float))
            .ok()
    }
}

#[derive(Deserialize)]
struct RawResult {
    columns: Vec<RawColumn>,
    data: Vec<RawRow>,
}

#[derive(Deserialize)]
struct RawColumn {
    code: String,
    #[serde(rename = "type")]
    type_id: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawRow {
    key: Vec<String>,
    values: Vec<String>,
}

/// Turn a `{columns, data}` response into a record batch.
///
/// Key columns come first, then value columns, each in the order the
/// response declares them.
pub fn parse_result(j: &Json) -> Result<RecordBatch> {
    let raw = RawResult::deserialize(j)
        .map_err(|e| PxError::malformed(format!("invalid query result: {e}")))?;

    let (keys, values): (Vec<&RawColumn>, Vec<&RawColumn>) = raw
        .columns
        .iter()
        .partition(|c| c.type_id != VALUE_COLUMN_TYPE);

    let mut key_cells: Vec<Vec<&str>> = vec![Vec::with_capacity(raw.data.len()); keys.len()];
    let mut value_cells: Vec<Vec<Option<Number>>> =
        vec![Vec::with_capacity(raw.data.len()); values.len()];

    for (row_idx, row) in raw.data.iter().enumerate() {
        if row.key.len() != keys.len() || row.values.len() != values.len() {
            return Err(PxError::malformed(format!(
                "row {} has {} keys and {} values, expected {} and {}",
                row_idx,
                row.key.len(),
                row.values.len(),
                keys.len(),
                values.len()
            )));
        }

        for (col, cell) in key_cells.iter_mut().zip(&row.key) {
            col.push(cell);
        }
        for (col, cell) in value_cells.iter_mut().zip(&row.values) {
            col.push(parse_value(cell));
        }
    }

    let mut fields = Vec::with_capacity(raw.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(raw.columns.len());

    for (column, cells) in keys.iter().zip(&key_cells) {
        let mut builder = StringBuilder::new();
        for cell in cells {
            builder.append_value(cell);
        }
        fields.push(result_field(column, DataType::Utf8, false, ColumnKind::Key));
        arrays.push(Arc::new(builder.finish()));
    }

    for (column, cells) in values.iter().zip(&value_cells) {
        let (data_type, array) = build_value_array(cells);
        fields.push(result_field(column, data_type, true, ColumnKind::Value));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(raw.data.len()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        arrays,
        &options,
    )?)
}

/// Int64 when every present cell is an integer, Float64 otherwise
fn build_value_array(cells: &[Option<Number>]) -> (DataType, ArrayRef) {
    let all_ints = cells.iter().flatten().all(|n| matches!(n, Number::Int(_)));

    if all_ints {
        let mut builder = Int64Builder::with_capacity(cells.len());
        for cell in cells {
            match cell {
                Some(Number::Int(v)) => builder.append_value(*v),
                _ => builder.append_null(),
            }
        }
        (DataType::Int64, Arc::new(builder.finish()))
    } else {
        let mut builder = Float64Builder::with_capacity(cells.len());
        for cell in cells {
            builder.append_option(cell.map(|n| n.as_f64()));
        }
        (DataType::Float64, Arc::new(builder.finish()))
    }
}

fn result_field(
    column: &RawColumn,
    data_type: DataType,
    nullable: bool,
    kind: ColumnKind,
) -> Field {
    let mut metadata = HashMap::new();
    metadata.insert(KIND_METADATA_KEY.to_string(), kind.as_str().to_string());
    if let Some(text) = &column.text {
        metadata.insert(TEXT_METADATA_KEY.to_string(), text.clone());
    }
    Field::new(&column.code, data_type, nullable).with_metadata(metadata)
}

/// Kind of a result column, read back from its field metadata
pub fn column_kind(field: &Field) -> Option<ColumnKind> {
    match field.metadata().get(KIND_METADATA_KEY).map(String::as_str) {
        Some("key") => Some(ColumnKind::Key),
        Some("value") => Some(ColumnKind::Value),
        _ => None,
    }
}

/// Names of the key columns of a query result
pub fn key_columns(batch: &RecordBatch) -> Vec<String> {
    columns_of_kind(batch, ColumnKind::Key)
}

/// Names of the value columns of a query result
pub fn value_columns(batch: &RecordBatch) -> Vec<String> {
    columns_of_kind(batch, ColumnKind::Value)
}

fn columns_of_kind(batch: &RecordBatch, kind: ColumnKind) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .filter(|f| column_kind(f) == Some(kind))
        .map(|f| f.name().clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("1 234,5"), Some(Number::Float(1234.5)));
        assert_eq!(parse_value("42"), Some(Number::Int(42)));
        assert_eq!(parse_value("-7"), Some(Number::Int(-7)));
        assert_eq!(parse_value("0.25"), Some(Number::Float(0.25)));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("   "), None);
        assert_eq!(parse_value("n/a"), None);
        assert_eq!(parse_value(".."), None);
        assert_eq!(parse_value("."), None);

        // Exponents and integers too large for i64 fall back to floats
        assert_eq!(parse_value("1e3"), Some(Number::Float(1000.0)));
        assert_eq!(parse_value("99999999999999999999"), Some(Number::Float(1e20)));
        assert_eq!(parse_value("12 345"), Some(Number::Int(12345)));
        assert!(matches!(parse_value("nan"), Some(Number::Float(f)) if f.is_nan()));
    }

    #[test]
    fn test_columns_partitioned_in_order() {
        let batch = parse_result(&json!({
            "columns": [
                {"code": "Tiedot", "text": "Tiedot", "type": "c"},
                {"code": "Alue", "text": "Alue", "type": "d"},
                {"code": "Vuosi", "text": "Vuosi", "type": "t"},
                {"code": "Muutos", "type": "c"}
            ],
            "data": [
                {"key": ["SSS", "2022"], "values": ["5 563 970", "0,2"]},
                {"key": ["091", "2022"], "values": ["664028", ""]}
            ]
        }))
        .unwrap();

        let names: Vec<_> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["Alue", "Vuosi", "Tiedot", "Muutos"]);
        assert_eq!(key_columns(&batch), vec!["Alue", "Vuosi"]);
        assert_eq!(value_columns(&batch), vec!["Tiedot", "Muutos"]);
        assert_eq!(batch.num_rows(), 2);

        let alue = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(alue.value(1), "091");

        let tiedot = batch.column(2).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(tiedot.value(0), 5_563_970);

        let muutos = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(muutos.value(0), 0.2);
        assert!(muutos.is_null(1));
    }

    #[test]
    fn test_mixed_column_promoted_to_float() {
        let batch = parse_result(&json!({
            "columns": [{"code": "x", "type": "c"}],
            "data": [
                {"key": [], "values": ["1"]},
                {"key": [], "values": ["2,5"]},
                {"key": [], "values": ["-"]}
            ]
        }))
        .unwrap();

        let x = batch.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(x.value(0), 1.0);
        assert_eq!(x.value(1), 2.5);
        assert!(x.is_null(2));
    }

    #[test]
    fn test_row_length_mismatch() {
        let err = parse_result(&json!({
            "columns": [{"code": "Alue", "type": "d"}, {"code": "v", "type": "c"}],
            "data": [{"key": ["SSS", "extra"], "values": ["1"]}]
        }))
        .unwrap_err();
        assert!(matches!(err, PxError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let err = parse_result(&json!({"columns": []})).unwrap_err();
        assert!(matches!(err, PxError::MalformedResponse(_)));
    }

    #[test]
    fn test_empty_result() {
        let batch = parse_result(&json!({
            "columns": [{"code": "Alue", "type": "d"}, {"code": "v", "type": "c"}],
            "data": []
        }))
        .unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 2);
    }
}
