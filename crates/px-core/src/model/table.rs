//! Queryable PxWeb tables

use std::fmt;

use arrow::record_batch::RecordBatch;
use serde_json::Value as Json;
use tracing::{debug, info};

use super::variable::Variable;
use crate::cache::QueryCache;
use crate::query::{format_payload, parse_result, ExpandedFilters, Filters};
use crate::transport::Transport;
use crate::{PxError, Result};

/// One queryable dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    url: String,
    title: String,
    variables: Vec<Variable>,
}

impl Table {
    /// Build a table from an already fetched descriptor
    pub fn from_json(url: impl Into<String>, j: &Json) -> Result<Self> {
        let url = url.into();

        let title = j
            .get("title")
            .and_then(Json::as_str)
            .ok_or_else(|| PxError::malformed(format!("table {url} has no title")))?
            .to_string();

        let variables = j
            .get("variables")
            .and_then(Json::as_array)
            .ok_or_else(|| PxError::malformed(format!("table {url} has no variables")))?
            .iter()
            .map(Variable::from_json)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { url, title, variables })
    }

    /// Fetch the descriptor at `url`
    pub fn fetch(transport: &impl Transport, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let j = transport.get(&url)?;
        Self::from_json(url, &j)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Look up a variable by its exact code
    pub fn variable(&self, code: &str) -> Result<&Variable> {
        self.variables
            .iter()
            .find(|v| v.code == code)
            .ok_or_else(|| PxError::not_found("variable", code, &format!("table {}", self.url)))
    }

    /// Query the table.
    ///
    /// Wildcards are expanded against this table's variables before the
    /// request is sent.
    pub fn query(&self, transport: &impl Transport, filters: &Filters) -> Result<RecordBatch> {
        let expanded = filters.expand(self)?;
        let raw = self.query_raw(transport, &expanded)?;
        let batch = parse_result(&raw)?;
        info!(
            table = %self.url,
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "Query complete"
        );
        Ok(batch)
    }

    /// Query the table, reusing a cached result stored under `cache_id`
    /// when it was produced by identical filters.
    pub fn query_cached(
        &self,
        transport: &impl Transport,
        filters: &Filters,
        cache: &QueryCache,
        cache_id: &str,
    ) -> Result<RecordBatch> {
        if let Some(batch) = cache.load(cache_id, filters)? {
            return Ok(batch);
        }

        let batch = self.query(transport, filters)?;
        cache.store(cache_id, &batch, filters)?;
        Ok(batch)
    }

    /// POST already expanded filters and return the raw JSON response
    pub fn query_raw(&self, transport: &impl Transport, filters: &ExpandedFilters) -> Result<Json> {
        debug!(table = %self.url, variables = filters.len(), "Sending query");
        transport.post(&self.url, &format_payload(filters)?)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "url: {}", self.url)?;
        writeln!(f, "title: {}", self.title)?;
        if self.variables.is_empty() {
            return writeln!(f, "variables: (none)");
        }
        writeln!(f, "variables:")?;
        let width = self.variables.iter().map(|v| v.code.chars().count()).max().unwrap_or(0);
        for variable in &self.variables {
            writeln!(f, "  {:<width$} {}", variable.code, variable.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::key_columns;
    use crate::transport::mock::MockTransport;
    use arrow::array::{Array, StringArray};
    use serde_json::json;

    const URL: &str = "http://px/StatFin/tyokay/statfin_tyokay_pxt_115b.px";

    fn descriptor() -> Json {
        json!({
            "title": "Väestö pääasiallisen toiminnan mukaan",
            "variables": [
                {"code": "Alue", "text": "Alue", "values": ["SSS", "091"], "valueTexts": ["KOKO MAA", "Helsinki"]},
                {"code": "Sukupuoli", "text": "Sukupuoli", "values": ["SSS", "1", "2"], "valueTexts": ["Yhteensä", "Miehet", "Naiset"]},
                {"code": "Tiedot", "text": "Tiedot", "values": ["vaesto"], "valueTexts": ["Väestö"]}
            ]
        })
    }

    fn response() -> Json {
        json!({
            "columns": [
                {"code": "Alue", "text": "Alue", "type": "d"},
                {"code": "Sukupuoli", "text": "Sukupuoli", "type": "d"},
                {"code": "vaesto", "text": "Väestö", "type": "c"}
            ],
            "data": [
                {"key": ["SSS", "1"], "values": ["2 768 446"]},
                {"key": ["SSS", "2"], "values": ["2 795 524"]}
            ]
        })
    }

    #[test]
    fn test_from_json() {
        let table = Table::from_json(URL, &descriptor()).unwrap();
        assert_eq!(table.title(), "Väestö pääasiallisen toiminnan mukaan");
        assert_eq!(table.variables().len(), 3);
        assert_eq!(table.variable("Alue").unwrap().value("SSS").unwrap().text, "KOKO MAA");
    }

    #[test]
    fn test_variable_lookup_is_exact() {
        let table = Table::from_json(URL, &descriptor()).unwrap();
        assert!(matches!(table.variable("Alu"), Err(PxError::NotFound { kind: "variable", .. })));
    }

    #[test]
    fn test_missing_variables_is_malformed() {
        let err = Table::from_json(URL, &json!({"title": "x"})).unwrap_err();
        assert!(matches!(err, PxError::MalformedResponse(_)));
    }

    #[test]
    fn test_fetch() {
        let transport = MockTransport::new().with_get(URL, descriptor());
        let table = Table::fetch(&transport, URL).unwrap();
        assert_eq!(table.url(), URL);
        assert_eq!(transport.count("GET", URL), 1);
    }

    #[test]
    fn test_query_expands_wildcards_before_sending() {
        let transport = MockTransport::new().with_post(URL, response());
        let table = Table::from_json(URL, &descriptor()).unwrap();

        table
            .query(&transport, &Filters::new().with("Alue", "SSS").all("Sukupuoli"))
            .unwrap();

        let bodies = transport.posted_bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["query"][0]["selection"]["values"], json!(["SSS"]));
        assert_eq!(bodies[0]["query"][1]["selection"]["values"], json!(["SSS", "1", "2"]));
        assert_eq!(bodies[0]["response"]["format"], "json");
    }

    #[test]
    fn test_query_scenario() {
        let transport = MockTransport::new().with_post(URL, response());
        let table = Table::from_json(URL, &descriptor()).unwrap();

        let batch = table
            .query(&transport, &Filters::new().with("Alue", "SSS").with("Sukupuoli", [1, 2]))
            .unwrap();

        assert_eq!(key_columns(&batch), vec!["Alue", "Sukupuoli"]);
        let alue = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        let sukupuoli = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        let rows: Vec<_> = (0..batch.num_rows())
            .map(|i| (alue.value(i), sukupuoli.value(i)))
            .collect();
        assert_eq!(rows, vec![("SSS", "1"), ("SSS", "2")]);
    }

    #[test]
    fn test_query_cached_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        let transport = MockTransport::new().with_post(URL, response());
        let table = Table::from_json(URL, &descriptor()).unwrap();
        let filters = Filters::new().with("Alue", "SSS").all("Sukupuoli");

        let first = table.query_cached(&transport, &filters, &cache, "vaesto").unwrap();
        let second = table.query_cached(&transport, &filters, &cache, "vaesto").unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.count("POST", URL), 1);

        // Different filters under the same id go to the network again
        let other = Filters::new().with("Alue", "091").all("Sukupuoli");
        table.query_cached(&transport, &other, &cache, "vaesto").unwrap();
        assert_eq!(transport.count("POST", URL), 2);
    }

    #[test]
    fn test_display_lists_variables() {
        let text = Table::from_json(URL, &descriptor()).unwrap().to_string();
        assert!(text.contains("  Alue      Alue\n"));
        assert!(text.contains("  Sukupuoli Sukupuoli\n"));
    }
}
