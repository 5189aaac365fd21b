//! On-disk memoization of query results
//!
//! Each cache id owns two files in the cache directory: `{id}.arrow` holds
//! the result as an Arrow IPC file and `{id}.meta` records the filters that
//! produced it. An entry is reused only when the requested filters equal the
//! recorded ones. There is no locking and no expiry.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};

use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::query::Filters;
use crate::{PxError, Result};

const DATA_EXTENSION: &str = "arrow";
const META_EXTENSION: &str = "meta";

/// Metadata artifact of a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Filters the cached result was produced with
    pub filters: Filters,
    pub stored_at: DateTime<Utc>,
}

/// Query result cache rooted at one directory
#[derive(Debug, Clone)]
pub struct QueryCache {
    dir: PathBuf,
}

impl QueryCache {
    /// Cache in `dir`; the directory is created on first store
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.cache_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached result for `id`, if it was stored with exactly these filters
    pub fn load(&self, id: &str, filters: &Filters) -> Result<Option<RecordBatch>> {
        let (data_path, meta_path) = self.paths(id)?;
        if !meta_path.is_file() || !data_path.is_file() {
            debug!(id, "Cache miss: no entry");
            return Ok(None);
        }

        let meta = match Self::read_meta(&meta_path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(id, error = %e, "Discarding unreadable cache metadata");
                return Ok(None);
            }
        };

        if meta.filters != *filters {
            debug!(id, "Cache miss: filters differ");
            return Ok(None);
        }

        match Self::read_data(&data_path) {
            Ok(Some(batch)) => {
                info!(id, rows = batch.num_rows(), stored_at = %meta.stored_at, "Cache hit");
                Ok(Some(batch))
            }
            Ok(None) => {
                warn!(id, "Discarding empty cache data file");
                Ok(None)
            }
            Err(e) => {
                warn!(id, error = %e, "Discarding unreadable cache data");
                Ok(None)
            }
        }
    }

    /// Store `batch` under `id`, replacing any previous entry
    pub fn store(&self, id: &str, batch: &RecordBatch, filters: &Filters) -> Result<()> {
        let (data_path, meta_path) = self.paths(id)?;
        fs::create_dir_all(&self.dir)?;

        // Metadata is written last so a half-written entry never matches
        if meta_path.exists() {
            fs::remove_file(&meta_path)?;
        }

        let file = BufWriter::new(File::create(&data_path)?);
        let mut writer = FileWriter::try_new(file, &batch.schema())?;
        writer.write(batch)?;
        writer.finish()?;

        let meta = CacheMeta {
            filters: filters.clone(),
            stored_at: Utc::now(),
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(&meta_path)?), &meta)?;

        info!(id, rows = batch.num_rows(), dir = %self.dir.display(), "Stored query result");
        Ok(())
    }

    /// Delete everything in the cache directory
    pub fn clear(&self) -> Result<()> {
        if !self.dir.is_dir() {
            return Ok(());
        }

        let mut removed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            removed += 1;
        }

        info!(dir = %self.dir.display(), removed, "Cleared query cache");
        Ok(())
    }

    /// Ids with a metadata file, sorted
    pub fn ids(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(META_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Metadata of the entry stored under `id`
    pub fn meta(&self, id: &str) -> Result<Option<CacheMeta>> {
        let (_, meta_path) = self.paths(id)?;
        if !meta_path.is_file() {
            return Ok(None);
        }
        Self::read_meta(&meta_path).map(Some)
    }

    fn paths(&self, id: &str) -> Result<(PathBuf, PathBuf)> {
        // A single plain file name, so entries stay inside the cache directory
        let mut components = Path::new(id).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain || id.contains(['/', '\\']) {
            return Err(PxError::InvalidCacheId(id.to_string()));
        }
        Ok((
            self.dir.join(format!("{id}.{DATA_EXTENSION}")),
            self.dir.join(format!("{id}.{META_EXTENSION}")),
        ))
    }

    fn read_meta(path: &Path) -> Result<CacheMeta> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    fn read_data(path: &Path) -> Result<Option<RecordBatch>> {
        let mut reader = FileReader::try_new(BufReader::new(File::open(path)?), None)?;
        reader.next().transpose().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_result;
    use serde_json::json;

    fn batch() -> RecordBatch {
        parse_result(&json!({
            "columns": [
                {"code": "Alue", "text": "Alue", "type": "d"},
                {"code": "vaesto", "text": "Väestö", "type": "c"},
                {"code": "osuus", "type": "c"}
            ],
            "data": [
                {"key": ["SSS"], "values": ["5 563 970", "100,0"]},
                {"key": ["091"], "values": ["", "11,9"]}
            ]
        }))
        .unwrap()
    }

    fn filters() -> Filters {
        Filters::new().with("Alue", ["SSS", "091"]).all("Tiedot")
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path().join("cache"));

        cache.store("test", &batch(), &filters()).unwrap();
        assert!(dir.path().join("cache/test.arrow").is_file());
        assert!(dir.path().join("cache/test.meta").is_file());

        let loaded = cache.load("test", &filters()).unwrap().unwrap();
        assert_eq!(loaded, batch());
    }

    #[test]
    fn test_different_filters_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        cache.store("test", &batch(), &filters()).unwrap();

        let other = Filters::new().with("Alue", ["SSS"]).all("Tiedot");
        assert!(cache.load("test", &other).unwrap().is_none());
        assert!(cache.load("unknown", &filters()).unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        cache.store("a", &batch(), &filters()).unwrap();
        cache.store("b.cached", &batch(), &filters()).unwrap();
        assert_eq!(cache.ids().unwrap(), vec!["a", "b.cached"]);

        cache.clear().unwrap();
        assert!(cache.load("a", &filters()).unwrap().is_none());
        assert!(cache.load("b.cached", &filters()).unwrap().is_none());
        assert!(cache.ids().unwrap().is_empty());
    }

    #[test]
    fn test_clear_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(QueryCache::new(dir.path().join("nope")).clear().is_ok());
    }

    #[test]
    fn test_store_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        let other = Filters::new().with("Alue", "SSS");

        cache.store("x", &batch(), &filters()).unwrap();
        cache.store("x", &batch(), &other).unwrap();

        assert!(cache.load("x", &filters()).unwrap().is_none());
        assert!(cache.load("x", &other).unwrap().is_some());
        assert_eq!(cache.meta("x").unwrap().unwrap().filters, other);
    }

    #[test]
    fn test_corrupt_meta_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        cache.store("x", &batch(), &filters()).unwrap();
        fs::write(dir.path().join("x.meta"), "not json").unwrap();

        assert!(cache.load("x", &filters()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ids() {
        let cache = QueryCache::new("unused");
        for id in ["", ".", "..", "../x", "a/b", "a/", "a\\b"] {
            assert!(matches!(cache.load(id, &filters()), Err(PxError::InvalidCacheId(_))));
        }
    }

    #[test]
    fn test_dots_inside_id_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());

        cache.store("v1..2", &batch(), &filters()).unwrap();
        assert!(dir.path().join("v1..2.arrow").is_file());
        assert_eq!(cache.load("v1..2", &filters()).unwrap().unwrap(), batch());
        assert_eq!(cache.ids().unwrap(), vec!["v1..2"]);
    }
}
