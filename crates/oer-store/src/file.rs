//! JSON-file sink.
//!
//! [`JsonFileSink`] keeps one JSON array per table under a directory:
//!
//! ```text
//! {dir}/
//! +-- content.json   # ContentRow[], ordered by key
//! +-- files.json     # AssetRow[], ordered by key
//! ```
//!
//! An upsert reads the existing table, merges rows by key and rewrites the
//! file through a temporary sibling followed by a rename, so readers never
//! observe a half-written table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AssetRow, ContentRow, RecordSink, StoreError};

const CONTENT_TABLE: &str = "content.json";
const ASSET_TABLE: &str = "files.json";

/// [`RecordSink`] persisting tables as JSON files in a directory.
pub struct JsonFileSink {
    dir: PathBuf,
    // Serializes read-merge-write cycles from concurrent callers.
    lock: Mutex<()>,
}

impl JsonFileSink {
    /// Create a sink writing into `dir`. The directory is created lazily on
    /// the first upsert.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    /// Directory holding the tables.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read all stored content rows.
    pub fn read_content(&self) -> Result<Vec<ContentRow>, StoreError> {
        read_table(&self.dir.join(CONTENT_TABLE))
    }

    /// Read all stored asset rows.
    pub fn read_assets(&self) -> Result<Vec<AssetRow>, StoreError> {
        read_table(&self.dir.join(ASSET_TABLE))
    }

    fn upsert<T, K>(&self, table: &str, rows: &[T], key: K) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Clone,
        K: Fn(&T) -> String,
    {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.dir.join(table);

        let mut merged: BTreeMap<String, T> = read_table(&path)?
            .into_iter()
            .map(|row| (key(&row), row))
            .collect();
        for row in rows {
            merged.insert(key(row), row.clone());
        }

        let rows: Vec<&T> = merged.values().collect();
        write_table(&path, &rows)?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "Wrote store table");
        Ok(())
    }
}

impl RecordSink for JsonFileSink {
    fn upsert_content(&self, rows: &[ContentRow]) -> Result<(), StoreError> {
        self.upsert(CONTENT_TABLE, rows, |row| row.key.clone())
    }

    fn upsert_assets(&self, rows: &[AssetRow]) -> Result<(), StoreError> {
        self.upsert(ASSET_TABLE, rows, AssetRow::key)
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(rows).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
