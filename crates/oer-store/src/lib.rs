//! Durable record sinks for resolved OER sites.
//!
//! A resolution pass never reads from the store. After the pass succeeds its
//! rows are handed to a [`RecordSink`], which upserts them keyed by the
//! ancestor slug chain (content) or referencing page (assets).
//!
//! # Implementations
//!
//! - [`NullSink`]: discards everything (store disabled)
//! - [`MemorySink`]: in-process tables, useful for tests and embedding
//! - [`JsonFileSink`]: `content.json` / `files.json` under a directory
//!
//! # Example
//!
//! ```
//! use oer_store::{ContentRow, MemorySink, RecordSink};
//!
//! let sink = MemorySink::default();
//! let row = ContentRow {
//!     key: "about".to_owned(),
//!     id: 3,
//!     title: "About".to_owned(),
//!     source_path: Some("about.md".to_owned()),
//!     output_path: "about/about.html".to_owned(),
//!     parent_output_path: String::new(),
//!     parent_slug: None,
//!     slug: "about".to_owned(),
//!     is_section_index: false,
//!     level: 0,
//!     menu_context: vec!["main".to_owned()],
//!     export_types: vec![],
//! };
//! sink.upsert_content(&[row])?;
//! assert_eq!(sink.content().len(), 1);
//! # Ok::<(), oer_store::StoreError>(())
//! ```

mod file;
mod memory;
mod row;

pub use file::JsonFileSink;
pub use memory::MemorySink;
pub use row::{AssetRow, ContentRow};

use std::path::PathBuf;

/// Error returned by durable sinks.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("Store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Stored table could not be (de)serialized.
    #[error("Store JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Destination for resolved rows.
///
/// Upserts replace rows with the same key and leave all other rows intact.
pub trait RecordSink: Send + Sync {
    /// Upsert content rows keyed by [`ContentRow::key`].
    fn upsert_content(&self, rows: &[ContentRow]) -> Result<(), StoreError>;

    /// Upsert asset rows keyed by [`AssetRow::key`].
    fn upsert_assets(&self, rows: &[AssetRow]) -> Result<(), StoreError>;
}

/// No-op [`RecordSink`]. Used when the store is disabled.
pub struct NullSink;

impl RecordSink for NullSink {
    fn upsert_content(&self, _rows: &[ContentRow]) -> Result<(), StoreError> {
        Ok(())
    }

    fn upsert_assets(&self, _rows: &[AssetRow]) -> Result<(), StoreError> {
        Ok(())
    }
}
