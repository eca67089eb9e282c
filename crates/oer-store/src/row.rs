//! Flat row projections of resolved nodes and assets.

use serde::{Deserialize, Serialize};

/// One resolved content node, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRow {
    /// Upsert key: ancestor slug chain joined with `/`.
    pub key: String,
    /// Node id within the pass that produced the row.
    pub id: usize,
    pub title: String,
    pub source_path: Option<String>,
    pub output_path: String,
    /// Empty for top-level nodes.
    pub parent_output_path: String,
    pub parent_slug: Option<String>,
    pub slug: String,
    pub is_section_index: bool,
    pub level: usize,
    /// Menu contexts, sorted.
    pub menu_context: Vec<String>,
    pub export_types: Vec<String>,
}

/// One asset referenced by a page, as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRow {
    pub filename: String,
    pub extension: String,
    pub mime_type: String,
    pub is_remote: bool,
    /// Remote URL; `None` for local assets.
    pub url: Option<String>,
    /// Output path of the referencing page.
    pub referenced_page: String,
    /// Path as written in the source document.
    pub relative_path: String,
    /// Output location for local assets; `None` for remote ones.
    pub output_path: Option<String>,
}

impl AssetRow {
    /// Upsert key: the referencing page plus the declared path.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}#{}", self.referenced_page, self.relative_path)
    }
}
