//! In-memory sink.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::{AssetRow, ContentRow, RecordSink, StoreError};

/// [`RecordSink`] holding rows in process memory.
#[derive(Default)]
pub struct MemorySink {
    content: RwLock<BTreeMap<String, ContentRow>>,
    assets: RwLock<BTreeMap<String, AssetRow>>,
}

impl MemorySink {
    /// Snapshot of stored content rows, ordered by key.
    #[must_use]
    pub fn content(&self) -> Vec<ContentRow> {
        let table = self.content.read().unwrap_or_else(PoisonError::into_inner);
        table.values().cloned().collect()
    }

    /// Snapshot of stored asset rows, ordered by key.
    #[must_use]
    pub fn assets(&self) -> Vec<AssetRow> {
        let table = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        table.values().cloned().collect()
    }
}

impl RecordSink for MemorySink {
    fn upsert_content(&self, rows: &[ContentRow]) -> Result<(), StoreError> {
        let mut table = self
            .content
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for row in rows {
            table.insert(row.key.clone(), row.clone());
        }
        Ok(())
    }

    fn upsert_assets(&self, rows: &[AssetRow]) -> Result<(), StoreError> {
        let mut table = self
            .assets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for row in rows {
            table.insert(row.key(), row.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(key: &str, title: &str) -> ContentRow {
        ContentRow {
            key: key.to_owned(),
            id: 0,
            title: title.to_owned(),
            source_path: None,
            output_path: format!("{key}/index.html"),
            parent_output_path: String::new(),
            parent_slug: None,
            slug: key.to_owned(),
            is_section_index: true,
            level: 0,
            menu_context: vec![],
            export_types: vec![],
        }
    }

    #[test]
    fn test_upsert_replaces_same_key_and_keeps_others() {
        let sink = MemorySink::default();
        sink.upsert_content(&[row("a", "A"), row("b", "B")]).unwrap();
        sink.upsert_content(&[row("a", "A2")]).unwrap();

        let titles: Vec<String> = sink.content().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["A2", "B"]);
    }

    #[test]
    fn test_asset_upsert_keyed_by_page_and_path() {
        let sink = MemorySink::default();
        let asset = AssetRow {
            filename: "fig.png".to_owned(),
            extension: "png".to_owned(),
            mime_type: "image/png".to_owned(),
            is_remote: false,
            url: None,
            referenced_page: "a/a.html".to_owned(),
            relative_path: "img/fig.png".to_owned(),
            output_path: Some("a/files/fig.png".to_owned()),
        };
        let mut other_page = asset.clone();
        other_page.referenced_page = "b/b.html".to_owned();

        sink.upsert_assets(&[asset.clone(), other_page]).unwrap();
        sink.upsert_assets(&[asset]).unwrap();

        assert_eq!(sink.assets().len(), 2);
    }

    #[test]
    fn test_snapshot_survives_poisoned_lock() {
        let sink = std::sync::Arc::new(MemorySink::default());
        sink.upsert_content(&[row("a", "A")]).unwrap();

        let writer = std::sync::Arc::clone(&sink);
        let result = std::thread::spawn(move || {
            let _table = writer.content.write().unwrap();
            panic!("writer failed while holding the lock");
        })
        .join();

        assert!(result.is_err());
        assert!(sink.content.is_poisoned());
        assert_eq!(sink.content().len(), 1);
        sink.upsert_content(&[row("b", "B")]).unwrap();
        assert_eq!(sink.content().len(), 2);
    }
}
