//! Validated content records.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Reference from a record to its declared parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ParentRef {
    /// Parent identified by its content-relative source path.
    Path(String),
    /// Parent identified by its declared slug. Only for hand-built records;
    /// the manifest loader never emits it.
    Slug(String),
    /// Parent identified by its position in the manifest (file-less entries).
    Declaration(usize),
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{path}"),
            Self::Slug(slug) => write!(f, "slug '{slug}'"),
            Self::Declaration(order) => write!(f, "manifest entry #{order}"),
        }
    }
}

/// Export settings for the conversion collaborator.
///
/// Merged from the global `export` block down through every ancestor entry;
/// the closest declaration wins per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportConfig {
    /// Requested output formats (e.g. `pdf`, `docx`).
    pub types: Vec<String>,
    /// Re-export even when outputs are fresh.
    pub force: bool,
    /// Label shown next to export links.
    pub custom_label: Option<String>,
    /// Output path template for exported files.
    pub output_path: Option<String>,
}

/// One document (or pure grouping section) declared in the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentRecord {
    /// Source path relative to the content directory, `/`-separated.
    /// `None` for sections declared without a file.
    pub source_path: Option<String>,
    /// Display title.
    pub title: String,
    /// Explicitly declared slug.
    pub slug: Option<String>,
    /// Declared parent, `None` for top-level entries.
    pub parent: Option<ParentRef>,
    /// True for the single designated site root.
    pub is_root: bool,
    /// True when the entry is declared as a section landing page.
    pub is_section_index: bool,
    /// Named menus this entry participates in.
    pub menu_contexts: BTreeSet<String>,
    /// Effective export settings.
    pub export: ExportConfig,
    /// Position in the manifest (pre-order).
    pub declaration_order: usize,
}

impl ContentRecord {
    /// Create a top-level record with no menus.
    #[must_use]
    pub fn new(declaration_order: usize, title: impl Into<String>) -> Self {
        Self {
            source_path: None,
            title: title.into(),
            slug: None,
            parent: None,
            is_root: false,
            is_section_index: false,
            menu_contexts: BTreeSet::new(),
            export: ExportConfig::default(),
            declaration_order,
        }
    }

    /// Set the source path.
    #[must_use]
    pub fn with_source(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Declare a slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Declare a parent.
    #[must_use]
    pub fn with_parent(mut self, parent: ParentRef) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a menu context.
    #[must_use]
    pub fn with_menu(mut self, menu: impl Into<String>) -> Self {
        self.menu_contexts.insert(menu.into());
        self
    }

    /// Mark as the designated site root.
    #[must_use]
    pub fn as_root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Mark as a section landing page.
    #[must_use]
    pub fn as_section_index(mut self) -> Self {
        self.is_section_index = true;
        self
    }

    /// Human-readable identifier used in diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.source_path, &self.slug) {
            (Some(path), _) => path.clone(),
            (None, Some(slug)) => format!("section '{slug}'"),
            (None, None) => format!("'{}' (entry #{})", self.title, self.declaration_order),
        }
    }
}
