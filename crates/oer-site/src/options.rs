//! Per-pass resolution context.

use oer_config::ResolveConfig;

/// Settings threaded explicitly through every resolution component.
///
/// Built once per pass from [`ResolveConfig`]; nothing here outlives the
/// pass that owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Slug reserved for the designated site root.
    pub root_slug: String,
    /// Output directory of the site root. `None` derives it from the root's
    /// filename; `Some("")` places the root page at the top of the tree.
    pub root_dir: Option<String>,
    /// Extension of compiled pages, without the dot.
    pub target_extension: String,
    /// Section-local asset directory name.
    pub assets_dir: String,
    /// Menu used when a page belongs to no explicit menu.
    pub default_menu: String,
    /// Treat a non-root node declaring the reserved slug as fatal.
    pub strict_root_slug: bool,
    /// Lowercase source document extensions.
    pub document_extensions: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from_config(&ResolveConfig::default())
    }
}

impl From<&ResolveConfig> for ResolveOptions {
    fn from(config: &ResolveConfig) -> Self {
        Self::from_config(config)
    }
}

impl ResolveOptions {
    /// Build options from the `[resolve]` config section.
    #[must_use]
    pub fn from_config(config: &ResolveConfig) -> Self {
        Self {
            root_slug: config.root_slug.clone(),
            root_dir: config
                .root_dir
                .as_ref()
                .map(|dir| dir.trim_matches('/').to_owned()),
            target_extension: config.target_extension.clone(),
            assets_dir: config.assets_dir.clone(),
            default_menu: config.default_menu.clone(),
            strict_root_slug: config.strict_root_slug,
            document_extensions: config
                .document_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `extension` names a source document format.
    #[must_use]
    pub fn is_document(&self, extension: &str) -> bool {
        self.document_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// File name of a compiled page with the given stem.
    #[must_use]
    pub(crate) fn page_file(&self, stem: &str) -> String {
        format!("{stem}.{}", self.target_extension)
    }
}
