//! `_content.yml` parsing and flattening.
//!
//! The manifest is parsed with `serde_yaml` into loosely-shaped entries, then
//! walked once in declaration order. The walk inherits menu contexts and
//! export settings from parent to child, designates the site root, and
//! produces one [`ContentRecord`] per entry in pre-order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::record::{ContentRecord, ExportConfig, ParentRef};

/// Error returned when a manifest cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file could not be read.
    #[error("Failed to read manifest {}: {source}", path.display())]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Manifest is not valid YAML or has the wrong shape.
    #[error("Invalid manifest YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Manifest parsed but violates a structural rule.
    #[error("Invalid manifest: {0}")]
    Validation(String),
}

/// Parsed and flattened manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Records in declaration order.
    pub records: Vec<ContentRecord>,
    /// Site-wide export defaults.
    pub export: ExportConfig,
}

/// Raw manifest as parsed from YAML. Unknown top-level keys (`site`,
/// `footer`, ...) belong to other collaborators and are ignored.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ManifestRaw {
    export: Option<ExportRaw>,
    toc: Vec<EntryRaw>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EntryRaw {
    title: Option<String>,
    file: Option<String>,
    slug: Option<String>,
    children: Vec<EntryRaw>,
    menu_context: Option<MenuContexts>,
    menu: Option<bool>,
    export: Option<ExportRaw>,
    section_index: Option<bool>,
    root: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MenuContexts {
    One(String),
    Many(Vec<String>),
}

impl MenuContexts {
    fn to_set(&self) -> BTreeSet<String> {
        match self {
            Self::One(menu) => BTreeSet::from([menu.clone()]),
            Self::Many(menus) => menus.iter().cloned().collect(),
        }
    }
}

#[derive(Deserialize, Default, Clone)]
#[serde(default)]
struct ExportRaw {
    types: Option<Vec<String>>,
    force: Option<bool>,
    custom_label: Option<String>,
    output_path: Option<String>,
}

impl ExportConfig {
    /// Overlay a raw export block on inherited settings.
    fn merged(&self, local: Option<&ExportRaw>) -> Self {
        let Some(local) = local else {
            return self.clone();
        };
        Self {
            types: local.types.clone().unwrap_or_else(|| self.types.clone()),
            force: local.force.unwrap_or(self.force),
            custom_label: local
                .custom_label
                .clone()
                .or_else(|| self.custom_label.clone()),
            output_path: local
                .output_path
                .clone()
                .or_else(|| self.output_path.clone()),
        }
    }
}

/// Settings inherited by an entry from its parent.
struct Inherited<'a> {
    parent: Option<ParentRef>,
    menus: &'a BTreeSet<String>,
    export: &'a ExportConfig,
}

/// Loads `_content.yml` manifests into [`ContentRecord`]s.
#[derive(Clone, Debug)]
pub struct ManifestLoader {
    root_slug: String,
    default_menu: String,
    content_dir: Option<PathBuf>,
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self::new("main", "main")
    }
}

impl ManifestLoader {
    /// Create a loader.
    ///
    /// # Arguments
    ///
    /// * `root_slug` - Reserved slug designating the site root when no entry
    ///   sets `root: true`
    /// * `default_menu` - Menu context for top-level entries that declare none
    #[must_use]
    pub fn new(root_slug: impl Into<String>, default_menu: impl Into<String>) -> Self {
        Self {
            root_slug: root_slug.into(),
            default_menu: default_menu.into(),
            content_dir: None,
        }
    }

    /// Look for section landing pages under `content_dir`.
    ///
    /// A file-less entry with children picks up `<content_dir>/<slug>/_index.md`
    /// as its source when that file exists. The slug is the declared one or
    /// is derived from the title.
    #[must_use]
    pub fn with_content_dir(mut self, content_dir: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(content_dir.into());
        self
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Io` if the file cannot be read, otherwise the
    /// errors of [`parse`](Self::parse).
    pub fn load(&self, path: &Path) -> Result<Manifest, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = self.parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            records = manifest.records.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Parse manifest YAML.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Parse` for malformed YAML and
    /// `ManifestError::Validation` for entries without a title or file, empty
    /// file paths, nested or repeated `root: true` flags.
    pub fn parse(&self, yaml: &str) -> Result<Manifest, ManifestError> {
        let raw: ManifestRaw = if yaml.trim().is_empty() {
            ManifestRaw::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        let export = ExportConfig::default().merged(raw.export.as_ref());
        let menus = BTreeSet::from([self.default_menu.clone()]);

        let mut records = Vec::new();
        let inherited = Inherited {
            parent: None,
            menus: &menus,
            export: &export,
        };
        self.walk(&raw.toc, &inherited, &mut records)?;
        self.designate_root(&mut records)?;

        Ok(Manifest { records, export })
    }

    /// Flatten entries depth-first, assigning declaration order.
    fn walk(
        &self,
        entries: &[EntryRaw],
        inherited: &Inherited<'_>,
        records: &mut Vec<ContentRecord>,
    ) -> Result<(), ManifestError> {
        for entry in entries {
            let order = records.len();
            let source_path = match entry.file.as_deref() {
                Some(file) => Some(normalize_source_path(file, order)?),
                None if !entry.children.is_empty() => self.section_landing_page(entry),
                None => None,
            };

            let title = match (&entry.title, &source_path) {
                (Some(title), _) => title.clone(),
                (None, Some(path)) => title_from_path(path),
                (None, None) => {
                    return Err(ManifestError::Validation(format!(
                        "toc entry #{order} has neither a title nor a file"
                    )));
                }
            };

            if entry.root && inherited.parent.is_some() {
                return Err(ManifestError::Validation(format!(
                    "toc entry #{order} ('{title}') is marked as root but is not top-level"
                )));
            }

            let menus = match (&entry.menu_context, entry.menu) {
                (_, Some(false)) => BTreeSet::new(),
                (Some(declared), _) => declared.to_set(),
                (None, _) => inherited.menus.clone(),
            };
            let export = inherited.export.merged(entry.export.as_ref());

            let is_section_index = entry.section_index.unwrap_or(false)
                || source_path
                    .as_deref()
                    .is_some_and(|path| file_name(path) == "_index.md");

            // Declaration order is exact; a slug could match an unrelated node.
            let parent_for_children = match &source_path {
                Some(path) => ParentRef::Path(path.clone()),
                None => ParentRef::Declaration(order),
            };

            records.push(ContentRecord {
                source_path,
                title,
                slug: entry.slug.clone(),
                parent: inherited.parent.clone(),
                is_root: entry.root,
                is_section_index,
                menu_contexts: menus.clone(),
                export: export.clone(),
                declaration_order: order,
            });

            if !entry.children.is_empty() {
                let child_inherited = Inherited {
                    parent: Some(parent_for_children),
                    menus: &menus,
                    export: &export,
                };
                self.walk(&entry.children, &child_inherited, records)?;
            }
        }
        Ok(())
    }

    /// Existing `_index.md` for a file-less section, relative to the content dir.
    fn section_landing_page(&self, entry: &EntryRaw) -> Option<String> {
        let content_dir = self.content_dir.as_ref()?;
        let dir = match &entry.slug {
            Some(slug) => slug.clone(),
            None => dir_name_from_title(entry.title.as_deref()?),
        };
        if dir.is_empty() {
            return None;
        }

        let candidate = format!("{dir}/_index.md");
        if !content_dir.join(&candidate).is_file() {
            return None;
        }
        tracing::debug!(section = %dir, file = %candidate, "Using section landing page");
        Some(candidate)
    }

    /// Designate the site root.
    ///
    /// An explicit `root: true` wins. Otherwise the first top-level entry
    /// declaring the reserved slug becomes the root; later entries declaring
    /// it are left for the content graph to guard.
    fn designate_root(&self, records: &mut [ContentRecord]) -> Result<(), ManifestError> {
        let explicit: Vec<usize> = records
            .iter()
            .filter(|r| r.is_root)
            .map(|r| r.declaration_order)
            .collect();

        match explicit.as_slice() {
            [] => {
                if let Some(record) = records.iter_mut().find(|r| {
                    r.parent.is_none() && r.slug.as_deref() == Some(self.root_slug.as_str())
                }) {
                    tracing::debug!(record = %record.label(), "Designated site root by slug");
                    record.is_root = true;
                }
                Ok(())
            }
            [_] => Ok(()),
            [first, second, ..] => Err(ManifestError::Validation(format!(
                "toc entries #{first} and #{second} are both marked as root"
            ))),
        }
    }
}

/// Directory name for a title: lowercase alphanumeric runs joined by `-`.
fn dir_name_from_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Normalize a declared file path to a content-relative, `/`-separated path.
fn normalize_source_path(file: &str, order: usize) -> Result<String, ManifestError> {
    let mut path = file.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_owned();
    }
    if let Some(rest) = path.strip_prefix("content/") {
        path = rest.to_owned();
    }
    let path = path.trim_start_matches('/').to_owned();

    if path.is_empty() || path.ends_with('/') {
        return Err(ManifestError::Validation(format!(
            "toc entry #{order} has an invalid file path {file:?}"
        )));
    }
    Ok(path)
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Derive a display title from a file path: stem with dashes and
/// underscores as spaces.
fn title_from_path(path: &str) -> String {
    let name = file_name(path);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    stem.trim_start_matches('_').replace(['-', '_'], " ")
}
