//! Configuration management for OER site builds.
//!
//! Parses `oer.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ## Path Expansion
//!
//! Path values support `~` and environment variable expansion:
//!
//! - `~/dir` - expands to the home directory
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.content_dir`
//! - `site.build_dir`
//! - `site.manifest`
//! - `store.dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "oer.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site layout (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Resolution settings shared by every component of a resolution pass.
    pub resolve: ResolveConfig,
    /// Durable store settings (paths are relative strings from TOML).
    store: StoreConfigRaw,

    /// Resolved site layout (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Resolved store configuration (set after loading).
    #[serde(skip)]
    pub store_resolved: StoreConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw site layout as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    content_dir: Option<String>,
    build_dir: Option<String>,
    manifest: Option<String>,
}

/// Resolved site layout with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// Directory holding the source documents.
    pub content_dir: PathBuf,
    /// Directory the compiled output tree is written to.
    pub build_dir: PathBuf,
    /// Path to the table-of-contents manifest (`_content.yml`).
    pub manifest_path: PathBuf,
}

/// Resolution settings.
///
/// Consumed by the content graph, path resolver and link rewriter. No value
/// here is process-wide: every resolution pass receives its own copy.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolveConfig {
    /// Slug reserved for the designated site root.
    pub root_slug: String,
    /// Output directory of the site root page.
    ///
    /// `None` uses the root document's filename-derived slug; an empty
    /// string places the root page at the top of the build tree.
    pub root_dir: Option<String>,
    /// Extension of compiled pages (without the dot).
    pub target_extension: String,
    /// Name of the section-local asset directory beside each page.
    pub assets_dir: String,
    /// Menu context assigned to top-level entries that declare none.
    pub default_menu: String,
    /// Reject non-root nodes declaring the reserved root slug instead of
    /// falling back to a filename-derived slug.
    pub strict_root_slug: bool,
    /// Extensions of source documents that link targets may point to.
    pub document_extensions: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            root_slug: "main".to_owned(),
            root_dir: None,
            target_extension: "html".to_owned(),
            assets_dir: "files".to_owned(),
            default_menu: "main".to_owned(),
            strict_root_slug: false,
            document_extensions: ["md", "ipynb", "docx", "tex"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// Raw store configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved durable store configuration.
#[derive(Debug, Default)]
pub struct StoreConfig {
    /// Whether resolved records are written to the store.
    pub enabled: bool,
    /// Directory holding the store files.
    pub dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.build_dir`").
        field: String,
        /// Error message (e.g., "${`BUILD_ROOT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a value usable as a single path segment.
fn require_segment(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(ConfigError::Validation(format!(
            "{field} must be a single path segment, got {value:?}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `oer.toml` in current directory and parents,
    /// falling back to defaults relative to the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let cwd = std::env::current_dir()?;
        match discover_config(&cwd) {
            Some(discovered) => Self::load_from_file(&discovered),
            None => {
                tracing::debug!(dir = %cwd.display(), "No oer.toml found, using defaults");
                Ok(Self::default_with_base(&cwd))
            }
        }
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfigRaw::default(),
            resolve: ResolveConfig::default(),
            store: StoreConfigRaw::default(),
            site_resolved: SiteConfig {
                content_dir: base.join("content"),
                build_dir: base.join("build"),
                manifest_path: base.join("_content.yml"),
            },
            store_resolved: StoreConfig {
                enabled: true,
                dir: base.join("db"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand before resolving against the config directory
        config.expand_paths()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let resolve = &self.resolve;

        require_non_empty(&resolve.root_slug, "resolve.root_slug")?;
        require_segment(&resolve.root_slug, "resolve.root_slug")?;
        if let Some(root_dir) = &resolve.root_dir {
            require_segment(root_dir, "resolve.root_dir")?;
        }

        require_non_empty(&resolve.target_extension, "resolve.target_extension")?;
        if resolve.target_extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "resolve.target_extension must not start with a dot".to_owned(),
            ));
        }
        require_segment(&resolve.target_extension, "resolve.target_extension")?;

        require_non_empty(&resolve.assets_dir, "resolve.assets_dir")?;
        require_segment(&resolve.assets_dir, "resolve.assets_dir")?;
        require_non_empty(&resolve.default_menu, "resolve.default_menu")?;

        if resolve
            .document_extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigError::Validation(
                "resolve.document_extensions entries must be non-empty and have no leading dot"
                    .to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand `~` and environment variable references in path strings.
    fn expand_paths(&mut self) -> Result<(), ConfigError> {
        let expand = |value: &mut Option<String>, field: &str| -> Result<(), ConfigError> {
            if let Some(raw) = value.as_deref() {
                *value = Some(expand::expand_path(raw, field)?);
            }
            Ok(())
        };

        expand(&mut self.site.content_dir, "site.content_dir")?;
        expand(&mut self.site.build_dir, "site.build_dir")?;
        expand(&mut self.site.manifest, "site.manifest")?;
        expand(&mut self.store.dir, "store.dir")?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.site_resolved = SiteConfig {
            content_dir: resolve(self.site.content_dir.as_deref(), "content"),
            build_dir: resolve(self.site.build_dir.as_deref(), "build"),
            manifest_path: resolve(self.site.manifest.as_deref(), "_content.yml"),
        };

        self.store_resolved = StoreConfig {
            enabled: self.store.enabled.unwrap_or(true),
            dir: resolve(self.store.dir.as_deref(), "db"),
        };
    }
}

/// Search for config file in `start` and its parents.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
