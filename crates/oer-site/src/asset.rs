//! Asset references and the section-local asset index.
//!
//! Local assets of a page are published beside its output file, in the
//! configured asset directory:
//!
//! ```text
//! sample-resources/newton/
//! +-- newton.html
//! +-- files/
//!     +-- fig.png
//! ```

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde::Serialize;

use crate::error::{Diagnostic, DiagnosticKind, StructuralError};
use crate::graph::NodeId;
use crate::links::{self, LinkKind};
use crate::options::ResolveOptions;
use crate::resolver::ResolvedGraph;
use crate::scan;

/// A file or remote URL mentioned in a page body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    pub filename: String,
    /// Lowercase extension, empty when the name has none.
    pub extension: String,
    pub mime_type: String,
    /// Fetched over HTTP(S) rather than shipped with the site.
    pub is_remote: bool,
    pub referencing_node: NodeId,
    /// Path or URL exactly as written in the source, without query or
    /// fragment.
    pub relative_path: String,
}

impl AssetReference {
    /// Describe the asset `declared` in the body of `node`.
    ///
    /// Returns `None` for targets that name no file (fragments, bare
    /// directories, non-HTTP schemes such as `data:`).
    #[must_use]
    pub fn new(node: NodeId, declared: &str) -> Option<Self> {
        let (path, _) = links::split_suffix(declared.trim());
        let is_remote = match LinkKind::parse(path) {
            LinkKind::External(url) if LinkKind::is_http(url) => true,
            LinkKind::SiteRoot(_) | LinkKind::FileRelative(_) => false,
            _ => return None,
        };

        let decoded = decode(path);
        let url_path = if is_remote {
            url_path(&decoded)
        } else {
            decoded.as_str()
        };
        let filename = url_path.rsplit('/').find(|s| !s.is_empty())?.to_owned();
        if !is_remote && matches!(filename.as_str(), "." | "..") {
            return None;
        }
        let extension = links::extension(&filename).unwrap_or_default();

        Some(Self {
            mime_type: mime_type(&extension).to_owned(),
            filename,
            extension,
            is_remote,
            referencing_node: node,
            relative_path: path.to_owned(),
        })
    }

    /// Lookup key within the referencing node.
    fn key(&self) -> String {
        if self.is_remote {
            self.relative_path.clone()
        } else {
            local_key(&decode(&self.relative_path))
        }
    }
}

/// Scan a page body for the assets it references.
///
/// Collects every image (markdown or `<img>`, remote ones flagged) and every
/// local link or `src` whose extension is neither a source document nor
/// HTML. Each declared path is reported once per page.
#[must_use]
pub fn extract_assets(node: NodeId, body: &str, options: &ResolveOptions) -> Vec<AssetReference> {
    let mut seen = std::collections::HashSet::new();
    scan::references(body)
        .into_iter()
        .filter_map(|reference| {
            let asset = AssetReference::new(node, reference.target)?;
            let wanted = reference.syntax.is_image()
                || (!asset.is_remote
                    && !asset.extension.is_empty()
                    && !options.is_document(&asset.extension)
                    && !matches!(asset.extension.as_str(), "html" | "htm"));
            (wanted && seen.insert(asset.relative_path.clone())).then_some(asset)
        })
        .collect()
}

/// An asset with its publish location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexedAsset {
    pub reference: AssetReference,
    /// Build-relative output path; `None` for remote assets.
    pub output_path: Option<String>,
}

/// Assets of a resolved site, looked up per referencing page.
#[derive(Debug, Default)]
pub struct AssetIndex {
    assets: Vec<IndexedAsset>,
    lookup: HashMap<(NodeId, String), usize>,
    diagnostics: Vec<Diagnostic>,
}

impl AssetIndex {
    /// Index asset references against a resolved graph.
    ///
    /// Duplicate references (same page, same path) are merged. Two local
    /// assets of one page that would share a file name in its asset
    /// directory are reported as an `AssetCollision` diagnostic.
    ///
    /// # Errors
    ///
    /// Returns `StructuralError::UnknownReferencingNode` if a reference
    /// names a node that is not in `graph`.
    pub fn new(
        graph: &ResolvedGraph,
        references: Vec<AssetReference>,
        assets_dir: &str,
    ) -> Result<Self, StructuralError> {
        let mut index = Self::default();
        let mut filenames: HashMap<(NodeId, String), String> = HashMap::new();

        for reference in references {
            let node = reference.referencing_node;
            let Some(page) = graph.get(node) else {
                return Err(StructuralError::UnknownReferencingNode {
                    node,
                    asset: reference.relative_path,
                });
            };

            let key = reference.key();
            if index.lookup.contains_key(&(node, key.clone())) {
                continue;
            }

            let output_path = if reference.is_remote {
                None
            } else {
                if let Some(existing) = filenames.get(&(node, reference.filename.clone())) {
                    tracing::warn!(
                        node = %node,
                        filename = %reference.filename,
                        first = %existing,
                        second = %reference.relative_path,
                        "Asset file name collision"
                    );
                    index.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::AssetCollision,
                        Some(node),
                        format!(
                            "'{}' and '{}' both publish as {}/{} beside {}",
                            existing,
                            reference.relative_path,
                            assets_dir,
                            reference.filename,
                            page.output_path
                        ),
                    ));
                } else {
                    filenames.insert(
                        (node, reference.filename.clone()),
                        reference.relative_path.clone(),
                    );
                }
                Some(join_output(
                    links::parent_dir(&page.output_path),
                    assets_dir,
                    &reference.filename,
                ))
            };

            index.lookup.insert((node, key), index.assets.len());
            index.assets.push(IndexedAsset {
                reference,
                output_path,
            });
        }

        tracing::debug!(
            assets = index.assets.len(),
            collisions = index.diagnostics.len(),
            "Indexed assets"
        );
        Ok(index)
    }

    /// Find the asset a page declared under `declared_path` (percent-decoded,
    /// without query or fragment).
    #[must_use]
    pub fn lookup(&self, node: NodeId, declared_path: &str) -> Option<&IndexedAsset> {
        self.lookup
            .get(&(node, local_key(declared_path)))
            .map(|&i| &self.assets[i])
    }

    /// All indexed assets in input order.
    #[must_use]
    pub fn assets(&self) -> &[IndexedAsset] {
        &self.assets
    }

    /// Assets referenced by one page.
    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &IndexedAsset> + '_ {
        self.assets
            .iter()
            .filter(move |a| a.reference.referencing_node == node)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// File name collisions found while indexing.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

pub(crate) fn decode(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Normalized key for a local path. Content-root paths keep a leading `/`.
fn local_key(decoded: &str) -> String {
    let normalized = links::normalize(decoded);
    if decoded.starts_with('/') {
        format!("/{normalized}")
    } else {
        normalized
    }
}

/// Path component of an HTTP(S) URL.
fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("//").map_or(url, |(_, rest)| rest);
    without_scheme.find('/').map_or("", |pos| &without_scheme[pos..])
}

fn join_output(dir: &str, assets_dir: &str, filename: &str) -> String {
    [dir, assets_dir, filename]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Guess a MIME type from a lowercase file extension.
#[must_use]
pub fn mime_type(extension: &str) -> &'static str {
    match extension {
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        // Documents
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ipynb" => "application/x-ipynb+json",
        "tex" => "application/x-tex",
        // Text and data
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => "application/json",
        "xml" => "application/xml",
        "yml" | "yaml" => "application/yaml",
        "css" => "text/css",
        "js" => "text/javascript",
        "html" | "htm" => "text/html",
        // Audio and video
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        // Archives
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ContentGraph;
    use crate::graph::tests::scenario_records;
    use crate::resolver::PathResolver;
    use pretty_assertions::assert_eq;

    fn resolved() -> ResolvedGraph {
        let options = ResolveOptions::default();
        let graph = ContentGraph::build(&scenario_records(), &options).unwrap();
        PathResolver::new(&options).resolve(graph).unwrap()
    }

    #[test]
    fn test_reference_local() {
        let asset = AssetReference::new(NodeId::new(2), "img/Free%20Body.PNG?v=2").unwrap();
        assert_eq!(asset.filename, "Free Body.PNG");
        assert_eq!(asset.extension, "png");
        assert_eq!(asset.mime_type, "image/png");
        assert!(!asset.is_remote);
        assert_eq!(asset.relative_path, "img/Free%20Body.PNG");
    }

    #[test]
    fn test_reference_remote() {
        let asset =
            AssetReference::new(NodeId::new(2), "https://cdn.example.com/a/b.svg#x").unwrap();
        assert!(asset.is_remote);
        assert_eq!(asset.filename, "b.svg");
        assert_eq!(asset.mime_type, "image/svg+xml");
    }

    #[test]
    fn test_reference_rejects_non_files() {
        assert_eq!(AssetReference::new(NodeId::new(0), "#top"), None);
        assert_eq!(AssetReference::new(NodeId::new(0), "data:image/png;base64,AA"), None);
        assert_eq!(AssetReference::new(NodeId::new(0), "mailto:a@b.c"), None);
        assert_eq!(AssetReference::new(NodeId::new(0), "https://example.com/"), None);
    }

    #[test]
    fn test_extract_assets() {
        let body = r#"
![Forces](img/forces.png)
![Remote](https://example.com/logo.png)
[Worksheet](files/worksheet.pdf) and [Activities](activities.md)
<a href="other.html">old</a> <img src="img/forces.png">
[Site](https://example.com/data.csv)
"#;

        let assets = extract_assets(NodeId::new(2), body, &ResolveOptions::default());

        let declared: Vec<(&str, bool)> = assets
            .iter()
            .map(|a| (a.relative_path.as_str(), a.is_remote))
            .collect();
        assert_eq!(
            declared,
            [
                ("img/forces.png", false),
                ("https://example.com/logo.png", true),
                ("files/worksheet.pdf", false),
            ]
        );
    }

    #[test]
    fn test_index_places_local_assets_beside_page() {
        let graph = resolved();
        let refs = vec![
            AssetReference::new(NodeId::new(2), "img/forces.png").unwrap(),
            AssetReference::new(NodeId::new(2), "https://example.com/logo.png").unwrap(),
        ];

        let index = AssetIndex::new(&graph, refs, "files").unwrap();

        let outputs: Vec<Option<&str>> = index
            .assets()
            .iter()
            .map(|a| a.output_path.as_deref())
            .collect();
        assert_eq!(outputs, [Some("sample-resources/newton/files/forces.png"), None]);
        assert!(index.lookup(NodeId::new(2), "./img/forces.png").is_some());
        assert!(index.lookup(NodeId::new(3), "img/forces.png").is_none());
    }

    #[test]
    fn test_index_rejects_unknown_node() {
        let graph = resolved();
        let refs = vec![AssetReference::new(NodeId::new(99), "a.png").unwrap()];

        let err = AssetIndex::new(&graph, refs, "files").unwrap_err();

        assert_eq!(
            err,
            StructuralError::UnknownReferencingNode {
                node: NodeId::new(99),
                asset: "a.png".to_owned(),
            }
        );
    }

    #[test]
    fn test_index_reports_filename_collision() {
        let graph = resolved();
        let refs = vec![
            AssetReference::new(NodeId::new(2), "a/fig.png").unwrap(),
            AssetReference::new(NodeId::new(2), "b/fig.png").unwrap(),
            AssetReference::new(NodeId::new(2), "./a/fig.png").unwrap(),
            AssetReference::new(NodeId::new(3), "c/fig.png").unwrap(),
        ];

        let index = AssetIndex::new(&graph, refs, "files").unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.diagnostics().len(), 1);
        assert_eq!(index.diagnostics()[0].kind, DiagnosticKind::AssetCollision);
        assert_eq!(index.for_node(NodeId::new(2)).count(), 2);
    }

    #[test]
    fn test_mime_type_fallback() {
        assert_eq!(mime_type("jpeg"), "image/jpeg");
        assert_eq!(mime_type("unknown"), "application/octet-stream");
    }
}
