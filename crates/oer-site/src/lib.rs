//! Site resolution for OER static builds.
//!
//! Turns validated manifest records into a resolved site:
//!
//! - [`ContentGraph`]: arena of content nodes with validated parent links and
//!   unique slugs
//! - [`PathResolver`]: assigns every node a deterministic output path and
//!   yields a [`ResolvedGraph`]
//! - [`NavigationBuilder`]: ordered navigation per menu context
//! - [`LinkRewriter`]: rewrites page and asset references to relative paths
//! - [`ResolutionPass`]: runs the sequence and returns a [`Resolution`]
//!
//! Structural problems abort the pass with a [`StructuralError`]. Problems
//! confined to one reference or slug are recovered and reported as
//! [`Diagnostic`]s.
//!
//! # Example
//!
//! ```
//! use oer_manifest::ManifestLoader;
//! use oer_site::{NodeId, ResolutionPass, ResolveOptions};
//!
//! let manifest = ManifestLoader::default().parse(r"
//! toc:
//!   - { title: Home, file: home.md, slug: main }
//!   - title: Sample
//!     file: sample/_index.md
//!     children:
//!       - { title: Newton, file: sample/newton.md }
//! ")?;
//!
//! let pass = ResolutionPass::new(ResolveOptions::default());
//! let resolution = pass.run(&manifest.records, Vec::new())?;
//!
//! let newton = resolution.graph().node(NodeId::new(2));
//! assert_eq!(newton.output_path, "sample/newton/newton.html");
//!
//! let page = resolution.rewriter().rewrite(newton.id, "[Home](../home.md)");
//! assert_eq!(page.text, "[Home](../../home/index.html)");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod asset;
mod error;
mod graph;
mod links;
mod navigation;
mod options;
mod pass;
mod resolver;
mod rewrite;
mod scan;
mod slug;

pub use asset::{AssetIndex, AssetReference, IndexedAsset, extract_assets, mime_type};
pub use error::{Diagnostic, DiagnosticKind, StructuralError, UnresolvedReason, UnresolvedReference};
pub use graph::{ContentGraph, ContentNode, NodeId};
pub use links::{LinkKind, normalize, resolve_against, resolve_relative};
pub use navigation::{NavEntry, NavLink, Navigation, NavigationBuilder};
pub use options::ResolveOptions;
pub use pass::{PageContext, Resolution, ResolutionPass, RewriteReport, RewrittenPage};
pub use resolver::{Breadcrumb, PathResolver, ResolvedGraph};
pub use rewrite::{LinkRewriter, Rewritten};
pub use slug::slugify;
