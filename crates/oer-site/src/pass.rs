//! Full resolution pass.
//!
//! A pass runs build, resolve and asset indexing in sequence and hands back
//! a [`Resolution`]. Nothing is shared between passes: each one owns its
//! [`ResolveOptions`] and every structure it produces.

use oer_config::ResolveConfig;
use oer_manifest::ContentRecord;
use oer_store::{AssetRow, ContentRow, RecordSink, StoreError};
use rayon::prelude::*;
use serde::Serialize;

use crate::asset::{AssetIndex, AssetReference, extract_assets};
use crate::error::{Diagnostic, StructuralError, sort_diagnostics};
use crate::graph::{ContentGraph, ContentNode, NodeId};
use crate::navigation::{NavLink, Navigation, NavigationBuilder};
use crate::options::ResolveOptions;
use crate::resolver::{Breadcrumb, PathResolver, ResolvedGraph};
use crate::rewrite::{LinkRewriter, Rewritten};

/// Entry point for resolving a site.
pub struct ResolutionPass {
    options: ResolveOptions,
}

impl ResolutionPass {
    #[must_use]
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    /// Create a pass from the `[resolve]` config section.
    #[must_use]
    pub fn from_config(config: &ResolveConfig) -> Self {
        Self::new(ResolveOptions::from_config(config))
    }

    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Extract asset references from page bodies in parallel.
    ///
    /// `bodies` pairs each body with the id of its record (its position in
    /// the records later passed to [`run`](Self::run)).
    #[must_use]
    pub fn extract_assets<S>(&self, bodies: &[(NodeId, S)]) -> Vec<AssetReference>
    where
        S: AsRef<str> + Sync,
    {
        bodies
            .par_iter()
            .flat_map_iter(|(node, body)| extract_assets(*node, body.as_ref(), &self.options))
            .collect()
    }

    /// Build the content graph, resolve output paths and index assets.
    ///
    /// # Errors
    ///
    /// Returns the first [`StructuralError`] found. Nothing of a failed pass
    /// is usable.
    pub fn run(
        &self,
        records: &[ContentRecord],
        assets: Vec<AssetReference>,
    ) -> Result<Resolution, StructuralError> {
        let graph = ContentGraph::build(records, &self.options)?;
        let graph = PathResolver::new(&self.options).resolve(graph)?;
        let assets = AssetIndex::new(&graph, assets, &self.options.assets_dir)?;

        let mut diagnostics: Vec<Diagnostic> = graph
            .diagnostics()
            .iter()
            .chain(assets.diagnostics())
            .cloned()
            .collect();
        sort_diagnostics(&mut diagnostics);

        tracing::info!(
            nodes = graph.len(),
            assets = assets.len(),
            diagnostics = diagnostics.len(),
            "Resolution pass complete"
        );

        Ok(Resolution {
            graph,
            assets,
            options: self.options.clone(),
            diagnostics,
        })
    }
}

/// Page bodies rewritten by [`Resolution::rewrite_all`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    /// Rewritten bodies in input order.
    pub pages: Vec<RewrittenPage>,
    /// Unresolved references of every page, ordered by node id.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewrittenPage {
    pub node: NodeId,
    pub text: String,
}

/// Everything the render collaborator needs for one page.
#[derive(Clone, Debug, Serialize)]
pub struct PageContext<'a> {
    pub node: &'a ContentNode,
    /// Menu the navigation was built for.
    pub menu: String,
    pub body: Rewritten,
    pub navigation: Vec<NavLink>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// Outcome of a successful pass. Immutable and shareable across threads.
#[derive(Debug)]
pub struct Resolution {
    graph: ResolvedGraph,
    assets: AssetIndex,
    options: ResolveOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    #[must_use]
    pub fn graph(&self) -> &ResolvedGraph {
        &self.graph
    }

    #[must_use]
    pub fn assets(&self) -> &AssetIndex {
        &self.assets
    }

    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Recovered problems from building and asset indexing, by node id.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Navigation tree for a menu context.
    #[must_use]
    pub fn navigation(&self, menu: &str, max_depth: Option<usize>) -> Navigation {
        NavigationBuilder::new(&self.graph).build(menu, max_depth)
    }

    #[must_use]
    pub fn rewriter(&self) -> LinkRewriter<'_> {
        LinkRewriter::new(&self.graph, &self.assets, &self.options)
    }

    /// Rewrite many bodies in parallel.
    ///
    /// # Panics
    ///
    /// Panics if a node id does not belong to the graph.
    #[must_use]
    pub fn rewrite_all<S>(&self, bodies: &[(NodeId, S)]) -> RewriteReport
    where
        S: AsRef<str> + Sync,
    {
        let rewriter = self.rewriter();
        let results: Vec<(NodeId, Rewritten)> = bodies
            .par_iter()
            .map(|(node, body)| (*node, rewriter.rewrite(*node, body.as_ref())))
            .collect();

        let mut diagnostics = Vec::new();
        let pages = results
            .into_iter()
            .map(|(node, rewritten)| {
                diagnostics.extend(rewritten.diagnostics);
                RewrittenPage {
                    node,
                    text: rewritten.text,
                }
            })
            .collect();
        sort_diagnostics(&mut diagnostics);

        RewriteReport { pages, diagnostics }
    }

    /// Render context for one page: rewritten body, navigation of its menu
    /// and breadcrumbs.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not belong to the graph.
    #[must_use]
    pub fn page_context(&self, node: NodeId, body: &str) -> PageContext<'_> {
        let page = self.graph.node(node);
        let menu = self.primary_menu(page).to_owned();
        let navigation = self.navigation(&menu, None).links_from(&page.output_path);
        PageContext {
            node: page,
            body: self.rewriter().rewrite(node, body),
            navigation,
            breadcrumbs: self.graph.breadcrumbs(node),
            menu,
        }
    }

    /// Menu a page is rendered with: the default menu when the page is in
    /// it, otherwise the first menu it declares.
    fn primary_menu<'n>(&'n self, node: &'n ContentNode) -> &'n str {
        if node.menu_contexts.contains(&self.options.default_menu) {
            return &self.options.default_menu;
        }
        node.menu_contexts
            .first()
            .map_or(self.options.default_menu.as_str(), String::as_str)
    }

    /// Store projection of every node, keyed by slug chain.
    #[must_use]
    pub fn content_rows(&self) -> Vec<ContentRow> {
        self.graph
            .nodes()
            .iter()
            .map(|node| ContentRow {
                key: self.graph.slug_chain(node.id).to_owned(),
                id: node.id.index(),
                title: node.title.clone(),
                source_path: node.source_path.clone(),
                output_path: node.output_path.clone(),
                parent_output_path: node.parent_output_path.clone(),
                parent_slug: node.parent.map(|p| self.graph.node(p).slug.clone()),
                slug: node.slug.clone(),
                is_section_index: node.is_section_index,
                level: node.level,
                menu_context: node.menu_contexts.iter().cloned().collect(),
                export_types: node.export_targets.clone(),
            })
            .collect()
    }

    /// Store projection of every indexed asset.
    #[must_use]
    pub fn asset_rows(&self) -> Vec<AssetRow> {
        self.assets
            .assets()
            .iter()
            .map(|asset| {
                let reference = &asset.reference;
                AssetRow {
                    filename: reference.filename.clone(),
                    extension: reference.extension.clone(),
                    mime_type: reference.mime_type.clone(),
                    is_remote: reference.is_remote,
                    url: reference.is_remote.then(|| reference.relative_path.clone()),
                    referenced_page: self
                        .graph
                        .node(reference.referencing_node)
                        .output_path
                        .clone(),
                    relative_path: reference.relative_path.clone(),
                    output_path: asset.output_path.clone(),
                }
            })
            .collect()
    }

    /// Upsert all rows into a durable sink.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`StoreError`].
    pub fn publish(&self, sink: &dyn RecordSink) -> Result<(), StoreError> {
        let content = self.content_rows();
        let assets = self.asset_rows();
        sink.upsert_content(&content)?;
        sink.upsert_assets(&assets)?;
        tracing::info!(
            content = content.len(),
            assets = assets.len(),
            "Published resolved records"
        );
        Ok(())
    }
}
