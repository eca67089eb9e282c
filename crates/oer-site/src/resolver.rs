//! Output path resolution.
//!
//! Every node gets its own directory named by its slug beneath its
//! ancestors' directories:
//!
//! ```text
//! home/index.html                          # site root (home.md)
//! sample-resources/index.html              # section index
//! sample-resources/newton/newton.html      # page inside the section
//! about/about.html                         # top-level page
//! ```
//!
//! Paths depend only on the ancestor slug chain, so resolving the same graph
//! twice yields identical strings.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{Diagnostic, StructuralError};
use crate::graph::{ContentGraph, ContentNode, NodeId};
use crate::links::{self, resolve_relative};
use crate::options::ResolveOptions;
use crate::slug;

/// Computes output paths for a [`ContentGraph`].
pub struct PathResolver<'a> {
    options: &'a ResolveOptions,
}

impl<'a> PathResolver<'a> {
    #[must_use]
    pub fn new(options: &'a ResolveOptions) -> Self {
        Self { options }
    }

    /// Assign output paths, consuming the graph.
    ///
    /// Nothing downstream can observe a graph whose paths are only partly
    /// assigned: navigation and link rewriting accept only the returned
    /// [`ResolvedGraph`].
    ///
    /// # Errors
    ///
    /// Returns `StructuralError::OutputCollision` if two nodes resolve to the
    /// same output path.
    pub fn resolve(&self, mut graph: ContentGraph) -> Result<ResolvedGraph, StructuralError> {
        let len = graph.len();
        let mut dirs = vec![String::new(); len];
        let mut slug_chains = vec![String::new(); len];
        let mut output_index: HashMap<String, NodeId> = HashMap::with_capacity(len);

        for id in graph.pre_order() {
            let node = graph.node(id);
            let (parent_dir, parent_chain, parent_output) = match node.parent {
                Some(p) => (
                    dirs[p.index()].as_str(),
                    slug_chains[p.index()].as_str(),
                    graph.node(p).output_path.clone(),
                ),
                None => ("", "", String::new()),
            };

            let own_segment = if node.is_root {
                self.root_dir(node)
            } else {
                node.slug.clone()
            };
            let dir = join(parent_dir, &own_segment);
            let chain = join(parent_chain, &node.slug);

            let file = if node.is_root || node.is_section_index {
                self.options.page_file("index")
            } else {
                self.options.page_file(&node.slug)
            };
            let output_path = join(&dir, &file);

            if let Some(first) = output_index.insert(output_path.clone(), id) {
                return Err(StructuralError::OutputCollision {
                    path: output_path,
                    first: graph.node(first).label(),
                    second: node.label(),
                });
            }

            dirs[id.index()] = dir;
            slug_chains[id.index()] = chain;
            let node = &mut graph.nodes[id.index()];
            node.output_path = output_path;
            node.parent_output_path = parent_output;
        }

        tracing::debug!(nodes = len, "Resolved output paths");

        Ok(ResolvedGraph {
            graph,
            slug_chains,
            output_index,
        })
    }

    /// Directory of the site root page.
    fn root_dir(&self, root: &ContentNode) -> String {
        if let Some(dir) = &self.options.root_dir {
            return dir.clone();
        }
        root.source_path
            .as_deref()
            .and_then(slug::from_source_path)
            .or_else(|| slug::from_title(&root.title))
            .unwrap_or_else(|| root.slug.clone())
    }
}

fn join(dir: &str, name: &str) -> String {
    match (dir.is_empty(), name.is_empty()) {
        (_, true) => dir.to_owned(),
        (true, false) => name.to_owned(),
        (false, false) => format!("{dir}/{name}"),
    }
}

/// One step of a breadcrumb trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub node: NodeId,
    pub title: String,
    pub output_path: String,
    /// Link relative to the page the trail was built for.
    pub href: String,
}

/// A [`ContentGraph`] whose output paths are fully assigned.
///
/// Immutable; shared read-only by navigation building and link rewriting.
#[derive(Debug)]
pub struct ResolvedGraph {
    graph: ContentGraph,
    slug_chains: Vec<String>,
    output_index: HashMap<String, NodeId>,
}

impl ResolvedGraph {
    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ContentNode {
        self.graph.node(id)
    }

    /// Node by id, `None` for ids outside the graph.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        self.graph.get(id)
    }

    #[must_use]
    pub fn nodes(&self) -> &[ContentNode] {
        self.graph.nodes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.graph.children(id)
    }

    #[must_use]
    pub fn top_level(&self) -> &[NodeId] {
        self.graph.top_level()
    }

    #[must_use]
    pub fn site_root(&self) -> Option<NodeId> {
        self.graph.site_root()
    }

    #[must_use]
    pub fn find_by_source(&self, source_path: &str) -> Option<NodeId> {
        self.graph.find_by_source(source_path)
    }

    /// Look up a node by its output path.
    #[must_use]
    pub fn find_by_output(&self, output_path: &str) -> Option<NodeId> {
        self.output_index.get(output_path).copied()
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.ancestors(id)
    }

    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeId> {
        self.graph.pre_order()
    }

    /// Ancestor slugs and the node's own slug joined with `/`. Stable
    /// across passes, used as the durable store key.
    #[must_use]
    pub fn slug_chain(&self, id: NodeId) -> &str {
        &self.slug_chains[id.index()]
    }

    /// Directory holding the node's output file.
    #[must_use]
    pub fn output_dir(&self, id: NodeId) -> &str {
        links::parent_dir(&self.node(id).output_path)
    }

    /// Relative link from one node's page to another's.
    #[must_use]
    pub fn relative_link(&self, from: NodeId, to: NodeId) -> String {
        resolve_relative(&self.node(from).output_path, &self.node(to).output_path)
    }

    /// Every menu context any node participates in.
    #[must_use]
    pub fn menus(&self) -> BTreeSet<&str> {
        self.nodes()
            .iter()
            .flat_map(|n| n.menu_contexts.iter().map(String::as_str))
            .collect()
    }

    /// Trail from the site root down to the node's parent.
    ///
    /// The site root leads the trail even when the node is not beneath it.
    /// The node itself is not included; the root's trail is empty.
    #[must_use]
    pub fn breadcrumbs(&self, id: NodeId) -> Vec<Breadcrumb> {
        let mut trail: Vec<NodeId> = self.ancestors(id).collect();
        if let Some(root) = self.site_root()
            && root != id
            && !trail.contains(&root)
        {
            trail.push(root);
        }
        trail.reverse();

        let from = &self.node(id).output_path;
        trail
            .into_iter()
            .map(|crumb| {
                let node = self.node(crumb);
                Breadcrumb {
                    node: crumb,
                    title: node.title.clone(),
                    output_path: node.output_path.clone(),
                    href: resolve_relative(from, &node.output_path),
                }
            })
            .collect()
    }

    /// Problems recovered while building the graph.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.graph.diagnostics()
    }
}
