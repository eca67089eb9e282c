//! Menu navigation trees.
//!
//! A navigation is a fresh projection of the resolved graph for one menu
//! context. The graph itself is never modified.

use serde::Serialize;

use crate::graph::NodeId;
use crate::links::page_href;
use crate::resolver::ResolvedGraph;

/// Node in a navigation tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub node: NodeId,
    pub title: String,
    pub output_path: String,
    /// Zero for top-level entries.
    pub depth: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavEntry>,
}

/// Navigation link rendered for a specific page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub title: String,
    /// Link relative to the page being rendered.
    pub href: String,
    /// True for the page being rendered.
    pub active: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavLink>,
}

/// Navigation tree for one menu context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub menu: String,
    pub entries: Vec<NavEntry>,
}

impl Navigation {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of entries at every depth.
    #[must_use]
    pub fn len(&self) -> usize {
        fn count(entries: &[NavEntry]) -> usize {
            entries.iter().map(|e| 1 + count(&e.children)).sum()
        }
        count(&self.entries)
    }

    /// Whether the tree contains a node.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        fn find(entries: &[NavEntry], node: NodeId) -> bool {
            entries.iter().any(|e| e.node == node || find(&e.children, node))
        }
        find(&self.entries, node)
    }

    /// Project the tree to links relative to `page_output_path`.
    #[must_use]
    pub fn links_from(&self, page_output_path: &str) -> Vec<NavLink> {
        fn project(entries: &[NavEntry], page: &str) -> Vec<NavLink> {
            entries
                .iter()
                .map(|entry| NavLink {
                    title: entry.title.clone(),
                    href: page_href(page, &entry.output_path),
                    active: entry.output_path == page,
                    children: project(&entry.children, page),
                })
                .collect()
        }
        project(&self.entries, page_output_path)
    }
}

/// Builds [`Navigation`] trees from a resolved graph.
pub struct NavigationBuilder<'a> {
    graph: &'a ResolvedGraph,
}

impl<'a> NavigationBuilder<'a> {
    #[must_use]
    pub fn new(graph: &'a ResolvedGraph) -> Self {
        Self { graph }
    }

    /// Build the navigation for `menu`.
    ///
    /// A node is included when it opted into `menu`, or when it is a section
    /// index with at least one included descendant. Nodes deeper than
    /// `max_depth` (top level is depth 0) are omitted, as are nodes whose
    /// parent is not included. Siblings keep declaration order.
    #[must_use]
    pub fn build(&self, menu: &str, max_depth: Option<usize>) -> Navigation {
        let entries = self
            .graph
            .top_level()
            .iter()
            .filter_map(|&id| self.entry(id, 0, menu, max_depth))
            .collect();
        Navigation {
            menu: menu.to_owned(),
            entries,
        }
    }

    fn entry(
        &self,
        id: NodeId,
        depth: usize,
        menu: &str,
        max_depth: Option<usize>,
    ) -> Option<NavEntry> {
        if max_depth.is_some_and(|max| depth > max) {
            return None;
        }
        let node = self.graph.node(id);
        let children: Vec<NavEntry> = self
            .graph
            .children(id)
            .iter()
            .filter_map(|&child| self.entry(child, depth + 1, menu, max_depth))
            .collect();

        let opted_in = node.menu_contexts.contains(menu);
        if !opted_in && !(node.is_section_index && !children.is_empty()) {
            return None;
        }

        Some(NavEntry {
            node: id,
            title: node.title.clone(),
            output_path: node.output_path.clone(),
            depth,
            children,
        })
    }
}
