//! Content graph built from manifest records.
//!
//! Nodes live in a flat `Vec<ContentNode>` indexed by [`NodeId`], with
//! parent/children relations tracked as ids. The graph is validated once at
//! construction:
//! - every declared parent exists
//! - parent links form a forest
//! - at most one site root, and it is top-level
//! - sibling slugs are distinct and only the root holds the reserved slug
//!
//! Output paths stay empty until [`PathResolver`](crate::PathResolver)
//! consumes the graph.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use oer_manifest::{ContentRecord, ParentRef};
use serde::Serialize;

use crate::error::{Diagnostic, DiagnosticKind, StructuralError};
use crate::options::ResolveOptions;
use crate::slug;

/// Arena index of a content node.
///
/// Equal to the position of the node's record in the list passed to
/// [`ContentGraph::build`]. Assigned once per pass and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Id of the record at `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One document or grouping section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentNode {
    pub id: NodeId,
    /// Content-relative source path; `None` for file-less sections.
    pub source_path: Option<String>,
    pub title: String,
    pub slug: String,
    pub parent: Option<NodeId>,
    /// Distance from the top level (top-level nodes are 0).
    pub level: usize,
    pub is_root: bool,
    /// Declared as a section landing page, or has children.
    pub is_section_index: bool,
    /// Compiled page location. Empty before resolution.
    pub output_path: String,
    /// Parent's output path, empty for top-level nodes.
    pub parent_output_path: String,
    pub menu_contexts: BTreeSet<String>,
    /// Export formats requested for this node.
    pub export_targets: Vec<String>,
    pub declaration_order: usize,
}

impl ContentNode {
    /// Human-readable identifier used in errors and logs.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.source_path {
            Some(path) => path.clone(),
            None => format!("section '{}'", self.slug),
        }
    }
}

/// Validated hierarchy of content nodes.
#[derive(Debug)]
pub struct ContentGraph {
    pub(crate) nodes: Vec<ContentNode>,
    children: Vec<Vec<NodeId>>,
    top_level: Vec<NodeId>,
    site_root: Option<NodeId>,
    source_index: HashMap<String, NodeId>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl ContentGraph {
    /// Build and validate the graph.
    ///
    /// Performs no filesystem access. Recoverable problems (rejected slugs,
    /// duplicate source paths) are kept as diagnostics on the graph.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] for missing parents, cycles, duplicate
    /// or nested roots, sibling slug collisions and, with
    /// `strict_root_slug`, rejected slugs.
    pub fn build(
        records: &[ContentRecord],
        options: &ResolveOptions,
    ) -> Result<Self, StructuralError> {
        let site_root = designate_root(records)?;

        let mut diagnostics = Vec::new();
        let source_index = index_sources(records, &mut diagnostics);

        let slugs = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let id = NodeId(i);
                if site_root == Some(id) {
                    Ok(options.root_slug.clone())
                } else {
                    assign_slug(id, record, options, &mut diagnostics)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let parents = link_parents(records, &slugs, &source_index)?;
        detect_cycles(records, &parents)?;

        let mut by_order: Vec<usize> = (0..records.len()).collect();
        by_order.sort_by_key(|&i| records[i].declaration_order);

        let mut children = vec![Vec::new(); records.len()];
        let mut top_level = Vec::new();
        for &i in &by_order {
            match parents[i] {
                Some(parent) => children[parent.0].push(NodeId(i)),
                None => top_level.push(NodeId(i)),
            }
        }

        check_sibling_slugs(records, &slugs, None, &top_level)?;
        for (i, siblings) in children.iter().enumerate() {
            check_sibling_slugs(records, &slugs, Some(i), siblings)?;
        }

        let levels = compute_levels(records.len(), &children, &top_level);

        let nodes = records
            .iter()
            .zip(slugs)
            .enumerate()
            .map(|(i, (record, slug))| ContentNode {
                id: NodeId(i),
                source_path: record.source_path.clone(),
                title: record.title.clone(),
                slug,
                parent: parents[i],
                level: levels[i],
                is_root: site_root == Some(NodeId(i)),
                is_section_index: record.is_section_index || !children[i].is_empty(),
                output_path: String::new(),
                parent_output_path: String::new(),
                menu_contexts: record.menu_contexts.clone(),
                export_targets: record.export.types.clone(),
                declaration_order: record.declaration_order,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            nodes = nodes.len(),
            top_level = top_level.len(),
            diagnostics = diagnostics.len(),
            "Built content graph"
        );

        Ok(Self {
            nodes,
            children,
            top_level,
            site_root,
            source_index,
            diagnostics,
        })
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ContentNode {
        &self.nodes[id.0]
    }

    /// Node by id, `None` for ids outside the graph.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(id.0)
    }

    /// All nodes in id order.
    #[must_use]
    pub fn nodes(&self) -> &[ContentNode] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of a node in declaration order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id.0]
    }

    /// Top-level nodes in declaration order.
    #[must_use]
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// The designated site root, if any.
    #[must_use]
    pub fn site_root(&self) -> Option<NodeId> {
        self.site_root
    }

    /// Look up a node by content-relative source path.
    ///
    /// When two records share a path the first one wins.
    #[must_use]
    pub fn find_by_source(&self, source_path: &str) -> Option<NodeId> {
        self.source_index.get(source_path).copied()
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, |&p| self.nodes[p.0].parent)
    }

    /// All nodes in pre-order (parents before children, siblings in
    /// declaration order).
    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.top_level.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children[id.0].iter().rev());
        }
        order
    }

    /// Problems recovered while building.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn designate_root(records: &[ContentRecord]) -> Result<Option<NodeId>, StructuralError> {
    let mut roots = records.iter().enumerate().filter(|(_, r)| r.is_root);
    let Some((root, record)) = roots.next() else {
        tracing::debug!("No site root designated");
        return Ok(None);
    };
    if let Some((_, second)) = roots.next() {
        return Err(StructuralError::DuplicateRoot {
            first: record.label(),
            second: second.label(),
        });
    }
    if let Some(parent) = &record.parent {
        return Err(StructuralError::NestedRoot {
            node: record.label(),
            parent: parent.to_string(),
        });
    }
    Ok(Some(NodeId(root)))
}

fn index_sources(
    records: &[ContentRecord],
    diagnostics: &mut Vec<Diagnostic>,
) -> HashMap<String, NodeId> {
    let mut index: HashMap<String, NodeId> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let Some(path) = &record.source_path else {
            continue;
        };
        if let Some(&first) = index.get(path) {
            tracing::warn!(path = %path, first = %first, duplicate = i, "Duplicate source path");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::DuplicateSource,
                Some(NodeId(i)),
                format!("source path '{path}' is already declared by node {first}"),
            ));
        } else {
            index.insert(path.clone(), NodeId(i));
        }
    }
    index
}

/// Pick the first usable slug for a non-root node.
fn assign_slug(
    id: NodeId,
    record: &ContentRecord,
    options: &ResolveOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, StructuralError> {
    let reserved = options.root_slug.as_str();
    let declared = record.slug.iter().map(|s| (s.clone(), true));
    let derived = record
        .source_path
        .as_deref()
        .and_then(slug::from_source_path)
        .into_iter()
        .chain(slug::from_title(&record.title))
        .map(|s| (s, false));

    for (candidate, is_declared) in declared.chain(derived) {
        let problem = is_declared
            .then(|| slug::declared_slug_problem(&candidate))
            .flatten()
            .or_else(|| (candidate == reserved).then_some("slug is reserved for the site root"));
        let Some(reason) = problem else {
            return Ok(candidate);
        };

        if options.strict_root_slug {
            return Err(StructuralError::InvalidSlug {
                node: record.label(),
                slug: candidate,
                reason: reason.to_owned(),
            });
        }
        tracing::warn!(
            node = %record.label(),
            slug = %candidate,
            reason,
            "Rejected slug, falling back"
        );
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::InvalidSlug,
            Some(id),
            format!("slug '{candidate}' rejected: {reason}"),
        ));
    }

    Ok(slug::fallback(record.declaration_order, reserved))
}

fn link_parents(
    records: &[ContentRecord],
    slugs: &[String],
    source_index: &HashMap<String, NodeId>,
) -> Result<Vec<Option<NodeId>>, StructuralError> {
    let by_order: HashMap<usize, NodeId> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.declaration_order, NodeId(i)))
        .collect();
    let has_slug =
        |j: usize, slug: &str| records[j].slug.as_deref() == Some(slug) || slugs[j] == slug;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let Some(reference) = &record.parent else {
                return Ok(None);
            };
            let parent = match reference {
                ParentRef::Path(path) => source_index.get(path).copied(),
                ParentRef::Slug(slug) => (0..i)
                    .rev()
                    .find(|&j| has_slug(j, slug))
                    .or_else(|| (i + 1..records.len()).find(|&j| has_slug(j, slug)))
                    .map(NodeId),
                ParentRef::Declaration(order) => by_order.get(order).copied(),
            };
            parent.map(Some).ok_or_else(|| StructuralError::MissingParent {
                node: record.label(),
                reference: reference.to_string(),
            })
        })
        .collect()
}

/// Walk every parent chain, marking nodes in progress until the chain ends.
/// Reaching an in-progress node means the chain loops back on itself.
fn detect_cycles(
    records: &[ContentRecord],
    parents: &[Option<NodeId>],
) -> Result<(), StructuralError> {
    let mut marks = vec![Mark::Unvisited; records.len()];

    for start in 0..records.len() {
        let mut chain: Vec<usize> = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::InProgress => {
                    let from = chain.iter().position(|&c| c == i).unwrap_or(0);
                    let mut members: Vec<String> =
                        chain[from..].iter().map(|&c| records[c].label()).collect();
                    members.push(records[i].label());
                    return Err(StructuralError::CyclicHierarchy { members });
                }
                Mark::Unvisited => {
                    marks[i] = Mark::InProgress;
                    chain.push(i);
                    current = parents[i].map(NodeId::index);
                }
            }
        }
        for i in chain {
            marks[i] = Mark::Done;
        }
    }
    Ok(())
}

fn check_sibling_slugs(
    records: &[ContentRecord],
    slugs: &[String],
    parent: Option<usize>,
    siblings: &[NodeId],
) -> Result<(), StructuralError> {
    let mut seen: HashMap<&str, NodeId> = HashMap::with_capacity(siblings.len());
    for &id in siblings {
        let slug = slugs[id.0].as_str();
        if let Some(first) = seen.insert(slug, id) {
            return Err(StructuralError::SlugCollision {
                slug: slug.to_owned(),
                first: records[first.0].label(),
                second: records[id.0].label(),
                scope: parent.map_or_else(|| "the top level".to_owned(), |p| records[p].label()),
            });
        }
    }
    Ok(())
}

fn compute_levels(len: usize, children: &[Vec<NodeId>], top_level: &[NodeId]) -> Vec<usize> {
    let mut levels = vec![0; len];
    let mut stack: Vec<(NodeId, usize)> = top_level.iter().map(|&id| (id, 0)).collect();
    while let Some((id, level)) = stack.pop() {
        levels[id.0] = level;
        stack.extend(children[id.0].iter().map(|&child| (child, level + 1)));
    }
    levels
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Home (root), a sample section with two pages, and an about page.
    pub(crate) fn scenario_records() -> Vec<ContentRecord> {
        vec![
            ContentRecord::new(0, "Home")
                .with_source("home.md")
                .with_slug("main")
                .with_menu("main")
                .as_root(),
            ContentRecord::new(1, "Sample Resources")
                .with_source("sample/_index.md")
                .with_slug("sample-resources")
                .with_menu("main")
                .as_section_index(),
            ContentRecord::new(2, "Newton")
                .with_source("sample/newton.md")
                .with_parent(ParentRef::Path("sample/_index.md".to_owned()))
                .with_menu("main"),
            ContentRecord::new(3, "Activities")
                .with_source("sample/activities.md")
                .with_parent(ParentRef::Path("sample/_index.md".to_owned()))
                .with_menu("main"),
            ContentRecord::new(4, "About")
                .with_source("about.md")
                .with_menu("main"),
        ]
    }

    fn build(records: &[ContentRecord]) -> Result<ContentGraph, StructuralError> {
        ContentGraph::build(records, &ResolveOptions::default())
    }

    #[test]
    fn test_build_scenario() {
        let graph = build(&scenario_records()).unwrap();

        let slugs: Vec<&str> = graph.nodes().iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, ["main", "sample-resources", "newton", "activities", "about"]);
        assert_eq!(graph.site_root(), Some(NodeId(0)));
        assert_eq!(graph.top_level(), [NodeId(0), NodeId(1), NodeId(4)]);
        assert_eq!(graph.children(NodeId(1)), [NodeId(2), NodeId(3)]);
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn test_levels_follow_parents() {
        let mut records = scenario_records();
        records.push(
            ContentRecord::new(5, "Deep")
                .with_source("sample/deep.md")
                .with_parent(ParentRef::Path("sample/newton.md".to_owned())),
        );
        let graph = build(&records).unwrap();

        for node in graph.nodes() {
            let expected = node.parent.map_or(0, |p| graph.node(p).level + 1);
            assert_eq!(node.level, expected, "level of {}", node.label());
        }
        assert_eq!(graph.node(NodeId(5)).level, 2);
        assert!(graph.node(NodeId(2)).is_section_index);
    }

    #[test]
    fn test_missing_parent_names_path() {
        let records = vec![
            ContentRecord::new(0, "Orphan")
                .with_source("orphan.md")
                .with_parent(ParentRef::Path("nowhere/_index.md".to_owned())),
        ];

        let err = build(&records).unwrap_err();

        assert_eq!(
            err,
            StructuralError::MissingParent {
                node: "orphan.md".to_owned(),
                reference: "nowhere/_index.md".to_owned(),
            }
        );
    }

    #[test]
    fn test_cycle_detected() {
        let records = vec![
            ContentRecord::new(0, "A")
                .with_source("a.md")
                .with_parent(ParentRef::Path("b.md".to_owned())),
            ContentRecord::new(1, "B")
                .with_source("b.md")
                .with_parent(ParentRef::Path("a.md".to_owned())),
        ];

        let err = build(&records).unwrap_err();

        assert_eq!(
            err,
            StructuralError::CyclicHierarchy {
                members: vec!["a.md".to_owned(), "b.md".to_owned(), "a.md".to_owned()],
            }
        );
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let records = vec![
            ContentRecord::new(0, "Loop")
                .with_source("loop.md")
                .with_parent(ParentRef::Path("loop.md".to_owned())),
        ];
        assert!(matches!(
            build(&records),
            Err(StructuralError::CyclicHierarchy { .. })
        ));
    }

    #[test]
    fn test_sibling_slug_collision() {
        let records = vec![
            ContentRecord::new(0, "Intro").with_source("a/intro.md"),
            ContentRecord::new(1, "Intro again").with_source("b/intro.md"),
        ];

        let err = build(&records).unwrap_err();

        assert!(matches!(
            err,
            StructuralError::SlugCollision { ref slug, .. } if slug == "intro"
        ));
    }

    #[test]
    fn test_same_slug_in_different_scopes_is_fine() {
        let records = vec![
            ContentRecord::new(0, "A").with_source("a/_index.md"),
            ContentRecord::new(1, "Intro")
                .with_source("a/intro.md")
                .with_parent(ParentRef::Path("a/_index.md".to_owned())),
            ContentRecord::new(2, "B").with_source("b/_index.md"),
            ContentRecord::new(3, "Intro")
                .with_source("b/intro.md")
                .with_parent(ParentRef::Path("b/_index.md".to_owned())),
        ];
        assert!(build(&records).is_ok());
    }

    #[test]
    fn test_duplicate_root() {
        let records = vec![
            ContentRecord::new(0, "A").with_source("a.md").as_root(),
            ContentRecord::new(1, "B").with_source("b.md").as_root(),
        ];
        assert_eq!(
            build(&records).unwrap_err(),
            StructuralError::DuplicateRoot {
                first: "a.md".to_owned(),
                second: "b.md".to_owned(),
            }
        );
    }

    #[test]
    fn test_nested_root() {
        let records = vec![
            ContentRecord::new(0, "A").with_source("a.md"),
            ContentRecord::new(1, "B")
                .with_source("b.md")
                .with_parent(ParentRef::Path("a.md".to_owned()))
                .as_root(),
        ];
        assert!(matches!(
            build(&records),
            Err(StructuralError::NestedRoot { .. })
        ));
    }

    #[test]
    fn test_reserved_slug_falls_back_with_diagnostic() {
        let mut records = scenario_records();
        records[4] = ContentRecord::new(4, "About")
            .with_source("about.md")
            .with_slug("main");

        let graph = build(&records).unwrap();

        assert_eq!(graph.node(NodeId(4)).slug, "about");
        assert_eq!(graph.node(NodeId(0)).slug, "main");
        let diagnostics = graph.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidSlug);
        assert_eq!(diagnostics[0].node, Some(NodeId(4)));
    }

    #[test]
    fn test_reserved_slug_fatal_in_strict_mode() {
        let mut records = scenario_records();
        records[4] = ContentRecord::new(4, "About")
            .with_source("about.md")
            .with_slug("main");
        let options = ResolveOptions {
            strict_root_slug: true,
            ..ResolveOptions::default()
        };

        let err = ContentGraph::build(&records, &options).unwrap_err();

        assert!(matches!(err, StructuralError::InvalidSlug { ref slug, .. } if slug == "main"));
    }

    #[test]
    fn test_slug_derivation_chain() {
        let records = vec![
            ContentRecord::new(0, "Ignored").with_source("guides/_index.md"),
            ContentRecord::new(1, "Grouping Only"),
            ContentRecord::new(2, "!!!"),
        ];

        let graph = build(&records).unwrap();

        let slugs: Vec<&str> = graph.nodes().iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, ["guides", "grouping-only", "section-2"]);
    }

    #[test]
    fn test_parent_by_slug_and_declaration() {
        let records = vec![
            ContentRecord::new(0, "Labs").with_slug("labs"),
            ContentRecord::new(1, "Lab 1")
                .with_source("labs/one.md")
                .with_parent(ParentRef::Slug("labs".to_owned())),
            ContentRecord::new(2, "Extras"),
            ContentRecord::new(3, "Notes")
                .with_source("extras/notes.md")
                .with_parent(ParentRef::Declaration(2)),
        ];

        let graph = build(&records).unwrap();

        assert_eq!(graph.node(NodeId(1)).parent, Some(NodeId(0)));
        assert_eq!(graph.node(NodeId(3)).parent, Some(NodeId(2)));
        assert!(graph.node(NodeId(2)).is_section_index);
    }

    #[test]
    fn test_duplicate_source_keeps_first() {
        let records = vec![
            ContentRecord::new(0, "One").with_source("page.md"),
            ContentRecord::new(1, "Two").with_source("page.md").with_slug("two"),
        ];

        let graph = build(&records).unwrap();

        assert_eq!(graph.find_by_source("page.md"), Some(NodeId(0)));
        assert_eq!(graph.diagnostics()[0].kind, DiagnosticKind::DuplicateSource);
    }

    #[test]
    fn test_pre_order_and_ancestors() {
        let mut records = scenario_records();
        records.push(
            ContentRecord::new(5, "Deep")
                .with_source("sample/deep.md")
                .with_parent(ParentRef::Path("sample/newton.md".to_owned())),
        );
        let graph = build(&records).unwrap();

        let order: Vec<usize> = graph.pre_order().into_iter().map(NodeId::index).collect();
        assert_eq!(order, [0, 1, 2, 5, 3, 4]);
        let ancestors: Vec<NodeId> = graph.ancestors(NodeId(5)).collect();
        assert_eq!(ancestors, [NodeId(2), NodeId(1)]);
    }
}
