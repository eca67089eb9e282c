//! Structural errors and recoverable diagnostics.

use std::fmt;

use serde::Serialize;

use crate::graph::NodeId;

/// Error that invalidates the whole resolution pass.
///
/// Nodes are named by their source path, declared slug or title so the
/// message points at the offending manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A declared parent matches no node.
    #[error("{node} declares parent {reference}, which is not in the manifest")]
    MissingParent { node: String, reference: String },

    /// Parent links form a cycle.
    #[error("Cyclic hierarchy: {}", members.join(" -> "))]
    CyclicHierarchy { members: Vec<String> },

    /// Two siblings resolve to the same slug.
    #[error("Slug '{slug}' is used by both {first} and {second} under {scope}")]
    SlugCollision {
        slug: String,
        first: String,
        second: String,
        scope: String,
    },

    /// More than one node is designated as the site root.
    #[error("Both {first} and {second} are designated as the site root")]
    DuplicateRoot { first: String, second: String },

    /// The designated root declares a parent.
    #[error("Site root {node} must be top-level but declares parent {parent}")]
    NestedRoot { node: String, parent: String },

    /// Two nodes resolve to the same output path.
    #[error("{first} and {second} both resolve to output path '{path}'")]
    OutputCollision {
        path: String,
        first: String,
        second: String,
    },

    /// An asset reference names a node outside the graph.
    #[error("Asset '{asset}' references unknown node {node}")]
    UnknownReferencingNode { node: NodeId, asset: String },

    /// A slug cannot be used (strict mode only; otherwise a diagnostic).
    #[error("Invalid slug '{slug}' on {node}: {reason}")]
    InvalidSlug {
        node: String,
        slug: String,
        reason: String,
    },
}

/// Why a reference could not be rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Target looks like a source document but matches no node.
    MissingDocument,
    /// Target looks like a local asset but is not in the asset index.
    UnknownAsset,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDocument => f.write_str("no content node has this source path"),
            Self::UnknownAsset => f.write_str("no asset with this path is referenced by the page"),
        }
    }
}

/// A single internal reference that could not be resolved.
///
/// Recovered per occurrence: the original token stays in the output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unresolved reference '{target}' in node {node}: {reason}")]
pub struct UnresolvedReference {
    /// Page containing the reference.
    pub node: NodeId,
    /// Reference exactly as written.
    pub target: String,
    pub reason: UnresolvedReason,
}

/// Category of a recovered problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A slug was rejected and a fallback was used.
    InvalidSlug,
    /// A link or asset reference could not be rewritten.
    UnresolvedReference,
    /// Two records share a source path; lookups use the first.
    DuplicateSource,
    /// Two assets of one page share a file name in its asset directory.
    AssetCollision,
}

/// Recovered problem reported alongside a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Node the problem belongs to, if any.
    pub node: Option<NodeId>,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(
        kind: DiagnosticKind,
        node: Option<NodeId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            node,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "[{:?}] node {node}: {}", self.kind, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

impl From<UnresolvedReference> for Diagnostic {
    fn from(error: UnresolvedReference) -> Self {
        Self::new(
            DiagnosticKind::UnresolvedReference,
            Some(error.node),
            error.to_string(),
        )
    }
}

/// Order diagnostics by node id, graph-wide entries first. Stable, so
/// entries for one node keep their discovery order.
pub(crate) fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| d.node);
}
