//! Reference rewriting in page bodies.
//!
//! Each internal reference is replaced by the relative path from the page's
//! output file to the referenced page or asset. External references,
//! fragment-only anchors and empty targets are left as written. A reference
//! that cannot be resolved keeps its original text and is reported.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;

use crate::asset::{AssetIndex, decode};
use crate::error::{Diagnostic, UnresolvedReason, UnresolvedReference};
use crate::graph::NodeId;
use crate::links::{self, LinkKind, page_href};
use crate::options::ResolveOptions;
use crate::resolver::ResolvedGraph;
use crate::scan;

/// Characters escaped when a resolved path is written back into a body.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'(')
    .add(b')')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'%');

/// Result of rewriting one body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rewritten {
    pub text: String,
    /// One entry per reference left unresolved.
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites references against a resolved graph and its asset index.
pub struct LinkRewriter<'a> {
    graph: &'a ResolvedGraph,
    assets: &'a AssetIndex,
    options: &'a ResolveOptions,
}

impl<'a> LinkRewriter<'a> {
    #[must_use]
    pub fn new(
        graph: &'a ResolvedGraph,
        assets: &'a AssetIndex,
        options: &'a ResolveOptions,
    ) -> Self {
        Self {
            graph,
            assets,
            options,
        }
    }

    /// Rewrite every recognized reference in `body`, written by `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not belong to the graph.
    #[must_use]
    pub fn rewrite(&self, node: NodeId, body: &str) -> Rewritten {
        let mut text = String::with_capacity(body.len());
        let mut diagnostics = Vec::new();
        let mut last = 0;

        for reference in scan::references(body) {
            match self.rewrite_target(node, reference.target) {
                Ok(Some(replacement)) => {
                    text.push_str(&body[last..reference.range.start]);
                    text.push_str(&replacement);
                    last = reference.range.end;
                }
                Ok(None) => {}
                Err(error) => {
                    log_unresolved(&error);
                    diagnostics.push(error.into());
                }
            }
        }
        text.push_str(&body[last..]);

        Rewritten { text, diagnostics }
    }

    /// Rewrite a single attribute value (an `href`, `src` or similar).
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedReference`] when the value names a document or
    /// asset that cannot be found. The caller keeps the original value.
    pub fn rewrite_attribute(
        &self,
        node: NodeId,
        value: &str,
    ) -> Result<String, UnresolvedReference> {
        match self.rewrite_target(node, value) {
            Ok(Some(rewritten)) => Ok(rewritten),
            Ok(None) => Ok(value.to_owned()),
            Err(error) => {
                log_unresolved(&error);
                Err(error)
            }
        }
    }

    /// Relative replacement for `target`, or `None` when it stays as is.
    fn rewrite_target(
        &self,
        node: NodeId,
        target: &str,
    ) -> Result<Option<String>, UnresolvedReference> {
        let (path, suffix) = links::split_suffix(target.trim());
        let decoded = decode(path);
        let source = match LinkKind::parse(path) {
            LinkKind::SiteRoot(_) => "",
            LinkKind::FileRelative(_) => {
                self.graph.node(node).source_path.as_deref().unwrap_or_default()
            }
            LinkKind::Empty | LinkKind::External(_) | LinkKind::Fragment(_) => return Ok(None),
        };

        let page = &self.graph.node(node).output_path;
        // A path climbing above the content root names no page.
        let linked = if links::escapes_root(source, &decoded) {
            None
        } else {
            self.graph
                .find_by_source(&links::resolve_against(source, &decoded))
                .or_else(|| self.graph.find_by_source(&links::normalize(&decoded)))
        };
        if let Some(linked) = linked {
            let href = page_href(page, &self.graph.node(linked).output_path);
            return Ok(Some(format!("{}{suffix}", encode(&href))));
        }

        // Indexed assets win regardless of extension, so extension-less
        // images still point at their published copy.
        if let Some(asset) = self.assets.lookup(node, &decoded) {
            return Ok(asset
                .output_path
                .as_ref()
                .map(|output| format!("{}{suffix}", encode(&page_href(page, output)))));
        }

        let unresolved = |reason| UnresolvedReference {
            node,
            target: target.to_owned(),
            reason,
        };
        let Some(extension) = links::extension(&decoded) else {
            return Ok(None);
        };
        if self.options.is_document(&extension) {
            return Err(unresolved(UnresolvedReason::MissingDocument));
        }
        if matches!(extension.as_str(), "html" | "htm") {
            return Ok(None);
        }
        Err(unresolved(UnresolvedReason::UnknownAsset))
    }
}

fn encode(href: &str) -> String {
    utf8_percent_encode(href, HREF).to_string()
}

fn log_unresolved(error: &UnresolvedReference) {
    tracing::warn!(
        node = %error.node,
        target = %error.target,
        reason = %error.reason,
        "Unresolved reference"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::extract_assets;
    use crate::error::DiagnosticKind;
    use crate::graph::ContentGraph;
    use crate::graph::tests::scenario_records;
    use crate::resolver::PathResolver;
    use pretty_assertions::assert_eq;

    const NEWTON: NodeId = NodeId::new(2);

    struct Fixture {
        graph: ResolvedGraph,
        assets: AssetIndex,
        options: ResolveOptions,
    }

    impl Fixture {
        fn new(newton_body: &str) -> Self {
            let options = ResolveOptions::default();
            let graph = ContentGraph::build(&scenario_records(), &options).unwrap();
            let graph = PathResolver::new(&options).resolve(graph).unwrap();
            let refs = extract_assets(NEWTON, newton_body, &options);
            let assets = AssetIndex::new(&graph, refs, &options.assets_dir).unwrap();
            Self {
                graph,
                assets,
                options,
            }
        }

        fn rewriter(&self) -> LinkRewriter<'_> {
            LinkRewriter::new(&self.graph, &self.assets, &self.options)
        }
    }

    #[test]
    fn test_rewrites_content_links() {
        let body = "[Home](../home.md) [Activities](activities.md#intro) [About](/about.md)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(
            result.text,
            "[Home](../../home/index.html) [Activities](../activities/activities.html#intro) [About](../../about/about.html)"
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_content_root_fallback() {
        // Written relative to the content root rather than the page.
        let body = "[Section](sample/_index.md)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, "[Section](../index.html)");
    }

    #[test]
    fn test_self_link_uses_file_name() {
        let body = "[Here](newton.md#top)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, "[Here](newton.html#top)");
    }

    #[test]
    fn test_external_and_fragments_untouched() {
        let body = "[Web](https://example.com/a.md) [Top](#top) [Mail](mailto:a@b.c) []()";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, body);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_rewrites_local_assets_and_keeps_remote() {
        let body =
            "![Forces](img/forces.png) ![Logo](https://example.com/logo.png)\n<img src=\"img/forces.png\">";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(
            result.text,
            "![Forces](files/forces.png) ![Logo](https://example.com/logo.png)\n<img src=\"files/forces.png\">"
        );
    }

    #[test]
    fn test_rewrites_extension_less_image() {
        let body = "![chart](img/chart) and [notes](img/chart-notes)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, "![chart](files/chart) and [notes](img/chart-notes)");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_percent_encoded_target_keeps_query() {
        let body = "[Sheet](My%20Sheet.pdf?download=1)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, "[Sheet](files/My%20Sheet.pdf?download=1)");
    }

    #[test]
    fn test_unresolved_document_keeps_token_and_continues() {
        let body = "[Gone](missing.md) then [About](../about.md)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, "[Gone](missing.md) then [About](../../about/about.html)");
        assert_eq!(result.diagnostics.len(), 1);
        let diagnostic = &result.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
        assert_eq!(diagnostic.node, Some(NEWTON));
        assert!(diagnostic.message.contains("missing.md"));
    }

    #[test]
    fn test_link_above_content_root_is_unresolved() {
        let body = "[About](../../../about.md) [Home](/../home.md) [Ok](../about.md)";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(
            result.text,
            "[About](../../../about.md) [Home](/../home.md) [Ok](../../about/about.html)"
        );
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result.diagnostics[0].message.contains("../../../about.md"));
    }

    #[test]
    fn test_unknown_asset_is_unresolved() {
        let fixture = Fixture::new("");
        let result = fixture.rewriter().rewrite(NEWTON, "[Data](data.csv)");

        assert_eq!(result.text, "[Data](data.csv)");
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_reference_definitions_and_html_links() {
        let body = "[about]: ../about.md\n<a href='../home.md'>Home</a>";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(
            result.text,
            "[about]: ../../about/about.html\n<a href='../../home/index.html'>Home</a>"
        );
    }

    #[test]
    fn test_code_blocks_untouched() {
        let body = "```\n[x](missing.md)\n```\n";
        let fixture = Fixture::new(body);

        let result = fixture.rewriter().rewrite(NEWTON, body);

        assert_eq!(result.text, body);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_rewrite_attribute() {
        let fixture = Fixture::new("");
        let rewriter = fixture.rewriter();

        assert_eq!(
            rewriter.rewrite_attribute(NEWTON, "../home.md").unwrap(),
            "../../home/index.html"
        );
        assert_eq!(
            rewriter.rewrite_attribute(NEWTON, "https://example.com").unwrap(),
            "https://example.com"
        );
        assert_eq!(rewriter.rewrite_attribute(NEWTON, "notes/").unwrap(), "notes/");

        let err = rewriter.rewrite_attribute(NEWTON, "nope.ipynb").unwrap_err();
        assert_eq!(err.reason, UnresolvedReason::MissingDocument);
        assert_eq!(err.target, "nope.ipynb");
    }

    #[test]
    fn test_section_index_links_resolve_from_its_source_dir() {
        let fixture = Fixture::new("");

        let result = fixture.rewriter().rewrite(NodeId::new(1), "[N](newton.md)");
        assert_eq!(result.text, "[N](newton/newton.html)");
    }
}
