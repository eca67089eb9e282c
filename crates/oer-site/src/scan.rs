//! Reference scanning in page bodies.
//!
//! Recognizes markdown inline links and images, markdown reference
//! definitions and HTML `href`/`src` attributes. Anything inside fenced code
//! blocks or inline code spans is left alone.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static MD_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(!?)\[(?:[^\[\]]|\[[^\[\]]*\])*\]\(\s*(<[^<>\n]*>|[^\s()<>]+(?:\([^\s()]*\)[^\s()<>]*)*)(?:\s+(?:"[^"\n]*"|'[^'\n]*'|\([^)\n]*\)))?\s*\)"#,
    )
    .unwrap()
});

static MD_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ {0,3}\[([^\]\n]+)\]:[ \t]*(<[^<>\n]*>|\S+)").unwrap());

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<([a-z][a-z0-9-]*)\b[^>]*>").unwrap());

static HTML_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s(href|src)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^ {0,3}(?:```|~~~)[^\n]*\n.*?^ {0,3}(?:```|~~~)[ \t]*$").unwrap()
});

static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());

/// Syntax a reference was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Syntax {
    /// `[text](target)`
    MarkdownLink,
    /// `![alt](target)`
    MarkdownImage,
    /// `[id]: target`
    Definition,
    /// `href="target"`
    HtmlHref,
    /// `src="target"` on an `<img>`
    HtmlImage,
    /// `src="target"` on any other element
    HtmlSrc,
}

impl Syntax {
    pub(crate) fn is_image(self) -> bool {
        matches!(self, Self::MarkdownImage | Self::HtmlImage)
    }
}

/// One reference target found in a body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Reference<'a> {
    pub(crate) syntax: Syntax,
    /// Target text, without angle brackets or quotes.
    pub(crate) target: &'a str,
    /// Byte range of `target` in the body.
    pub(crate) range: Range<usize>,
}

/// All references in `body`, ordered by position, without overlaps.
pub(crate) fn references(body: &str) -> Vec<Reference<'_>> {
    let code: Vec<Range<usize>> = FENCED_CODE
        .find_iter(body)
        .chain(INLINE_CODE.find_iter(body))
        .map(|m| m.range())
        .collect();
    let in_code = |range: &Range<usize>| {
        code.iter()
            .any(|c| c.start <= range.start && range.end <= c.end)
    };

    let mut found = Vec::new();

    for caps in MD_INLINE.captures_iter(body) {
        let (Some(bang), Some(target)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let syntax = if bang.as_str().is_empty() {
            Syntax::MarkdownLink
        } else {
            Syntax::MarkdownImage
        };
        found.push(unbracket(body, syntax, target.range()));
    }

    for caps in MD_DEFINITION.captures_iter(body) {
        let (Some(label), Some(target)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        // Footnote definitions share the syntax.
        if label.as_str().starts_with('^') {
            continue;
        }
        found.push(unbracket(body, Syntax::Definition, target.range()));
    }

    for tag in HTML_TAG.captures_iter(body) {
        let (Some(whole), Some(name)) = (tag.get(0), tag.get(1)) else {
            continue;
        };
        let is_img = name.as_str().eq_ignore_ascii_case("img");
        for attr in HTML_ATTR.captures_iter(whole.as_str()) {
            let Some(value) = attr.get(2).or_else(|| attr.get(3)) else {
                continue;
            };
            let syntax = match (attr.get(1).map(|a| a.as_str().to_ascii_lowercase()), is_img) {
                (Some(a), _) if a == "href" => Syntax::HtmlHref,
                (_, true) => Syntax::HtmlImage,
                _ => Syntax::HtmlSrc,
            };
            let start = whole.start() + value.start();
            let end = whole.start() + value.end();
            found.push(Reference {
                syntax,
                target: &body[start..end],
                range: start..end,
            });
        }
    }

    found.retain(|r| !in_code(&r.range));
    found.sort_by_key(|r| r.range.start);

    let mut accepted: Vec<Reference<'_>> = Vec::with_capacity(found.len());
    for reference in found {
        if accepted.last().is_none_or(|last| last.range.end <= reference.range.start) {
            accepted.push(reference);
        }
    }
    accepted
}

/// Strip `<...>` around a markdown target.
fn unbracket(body: &str, syntax: Syntax, range: Range<usize>) -> Reference<'_> {
    let raw = &body[range.clone()];
    let range = if raw.len() >= 2 && raw.starts_with('<') && raw.ends_with('>') {
        range.start + 1..range.end - 1
    } else {
        range
    };
    Reference {
        syntax,
        target: &body[range.clone()],
        range,
    }
}
