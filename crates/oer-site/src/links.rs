//! Relative path math between output files.
//!
//! All paths are `/`-separated and relative to the build root. The last
//! segment of a `from` path is the current document; its base directory is
//! everything before it.

use std::sync::LazyLock;

use regex::Regex;

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Compute the relative path from one output file to another.
///
/// Returns `"."` when both paths are the same file.
///
/// # Examples
///
/// ```
/// use oer_site::resolve_relative;
///
/// assert_eq!(
///     resolve_relative("sample-resources/newton/newton.html", "home/index.html"),
///     "../../home/index.html"
/// );
/// assert_eq!(resolve_relative("about/about.html", "about/files/a.png"), "files/a.png");
/// assert_eq!(resolve_relative("about/about.html", "about/about.html"), ".");
/// ```
#[must_use]
pub fn resolve_relative(from: &str, to: &str) -> String {
    let from_segs = segments(from);
    let to_segs = segments(to);
    if from_segs == to_segs {
        return ".".to_owned();
    }

    let from_dir = &from_segs[..from_segs.len().saturating_sub(1)];
    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = "../".repeat(from_dir.len() - common);
    let down = to_segs[common..].join("/");

    let result = format!("{ups}{down}");
    if result.is_empty() {
        "./".to_owned()
    } else {
        result
    }
}

/// Link from one page to another. A page linking to itself gets its own
/// file name, so the link never points at the enclosing directory.
pub(crate) fn page_href(from: &str, to: &str) -> String {
    if segments(from) == segments(to) {
        file_name(to).to_owned()
    } else {
        resolve_relative(from, to)
    }
}

/// Resolve a relative reference against the directory of `from`.
///
/// Inverse of [`resolve_relative`]: for distinct files `a` and `b`,
/// `resolve_against(a, &resolve_relative(a, b)) == b`. A leading `/` makes
/// the reference build-root relative. `..` never climbs above the root.
#[must_use]
pub fn resolve_against(from: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        return normalize(relative);
    }
    let from_segs = segments(from);
    let base = from_segs[..from_segs.len().saturating_sub(1)].join("/");
    normalize(&format!("{base}/{relative}"))
}

/// Whether `relative`, resolved like [`resolve_against`], climbs above the
/// root instead of being clamped there.
pub(crate) fn escapes_root(from: &str, relative: &str) -> bool {
    let mut depth = if relative.starts_with('/') {
        0
    } else {
        segments(from).len().saturating_sub(1)
    };
    for component in relative.split('/') {
        match component {
            "" | "." => {}
            ".." if depth == 0 => return true,
            ".." => depth -= 1,
            _ => depth += 1,
        }
    }
    false
}

/// Collapse `.`, `..` and empty segments.
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            _ => out.push(component),
        }
    }
    out.join("/")
}

/// Directory part of a `/`-separated path (empty at the top level).
pub(crate) fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// File name part of a `/`-separated path.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Lowercase extension of the final path segment, if any.
pub(crate) fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Split a reference into its path and its `?query#fragment` suffix.
pub(crate) fn split_suffix(target: &str) -> (&str, &str) {
    target
        .find(['?', '#'])
        .map_or((target, ""), |pos| target.split_at(pos))
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Syntactic classification of a reference target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind<'a> {
    /// Nothing to resolve.
    Empty,
    /// URL with a scheme (`https:`, `mailto:`, `data:`...) or protocol-relative.
    External(&'a str),
    /// Anchor on the current page. Value excludes the `#`.
    Fragment(&'a str),
    /// Path relative to the content root (`/sample/newton.md`).
    SiteRoot(&'a str),
    /// Path relative to the referencing file (`../img/a.png`).
    FileRelative(&'a str),
}

impl<'a> LinkKind<'a> {
    /// Classify a reference as written in a document.
    #[must_use]
    pub fn parse(link: &'a str) -> Self {
        if link.is_empty() {
            Self::Empty
        } else if link.starts_with("//") || URL_SCHEME.is_match(link) {
            Self::External(link)
        } else if let Some(anchor) = link.strip_prefix('#') {
            Self::Fragment(anchor)
        } else if let Some(anchor) = link.strip_prefix("./#") {
            Self::Fragment(anchor)
        } else if link.starts_with('/') {
            Self::SiteRoot(link)
        } else {
            Self::FileRelative(link)
        }
    }

    /// Whether the target is fetched over HTTP(S).
    #[must_use]
    pub fn is_http(link: &str) -> bool {
        let lower = link.get(..8).unwrap_or(link).to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://") || link.starts_with("//")
    }
}
