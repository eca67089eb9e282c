//! Slug derivation.
//!
//! A node's slug comes from the first usable source in this order: the
//! declared slug, the source filename stem (`index`/`_index` use the
//! containing directory), the title, and finally `section-<order>`.

use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Normalize text into a slug: lowercase ASCII alphanumerics, with every run
/// of other characters collapsed to a single `-` and trimmed from both ends.
///
/// ```
/// use oer_site::slugify;
///
/// assert_eq!(slugify("Newton's Laws of Motion"), "newton-s-laws-of-motion");
/// assert_eq!(slugify("  --  "), "");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_owned()
}

/// Slug derived from a content-relative source path.
pub(crate) fn from_source_path(source_path: &str) -> Option<String> {
    let mut segments = source_path.rsplit('/');
    let name = segments.next()?;
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let base = if matches!(stem, "index" | "_index") {
        segments.next()?
    } else {
        stem
    };
    non_empty(slugify(base))
}

/// Slug derived from a display title.
pub(crate) fn from_title(title: &str) -> Option<String> {
    non_empty(slugify(title))
}

/// Last-resort slug for a node with nothing usable to derive from.
pub(crate) fn fallback(order: usize, reserved: &str) -> String {
    let slug = format!("section-{order}");
    if slug == reserved {
        format!("{reserved}-{order}")
    } else {
        slug
    }
}

/// Why a declared slug cannot be used verbatim.
pub(crate) fn declared_slug_problem(slug: &str) -> Option<&'static str> {
    if slug.trim().is_empty() {
        Some("slug is empty")
    } else if slug.contains(['/', '\\']) {
        Some("slug contains a path separator")
    } else if matches!(slug, "." | "..") {
        Some("slug is a relative path component")
    } else {
        None
    }
}

fn non_empty(slug: String) -> Option<String> {
    (!slug.is_empty()).then_some(slug)
}
