//! Table-of-contents manifest loading for OER site builds.
//!
//! The manifest (`_content.yml`) declares every document of a site as a
//! nested `toc` list. This crate parses it once, validates it, and flattens it
//! into [`ContentRecord`]s: the strongly-typed shape the resolution core
//! consumes without re-validating.
//!
//! # Example
//!
//! ```
//! use oer_manifest::{ManifestLoader, ParentRef};
//!
//! let yaml = r"
//! toc:
//!   - title: Home
//!     file: home.md
//!     slug: main
//!   - title: Sample
//!     file: sample/_index.md
//!     children:
//!       - title: Newton
//!         file: sample/newton.md
//! ";
//!
//! let manifest = ManifestLoader::default().parse(yaml)?;
//! assert_eq!(manifest.records.len(), 3);
//! assert!(manifest.records[0].is_root);
//! assert_eq!(
//!     manifest.records[2].parent,
//!     Some(ParentRef::Path("sample/_index.md".to_owned()))
//! );
//! # Ok::<(), oer_manifest::ManifestError>(())
//! ```

mod loader;
mod record;

pub use loader::{Manifest, ManifestError, ManifestLoader};
pub use record::{ContentRecord, ExportConfig, ParentRef};
