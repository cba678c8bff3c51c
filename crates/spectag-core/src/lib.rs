//! spectag-core - Core library for keeping spec excerpts in sync
//!
//! Source files quote consensus-spec items inside `<spec>` tags placed in
//! comments. This crate provides the building blocks for:
//! - Scanning any text for tags, whatever comment syntax hosts them
//! - Resolving a tag against versioned snapshots of the specification
//! - Rendering items in full, as a diff against the previous fork, as a
//!   hash, or as a source link
//! - Rewriting tag bodies in place while preserving each line's comment prefix
//!
//! # Features
//!
//! - `walk` - Enable [`WalkSources`] for gitignore-aware directory walking (brings in `ignore` and `globset`)
//! - `parallel` - Enable parallel processing (brings in `rayon`)
//!
//! # Tags
//!
//! ```text
//! // <spec fn="process_deposit" fork="electra"></spec>
//! // <spec ssz_object="BeaconState" fork="electra" style="diff"></spec>
//! // <spec preset_var="FIELD_ELEMENTS_PER_BLOB" fork="deneb" preset="minimal" />
//! ```
//!
//! # Processing
//!
//! ```
//! use spectag_core::{
//!     Defaults, ForkOrder, ItemKind, KnowledgeBase, MemorySources, Resolver, Sources,
//!     SpecSnapshot,
//! };
//!
//! let mut snapshot = SpecSnapshot::new("nightly");
//! snapshot.insert("mainnet", "deneb", ItemKind::Constant, "X", "X = 42");
//! let kb = KnowledgeBase::new([snapshot]);
//! let forks = ForkOrder::default();
//! let resolver = Resolver::new(&kb, &forks, Defaults::default());
//!
//! let reports = MemorySources::new()
//!     .add("lib.rs", "// <spec constant_var=\"X\" fork=\"deneb\"></spec>\n")
//!     .process(&resolver)
//!     .unwrap();
//!
//! assert_eq!(
//!     reports[0].new_text.as_deref(),
//!     Some("// <spec constant_var=\"X\" fork=\"deneb\">\n// X = 42\n// </spec>\n")
//! );
//! ```

mod diff;
mod driver;
mod error;
mod forks;
mod resolve;
mod rewrite;
mod snapshot;
mod sources;
mod strip;
mod tag;

pub use diff::{diff, diff_text, unified, DiffHunk, DiffLine, TextDiff, CONTEXT};
pub use driver::{process_file, process_text, FileReport};
pub use error::{TagError, TagErrorKind};
pub use forks::{item_history, previous_defining_fork, ForkOrder, ItemHistory, DEFAULT_FORKS};
pub use resolve::{
    content_hash, Defaults, LineRange, Resolution, Resolver, Style, TagRequest, LINK_UNAVAILABLE,
};
pub use rewrite::{apply, render_tag, rewrite, Replacement};
pub use snapshot::{
    ItemKind, KnowledgeBase, SpecItem, SpecSnapshot, DEFAULT_PRESET, LINKS_FILE, NIGHTLY,
    SNAPSHOT_FILE,
};
pub use sources::{MemorySources, PathSources, Sources};
pub use strip::strip_comments;
pub use tag::{scan, Attributes, BodyLine, LineTemplate, Scanner, SourceSpan, Tag};

#[cfg(feature = "walk")]
pub use sources::WalkSources;
