//! Processing one file: scan, resolve, rewrite

use crate::error::TagError;
use crate::resolve::Resolver;
use crate::rewrite::{apply, render_tag};
use crate::tag::scan;
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of processing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Rewritten text, if anything changed
    pub new_text: Option<String>,
    /// Tags that were left untouched, and why
    pub errors: Vec<TagError>,
    /// Tags found, malformed ones included
    pub tags: usize,
    /// Tags whose text changed
    pub updated: usize,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.new_text.is_some()
    }

    /// Persist the rewritten text. Returns whether anything was written.
    pub fn write_back(&self) -> Result<bool> {
        let Some(text) = &self.new_text else {
            return Ok(false);
        };
        std::fs::write(&self.path, text)
            .wrap_err_with(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "wrote file");
        Ok(true)
    }
}

/// Rewrite every tag of a text.
///
/// Tags that fail to parse or resolve are left as they are and reported;
/// the others are rewritten in a single pass.
pub fn process_text(path: impl Into<PathBuf>, text: &str, resolver: &Resolver<'_>) -> Result<FileReport> {
    let path = path.into();
    let mut report = FileReport {
        path,
        new_text: None,
        errors: Vec::new(),
        tags: 0,
        updated: 0,
    };
    let mut replacements = Vec::new();

    for found in scan(text) {
        report.tags += 1;
        let tag = match found {
            Ok(tag) => tag,
            Err(err) => {
                warn!(path = %report.path.display(), "{err}");
                report.errors.push(err);
                continue;
            }
        };

        match resolver.resolve(&tag) {
            Ok(resolution) => {
                let replacement = render_tag(text, &tag, &resolution);
                if replacement.text != text[tag.span.range()] {
                    report.updated += 1;
                    replacements.push(replacement);
                }
            }
            Err(kind) => {
                let err = TagError {
                    line: tag.line,
                    span: tag.opening,
                    kind,
                };
                warn!(path = %report.path.display(), "{err}");
                report.errors.push(err);
            }
        }
    }

    if !replacements.is_empty() {
        let new_text = apply(text, replacements)
            .wrap_err_with(|| format!("failed to rewrite {}", report.path.display()))?;
        if new_text != text {
            report.new_text = Some(new_text);
        }
    }

    debug!(
        path = %report.path.display(),
        tags = report.tags,
        updated = report.updated,
        errors = report.errors.len(),
        "processed file"
    );
    Ok(report)
}

/// Read and process a file from disk
pub fn process_file(path: &Path, resolver: &Resolver<'_>) -> Result<FileReport> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    process_text(path, &text, resolver)
}
