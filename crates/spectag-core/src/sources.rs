//! Source providers for tag processing

use crate::driver::{process_file, process_text, FileReport};
use crate::resolve::Resolver;
use eyre::Result;
use std::path::PathBuf;

/// Marker every candidate file must contain
const MARKER: &str = "<spec";

/// Trait for providing files to process
pub trait Sources {
    /// Process every file, returning one report per file sorted by path
    fn process(self, resolver: &Resolver<'_>) -> Result<Vec<FileReport>>;
}

fn sorted(mut reports: Vec<FileReport>) -> Vec<FileReport> {
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    reports
}

/// Sources from an explicit list of file paths. Unreadable files are fatal.
pub struct PathSources(Vec<PathBuf>);

impl PathSources {
    /// Create from an iterator of paths
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self(paths.into_iter().map(Into::into).collect())
    }
}

impl Sources for PathSources {
    fn process(self, resolver: &Resolver<'_>) -> Result<Vec<FileReport>> {
        #[cfg(feature = "parallel")]
        let reports = {
            use rayon::prelude::*;
            self.0
                .par_iter()
                .map(|path| process_file(path, resolver))
                .collect::<Result<Vec<_>>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let reports = self
            .0
            .iter()
            .map(|path| process_file(path, resolver))
            .collect::<Result<Vec<_>>>()?;

        Ok(sorted(reports))
    }
}

/// In-memory sources (useful for testing)
#[derive(Default)]
pub struct MemorySources(Vec<(PathBuf, String)>);

impl MemorySources {
    /// Create empty memory sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with content
    pub fn add(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.0.push((path.into(), content.into()));
        self
    }
}

impl Sources for MemorySources {
    fn process(self, resolver: &Resolver<'_>) -> Result<Vec<FileReport>> {
        let reports = self
            .0
            .into_iter()
            .map(|(path, content)| process_text(path, &content, resolver))
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted(reports))
    }
}

/// Gitignore-aware directory walker.
///
/// Only text files containing `<spec` are processed; files that are not
/// valid UTF-8 are skipped.
#[cfg(feature = "walk")]
pub struct WalkSources {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
}

#[cfg(feature = "walk")]
impl WalkSources {
    /// Create a walker for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Add include patterns (e.g., `["**/*.rs"]`). No patterns means every file.
    pub fn include(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add exclude patterns (e.g., `["target/**"]`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Files under the root that pass the filters and contain a marker
    pub fn candidates(&self) -> Result<Vec<(PathBuf, String)>> {
        use eyre::WrapErr;
        use ignore::WalkBuilder;

        let include = glob_set(&self.include)?;
        let exclude = glob_set(&self.exclude)?;

        let walker = WalkBuilder::new(&self.root)
            .follow_links(true)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.wrap_err_with(|| format!("failed to walk {}", self.root.display()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if !self.include.is_empty() && !include.is_match(relative) {
                continue;
            }
            if exclude.is_match(relative) {
                continue;
            }

            match std::fs::read_to_string(path) {
                Ok(content) if content.contains(MARKER) => files.push((path.to_path_buf(), content)),
                Ok(_) => {}
                Err(e) => tracing::debug!(path = %path.display(), "skipping: {e}"),
            }
        }

        Ok(files)
    }
}

#[cfg(feature = "walk")]
fn glob_set(patterns: &[String]) -> Result<globset::GlobSet> {
    use eyre::WrapErr;

    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::Glob::new(pattern)
            .wrap_err_with(|| format!("invalid glob pattern `{pattern}`"))?;
        builder.add(glob);
    }
    builder.build().wrap_err("failed to build glob set")
}

#[cfg(feature = "walk")]
impl Sources for WalkSources {
    fn process(self, resolver: &Resolver<'_>) -> Result<Vec<FileReport>> {
        let files = self.candidates()?;
        tracing::debug!(root = %self.root.display(), files = files.len(), "collected candidate files");

        #[cfg(feature = "parallel")]
        let reports = {
            use rayon::prelude::*;
            files
                .into_par_iter()
                .map(|(path, content)| process_text(path, &content, resolver))
                .collect::<Result<Vec<_>>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let reports = files
            .into_iter()
            .map(|(path, content)| process_text(path, &content, resolver))
            .collect::<Result<Vec<_>>>()?;

        Ok(sorted(reports))
    }
}
