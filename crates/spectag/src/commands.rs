//! The work behind each subcommand, kept free of printing

use crate::config::Config;
use eyre::{Result, WrapErr};
use spectag_core::{
    FileReport, ForkOrder, ItemHistory, KnowledgeBase, PathSources, Resolver, Sources,
    WalkSources, DEFAULT_PRESET, item_history,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// A project root and its configuration
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    /// Open a project, reading `config` or else `<root>/.spectag.yml`
    pub fn open(root: impl Into<PathBuf>, config: Option<&Path>) -> Result<Self> {
        let root = root.into();
        let config = match config {
            Some(path) => Config::load(path)?,
            None => Config::discover(&root)?,
        };
        Ok(Self { root, config })
    }

    pub fn knowledge_base(&self) -> Result<KnowledgeBase> {
        let dir = self.config.knowledge_base_dir(&self.root);
        KnowledgeBase::load(&dir, &self.config.versions())
            .wrap_err_with(|| format!("Failed to load knowledge base from {}", dir.display()))
    }

    fn walk(&self, dir: &Path) -> WalkSources {
        WalkSources::new(dir)
            .include(self.config.include.iter().cloned())
            .exclude(self.config.exclude_patterns())
    }
}

/// Options of the `process` command
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Files or directories to process; empty means the whole project
    pub paths: Vec<PathBuf>,
    /// Report what would change without writing anything
    pub check: bool,
}

/// Outcome of the `process` command
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub reports: Vec<FileReport>,
    pub check: bool,
}

impl ProcessOutcome {
    pub fn tags(&self) -> usize {
        self.reports.iter().map(|r| r.tags).sum()
    }

    pub fn updated(&self) -> usize {
        self.reports.iter().map(|r| r.updated).sum()
    }

    pub fn errors(&self) -> usize {
        self.reports.iter().map(|r| r.errors.len()).sum()
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.reports.iter().filter(|r| r.changed())
    }

    /// Whether the run should exit successfully
    pub fn is_passing(&self) -> bool {
        self.errors() == 0 && !(self.check && self.changed_files().next().is_some())
    }
}

/// Scan, resolve and rewrite tags
pub fn process(project: &Project, options: &ProcessOptions) -> Result<ProcessOutcome> {
    let kb = project.knowledge_base()?;
    let forks = project.config.fork_order();
    let resolver = Resolver::new(&kb, &forks, project.config.defaults()?);

    let mut reports = Vec::new();
    if options.paths.is_empty() {
        reports.extend(project.walk(&project.root).process(&resolver)?);
    } else {
        let (dirs, files) = distinct_paths(&options.paths);
        for dir in dirs {
            reports.extend(project.walk(dir).process(&resolver)?);
        }
        reports.extend(PathSources::new(files).process(&resolver)?);
    }
    reports.sort_by(|a, b| a.path.cmp(&b.path));

    if !options.check {
        for report in &reports {
            report.write_back()?;
        }
    }

    let outcome = ProcessOutcome {
        reports,
        check: options.check,
    };
    info!(
        files = outcome.reports.len(),
        tags = outcome.tags(),
        updated = outcome.updated(),
        errors = outcome.errors(),
        "processed project"
    );
    Ok(outcome)
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Split paths into directories and files, dropping repeats and anything
/// already covered by a listed directory.
fn distinct_paths(paths: &[PathBuf]) -> (Vec<&PathBuf>, Vec<&PathBuf>) {
    let mut dirs: Vec<(PathBuf, &PathBuf)> = paths
        .iter()
        .filter(|p| p.is_dir())
        .map(|p| (canonical(p), p))
        .collect();
    // parents sort before their children
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    let mut kept_dirs: Vec<(PathBuf, &PathBuf)> = Vec::new();
    for (canon, path) in dirs {
        if !kept_dirs.iter().any(|(kept, _)| canon.starts_with(kept)) {
            kept_dirs.push((canon, path));
        }
    }

    let mut seen = BTreeSet::new();
    let files = paths
        .iter()
        .filter(|p| !p.is_dir())
        .filter(|p| {
            let canon = canonical(p);
            !kept_dirs.iter().any(|(dir, _)| canon.starts_with(dir)) && seen.insert(canon)
        })
        .collect();

    (kept_dirs.into_iter().map(|(_, p)| p).collect(), files)
}

/// Item history of one preset, as listed by the `history` command
#[derive(Debug, Clone)]
pub struct HistoryListing {
    pub preset: String,
    pub history: ItemHistory,
}

/// Trace every item through the fork order in the newest loaded version.
///
/// `search` keeps only items whose name contains it, ignoring case.
pub fn history(project: &Project, preset: Option<&str>, search: Option<&str>) -> Result<HistoryListing> {
    let kb = project.knowledge_base()?;
    let defaults = project.config.defaults()?;
    let snapshot = kb.snapshot(&defaults.version)?;

    let preset = preset.unwrap_or(DEFAULT_PRESET);
    if !snapshot.has_preset(preset) {
        let available: Vec<&str> = snapshot.presets().collect();
        eyre::bail!(
            "Unknown preset '{}' (available: {})",
            preset,
            available.join(", ")
        );
    }

    let mut history = item_history(snapshot, &project.config.fork_order(), preset);
    if let Some(search) = search {
        let search = search.to_lowercase();
        for names in history.values_mut() {
            names.retain(|name, _| name.to_lowercase().contains(&search));
        }
        history.retain(|_, names| !names.is_empty());
    }

    Ok(HistoryListing {
        preset: preset.to_string(),
        history,
    })
}

/// The configured fork order
pub fn forks(project: &Project) -> ForkOrder {
    project.config.fork_order()
}
