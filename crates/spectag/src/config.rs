//! Configuration schema for spectag
//!
//! Config lives at `.spectag.yml` in the project root and is optional:
//!
//! ```yaml
//! version: v1.5.0
//! style: diff
//! knowledge_base: pyspec
//! versions: [v1.4.0, v1.5.0, nightly]
//! forks: [phase0, altair, bellatrix, capella, deneb, electra, fulu]
//! include: ["**/*.rs"]
//! exclude: ["vendor/**"]
//! ```

use eyre::{Result, WrapErr};
use facet::Facet;
use spectag_core::{Defaults, ForkOrder, NIGHTLY, Style};
use std::path::{Path, PathBuf};

/// Default config file name, relative to the project root
pub const CONFIG_FILE: &str = ".spectag.yml";

/// Default knowledge base directory, relative to the project root
pub const DEFAULT_KNOWLEDGE_BASE: &str = "pyspec";

/// Root configuration for spectag
#[derive(Debug, Clone, Default, Facet)]
pub struct Config {
    /// Version used by tags without a `version` attribute (default: nightly)
    #[facet(default)]
    pub version: Option<String>,

    /// Style used by tags without a `style` attribute (default: full)
    #[facet(default)]
    pub style: Option<String>,

    /// Knowledge base directory, relative to the project root
    #[facet(default)]
    pub knowledge_base: Option<String>,

    /// Versions to load from the knowledge base, oldest first
    /// Defaults to `[nightly]`
    #[facet(default)]
    pub versions: Vec<String>,

    /// Fork order, oldest first. Defaults to the known mainnet forks.
    #[facet(default)]
    pub forks: Vec<String>,

    /// Glob patterns for files to scan. Empty means every file.
    #[facet(default)]
    pub include: Vec<String>,

    /// Glob patterns to exclude
    #[facet(default)]
    pub exclude: Vec<String>,
}

impl Config {
    /// Parse a YAML document. An empty document is the default config.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        facet_yaml::from_str(content).map_err(|e| eyre::eyre!("invalid config: {e}"))
    }

    /// Load a config file, which must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `.spectag.yml` from the project root if there is one
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Attribute defaults for tags
    pub fn defaults(&self) -> Result<Defaults> {
        let style = match &self.style {
            Some(s) => s.parse::<Style>().map_err(|e| eyre::eyre!("invalid config: {e}"))?,
            None => Style::default(),
        };
        Ok(Defaults {
            version: self.version.clone().unwrap_or_else(|| NIGHTLY.to_string()),
            style,
        })
    }

    pub fn fork_order(&self) -> ForkOrder {
        if self.forks.is_empty() {
            ForkOrder::default()
        } else {
            ForkOrder::new(self.forks.iter().cloned())
        }
    }

    /// Versions to load, oldest first
    pub fn versions(&self) -> Vec<String> {
        if self.versions.is_empty() {
            vec![NIGHTLY.to_string()]
        } else {
            self.versions.clone()
        }
    }

    pub fn knowledge_base_dir(&self, root: &Path) -> PathBuf {
        root.join(
            self.knowledge_base
                .as_deref()
                .unwrap_or(DEFAULT_KNOWLEDGE_BASE),
        )
    }

    /// Exclude patterns, always skipping build output and the knowledge base
    pub fn exclude_patterns(&self) -> Vec<String> {
        let knowledge_base = self
            .knowledge_base
            .as_deref()
            .unwrap_or(DEFAULT_KNOWLEDGE_BASE)
            .trim_end_matches('/');

        let mut patterns = vec!["target/**".to_string(), format!("{knowledge_base}/**")];
        patterns.extend(self.exclude.iter().cloned());
        patterns
    }
}
