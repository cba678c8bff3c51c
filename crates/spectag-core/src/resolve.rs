//! Turning tag attributes into body lines

use crate::diff::diff_text;
use crate::error::TagErrorKind;
use crate::forks::{previous_defining_fork, suggest, ForkOrder};
use crate::snapshot::{ItemKind, KnowledgeBase, SpecItem, DEFAULT_PRESET, NIGHTLY};
use crate::tag::{Attributes, Tag};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Body of a `link` tag naming something other than a function
pub const LINK_UNAVAILABLE: &str = "Not available for this type of spec";

/// How a tag's body is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// The item's rendering, annotations intact
    #[default]
    Full,
    /// Unified diff against the fork that defined the previous version
    Diff,
    /// No body, only a `hash` attribute tracking the rendering
    Hash,
    /// The item's source URL
    Link,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Full => "full",
            Style::Diff => "diff",
            Style::Hash => "hash",
            Style::Link => "link",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Style::Full),
            "diff" => Ok(Style::Diff),
            "hash" => Ok(Style::Hash),
            "link" => Ok(Style::Link),
            other => Err(format!(
                "unknown style `{other}` (expected full, diff, hash or link)"
            )),
        }
    }
}

/// A 1-based, inclusive line range from a `lines` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl FromStr for LineRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("invalid line range `{s}` (expected `N` or `N-M`)");
        let parse = |n: &str| n.trim().parse::<usize>().ok().filter(|&n| n > 0);

        let (start, end) = match s.split_once('-') {
            Some((a, b)) => (parse(a).ok_or_else(bad)?, parse(b).ok_or_else(bad)?),
            None => {
                let n = parse(s).ok_or_else(bad)?;
                (n, n)
            }
        };
        if end < start {
            return Err(bad());
        }
        Ok(Self { start, end })
    }
}

impl LineRange {
    /// Select the range from a rendering, clamped to its length, and remove
    /// the indentation the selected lines share.
    ///
    /// A range starting past the end selects the last line.
    pub fn select(&self, text: &str) -> String {
        let lines: Vec<&str> = text.trim_end().lines().collect();
        if lines.is_empty() {
            return String::new();
        }
        let end = self.end.min(lines.len());
        let start = self.start.min(end);
        dedent(&lines[start - 1..end]).join("\n")
    }
}

fn is_blank(line: &str) -> bool {
    line.trim_start_matches([' ', '\t']).is_empty()
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start_matches([' ', '\t']).len()]
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum::<usize>();
    &a[..len]
}

/// Remove the leading spaces and tabs every non-blank line shares.
/// Blank lines become empty.
fn dedent(lines: &[&str]) -> Vec<String> {
    let margin = lines
        .iter()
        .copied()
        .filter(|l| !is_blank(l))
        .map(leading_whitespace)
        .reduce(common_prefix)
        .unwrap_or("");

    lines
        .iter()
        .map(|&l| {
            if is_blank(l) {
                String::new()
            } else {
                l.strip_prefix(margin).unwrap_or(l).to_string()
            }
        })
        .collect()
}

/// Values used for attributes a tag leaves out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub version: String,
    pub style: Style,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            version: NIGHTLY.to_string(),
            style: Style::Full,
        }
    }
}

/// Validated attributes of one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRequest {
    pub kind: ItemKind,
    pub name: String,
    pub fork: String,
    pub preset: String,
    pub version: String,
    pub style: Style,
    pub lines: Option<LineRange>,
}

impl TagRequest {
    /// Validate attributes that do not need the knowledge base.
    ///
    /// `preset` is only honoured for preset variables and `lines` only for
    /// functions; on other kinds they are ignored.
    pub fn from_attributes(attributes: &Attributes, defaults: &Defaults) -> Result<Self, TagErrorKind> {
        let named: Vec<(ItemKind, &str, &str)> = attributes
            .iter()
            .filter_map(|(k, v)| ItemKind::from_attribute(k).map(|kind| (kind, k, v)))
            .collect();
        let (kind, name) = match named.as_slice() {
            [(kind, _, name)] => (*kind, name.to_string()),
            _ => {
                return Err(TagErrorKind::AmbiguousKind(
                    named.iter().map(|(_, k, _)| k.to_string()).collect(),
                ));
            }
        };

        let fork = attributes
            .get("fork")
            .ok_or_else(|| TagErrorKind::Malformed("missing required attribute `fork`".into()))?
            .to_string();

        let style: Style = match attributes.get("style") {
            Some(s) => s.parse().map_err(TagErrorKind::Malformed)?,
            None => defaults.style,
        };

        let lines: Option<LineRange> = match attributes.get("lines") {
            Some(s) if kind == ItemKind::Function => {
                Some(s.parse().map_err(TagErrorKind::Malformed)?)
            }
            _ => None,
        };

        let preset = match attributes.get("preset") {
            Some(p) if kind.uses_preset() => p.to_string(),
            _ => DEFAULT_PRESET.to_string(),
        };

        let version = attributes
            .get("version")
            .map(str::to_string)
            .unwrap_or_else(|| defaults.version.clone());

        Ok(Self {
            kind,
            name,
            fork,
            preset,
            version,
            style,
            lines,
        })
    }
}

/// What a tag resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub style: Style,
    /// Body lines, without any comment prefix
    pub lines: Vec<String>,
    /// First 8 hex characters of the SHA-256 digest of the rendered item
    pub hash: String,
    /// Whether the opening marker should carry `hash`
    pub refresh_hash: bool,
}

/// Resolves tags against a knowledge base
#[derive(Debug, Clone)]
pub struct Resolver<'kb> {
    kb: &'kb KnowledgeBase,
    forks: &'kb ForkOrder,
    defaults: Defaults,
}

impl<'kb> Resolver<'kb> {
    pub fn new(kb: &'kb KnowledgeBase, forks: &'kb ForkOrder, defaults: Defaults) -> Self {
        Self { kb, forks, defaults }
    }

    pub fn knowledge_base(&self) -> &'kb KnowledgeBase {
        self.kb
    }

    pub fn forks(&self) -> &'kb ForkOrder {
        self.forks
    }

    pub fn resolve(&self, tag: &Tag) -> Result<Resolution, TagErrorKind> {
        let request = TagRequest::from_attributes(&tag.attributes, &self.defaults)?;
        let mut resolution = self.resolve_request(&request)?;
        resolution.refresh_hash |= tag.attributes.contains("hash");
        Ok(resolution)
    }

    /// Resolve already validated attributes
    pub fn resolve_request(&self, request: &TagRequest) -> Result<Resolution, TagErrorKind> {
        if !self.forks.contains(&request.fork) {
            return Err(TagErrorKind::UnknownFork {
                fork: request.fork.clone(),
                suggestion: self.forks.suggest(&request.fork).map(str::to_string),
            });
        }

        let snapshot = self.kb.snapshot(&request.version)?;
        let item = snapshot
            .resolve(&request.preset, &request.fork, request.kind, &request.name)
            .ok_or_else(|| TagErrorKind::ItemNotFound {
                kind: request.kind,
                name: request.name.clone(),
                fork: request.fork.clone(),
                preset: request.preset.clone(),
                version: snapshot.version().to_string(),
                suggestion: suggest(
                    &request.name,
                    snapshot.names(&request.preset, &request.fork, request.kind),
                )
                .map(str::to_string),
            })?;

        debug!(
            kind = %item.kind,
            name = item.name,
            fork = item.fork,
            style = %request.style,
            "resolving tag"
        );

        let lines = match request.style {
            Style::Full => self.full(&item, request),
            Style::Hash => Vec::new(),
            Style::Diff => {
                let older = previous_defining_fork(
                    snapshot,
                    self.forks,
                    &request.preset,
                    request.kind,
                    &request.name,
                    &request.fork,
                )
                .and_then(|fork| snapshot.resolve(&request.preset, fork, request.kind, &request.name));

                match older {
                    Some(older) => {
                        let (old, new) = match request.lines {
                            Some(range) => (range.select(older.text), range.select(item.text)),
                            None => (older.text.to_string(), item.text.to_string()),
                        };
                        let diff = diff_text(older.fork, &old, item.fork, &new);
                        if diff.is_empty() {
                            // the selected lines did not change
                            self.full(&item, request)
                        } else {
                            diff
                        }
                    }
                    None => {
                        debug!(name = item.name, fork = item.fork, "no earlier version, rendering in full");
                        self.full(&item, request)
                    }
                }
            }
            Style::Link if request.kind != ItemKind::Function => {
                vec![LINK_UNAVAILABLE.to_string()]
            }
            Style::Link => {
                let url = snapshot.link(item.fork, item.name).ok_or_else(|| {
                    TagErrorKind::ItemNotFound {
                        kind: request.kind,
                        name: format!("{} (source link)", request.name),
                        fork: request.fork.clone(),
                        preset: request.preset.clone(),
                        version: snapshot.version().to_string(),
                        suggestion: None,
                    }
                })?;
                vec![url.to_string()]
            }
        };

        let rendered = match request.lines {
            Some(range) => range.select(item.text),
            None => item.text.to_string(),
        };

        Ok(Resolution {
            style: request.style,
            lines,
            hash: content_hash(&rendered),
            refresh_hash: request.style == Style::Hash,
        })
    }

    fn full(&self, item: &SpecItem<'_>, request: &TagRequest) -> Vec<String> {
        match request.lines {
            Some(range) => range.select(item.text).lines().map(str::to_string).collect(),
            None => item.lines().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Short digest identifying a rendering
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut hash = format!("{:x}", hasher.finalize());
    hash.truncate(8);
    hash
}
