//! Fork ordering and item history
//!
//! Forks are ordered by an explicit list, never by comparing their names.

use crate::snapshot::{ItemKind, SpecSnapshot};
use crate::strip::strip_comments;
use std::collections::BTreeMap;

/// Forks in chronological order, used when nothing else is configured
pub const DEFAULT_FORKS: &[&str] = &[
    "phase0",
    "altair",
    "bellatrix",
    "capella",
    "deneb",
    "electra",
    "fulu",
    "eip7732",
];

/// Chronological order of the known forks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkOrder {
    forks: Vec<String>,
}

impl Default for ForkOrder {
    fn default() -> Self {
        Self::new(DEFAULT_FORKS.iter().copied())
    }
}

impl ForkOrder {
    /// Build from forks listed oldest first. Repeated names keep their first
    /// position.
    pub fn new(forks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut ordered: Vec<String> = Vec::new();
        for fork in forks {
            let fork = fork.into();
            if !ordered.contains(&fork) {
                ordered.push(fork);
            }
        }
        Self { forks: ordered }
    }

    pub fn forks(&self) -> &[String] {
        &self.forks
    }

    pub fn position(&self, fork: &str) -> Option<usize> {
        self.forks.iter().position(|f| f == fork)
    }

    pub fn contains(&self, fork: &str) -> bool {
        self.position(fork).is_some()
    }

    /// Forks strictly before `fork`, oldest first
    pub fn before(&self, fork: &str) -> Option<&[String]> {
        self.position(fork).map(|i| &self.forks[..i])
    }

    pub fn latest(&self) -> Option<&str> {
        self.forks.last().map(String::as_str)
    }

    /// Closest known fork name, for error messages
    pub fn suggest(&self, fork: &str) -> Option<&str> {
        suggest(fork, self.forks.iter().map(String::as_str))
    }
}

/// Pick the candidate closest to `name`, if any is close enough to be a typo
pub(crate) fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .map(|c| (strsim::levenshtein(name, c), c))
        .filter(|(d, c)| *d <= 3.max(c.len() / 4))
        .min_by_key(|(d, _)| *d)
        .map(|(_, c)| c)
}

/// Find the fork whose rendering of an item a diff at `fork` compares against.
///
/// Walks the forks before `fork`, nearest first, looking for the first one
/// whose comment-stripped rendering differs from the one at `fork`. From
/// there it keeps walking back while earlier forks render the same stripped
/// text, and returns the earliest of them: the fork that defined the older
/// version. Returns `None` if no earlier fork defines a different version,
/// including when `fork` introduced the item.
pub fn previous_defining_fork<'a>(
    snapshot: &SpecSnapshot,
    forks: &'a ForkOrder,
    preset: &str,
    kind: ItemKind,
    name: &str,
    fork: &str,
) -> Option<&'a str> {
    let current = snapshot.resolve(preset, fork, kind, name)?;
    let current = strip_comments(current.text);
    let earlier = forks.before(fork)?;

    let stripped_at = |f: &str| {
        snapshot
            .resolve(preset, f, kind, name)
            .map(|item| strip_comments(item.text))
    };

    let mut walk = earlier.iter().rev();
    let (mut found, older) = loop {
        let f = walk.next()?;
        let older = stripped_at(f)?;
        if older != current {
            break (f.as_str(), older);
        }
    };

    for f in walk {
        match stripped_at(f) {
            Some(text) if text == older => found = f.as_str(),
            _ => break,
        }
    }

    Some(found)
}

/// Forks in which each item was introduced or had its rendering changed
pub type ItemHistory = BTreeMap<ItemKind, BTreeMap<String, Vec<String>>>;

/// Trace every item of a preset through the fork order.
///
/// Forks the snapshot does not know are skipped.
pub fn item_history(snapshot: &SpecSnapshot, forks: &ForkOrder, preset: &str) -> ItemHistory {
    let mut history = ItemHistory::new();

    for kind in ItemKind::ALL {
        let mut previous: BTreeMap<&str, &str> = BTreeMap::new();
        let entries = history.entry(kind).or_default();

        for fork in forks.forks() {
            for name in snapshot.names(preset, fork, kind) {
                let Some(item) = snapshot.resolve(preset, fork, kind, name) else {
                    continue;
                };
                if previous.get(name) != Some(&item.text) {
                    entries
                        .entry(name.to_string())
                        .or_default()
                        .push(fork.clone());
                }
                previous.insert(item.name, item.text);
            }
        }
    }

    history.retain(|_, entries| !entries.is_empty());
    history
}
