//! Knowledge base snapshots
//!
//! A [`SpecSnapshot`] holds the canonical rendering of every specification
//! item for one ingested version, keyed by preset, fork, kind and name. A
//! [`KnowledgeBase`] is the ordered set of snapshots loaded for a run.
//!
//! On disk, each version lives in its own directory:
//!
//! ```text
//! <root>/<version>/pyspec.json   preset -> fork -> kind -> name -> text
//! <root>/<version>/links.json    "<path>::#<anchor>" -> URL (optional)
//! ```

use crate::error::TagErrorKind;
use eyre::{Result, WrapErr};
use facet::Facet;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Snapshot file inside a version directory
pub const SNAPSHOT_FILE: &str = "pyspec.json";

/// Optional link table inside a version directory
pub const LINKS_FILE: &str = "links.json";

/// Version alias for the most recent snapshot
pub const NIGHTLY: &str = "nightly";

/// Preset used when a tag does not name one, and for every non-preset item
pub const DEFAULT_PRESET: &str = "mainnet";

/// The kind of specification item a tag refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemKind {
    Constant,
    CustomType,
    PresetVar,
    ConfigVar,
    SszObject,
    Dataclass,
    Function,
}

impl ItemKind {
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Function,
        ItemKind::Constant,
        ItemKind::CustomType,
        ItemKind::SszObject,
        ItemKind::Dataclass,
        ItemKind::PresetVar,
        ItemKind::ConfigVar,
    ];

    /// The tag attribute naming an item of this kind
    pub fn attribute(&self) -> &'static str {
        match self {
            ItemKind::Constant => "constant_var",
            ItemKind::CustomType => "custom_type",
            ItemKind::PresetVar => "preset_var",
            ItemKind::ConfigVar => "config_var",
            ItemKind::SszObject => "ssz_object",
            ItemKind::Dataclass => "dataclass",
            ItemKind::Function => "function",
        }
    }

    /// Parse a tag attribute name. `fn` is accepted for functions.
    pub fn from_attribute(s: &str) -> Option<Self> {
        match s {
            "constant_var" => Some(ItemKind::Constant),
            "custom_type" => Some(ItemKind::CustomType),
            "preset_var" => Some(ItemKind::PresetVar),
            "config_var" => Some(ItemKind::ConfigVar),
            "ssz_object" => Some(ItemKind::SszObject),
            "dataclass" => Some(ItemKind::Dataclass),
            "function" | "fn" => Some(ItemKind::Function),
            _ => None,
        }
    }

    /// The key of this kind's collection in a snapshot document
    pub fn collection(&self) -> &'static str {
        match self {
            ItemKind::Constant => "constant_vars",
            ItemKind::CustomType => "custom_types",
            ItemKind::PresetVar => "preset_vars",
            ItemKind::ConfigVar => "config_vars",
            ItemKind::SszObject => "ssz_objects",
            ItemKind::Dataclass => "dataclasses",
            ItemKind::Function => "functions",
        }
    }

    /// Whether the `preset` attribute selects between renderings
    pub fn uses_preset(&self) -> bool {
        matches!(self, ItemKind::PresetVar)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ItemKind::Constant => "constant",
            ItemKind::CustomType => "custom type",
            ItemKind::PresetVar => "preset variable",
            ItemKind::ConfigVar => "config variable",
            ItemKind::SszObject => "SSZ object",
            ItemKind::Dataclass => "dataclass",
            ItemKind::Function => "function",
        })
    }
}

/// One fork's items as they appear in `pyspec.json`.
///
/// Variables are `[type, value]` pairs where the type may be `null`, custom
/// types map a name to the aliased type, everything else is source text.
#[derive(Debug, Default, Facet)]
struct ForkDocument {
    #[facet(default)]
    functions: HashMap<String, String>,
    #[facet(default)]
    constant_vars: HashMap<String, Vec<Option<String>>>,
    #[facet(default)]
    custom_types: HashMap<String, String>,
    #[facet(default)]
    preset_vars: HashMap<String, Vec<Option<String>>>,
    #[facet(default)]
    config_vars: HashMap<String, Vec<Option<String>>>,
    #[facet(default)]
    ssz_objects: HashMap<String, String>,
    #[facet(default)]
    dataclasses: HashMap<String, String>,
}

impl ForkDocument {
    fn into_items(self) -> Result<ForkItems> {
        let mut items = ForkItems::new();

        for (kind, vars) in [
            (ItemKind::Constant, self.constant_vars),
            (ItemKind::PresetVar, self.preset_vars),
            (ItemKind::ConfigVar, self.config_vars),
        ] {
            let rendered = vars
                .into_iter()
                .map(|(name, info)| {
                    let text = render_var(&name, &info)?;
                    Ok((name, text))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            items.insert(kind, rendered);
        }

        items.insert(
            ItemKind::CustomType,
            self.custom_types
                .into_iter()
                .map(|(name, ty)| {
                    let text = format!("{name} = {ty}");
                    (name, text)
                })
                .collect(),
        );

        items.insert(ItemKind::Function, self.functions.into_iter().collect());
        items.insert(ItemKind::SszObject, self.ssz_objects.into_iter().collect());
        items.insert(
            ItemKind::Dataclass,
            self.dataclasses
                .into_iter()
                .map(|(name, text)| (name, text.replace("@dataclass\n", "")))
                .collect(),
        );

        items.retain(|_, named| !named.is_empty());
        Ok(items)
    }
}

/// `NAME: type = value`, or `NAME = value` for untyped variables
fn render_var(name: &str, info: &[Option<String>]) -> Result<String> {
    match info {
        [Some(ty), Some(value)] => Ok(format!("{name}: {ty} = {value}")),
        [None, Some(value)] => Ok(format!("{name} = {value}")),
        _ => eyre::bail!("variable `{name}` is not a `[type, value]` pair"),
    }
}

/// A single resolved item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecItem<'a> {
    pub kind: ItemKind,
    pub name: &'a str,
    pub fork: &'a str,
    pub preset: &'a str,
    pub version: &'a str,
    /// Canonical rendering, annotation comments included
    pub text: &'a str,
}

impl<'a> SpecItem<'a> {
    /// The rendering as lines, without trailing blank lines
    pub fn lines(&self) -> Vec<&'a str> {
        self.text.trim_end().lines().collect()
    }
}

type ForkItems = BTreeMap<ItemKind, BTreeMap<String, String>>;

/// Every item of one ingested version
#[derive(Debug, Clone, Default)]
pub struct SpecSnapshot {
    version: String,
    /// preset -> fork -> kind -> name -> text
    presets: BTreeMap<String, BTreeMap<String, ForkItems>>,
    links: BTreeMap<String, String>,
}

impl SpecSnapshot {
    /// An empty snapshot, mostly useful for building fixtures
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Parse a snapshot document (`preset -> fork -> kind -> name -> text`)
    pub fn from_json(version: impl Into<String>, json: &str) -> Result<Self> {
        let doc: HashMap<String, HashMap<String, ForkDocument>> = facet_json::from_str(json)
            .map_err(|e| eyre::eyre!("failed to parse snapshot JSON: {e}"))?;

        let presets = doc
            .into_iter()
            .map(|(preset, forks)| {
                let forks = forks
                    .into_iter()
                    .map(|(fork, items)| {
                        let items = items
                            .into_items()
                            .wrap_err_with(|| format!("in {preset}/{fork}"))?;
                        Ok((fork, items))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                Ok((preset, forks))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            version: version.into(),
            presets,
            links: BTreeMap::new(),
        })
    }

    /// Attach a link table (`"<path>::#<anchor>" -> URL`)
    pub fn with_links_json(mut self, json: &str) -> Result<Self> {
        let links: HashMap<String, String> = facet_json::from_str(json)
            .map_err(|e| eyre::eyre!("failed to parse links JSON: {e}"))?;
        self.links = links.into_iter().collect();
        Ok(self)
    }

    /// Load `pyspec.json` (and `links.json` if present) from a version directory
    pub fn load(version: impl Into<String>, dir: impl AsRef<Path>) -> Result<Self> {
        let version = version.into();
        let dir = dir.as_ref();

        let path = dir.join(SNAPSHOT_FILE);
        let content = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read snapshot from {}", path.display()))?;
        let mut snapshot = Self::from_json(version, &content)
            .wrap_err_with(|| format!("Failed to parse snapshot from {}", path.display()))?;

        let links_path = dir.join(LINKS_FILE);
        if links_path.exists() {
            let content = std::fs::read_to_string(&links_path).wrap_err_with(|| {
                format!("Failed to read links from {}", links_path.display())
            })?;
            snapshot = snapshot
                .with_links_json(&content)
                .wrap_err_with(|| format!("Failed to parse links from {}", links_path.display()))?;
        }

        debug!(
            version = %snapshot.version,
            presets = snapshot.presets.len(),
            links = snapshot.links.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Add or replace one item
    pub fn insert(
        &mut self,
        preset: impl Into<String>,
        fork: impl Into<String>,
        kind: ItemKind,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> &mut Self {
        self.presets
            .entry(preset.into())
            .or_default()
            .entry(fork.into())
            .or_default()
            .entry(kind)
            .or_default()
            .insert(name.into(), text.into());
        self
    }

    /// Add or replace one link
    pub fn insert_link(&mut self, key: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.links.insert(key.into(), url.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn presets(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn has_preset(&self, preset: &str) -> bool {
        self.presets.contains_key(preset)
    }

    /// Forks present in a preset (in key order, not chronological order)
    pub fn forks(&self, preset: &str) -> impl Iterator<Item = &str> {
        self.presets
            .get(preset)
            .into_iter()
            .flat_map(|forks| forks.keys().map(String::as_str))
    }

    /// Exact lookup on every dimension
    pub fn resolve(
        &self,
        preset: &str,
        fork: &str,
        kind: ItemKind,
        name: &str,
    ) -> Option<SpecItem<'_>> {
        let (preset, forks) = self.presets.get_key_value(preset)?;
        let (fork, items) = forks.get_key_value(fork)?;
        let (name, text) = items.get(&kind)?.get_key_value(name)?;
        Some(SpecItem {
            kind,
            name,
            fork,
            preset,
            version: &self.version,
            text,
        })
    }

    /// Names of every item of a kind in one fork
    pub fn names(&self, preset: &str, fork: &str, kind: ItemKind) -> impl Iterator<Item = &str> {
        self.presets
            .get(preset)
            .and_then(|forks| forks.get(fork))
            .and_then(|items| items.get(&kind))
            .into_iter()
            .flat_map(|items| items.keys().map(String::as_str))
    }

    /// Source URL of a function in a fork.
    ///
    /// Link keys look like `specs/<fork>/beacon-chain.md::#<anchor>`; the
    /// first key whose path has a `<fork>` directory and whose anchor is the
    /// item name wins.
    pub fn link(&self, fork: &str, name: &str) -> Option<&str> {
        let dir = format!("/{fork}/");
        let anchor = name.to_lowercase();
        self.links
            .iter()
            .find(|(key, _)| match key.split_once("::#") {
                Some((path, a)) => format!("/{path}").contains(&dir) && a == anchor,
                None => false,
            })
            .map(|(_, url)| url.as_str())
    }
}

/// The snapshots ingested for a run, oldest first
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    snapshots: Vec<SpecSnapshot>,
}

impl KnowledgeBase {
    pub fn new(snapshots: impl IntoIterator<Item = SpecSnapshot>) -> Self {
        Self {
            snapshots: snapshots.into_iter().collect(),
        }
    }

    /// Load `<root>/<version>/` for every version, in the given order.
    ///
    /// Any missing or corrupt snapshot fails the whole load.
    pub fn load(root: impl AsRef<Path>, versions: &[String]) -> Result<Self> {
        let root = root.as_ref();
        if versions.is_empty() {
            eyre::bail!("No knowledge base versions configured");
        }

        let snapshots = versions
            .iter()
            .map(|version| SpecSnapshot::load(version.as_str(), root.join(version)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            root = %root.display(),
            versions = versions.len(),
            "loaded knowledge base"
        );
        Ok(Self { snapshots })
    }

    /// Look a version up. `nightly` is the snapshot of that name if one was
    /// ingested, otherwise the latest snapshot.
    pub fn snapshot(&self, version: &str) -> Result<&SpecSnapshot, TagErrorKind> {
        let exact = self.snapshots.iter().find(|s| s.version == version);
        let found = match (exact, version) {
            (Some(s), _) => Some(s),
            (None, NIGHTLY) => self.snapshots.last(),
            (None, _) => None,
        };
        found.ok_or_else(|| TagErrorKind::UnknownVersion {
            version: version.to_string(),
            available: self.versions().map(str::to_string).collect(),
        })
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.snapshots.iter().map(|s| s.version.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "mainnet": {
            "deneb": {
                "functions": { "foo": "def foo() -> None:\n    pass\n" },
                "constant_vars": {
                    "GENESIS_SLOT": ["Slot", "Slot(0)"],
                    "BLS_MODULUS": [null, "52435875175126190479447740508185965837690552500527637822603658699938581184513"]
                },
                "custom_types": { "Slot": "uint64" },
                "preset_vars": { "FIELD_ELEMENTS_PER_BLOB": ["uint64", "4096"] },
                "config_vars": { "DENEB_FORK_EPOCH": ["Epoch", "Epoch(269568)"] },
                "dataclasses": { "Store": "@dataclass\nclass Store(object):\n    time: uint64" }
            }
        },
        "minimal": {
            "deneb": {
                "preset_vars": { "FIELD_ELEMENTS_PER_BLOB": ["uint64", "4096"] },
                "config_vars": { "DENEB_FORK_EPOCH": ["Epoch", "Epoch(18446744073709551615)"] }
            }
        }
    }"#;

    #[test]
    fn test_from_json_and_resolve() {
        let snapshot = SpecSnapshot::from_json("nightly", DOC).unwrap();
        let item = snapshot
            .resolve("mainnet", "deneb", ItemKind::Function, "foo")
            .unwrap();
        assert_eq!(item.fork, "deneb");
        assert_eq!(item.version, "nightly");
        assert_eq!(item.lines(), vec!["def foo() -> None:", "    pass"]);

        assert!(snapshot.resolve("mainnet", "deneb", ItemKind::Function, "bar").is_none());
        assert!(snapshot.resolve("mainnet", "electra", ItemKind::Function, "foo").is_none());
        assert!(snapshot.resolve("minimal", "deneb", ItemKind::Function, "foo").is_none());
        assert!(
            snapshot
                .resolve("minimal", "deneb", ItemKind::PresetVar, "FIELD_ELEMENTS_PER_BLOB")
                .is_some()
        );
    }

    #[test]
    fn test_dataclass_decorator_removed() {
        let snapshot = SpecSnapshot::from_json("nightly", DOC).unwrap();
        let item = snapshot
            .resolve("mainnet", "deneb", ItemKind::Dataclass, "Store")
            .unwrap();
        assert!(item.text.starts_with("class Store(object):"));
    }

    #[test]
    fn test_rendered_variables() {
        let snapshot = SpecSnapshot::from_json("nightly", DOC).unwrap();
        let text = |preset: &str, kind: ItemKind, name: &str| snapshot.resolve(preset, "deneb", kind, name).unwrap().text;

        assert_eq!(
            text("mainnet", ItemKind::Constant, "GENESIS_SLOT"),
            "GENESIS_SLOT: Slot = Slot(0)"
        );
        assert!(
            text("mainnet", ItemKind::Constant, "BLS_MODULUS").starts_with("BLS_MODULUS = 5243")
        );
        assert_eq!(text("mainnet", ItemKind::CustomType, "Slot"), "Slot = uint64");
        assert_eq!(
            text("mainnet", ItemKind::PresetVar, "FIELD_ELEMENTS_PER_BLOB"),
            "FIELD_ELEMENTS_PER_BLOB: uint64 = 4096"
        );
        assert_eq!(
            text("minimal", ItemKind::ConfigVar, "DENEB_FORK_EPOCH"),
            "DENEB_FORK_EPOCH: Epoch = Epoch(18446744073709551615)"
        );
    }

    #[test]
    fn test_bad_variable_shape() {
        let doc = r#"{ "mainnet": { "deneb": { "constant_vars": { "X": ["uint64"] } } } }"#;
        let err = SpecSnapshot::from_json("nightly", doc).unwrap_err();
        assert!(format!("{err:?}").contains("`X`"), "{err:?}");
    }

    #[test]
    fn test_bad_json() {
        assert!(SpecSnapshot::from_json("nightly", "{ not json").is_err());
    }

    #[test]
    fn test_links() {
        let mut snapshot = SpecSnapshot::new("nightly");
        snapshot
            .insert_link(
                "specs/deneb/beacon-chain.md::#is_fully_withdrawable_validator",
                "https://example.com/deneb#is_fully_withdrawable_validator",
            )
            .insert_link(
                "specs/electra/beacon-chain.md::#is_fully_withdrawable_validator",
                "https://example.com/electra#is_fully_withdrawable_validator",
            );

        assert_eq!(
            snapshot.link("electra", "is_fully_withdrawable_validator"),
            Some("https://example.com/electra#is_fully_withdrawable_validator")
        );
        assert_eq!(snapshot.link("capella", "is_fully_withdrawable_validator"), None);
    }

    #[test]
    fn test_kind_attributes() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::from_attribute(kind.attribute()), Some(kind));
        }
        assert_eq!(ItemKind::from_attribute("fn"), Some(ItemKind::Function));
        assert_eq!(ItemKind::from_attribute("fork"), None);
    }

    #[test]
    fn test_knowledge_base_versions() {
        let kb = KnowledgeBase::new([SpecSnapshot::new("v1.4.0"), SpecSnapshot::new("v1.5.0")]);
        assert_eq!(kb.snapshot("v1.4.0").unwrap().version(), "v1.4.0");
        assert_eq!(kb.snapshot(NIGHTLY).unwrap().version(), "v1.5.0");
        assert!(matches!(
            kb.snapshot("v0.1.0"),
            Err(TagErrorKind::UnknownVersion { ref available, .. }) if available.len() == 2
        ));

        let kb = KnowledgeBase::new([SpecSnapshot::new("nightly"), SpecSnapshot::new("v1.5.0")]);
        assert_eq!(kb.snapshot(NIGHTLY).unwrap().version(), "nightly");
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let version_dir = dir.path().join("nightly");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(version_dir.join(SNAPSHOT_FILE), DOC).unwrap();

        let kb = KnowledgeBase::load(dir.path(), &["nightly".to_string()]).unwrap();
        assert!(
            kb.snapshot("nightly")
                .unwrap()
                .resolve("mainnet", "deneb", ItemKind::Function, "foo")
                .is_some()
        );

        assert!(KnowledgeBase::load(dir.path(), &["v1.0.0".to_string()]).is_err());
        assert!(KnowledgeBase::load(dir.path(), &[]).is_err());
    }
}
