//! Per-tag errors
//!
//! Every problem found while scanning or resolving a single tag is reported
//! as a [`TagError`]. None of them abort processing: the offending tag is
//! left untouched and the error ends up in the file's report.

use crate::snapshot::ItemKind;
use crate::tag::SourceSpan;

/// What went wrong with a tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagErrorKind {
    /// The marker itself could not be parsed, or an attribute value is invalid
    #[error("malformed spec tag: {0}")]
    Malformed(String),

    /// The `fork` attribute names a fork that is not in the fork order
    #[error("unknown fork `{fork}`{}", suggestion_suffix(.suggestion))]
    UnknownFork {
        fork: String,
        suggestion: Option<String>,
    },

    /// The `version` attribute names a version that was never ingested
    #[error("unknown version `{version}` (available: {})", .available.join(", "))]
    UnknownVersion {
        version: String,
        available: Vec<String>,
    },

    /// The attributes are well-formed but the knowledge base has no such item
    #[error("{kind} `{name}` not found in fork `{fork}` ({preset}, {version}){}", suggestion_suffix(.suggestion))]
    ItemNotFound {
        kind: ItemKind,
        name: String,
        fork: String,
        preset: String,
        version: String,
        suggestion: Option<String>,
    },

    /// Zero, or more than one, kind attribute was given
    #[error("{}", ambiguous_message(.0))]
    AmbiguousKind(Vec<String>),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(", did you mean `{s}`?"),
        None => String::new(),
    }
}

fn ambiguous_message(found: &[String]) -> String {
    if found.is_empty() {
        "spec tag names no item (expected one of function, constant_var, custom_type, \
         preset_var, config_var, ssz_object, dataclass)"
            .to_string()
    } else {
        format!(
            "spec tag names more than one item: {}",
            found
                .iter()
                .map(|a| format!("`{a}`"))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// A [`TagErrorKind`] located in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagError {
    /// Line number of the opening marker (1-indexed)
    pub line: usize,
    /// Byte span of the opening marker
    pub span: SourceSpan,
    /// What went wrong
    pub kind: TagErrorKind,
}

impl std::fmt::Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for TagError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = TagErrorKind::UnknownFork {
            fork: "denbe".into(),
            suggestion: Some("deneb".into()),
        };
        assert_eq!(err.to_string(), "unknown fork `denbe`, did you mean `deneb`?");

        let err = TagErrorKind::AmbiguousKind(vec!["function".into(), "ssz_object".into()]);
        assert_eq!(
            err.to_string(),
            "spec tag names more than one item: `function`, `ssz_object`"
        );

        let err = TagErrorKind::ItemNotFound {
            kind: ItemKind::Function,
            name: "foo".into(),
            fork: "electra".into(),
            preset: "mainnet".into(),
            version: "nightly".into(),
            suggestion: None,
        };
        assert_eq!(
            err.to_string(),
            "function `foo` not found in fork `electra` (mainnet, nightly)"
        );
    }
}
