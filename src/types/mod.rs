//! Core value types: clause categories, the complete clause mapping and ids.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Clause text used when marker matching found nothing for a clause.
pub const NOT_FOUND: &str = "Not found";

/// Clause text (and issue text) used when model output could not be decoded.
pub const PARSING_FAILED: &str = "Parsing failed";

/// Rule text returned by keyword retrieval when the search came back empty.
pub const NO_RULE_FOUND: &str = "No rule found";

/// 1-based position of a chunk within its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(NonZeroU32);

impl ChunkId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed set of clause categories an MOU is checked for.
///
/// Declaration order is the canonical processing and reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Purpose,
    PartiesResponsibilities,
    Confidentiality,
    TermTermination,
}

impl ClauseKind {
    /// All categories in canonical order.
    pub const ALL: [ClauseKind; 4] = [
        ClauseKind::Purpose,
        ClauseKind::PartiesResponsibilities,
        ClauseKind::Confidentiality,
        ClauseKind::TermTermination,
    ];

    /// Key used in schemas, reports and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purpose => "purpose",
            Self::PartiesResponsibilities => "parties_responsibilities",
            Self::Confidentiality => "confidentiality",
            Self::TermTermination => "term_termination",
        }
    }

    /// Query text for keyword search: the key with underscores as spaces.
    pub fn search_text(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Default marker substring for marker-based extraction.
    pub fn default_marker(&self) -> &'static str {
        match self {
            Self::Purpose => "purpose",
            Self::PartiesResponsibilities => "responsibilit",
            Self::Confidentiality => "confidential",
            Self::TermTermination => "terminat",
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClauseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown clause '{s}'"))
    }
}

/// Clause name to clause text, with an entry for every [`ClauseKind`].
///
/// There is no way to build a map with a missing key: absent clauses carry
/// a sentinel text ([`NOT_FOUND`] or [`PARSING_FAILED`]) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseMap(BTreeMap<ClauseKind, String>);

impl ClauseMap {
    /// Every clause set to the same text.
    pub fn filled(text: &str) -> Self {
        Self(
            ClauseKind::ALL
                .iter()
                .map(|kind| (*kind, text.to_string()))
                .collect(),
        )
    }

    /// Build from possibly incomplete entries; gaps get `fallback`.
    pub fn from_partial(
        entries: impl IntoIterator<Item = (ClauseKind, String)>,
        fallback: &str,
    ) -> Self {
        let mut map = Self::filled(fallback);
        for (kind, text) in entries {
            map.0.insert(kind, text);
        }
        map
    }

    pub fn get(&self, kind: ClauseKind) -> &str {
        // Every key is inserted at construction.
        self.0.get(&kind).map(String::as_str).unwrap_or(PARSING_FAILED)
    }

    pub fn set(&mut self, kind: ClauseKind, text: impl Into<String>) {
        self.0.insert(kind, text.into());
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ClauseKind, &str)> {
        self.0.iter().map(|(kind, text)| (*kind, text.as_str()))
    }

    /// Whether every clause carries the given text.
    pub fn all_equal(&self, text: &str) -> bool {
        self.0.values().all(|v| v == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_declaration() {
        let mut sorted = ClauseKind::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, ClauseKind::ALL.to_vec());
        assert_eq!(ClauseKind::ALL[0].as_str(), "purpose");
        assert_eq!(ClauseKind::ALL[3].as_str(), "term_termination");
    }

    #[test]
    fn test_search_text_replaces_underscores() {
        assert_eq!(
            ClauseKind::PartiesResponsibilities.search_text(),
            "parties responsibilities"
        );
    }

    #[test]
    fn test_clause_kind_from_str() {
        assert_eq!(
            "confidentiality".parse::<ClauseKind>().unwrap(),
            ClauseKind::Confidentiality
        );
        assert!("indemnity".parse::<ClauseKind>().is_err());
    }

    #[test]
    fn test_partial_map_is_completed() {
        let map = ClauseMap::from_partial(
            [(ClauseKind::Purpose, "To cooperate".to_string())],
            NOT_FOUND,
        );

        assert_eq!(map.get(ClauseKind::Purpose), "To cooperate");
        assert_eq!(map.get(ClauseKind::Confidentiality), NOT_FOUND);
        assert_eq!(map.iter().count(), ClauseKind::ALL.len());
    }

    #[test]
    fn test_chunk_id_zero_is_rejected() {
        assert!(ChunkId::new(0).is_none());
        assert_eq!(ChunkId::new(3).unwrap().value(), 3);
    }
}
