//! Cross-season entrant identities.
//!
//! Entrant codes are reassigned every season, so the only way to follow a
//! participant across seasons is a hand-curated `code -> unique_id` mapping.
//! Most entrants are absent from it.

use crate::error::{HistoryError, Result};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Mapping from season-scoped entrant codes to stable identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntrantIdentity {
    #[serde(default)]
    entrants: HashMap<String, String>,
}

impl EntrantIdentity {
    pub fn new(entrants: HashMap<String, String>) -> Self {
        Self { entrants }
    }

    /// The identities curated so far for the forecasting competition
    pub fn builtin() -> Self {
        [("ec7316ae", "538"), ("6032a90d", "@greereNFL")].into_iter().collect()
    }

    /// Load a mapping from a TOML file with an `[entrants]` table of `code = "unique_id"` pairs
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|source| HistoryError::Identity { path: path.to_path_buf(), source })
    }

    pub fn unique_id(&self, code: &str) -> Option<&str> {
        self.entrants.get(code).map(String::as_str)
    }

    /// All stable identifiers the mapping can produce
    pub fn unique_ids(&self) -> BTreeSet<&str> {
        self.entrants.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }
}

impl<C: Into<String>, U: Into<String>> FromIterator<(C, U)> for EntrantIdentity {
    fn from_iter<I: IntoIterator<Item = (C, U)>>(iter: I) -> Self {
        Self { entrants: iter.into_iter().map(|(c, u)| (c.into(), u.into())).collect() }
    }
}
