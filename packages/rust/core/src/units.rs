//! Unit vocabulary: learns which row labels carry which measurement unit.
//!
//! Tables in product catalogs often state the unit of a row in one of its
//! cells (`Portata | m3/h | 120 | 150`). The vocabulary remembers those
//! associations for the whole run so the assembler can attach them to records.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use catalogx_shared::{ExtractionConfig, RawTable, UnitConflictPolicy};

/// Normalize a row label or field name for vocabulary lookup:
/// trimmed, lower-cased, every whitespace run (line breaks included) collapsed to one space.
pub fn normalize_label(text: &str) -> String {
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WHITESPACE_RE.replace_all(text.trim(), " ").to_lowercase()
}

/// Mapping from normalized row label to a recognized unit token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnitVocabulary {
    entries: BTreeMap<String, String>,
}

impl UnitVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every row of `table` and record `label -> unit` for rows that
    /// contain a recognized unit token.
    ///
    /// Rows with an empty or null-marker label are skipped. Only the first
    /// matching cell of a row counts. Repeated discoveries follow
    /// `config.unit_conflict`.
    pub fn learn(&mut self, table: &RawTable, config: &ExtractionConfig) {
        for row in &table.rows {
            let Some(label) = row.first().and_then(Option::as_deref).map(normalize_label) else {
                continue;
            };
            if label.is_empty() || config.is_null_marker(&label) {
                continue;
            }

            let Some(unit) = row
                .iter()
                .flatten()
                .map(|cell| cell.trim())
                .find(|cell| config.units.contains(*cell))
            else {
                continue;
            };

            self.record(label, unit, config.unit_conflict);
        }
    }

    fn record(&mut self, label: String, unit: &str, policy: UnitConflictPolicy) {
        match self.entries.get(&label) {
            Some(existing) if existing == unit => {}
            Some(existing) if policy == UnitConflictPolicy::First => {
                trace!(%label, kept = %existing, ignored = %unit, "unit already known for label");
            }
            _ => {
                debug!(%label, %unit, "learned unit");
                self.entries.insert(label, unit.to_string());
            }
        }
    }

    /// The unit for a field name, normalized the same way labels are.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(&normalize_label(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
