//! Core domain types for catalogx: raw page tables in, flat records out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Source document
// ---------------------------------------------------------------------------

/// One table region as extracted from a page: row-major nullable cells.
///
/// Rows may have different lengths; missing trailing cells read as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTable {
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Build a table from string literals, mapping `""` to null.
    pub fn from_strs(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| (*cell).to_string()))
                        .collect()
                })
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// All tables found on one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePage {
    /// 1-based page number; defaults to the page's position in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
}

/// The table dump of a whole document, as produced by the table extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub pages: Vec<SourcePage>,
}

impl SourceDocument {
    /// Pages paired with their resolved page number, in document order.
    pub fn numbered_pages(&self) -> impl Iterator<Item = (u32, &SourcePage)> {
        self.pages.iter().enumerate().map(|(i, page)| {
            let fallback = u32::try_from(i + 1).unwrap_or(u32::MAX);
            (page.number.unwrap_or(fallback), page)
        })
    }

    /// Total number of raw tables across all pages.
    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|p| p.tables.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A schema-less record: a page number plus an ordered field map.
///
/// Field values are strings or null. The page number is kept out of the map
/// so every record carries exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub page: u32,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            fields: Map::new(),
        }
    }

    /// Build a record from `(name, value)` pairs; `None` is a null value.
    pub fn from_pairs<'a>(
        page: u32,
        pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Self {
        let mut record = Self::new(page);
        for (name, value) in pairs {
            record.set(name, value.map(String::from));
        }
        record
    }

    /// The non-null value of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Whether the field exists, even with a null value.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Set a field. An existing field keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields
            .insert(name.into(), value.map_or(Value::Null, Value::String));
    }

    /// Remove a field, preserving the order of the others.
    pub fn remove(&mut self, name: &str) -> bool {
        self.fields.shift_remove(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order with their nullable values.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// OutputTable
// ---------------------------------------------------------------------------

/// The terminal artifact: ordered columns and rows of nullable cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl OutputTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The non-null cell at `row` in column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let index = self.column_index(name)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }
}
