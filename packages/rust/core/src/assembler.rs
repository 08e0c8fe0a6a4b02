//! Record assembler.
//!
//! Attaches discovered units to normalized records as sibling fields and
//! accumulates the records of every table, in page order, for the final
//! cleaning pass.

use std::collections::HashSet;

use tracing::trace;

use catalogx_shared::{ColumnsConfig, Record};

use crate::units::UnitVocabulary;

/// Add a `"<field> unit"` field for every field the vocabulary knows a unit for.
///
/// A unit is attached only when the field holds a non-blank value.
/// Metadata columns and fields that are themselves unit columns are skipped.
pub fn attach_units(
    mut record: Record,
    vocabulary: &UnitVocabulary,
    columns: &ColumnsConfig,
) -> Record {
    let additions: Vec<(String, String)> = record
        .fields()
        .filter_map(|(name, value)| {
            if columns.is_metadata(name) || is_unit_field(&record, name, columns) {
                return None;
            }
            value.filter(|v| !v.trim().is_empty())?;
            let unit = vocabulary.lookup(name)?;
            Some((columns.unit_column(name), unit.to_string()))
        })
        .collect();

    for (name, unit) in additions {
        trace!(field = %name, %unit, "attaching unit");
        record.set(name, Some(unit));
    }
    record
}

/// Whether `name` is the unit column of another field of `record`.
fn is_unit_field(record: &Record, name: &str, columns: &ColumnsConfig) -> bool {
    columns
        .unit_base(name)
        .is_some_and(|base| record.contains(base))
}

/// Running set of assembled records, owned by the pipeline driver.
#[derive(Debug, Clone, Default)]
pub struct RecordAccumulator {
    records: Vec<Record>,
    tables: usize,
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records of one table. Nothing is deduplicated across tables.
    pub fn append(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
        self.tables += 1;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Number of tables that contributed records.
    pub fn table_count(&self) -> usize {
        self.tables
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The union of field names across records, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    names: Vec<String>,
    index: HashSet<String>,
}

impl ColumnSet {
    pub fn collect(records: &[Record]) -> Self {
        let mut set = Self::default();
        for name in records.iter().flat_map(Record::field_names) {
            if set.index.insert(name.to_string()) {
                set.names.push(name.to_string());
            }
        }
        set
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Whether `name` is the unit column of a field in this set.
    pub fn is_unit_column(&self, name: &str, columns: &ColumnsConfig) -> bool {
        columns.unit_base(name).is_some_and(|base| self.contains(base))
    }

    /// Columns that are neither metadata nor unit columns, in first-seen order.
    pub fn data_columns<'a>(
        &'a self,
        columns: &'a ColumnsConfig,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|name| !columns.is_metadata(name) && !self.is_unit_column(name, columns))
    }
}
