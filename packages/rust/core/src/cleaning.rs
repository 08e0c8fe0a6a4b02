//! Numeric cleaning filter.
//!
//! Catalog tables mix stray text (`"KG"`, footnote markers, header repeats)
//! into columns that should hold numbers. Records carrying such text in a
//! target column are removed entirely; the remaining values are rewritten to
//! a canonical numeric form.

use tracing::{debug, info, instrument};

use catalogx_shared::{ColumnsConfig, Record};

use crate::assembler::ColumnSet;

/// Result of parsing one cell of a numeric column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericValue {
    /// Null or blank; structurally valid.
    Empty,
    /// A finite number, in canonical form.
    Number(String),
    /// Text that is not a number.
    NotNumeric,
}

impl NumericValue {
    /// Parse a cell, accepting `,` as decimal separator.
    ///
    /// The canonical form is the trimmed token with `,` replaced by `.`,
    /// so `" 12,5 "` becomes `"12.5"` and the source precision is kept.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(token) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::Empty;
        };
        let canonical = token.replace(',', ".");
        match canonical.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::Number(canonical),
            _ => Self::NotNumeric,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::NotNumeric)
    }
}

/// Outcome of a cleaning pass.
#[derive(Debug, Clone, Default)]
pub struct CleanOutcome {
    /// Surviving records, in input order.
    pub records: Vec<Record>,
    /// Records removed by each target column, in evaluation order.
    pub dropped_by_column: Vec<(String, usize)>,
    /// Records removed because every data field was empty.
    pub dropped_empty: usize,
}

impl CleanOutcome {
    pub fn dropped_total(&self) -> usize {
        self.dropped_by_column.iter().map(|(_, n)| n).sum::<usize>() + self.dropped_empty
    }
}

/// The target columns to clean, in evaluation order.
///
/// Configured targets are kept in configuration order when present in the
/// record set. With none configured, every data column is a target, in
/// first-seen order.
pub fn resolve_targets(records: &[Record], columns: &ColumnsConfig) -> Vec<String> {
    let set = ColumnSet::collect(records);
    if columns.target_columns.is_empty() {
        return set.data_columns(columns).map(String::from).collect();
    }
    columns
        .target_columns
        .iter()
        .filter(|target| set.contains(target))
        .cloned()
        .collect()
}

/// Drop records holding non-numeric text in any target column and
/// canonicalize the rest.
///
/// Columns are evaluated strictly in the order of `targets`; a record removed
/// by one column is never evaluated against the next. Afterwards, records
/// whose every non-metadata field is null are dropped too.
#[instrument(skip_all, fields(records = records.len(), targets = targets.len()))]
pub fn clean(records: Vec<Record>, targets: &[String], columns: &ColumnsConfig) -> CleanOutcome {
    let mut working = records;
    let mut dropped_by_column = Vec::with_capacity(targets.len());

    for target in targets {
        let before = working.len();
        working.retain_mut(|record| clean_field(record, target, columns));
        let dropped = before - working.len();
        if dropped > 0 {
            info!(column = %target, dropped, "removed records with non-numeric text");
        }
        dropped_by_column.push((target.clone(), dropped));
    }

    let before = working.len();
    working.retain(|record| has_data(record, columns));
    let dropped_empty = before - working.len();
    if dropped_empty > 0 {
        debug!(dropped = dropped_empty, "removed empty records");
    }

    CleanOutcome {
        records: working,
        dropped_by_column,
        dropped_empty,
    }
}

/// Validate and rewrite one target field. Returns `false` to drop the record.
fn clean_field(record: &mut Record, target: &str, columns: &ColumnsConfig) -> bool {
    if !record.contains(target) {
        return true;
    }
    match NumericValue::parse(record.get(target)) {
        NumericValue::NotNumeric => false,
        NumericValue::Number(canonical) => {
            record.set(target, Some(canonical));
            true
        }
        NumericValue::Empty => {
            record.set(target, None);
            record.remove(&columns.unit_column(target));
            true
        }
    }
}

fn has_data(record: &Record, columns: &ColumnsConfig) -> bool {
    record
        .fields()
        .any(|(name, value)| value.is_some() && !columns.is_metadata(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn parse_accepts_numbers_and_blanks() {
        assert_eq!(NumericValue::parse(None), NumericValue::Empty);
        assert_eq!(NumericValue::parse(Some("   ")), NumericValue::Empty);
        assert_eq!(NumericValue::parse(Some(" 120 ")), NumericValue::Number("120".into()));
        assert_eq!(NumericValue::parse(Some("12,5")), NumericValue::Number("12.5".into()));
        assert_eq!(NumericValue::parse(Some("-0.75")), NumericValue::Number("-0.75".into()));
        assert_eq!(NumericValue::parse(Some("1e3")), NumericValue::Number("1e3".into()));
    }

    #[test]
    fn parse_rejects_text() {
        for raw in ["abc", "KG", "12 kg", "1,234.5", "m3/h"] {
            assert_eq!(NumericValue::parse(Some(raw)), NumericValue::NotNumeric, "{raw}");
            assert!(!NumericValue::parse(Some(raw)).is_valid());
        }
    }

    #[test]
    fn parse_rejects_non_finite_values() {
        for raw in ["NaN", "nan", "inf", "-inf", "Infinity", "1e500", "-1e500"] {
            assert_eq!(NumericValue::parse(Some(raw)), NumericValue::NotNumeric, "{raw}");
        }
        assert_eq!(NumericValue::parse(Some("1e300")), NumericValue::Number("1e300".into()));
    }

    #[test]
    fn non_numeric_target_drops_whole_record() {
        let columns = ColumnsConfig::default();
        let records = vec![
            Record::from_pairs(1, [("model", Some("A")), ("Portata", Some("120"))]),
            Record::from_pairs(1, [("model", Some("B")), ("Portata", Some("abc"))]),
        ];
        let outcome = clean(records, &targets(&["Portata"]), &columns);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].get("model"), Some("A"));
        assert_eq!(outcome.dropped_by_column, vec![("Portata".to_string(), 1)]);
    }

    #[test]
    fn comma_decimal_is_canonicalized() {
        let columns = ColumnsConfig::default();
        let records = vec![Record::from_pairs(1, [("Portata", Some(" 12,5 "))])];
        let outcome = clean(records, &targets(&["Portata"]), &columns);
        assert_eq!(outcome.records[0].get("Portata"), Some("12.5"));
    }

    #[test]
    fn blank_target_becomes_null_and_loses_its_unit() {
        let columns = ColumnsConfig::default();
        let records = vec![Record::from_pairs(
            1,
            [("Portata", Some(" ")), ("Portata unit", Some("m3/h")), ("Peso", Some("3"))],
        )];
        let outcome = clean(records, &targets(&["Portata"]), &columns);

        let record = &outcome.records[0];
        assert!(record.contains("Portata"));
        assert_eq!(record.get("Portata"), None);
        assert!(!record.contains("Portata unit"));
    }

    #[test]
    fn columns_are_evaluated_in_order() {
        let columns = ColumnsConfig::default();
        let records = vec![
            Record::from_pairs(1, [("A", Some("x")), ("B", Some("y"))]),
            Record::from_pairs(1, [("A", Some("1")), ("B", Some("y"))]),
            Record::from_pairs(1, [("A", Some("1")), ("B", Some("2"))]),
        ];
        let outcome = clean(records.clone(), &targets(&["A", "B"]), &columns);
        assert_eq!(
            outcome.dropped_by_column,
            vec![("A".to_string(), 1), ("B".to_string(), 1)]
        );

        let outcome = clean(records, &targets(&["B", "A"]), &columns);
        assert_eq!(
            outcome.dropped_by_column,
            vec![("B".to_string(), 2), ("A".to_string(), 0)]
        );
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn records_without_the_target_are_kept() {
        let columns = ColumnsConfig::default();
        let records = vec![Record::from_pairs(1, [("Peso", Some("kg"))])];
        let outcome = clean(records, &targets(&["Portata"]), &columns);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn all_empty_records_are_dropped() {
        let columns = ColumnsConfig::default();
        let records = vec![
            Record::from_pairs(1, [("model", Some("A")), ("Portata", Some(""))]),
            Record::from_pairs(2, [("model", Some("B")), ("Portata", Some("5"))]),
            Record::from_pairs(3, [("Portata", None)]),
        ];
        let outcome = clean(records, &targets(&["Portata"]), &columns);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].page, 2);
        assert_eq!(outcome.dropped_empty, 2);
        assert_eq!(outcome.dropped_total(), 2);
    }

    #[test]
    fn cleaning_never_adds_records() {
        let columns = ColumnsConfig::default();
        let records: Vec<Record> = ["1", "x", "", "2,5", "y"]
            .iter()
            .enumerate()
            .map(|(i, v)| Record::from_pairs(i as u32, [("v", Some(*v)), ("id", Some("k"))]))
            .collect();
        let outcome = clean(records.clone(), &targets(&["v"]), &columns);

        assert!(outcome.records.len() <= records.len());
        for cleaned in &outcome.records {
            let original = records.iter().find(|r| r.page == cleaned.page).expect("from input");
            assert_eq!(original.get("id"), cleaned.get("id"));
        }
    }

    #[test]
    fn resolve_targets_defaults_to_data_columns() {
        let columns = ColumnsConfig::default();
        let records = vec![
            Record::from_pairs(
                1,
                [
                    ("model", Some("A")),
                    ("Portata", Some("1")),
                    ("Portata unit", Some("m3/h")),
                ],
            ),
            Record::from_pairs(1, [("Peso", Some("2"))]),
        ];
        assert_eq!(resolve_targets(&records, &columns), vec!["Portata", "Peso"]);

        let mut columns = columns;
        columns.target_columns = targets(&["Peso", "Missing", "Portata"]);
        assert_eq!(resolve_targets(&records, &columns), vec!["Peso", "Portata"]);
    }
}
