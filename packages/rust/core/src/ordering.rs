//! Column ordering policy for the output table.

use catalogx_shared::{ColumnsConfig, OutputTable, Record};

use crate::assembler::ColumnSet;

/// Lay the cleaned records out as a table.
///
/// Identifying columns come first (in configured order, when present), then
/// every data column in first-seen order, each immediately followed by its
/// unit column. Columns no record has are omitted, as are the unit columns
/// of identifying columns. A suffixed column whose base field is absent is
/// plain data. The page column is rendered from the record's page number and
/// is present whenever there are records.
pub fn order(records: &[Record], columns: &ColumnsConfig) -> OutputTable {
    if records.is_empty() {
        return OutputTable::default();
    }

    let set = ColumnSet::collect(records);
    let mut ordered: Vec<String> = columns
        .identifiers()
        .into_iter()
        .filter(|id| *id == columns.page_column || set.contains(id))
        .map(String::from)
        .collect();

    for name in set.data_columns(columns) {
        ordered.push(name.to_string());
        let unit = columns.unit_column(name);
        if set.contains(&unit) {
            ordered.push(unit);
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            ordered
                .iter()
                .map(|column| {
                    if *column == columns.page_column {
                        Some(record.page.to_string())
                    } else {
                        record.get(column).map(String::from)
                    }
                })
                .collect()
        })
        .collect();

    OutputTable {
        columns: ordered,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_first_then_data_with_units() {
        let columns = ColumnsConfig::default();
        let records = vec![
            Record::from_pairs(
                1,
                [
                    ("Portata", Some("120")),
                    ("model", Some("A")),
                    ("Peso", Some("4")),
                    ("Portata unit", Some("m3/h")),
                ],
            ),
            Record::from_pairs(2, [("Pressione", Some("80")), ("Pressione unit", Some("Pa"))]),
        ];
        let table = order(&records, &columns);

        assert_eq!(
            table.columns,
            ["page", "model", "Portata", "Portata unit", "Peso", "Pressione", "Pressione unit"]
        );
        assert_eq!(table.cell(0, "page"), Some("1"));
        assert_eq!(table.cell(0, "Portata unit"), Some("m3/h"));
        assert_eq!(table.cell(1, "page"), Some("2"));
        assert_eq!(table.cell(1, "model"), None);
        assert_eq!(table.cell(1, "Pressione unit"), Some("Pa"));
    }

    #[test]
    fn suffixed_column_without_base_stays_data() {
        let columns = ColumnsConfig::default();
        let records = vec![Record::from_pairs(
            3,
            [("Peso", Some("4")), ("Ghost unit", Some("kW"))],
        )];
        let table = order(&records, &columns);
        assert_eq!(table.columns, ["page", "Peso", "Ghost unit"]);
    }

    #[test]
    fn orphan_unit_column_is_dropped_when_base_is_metadata() {
        let columns = ColumnsConfig::default();
        let records = vec![Record::from_pairs(
            1,
            [("model", Some("A")), ("model unit", Some("kW")), ("Peso", Some("1"))],
        )];
        let table = order(&records, &columns);
        assert_eq!(table.columns, ["page", "model", "Peso"]);
    }

    #[test]
    fn preserves_record_order() {
        let columns = ColumnsConfig::default();
        let records: Vec<Record> = [5, 2, 9]
            .into_iter()
            .map(|page| Record::from_pairs(page, [("Peso", Some("1"))]))
            .collect();
        let table = order(&records, &columns);
        let pages: Vec<_> = (0..table.len()).map(|i| table.cell(i, "page")).collect();
        assert_eq!(pages, vec![Some("5"), Some("2"), Some("9")]);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = order(&[], &ColumnsConfig::default());
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }

    #[test]
    fn field_named_like_page_column_is_not_duplicated() {
        let columns = ColumnsConfig::default();
        let records = vec![Record::from_pairs(4, [("page", Some("99")), ("Peso", Some("1"))])];
        let table = order(&records, &columns);
        assert_eq!(table.columns, ["page", "Peso"]);
        assert_eq!(table.cell(0, "page"), Some("4"));
    }
}
