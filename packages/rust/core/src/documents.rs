//! Ingest documents: one searchable text document per catalog row.
//!
//! Each document describes a product as `"Name: value unit | ..."` over the
//! columns that carry both a value and a unit, plus metadata pointing back to
//! the source row and page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use catalogx_shared::{ColumnsConfig, OutputTable};

/// Fallback page number when a row has no usable page cell.
const DEFAULT_PAGE: u32 = 1;

/// A measured value with its unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub value: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Model column value, or `MOD_<row>` when the row has none.
    pub model_id: String,
    pub page: u32,
    /// 0-based row index in the catalog table.
    pub row_index: usize,
    /// The row's parameters as a JSON object, in column order.
    pub parameters_json: String,
    pub parameter_count: usize,
}

/// One JSONL line of the documents artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestDocument {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

/// Build documents from a catalog table. Rows without any parameter are skipped.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn build_documents(table: &OutputTable, columns: &ColumnsConfig) -> Vec<IngestDocument> {
    let pairs = parameter_columns(table, columns);
    let mut documents = Vec::with_capacity(table.len());

    for row_index in 0..table.len() {
        let parameters: Vec<(&str, Parameter)> = pairs
            .iter()
            .filter_map(|&(name, unit_column)| {
                let value = table.cell(row_index, name)?;
                let unit = table.cell(row_index, unit_column)?.trim();
                Some((
                    name,
                    Parameter {
                        value: value.to_string(),
                        unit: unit.to_string(),
                    },
                ))
            })
            .collect();

        let page_content = describe(&parameters);
        if page_content.trim().is_empty() {
            debug!(row = row_index, "row has no parameters, skipping");
            continue;
        }

        let mut object = Map::new();
        for (name, parameter) in &parameters {
            object.insert(
                (*name).to_string(),
                json!({ "value": parameter.value, "unit": parameter.unit }),
            );
        }

        documents.push(IngestDocument {
            page_content,
            metadata: DocumentMetadata {
                model_id: model_id(table, row_index, columns),
                page: page_number(table, row_index, columns),
                row_index,
                parameters_json: Value::Object(object).to_string(),
                parameter_count: parameters.len(),
            },
        });
    }

    debug!(documents = documents.len(), "documents built");
    documents
}

/// `(data column, unit column)` pairs present in the table, in column order.
///
/// A suffixed column is a unit column only when its base field is present.
fn parameter_columns<'t>(
    table: &'t OutputTable,
    columns: &ColumnsConfig,
) -> Vec<(&'t str, &'t str)> {
    let is_unit_column = |name: &str| {
        columns
            .unit_base(name)
            .is_some_and(|base| table.column_index(base).is_some())
    };
    table
        .columns
        .iter()
        .filter(|name| !columns.is_metadata(name) && !is_unit_column(name.as_str()))
        .filter_map(|name| {
            let unit = columns.unit_column(name);
            let index = table.column_index(&unit)?;
            Some((name.as_str(), table.columns[index].as_str()))
        })
        .collect()
}

fn describe(parameters: &[(&str, Parameter)]) -> String {
    parameters
        .iter()
        .map(|(name, p)| format!("{}: {} {}", humanize(name), p.value, p.unit))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn model_id(table: &OutputTable, row: usize, columns: &ColumnsConfig) -> String {
    table
        .cell(row, &columns.model_column)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map_or_else(|| format!("MOD_{row}"), String::from)
}

fn page_number(table: &OutputTable, row: usize, columns: &ColumnsConfig) -> u32 {
    table
        .cell(row, &columns.page_column)
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PAGE)
}

/// `portata_aria m3` → `Portata Aria M3`: underscores become spaces and every
/// letter run starts upper-case with the rest lower-case.
pub fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
