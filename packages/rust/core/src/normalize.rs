//! Table normalizer: one raw page table in, transposed records out.
//!
//! Catalog tables are laid out sideways: the first column holds field names
//! and every further column describes one product. Extraction leaves merged
//! cells split and grouped labels blank, so the grid is repaired before it
//! is transposed.

use std::collections::HashSet;

use tracing::{debug, trace};

use catalogx_shared::{ExtractionConfig, RawTable, Record};

/// Tables with fewer rows than this are extraction noise.
pub const MIN_TABLE_ROWS: usize = 2;

/// Prefix of the placeholder label given to rows without one.
pub const EXTRA_LABEL_PREFIX: &str = "Extra_";

type Grid = Vec<Vec<Option<String>>>;

/// Normalizes raw tables into records.
#[derive(Debug, Clone, Copy)]
pub struct TableNormalizer<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> TableNormalizer<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Normalize one table found on `page`.
    ///
    /// Returns one record per data column, each mapping every (deduplicated)
    /// row label to that column's cell. All records share the same field set.
    pub fn normalize(&self, table: &RawTable, page: u32) -> Vec<Record> {
        if table.row_count() < MIN_TABLE_ROWS {
            trace!(page, rows = table.row_count(), "table too small, skipping");
            return Vec::new();
        }

        let mut grid = clean_cells(table);
        fill_across(&mut grid);
        fill_down(&mut grid);
        let labels = self.label_rows(&grid);
        let rows = dedup_rows(labels, &grid);

        let width = grid.first().map_or(0, Vec::len);
        let columns: Vec<usize> = (1..width)
            .filter(|&col| {
                let units_only = self.is_unit_column(&rows, col);
                if units_only {
                    debug!(page, column = col, "skipping unit annotation column");
                }
                !units_only
            })
            .collect();

        columns
            .into_iter()
            .map(|col| {
                let mut record = Record::new(page);
                for (label, row) in &rows {
                    record.set(label.clone(), row[col].clone());
                }
                record
            })
            .collect()
    }

    /// Column-1 labels after filling, with placeholders for missing ones.
    fn label_rows(&self, grid: &Grid) -> Vec<String> {
        grid.iter()
            .enumerate()
            .map(|(idx, row)| {
                let label = row
                    .first()
                    .and_then(Option::as_deref)
                    .map(str::trim)
                    .unwrap_or_default();
                if label.is_empty() || self.config.is_null_marker(label) {
                    format!("{EXTRA_LABEL_PREFIX}{idx}")
                } else {
                    label.to_string()
                }
            })
            .collect()
    }

    /// A column holding nothing but recognized unit tokens annotates the rows
    /// instead of describing a product.
    fn is_unit_column(&self, rows: &[(String, &[Option<String>])], col: usize) -> bool {
        let mut saw_unit = false;
        for (_, row) in rows {
            match row[col].as_deref() {
                None => {}
                Some(cell) if self.config.units.contains(cell.trim()) => saw_unit = true,
                Some(_) => return false,
            }
        }
        saw_unit
    }
}

/// Pad rows to a common width, replace line breaks with spaces and turn
/// blank cells into nulls.
fn clean_cells(table: &RawTable) -> Grid {
    let width = table.width();
    table
        .rows
        .iter()
        .map(|row| {
            (0..width)
                .map(|col| {
                    let cell = row.get(col)?.as_deref()?;
                    let cell = cell.replace("\r\n", " ").replace(['\n', '\r'], " ");
                    (!cell.trim().is_empty()).then_some(cell)
                })
                .collect()
        })
        .collect()
}

/// Forward-fill nulls left to right across columns 2..N of each row.
/// Restores merged header cells that extraction split over several columns.
fn fill_across(grid: &mut Grid) {
    for row in grid.iter_mut() {
        let mut last: Option<String> = None;
        for cell in row.iter_mut().skip(1) {
            if cell.is_some() {
                last.clone_from(cell);
            } else {
                cell.clone_from(&last);
            }
        }
    }
}

/// Forward-fill nulls down column 1. Restores labels of grouped rows.
fn fill_down(grid: &mut Grid) {
    let mut last: Option<String> = None;
    for row in grid.iter_mut() {
        let Some(cell) = row.first_mut() else {
            continue;
        };
        if cell.is_some() {
            last.clone_from(cell);
        } else {
            cell.clone_from(&last);
        }
    }
}

/// Keep the first row for each label; later duplicates are dropped.
fn dedup_rows(labels: Vec<String>, grid: &Grid) -> Vec<(String, &[Option<String>])> {
    let mut seen = HashSet::with_capacity(labels.len());
    labels
        .into_iter()
        .zip(grid.iter().map(Vec::as_slice))
        .filter(|(label, _)| {
            let first = seen.insert(label.clone());
            if !first {
                debug!(%label, "dropping row with duplicate label");
            }
            first
        })
        .collect()
}
