//! End-to-end `extract` pipeline: page tables → units → records → clean → table.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use catalogx_shared::{
    CatalogError, ExtractionConfig, OutputTable, Result, SourceDocument, SourcePage,
};

use crate::assembler::{RecordAccumulator, attach_units};
use crate::cleaning::{self, CleanOutcome};
use crate::normalize::{MIN_TABLE_ROWS, TableNormalizer};
use crate::ordering;
use crate::units::UnitVocabulary;

/// Counters collected while extracting.
#[derive(Debug, Clone, Default)]
pub struct ExtractStats {
    /// Pages in the source document.
    pub pages: usize,
    /// Raw tables seen across all pages.
    pub tables_seen: usize,
    /// Tables discarded as too small.
    pub tables_skipped: usize,
    /// Records assembled before cleaning.
    pub records_assembled: usize,
    /// Target columns in evaluation order.
    pub targets: Vec<String>,
    /// Records removed per target column.
    pub dropped_by_column: Vec<(String, usize)>,
    /// Records removed because every data field was empty.
    pub dropped_empty: usize,
}

/// Result of the `extract` pipeline.
#[derive(Debug)]
pub struct ExtractResult {
    /// The ordered output table. Empty when no tables were found.
    pub table: OutputTable,
    /// Units learned over the whole document.
    pub vocabulary: UnitVocabulary,
    pub stats: ExtractStats,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after every table of a page has been processed.
    fn page_processed(&self, page: u32, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ExtractResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_processed(&self, _page: u32, _current: usize, _total: usize) {}
    fn done(&self, _result: &ExtractResult) {}
}

/// Load the page table dump produced by the table extractor.
pub fn load_source(path: &Path) -> Result<SourceDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| CatalogError::parse(format!("invalid table dump {}: {e}", path.display())))
}

/// Load `path` and run [`extract_catalog`] on it.
pub fn extract_file(
    path: &Path,
    config: &ExtractionConfig,
    progress: &dyn ProgressReporter,
) -> Result<ExtractResult> {
    let document = load_source(path)?;
    Ok(extract_catalog(&document, config, progress))
}

/// Run the full extraction pipeline over a document.
///
/// 1. Per table, in page order: learn units, normalize, attach units
/// 2. Clean numeric target columns
/// 3. Order columns into the output table
#[instrument(skip_all, fields(pages = document.pages.len()))]
pub fn extract_catalog(
    document: &SourceDocument,
    config: &ExtractionConfig,
    progress: &dyn ProgressReporter,
) -> ExtractResult {
    let start = Instant::now();
    let mut stats = ExtractStats {
        pages: document.pages.len(),
        tables_seen: document.table_count(),
        ..ExtractStats::default()
    };

    info!(
        pages = stats.pages,
        tables = stats.tables_seen,
        units = config.units.len(),
        "starting extract pipeline"
    );

    // --- Phase 1: Tables → records ---
    progress.phase("Reading tables");
    let normalizer = TableNormalizer::new(config);
    let mut vocabulary = UnitVocabulary::new();
    let mut accumulator = RecordAccumulator::new();
    let total = document.pages.len();

    for (i, (number, page)) in document.numbered_pages().enumerate() {
        stats.tables_skipped +=
            process_page(number, page, &normalizer, config, &mut vocabulary, &mut accumulator);
        progress.page_processed(number, i + 1, total);
    }
    stats.records_assembled = accumulator.len();

    info!(
        records = accumulator.len(),
        tables = accumulator.table_count(),
        units_learned = vocabulary.len(),
        "records assembled"
    );
    for (label, unit) in vocabulary.iter() {
        debug!(%label, %unit, "vocabulary entry");
    }

    // --- Phase 2: Numeric cleaning ---
    progress.phase("Cleaning numeric columns");
    let records = accumulator.into_records();
    let targets = cleaning::resolve_targets(&records, &config.columns);
    let CleanOutcome {
        records,
        dropped_by_column,
        dropped_empty,
    } = cleaning::clean(records, &targets, &config.columns);
    stats.targets = targets;
    stats.dropped_by_column = dropped_by_column;
    stats.dropped_empty = dropped_empty;

    // --- Phase 3: Column ordering ---
    progress.phase("Ordering columns");
    let table = ordering::order(&records, &config.columns);

    let result = ExtractResult {
        table,
        vocabulary,
        stats,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        rows = result.table.len(),
        columns = result.table.columns.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "extract pipeline complete"
    );

    result
}

/// Process every table of one page. Returns the number of tables skipped.
fn process_page(
    number: u32,
    page: &SourcePage,
    normalizer: &TableNormalizer<'_>,
    config: &ExtractionConfig,
    vocabulary: &mut UnitVocabulary,
    accumulator: &mut RecordAccumulator,
) -> usize {
    let mut skipped = 0;
    for table in &page.tables {
        if table.row_count() < MIN_TABLE_ROWS {
            skipped += 1;
            continue;
        }

        vocabulary.learn(table, config);
        let records: Vec<_> = normalizer
            .normalize(table, number)
            .into_iter()
            .map(|record| attach_units(record, vocabulary, &config.columns))
            .collect();

        debug!(page = number, records = records.len(), "table normalized");
        accumulator.append(records);
    }
    skipped
}
