//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use catalogx_artifacts::{
    ArtifactMeta, IngestSummary, encode_json, encode_jsonl, read_catalog_csv, write_atomic,
    write_catalog_csv,
};
use catalogx_core::documents::build_documents;
use catalogx_core::pipeline::{ExtractResult, ProgressReporter, extract_file};
use catalogx_shared::{
    AppConfig, CatalogError, ExtractionConfig, UnitConflictPolicy, init_config, load_config,
    load_config_from, validate_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// catalogx: flatten product catalog tables into one clean dataset.
#[derive(Parser)]
#[command(
    name = "catalogx",
    version,
    about = "Extract, normalize and clean the technical data tables of product catalogs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.catalogx/catalogx.toml.
    #[arg(long, global = true, env = "CATALOGX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract the catalog table from a page table dump (JSON).
    Extract {
        /// Table dump produced by the PDF table extractor.
        input: PathBuf,

        /// Output CSV path (defaults to `output.catalog_file`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Recognized unit token (repeatable). Replaces the configured list.
        #[arg(long = "unit")]
        units: Vec<String>,

        /// Numeric target column (repeatable). Replaces the configured list.
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Unit conflict policy: first or last.
        #[arg(long)]
        unit_conflict: Option<String>,
    },

    /// Build ingest documents (JSONL) from an extracted catalog CSV.
    Documents {
        /// Catalog CSV written by `extract`.
        catalog: PathBuf,

        /// Output directory (defaults to the current directory).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "catalogx=info",
        1 => "catalogx=debug",
        _ => "catalogx=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Extract {
            input,
            out,
            units,
            targets,
            unit_conflict,
        } => cmd_extract(
            config_path,
            &input,
            out,
            units,
            targets,
            unit_conflict.as_deref(),
        ),
        Command::Documents { catalog, out_dir } => cmd_documents(config_path, &catalog, out_dir),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_extract(
    config_path: Option<&Path>,
    input: &Path,
    out: Option<PathBuf>,
    units: Vec<String>,
    targets: Vec<String>,
    unit_conflict: Option<&str>,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;

    // CLI flags override config file values
    if !units.is_empty() {
        config.extraction.recognized_units = units;
    }
    if !targets.is_empty() {
        config.columns.target_columns = targets;
    }
    if let Some(policy) = unit_conflict {
        config.extraction.unit_conflict = policy.parse::<UnitConflictPolicy>()?;
    }
    validate_config(&config)?;

    let extraction = ExtractionConfig::from(&config);
    let out = out.unwrap_or_else(|| PathBuf::from(&config.output.catalog_file));

    info!(
        input = %input.display(),
        out = %out.display(),
        units = extraction.units.len(),
        "extracting catalog"
    );

    let reporter = CliProgress::new();
    let result = extract_file(input, &extraction, &reporter)
        .wrap_err_with(|| format!("failed to extract '{}'", input.display()))?;

    if result.table.is_empty() {
        println!("No data found in '{}'; nothing written.", input.display());
        return Ok(());
    }

    let meta = write_with_retry(&out, || write_catalog_csv(&out, &result.table), wait_for_release)?;

    let stats = &result.stats;
    let dropped: usize = stats.dropped_by_column.iter().map(|(_, n)| n).sum();

    println!();
    println!("  Catalog extracted!");
    println!("  Pages:    {}", stats.pages);
    println!(
        "  Tables:   {} ({} skipped)",
        stats.tables_seen, stats.tables_skipped
    );
    println!("  Units:    {}", result.vocabulary.len());
    println!(
        "  Records:  {} ({} dropped as non-numeric, {} empty)",
        result.table.len(),
        dropped,
        stats.dropped_empty
    );
    println!("  Columns:  {}", result.table.columns.len());
    println!("  Output:   {}", out.display());
    println!("  SHA-256:  {}", meta.sha256);
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_documents(
    config_path: Option<&Path>,
    catalog: &Path,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("."));

    let table = read_catalog_csv(catalog)
        .wrap_err_with(|| format!("failed to read catalog '{}'", catalog.display()))?;
    info!(
        catalog = %catalog.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "building ingest documents"
    );

    let documents = build_documents(&table, &config.columns);
    if documents.is_empty() {
        println!(
            "No row of '{}' has a value with a unit; nothing written.",
            catalog.display()
        );
        return Ok(());
    }

    let documents_path = out_dir.join(&config.output.documents_file);
    let documents_content = encode_jsonl(&documents)?;
    let summary = IngestSummary::new(
        documents.len(),
        table.columns.len(),
        catalog.display().to_string(),
        vec![ArtifactMeta::for_content(&documents_path, &documents_content)?],
    );
    let metadata_path = out_dir.join(&config.output.metadata_file);
    let metadata_content = encode_json(&summary)?;

    commit_ingest(
        &documents_path,
        &documents_content,
        &metadata_path,
        &metadata_content,
        wait_for_release,
    )?;

    println!();
    println!("  Documents built!");
    println!("  Rows:      {}", table.len());
    println!("  Documents: {}", documents.len());
    println!("  Output:    {}", documents_path.display());
    println!("  Metadata:  {}", metadata_path.display());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Locked destination handling
// ---------------------------------------------------------------------------

/// Commit the encoded documents, then their summary. A documents file whose
/// summary could not be written is removed again.
fn commit_ingest(
    documents_path: &Path,
    documents_content: &[u8],
    metadata_path: &Path,
    metadata_content: &[u8],
    mut wait: impl FnMut(&Path) -> Result<()>,
) -> Result<()> {
    write_with_retry(
        documents_path,
        || write_atomic(documents_path, documents_content),
        &mut wait,
    )?;
    if let Err(err) = write_with_retry(
        metadata_path,
        || write_atomic(metadata_path, metadata_content),
        &mut wait,
    ) {
        warn!(path = %documents_path.display(), "summary not written, removing documents");
        let _ = std::fs::remove_file(documents_path);
        return Err(err);
    }
    Ok(())
}

/// Run a write; if the destination is locked, `wait` for the user to close it
/// and retry once. A second failure is fatal.
fn write_with_retry<T>(
    path: &Path,
    mut write: impl FnMut() -> catalogx_shared::Result<T>,
    mut wait: impl FnMut(&Path) -> Result<()>,
) -> Result<T> {
    match write() {
        Err(err) if err.is_locked() => {
            warn!(path = %path.display(), "destination is locked");
            wait(path)?;
            write().map_err(|err| locked_report(path, err))
        }
        other => other.map_err(|err| locked_report(path, err)),
    }
}

fn wait_for_release(path: &Path) -> Result<()> {
    eprint!(
        "'{}' is open in another program. Close it and press Enter to retry... ",
        path.display()
    );
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

fn locked_report(path: &Path, err: CatalogError) -> color_eyre::Report {
    if err.is_locked() {
        eyre!("'{}' is still locked; close it and run again", path.display())
    } else {
        color_eyre::Report::new(err)
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_processed(&self, page: u32, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Reading tables [{current}/{total}] page {page}"));
    }

    fn done(&self, _result: &ExtractResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    fn locked() -> CatalogError {
        CatalogError::Locked {
            path: PathBuf::from("catalog.csv"),
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("catalogx-cli-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn locked_then_released_retries_once() {
        let attempts = Cell::new(0);
        let prompts = Cell::new(0);
        let result = write_with_retry(
            Path::new("catalog.csv"),
            || {
                attempts.set(attempts.get() + 1);
                if attempts.get() == 1 {
                    Err(locked())
                } else {
                    Ok(7)
                }
            },
            |_| {
                prompts.set(prompts.get() + 1);
                Ok(())
            },
        );

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.get(), 2);
        assert_eq!(prompts.get(), 1);
    }

    #[test]
    fn still_locked_after_retry_is_fatal() {
        let attempts = Cell::new(0);
        let prompts = Cell::new(0);
        let result: Result<()> = write_with_retry(
            Path::new("catalog.csv"),
            || {
                attempts.set(attempts.get() + 1);
                Err(locked())
            },
            |_| {
                prompts.set(prompts.get() + 1);
                Ok(())
            },
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("still locked"));
        assert_eq!(attempts.get(), 2);
        assert_eq!(prompts.get(), 1);
    }

    #[test]
    fn other_errors_fail_without_prompting() {
        let attempts = Cell::new(0);
        let prompts = Cell::new(0);
        let result: Result<()> = write_with_retry(
            Path::new("catalog.csv"),
            || {
                attempts.set(attempts.get() + 1);
                Err(CatalogError::validation("not a file path"))
            },
            |_| {
                prompts.set(prompts.get() + 1);
                Ok(())
            },
        );

        assert!(result.unwrap_err().to_string().contains("not a file path"));
        assert_eq!(attempts.get(), 1);
        assert_eq!(prompts.get(), 0);
    }

    #[test]
    fn ingest_commit_writes_both_files() {
        let dir = temp_dir();
        let documents = dir.join("documents.jsonl");
        let metadata = dir.join("ingest_metadata.json");

        commit_ingest(&documents, b"{}\n", &metadata, b"{}", |_| Ok(())).expect("commit");
        assert_eq!(std::fs::read(&documents).unwrap(), b"{}\n");
        assert_eq!(std::fs::read(&metadata).unwrap(), b"{}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_summary_removes_documents() {
        let dir = temp_dir();
        let documents = dir.join("documents.jsonl");
        // A directory in the way makes the summary rename fail.
        let metadata = dir.join("ingest_metadata.json");
        std::fs::create_dir_all(metadata.join("occupied")).unwrap();

        let result = commit_ingest(&documents, b"{}\n", &metadata, b"{}", |_| Ok(()));

        assert!(result.is_err());
        assert!(!documents.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
