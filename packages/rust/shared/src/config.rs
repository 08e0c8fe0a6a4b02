//! Application configuration for catalogx.
//!
//! User config lives at `~/.catalogx/catalogx.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "catalogx.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".catalogx";

// ---------------------------------------------------------------------------
// Config structs (matching catalogx.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Unit discovery and cell handling.
    #[serde(default)]
    pub extraction: ExtractionSection,

    /// Column naming, metadata columns and cleaning targets.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Output file names.
    #[serde(default)]
    pub output: OutputConfig,
}

/// How the unit vocabulary resolves a label that matches more than one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitConflictPolicy {
    /// The first unit discovered for a label is kept.
    #[default]
    First,
    /// Every later discovery overwrites the previous one.
    Last,
}

impl std::str::FromStr for UnitConflictPolicy {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(CatalogError::config(format!(
                "unknown unit conflict policy '{other}': expected 'first' or 'last'"
            ))),
        }
    }
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSection {
    /// Unit tokens the vocabulary learns to recognize (exact, case-sensitive).
    #[serde(default = "default_recognized_units")]
    pub recognized_units: Vec<String>,

    /// Cell texts treated as null (compared case-insensitively).
    #[serde(default = "default_null_markers")]
    pub null_markers: Vec<String>,

    /// Vocabulary conflict policy.
    #[serde(default)]
    pub unit_conflict: UnitConflictPolicy,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            recognized_units: default_recognized_units(),
            null_markers: default_null_markers(),
            unit_conflict: UnitConflictPolicy::default(),
        }
    }
}

fn default_recognized_units() -> Vec<String> {
    ["m3/h", "Pa", "kW", "%"].into_iter().map(String::from).collect()
}
fn default_null_markers() -> Vec<String> {
    vec!["nan".into(), "none".into()]
}

/// `[columns]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Output column holding the source page number.
    #[serde(default = "default_page_column")]
    pub page_column: String,

    /// Column identifying a product/model, when the tables carry one.
    #[serde(default = "default_model_column")]
    pub model_column: String,

    /// Identifying columns placed first in the output, in this order.
    /// They are excluded from unit pairing, cleaning and the all-empty check.
    #[serde(default = "default_identifier_columns")]
    pub identifier_columns: Vec<String>,

    /// Columns that must hold numbers. Empty means every data column, so a
    /// text row such as a `Label` row becomes a target and every record with
    /// text in it is dropped. List the numeric columns to keep those records.
    #[serde(default)]
    pub target_columns: Vec<String>,

    /// Suffix appended to a field name to form its unit column.
    #[serde(default = "default_unit_suffix")]
    pub unit_suffix: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            page_column: default_page_column(),
            model_column: default_model_column(),
            identifier_columns: default_identifier_columns(),
            target_columns: Vec::new(),
            unit_suffix: default_unit_suffix(),
        }
    }
}

fn default_page_column() -> String {
    "page".into()
}
fn default_model_column() -> String {
    "model".into()
}
fn default_identifier_columns() -> Vec<String> {
    vec![default_page_column(), default_model_column()]
}
fn default_unit_suffix() -> String {
    " unit".into()
}

impl ColumnsConfig {
    /// Identifying columns in output order. The page column is always included.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.identifier_columns.len() + 1);
        if !self.identifier_columns.iter().any(|c| c == &self.page_column) {
            ids.push(&self.page_column);
        }
        for column in &self.identifier_columns {
            if !ids.contains(&column.as_str()) {
                ids.push(column);
            }
        }
        ids
    }

    /// Whether `name` is an identifying/metadata column.
    pub fn is_metadata(&self, name: &str) -> bool {
        name == self.page_column || self.identifier_columns.iter().any(|c| c == name)
    }

    /// The field a unit column would belong to, if `name` carries the unit suffix.
    ///
    /// Whether it really is a unit column depends on that field being present.
    pub fn unit_base<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_suffix(self.unit_suffix.as_str())
            .filter(|base| !base.is_empty())
    }

    /// The unit column paired with `field`.
    pub fn unit_column(&self, field: &str) -> String {
        format!("{field}{}", self.unit_suffix)
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name of the extracted catalog table.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,

    /// File name of the ingest documents (JSON lines).
    #[serde(default = "default_documents_file")]
    pub documents_file: String,

    /// File name of the ingest run summary.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            catalog_file: default_catalog_file(),
            documents_file: default_documents_file(),
            metadata_file: default_metadata_file(),
        }
    }
}

fn default_catalog_file() -> String {
    "catalog.csv".into()
}
fn default_documents_file() -> String {
    "documents.jsonl".into()
}
fn default_metadata_file() -> String {
    "ingest_metadata.json".into()
}

// ---------------------------------------------------------------------------
// Extraction config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime extraction configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Recognized unit tokens.
    pub units: BTreeSet<String>,
    /// Lower-cased null markers.
    pub null_markers: Vec<String>,
    /// Vocabulary conflict policy.
    pub unit_conflict: UnitConflictPolicy,
    /// Column naming and cleaning targets.
    pub columns: ColumnsConfig,
}

impl From<&AppConfig> for ExtractionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            units: config
                .extraction
                .recognized_units
                .iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
            null_markers: config
                .extraction
                .null_markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .collect(),
            unit_conflict: config.extraction.unit_conflict,
            columns: config.columns.clone(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl ExtractionConfig {
    /// Whether `text` is a null marker such as `nan`.
    pub fn is_null_marker(&self, text: &str) -> bool {
        let text = text.trim();
        self.null_markers.iter().any(|m| m.eq_ignore_ascii_case(text))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.catalogx/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.catalogx/catalogx.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CatalogError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CatalogError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let columns = &config.columns;
    if columns.page_column.trim().is_empty() {
        return Err(CatalogError::config("columns.page_column must not be empty"));
    }
    if columns.unit_suffix.trim().is_empty() {
        return Err(CatalogError::config("columns.unit_suffix must not be blank"));
    }
    if let Some(target) = columns.target_columns.iter().find(|t| columns.is_metadata(t)) {
        return Err(CatalogError::config(format!(
            "target column '{target}' is an identifier column and cannot be cleaned"
        )));
    }
    Ok(())
}
