//! Shared types, error model, and configuration for catalogx.
//!
//! This crate is the foundation depended on by all other catalogx crates.
//! It provides:
//! - [`CatalogError`], the unified error type
//! - Domain types ([`RawTable`], [`SourceDocument`], [`Record`], [`OutputTable`])
//! - Configuration ([`AppConfig`], [`ExtractionConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ColumnsConfig, ExtractionConfig, ExtractionSection, OutputConfig,
    UnitConflictPolicy, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_config,
};
pub use error::{CatalogError, Result};
pub use types::{OutputTable, RawTable, Record, SourceDocument, SourcePage};
