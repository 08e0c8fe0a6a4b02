//! Catalog extraction engine.
//!
//! Turns the tables found on catalog pages into one flat, cleaned product
//! table: unit discovery, normalization and transposition, unit attachment,
//! numeric cleaning and column ordering, driven end to end by
//! [`pipeline::extract_catalog`]. [`documents`] derives searchable ingest
//! documents from the resulting table.

pub mod assembler;
pub mod cleaning;
pub mod documents;
pub mod normalize;
pub mod ordering;
pub mod pipeline;
pub mod units;
