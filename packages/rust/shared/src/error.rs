//! Error types for catalogx.
//!
//! Library crates use [`CatalogError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all catalogx operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The source table dump could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The destination file is held open by another program.
    #[error("destination is locked: {path:?} (close it and retry)")]
    Locked { path: PathBuf },

    /// Data validation error (malformed table, unexpected shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// CSV encoding or decoding error.
    #[error("csv error: {0}")]
    Csv(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error from writing `path`.
    ///
    /// `PermissionDenied` on a write is reported as [`CatalogError::Locked`]:
    /// that is what a destination held open by a spreadsheet looks like.
    pub fn write_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::Locked { path };
        }
        Self::Io { path, source }
    }

    /// Whether the caller may release the destination and retry.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CatalogError::config("unknown unit policy");
        assert_eq!(err.to_string(), "config error: unknown unit policy");

        let err = CatalogError::validation("table has no columns");
        assert!(err.to_string().contains("no columns"));
    }

    #[test]
    fn denied_write_maps_to_locked() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "in use");
        let err = CatalogError::write_io("catalog.csv", source);
        assert!(err.is_locked());
        assert!(err.to_string().contains("catalog.csv"));

        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CatalogError::write_io("catalog.csv", source);
        assert!(!err.is_locked());
    }

    #[test]
    fn denied_read_stays_io() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CatalogError::io("input.json", source);
        assert!(!err.is_locked());
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(!err.to_string().contains("locked"));
    }
}
