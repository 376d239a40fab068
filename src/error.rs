//! Error taxonomy for the report pipeline.
//!
//! Errors split into two classes: fatal errors abort the current run and are
//! surfaced to the caller as-is; directory-lookup failures are per-identifier
//! and are converted into [`Warning`] entries so a report stays useful when
//! the CRM is partially unavailable.

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Input / CSV ───────────────────────────────────────────────────────────
    #[error("File is not valid UTF-8")]
    NotUtf8,

    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    #[error("Column '{wanted}' not found. Available: [{}]", .available.join(", "))]
    ColumnNotFound {
        wanted: String,
        available: Vec<String>,
    },

    // ── Directory lookups ─────────────────────────────────────────────────────
    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── Export ────────────────────────────────────────────────────────────────
    #[error("Sheet name collision after sanitization: '{name}'")]
    SheetNameCollision { name: String },

    #[error("Nothing to export: no sheets supplied")]
    ExportEmpty,

    #[error("Spreadsheet write failed: {0}")]
    ExportFailed(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error aborts the whole pipeline run.
    ///
    /// Directory-layer failures are scoped to a single identifier: the batch
    /// continues and the failure is reported as a [`Warning`] instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::DirectoryError(_) | AppError::ConnectionFailed(_)
        )
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::ExportFailed(err.to_string())
    }
}

/// Non-fatal per-identifier failure, accumulated alongside partial results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// The identifier whose lookup failed.
    pub identifier: i64,
    /// Human-readable failure description.
    pub message: String,
}

impl Warning {
    /// Builds a warning from a non-fatal lookup error.
    pub fn from_lookup_error(identifier: i64, err: &AppError) -> Self {
        Self {
            identifier,
            message: err.to_string(),
        }
    }
}
