use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads its field catalog, talks to the toktlogger, or emits a workbook.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Network or HTTP status failures while talking to the toktlogger.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when a field descriptor in the catalog is malformed.
    #[error("invalid field descriptor: {0}")]
    InvalidField(String),

    /// Raised when a workbook layout references a field the catalog lacks.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Raised when two catalog entries share the same name.
    #[error("duplicate field '{0}' in catalog")]
    DuplicateField(String),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the toktlogger answers with an unexpected payload.
    #[error("unexpected toktlogger response: {0}")]
    InvalidResponse(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
