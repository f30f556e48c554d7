//! Error types for tr-core

use crate::row::RowError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure, independent of the concrete error variant.
///
/// Callers should branch on this rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source could not be opened or read at all
    Open,
    /// A table name failed naming rules
    InvalidTableName,
    /// A header name is blank or duplicated
    InvalidHeaderName,
    /// A row could not be normalized against the headers
    InvalidData,
    /// The source parsed but yielded no usable table
    EmptyData,
    /// Generic fragment-level validation failure
    Validation,
    /// A supplied path is structurally invalid
    InvalidFilePath,
}

/// Errors that can occur in tr-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{source_name}': {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    /// JSON document could not be parsed
    #[error("JSON error in '{source_name}': {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Workbook could not be opened or a sheet could not be read
    #[cfg(feature = "spreadsheet")]
    #[error("spreadsheet error in '{source_name}': {source}")]
    Spreadsheet {
        source_name: String,
        #[source]
        source: calamine::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path rejected before any I/O
    #[error("invalid file path: {0}")]
    InvalidFilePath(String),

    /// Table name failed validation
    #[error("invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    /// Header name failed validation
    #[error("invalid header name '{header}' in table '{table}': {reason}")]
    InvalidHeaderName {
        table: String,
        header: String,
        reason: String,
    },

    /// Row could not be normalized
    #[error("invalid data in table '{table}', row {row}: {source}")]
    InvalidData {
        table: String,
        row: usize,
        #[source]
        source: RowError,
    },

    /// Source yielded no usable table
    #[error("no table data found in '{0}'")]
    EmptyData(String),

    /// Fragment-level validation failure
    #[error("validation failed for '{source_name}': {message}")]
    Validation { source_name: String, message: String },

    /// Dataframe conversion failed
    #[cfg(feature = "dataframe")]
    #[error("dataframe error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fold the concrete variant into its taxonomy kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileRead { .. } | Error::Csv { .. } | Error::Json { .. } | Error::Io(_) => {
                ErrorKind::Open
            }
            #[cfg(feature = "spreadsheet")]
            Error::Spreadsheet { .. } => ErrorKind::Open,
            Error::WalkDir(_) => ErrorKind::Open,
            Error::InvalidFilePath(_) => ErrorKind::InvalidFilePath,
            Error::InvalidTableName { .. } => ErrorKind::InvalidTableName,
            Error::InvalidHeaderName { .. } => ErrorKind::InvalidHeaderName,
            Error::InvalidData { .. } => ErrorKind::InvalidData,
            Error::EmptyData(_) => ErrorKind::EmptyData,
            Error::Validation { .. } => ErrorKind::Validation,
            #[cfg(feature = "dataframe")]
            Error::DataFrame(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn validation(source_name: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}
