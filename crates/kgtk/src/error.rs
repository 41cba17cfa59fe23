//! Error types for the kgtk library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kgtk operations.
#[derive(Debug, Error)]
pub enum KgtkError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header could not be read or is structurally wrong.
    #[error("Header error: {0}")]
    Header(String),

    /// A required special column (node1/label/node2/id) is absent.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A column name is unsafe to use (and the policy is fatal).
    #[error("Unsafe column name: '{0}'")]
    UnsafeColumnName(String),

    /// A data row violated a policy set to ERROR.
    #[error("Line {line}: {message}")]
    Row { line: usize, message: String },

    /// Too many COMPLAIN/REPORT diagnostics were emitted.
    #[error("Error budget exhausted after {count} diagnostics")]
    ErrorBudgetExhausted { count: usize },

    /// A property pattern row could not be loaded.
    #[error("Property pattern error at row {row}: {message}")]
    PatternLoad { row: usize, message: String },

    /// A property pattern row named an action that does not exist.
    #[error("Unknown property pattern action: '{0}'")]
    UnknownAction(String),

    /// Arithmetic was attempted over quantities with differing units.
    #[error("Incompatible units: '{left}' vs '{right}'")]
    IncompatibleUnits { left: String, right: String },

    /// Unsupported or undetectable compression type.
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Error from the SQLite graph cache.
    #[error("Graph cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for kgtk operations.
pub type Result<T> = std::result::Result<T, KgtkError>;
