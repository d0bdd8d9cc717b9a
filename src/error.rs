//! Error types shared by every pipeline stage.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, SpectraError>;

/// Everything that can go wrong between a query string and a classified object.
#[derive(Error, Debug)]
pub enum SpectraError {
    /// The query failed the select/from sanity check and was never sent.
    #[error("invalid query: {query:?} must contain both SELECT and FROM")]
    InvalidQuery { query: String },

    /// The remote query service answered with an error status.
    #[error("remote service error (HTTP {status}): {message}")]
    RemoteService { status: u16, message: String },

    #[error("remote service timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// An operation needed a dataset and none is loaded (or it has no rows).
    #[error("no data available for {operation}")]
    NoData { operation: &'static str },

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("length mismatch: expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Columns no longer share a row count (column-wise outlier removal).
    #[error("dataset is ragged; {operation} needs columns of equal length")]
    RaggedDataset { operation: &'static str },

    #[error("column '{column}' has zero variance and cannot be standardized")]
    DegenerateColumn { column: String },

    /// A spectrum fetch used up its retry budget.
    #[error("spectrum fetch failed after {attempts} attempts (last status: {})", fmt_status(.last_status))]
    Fetch {
        attempts: u32,
        last_status: Option<u16>,
    },

    #[error("malformed spectrum: {0}")]
    MalformedSpectrum(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not enough data: {0}")]
    EmptyInput(&'static str),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("classifier has not been trained; call fit first")]
    NotTrained,

    #[error("invalid configuration: {0}")]
    Config(String),

    /// `csv::Error` already prefixes its message with "CSV error".
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl SpectraError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        SpectraError::MissingColumn {
            column: column.into(),
        }
    }

    /// Whether a spectrum fetch may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SpectraError::Transport(_) | SpectraError::Timeout(_) | SpectraError::RemoteService { .. }
        )
    }
}
