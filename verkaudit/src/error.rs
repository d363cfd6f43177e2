//! Error types for verkaudit

/// Custom error type for verkaudit operations
#[derive(thiserror::Error, Debug)]
pub enum VerkauditError {
    /// Verkada API error
    #[error("Verkada API error: {0}")]
    VerkadaApi(#[from] verkada_platform::VerkadaError),

    /// Writing the report failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid datetime format
    #[error("Invalid datetime format: {0}")]
    InvalidDateTimeFormat(String),

    /// Invalid date range
    #[error("Invalid date range: {0}")]
    DateRangeInvalid(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for verkaudit operations
pub type Result<T> = std::result::Result<T, VerkauditError>;
