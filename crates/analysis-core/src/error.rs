use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Failure of a single market-data provider call.
///
/// Callers in the pipeline never propagate these: each one is matched and the
/// affected data degrades to empty.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Provider returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}
