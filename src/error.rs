//! Errors raised while fetching live bus positions.

use thiserror::Error;

/// Failure modes of a [`TransitDataSource`](crate::source::TransitDataSource).
///
/// Every variant is treated the same by the poll task (no update this cycle);
/// the distinction exists for logging.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::Network(_) => "network",
            SourceError::InvalidUrl(_) => "invalid_url",
            SourceError::Status { .. } => "http_status",
            SourceError::Payload(_) | SourceError::Json(_) => "payload",
        }
    }
}
