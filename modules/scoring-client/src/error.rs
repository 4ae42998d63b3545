/// Result type alias for scoring-service operations.
pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring service not available")]
    NotAvailable,

    #[error("scoring service not ready: {0}")]
    NotReady(String),

    #[error("scoring API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unparseable scoring output: {0}")]
    MalformedOutput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
