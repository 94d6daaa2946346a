#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] diqwest::error::Error),
    #[error("Failed to read response body: {0}")]
    Body(#[from] reqwest::Error),
    #[error("Failed to decode response JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Forbidden: the user does not have the required roles or access")]
    Forbidden,
    #[error("Not found: the requested site or stream does not exist")]
    NotFound,
    #[error("Unexpected HTTP status code received: {0}")]
    UnexpectedStatus(u16),
    #[error("API request failed after {attempts} attempts")]
    RetriesExhausted { attempts: usize },
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
