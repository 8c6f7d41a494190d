/// Error types for datastore access
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Datastore request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Datastore returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid row payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected response shape from {0}")]
    UnexpectedShape(String),

    #[error("No row returned from {0}")]
    NotFound(String),

    #[error("Datastore misconfigured: {0}")]
    Config(String),
}

/// Result type for datastore operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
