use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to persist record: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("test not found: {0}")]
    NotFound(String),

    #[error("invalid test id: {0:?}")]
    InvalidId(String),
}
