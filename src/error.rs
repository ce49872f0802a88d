use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("embedding backend error: {0}")]
    Embedding(String),

    #[error("corrupt index artifact: {0}")]
    CorruptArtifact(String),

    #[error("an index rebuild is already in progress")]
    RebuildInProgress,

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// True when the error is a caller mistake rather than a system fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
