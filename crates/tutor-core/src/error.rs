use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The embedding service or the vector store it feeds failed.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
