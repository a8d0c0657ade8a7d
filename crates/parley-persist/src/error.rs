use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl PersistError {
    /// Stored data exists but cannot be parsed
    pub fn is_corrupt(&self) -> bool {
        matches!(self, PersistError::Serialization(_))
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
