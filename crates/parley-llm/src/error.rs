use thiserror::Error;

/// Errors raised by the completion transport
#[derive(Error, Debug)]
pub enum LlmError {
    /// Endpoint answered with a non-2xx status
    #[error("HTTP error! status: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The caller signalled the cancellation handle
    #[error("Request cancelled")]
    Cancelled,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LlmError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LlmError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
