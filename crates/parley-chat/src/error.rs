use parley_llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Rejected before any state was touched
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Display is the transport's own message (`HTTP error! status: ...`)
    #[error("{0}")]
    Transport(LlmError),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Stream error: {0}")]
    Stream(String),
}

impl ChatError {
    /// Caller-initiated stop; never shown as an error
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}

impl From<LlmError> for ChatError {
    fn from(e: LlmError) -> Self {
        if e.is_cancelled() {
            ChatError::Cancelled
        } else {
            ChatError::Transport(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
