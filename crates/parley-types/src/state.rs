use serde::{Deserialize, Serialize};

/// Lifecycle of a single chat turn
///
/// `Idle -> Sending -> Streaming -> {Completed | Aborted | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    /// Request issued, waiting for response headers
    Sending,
    Streaming,
    Completed,
    /// Stopped by the caller; partial content is kept
    Aborted,
    /// Transport or stream error; the placeholder was rolled back
    Failed,
}

impl TurnState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TurnState::Sending | TurnState::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Completed | TurnState::Aborted | TurnState::Failed
        )
    }
}

/// What a UI needs to render the chat's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStatus {
    pub state: TurnState,
    pub is_loading: bool,
    /// Most recent failure, cleared when a new turn starts
    pub error: Option<String>,
}

impl ChatStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading(state: TurnState) -> Self {
        Self {
            state,
            is_loading: true,
            error: None,
        }
    }

    pub fn finished(state: TurnState, error: Option<String>) -> Self {
        Self {
            state,
            is_loading: false,
            error,
        }
    }
}
