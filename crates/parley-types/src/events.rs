use serde::{Deserialize, Serialize};

/// Change notification emitted by the session store after each mutation
///
/// Events carry ids only; observers read the new state back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionCreated {
        session_id: String,
    },

    SessionSwitched {
        session_id: String,
    },

    /// `current_session_id` is where the pointer moved afterwards
    SessionDeleted {
        session_id: String,
        current_session_id: String,
    },

    SessionRenamed {
        session_id: String,
        title: String,
    },

    MessageAppended {
        session_id: String,
        message_id: String,
    },

    /// Content replaced in place (edits and streamed deltas)
    MessageUpdated {
        session_id: String,
        message_id: String,
    },

    MessageRemoved {
        session_id: String,
        message_id: String,
    },

    SessionCleared {
        session_id: String,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::SessionCreated { session_id }
            | SessionEvent::SessionSwitched { session_id }
            | SessionEvent::SessionDeleted { session_id, .. }
            | SessionEvent::SessionRenamed { session_id, .. }
            | SessionEvent::MessageAppended { session_id, .. }
            | SessionEvent::MessageUpdated { session_id, .. }
            | SessionEvent::MessageRemoved { session_id, .. }
            | SessionEvent::SessionCleared { session_id } => session_id,
        }
    }
}
