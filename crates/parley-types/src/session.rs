use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Prefix of auto-generated session titles (`"New conversation 3"`)
pub const DEFAULT_TITLE_PREFIX: &str = "New conversation";

/// Titles derived from a first user message keep at most this many characters
pub const TITLE_MAX_CHARS: usize = 20;

/// A conversation thread: ordered messages plus metadata
///
/// `messages` is only ever appended to, edited in place or spliced; it is
/// never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `"New conversation {n}"`
    pub fn default_title(n: usize) -> String {
        format!("{} {}", DEFAULT_TITLE_PREFIX, n)
    }

    /// True while the title is still the auto-generated placeholder
    pub fn has_default_title(&self) -> bool {
        self.title
            .strip_prefix(DEFAULT_TITLE_PREFIX)
            .and_then(|rest| rest.strip_prefix(' '))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    }

    /// Title derived from message content: first 20 characters, `...` if cut
    pub fn derive_title(content: &str) -> String {
        if content.chars().count() > TITLE_MAX_CHARS {
            let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", head)
        } else {
            content.to_string()
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Bump `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Every session plus the pointer to the current one
///
/// Sessions are ordered most-recently-created first. This is also the
/// persisted snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCollection {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub current_session_id: Option<String>,
}

impl SessionCollection {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn current(&self) -> Option<&Session> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        let id = self.current_session_id.clone()?;
        self.get_mut(&id)
    }

    /// Point `current_session_id` at an existing session: keep it if it
    /// still exists, otherwise fall back to the front session (or none).
    pub fn repair_current(&mut self) {
        let valid = self
            .current_session_id
            .as_deref()
            .is_some_and(|id| self.contains(id));

        if !valid {
            self.current_session_id = self.sessions.first().map(|s| s.id.clone());
        }
    }
}
