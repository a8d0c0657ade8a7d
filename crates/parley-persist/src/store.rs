use std::sync::Arc;

use parley_types::{Message, Role, Session, SessionCollection, SessionEvent};
use tokio::sync::broadcast;

use crate::dbs::MemoryStore;
use crate::trait_client::PersistentStore;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owner of every conversation thread and the current-session pointer
///
/// All mutation goes through these methods. Each mutation writes the whole
/// collection through to the [`PersistentStore`] and then notifies
/// subscribers. Persistence failures are logged and never returned: the
/// in-memory state stays authoritative.
///
/// Once constructed the collection is never empty and the current pointer
/// always names an existing session.
pub struct SessionStore {
    collection: SessionCollection,
    backend: Arc<dyn PersistentStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Load from `backend`
    ///
    /// Corrupt data starts an empty collection; unavailable storage degrades
    /// to an in-memory store. Either way a default session is created if
    /// nothing was loaded.
    pub fn open(backend: Arc<dyn PersistentStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let (collection, backend) = match backend.load() {
            Ok(Some(collection)) => (collection, backend),
            Ok(None) => {
                tracing::debug!("No saved sessions, starting fresh");
                (SessionCollection::default(), backend)
            }
            Err(e) if e.is_corrupt() => {
                tracing::warn!(error = %e, "Saved sessions are corrupt, starting with an empty collection");
                (SessionCollection::default(), backend)
            }
            Err(e) => {
                tracing::error!(error = %e, "Session storage unavailable, continuing in memory only");
                let memory: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());
                (SessionCollection::default(), memory)
            }
        };

        let mut store = Self {
            collection,
            backend,
            events,
        };
        store.initialize();
        store
    }

    /// Store backed by a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStore::new()))
    }

    fn initialize(&mut self) {
        if self.collection.is_empty() {
            self.create_session(None);
            return;
        }

        let before = self.collection.current_session_id.clone();
        self.collection.repair_current();
        if before != self.collection.current_session_id {
            tracing::debug!(
                saved = ?before,
                current = ?self.collection.current_session_id,
                "Saved current session missing, using front session"
            );
        }

        tracing::info!(sessions = self.collection.len(), "Loaded sessions");
    }

    // ========================================================================
    // OBSERVERS & ACCESSORS
    // ========================================================================

    /// Receive an event after every mutation
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// All sessions, most recently created first
    pub fn sessions(&self) -> &[Session] {
        &self.collection.sessions
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.collection.get(id)
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.collection.current_session_id.as_deref()
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.collection.current()
    }

    /// Messages of the current session (empty if none)
    pub fn current_messages(&self) -> &[Message] {
        self.collection
            .current()
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Clone of the whole collection, as persisted
    pub fn snapshot(&self) -> SessionCollection {
        self.collection.clone()
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Insert a new session at the front and make it current
    ///
    /// Without a title the session is named `"New conversation {n}"`, where
    /// `n` is the collection size before insertion plus one.
    pub fn create_session(&mut self, title: Option<&str>) -> String {
        let title = match title {
            Some(t) => t.to_string(),
            None => Session::default_title(self.collection.len() + 1),
        };
        let session = Session::new(title);
        let id = session.id.clone();

        self.collection.sessions.insert(0, session);
        self.collection.current_session_id = Some(id.clone());

        tracing::debug!(session_id = %id, "Created session");
        self.commit(SessionEvent::SessionCreated {
            session_id: id.clone(),
        });
        id
    }

    /// Make `id` current; unknown ids are ignored
    pub fn switch_session(&mut self, id: &str) -> bool {
        if !self.collection.contains(id) {
            tracing::debug!(session_id = %id, "Switch to unknown session ignored");
            return false;
        }

        self.collection.current_session_id = Some(id.to_string());
        self.commit(SessionEvent::SessionSwitched {
            session_id: id.to_string(),
        });
        true
    }

    /// Remove a session
    ///
    /// Deleting the current session moves the pointer to the new front
    /// session, or to a freshly created one if none remain.
    pub fn delete_session(&mut self, id: &str) -> bool {
        let Some(index) = self.collection.sessions.iter().position(|s| s.id == id) else {
            return false;
        };

        self.collection.sessions.remove(index);
        tracing::debug!(session_id = %id, "Deleted session");

        if self.collection.current_session_id.as_deref() == Some(id) {
            if self.collection.is_empty() {
                // create_session persists and picks the new current
                self.create_session(None);
            } else {
                self.collection.current_session_id =
                    self.collection.sessions.first().map(|s| s.id.clone());
            }
        }

        let current_session_id = self
            .collection
            .current_session_id
            .clone()
            .unwrap_or_default();
        self.commit(SessionEvent::SessionDeleted {
            session_id: id.to_string(),
            current_session_id,
        });
        true
    }

    pub fn update_session_title(&mut self, id: &str, title: impl Into<String>) -> bool {
        let Some(session) = self.collection.get_mut(id) else {
            return false;
        };

        let title = title.into();
        session.title = title.clone();
        session.touch();

        self.commit(SessionEvent::SessionRenamed {
            session_id: id.to_string(),
            title,
        });
        true
    }

    /// Remove every message of the current session
    pub fn clear_current_session(&mut self) -> bool {
        let Some(session) = self.collection.current_mut() else {
            return false;
        };

        session.messages.clear();
        session.touch();
        let session_id = session.id.clone();

        self.commit(SessionEvent::SessionCleared { session_id });
        true
    }

    // ========================================================================
    // MESSAGES
    // ========================================================================

    /// Append to the current session
    ///
    /// A user message arriving while the title is still the default
    /// placeholder renames the session after the message content.
    pub fn append_message(&mut self, message: Message) -> bool {
        match self.collection.current_session_id.clone() {
            Some(session_id) => self.append_message_to(&session_id, message),
            None => false,
        }
    }

    /// Append to a specific session (same title rule as [`Self::append_message`])
    pub fn append_message_to(&mut self, session_id: &str, message: Message) -> bool {
        let Some(session) = self.collection.get_mut(session_id) else {
            return false;
        };

        let derived_title = (message.role == Role::User && session.has_default_title())
            .then(|| Session::derive_title(&message.content));
        let message_id = message.id.clone();

        session.messages.push(message);
        session.touch();

        self.commit(SessionEvent::MessageAppended {
            session_id: session_id.to_string(),
            message_id,
        });

        if let Some(title) = derived_title {
            self.update_session_title(session_id, title);
        }
        true
    }

    /// Replace the content of the current session's last message
    ///
    /// Takes the full accumulated content, not a delta.
    pub fn update_last_message_content(&mut self, content: impl Into<String>) -> bool {
        let Some(session) = self.collection.current_mut() else {
            return false;
        };
        let Some(message_id) = session.last_message().map(|m| m.id.clone()) else {
            return false;
        };
        let session_id = session.id.clone();

        self.update_message_content(&session_id, &message_id, content)
    }

    /// Replace the content of one message, wherever it lives
    pub fn update_message_content(
        &mut self,
        session_id: &str,
        message_id: &str,
        content: impl Into<String>,
    ) -> bool {
        let Some(session) = self.collection.get_mut(session_id) else {
            return false;
        };
        let Some(message) = session.message_mut(message_id) else {
            return false;
        };

        message.content = content.into();
        session.touch();

        self.commit(SessionEvent::MessageUpdated {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
        });
        true
    }

    /// Edit a message of the current session in place
    pub fn edit_message(&mut self, message_id: &str, new_content: impl Into<String>) -> bool {
        match self.collection.current_session_id.clone() {
            Some(session_id) => self.update_message_content(&session_id, message_id, new_content),
            None => false,
        }
    }

    /// Remove a message of the current session by id
    pub fn remove_message(&mut self, message_id: &str) -> bool {
        match self.collection.current_session_id.clone() {
            Some(session_id) => self.remove_message_in(&session_id, message_id),
            None => false,
        }
    }

    /// Remove a message from a specific session
    pub fn remove_message_in(&mut self, session_id: &str, message_id: &str) -> bool {
        let Some(session) = self.collection.get_mut(session_id) else {
            return false;
        };
        let Some(index) = session.messages.iter().position(|m| m.id == message_id) else {
            return false;
        };

        session.messages.remove(index);
        session.touch();

        self.commit(SessionEvent::MessageRemoved {
            session_id: session_id.to_string(),
            message_id: message_id.to_string(),
        });
        true
    }

    /// Pop the current session's last message
    pub fn remove_last_message(&mut self) -> Option<Message> {
        let session = self.collection.current_mut()?;
        let message = session.messages.pop()?;
        session.touch();
        let session_id = session.id.clone();

        self.commit(SessionEvent::MessageRemoved {
            session_id,
            message_id: message.id.clone(),
        });
        Some(message)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write through, then notify
    fn commit(&self, event: SessionEvent) {
        if let Err(e) = self.backend.save(&self.collection) {
            tracing::error!(error = %e, "Failed to persist sessions");
        }

        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
