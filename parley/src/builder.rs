//! High-level builder API for a ready-to-use chat

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::chat::ChatOrchestrator;
use crate::persist::{JsonFileStore, SessionStore};
use crate::types::{ChatConfig, ContextPolicyConfig, TurnState};

/// Builder that wires an endpoint, a session file and a context policy into
/// a [`Chat`]
///
/// # Example
///
/// ```rust,no_run
/// use parley::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let chat = ChatBuilder::new()
///     .base_url("http://localhost:1234/v1")
///     .model("local-model")
///     .session_file("sessions.json")
///     .build()?;
///
/// let reply = chat.ask("Hello!").await?;
/// println!("{}", reply);
/// # Ok(())
/// # }
/// ```
pub struct ChatBuilder {
    config: ChatConfig,
    context_policy: ContextPolicyConfig,
    session_file: Option<PathBuf>,
}

impl Default for ChatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatBuilder {
    /// Local endpoint, in-memory sessions
    pub fn new() -> Self {
        Self {
            config: ChatConfig::default(),
            context_policy: ContextPolicyConfig::default(),
            session_file: None,
        }
    }

    /// Endpoint base URL, e.g. `http://localhost:1234/v1`
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.config.system_message = message.into();
        self
    }

    /// Replace the whole chat config
    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context_policy(mut self, policy: ContextPolicyConfig) -> Self {
        self.context_policy = policy;
        self
    }

    /// Persist sessions to a JSON file (created on first write)
    pub fn session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Build the chat
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the session file's
    /// directory cannot be created.
    pub fn build(self) -> Result<Chat> {
        let store = match self.session_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Opening session file");
                let backend = JsonFileStore::new(path.clone())
                    .with_context(|| format!("Failed to open session file {}", path.display()))?;
                SessionStore::open(Arc::new(backend))
            }
            None => SessionStore::in_memory(),
        };

        let orchestrator = ChatOrchestrator::builder()
            .store(store)
            .config(self.config)
            .context_policy(self.context_policy)
            .build()
            .context("Failed to build chat")?;

        Ok(Chat { orchestrator })
    }
}

/// A configured chat ready to hold conversations
pub struct Chat {
    orchestrator: ChatOrchestrator,
}

impl Chat {
    /// Send a message in the current session and wait for the full reply
    ///
    /// # Example
    /// ```rust,no_run
    /// # use parley::prelude::*;
    /// # async fn example(chat: Chat) -> Result<()> {
    /// let reply = chat.ask("What is 2+2?").await?;
    /// println!("{}", reply);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ask(&self, message: impl AsRef<str>) -> Result<String> {
        match self.orchestrator.send_message(message.as_ref()).await {
            TurnState::Completed => {
                let messages = self.orchestrator.current_messages().await;
                let reply = messages
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(reply)
            }
            TurnState::Idle => bail!("Message is empty"),
            TurnState::Aborted => bail!("Reply was stopped"),
            state => {
                let error = self
                    .orchestrator
                    .error()
                    .unwrap_or_else(|| format!("turn ended as {:?}", state));
                bail!("Chat turn failed: {}", error)
            }
        }
    }

    /// Start a fresh session and make it current
    pub async fn new_session(&self, title: Option<&str>) -> String {
        let store = self.orchestrator.store();
        let mut store = store.lock().await;
        store.create_session(title)
    }

    /// Get the underlying orchestrator for streaming and session control
    pub fn orchestrator(&self) -> &ChatOrchestrator {
        &self.orchestrator
    }
}
