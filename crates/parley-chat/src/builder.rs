use std::sync::Arc;

use parley_context::ContextManager;
use parley_llm::ChatClient;
use parley_persist::SessionStore;
use parley_types::{ChatConfig, ContextPolicyConfig};

use crate::client_factory::ClientFactory;
use crate::error::Result;
use crate::orchestrator::ChatOrchestrator;

/// Builder for constructing a [`ChatOrchestrator`] with optional components
///
/// Without an explicit client, an OpenAI-compatible client is built from the
/// chat config (and rebuilt when the endpoint config changes). Without a
/// store, sessions live in memory only.
pub struct ChatOrchestratorBuilder {
    client: Option<Arc<dyn ChatClient>>,
    store: Option<SessionStore>,
    config: ChatConfig,
    context_policy: ContextPolicyConfig,
}

impl ChatOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            store: None,
            config: ChatConfig::default(),
            context_policy: ContextPolicyConfig::default(),
        }
    }

    /// Use a specific transport instead of building one from the config
    pub fn client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context_policy(mut self, policy: ContextPolicyConfig) -> Self {
        self.context_policy = policy;
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator> {
        ClientFactory::validate_config(&self.config)?;

        let (client, owns_client) = match self.client {
            Some(client) => (client, false),
            None => (ClientFactory::create_client(&self.config)?, true),
        };

        Ok(ChatOrchestrator::from_parts(
            client,
            owns_client,
            self.store.unwrap_or_else(SessionStore::in_memory),
            ContextManager::new(self.context_policy),
            self.config,
        ))
    }
}

impl Default for ChatOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
