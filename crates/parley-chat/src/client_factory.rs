use std::sync::Arc;

use parley_llm::{ChatClient, OpenAIClient};
use parley_types::ChatConfig;

use crate::error::{ChatError, Result};

/// Builds transport clients from chat configuration
pub struct ClientFactory;

impl ClientFactory {
    /// OpenAI-compatible client for the configured endpoint
    pub fn create_client(config: &ChatConfig) -> Result<Arc<dyn ChatClient>> {
        let client = OpenAIClient::new(config.openai_config())?;
        tracing::debug!(url = %config.openai_config().completions_url(), "Created chat client");
        Ok(Arc::new(client))
    }

    /// True when switching from `old` to `new` needs a new client
    pub fn endpoint_changed(old: &ChatConfig, new: &ChatConfig) -> bool {
        old.base_url != new.base_url
            || old.completions_path != new.completions_path
            || old.api_key != new.api_key
    }

    pub fn validate_config(config: &ChatConfig) -> Result<()> {
        if config.base_url.trim().is_empty() {
            return Err(ChatError::Validation("base_url is empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(ChatError::Validation("model is empty".to_string()));
        }
        Ok(())
    }
}
