use parley_llm::{ChatOptions, OpenAIConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "local-model";
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a friendly and helpful AI assistant.";

// ============================================================================
// CONTEXT POLICY
// ============================================================================

/// Budget policy used to compact history before a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextPolicyConfig {
    /// Conversational (non-system) messages allowed before compaction;
    /// 0 means always compact
    pub max_messages: usize,
    /// Estimated token budget
    pub max_tokens: usize,
    /// Conversational message count above which summarization is attempted
    pub summary_threshold: usize,
    pub enable_summary: bool,
    /// Upper bound on the summary request's `max_tokens`
    pub summary_length: usize,
}

impl Default for ContextPolicyConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            max_tokens: 30000,
            summary_threshold: 10,
            enable_summary: true,
            summary_length: 3000,
        }
    }
}

impl ContextPolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_summary_threshold(mut self, threshold: usize) -> Self {
        self.summary_threshold = threshold;
        self
    }

    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.enable_summary = enabled;
        self
    }

    pub fn with_summary_length(mut self, length: usize) -> Self {
        self.summary_length = length;
        self
    }

    /// Apply every field set in `update`, leaving the others untouched
    pub fn merge(&mut self, update: ContextPolicyUpdate) {
        if let Some(v) = update.max_messages {
            self.max_messages = v;
        }
        if let Some(v) = update.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = update.summary_threshold {
            self.summary_threshold = v;
        }
        if let Some(v) = update.enable_summary {
            self.enable_summary = v;
        }
        if let Some(v) = update.summary_length {
            self.summary_length = v;
        }
    }
}

/// Partial update for [`ContextPolicyConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextPolicyUpdate {
    pub max_messages: Option<usize>,
    pub max_tokens: Option<usize>,
    pub summary_threshold: Option<usize>,
    pub enable_summary: Option<bool>,
    pub summary_length: Option<usize>,
}

// ============================================================================
// CHAT
// ============================================================================

/// Endpoint and generation settings for chat turns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub completions_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// `-1` lets the server decide
    pub max_tokens: i64,
    pub system_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: parley_llm::config::DEFAULT_BASE_URL.to_string(),
            completions_path: parley_llm::config::DEFAULT_COMPLETIONS_PATH.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: -1,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
        }
    }
}

impl ChatConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, max: i64) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    /// Merge a partial update field by field
    pub fn update(&mut self, update: ChatConfigUpdate) {
        if let Some(v) = update.base_url {
            self.base_url = v;
        }
        if let Some(v) = update.completions_path {
            self.completions_path = v;
        }
        if let Some(v) = update.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = update.model {
            self.model = v;
        }
        if let Some(v) = update.temperature {
            self.temperature = v;
        }
        if let Some(v) = update.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = update.system_message {
            self.system_message = v;
        }
    }

    /// Transport settings for [`parley_llm::OpenAIClient`]
    pub fn openai_config(&self) -> OpenAIConfig {
        let config = OpenAIConfig::new(self.base_url.clone())
            .with_completions_path(self.completions_path.clone());
        match &self.api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }

    /// Generation options for a streamed chat turn
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions::new()
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
    }
}

/// Partial update for [`ChatConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfigUpdate {
    pub base_url: Option<String>,
    pub completions_path: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i64>,
    pub system_message: Option<String>,
}
