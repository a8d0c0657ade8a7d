// Endpoint configuration for the OpenAI-compatible client

use serde::{Deserialize, Serialize};

/// Default base URL: a local OpenAI-compatible model server
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";

/// Default completion path, appended to the base URL
pub const DEFAULT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Configuration for an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub base_url: String,
    pub completions_path: String,
    /// Sent as a bearer token when present; local servers usually need none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl OpenAIConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            completions_path: DEFAULT_COMPLETIONS_PATH.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_completions_path(mut self, path: impl Into<String>) -> Self {
        self.completions_path = path.into();
        self
    }

    /// Full URL of the completion endpoint
    pub fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.completions_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
