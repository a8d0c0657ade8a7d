use std::sync::Arc;

use async_trait::async_trait;
use parley_llm::{ChatClient, ChatMessage, ChatOptions, ChatRequest, Role};
use parley_types::Message;

use crate::strategy::{SummaryError, SummaryRecord, Summarizer};
use crate::templates::{strip_sentinel, DEFAULT_SUMMARIZATION_PROMPT};

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Summarizes through a non-streaming completion on the chat endpoint
pub struct LlmSummarizer {
    client: Arc<dyn ChatClient>,
    model: String,
    prompt: String,
    temperature: f32,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: DEFAULT_SUMMARIZATION_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// One line per message: `User: ...` / `Assistant: ...`
    fn render_transcript(messages: &[&Message]) -> String {
        messages
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::User => "User",
                    _ => "Assistant",
                };
                format!("{}: {}", speaker, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        messages: &[Message],
        max_length: usize,
    ) -> Result<SummaryRecord, SummaryError> {
        let valid: Vec<&Message> = messages
            .iter()
            .filter(|m| !m.is_system() && !m.is_blank())
            .collect();

        if valid.is_empty() {
            return Err(SummaryError::NoContent);
        }

        let transcript = Self::render_transcript(&valid);
        tracing::debug!(
            messages = valid.len(),
            model = %self.model,
            "Requesting conversation summary"
        );

        let mut options = ChatOptions::new().temperature(self.temperature);
        if max_length > 0 {
            options = options.max_tokens(i64::try_from(max_length).unwrap_or(i64::MAX));
        }

        let request = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(self.prompt.clone()),
                ChatMessage::user(transcript),
            ],
        )
        .with_options(options);

        let response = self.client.chat(request).await?;
        let raw = response.content.unwrap_or_default();
        let summary = strip_sentinel(&raw);

        if summary.is_empty() {
            return Err(SummaryError::EmptyOutput);
        }

        Ok(SummaryRecord::from_summary(summary))
    }
}
