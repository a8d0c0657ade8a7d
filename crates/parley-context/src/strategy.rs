use async_trait::async_trait;
use parley_llm::{ChatMessage, LlmError};
use parley_types::Message;
use thiserror::Error;

use crate::templates::SUMMARY_PREFIX;

/// Why a summary could not be produced
///
/// Never escapes [`crate::ContextManager::build_payload`]; every variant
/// falls back to the sliding window.
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("No conversational content to summarize")]
    NoContent,

    #[error("Summarizer returned an empty summary")]
    EmptyOutput,

    #[error("Summary request failed: {0}")]
    Transport(#[from] LlmError),
}

/// A synthesized stand-in for the early part of a conversation
///
/// Only ever injected into an outbound payload, never stored in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub content: String,
}

impl SummaryRecord {
    /// Wrap summary text with the `Previous conversation summary: ` prefix
    pub fn from_summary(summary: &str) -> Self {
        Self {
            content: format!("{}{}", SUMMARY_PREFIX, summary),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::system(self.content.clone())
    }
}

/// Compresses a slice of history into a [`SummaryRecord`]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `max_length` bounds the summary size in tokens
    async fn summarize(
        &self,
        messages: &[Message],
        max_length: usize,
    ) -> Result<SummaryRecord, SummaryError>;
}
