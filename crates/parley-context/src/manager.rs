use std::sync::Arc;

use parley_llm::ChatMessage;
use parley_types::{ContextPolicyConfig, ContextPolicyUpdate, Message};
use serde::{Deserialize, Serialize};

use crate::estimator::{HeuristicEstimator, TokenEstimator, MESSAGE_OVERHEAD_TOKENS};
use crate::strategy::Summarizer;

/// Upper bound on turns kept verbatim next to a summary
const MAX_RECENT_MESSAGES: usize = 8;

/// Budget snapshot of a message history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    pub message_count: usize,
    pub estimated_tokens: usize,
    pub needs_management: bool,
    pub max_messages: usize,
    pub max_tokens: usize,
}

/// Decides what part of a history is sent with the next request
///
/// Everything except [`ContextManager::build_payload`] is pure arithmetic
/// over the policy. `build_payload` may call a [`Summarizer`], and any
/// summarizer failure degrades to a sliding window.
#[derive(Clone)]
pub struct ContextManager {
    config: ContextPolicyConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl ContextManager {
    pub fn new(config: ContextPolicyConfig) -> Self {
        Self {
            config,
            estimator: Arc::new(HeuristicEstimator::new()),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &ContextPolicyConfig {
        &self.config
    }

    /// Merge a partial policy update
    pub fn update_config(&mut self, update: ContextPolicyUpdate) {
        self.config.merge(update);
        tracing::debug!(config = ?self.config, "Context policy updated");
    }

    pub fn set_config(&mut self, config: ContextPolicyConfig) {
        self.config = config;
    }

    // ========================================================================
    // ESTIMATION
    // ========================================================================

    pub fn estimate_tokens(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }

    /// Content estimate plus a fixed overhead per message
    pub fn compute_tokens<'a, I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a Message>,
    {
        messages
            .into_iter()
            .map(|m| self.estimate_tokens(&m.content) + MESSAGE_OVERHEAD_TOKENS)
            .sum()
    }

    /// True when the conversational messages exceed either budget
    pub fn needs_management(&self, messages: &[Message]) -> bool {
        let conversation = || messages.iter().filter(|m| !m.is_system());

        conversation().count() > self.config.max_messages
            || self.compute_tokens(conversation()) > self.config.max_tokens
    }

    pub fn stats(&self, messages: &[Message]) -> ContextStats {
        let conversation = || messages.iter().filter(|m| !m.is_system());

        ContextStats {
            message_count: conversation().count(),
            estimated_tokens: self.compute_tokens(conversation()),
            needs_management: self.needs_management(messages),
            max_messages: self.config.max_messages,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Turns kept verbatim after a summary: `min(8, floor(max_messages * 0.6))`
    pub fn recent_count(&self) -> usize {
        MAX_RECENT_MESSAGES.min(self.config.max_messages * 6 / 10)
    }

    // ========================================================================
    // COMPACTION
    // ========================================================================

    /// Keep every system message plus the newest `max_count` others, in order
    pub fn apply_sliding_window(messages: &[Message], max_count: usize) -> Vec<Message> {
        if messages.len() <= max_count {
            return messages.to_vec();
        }

        let non_system = messages.iter().filter(|m| !m.is_system()).count();
        let skip = non_system.saturating_sub(max_count);

        let mut seen = 0;
        messages
            .iter()
            .filter(|m| {
                if m.is_system() {
                    return true;
                }
                seen += 1;
                seen > skip
            })
            .cloned()
            .collect()
    }

    /// Build the message array for the next completion request
    ///
    /// System messages in `history` are dropped; `system_prompt` always
    /// leads. Within budget the history goes out verbatim. Over budget a
    /// summary of the early turns replaces them when summarization is
    /// enabled and the history is past the threshold; otherwise, or when
    /// summarizing fails, the oldest turns are dropped.
    pub async fn build_payload(
        &self,
        history: &[Message],
        system_prompt: &str,
        summarizer: Option<&dyn Summarizer>,
    ) -> Vec<ChatMessage> {
        let conversation: Vec<Message> = history
            .iter()
            .filter(|m| !m.is_system())
            .cloned()
            .collect();

        let mut payload = vec![ChatMessage::system(system_prompt)];

        if conversation.len() <= self.config.max_messages {
            payload.extend(conversation.iter().map(Message::to_chat_message));
            return payload;
        }

        tracing::info!(
            messages = conversation.len(),
            max_messages = self.config.max_messages,
            threshold = self.config.summary_threshold,
            "Managing context"
        );

        if self.config.enable_summary && conversation.len() > self.config.summary_threshold {
            if let Some(summarizer) = summarizer {
                let recent_count = self.recent_count().min(conversation.len());
                let (early, recent) = conversation.split_at(conversation.len() - recent_count);

                tracing::debug!(
                    early = early.len(),
                    recent = recent.len(),
                    "Summarizing early messages"
                );

                match summarizer.summarize(early, self.config.summary_length).await {
                    Ok(summary) => {
                        payload.push(summary.to_chat_message());
                        payload.extend(recent.iter().map(Message::to_chat_message));
                        return payload;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Summary failed, falling back to sliding window");
                    }
                }
            }
        }

        let windowed = Self::apply_sliding_window(&conversation, self.config.max_messages);
        tracing::debug!(kept = windowed.len(), "Applied sliding window");

        payload.extend(windowed.iter().map(Message::to_chat_message));
        payload
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new(ContextPolicyConfig::default())
    }
}
