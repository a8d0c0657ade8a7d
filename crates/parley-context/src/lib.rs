mod estimator;
mod manager;
mod strategy;
mod summarizer;
mod templates;

pub use estimator::{HeuristicEstimator, TokenEstimator, MESSAGE_OVERHEAD_TOKENS};
pub use manager::{ContextManager, ContextStats};
pub use strategy::{SummaryError, SummaryRecord, Summarizer};
pub use summarizer::LlmSummarizer;
pub use templates::{strip_sentinel, DEFAULT_SUMMARIZATION_PROMPT, SUMMARY_PREFIX, SUMMARY_SENTINEL};
