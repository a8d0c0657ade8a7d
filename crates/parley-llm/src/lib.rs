pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod openai;
pub mod config;
pub mod error;

pub use traits::{
    ChatClient,
    ChatRequest, ChatResponse, ChatOptions,
    ByteStream, TokenUsage,
};

pub use streaming::{ChatStreamChunk, SseDecoder, SseEvent};
pub use buffer_utils::CircularLineBuffer;
pub use openai::OpenAIClient;
pub use config::OpenAIConfig;
pub use error::{LlmError, Result};
pub use types::{ChatMessage, Role};
