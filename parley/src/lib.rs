//! # Parley - streaming chat for OpenAI-compatible endpoints
//!
//! Parley talks to any server that speaks the OpenAI chat completions
//! protocol (LM Studio, llama.cpp, vLLM, OpenAI itself) and provides:
//! - **Streaming replies** written into the conversation as they arrive
//! - **Stop at any time** with the partial reply kept
//! - **Persistent sessions** saved to a JSON file on every change
//! - **Context budgeting** by sliding window or LLM-written summaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let chat = ChatBuilder::new()
//!         .base_url("http://localhost:1234/v1")
//!         .session_file("sessions.json")
//!         .build()?;
//!
//!     let reply = chat.ask("Explain Rust ownership in one line").await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **parley-llm**: OpenAI-compatible transport and SSE decoding
//! - **parley-types**: Messages, sessions, configs, turn states
//! - **parley-persist**: Session store with write-through persistence
//! - **parley-context**: Token estimation, windowing and summarization
//! - **parley-chat**: The turn orchestrator
//!
//! ## Streaming
//!
//! Subscribe to the store to watch a reply grow, and to the orchestrator's
//! status for turn progress:
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn example(chat: Chat) -> Result<()> {
//! let orchestrator = chat.orchestrator();
//! let mut events = orchestrator.store().lock().await.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::MessageUpdated { message_id, .. } = event {
//!             tracing::debug!(%message_id, "reply grew");
//!         }
//!     }
//! });
//!
//! let state = orchestrator.send_message("Hello!").await;
//! println!("{:?}", state);
//! # Ok(())
//! # }
//! ```

// Re-export all public APIs
pub use parley_chat as chat;
pub use parley_context as context;
pub use parley_llm as llm;
pub use parley_persist as persist;
pub use parley_types as types;

// Re-export commonly used types
pub use parley_chat::{ChatError, ChatOrchestrator};
pub use parley_context::{ContextManager, ContextStats};
pub use parley_llm::{ChatClient, OpenAIClient, OpenAIConfig};
pub use parley_persist::{JsonFileStore, SessionStore};
pub use parley_types::{
    ChatConfig, ChatStatus, ContextPolicyConfig, Message, Session, SessionEvent, TurnState,
};

/// High-level builder for a ready-to-use chat
pub mod builder;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{Chat, ChatBuilder};
    pub use crate::types::{
        ChatConfig, ChatStatus, ContextPolicyConfig, Message, SessionEvent, TurnState,
    };
    pub use anyhow::Result;
}
