pub mod builder;
pub mod client_factory;
pub mod error;
pub mod orchestrator;
mod streaming;

pub use builder::ChatOrchestratorBuilder;
pub use client_factory::ClientFactory;
pub use error::{ChatError, Result};
pub use orchestrator::ChatOrchestrator;

// Re-export the types callers need to drive and observe a chat
pub use parley_types::{
    ChatConfig, ChatConfigUpdate, ChatStatus, ContextPolicyConfig, ContextPolicyUpdate, Message,
    Session, SessionEvent, TurnState,
};
