pub mod config;
pub mod events;
pub mod message;
pub mod session;
pub mod state;

pub use config::{ChatConfig, ChatConfigUpdate, ContextPolicyConfig, ContextPolicyUpdate};
pub use events::SessionEvent;
pub use message::Message;
pub use session::{Session, SessionCollection, DEFAULT_TITLE_PREFIX, TITLE_MAX_CHARS};
pub use state::{ChatStatus, TurnState};

pub use parley_llm::{ChatMessage, Role};
