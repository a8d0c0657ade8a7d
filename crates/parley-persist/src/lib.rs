pub mod dbs;
pub mod error;
pub mod store;
pub mod trait_client;

pub use dbs::{JsonFileStore, MemoryStore};
pub use error::{PersistError, Result};
pub use store::SessionStore;
pub use trait_client::PersistentStore;
