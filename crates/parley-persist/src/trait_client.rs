use parley_types::SessionCollection;

use crate::error::Result;

/// Durable backing for the session collection
///
/// Implementations store the whole snapshot, current pointer included.
/// Calls are synchronous: the store writes through on every mutation.
pub trait PersistentStore: Send + Sync {
    /// Load the last saved snapshot
    ///
    /// `Ok(None)` on first run (nothing saved yet).
    fn load(&self) -> Result<Option<SessionCollection>>;

    /// Replace the saved snapshot
    fn save(&self, collection: &SessionCollection) -> Result<()>;
}
