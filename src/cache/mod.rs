mod memory;
mod state;

pub use memory::InMemoryStateCache;
pub use state::UserModerationState;

use async_trait::async_trait;

use crate::engine::error::Error;
use crate::events::ModKey;

/// Read-through/write-through hot-state cache over the ledger. The engine
/// must stay correct (just slower) when every call here fails: a `get` error
/// degrades to a ledger read, a `put` error forces invalidation.
#[async_trait]
pub trait StateCache: Send + Sync {
    async fn get(&self, key: ModKey) -> Result<Option<UserModerationState>, Error>;
    async fn put(&self, key: ModKey, state: UserModerationState) -> Result<(), Error>;
    async fn invalidate(&self, key: ModKey) -> Result<(), Error>;
}

/// Cache collaborator absent: every read goes through to the ledger.
pub struct NoopCache;

#[async_trait]
impl StateCache for NoopCache {
    async fn get(&self, _key: ModKey) -> Result<Option<UserModerationState>, Error> {
        Ok(None)
    }

    async fn put(&self, _key: ModKey, _state: UserModerationState) -> Result<(), Error> {
        Ok(())
    }

    async fn invalidate(&self, _key: ModKey) -> Result<(), Error> {
        Ok(())
    }
}
