//! The key→identifier lookup accelerator contract.

use async_trait::async_trait;

use crate::Result;

/// An explicitly-invalidated mapping from access key to thing identifier,
/// used to short-circuit [`ThingRepository::retrieve_by_key`].
///
/// The cache is not authoritative: on any disagreement between cache and
/// store, the store wins, and the disagreement is resolved by eviction,
/// never by trusting the stale cache value. It holds no ownership or
/// metadata information.
///
/// [`ThingRepository::retrieve_by_key`]: crate::ThingRepository::retrieve_by_key
#[async_trait]
pub trait ThingCache: Send + Sync {
    /// Inserts or overwrites the cache entry `key → id`.
    ///
    /// Called after a successful cache-miss lookup against the store, or
    /// after creation of a new thing.
    async fn save(&self, key: &str, id: &str) -> Result<()>;

    /// Returns the cached identifier for `key`.
    ///
    /// `Ok(None)` is a cache miss, not a system failure: callers fall back
    /// to the store and repopulate on success.
    async fn id(&self, key: &str) -> Result<Option<String>>;

    /// Evicts the entry for `key`, unconditionally successful even if the
    /// entry is absent.
    async fn remove(&self, key: &str) -> Result<()>;
}
