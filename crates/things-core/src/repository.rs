//! The durable persistence contract for thing records.

use async_trait::async_trait;

use crate::{Page, PageQuery, Result, Thing};

/// Authoritative persistence for thing records, scoped by owner for all
/// read/write operations except creation.
///
/// Implementations must tolerate concurrent calls without corrupting shared
/// state. Uniqueness of identifiers and keys is enforced by the backing
/// medium itself (unique indexes or equivalent transactional checks), never
/// solely by application-level pre-checks.
#[async_trait]
pub trait ThingRepository: Send + Sync {
    /// Persists one or more things as a single all-or-nothing transaction.
    ///
    /// If any thing fails validation or violates a uniqueness constraint,
    /// the entire batch is rejected and nothing is persisted. A concurrent
    /// reader never observes a partially saved batch.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::MalformedEntity`] if a thing's required fields are
    ///   empty.
    /// - [`ErrorKind::Conflict`] if a duplicate identifier or key is
    ///   detected.
    ///
    /// [`ErrorKind::MalformedEntity`]: crate::ErrorKind::MalformedEntity
    /// [`ErrorKind::Conflict`]: crate::ErrorKind::Conflict
    async fn save(&self, things: Vec<Thing>) -> Result<Vec<Thing>>;

    /// Replaces the name and metadata of the thing matching `(id, owner)`.
    ///
    /// The key, identifier, and owner are never touched by this operation.
    /// Fails with not-found if no such thing exists for that owner.
    async fn update(&self, thing: &Thing) -> Result<()>;

    /// Rotates the key of the thing identified by `(id, owner)`.
    ///
    /// Fails with conflict if the new key collides with another thing's key
    /// and with not-found if the `(id, owner)` pair does not exist. Callers
    /// composing a cache must invalidate the entry for the previous key no
    /// later than this commit.
    async fn update_key(&self, owner: &str, id: &str, key: &str) -> Result<()>;

    /// Retrieves the thing with the given identifier, owned by `owner`.
    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Thing>;

    /// Returns the identifier of the thing currently holding `key`.
    ///
    /// Not owner-scoped: keys authenticate things before the owner is
    /// known. Fails with not-found if no thing holds the key.
    async fn retrieve_by_key(&self, key: &str) -> Result<String>;

    /// Retrieves a page of things owned by `owner`.
    ///
    /// Honors offset/limit semantics and the query's optional name and
    /// metadata filters; the reported total is unaffected by the limit.
    /// Fails with a metadata-scan error if stored metadata cannot be
    /// decoded.
    async fn retrieve_all(&self, owner: &str, query: PageQuery) -> Result<Page>;

    /// Retrieves a page of things owned by `owner`, filtered by whether
    /// each thing is connected (`connected = true`) or explicitly not
    /// connected to the given channel.
    ///
    /// Fails with a connection-check error if the connection collaborator
    /// cannot be consulted.
    async fn retrieve_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> Result<Page>;

    /// Deletes the thing matching `(id, owner)`.
    ///
    /// Idempotent: removing a non-existent thing is a no-op success, since
    /// the end state (absence) is already satisfied.
    async fn remove(&self, owner: &str, id: &str) -> Result<()>;
}
