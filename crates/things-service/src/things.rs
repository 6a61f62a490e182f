use std::sync::Arc;

use things_core::{Page, PageQuery, Result, Thing, ThingCache, ThingRepository};
use uuid::Uuid;

use crate::TRACING_TARGET_SERVICE;

/// Registry service composing durable storage with the key cache.
///
/// The repository is the source of truth; the cache only ever holds
/// key-to-identifier entries that the repository confirmed at some point.
/// Mutations that retire a key evict its cache entry before the repository
/// commit, so a retired key can never authenticate through a stale entry.
#[derive(Clone)]
pub struct ThingsService {
    repository: Arc<dyn ThingRepository>,
    cache: Arc<dyn ThingCache>,
}

impl ThingsService {
    /// Creates a new service over the given collaborators.
    pub fn new(repository: Arc<dyn ThingRepository>, cache: Arc<dyn ThingCache>) -> Self {
        Self { repository, cache }
    }

    /// Creates the given things for `owner` as one atomic batch.
    ///
    /// Things arriving without an identifier get a sortable UUIDv7; things
    /// arriving without a key get a random UUIDv4. The owner field is set
    /// unconditionally, so a caller cannot create things on behalf of
    /// someone else. Returns the things as persisted.
    #[tracing::instrument(skip_all, fields(owner = owner, count = things.len()))]
    pub async fn create_things(&self, owner: &str, things: Vec<Thing>) -> Result<Vec<Thing>> {
        let things = things
            .into_iter()
            .map(|mut thing| {
                if thing.id.is_empty() {
                    thing.id = Uuid::now_v7().to_string();
                }
                if thing.key.is_empty() {
                    thing.key = Uuid::new_v4().to_string();
                }
                thing.owner = owner.to_owned();
                thing
            })
            .collect();

        let saved = self.repository.save(things).await?;

        for thing in &saved {
            self.warm_cache(&thing.key, &thing.id).await;
        }

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            count = saved.len(),
            "created things",
        );

        Ok(saved)
    }

    /// Retrieves a single thing owned by `owner`.
    pub async fn view_thing(&self, owner: &str, id: &str) -> Result<Thing> {
        self.repository.retrieve_by_id(owner, id).await
    }

    /// Lists things owned by `owner` with pagination and optional filters.
    pub async fn list_things(&self, owner: &str, query: PageQuery) -> Result<Page> {
        self.repository.retrieve_all(owner, query).await
    }

    /// Lists things owned by `owner` by their connectivity to `channel`.
    pub async fn list_things_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> Result<Page> {
        self.repository
            .retrieve_by_channel(owner, channel, offset, limit, connected)
            .await
    }

    /// Replaces the name and metadata of an existing thing.
    #[tracing::instrument(skip_all, fields(owner = %thing.owner, id = %thing.id))]
    pub async fn update_thing(&self, thing: &Thing) -> Result<()> {
        self.repository.update(thing).await
    }

    /// Rotates the key of the thing identified by `(id, owner)`.
    ///
    /// The cache entry for the previous key is evicted before the repository
    /// commit. If eviction fails the rotation is aborted, since committing
    /// first would leave a window where the retired key still authenticates.
    #[tracing::instrument(skip_all, fields(owner = owner, id = id))]
    pub async fn update_key(&self, owner: &str, id: &str, key: &str) -> Result<()> {
        let current = self.repository.retrieve_by_id(owner, id).await?;

        self.cache.remove(&current.key).await?;
        self.repository.update_key(owner, id, key).await?;

        // A concurrent identify can re-cache the retired key between the
        // eviction and the commit; evicting again after the commit closes
        // that window.
        self.evict_retired_key(&current.key).await;

        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            id = id,
            "rotated thing key",
        );

        Ok(())
    }

    /// Deletes the thing matching `(id, owner)`.
    ///
    /// Idempotent: a second delete of the same thing succeeds without
    /// effect. For an existing thing the cached key entry is evicted before
    /// the repository delete, same ordering as key rotation.
    #[tracing::instrument(skip_all, fields(owner = owner, id = id))]
    pub async fn remove_thing(&self, owner: &str, id: &str) -> Result<()> {
        let existing = match self.repository.retrieve_by_id(owner, id).await {
            Ok(thing) => thing,
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err),
        };

        self.cache.remove(&existing.key).await?;
        self.repository.remove(owner, id).await?;

        // Same window as key rotation: an identify racing the delete can
        // re-cache the key after the first eviction.
        self.evict_retired_key(&existing.key).await;
        Ok(())
    }

    /// Resolves a key to the identifier of the thing holding it.
    ///
    /// Serves from the cache when possible; on a miss falls back to the
    /// repository and repopulates the cache on success. A key no thing
    /// holds resolves to not-found.
    #[tracing::instrument(skip_all)]
    pub async fn identify(&self, key: &str) -> Result<String> {
        if let Some(id) = self.cache.id(key).await? {
            return Ok(id);
        }

        let id = self.repository.retrieve_by_key(key).await?;
        self.warm_cache(key, &id).await;

        Ok(id)
    }

    /// Best-effort post-commit eviction of a retired key. The pre-commit
    /// eviction already ran; a failure here only extends a window that
    /// the next eviction or lookup resolves, so it is logged and dropped.
    async fn evict_retired_key(&self, key: &str) {
        if let Err(err) = self.cache.remove(key).await {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                error = %err,
                "failed to evict retired key",
            );
        }
    }

    /// Best-effort cache population. A failed write only costs a future
    /// repository lookup, so it is logged and dropped.
    async fn warm_cache(&self, key: &str, id: &str) {
        if let Err(err) = self.cache.save(key, id).await {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                error = %err,
                "failed to populate key cache",
            );
        }
    }
}

impl std::fmt::Debug for ThingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingsService").finish_non_exhaustive()
    }
}
