use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use things_core::{
    ChannelConnections, Error, Metadata, Page, PageQuery, Result, Thing, ThingRepository,
};
use tokio::sync::RwLock;

use super::MemoryChannelConnections;

/// In-memory implementation of [`ThingRepository`].
///
/// Things are stored in a `BTreeMap` keyed by identifier, so listings come
/// back in identifier order without extra sorting. All mutating operations
/// take the write lock for their full duration, which gives batch saves the
/// same all-or-nothing visibility as a database transaction.
pub struct MemoryThingRepository {
    things: RwLock<BTreeMap<String, Thing>>,
    channels: Arc<dyn ChannelConnections>,
}

impl MemoryThingRepository {
    /// Creates an empty repository with no channel connections.
    pub fn new() -> Self {
        Self::with_channels(Arc::new(MemoryChannelConnections::new()))
    }

    /// Creates an empty repository backed by the given connectivity
    /// collaborator.
    pub fn with_channels(channels: Arc<dyn ChannelConnections>) -> Self {
        Self {
            things: RwLock::new(BTreeMap::new()),
            channels,
        }
    }

    /// Returns the number of stored things across all owners.
    pub async fn len(&self) -> usize {
        self.things.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.things.read().await.is_empty()
    }

    fn paginate(things: Vec<Thing>, offset: u64, limit: u64) -> Page {
        let total = things.len() as u64;
        let page = things
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Page::new(page, offset, limit, total)
    }
}

impl Default for MemoryThingRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryThingRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryThingRepository").finish_non_exhaustive()
    }
}

fn matches_name(thing: &Thing, name: &str) -> bool {
    thing.name.to_lowercase().contains(&name.to_lowercase())
}

fn matches_metadata(thing: &Thing, metadata: &Metadata) -> bool {
    metadata
        .iter()
        .all(|(key, value)| thing.metadata.get(key) == Some(value))
}

#[async_trait]
impl ThingRepository for MemoryThingRepository {
    async fn save(&self, things: Vec<Thing>) -> Result<Vec<Thing>> {
        for thing in &things {
            thing.validate()?;
        }

        let mut stored = self.things.write().await;

        // Reject the whole batch before touching the map, including
        // duplicates within the batch itself.
        for (position, thing) in things.iter().enumerate() {
            let duplicate_in_batch = things[..position]
                .iter()
                .any(|other| other.id == thing.id || other.key == thing.key);
            let duplicate_stored = stored.contains_key(&thing.id)
                || stored.values().any(|other| other.key == thing.key);

            if duplicate_in_batch || duplicate_stored {
                return Err(Error::conflict()
                    .with_message(format!("thing {} violates a uniqueness constraint", thing.id)));
            }
        }

        for thing in &things {
            stored.insert(thing.id.clone(), thing.clone());
        }

        Ok(things)
    }

    async fn update(&self, thing: &Thing) -> Result<()> {
        let mut stored = self.things.write().await;
        match stored.get_mut(&thing.id) {
            Some(existing) if existing.owner == thing.owner => {
                existing.name = thing.name.clone();
                existing.metadata = thing.metadata.clone();
                Ok(())
            }
            _ => Err(Error::not_found()),
        }
    }

    async fn update_key(&self, owner: &str, id: &str, key: &str) -> Result<()> {
        let mut stored = self.things.write().await;

        let key_taken = stored
            .values()
            .any(|other| other.key == key && other.id != id);
        if key_taken {
            return Err(Error::conflict().with_message("key is already held by another thing"));
        }

        match stored.get_mut(id) {
            Some(existing) if existing.owner == owner => {
                existing.key = key.to_owned();
                Ok(())
            }
            _ => Err(Error::not_found()),
        }
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> Result<Thing> {
        let stored = self.things.read().await;
        match stored.get(id) {
            Some(thing) if thing.owner == owner => Ok(thing.clone()),
            _ => Err(Error::not_found()),
        }
    }

    async fn retrieve_by_key(&self, key: &str) -> Result<String> {
        let stored = self.things.read().await;
        stored
            .values()
            .find(|thing| thing.key == key)
            .map(|thing| thing.id.clone())
            .ok_or_else(Error::not_found)
    }

    async fn retrieve_all(&self, owner: &str, query: PageQuery) -> Result<Page> {
        let stored = self.things.read().await;
        let matching = stored
            .values()
            .filter(|thing| thing.owner == owner)
            .filter(|thing| query.name.as_deref().is_none_or(|name| matches_name(thing, name)))
            .filter(|thing| {
                query
                    .metadata
                    .as_ref()
                    .is_none_or(|metadata| matches_metadata(thing, metadata))
            })
            .cloned()
            .collect();

        Ok(Self::paginate(matching, query.offset, query.effective_limit()))
    }

    async fn retrieve_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> Result<Page> {
        let connected_ids = self
            .channels
            .connected_things(owner, channel)
            .await
            .map_err(|err| {
                Error::entity_connected()
                    .with_message("could not determine channel connectivity")
                    .with_source(err)
            })?;

        let stored = self.things.read().await;
        let matching = stored
            .values()
            .filter(|thing| thing.owner == owner)
            .filter(|thing| connected_ids.contains(&thing.id) == connected)
            .cloned()
            .collect();

        Ok(Self::paginate(matching, offset, limit))
    }

    async fn remove(&self, owner: &str, id: &str) -> Result<()> {
        let mut stored = self.things.write().await;
        if stored.get(id).is_some_and(|thing| thing.owner == owner) {
            stored.remove(id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use things_core::{ErrorKind, Metadata, PageQuery, Thing, ThingRepository};

    use super::MemoryThingRepository;

    fn sample(id: &str, owner: &str, key: &str) -> Thing {
        Thing::new(id, owner, key)
    }

    fn metadata(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn save_rejects_duplicate_key_in_batch() {
        let repo = MemoryThingRepository::new();
        let batch = vec![sample("t1", "u1", "k1"), sample("t2", "u1", "k1")];

        let error = repo.save(batch).await.unwrap_err();
        assert!(error.is_conflict());
        assert!(repo.is_empty().await, "rejected batch must not persist");
    }

    #[tokio::test]
    async fn save_rejects_batch_colliding_with_stored_thing() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        let batch = vec![sample("t2", "u1", "k2"), sample("t3", "u1", "k1")];
        let error = repo.save(batch).await.unwrap_err();
        assert!(error.is_conflict());
        assert_eq!(repo.len().await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn save_rejects_malformed_thing() {
        let repo = MemoryThingRepository::new();
        let error = repo.save(vec![sample("", "u1", "k1")]).await.unwrap_err();
        assert!(error.is_malformed_entity());
    }

    #[tokio::test]
    async fn update_replaces_name_and_metadata_only() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        let update = sample("t1", "u1", "ignored-key")
            .with_name("sensor")
            .with_metadata(metadata(&[("site", json!("lab"))]));
        repo.update(&update).await?;

        let stored = repo.retrieve_by_id("u1", "t1").await?;
        assert_eq!(stored.name, "sensor");
        assert_eq!(stored.metadata.get("site"), Some(&json!("lab")));
        assert_eq!(stored.key, "k1", "update must not touch the key");

        Ok(())
    }

    #[tokio::test]
    async fn update_is_owner_scoped() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        let foreign = sample("t1", "u2", "k9").with_name("hijack");
        let error = repo.update(&foreign).await.unwrap_err();
        assert!(error.is_not_found());

        Ok(())
    }

    #[tokio::test]
    async fn update_key_enforces_uniqueness() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1"), sample("t2", "u1", "k2")])
            .await?;

        let error = repo.update_key("u1", "t2", "k1").await.unwrap_err();
        assert!(error.is_conflict());

        repo.update_key("u1", "t2", "k3").await?;
        assert_eq!(repo.retrieve_by_key("k3").await?, "t2");
        let error = repo.retrieve_by_key("k2").await.unwrap_err();
        assert!(error.is_not_found());

        Ok(())
    }

    #[tokio::test]
    async fn retrieve_by_key_ignores_owner() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        assert_eq!(repo.retrieve_by_key("k1").await?, "t1");

        Ok(())
    }

    #[tokio::test]
    async fn retrieve_all_filters_and_counts() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![
            sample("t1", "u1", "k1")
                .with_name("Thermostat")
                .with_metadata(metadata(&[("site", json!("lab"))])),
            sample("t2", "u1", "k2").with_name("thermometer"),
            sample("t3", "u1", "k3").with_name("camera"),
            sample("t4", "u2", "k4").with_name("thermostat"),
        ])
        .await?;

        let page = repo
            .retrieve_all("u1", PageQuery::new(0, 10).with_name("therm"))
            .await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.things.len(), 2);

        let page = repo
            .retrieve_all(
                "u1",
                PageQuery::new(0, 10).with_metadata(metadata(&[("site", json!("lab"))])),
            )
            .await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.things[0].id, "t1");

        Ok(())
    }

    #[tokio::test]
    async fn retrieve_all_total_is_limit_independent() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(
            (1..=5)
                .map(|n| sample(&format!("t{n}"), "u1", &format!("k{n}")))
                .collect(),
        )
        .await?;

        let page = repo.retrieve_all("u1", PageQuery::new(2, 2)).await?;
        assert_eq!(page.total, 5);
        assert_eq!(page.things.len(), 2);
        assert_eq!(page.things[0].id, "t3");
        assert!(page.has_more());

        Ok(())
    }

    #[tokio::test]
    async fn tail_page_is_shorter_than_its_limit() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(
            (1..=5)
                .map(|n| sample(&format!("t{n}"), "u1", &format!("k{n}")))
                .collect(),
        )
        .await?;

        let page = repo.retrieve_all("u1", PageQuery::new(4, 2)).await?;
        assert_eq!(page.things.len(), 1);
        assert_eq!(page.things[0].id, "t5");
        assert_eq!(page.total, 5);
        assert!(!page.has_more());

        Ok(())
    }

    #[tokio::test]
    async fn remove_is_idempotent() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        repo.remove("u1", "t1").await?;
        repo.remove("u1", "t1").await?;
        assert!(repo.is_empty().await);

        Ok(())
    }

    #[tokio::test]
    async fn remove_is_owner_scoped() -> things_core::Result<()> {
        let repo = MemoryThingRepository::new();
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        repo.remove("u2", "t1").await?;
        assert_eq!(repo.len().await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn retrieve_by_channel_splits_on_connectivity() -> things_core::Result<()> {
        use std::sync::Arc;

        use super::MemoryChannelConnections;

        let channels = Arc::new(MemoryChannelConnections::new());
        let repo = MemoryThingRepository::with_channels(channels.clone());
        repo.save(vec![
            sample("t1", "u1", "k1"),
            sample("t2", "u1", "k2"),
            sample("t3", "u1", "k3"),
        ])
        .await?;
        channels.connect("u1", "c1", "t1").await;
        channels.connect("u1", "c1", "t3").await;

        let page = repo.retrieve_by_channel("u1", "c1", 0, 10, true).await?;
        assert_eq!(page.total, 2);

        let page = repo.retrieve_by_channel("u1", "c1", 0, 10, false).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.things[0].id, "t2");

        Ok(())
    }

    #[tokio::test]
    async fn retrieve_by_channel_surfaces_collaborator_failure() -> things_core::Result<()> {
        use std::sync::Arc;

        use super::super::FailingChannelConnections;

        let repo = MemoryThingRepository::with_channels(Arc::new(FailingChannelConnections::new()));
        repo.save(vec![sample("t1", "u1", "k1")]).await?;

        let error = repo
            .retrieve_by_channel("u1", "c1", 0, 10, true)
            .await
            .unwrap_err();
        assert!(error.is_kind(ErrorKind::EntityConnected));

        Ok(())
    }

    #[tokio::test]
    async fn retrieve_by_id_not_found() {
        let repo = MemoryThingRepository::new();
        let error = repo.retrieve_by_id("u1", "missing").await.unwrap_err();
        assert!(error.is_kind(ErrorKind::NotFound));
    }
}
