//! Thing repository backed by the things table.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use things_core::{
    ChannelConnections, Page, PageQuery, Thing, ThingRepository,
};

use crate::model::{ThingRecord, UpdateThing};
use crate::{PgClient, PgError, PgResult, schema};

/// Low-level query functions for thing rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThingQueries;

impl ThingQueries {
    /// Inserts a batch of thing rows one by one.
    ///
    /// Callers wrap this in a transaction ([`PgConn::transaction`]) so that
    /// a failing insert, including a unique-constraint violation on the
    /// identifier or key, rolls back the whole batch.
    ///
    /// [`PgConn::transaction`]: crate::PgConn::transaction
    pub async fn insert_things(
        conn: &mut AsyncPgConnection,
        records: Vec<ThingRecord>,
    ) -> PgResult<Vec<ThingRecord>> {
        use schema::things;

        let mut saved = Vec::with_capacity(records.len());
        for record in records {
            let row = diesel::insert_into(things::table)
                .values(&record)
                .returning(ThingRecord::as_returning())
                .get_result(conn)
                .await?;
            saved.push(row);
        }
        Ok(saved)
    }

    /// Replaces the name and metadata of the thing matching `(id, owner)`.
    ///
    /// Returns the number of rows touched; zero means no such thing exists
    /// for that owner.
    pub async fn update_thing(
        conn: &mut AsyncPgConnection,
        owner: &str,
        id: &str,
        changes: UpdateThing,
    ) -> PgResult<usize> {
        use schema::things::{self, dsl};

        diesel::update(
            things::table
                .filter(dsl::id.eq(id))
                .filter(dsl::owner.eq(owner)),
        )
        .set(&changes)
        .execute(conn)
        .await
        .map_err(PgError::from)
    }

    /// Rotates the key of the thing matching `(id, owner)`.
    ///
    /// Returns the number of rows touched. A collision with another thing's
    /// key trips the unique index and surfaces as a query error.
    pub async fn update_thing_key(
        conn: &mut AsyncPgConnection,
        owner: &str,
        id: &str,
        key: &str,
    ) -> PgResult<usize> {
        use schema::things::{self, dsl};

        diesel::update(
            things::table
                .filter(dsl::id.eq(id))
                .filter(dsl::owner.eq(owner)),
        )
        .set(dsl::key.eq(key))
        .execute(conn)
        .await
        .map_err(PgError::from)
    }

    /// Finds a thing by its identifier, scoped to the owner.
    pub async fn find_thing_by_id(
        conn: &mut AsyncPgConnection,
        owner: &str,
        id: &str,
    ) -> PgResult<Option<ThingRecord>> {
        use schema::things::{self, dsl};

        things::table
            .filter(dsl::id.eq(id))
            .filter(dsl::owner.eq(owner))
            .select(ThingRecord::as_select())
            .first(conn)
            .await
            .optional()
            .map_err(PgError::from)
    }

    /// Finds the identifier of the thing currently holding `key`.
    ///
    /// Not owner-scoped: keys authenticate things before the owner is known.
    pub async fn find_id_by_key(
        conn: &mut AsyncPgConnection,
        key: &str,
    ) -> PgResult<Option<String>> {
        use schema::things::{self, dsl};

        things::table
            .filter(dsl::key.eq(key))
            .select(dsl::id)
            .first(conn)
            .await
            .optional()
            .map_err(PgError::from)
    }

    /// Lists an owner's things with pagination and the query's optional
    /// name/metadata filters, together with the filtered total count.
    pub async fn list_things(
        conn: &mut AsyncPgConnection,
        owner: &str,
        query: &PageQuery,
    ) -> PgResult<(Vec<ThingRecord>, i64)> {
        use schema::things::{self, dsl};

        let limit = clamp_to_i64(query.effective_limit());
        let offset = clamp_to_i64(query.offset);

        let mut records_query = things::table
            .filter(dsl::owner.eq(owner))
            .order(dsl::id.asc())
            .limit(limit)
            .offset(offset)
            .select(ThingRecord::as_select())
            .into_boxed();
        let mut count_query = things::table
            .filter(dsl::owner.eq(owner))
            .count()
            .into_boxed();

        if let Some(name) = &query.name {
            let pattern = format!("%{}%", name);
            records_query = records_query.filter(dsl::name.ilike(pattern.clone()));
            count_query = count_query.filter(dsl::name.ilike(pattern));
        }

        if let Some(metadata) = &query.metadata {
            let document = serde_json::Value::Object(metadata.clone());
            records_query = records_query.filter(dsl::metadata.contains(document.clone()));
            count_query = count_query.filter(dsl::metadata.contains(document));
        }

        let records = records_query.load(conn).await.map_err(PgError::from)?;
        let total: i64 = count_query.get_result(conn).await.map_err(PgError::from)?;

        Ok((records, total))
    }

    /// Lists an owner's things filtered by membership in the given
    /// identifier set (`connected = true`) or its complement, together with
    /// the filtered total count.
    pub async fn list_things_by_connectivity(
        conn: &mut AsyncPgConnection,
        owner: &str,
        connected_ids: Vec<String>,
        connected: bool,
        offset: u64,
        limit: u64,
    ) -> PgResult<(Vec<ThingRecord>, i64)> {
        use schema::things::{self, dsl};

        let limit = clamp_to_i64(limit);
        let offset = clamp_to_i64(offset);

        let mut records_query = things::table
            .filter(dsl::owner.eq(owner))
            .order(dsl::id.asc())
            .limit(limit)
            .offset(offset)
            .select(ThingRecord::as_select())
            .into_boxed();
        let mut count_query = things::table
            .filter(dsl::owner.eq(owner))
            .count()
            .into_boxed();

        if connected {
            records_query = records_query.filter(dsl::id.eq_any(connected_ids.clone()));
            count_query = count_query.filter(dsl::id.eq_any(connected_ids));
        } else {
            records_query = records_query.filter(dsl::id.ne_all(connected_ids.clone()));
            count_query = count_query.filter(dsl::id.ne_all(connected_ids));
        }

        let records = records_query.load(conn).await.map_err(PgError::from)?;
        let total: i64 = count_query.get_result(conn).await.map_err(PgError::from)?;

        Ok((records, total))
    }

    /// Deletes the thing matching `(id, owner)`.
    ///
    /// Returns the number of rows deleted; zero is not an error.
    pub async fn delete_thing(
        conn: &mut AsyncPgConnection,
        owner: &str,
        id: &str,
    ) -> PgResult<usize> {
        use schema::things::{self, dsl};

        diesel::delete(
            things::table
                .filter(dsl::id.eq(id))
                .filter(dsl::owner.eq(owner)),
        )
        .execute(conn)
        .await
        .map_err(PgError::from)
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    value.min(i64::MAX as u64) as i64
}

/// PostgreSQL-backed [`ThingRepository`].
///
/// Owns a pooled [`PgClient`] and the external channel-connection
/// collaborator consulted by [`retrieve_by_channel`]. Uniqueness of
/// identifiers and keys is enforced by the database's unique constraints,
/// so concurrent conflicting writes resolve to exactly one winner.
///
/// [`retrieve_by_channel`]: ThingRepository::retrieve_by_channel
#[derive(Clone)]
pub struct PgThingRepository {
    client: PgClient,
    channels: Arc<dyn ChannelConnections>,
}

impl std::fmt::Debug for PgThingRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgThingRepository")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl PgThingRepository {
    /// Creates a new repository over the given client and connection
    /// collaborator.
    pub fn new(client: PgClient, channels: Arc<dyn ChannelConnections>) -> Self {
        Self { client, channels }
    }

    async fn connection(&self) -> things_core::Result<crate::PgConn> {
        self.client
            .get_connection()
            .await
            .map_err(things_core::Error::from)
    }

    fn assemble_page(
        records: Vec<ThingRecord>,
        offset: u64,
        limit: u64,
        total: i64,
    ) -> things_core::Result<Page> {
        let things = records
            .into_iter()
            .map(ThingRecord::into_thing)
            .collect::<things_core::Result<Vec<_>>>()?;
        Ok(Page::new(things, offset, limit, total.max(0) as u64))
    }
}

#[async_trait]
impl ThingRepository for PgThingRepository {
    async fn save(&self, things: Vec<Thing>) -> things_core::Result<Vec<Thing>> {
        for thing in &things {
            thing.validate()?;
        }
        let records = things.iter().map(ThingRecord::from).collect();

        let mut conn = self.connection().await?;
        let saved = conn
            .transaction::<_, PgError, _>(|conn| {
                async move { ThingQueries::insert_things(conn, records).await }.scope_boxed()
            })
            .await
            .map_err(things_core::Error::from)?;

        saved.into_iter().map(ThingRecord::into_thing).collect()
    }

    async fn update(&self, thing: &Thing) -> things_core::Result<()> {
        let mut conn = self.connection().await?;
        let touched =
            ThingQueries::update_thing(&mut conn, &thing.owner, &thing.id, UpdateThing::from(thing))
                .await
                .map_err(things_core::Error::from)?;

        if touched == 0 {
            return Err(things_core::Error::not_found()
                .with_message(format!("thing {} for owner {}", thing.id, thing.owner)));
        }
        Ok(())
    }

    async fn update_key(&self, owner: &str, id: &str, key: &str) -> things_core::Result<()> {
        let mut conn = self.connection().await?;
        let touched = ThingQueries::update_thing_key(&mut conn, owner, id, key)
            .await
            .map_err(things_core::Error::from)?;

        if touched == 0 {
            return Err(things_core::Error::not_found()
                .with_message(format!("thing {} for owner {}", id, owner)));
        }
        Ok(())
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> things_core::Result<Thing> {
        let mut conn = self.connection().await?;
        let record = ThingQueries::find_thing_by_id(&mut conn, owner, id)
            .await
            .map_err(things_core::Error::from)?
            .ok_or_else(|| {
                things_core::Error::not_found()
                    .with_message(format!("thing {} for owner {}", id, owner))
            })?;

        record.into_thing()
    }

    async fn retrieve_by_key(&self, key: &str) -> things_core::Result<String> {
        let mut conn = self.connection().await?;
        ThingQueries::find_id_by_key(&mut conn, key)
            .await
            .map_err(things_core::Error::from)?
            .ok_or_else(|| things_core::Error::not_found().with_message("unknown thing key"))
    }

    async fn retrieve_all(&self, owner: &str, query: PageQuery) -> things_core::Result<Page> {
        let mut conn = self.connection().await?;
        let (records, total) = ThingQueries::list_things(&mut conn, owner, &query)
            .await
            .map_err(things_core::Error::from)?;

        Self::assemble_page(records, query.offset, query.effective_limit(), total)
    }

    async fn retrieve_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> things_core::Result<Page> {
        let connected_ids = self
            .channels
            .connected_things(owner, channel)
            .await
            .map_err(|err| {
                things_core::Error::entity_connected()
                    .with_message(format!("channel {} for owner {}", channel, owner))
                    .with_source(err)
            })?;

        let mut conn = self.connection().await?;
        let (records, total) = ThingQueries::list_things_by_connectivity(
            &mut conn,
            owner,
            connected_ids.into_iter().collect(),
            connected,
            offset,
            limit,
        )
        .await
        .map_err(things_core::Error::from)?;

        Self::assemble_page(records, offset, limit, total)
    }

    async fn remove(&self, owner: &str, id: &str) -> things_core::Result<()> {
        let mut conn = self.connection().await?;
        // Deleting zero rows is fine: absence is the requested end state.
        ThingQueries::delete_thing(&mut conn, owner, id)
            .await
            .map_err(things_core::Error::from)?;
        Ok(())
    }
}
