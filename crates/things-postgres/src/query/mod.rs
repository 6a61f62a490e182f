//! Database queries and the repository implementation for thing records.
//!
//! [`ThingQueries`] holds the low-level query functions operating on a raw
//! connection; [`PgThingRepository`] composes them with the connection pool
//! and the channel-connection collaborator to satisfy the
//! [`ThingRepository`] contract.
//!
//! [`ThingRepository`]: things_core::ThingRepository

mod thing;

pub use thing::{PgThingRepository, ThingQueries};
