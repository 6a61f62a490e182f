//! Mock implementations of the registry contracts.
//!
//! This module provides in-memory implementations of the repository and
//! channel-connection traits defined in things-core. The repository mock
//! preserves the backend semantics that matter to callers: batch atomicity,
//! identifier/key uniqueness, owner scoping, pagination totals, and
//! idempotent deletion.

mod channels;
mod repository;

pub use channels::{FailingChannelConnections, MemoryChannelConnections};
pub use repository::MemoryThingRepository;
