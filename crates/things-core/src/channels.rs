//! The external channel-connection collaborator boundary.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::Result;

/// Read-only view of thing↔channel connectivity, owned by an external
/// subsystem.
///
/// The registry consults this collaborator when listing things by channel;
/// it never manages connection lifecycle. A failed consultation surfaces as
/// [`ErrorKind::EntityConnected`].
///
/// [`ErrorKind::EntityConnected`]: crate::ErrorKind::EntityConnected
#[async_trait]
pub trait ChannelConnections: Send + Sync {
    /// Returns the identifiers of the owner's things currently connected to
    /// the given channel.
    async fn connected_things(&self, owner: &str, channel: &str) -> Result<HashSet<String>>;
}
