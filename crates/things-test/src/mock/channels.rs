use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use things_core::{ChannelConnections, Error, Result};
use tokio::sync::RwLock;

/// In-memory channel-connectivity collaborator.
///
/// Connections are keyed by owner and channel identifier. Tests connect
/// things explicitly via [`MemoryChannelConnections::connect`] and then
/// exercise channel-scoped listing against the repository under test.
#[derive(Debug, Default)]
pub struct MemoryChannelConnections {
    connections: RwLock<HashMap<(String, String), HashSet<String>>>,
}

impl MemoryChannelConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a connection between a thing and a channel.
    pub async fn connect(&self, owner: &str, channel: &str, thing_id: &str) {
        let mut connections = self.connections.write().await;
        connections
            .entry((owner.to_owned(), channel.to_owned()))
            .or_default()
            .insert(thing_id.to_owned());
    }

    /// Drops a previously recorded connection, if any.
    pub async fn disconnect(&self, owner: &str, channel: &str, thing_id: &str) {
        let mut connections = self.connections.write().await;
        if let Some(things) = connections.get_mut(&(owner.to_owned(), channel.to_owned())) {
            things.remove(thing_id);
        }
    }
}

#[async_trait]
impl ChannelConnections for MemoryChannelConnections {
    async fn connected_things(&self, owner: &str, channel: &str) -> Result<HashSet<String>> {
        let connections = self.connections.read().await;
        let things = connections
            .get(&(owner.to_owned(), channel.to_owned()))
            .cloned()
            .unwrap_or_default();
        Ok(things)
    }
}

/// Channel-connectivity collaborator that always fails.
///
/// Used to verify that repositories surface collaborator failures as
/// [`ErrorKind::EntityConnected`] instead of swallowing them.
///
/// [`ErrorKind::EntityConnected`]: things_core::ErrorKind::EntityConnected
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingChannelConnections;

impl FailingChannelConnections {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelConnections for FailingChannelConnections {
    async fn connected_things(&self, _owner: &str, _channel: &str) -> Result<HashSet<String>> {
        Err(Error::entity_connected().with_message("channel connectivity lookup failed"))
    }
}
