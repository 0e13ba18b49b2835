use super::channel::{ChannelDialer, ConnectivityState, DialedChannel, RpcChannel};
use super::client::JobStoreClient;
use super::config::ConnectionConfig;
use super::http::HttpDialer;
use crate::core::{ClusterError, NodeId, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{Level, debug, event, info};

/// Everything held for one remote node.
struct NodeConnection {
    /// Address the channel was dialed with
    address: String,
    /// The channel shared by every call to this node
    channel: Arc<dyn RpcChannel>,
    /// Job store client bound to `channel`
    job_store: Arc<dyn JobStoreClient>,
    connected_at: DateTime<Utc>,
}

/// Connection manager
///
/// Keeps at most one channel per node and hands out the job store client
/// bound to it. Dials happen only in [`add`](Self::add); every other operation
/// is a local table read.
///
/// Close the manager with [`close`](Self::close) at shutdown. Using it after
/// `close` is the caller's mistake: the table is empty, so lookups fail and
/// health checks report false, but nothing prevents new `add` calls.
pub struct ConnectionManager {
    config: ConnectionConfig,
    dialer: Arc<dyn ChannelDialer>,
    connections: RwLock<HashMap<NodeId, NodeConnection>>,
}

impl ConnectionManager {
    /// Create a manager dialing through `dialer`. No connection is opened.
    pub fn new(config: ConnectionConfig, dialer: Arc<dyn ChannelDialer>) -> Result<Self> {
        config.validate().map_err(ClusterError::Config)?;

        Ok(Self {
            config,
            dialer,
            connections: RwLock::new(HashMap::new()),
        })
    }

    /// Create a manager speaking HTTP/2 to its peers
    pub fn with_http(config: ConnectionConfig) -> Result<Self> {
        Self::new(config, Arc::new(HttpDialer))
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connect to `server_id` at `address` unless a connection already exists.
    ///
    /// The presence check, the dial and the insert happen under one write
    /// lock, so concurrent calls for the same node dial once. A failed or
    /// timed-out dial registers nothing. There is no retry.
    pub async fn add(&self, server_id: impl Into<NodeId>, address: impl Into<String>) -> Result<()> {
        let node_id = server_id.into();
        let address = address.into();
        if node_id.is_blank() {
            return Err(ClusterError::Config(
                "server_id must not be empty".to_string(),
            ));
        }

        let mut connections = self.connections.write().await;
        if connections.contains_key(&node_id) {
            debug!(node_id = %node_id, "connection already exists");
            return Ok(());
        }

        let dialed = self.dial(&node_id, &address).await?;
        info!(node_id = %node_id, addr = %address, "connected to node");

        connections.insert(
            node_id,
            NodeConnection {
                address,
                channel: dialed.channel,
                job_store: dialed.client,
                connected_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn dial(&self, node_id: &NodeId, address: &str) -> Result<DialedChannel> {
        let dial_timeout = self.config.dial_timeout;
        match timeout(dial_timeout, self.dialer.dial(node_id, address, &self.config)).await {
            Ok(Ok(dialed)) => Ok(dialed),
            Ok(Err(err)) => {
                event!(Level::WARN, node_id = %node_id, addr = address, error = %err, "dial failed");
                Err(err)
            }
            Err(_) => {
                event!(Level::WARN, node_id = %node_id, addr = address, "dial timed out");
                Err(ClusterError::Dial {
                    node_id: node_id.clone(),
                    address: address.to_string(),
                    reason: format!("timed out after {:?}", dial_timeout),
                })
            }
        }
    }

    /// Job store client for an existing connection. Never dials.
    pub async fn get_client(&self, node_id: impl AsRef<str>) -> Result<Arc<dyn JobStoreClient>> {
        let node_id = node_id.as_ref();
        let connections = self.connections.read().await;

        connections
            .get(node_id)
            .map(|connection| Arc::clone(&connection.job_store))
            .ok_or_else(|| ClusterError::NodeNotPresent(NodeId::from(node_id)))
    }

    /// True iff the node is connected and its channel is ready or idle.
    pub async fn check_health(&self, node_id: impl AsRef<str>) -> bool {
        let connections = self.connections.read().await;

        connections
            .get(node_id.as_ref())
            .is_some_and(|connection| connection.channel.state().is_healthy())
    }

    /// Connectivity of the node's channel, `None` when not connected.
    pub async fn state_of(&self, node_id: impl AsRef<str>) -> Option<ConnectivityState> {
        let connections = self.connections.read().await;
        connections
            .get(node_id.as_ref())
            .map(|connection| connection.channel.state())
    }

    pub async fn address_of(&self, node_id: impl AsRef<str>) -> Option<String> {
        let connections = self.connections.read().await;
        connections
            .get(node_id.as_ref())
            .map(|connection| connection.address.clone())
    }

    /// When the node's channel was established.
    pub async fn connected_at(&self, node_id: impl AsRef<str>) -> Option<DateTime<Utc>> {
        let connections = self.connections.read().await;
        connections
            .get(node_id.as_ref())
            .map(|connection| connection.connected_at)
    }

    /// Connected nodes, sorted.
    pub async fn nodes(&self) -> Vec<NodeId> {
        let connections = self.connections.read().await;
        let mut nodes = connections.keys().cloned().collect::<Vec<_>>();
        nodes.sort();
        nodes
    }

    /// Evicts one node, closing its channel.
    ///
    /// Returns true if the node was connected. A later `add` dials again.
    pub async fn remove(&self, node_id: impl AsRef<str>) -> bool {
        let mut connections = self.connections.write().await;
        match connections.remove(node_id.as_ref()) {
            Some(connection) => {
                info!(
                    node_id = node_id.as_ref(),
                    addr = %connection.address,
                    "Evicting connection with node"
                );
                connection.channel.close();
                true
            }
            None => false,
        }
    }

    /// Closes every managed channel and forgets all nodes.
    pub async fn close(&self) {
        let mut connections = self.connections.write().await;

        for (node_id, connection) in connections.drain() {
            info!(
                node_id = %node_id,
                addr = %connection.address,
                "Closing connection with node"
            );
            connection.channel.close();
        }
    }

    /// Get connection statistics
    pub async fn stats(&self) -> ConnectionStats {
        let connections = self.connections.read().await;

        let mut by_state = BTreeMap::new();
        for connection in connections.values() {
            *by_state.entry(connection.channel.state()).or_insert(0) += 1;
        }
        let healthy_connections = by_state
            .iter()
            .filter(|(state, _)| state.is_healthy())
            .map(|(_, count)| *count)
            .sum();

        ConnectionStats {
            total_connections: connections.len(),
            healthy_connections,
            by_state,
        }
    }
}

/// Connection manager statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub healthy_connections: usize,
    pub by_state: BTreeMap<ConnectivityState, usize>,
}

impl fmt::Display for ConnectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Connection Stats: {}/{} healthy",
            self.healthy_connections, self.total_connections
        )?;
        for (state, count) in &self.by_state {
            write!(f, ", {} {}", count, state)?;
        }
        Ok(())
    }
}
