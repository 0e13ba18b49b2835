// ============================================================================
// tmcluster Library
// ============================================================================

//! Cluster topology and inter-node connections for a replicated job store.
//!
//! - [`Dht`] maps keys onto a fixed slot space and every slot onto a leader
//!   and its followers, so all members agree on where a key lives.
//! - [`ConnectionManager`] keeps one long-lived channel per remote node and
//!   hands out typed job store clients bound to it.
//!
//! Both are plain objects with an explicit owner; nothing here is global.

pub mod core;
pub mod connection;
pub mod dht;
pub mod topology;

// Re-export main types for convenience
pub use crate::core::{
    ClusterError, NodeId, Result, SlotAndNode, SlotId, SlotInfo, SlotLocation, SlotMap,
};
pub use dht::{Dht, DhtConfig, slot_for_key};
pub use topology::{TOPOLOGY_FORMAT_VERSION, TopologySnapshot};

// Re-export connection API
pub use connection::{
    ChannelDialer, ConnectionConfig, ConnectionManager, ConnectionStats, ConnectivityState,
    DialedChannel, HttpDialer, InMemoryDialer, InMemoryNetwork, Job, JobStoreClient, RpcChannel,
};
