//! Pooled RPC connections to the other nodes of the cluster.
//!
//! A caller typically resolves a key through the DHT, then fetches the client
//! for the leader from the [`ConnectionManager`]:
//!
//! ```ignore
//! let location = dht.get_location("job-42")?;
//! let client = manager.get_client(&location.leader.node_id).await?;
//! client.set_job("billing", &job).await?;
//! ```
//!
//! The two steps are not atomic; a missing or unhealthy connection after a
//! successful lookup is an ordinary outcome.

pub mod channel;
pub mod client;
pub mod config;
pub mod http;
pub mod in_memory;
pub mod manager;

pub use channel::{
    AtomicConnectivityState, ChannelDialer, ConnectivityState, DialedChannel, RpcChannel,
};
pub use client::{Job, JobStoreClient};
pub use config::ConnectionConfig;
pub use http::{HttpChannel, HttpDialer, HttpJobStoreClient};
pub use in_memory::{InMemoryChannel, InMemoryDialer, InMemoryNetwork};
pub use manager::{ConnectionManager, ConnectionStats};
