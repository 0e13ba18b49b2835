//! Transport seam between the connection manager and a concrete RPC stack.

use super::client::JobStoreClient;
use super::config::ConnectionConfig;
use crate::core::{NodeId, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Connectivity of a channel, as reported without any network round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectivityState {
    Connecting,
    Ready,
    Idle,
    TransientFailure,
    Shutdown,
}

impl ConnectivityState {
    /// Ready and idle channels can take calls right away.
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Ready | Self::Idle)
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Ready => 1,
            Self::Idle => 2,
            Self::TransientFailure => 3,
            Self::Shutdown => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Ready,
            2 => Self::Idle,
            3 => Self::TransientFailure,
            _ => Self::Shutdown,
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "CONNECTING",
            Self::Ready => "READY",
            Self::Idle => "IDLE",
            Self::TransientFailure => "TRANSIENT_FAILURE",
            Self::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`ConnectivityState`].
///
/// `Shutdown` is terminal: once stored, later transitions are refused.
#[derive(Debug)]
pub struct AtomicConnectivityState(AtomicU8);

impl AtomicConnectivityState {
    pub fn new(state: ConnectivityState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn load(&self) -> ConnectivityState {
        ConnectivityState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next` unless the channel is already shut down.
    ///
    /// Returns false when the transition was refused.
    pub fn transition(&self, next: ConnectivityState) -> bool {
        let shutdown = ConnectivityState::Shutdown.as_u8();
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != shutdown).then_some(next.as_u8())
            })
            .is_ok()
    }

    pub fn shutdown(&self) {
        self.0
            .store(ConnectivityState::Shutdown.as_u8(), Ordering::Release);
    }
}

/// One long-lived, multiplexed channel to a remote node.
pub trait RpcChannel: Send + Sync {
    /// Current connectivity; must not perform I/O.
    fn state(&self) -> ConnectivityState;

    /// Releases the channel. Calls through its clients fail afterwards.
    fn close(&self);
}

/// A freshly established channel and the job store client bound to it.
pub struct DialedChannel {
    pub channel: Arc<dyn RpcChannel>,
    pub client: Arc<dyn JobStoreClient>,
}

/// Establishes channels to remote nodes.
///
/// The connection manager bounds every dial by `ConnectionConfig::dial_timeout`
/// and drops the future on expiry, so implementations need not enforce it.
#[async_trait]
pub trait ChannelDialer: Send + Sync {
    async fn dial(
        &self,
        node_id: &NodeId,
        address: &str,
        config: &ConnectionConfig,
    ) -> Result<DialedChannel>;
}
