use super::types::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("mismatched slot info: {0}")]
    MismatchedSlotsInfo(String),

    #[error("duplicate slots: {0}")]
    DuplicateSlots(String),

    #[error("dht already initialised")]
    AlreadyInitialised,

    #[error("dht not initialised")]
    NotInitialised,

    #[error("node not present: {0}")]
    NodeNotPresent(NodeId),

    #[error("Failed to dial node '{node_id}' at {address}: {reason}")]
    Dial {
        node_id: NodeId,
        address: String,
        reason: String,
    },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

impl<T> From<std::sync::PoisonError<T>> for ClusterError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<std::io::Error> for ClusterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
