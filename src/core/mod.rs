pub mod error;
pub mod types;

pub use error::{ClusterError, Result};
pub use types::{NodeId, SlotAndNode, SlotId, SlotInfo, SlotLocation, SlotMap};
