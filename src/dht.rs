//! Slot assignment engine.
//!
//! Keys hash onto a fixed slot space; every slot is owned by one leader and
//! `follower_count` followers. The engine is built once by [`Dht::initialise`]
//! (fresh cluster) or [`Dht::load`] (assignment received from the master) and
//! is replaced wholesale by later loads.

use crate::core::{ClusterError, NodeId, Result, SlotAndNode, SlotId, SlotInfo, SlotLocation, SlotMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{Level, event, info_span};

// Engine internals are split by concern to keep slot logic navigable.
include!("dht/config.rs");
include!("dht/slot_hash.rs");
include!("dht/slot_table.rs");
include!("dht/engine.rs");
