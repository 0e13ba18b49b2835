use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one slot in the fixed address space `[0, total_slots)`.
pub type SlotId = u32;

/// Slot-to-assignment table.
///
/// This is the shape returned by `Dht::snapshot` and accepted by `Dht::load`.
pub type SlotMap = BTreeMap<SlotId, SlotInfo>;

/// Opaque, stable identity of a cluster member.
///
/// Equal to the member's server id, so it doubles as the connection key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Ownership of a single slot: one leader and zero or more followers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub slot_id: SlotId,
    pub leader: NodeId,
    #[serde(default)]
    pub followers: Vec<NodeId>,
}

impl SlotInfo {
    pub fn new(slot_id: SlotId, leader: impl Into<NodeId>, followers: Vec<NodeId>) -> Self {
        Self {
            slot_id,
            leader: leader.into(),
            followers,
        }
    }

    /// The follower reported by lookups when several are assigned.
    pub fn first_follower(&self) -> Option<&NodeId> {
        self.followers.first()
    }
}

/// A resolved `(slot, node)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotAndNode {
    pub slot_id: SlotId,
    pub node_id: NodeId,
}

impl SlotAndNode {
    pub fn new(slot_id: SlotId, node_id: impl Into<NodeId>) -> Self {
        Self {
            slot_id,
            node_id: node_id.into(),
        }
    }
}

/// Where a key lives: its slot leader and, when assigned, one follower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLocation {
    pub leader: SlotAndNode,
    pub follower: Option<SlotAndNode>,
}

impl SlotLocation {
    pub fn slot_id(&self) -> SlotId {
        self.leader.slot_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_node_id_lookup_by_str() {
        let mut owners: HashMap<NodeId, u32> = HashMap::new();
        owners.insert(NodeId::from("node-a"), 3);

        assert_eq!(owners.get("node-a"), Some(&3));
        assert_eq!(owners.get("node-b"), None);
    }

    #[test]
    fn test_node_id_blank() {
        assert!(NodeId::from("  ").is_blank());
        assert!(!NodeId::from("n1").is_blank());
        assert_eq!(NodeId::from("n1"), "n1");
    }

    #[test]
    fn test_slot_info_serializes_node_ids_as_strings() {
        let info = SlotInfo::new(7, "A", vec![NodeId::from("B")]);
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"slot_id": 7, "leader": "A", "followers": ["B"]})
        );
    }
}
