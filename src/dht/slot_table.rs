/// A validated, immutable slot assignment.
///
/// The engine publishes one of these behind an `Arc` and never mutates it;
/// a topology change builds a new table and swaps the pointer. The per-node
/// indexes are derived from `slots` at construction and never diverge from it.
#[derive(Debug, Clone)]
struct SlotTable {
    total_slots: u32,
    slots: SlotMap,
    leader_slots: HashMap<NodeId, Vec<SlotId>>,
    follower_slots: HashMap<NodeId, Vec<SlotId>>,
}

// Keep slot-table behavior split by concern.
include!("slot_table/assign.rs");
include!("slot_table/validate.rs");
include!("slot_table/lookups.rs");
