impl SlotTable {
    /// Resolves a key to its leader and first follower.
    fn location_for(&self, key: &str) -> Result<SlotLocation> {
        let slot_id = slot_for_key(key, self.total_slots);
        let info = self.slots.get(&slot_id).ok_or_else(|| {
            ClusterError::MismatchedSlotsInfo(format!("slot {} is missing from the table", slot_id))
        })?;

        Ok(SlotLocation {
            leader: SlotAndNode::new(slot_id, info.leader.clone()),
            follower: info
                .first_follower()
                .map(|follower| SlotAndNode::new(slot_id, follower.clone())),
        })
    }

    fn leader_slots(&self, node_id: &str) -> Vec<SlotId> {
        self.leader_slots.get(node_id).cloned().unwrap_or_default()
    }

    fn follower_slots(&self, node_id: &str) -> Vec<SlotId> {
        self.follower_slots.get(node_id).cloned().unwrap_or_default()
    }

    /// Every node holding a role in at least one slot, sorted.
    fn nodes(&self) -> Vec<NodeId> {
        self.leader_slots
            .keys()
            .chain(self.follower_slots.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
