impl SlotTable {
    /// Builds a fresh assignment for `nodes`.
    ///
    /// Leaders are dealt round-robin, so node `i` leads every slot `s` with
    /// `s % nodes.len() == i` and ends up with exactly `slot_count_per_node`
    /// slots. Followers are the next nodes in cyclic order after the leader.
    fn assign(slot_count_per_node: u32, nodes: &[NodeId], follower_count: usize) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ClusterError::Config(
                "node list must not be empty".to_string(),
            ));
        }
        if slot_count_per_node == 0 {
            return Err(ClusterError::Config(
                "slot_count_per_node must be >= 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for node in nodes {
            if node.is_blank() {
                return Err(ClusterError::Config(
                    "node id must not be empty".to_string(),
                ));
            }
            if !seen.insert(node) {
                return Err(ClusterError::Config(format!(
                    "Node '{}' appears more than once in the node list",
                    node
                )));
            }
        }

        let node_count = nodes.len();
        let total_slots = u32::try_from(node_count)
            .ok()
            .and_then(|count| count.checked_mul(slot_count_per_node))
            .ok_or_else(|| {
                ClusterError::Config(format!(
                    "{} slots per node across {} nodes overflows the slot space",
                    slot_count_per_node, node_count
                ))
            })?;
        let follower_count = follower_count.min(node_count - 1);

        let mut slots = SlotMap::new();
        for slot_id in 0..total_slots {
            let position = slot_id as usize % node_count;
            let followers = (1..=follower_count)
                .map(|offset| nodes[(position + offset) % node_count].clone())
                .collect();
            slots.insert(
                slot_id,
                SlotInfo::new(slot_id, nodes[position].clone(), followers),
            );
        }

        Ok(Self::index(total_slots, slots))
    }

    /// Derives the per-node indexes.
    ///
    /// `slots` iterates in slot order, so every index vector comes out sorted.
    fn index(total_slots: u32, slots: SlotMap) -> Self {
        let mut leader_slots: HashMap<NodeId, Vec<SlotId>> = HashMap::new();
        let mut follower_slots: HashMap<NodeId, Vec<SlotId>> = HashMap::new();
        for (slot_id, info) in &slots {
            leader_slots
                .entry(info.leader.clone())
                .or_default()
                .push(*slot_id);
            for follower in &info.followers {
                follower_slots
                    .entry(follower.clone())
                    .or_default()
                    .push(*slot_id);
            }
        }

        Self {
            total_slots,
            slots,
            leader_slots,
            follower_slots,
        }
    }
}
