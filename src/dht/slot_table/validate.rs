impl SlotTable {
    /// Accepts an externally computed assignment.
    ///
    /// Checks for:
    /// - a non-empty map,
    /// - two entries describing the same slot,
    /// - map keys that disagree with their entry,
    /// - ids outside `[0, len)` or a slot count other than `expected_total`,
    /// - empty owners, a leader that also follows, repeated followers.
    fn from_slot_map(slots: SlotMap, expected_total: Option<u32>) -> Result<Self> {
        if slots.is_empty() {
            return Err(ClusterError::MismatchedSlotsInfo(
                "slot map is empty".to_string(),
            ));
        }

        let mut described = HashSet::with_capacity(slots.len());
        for info in slots.values() {
            if !described.insert(info.slot_id) {
                return Err(ClusterError::DuplicateSlots(format!(
                    "slot {} is described more than once",
                    info.slot_id
                )));
            }
        }

        let total_slots = u32::try_from(slots.len()).map_err(|_| {
            ClusterError::MismatchedSlotsInfo(format!(
                "{} slots exceed the slot space",
                slots.len()
            ))
        })?;
        if let Some(expected) = expected_total {
            if expected != total_slots {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "expected {} slots, got {}",
                    expected, total_slots
                )));
            }
        }

        for (slot_id, info) in &slots {
            if *slot_id != info.slot_id {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "slot key {} holds info for slot {}",
                    slot_id, info.slot_id
                )));
            }
            if *slot_id >= total_slots {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "Slot {} is out of range for {} slots",
                    slot_id, total_slots
                )));
            }
            Self::validate_owners(info)?;
        }

        Ok(Self::index(total_slots, slots))
    }

    fn validate_owners(info: &SlotInfo) -> Result<()> {
        if info.leader.is_blank() {
            return Err(ClusterError::MismatchedSlotsInfo(format!(
                "Leader node id for slot {} must not be empty",
                info.slot_id
            )));
        }

        let mut dedupe = HashSet::new();
        for follower in &info.followers {
            if follower.is_blank() {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "Follower node id for slot {} must not be empty",
                    info.slot_id
                )));
            }
            if *follower == info.leader {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "Follower '{}' for slot {} cannot be the leader",
                    follower, info.slot_id
                )));
            }
            if !dedupe.insert(follower) {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "Follower '{}' appears more than once for slot {}",
                    follower, info.slot_id
                )));
            }
        }

        Ok(())
    }
}
