const FNV_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// Computes the slot for `key` using FNV-1a.
///
/// The hash is unseeded, so every node computes the same slot for the same key
/// across restarts.
pub fn slot_for_key(key: &str, total_slots: u32) -> SlotId {
    if total_slots == 0 {
        return 0;
    }
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    (hash % total_slots as u64) as SlotId
}
