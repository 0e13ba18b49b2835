/// Slot assignment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhtConfig {
    /// Followers assigned per slot by `initialise` (capped at `nodes - 1`)
    #[serde(default = "DhtConfig::default_follower_count")]
    pub follower_count: usize,

    /// Pins the address space size before the first `initialise`/`load`
    #[serde(default)]
    pub total_slots: Option<u32>,
}

impl DhtConfig {
    fn default_follower_count() -> usize {
        1
    }

    /// Create a configuration with one follower per slot
    pub fn new() -> Self {
        Self {
            follower_count: Self::default_follower_count(),
            total_slots: None,
        }
    }

    /// Set the number of followers per slot
    pub fn follower_count(mut self, count: usize) -> Self {
        self.follower_count = count;
        self
    }

    /// Pin the total number of slots
    pub fn total_slots(mut self, total: u32) -> Self {
        self.total_slots = Some(total);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.total_slots == Some(0) {
            return Err("total_slots must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for DhtConfig {
    fn default() -> Self {
        Self::new()
    }
}
