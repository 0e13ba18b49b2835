/// Distributed hash table over the slot space.
///
/// Cheap to share behind an `Arc`: reads clone the published table pointer
/// under a short read lock and then work without holding any lock, while
/// `initialise`/`load` validate and swap under the write lock. Readers observe
/// either the whole previous table or the whole new one.
pub struct Dht {
    config: DhtConfig,
    table: RwLock<Option<Arc<SlotTable>>>,
}

impl Dht {
    /// Creates an uninitialised engine with the default configuration.
    pub fn new() -> Self {
        Self {
            config: DhtConfig::default(),
            table: RwLock::new(None),
        }
    }

    /// Creates an uninitialised engine with a specific configuration.
    pub fn with_config(config: DhtConfig) -> Result<Self> {
        config.validate().map_err(ClusterError::Config)?;
        Ok(Self {
            config,
            table: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &DhtConfig {
        &self.config
    }

    /// Computes a fresh assignment of `slot_count_per_node * nodes.len()` slots.
    ///
    /// Only valid on an uninitialised engine (cluster bootstrap). Nothing is
    /// published unless the whole assignment is valid.
    pub fn initialise<I, N>(&self, slot_count_per_node: u32, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        let nodes = nodes.into_iter().map(Into::into).collect::<Vec<NodeId>>();
        let span = info_span!(
            "dht_initialise",
            slot_count_per_node,
            node_count = nodes.len()
        );
        let _guard = span.enter();

        let mut current = self.table.write()?;
        if current.is_some() {
            event!(Level::WARN, "dht initialise rejected: already initialised");
            return Err(ClusterError::AlreadyInitialised);
        }

        let table = SlotTable::assign(slot_count_per_node, &nodes, self.config.follower_count)?;
        if let Some(expected) = self.config.total_slots {
            if expected != table.total_slots {
                return Err(ClusterError::MismatchedSlotsInfo(format!(
                    "configured for {} slots, node list yields {}",
                    expected, table.total_slots
                )));
            }
        }

        event!(
            Level::INFO,
            total_slots = table.total_slots,
            "dht initialised"
        );
        *current = Some(Arc::new(table));
        Ok(())
    }

    /// Replaces the whole assignment with one computed elsewhere.
    ///
    /// Works on an uninitialised engine (node joining an existing cluster) and
    /// as a full refresh. Once the slot count is fixed it cannot change. On any
    /// error the previous assignment stays in place.
    pub fn load(&self, slots: SlotMap) -> Result<()> {
        let span = info_span!("dht_load", slot_count = slots.len());
        let _guard = span.enter();

        let mut current = self.table.write()?;
        let expected = current
            .as_ref()
            .map(|table| table.total_slots)
            .or(self.config.total_slots);

        let table = match SlotTable::from_slot_map(slots, expected) {
            Ok(table) => table,
            Err(err) => {
                event!(Level::WARN, error = %err, "dht load rejected");
                return Err(err);
            }
        };

        event!(
            Level::INFO,
            total_slots = table.total_slots,
            replaced = current.is_some(),
            "dht slot map loaded"
        );
        *current = Some(Arc::new(table));
        Ok(())
    }

    /// Resolves `key` to its slot leader and, when assigned, one follower.
    pub fn get_location(&self, key: &str) -> Result<SlotLocation> {
        let location = self.current()?.location_for(key)?;
        event!(
            Level::DEBUG,
            slot_id = location.slot_id(),
            leader = %location.leader.node_id,
            "dht key resolved"
        );
        Ok(location)
    }

    /// Slots led by `node_id`, sorted. Empty for unknown nodes or before
    /// initialisation.
    pub fn get_slots_for_node(&self, node_id: impl AsRef<str>) -> Vec<SlotId> {
        self.current()
            .map(|table| table.leader_slots(node_id.as_ref()))
            .unwrap_or_default()
    }

    /// Slots followed by `node_id`, sorted.
    pub fn get_follower_slots_for_node(&self, node_id: impl AsRef<str>) -> Vec<SlotId> {
        self.current()
            .map(|table| table.follower_slots(node_id.as_ref()))
            .unwrap_or_default()
    }

    /// Every node that leads or follows at least one slot, sorted.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.current()
            .map(|table| table.nodes())
            .unwrap_or_default()
    }

    /// Independent copy of the current assignment, in the shape `load` accepts.
    pub fn snapshot(&self) -> Result<SlotMap> {
        Ok(self.current()?.slots.clone())
    }

    pub fn total_slots(&self) -> Option<u32> {
        self.current().ok().map(|table| table.total_slots)
    }

    pub fn is_initialised(&self) -> bool {
        self.current().is_ok()
    }

    fn current(&self) -> Result<Arc<SlotTable>> {
        self.table
            .read()?
            .as_ref()
            .cloned()
            .ok_or(ClusterError::NotInitialised)
    }
}

impl Default for Dht {
    fn default() -> Self {
        Self::new()
    }
}
