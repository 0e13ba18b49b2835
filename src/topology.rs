//! Persisting and transmitting slot assignments.
//!
//! A [`TopologySnapshot`] wraps the map returned by `Dht::snapshot` with a
//! format version and timestamp. It is written to disk as JSON (atomically, via
//! a temporary file in the target directory) and sent to joining nodes as
//! MessagePack.

use crate::core::{ClusterError, Result, SlotMap};
use crate::dht::Dht;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const TOPOLOGY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub total_slots: u32,
    pub slots: SlotMap,
}

impl TopologySnapshot {
    pub fn new(slots: SlotMap) -> Self {
        Self {
            version: TOPOLOGY_FORMAT_VERSION,
            saved_at: Utc::now(),
            total_slots: slots.len() as u32,
            slots,
        }
    }

    /// Writes the snapshot as JSON, replacing `path` atomically.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)
                .map_err(|e| ClusterError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| ClusterError::Io(e.error.to_string()))?;

        info!(
            path = %path.display(),
            total_slots = self.total_slots,
            "topology snapshot saved"
        );
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let snapshot: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ClusterError::Serialization(e.to_string()))?;
        snapshot.check_header()?;

        debug!(path = %path.display(), "topology snapshot read");
        Ok(snapshot)
    }

    /// Compact wire encoding for shipping the topology to another node.
    pub fn encode(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| ClusterError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self = rmp_serde::from_slice(bytes)
            .map_err(|e| ClusterError::Serialization(e.to_string()))?;
        snapshot.check_header()?;
        Ok(snapshot)
    }

    fn check_header(&self) -> Result<()> {
        if self.version != TOPOLOGY_FORMAT_VERSION {
            return Err(ClusterError::Serialization(format!(
                "unsupported topology format version {}",
                self.version
            )));
        }
        if self.total_slots as usize != self.slots.len() {
            return Err(ClusterError::MismatchedSlotsInfo(format!(
                "topology header declares {} slots, body has {}",
                self.total_slots,
                self.slots.len()
            )));
        }
        Ok(())
    }
}

impl Dht {
    /// Captures the current assignment for persistence or transmission.
    pub fn topology(&self) -> Result<TopologySnapshot> {
        Ok(TopologySnapshot::new(self.snapshot()?))
    }

    /// Loads a persisted or received topology; same rules as `Dht::load`.
    pub fn load_topology(&self, topology: TopologySnapshot) -> Result<()> {
        topology.check_header()?;
        self.load(topology.slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NodeId, SlotInfo};

    fn two_slot_map() -> SlotMap {
        let mut slots = SlotMap::new();
        slots.insert(0, SlotInfo::new(0, "A", vec![NodeId::from("B")]));
        slots.insert(1, SlotInfo::new(1, "B", vec![NodeId::from("A")]));
        slots
    }

    #[test]
    fn test_msgpack_encoding_preserves_slots() {
        let snapshot = TopologySnapshot::new(two_slot_map());
        let decoded = TopologySnapshot::decode(&snapshot.encode().unwrap()).unwrap();

        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut snapshot = TopologySnapshot::new(two_slot_map());
        snapshot.version = 99;
        let bytes = rmp_serde::to_vec_named(&snapshot).unwrap();

        assert!(matches!(
            TopologySnapshot::decode(&bytes),
            Err(ClusterError::Serialization(_))
        ));
    }

    #[test]
    fn test_header_must_match_body() {
        let mut snapshot = TopologySnapshot::new(two_slot_map());
        snapshot.total_slots = 3;

        let dht = Dht::new();
        assert!(matches!(
            dht.load_topology(snapshot),
            Err(ClusterError::MismatchedSlotsInfo(_))
        ));
        assert!(!dht.is_initialised());
    }
}
