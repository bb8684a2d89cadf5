//! Static device information consumed by the CT generator.
//!
//! The profiling runtime registers each configured hardware counter here at
//! configuration time; generation later reads the catalog as an immutable
//! snapshot keyed by device id. For standalone use the catalog can be
//! loaded from a TOML file:
//!
//! ```toml
//! # aie_counters.toml
//! [[counters]]
//! column = 0
//! row = 2
//! counter_number = 0
//! module = "aie"
//! payload = 0
//! name = "active_cycles"
//! ```

pub mod metrics;

pub use metrics::{MetricCollection, MetricsCollectionManager};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Name of the counter catalog file looked up in the invocation directory.
pub const COUNTER_CATALOG_FILENAME: &str = "aie_counters.toml";

/// One configured hardware performance counter.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterRecord {
    /// Tile column
    pub column: u8,
    /// Tile row
    pub row: u8,
    /// Counter index within the module
    pub counter_number: u8,
    /// Module label as reported by the runtime ("aie", "aie_memory",
    /// "memory_tile", "interface_tile")
    pub module: String,
    /// Raw configuration payload; bit 8 encodes master/slave for
    /// interface-tile bandwidth metrics
    #[serde(default)]
    pub payload: u64,
    /// Counter name, used in diagnostics only
    #[serde(default)]
    pub name: String,
}

/// Read-only store of configured counters, keyed by device id.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    counters: HashMap<u64, Vec<CounterRecord>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a counter for a device.
    pub fn add_counter(&mut self, device_id: u64, record: CounterRecord) {
        self.counters.entry(device_id).or_default().push(record);
    }

    /// Number of counters configured for a device.
    pub fn num_counters(&self, device_id: u64) -> usize {
        self.counters.get(&device_id).map_or(0, Vec::len)
    }

    /// Fetch one counter by index. Out-of-range indices yield `None`.
    pub fn counter(&self, device_id: u64, index: usize) -> Option<&CounterRecord> {
        self.counters.get(&device_id)?.get(index)
    }

    /// Load a counter list for one device from a TOML file.
    pub fn from_toml_file(path: &Path, device_id: u64) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read counter file {}", path.display()))?;
        let file: CounterFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse counter file {}", path.display()))?;

        let mut catalog = Self::new();
        for record in file.counters {
            catalog.add_counter(device_id, record);
        }
        log::debug!(
            "Loaded {} counters for device {} from {}",
            catalog.num_counters(device_id),
            device_id,
            path.display()
        );
        Ok(catalog)
    }
}

#[derive(Debug, Deserialize)]
struct CounterFile {
    #[serde(default)]
    counters: Vec<CounterRecord>,
}
