//! Per-module metric-collection bookkeeping.
//!
//! Metric collections are registered under a `(module, setting name)` pair
//! while the profiling settings are parsed, and read back when the per-tile
//! configuration is assembled. A lookup that misses resolves to a shared
//! empty collection rather than an error.

use crate::device::registers::{CounterModule, TileCoord};
use std::collections::HashMap;

/// Tile-to-metric-set assignments registered under one setting name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricCollection {
    pub assignments: Vec<(TileCoord, String)>,
}

impl MetricCollection {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

static EMPTY_COLLECTION: MetricCollection = MetricCollection {
    assignments: Vec::new(),
};

/// Lookup table of metric collections for all modules.
#[derive(Debug, Default)]
pub struct MetricsCollectionManager {
    all_modules: HashMap<CounterModule, HashMap<String, MetricCollection>>,
}

impl MetricsCollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection under a module and setting name, replacing any
    /// previous collection with the same key.
    pub fn add_metric_collection(
        &mut self,
        module: CounterModule,
        setting_name: &str,
        collection: MetricCollection,
    ) {
        self.all_modules
            .entry(module)
            .or_default()
            .insert(setting_name.to_string(), collection);
    }

    /// Look up a collection; unknown keys yield an empty collection.
    pub fn metric_collection(
        &self,
        module: CounterModule,
        setting_name: &str,
    ) -> &MetricCollection {
        self.all_modules
            .get(&module)
            .and_then(|settings| settings.get(setting_name))
            .unwrap_or(&EMPTY_COLLECTION)
    }
}
