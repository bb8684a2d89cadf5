//! Profiling settings for CT generation.
//!
//! Settings are loaded from multiple sources in priority order:
//! 1. Environment variables (AIE_PROFILE_CONFIG, AIE_PROFILE_DEVICE)
//! 2. Project-local config file (`./aie-profile.toml`)
//! 3. User config file (`~/.config/aie-profile-ct/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # aie-profile.toml
//!
//! # Device name the settings apply to
//! device = "npu1"
//!
//! # Address packing parameters (defaults shown)
//! [geometry]
//! column_shift = 25
//! row_shift = 20
//!
//! # Metric set assignments, one entry per (module, metric set)
//! [[metrics]]
//! module = "aie"
//! metric_set = "heat_map"
//! tiles = [{ col = 8, row = 2 }, { col = 9, row = 2 }]
//! ```

use crate::catalog::metrics::{MetricCollection, MetricsCollectionManager};
use crate::device::registers::{AieGeometry, CounterModule, TileCoord};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Setting name under which tile metric assignments are registered.
const TILE_METRICS_SETTING: &str = "tile_based_metrics";

/// Module groups of a profile configuration, in resolution order.
const MODULE_ORDER: [CounterModule; 4] = [
    CounterModule::Core,
    CounterModule::Memory,
    CounterModule::MemTile,
    CounterModule::Shim,
];

/// Error loading an explicitly-requested settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Profiling settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Device name the settings apply to.
    pub device: Option<String>,

    /// Column/row shift amounts for counter address packing.
    pub geometry: Option<AieGeometry>,

    /// Per-tile metric-set assignments.
    pub metrics: Vec<MetricsEntry>,
}

/// One `[[metrics]]` entry: a metric set assigned to a list of tiles.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsEntry {
    /// Module label ("aie", "aie_memory", "memory_tile", "interface_tile").
    pub module: String,
    /// Metric set name assigned to the listed tiles.
    pub metric_set: String,
    #[serde(default)]
    pub tiles: Vec<TileCoord>,
}

/// Fully-resolved per-tile metric assignment, one group per module.
#[derive(Debug, Clone, Default)]
pub struct ProfileConfig {
    /// Module groups in fixed order: core, memory, memory tile, interface
    /// tile. Entries within a group keep settings order.
    pub config_metrics: Vec<Vec<(TileCoord, String)>>,
}

impl ProfileConfig {
    /// Metric set assigned to a tile, scanning module groups in order.
    /// The first matching tile wins.
    pub fn metric_set_for(&self, col: u8, row: u8) -> Option<&str> {
        for group in &self.config_metrics {
            for (tile, metric_set) in group {
                if tile.col == col && tile.row == row {
                    return Some(metric_set);
                }
            }
        }
        None
    }
}

impl Settings {
    /// Load settings from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `aie-profile.toml`
    /// 3. User config `~/.config/aie-profile-ct/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut settings = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user) = Self::load_user_config() {
            settings.merge(user);
        }

        // Load project-local config (higher priority)
        if let Some(local) = Self::load_local_config() {
            settings.merge(local);
        }

        // Environment variables override everything
        settings.apply_env_overrides();

        settings
    }

    /// Load settings from an explicitly-requested file.
    ///
    /// Unlike the layered [`Settings::load`], a missing or malformed file
    /// here is an error rather than a fallback to defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the address packing geometry, with fallback to AIE2 defaults.
    pub fn geometry(&self) -> AieGeometry {
        self.geometry.unwrap_or_default()
    }

    /// Get the device name, with fallback to "npu1".
    pub fn device(&self) -> String {
        self.device.clone().unwrap_or_else(|| "npu1".to_string())
    }

    /// Expand the metric entries into the per-tile profile configuration.
    ///
    /// Built fresh on every call: the shared catalog may not have the
    /// current metric assignments yet, so generation never reads a
    /// persisted copy. Assignments are staged per module in the metric
    /// collection manager, then emitted as one group per module in
    /// [`MODULE_ORDER`]; within a group, entries keep settings-file order.
    pub fn create_profile_config(&self) -> ProfileConfig {
        let mut manager = MetricsCollectionManager::new();

        for module in MODULE_ORDER {
            let mut collection = MetricCollection::default();
            for entry in &self.metrics {
                if CounterModule::from_label(&entry.module) != module {
                    continue;
                }
                for tile in &entry.tiles {
                    collection
                        .assignments
                        .push((*tile, entry.metric_set.clone()));
                }
            }
            manager.add_metric_collection(module, TILE_METRICS_SETTING, collection);
        }

        let config_metrics = MODULE_ORDER
            .iter()
            .map(|module| {
                manager
                    .metric_collection(*module, TILE_METRICS_SETTING)
                    .assignments
                    .clone()
            })
            .collect();

        ProfileConfig { config_metrics }
    }

    /// Load user settings from ~/.config/aie-profile-ct/config.toml
    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let config_path = config_dir.join("aie-profile-ct").join("config.toml");
        Self::load_from_file(&config_path)
    }

    /// Load project-local settings from ./aie-profile.toml
    fn load_local_config() -> Option<Self> {
        Self::load_from_file(Path::new("aie-profile.toml"))
    }

    /// Load settings from a specific file, ignoring missing or malformed
    /// files with a diagnostic.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    Some(settings)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another settings object into this one.
    /// Only overrides fields the other object actually sets.
    fn merge(&mut self, other: Self) {
        if other.device.is_some() {
            self.device = other.device;
        }
        if other.geometry.is_some() {
            self.geometry = other.geometry;
        }
        if !other.metrics.is_empty() {
            self.metrics = other.metrics;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("AIE_PROFILE_CONFIG") {
            log::info!("Using AIE_PROFILE_CONFIG from environment: {}", path);
            match Self::from_file(Path::new(&path)) {
                Ok(settings) => self.merge(settings),
                Err(e) => log::warn!("{}", e),
            }
        }
        if let Ok(device) = std::env::var("AIE_PROFILE_DEVICE") {
            log::info!("Using AIE_PROFILE_DEVICE from environment: {}", device);
            self.device = Some(device);
        }
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# aie-profile-ct configuration
# Place this file at ~/.config/aie-profile-ct/config.toml or ./aie-profile.toml

# Device name the settings apply to
device = "npu1"

# Address packing parameters (defaults shown)
[geometry]
column_shift = 25
row_shift = 20

# Metric set assignments, one entry per (module, metric set)
[[metrics]]
module = "aie"
metric_set = "heat_map"
tiles = [{ col = 8, row = 2 }, { col = 9, row = 2 }]

[[metrics]]
module = "interface_tile"
metric_set = "read_bandwidth"
tiles = [{ col = 8, row = 0 }]
"#
        .to_string()
    }
}
