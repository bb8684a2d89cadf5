//! Counter catalog construction.
//!
//! Builds the derived counter set for a device: each configured counter is
//! resolved against the per-tile metric assignment, given an absolute
//! register address, and classified for port direction when its metric set
//! measures directional throughput.

use crate::catalog::StaticCatalog;
use crate::config::ProfileConfig;
use crate::device::registers::{counter_address, AieGeometry, CounterModule};
use std::fmt;

/// Payload bit distinguishing master (output) from slave (input) ports for
/// interface-tile bandwidth metrics.
const PAYLOAD_IS_MASTER_SHIFT: u8 = 8;

/// Direction of the port a throughput counter observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One counter as it appears in the CT script.
#[derive(Debug, Clone)]
pub struct CtCounter {
    /// Tile column
    pub column: u8,
    /// Tile row
    pub row: u8,
    /// Counter index within the module
    pub counter_number: u8,
    /// Module label as reported by the catalog, emitted verbatim
    pub module: String,
    /// Absolute register address
    pub address: u64,
    /// Metric set assigned to this counter's tile, when configured
    pub metric_set: Option<String>,
    /// Populated only for throughput-class metric sets
    pub port_direction: Option<PortDirection>,
}

/// Build the full counter set configured for a device.
///
/// Counters are fetched from the catalog by index; missing slots are
/// skipped. Metric sets come from `profile_config`, scanning module groups
/// in order with the first tile match winning.
pub fn build_counters(
    catalog: &StaticCatalog,
    device_id: u64,
    profile_config: &ProfileConfig,
    geometry: AieGeometry,
) -> Vec<CtCounter> {
    let num_counters = catalog.num_counters(device_id);
    let mut counters = Vec::with_capacity(num_counters);

    for index in 0..num_counters {
        let record = match catalog.counter(device_id, index) {
            Some(r) => r,
            None => continue,
        };

        let module = CounterModule::from_label(&record.module);
        let address = counter_address(
            record.column,
            record.row,
            record.counter_number,
            module,
            geometry,
        );

        let metric_set = profile_config
            .metric_set_for(record.column, record.row)
            .map(str::to_string);

        let port_direction = match &metric_set {
            Some(set) if is_throughput_metric(set) => port_direction(set, record.payload),
            _ => None,
        };

        counters.push(CtCounter {
            column: record.column,
            row: record.row,
            counter_number: record.counter_number,
            module: record.module.clone(),
            address,
            metric_set,
            port_direction,
        });
    }

    log::debug!(
        "Retrieved {} configured counters for device {}",
        counters.len(),
        device_id
    );

    counters
}

/// Whether a metric set measures throughput (and may carry a port
/// direction). Case-sensitive, matching the upstream metric vocabulary.
pub fn is_throughput_metric(metric_set: &str) -> bool {
    metric_set.contains("throughput") || metric_set.contains("bandwidth")
}

/// Resolve the port direction for a throughput metric set.
///
/// Interface-tile bandwidth sets mix master and slave ports per tile, so
/// the direction comes from the counter payload; stream metric sets encode
/// the direction in their name.
pub fn port_direction(metric_set: &str, payload: u64) -> Option<PortDirection> {
    if metric_set == "ddr_bandwidth"
        || metric_set == "read_bandwidth"
        || metric_set == "write_bandwidth"
    {
        let is_master = (payload >> PAYLOAD_IS_MASTER_SHIFT) & 0x1 != 0;
        return Some(if is_master {
            PortDirection::Output
        } else {
            PortDirection::Input
        });
    }

    if metric_set.contains("input") || metric_set.contains("s2mm") {
        return Some(PortDirection::Input);
    }

    if metric_set.contains("output") || metric_set.contains("mm2s") {
        return Some(PortDirection::Output);
    }

    None
}

/// Select the counters whose column lies in `[col_start, col_end]`
/// inclusive, preserving catalog order.
pub fn filter_counters_by_column(
    all_counters: &[CtCounter],
    col_start: u32,
    col_end: u32,
) -> Vec<CtCounter> {
    all_counters
        .iter()
        .filter(|c| (c.column as u32) >= col_start && (c.column as u32) <= col_end)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CounterRecord;
    use crate::config::{MetricsEntry, Settings};
    use crate::device::registers::TileCoord;

    fn record(column: u8, row: u8, counter_number: u8, module: &str, payload: u64) -> CounterRecord {
        CounterRecord {
            column,
            row,
            counter_number,
            module: module.to_string(),
            payload,
            name: String::new(),
        }
    }

    fn counter_at(column: u8) -> CtCounter {
        CtCounter {
            column,
            row: 2,
            counter_number: 0,
            module: "aie".to_string(),
            address: 0,
            metric_set: None,
            port_direction: None,
        }
    }

    fn settings_with(metrics: Vec<MetricsEntry>) -> Settings {
        Settings {
            device: None,
            geometry: None,
            metrics,
        }
    }

    fn entry(module: &str, metric_set: &str, col: u8, row: u8) -> MetricsEntry {
        MetricsEntry {
            module: module.to_string(),
            metric_set: metric_set.to_string(),
            tiles: vec![TileCoord { col, row }],
        }
    }

    #[test]
    fn test_throughput_classification() {
        assert!(is_throughput_metric("s2mm_throughput"));
        assert!(is_throughput_metric("read_bandwidth"));
        assert!(!is_throughput_metric("heat_map"));
        // Case-sensitive
        assert!(!is_throughput_metric("Read_Bandwidth"));
        assert!(!is_throughput_metric("THROUGHPUT"));
    }

    #[test]
    fn test_payload_bit_direction() {
        assert_eq!(
            port_direction("read_bandwidth", 1 << 8),
            Some(PortDirection::Output)
        );
        assert_eq!(
            port_direction("read_bandwidth", 0),
            Some(PortDirection::Input)
        );
        assert_eq!(
            port_direction("ddr_bandwidth", 0x100),
            Some(PortDirection::Output)
        );
        assert_eq!(
            port_direction("write_bandwidth", 0xFF),
            Some(PortDirection::Input)
        );
    }

    #[test]
    fn test_name_based_direction_ignores_payload() {
        assert_eq!(
            port_direction("s2mm_throughput", 1 << 8),
            Some(PortDirection::Input)
        );
        assert_eq!(
            port_direction("mm2s_throughput", 0),
            Some(PortDirection::Output)
        );
        assert_eq!(
            port_direction("input_bandwidth_total", 1 << 8),
            Some(PortDirection::Input)
        );
        assert_eq!(
            port_direction("output_throughput", 0),
            Some(PortDirection::Output)
        );
    }

    #[test]
    fn test_directionless_throughput() {
        assert_eq!(port_direction("aggregate_bandwidth", 0), None);
    }

    #[test]
    fn test_filter_by_column_is_partition_like() {
        let all: Vec<CtCounter> = [8u8, 9, 11, 12, 3].iter().map(|&c| counter_at(c)).collect();

        let filtered = filter_counters_by_column(&all, 8, 11);
        assert_eq!(
            filtered.iter().map(|c| c.column).collect::<Vec<_>>(),
            vec![8, 9, 11]
        );

        // Bounds are inclusive on both ends; outside columns appear nowhere
        let low_band = filter_counters_by_column(&all, 0, 3);
        assert_eq!(low_band.len(), 1);
        assert_eq!(low_band[0].column, 3);

        let empty = filter_counters_by_column(&all, 16, 19);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_build_counters_resolves_metric_sets() {
        let mut catalog = StaticCatalog::new();
        catalog.add_counter(0, record(8, 2, 0, "aie", 0));
        catalog.add_counter(0, record(9, 2, 1, "aie", 0));

        let settings = settings_with(vec![entry("aie", "heat_map", 8, 2)]);
        let config = settings.create_profile_config();

        let counters = build_counters(&catalog, 0, &config, AieGeometry::default());
        assert_eq!(counters.len(), 2);

        assert_eq!(counters[0].metric_set.as_deref(), Some("heat_map"));
        assert_eq!(counters[0].port_direction, None);

        // No tile configuration for (9, 2)
        assert_eq!(counters[1].metric_set, None);
        assert_eq!(counters[1].port_direction, None);
    }

    #[test]
    fn test_build_counters_throughput_direction() {
        let mut catalog = StaticCatalog::new();
        catalog.add_counter(0, record(8, 0, 0, "interface_tile", 1 << 8));
        catalog.add_counter(0, record(8, 0, 1, "interface_tile", 0));

        let settings = settings_with(vec![entry("interface_tile", "read_bandwidth", 8, 0)]);
        let config = settings.create_profile_config();

        let counters = build_counters(&catalog, 0, &config, AieGeometry::default());
        assert_eq!(counters[0].port_direction, Some(PortDirection::Output));
        assert_eq!(counters[1].port_direction, Some(PortDirection::Input));
    }

    #[test]
    fn test_build_counters_addresses() {
        let mut catalog = StaticCatalog::new();
        catalog.add_counter(0, record(1, 2, 0, "aie", 0));
        catalog.add_counter(0, record(1, 2, 1, "not_a_module", 0));

        let counters = build_counters(
            &catalog,
            0,
            &ProfileConfig::default(),
            AieGeometry::default(),
        );

        let base = (1u64 << 25) | (2u64 << 20);
        assert_eq!(counters[0].address, base + 0x0003_7520);
        // Unknown module label keeps the core offset; counter 1 is 4 bytes up
        assert_eq!(counters[1].address, base + 0x0003_7520 + 4);
        // The raw label is preserved for output
        assert_eq!(counters[1].module, "not_a_module");
    }

    #[test]
    fn test_build_counters_unknown_device() {
        let catalog = StaticCatalog::new();
        let counters = build_counters(
            &catalog,
            42,
            &ProfileConfig::default(),
            AieGeometry::default(),
        );
        assert!(counters.is_empty());
    }
}
