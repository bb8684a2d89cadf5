//! Performance-counter register addressing.
//!
//! Counter value registers are addressed by packing the tile coordinates
//! into the high bits and adding a module-specific base offset:
//!
//! ```text
//! address = (col << COLUMN_SHIFT) | (row << ROW_SHIFT)
//!         + module base offset
//!         + 4 * counter number
//!
//! For AIE2 devices:
//!   COLUMN_SHIFT = 25
//!   ROW_SHIFT    = 20
//! ```
//!
//! The shift amounts vary per device generation and are supplied by the
//! profiling settings; the base offsets locate the first counter value
//! register of each module within its tile.

use serde::Deserialize;
use std::fmt;

/// First core-module counter value register (offset within the tile).
pub const CORE_MODULE_BASE_OFFSET: u64 = 0x0003_7520;

/// First memory-module counter value register.
pub const MEMORY_MODULE_BASE_OFFSET: u64 = 0x0001_1020;

/// First memory-tile counter value register.
pub const MEM_TILE_BASE_OFFSET: u64 = 0x0009_1020;

/// First interface-tile counter value register.
pub const SHIM_TILE_BASE_OFFSET: u64 = 0x0003_1020;

/// Tile coordinate within the AIE array.
///
/// Ordered by `(col, row)` so tiles can key ordered collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct TileCoord {
    /// Column index
    pub col: u8,
    /// Row index
    pub row: u8,
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile({},{})", self.col, self.row)
    }
}

/// Module hosting a performance counter within a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterModule {
    /// AIE core module ("aie")
    Core,
    /// Memory module of a compute tile ("aie_memory")
    Memory,
    /// Dedicated memory tile ("memory_tile")
    MemTile,
    /// Interface/shim tile ("interface_tile")
    Shim,
}

impl CounterModule {
    /// Parse an external module label.
    ///
    /// Unrecognized labels resolve to [`CounterModule::Core`], matching the
    /// runtime's long-standing fallback.
    /// TODO: validate labels against the device catalog once additional
    /// module types ship, instead of falling back to the core offset.
    pub fn from_label(label: &str) -> Self {
        match label {
            "aie" => CounterModule::Core,
            "aie_memory" => CounterModule::Memory,
            "memory_tile" => CounterModule::MemTile,
            "interface_tile" => CounterModule::Shim,
            _ => CounterModule::Core,
        }
    }

    /// Base offset of this module's first counter value register.
    pub fn base_offset(self) -> u64 {
        match self {
            CounterModule::Core => CORE_MODULE_BASE_OFFSET,
            CounterModule::Memory => MEMORY_MODULE_BASE_OFFSET,
            CounterModule::MemTile => MEM_TILE_BASE_OFFSET,
            CounterModule::Shim => SHIM_TILE_BASE_OFFSET,
        }
    }
}

impl fmt::Display for CounterModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterModule::Core => write!(f, "Core"),
            CounterModule::Memory => write!(f, "Memory"),
            CounterModule::MemTile => write!(f, "MemTile"),
            CounterModule::Shim => write!(f, "Shim"),
        }
    }
}

/// Column/row bit positions used to pack tile coordinates into addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AieGeometry {
    /// Bit position of the column field
    pub column_shift: u8,
    /// Bit position of the row field
    pub row_shift: u8,
}

impl Default for AieGeometry {
    fn default() -> Self {
        // AIE2 address layout: [col:7][row:5][offset:20]
        Self {
            column_shift: 25,
            row_shift: 20,
        }
    }
}

/// Compute the absolute register address of one performance counter.
///
/// Pure function of the tile coordinates, counter number, module, and the
/// device's shift amounts. Consecutive counter numbers are 4 bytes apart.
pub fn counter_address(
    col: u8,
    row: u8,
    counter_number: u8,
    module: CounterModule,
    geometry: AieGeometry,
) -> u64 {
    let tile_address =
        ((col as u64) << geometry.column_shift) | ((row as u64) << geometry.row_shift);
    tile_address + module.base_offset() + (counter_number as u64) * 4
}

/// Format an address as `0x` followed by 10 lowercase hex digits.
pub fn format_address(address: u64) -> String {
    format!("0x{:010x}", address)
}
