//! Device addressing for AIE tile arrays.
//!
//! AIE devices are organized as a grid of tiles addressed by
//! `(column, row)`. Each tile hosts one or more modules (core, memory,
//! memory tile, interface tile), and each module owns a small bank of
//! performance counters:
//!
//! ```text
//!     Col 0    Col 1    Col 2    Col 3
//!   +--------+--------+--------+--------+
//! 3 |Compute |Compute |Compute |Compute |  <- core + memory modules
//!   +--------+--------+--------+--------+
//! 2 |Compute |Compute |Compute |Compute |
//!   +--------+--------+--------+--------+
//! 1 |MemTile |MemTile |MemTile |MemTile |
//!   +--------+--------+--------+--------+
//! 0 | Shim   | Shim   | Shim   | Shim   |  <- interface tiles
//!   +--------+--------+--------+--------+
//! ```
//!
//! [`registers`] packs a tile coordinate, module, and counter number into
//! the absolute register address read by the generated CT script.

pub mod registers;

pub use registers::{
    counter_address, format_address, AieGeometry, CounterModule, TileCoord,
};
