//! Counter-trace generation pipeline.
//!
//! - [`counters`] - counter catalog construction and column-range filtering
//! - [`ct_writer`] - CT script rendering and orchestration

pub mod counters;
pub mod ct_writer;

pub use counters::{CtCounter, PortDirection};
pub use ct_writer::CtWriter;
