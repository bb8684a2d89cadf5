//! aie-profile-ct library
//!
//! Counter-trace (CT) script generation for AIE performance counter
//! profiling: given the configured hardware counters of a device and the
//! instrumentation points discovered in its runtime control files, produce
//! the CT script that captures counter values at each point.

pub mod catalog;
pub mod config;
pub mod device;
pub mod parser;
pub mod profile;
