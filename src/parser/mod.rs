//! Input parsers for the CT generator.
//!
//! - [`timestamps`] - instrumentation-point CSV produced by the assembly
//!   preprocessing step

pub mod timestamps;

pub use timestamps::{read_asm_info, AsmFileInfo, TimestampPoint};
