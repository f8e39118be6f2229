//! Log reading
//!
//! - `reader`: zero-copy marker cursor (MarkerCursor, ReadStopReason)

pub mod reader;

pub use reader::{scan_region, MarkerCursor, ReadStopReason, RegionScan};
