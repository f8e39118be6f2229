//! Log segment layer for marklog
//!
//! This crate owns everything about the bytes of the log:
//!
//! - Marker format: header layout, kind registry, zero-copy marker views
//! - Segment encoder (SegmentBuilder) for tooling and tests
//! - MarkerCursor: bounded decoding that stops at the first malformed marker
//! - Segments backed by owned buffers or read-only memory maps
//! - SegmentSource: the access seam replication reads through, with
//!   pinning and barrier extension
//! - SegmentRegistry: in-process SegmentSource with reclamation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod segment;
pub mod wal;

pub use format::{
    encode_marker, Marker, MarkerFields, MarkerKind, SegmentBuilder, TransactionAction,
};
pub use segment::{
    list_segment_files, segment_path, Segment, SegmentError, SegmentLease, SegmentRegistry,
    SegmentSelection, SegmentSource,
};
pub use wal::{MarkerCursor, ReadStopReason};
