//! On-disk byte format of log segments.
//!
//! - `marker`: marker header layout, kind registry, borrowed marker view
//! - `builder`: marker and segment encoder

pub mod builder;
pub mod marker;

pub use builder::{encode_marker, MarkerFields, SegmentBuilder};
pub use marker::{
    aligned_size, Marker, MarkerKind, SegmentHeaderFields, TransactionAction, MARKER_ALIGNMENT,
    MARKER_HEADER_SIZE, MAX_MARKER_SIZE, SEGMENT_FORMAT_VERSION, SEGMENT_MAGIC,
};
