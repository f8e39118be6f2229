//! Sealed log segments and the access interface over them.
//!
//! - `Segment`: one segment's bytes (owned or memory-mapped) plus the tick
//!   range of its valid markers
//! - `source`: the segment-access seam used by replication (SegmentSource,
//!   SegmentSelection, SegmentLease)
//! - `registry`: in-process SegmentSource with pin counts and barriers

pub mod registry;
pub mod source;

pub use registry::SegmentRegistry;
pub use source::{SegmentLease, SegmentSelection, SegmentSource};

use crate::format::MarkerKind;
use crate::wal::{scan_region, MarkerCursor, ReadStopReason};
use marklog_core::{Error, TickRange};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

/// Errors from opening or registering segments.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SegmentError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// First marker is a segment header with the wrong magic or version
    #[error("Segment {segment}: invalid header ({reason})")]
    InvalidHeader {
        /// Segment id
        segment: u64,
        /// What was wrong
        reason: String,
    },

    /// Header names a different segment than the file name
    #[error("Segment id mismatch: file says {expected}, header says {found}")]
    IdMismatch {
        /// Id from the file name
        expected: u64,
        /// Id from the header marker
        found: u64,
    },

    /// A segment with this id is already registered
    #[error("Segment {0} already registered")]
    Duplicate(u64),
}

impl From<SegmentError> for Error {
    fn from(e: SegmentError) -> Self {
        match e {
            SegmentError::IoError(msg) => Error::Io(msg),
            SegmentError::Duplicate(_) => Error::internal(e.to_string()),
            other => Error::corrupt(other.to_string()),
        }
    }
}

// ============================================================================
// SegmentData
// ============================================================================

/// Underlying storage for a sealed segment.
enum SegmentData {
    /// In-memory owned data
    Owned(Vec<u8>),
    /// Memory-mapped file data
    Mmap(memmap2::Mmap),
}

impl SegmentData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            SegmentData::Owned(v) => v,
            SegmentData::Mmap(m) => m,
        }
    }
}

impl std::fmt::Debug for SegmentData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentData::Owned(v) => write!(f, "Owned({} bytes)", v.len()),
            SegmentData::Mmap(m) => write!(f, "Mmap({} bytes)", m.len()),
        }
    }
}

// ============================================================================
// Segment
// ============================================================================

/// An immutable log segment.
///
/// The readable region is the whole buffer; decoding stops at the first
/// zero size field, so preallocated tails cost nothing. The tick range and
/// marker count are computed once, at construction, over the valid prefix.
#[derive(Debug)]
pub struct Segment {
    id: u64,
    data: SegmentData,
    tick_range: Option<TickRange>,
    marker_count: usize,
    stop_reason: ReadStopReason,
}

impl Segment {
    /// Create a segment from owned bytes.
    pub fn from_bytes(id: u64, bytes: Vec<u8>) -> Self {
        Self::from_data(id, SegmentData::Owned(bytes))
    }

    /// Map a segment file read-only and validate its header marker.
    pub fn open_mapped(path: &Path, id: u64) -> Result<Self, SegmentError> {
        let file = File::open(path).map_err(|e| SegmentError::IoError(e.to_string()))?;
        let len = file
            .metadata()
            .map_err(|e| SegmentError::IoError(e.to_string()))?
            .len();

        let data = if len == 0 {
            SegmentData::Owned(Vec::new())
        } else {
            // SAFETY: the mapping is read-only and sealed segments are never
            // modified in place; files are only removed after reclamation.
            let mmap = unsafe { memmap2::Mmap::map(&file) }
                .map_err(|e| SegmentError::IoError(e.to_string()))?;
            SegmentData::Mmap(mmap)
        };

        let segment = Self::from_data(id, data);
        segment.validate_header()?;
        Ok(segment)
    }

    fn from_data(id: u64, data: SegmentData) -> Self {
        let scan = scan_region(data.as_bytes(), true);
        if scan.stop_reason.is_corruption() {
            tracing::warn!(
                target: "marklog::segment",
                segment = id,
                reason = %scan.stop_reason,
                valid_markers = scan.marker_count,
                "Segment has a corrupt marker; readable prefix ends there"
            );
        }
        Segment {
            id,
            data,
            tick_range: scan.tick_range,
            marker_count: scan.marker_count,
            stop_reason: scan.stop_reason,
        }
    }

    fn validate_header(&self) -> Result<(), SegmentError> {
        let first = match self.cursor().next_marker() {
            Some(marker) => marker,
            None => return Ok(()),
        };
        let header = match first.segment_header() {
            Some(header) => header,
            None => return Ok(()),
        };
        if !header.is_valid() {
            return Err(SegmentError::InvalidHeader {
                segment: self.id,
                reason: format!(
                    "magic {:?}, version {}",
                    header.magic, header.format_version
                ),
            });
        }
        if header.segment_id != self.id {
            return Err(SegmentError::IdMismatch {
                expected: self.id,
                found: header.segment_id,
            });
        }
        Ok(())
    }

    /// Segment id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Min/max tick over the valid markers, `None` for an empty segment.
    pub fn tick_range(&self) -> Option<TickRange> {
        self.tick_range
    }

    /// Number of valid markers.
    pub fn marker_count(&self) -> usize {
        self.marker_count
    }

    /// Why the construction scan stopped.
    pub fn stop_reason(&self) -> &ReadStopReason {
        &self.stop_reason
    }

    /// Whether the segment was sealed with a footer marker.
    pub fn is_sealed(&self) -> bool {
        self.cursor()
            .last()
            .map(|m| m.kind() == MarkerKind::SegmentFooter)
            .unwrap_or(false)
    }

    /// Whether the bytes come from a memory-mapped file.
    pub fn is_mapped(&self) -> bool {
        matches!(self.data, SegmentData::Mmap(_))
    }

    /// Readable region.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Size of the readable region in bytes.
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Whether the readable region is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Cursor over the markers, with checksum verification on.
    pub fn cursor(&self) -> MarkerCursor<'_> {
        MarkerCursor::new(self.bytes())
    }
}

// ============================================================================
// Segment files
// ============================================================================

/// Path of a segment file: `wal-NNNNNN.seg`.
pub fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("wal-{:06}.seg", id))
}

/// Parse the id out of a segment file name.
pub fn parse_segment_file_name(name: &str) -> Option<u64> {
    // "wal-" (4) + at least 6 digits + ".seg" (4)
    let digits = name.strip_prefix("wal-")?.strip_suffix(".seg")?;
    if digits.len() < 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List segment ids in a directory, ascending.
pub fn list_segment_files(dir: &Path) -> Result<Vec<u64>, SegmentError> {
    let mut ids = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| SegmentError::IoError(e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| SegmentError::IoError(e.to_string()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(id) = parse_segment_file_name(&name) {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}
