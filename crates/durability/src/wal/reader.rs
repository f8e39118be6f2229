//! Marker decoding over a segment's readable region.
//!
//! [`MarkerCursor`] walks a byte region marker by marker without copying.
//! It stops at the first slot that is not a well-formed marker and records
//! why in [`ReadStopReason`]; a zero size field is the normal end of the
//! written part of a segment, everything else is corruption.

use crate::format::marker::{
    aligned_size, compute_checksum, read_kind, read_size, stored_checksum, Marker, MarkerKind,
    MARKER_HEADER_SIZE, MAX_MARKER_SIZE,
};
use marklog_core::TickRange;

/// Reason why decoding stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStopReason {
    /// Consumed the region up to its last byte
    EndOfData,
    /// Hit a zero size field: end of the written part of the segment
    ZeroSize {
        /// Byte offset of the empty slot
        offset: usize,
    },
    /// Kind byte does not name a known marker kind
    InvalidKind {
        /// Byte offset of the marker
        offset: usize,
        /// Offending kind byte
        kind: u8,
    },
    /// Size field runs past the region or below the kind's fixed fields
    Truncated {
        /// Byte offset of the marker
        offset: usize,
        /// Size field value
        size: usize,
    },
    /// CRC32 over the marker body does not match the stored checksum
    ChecksumMismatch {
        /// Byte offset of the marker
        offset: usize,
        /// Stored checksum
        expected: u32,
        /// Checksum computed over the bytes read
        computed: u32,
    },
}

impl ReadStopReason {
    /// Whether decoding stopped because of malformed data rather than at
    /// the end of the written region.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ReadStopReason::InvalidKind { .. }
                | ReadStopReason::Truncated { .. }
                | ReadStopReason::ChecksumMismatch { .. }
        )
    }

    /// Offset where decoding stopped, if not at the end of the region.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ReadStopReason::EndOfData => None,
            ReadStopReason::ZeroSize { offset }
            | ReadStopReason::InvalidKind { offset, .. }
            | ReadStopReason::Truncated { offset, .. }
            | ReadStopReason::ChecksumMismatch { offset, .. } => Some(*offset),
        }
    }
}

impl std::fmt::Display for ReadStopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadStopReason::EndOfData => write!(f, "end of data"),
            ReadStopReason::ZeroSize { offset } => write!(f, "zero size at offset {}", offset),
            ReadStopReason::InvalidKind { offset, kind } => {
                write!(f, "invalid marker kind {:#04x} at offset {}", kind, offset)
            }
            ReadStopReason::Truncated { offset, size } => {
                write!(f, "truncated marker of size {} at offset {}", size, offset)
            }
            ReadStopReason::ChecksumMismatch {
                offset,
                expected,
                computed,
            } => write!(
                f,
                "checksum mismatch at offset {} (expected {:#010x}, computed {:#010x})",
                offset, expected, computed
            ),
        }
    }
}

/// Zero-copy cursor over the markers of a readable region.
///
/// Yields markers in file order. Once it stops, it stays stopped and
/// [`MarkerCursor::stop_reason`] reports why.
#[derive(Debug, Clone)]
pub struct MarkerCursor<'a> {
    region: &'a [u8],
    position: usize,
    verify_checksums: bool,
    stop: Option<ReadStopReason>,
}

impl<'a> MarkerCursor<'a> {
    /// Create a cursor at the start of `region`, with checksum verification on.
    pub fn new(region: &'a [u8]) -> Self {
        MarkerCursor {
            region,
            position: 0,
            verify_checksums: true,
            stop: None,
        }
    }

    /// Enable or disable CRC verification.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Offset of the next marker to decode.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Why decoding stopped, or `None` while markers remain.
    pub fn stop_reason(&self) -> Option<&ReadStopReason> {
        self.stop.as_ref()
    }

    /// Decode the next marker.
    pub fn next_marker(&mut self) -> Option<Marker<'a>> {
        if self.stop.is_some() {
            return None;
        }
        match self.decode_at(self.position) {
            Ok((marker, advance)) => {
                self.position += advance;
                Some(marker)
            }
            Err(reason) => {
                self.stop = Some(reason);
                None
            }
        }
    }

    fn decode_at(&self, offset: usize) -> Result<(Marker<'a>, usize), ReadStopReason> {
        let remaining = &self.region[offset..];
        if remaining.is_empty() {
            return Err(ReadStopReason::EndOfData);
        }
        if remaining.len() < 4 {
            // Not even a size field: trailing padding if zeroed
            if remaining.iter().all(|b| *b == 0) {
                return Err(ReadStopReason::ZeroSize { offset });
            }
            return Err(ReadStopReason::Truncated {
                offset,
                size: remaining.len(),
            });
        }

        let size = read_size(remaining);
        if size == 0 {
            return Err(ReadStopReason::ZeroSize { offset });
        }
        if remaining.len() < MARKER_HEADER_SIZE || size < MARKER_HEADER_SIZE {
            return Err(ReadStopReason::Truncated { offset, size });
        }

        let code = read_kind(remaining);
        let kind = MarkerKind::from_u8(code).ok_or(ReadStopReason::InvalidKind { offset, kind: code })?;

        if size < kind.fixed_size() || size > remaining.len() || size > MAX_MARKER_SIZE {
            return Err(ReadStopReason::Truncated { offset, size });
        }

        let bytes = &remaining[..size];
        if self.verify_checksums {
            let expected = stored_checksum(bytes);
            let computed = compute_checksum(bytes);
            if expected != computed {
                return Err(ReadStopReason::ChecksumMismatch {
                    offset,
                    expected,
                    computed,
                });
            }
        }

        // The last marker of a region may omit its padding
        let advance = aligned_size(size).min(remaining.len());
        Ok((Marker::new(bytes, kind, offset), advance))
    }
}

impl<'a> Iterator for MarkerCursor<'a> {
    type Item = Marker<'a>;

    fn next(&mut self) -> Option<Marker<'a>> {
        self.next_marker()
    }
}

/// Summary of one full pass over a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionScan {
    /// Min/max tick over the valid markers, `None` if there were none
    pub tick_range: Option<TickRange>,
    /// Number of valid markers
    pub marker_count: usize,
    /// Bytes covered by the valid markers
    pub valid_end: usize,
    /// Why the pass stopped
    pub stop_reason: ReadStopReason,
}

/// Scan a region once and summarize its valid prefix.
///
/// The segment header marker is framing and carries the tick the segment
/// was opened at, so it contributes to the tick range like any marker.
pub fn scan_region(region: &[u8], verify_checksums: bool) -> RegionScan {
    let mut cursor = MarkerCursor::new(region).verify_checksums(verify_checksums);
    let mut tick_range: Option<TickRange> = None;
    let mut marker_count = 0;

    while let Some(marker) = cursor.next_marker() {
        let tick = marker.tick();
        match tick_range.as_mut() {
            Some(range) => range.include(tick),
            None => tick_range = Some(TickRange::single(tick)),
        }
        marker_count += 1;
    }

    RegionScan {
        tick_range,
        marker_count,
        valid_end: cursor.position(),
        stop_reason: cursor
            .stop_reason()
            .cloned()
            .unwrap_or(ReadStopReason::EndOfData),
    }
}
