//! Segment-access seam
//!
//! Replication reads the log through [`SegmentSource`]: it asks for the
//! segments overlapping a tick range, reads them, and hands them back. While
//! a segment is acquired the source must not reclaim it.

use super::Segment;
use marklog_core::{Result, Tick, TickRange};
use std::sync::Arc;
use std::time::Duration;

/// Segments selected for a tick range, pinned until released.
#[derive(Debug, Default)]
pub struct SegmentSelection {
    /// Selected segments in ascending tick order
    pub segments: Vec<Arc<Segment>>,
    /// Whether log data at the requested start tick is still available
    pub from_tick_included: bool,
}

/// Access to the sealed segments of a log.
///
/// Implementations must be thread-safe: several tailing calls acquire and
/// release segments concurrently.
pub trait SegmentSource: Send + Sync {
    /// Tick ranges of all available segments, ascending.
    fn ranges(&self) -> Vec<TickRange>;

    /// Highest tick known to be committed.
    fn last_committed_tick(&self) -> Tick;

    /// Pin and return the segments holding any tick in `(tick_start, tick_end]`.
    fn acquire_range(&self, tick_start: Tick, tick_end: Tick) -> Result<SegmentSelection>;

    /// Unpin segments returned by [`SegmentSource::acquire_range`].
    fn release(&self, segments: &[Arc<Segment>]);

    /// Keep segments holding ticks `>= min_tick` for another `ttl`.
    /// Returns `false` if no barrier with this id exists.
    fn extend_barrier(&self, barrier_id: u64, ttl: Duration, min_tick: Tick) -> bool;
}

impl<S: SegmentSource + ?Sized> SegmentSource for Arc<S> {
    fn ranges(&self) -> Vec<TickRange> {
        (**self).ranges()
    }

    fn last_committed_tick(&self) -> Tick {
        (**self).last_committed_tick()
    }

    fn acquire_range(&self, tick_start: Tick, tick_end: Tick) -> Result<SegmentSelection> {
        (**self).acquire_range(tick_start, tick_end)
    }

    fn release(&self, segments: &[Arc<Segment>]) {
        (**self).release(segments)
    }

    fn extend_barrier(&self, barrier_id: u64, ttl: Duration, min_tick: Tick) -> bool {
        (**self).extend_barrier(barrier_id, ttl, min_tick)
    }
}

/// Acquired segments, released when dropped.
///
/// Every exit path of a reading call, early returns and errors included,
/// releases exactly what it acquired.
pub struct SegmentLease<'s> {
    source: &'s dyn SegmentSource,
    segments: Vec<Arc<Segment>>,
    from_tick_included: bool,
}

impl<'s> SegmentLease<'s> {
    /// Acquire the segments for `(tick_start, tick_end]`.
    pub fn acquire(source: &'s dyn SegmentSource, tick_start: Tick, tick_end: Tick) -> Result<Self> {
        let selection = source.acquire_range(tick_start, tick_end)?;
        Ok(SegmentLease {
            source,
            segments: selection.segments,
            from_tick_included: selection.from_tick_included,
        })
    }

    /// Acquired segments, ascending by tick.
    pub fn segments(&self) -> &[Arc<Segment>] {
        &self.segments
    }

    /// Whether data at the start tick was still available.
    pub fn from_tick_included(&self) -> bool {
        self.from_tick_included
    }
}

impl Drop for SegmentLease<'_> {
    fn drop(&mut self) {
        if !self.segments.is_empty() {
            self.source.release(&self.segments);
        }
    }
}

impl std::fmt::Debug for SegmentLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentLease")
            .field(
                "segments",
                &self.segments.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("from_tick_included", &self.from_tick_included)
            .finish()
    }
}
