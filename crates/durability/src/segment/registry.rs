//! In-process segment registry.
//!
//! Holds the sealed segments of one log, ordered by segment id, with a pin
//! count per segment and a set of barriers. Pins keep a segment alive while
//! a reader has it; barriers keep every segment holding ticks at or above a
//! follower's position alive until they expire. Reclamation honors both.

use super::source::{SegmentSelection, SegmentSource};
use super::{list_segment_files, segment_path, Segment, SegmentError};
use marklog_core::{Result, Tick, TickRange};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug)]
struct Entry {
    segment: Arc<Segment>,
    pins: usize,
}

#[derive(Debug, Clone, Copy)]
struct Barrier {
    min_tick: Tick,
    expires_at: Instant,
}

impl Barrier {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct Inner {
    segments: BTreeMap<u64, Entry>,
    barriers: FxHashMap<u64, Barrier>,
    next_barrier_id: u64,
    last_committed_tick: Tick,
    /// Highest tick of any reclaimed segment
    reclaimed_through: Tick,
}

impl Inner {
    fn max_tick(&self) -> Option<Tick> {
        self.segments
            .values()
            .filter_map(|e| e.segment.tick_range())
            .map(|r| r.max)
            .max()
    }
}

/// Thread-safe [`SegmentSource`] over in-memory or memory-mapped segments.
#[derive(Debug, Default)]
pub struct SegmentRegistry {
    inner: Mutex<Inner>,
}

impl SegmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every `wal-NNNNNN.seg` file in `dir` and register it.
    ///
    /// The committed tick starts at the highest tick found.
    pub fn open_dir(dir: &Path) -> Result<Self> {
        let registry = Self::new();
        for id in list_segment_files(dir)? {
            let segment = Segment::open_mapped(&segment_path(dir, id), id)?;
            debug!(
                target: "marklog::segment",
                segment = id,
                markers = segment.marker_count(),
                range = ?segment.tick_range(),
                "Mapped segment"
            );
            registry.add_segment(segment)?;
        }

        let last = registry.inner.lock().max_tick().unwrap_or(0);
        registry.set_last_committed_tick(last);
        info!(
            target: "marklog::segment",
            dir = %dir.display(),
            segments = registry.segment_count(),
            last_tick = last,
            "Opened segment directory"
        );
        Ok(registry)
    }

    /// Register a segment. Ids must be unique.
    ///
    /// The committed tick is raised to the segment's max tick if lower.
    pub fn add_segment(&self, segment: Segment) -> Result<()> {
        let mut inner = self.inner.lock();
        let id = segment.id();
        if inner.segments.contains_key(&id) {
            return Err(SegmentError::Duplicate(id).into());
        }
        if let Some(range) = segment.tick_range() {
            inner.last_committed_tick = inner.last_committed_tick.max(range.max);
        }
        inner.segments.insert(
            id,
            Entry {
                segment: Arc::new(segment),
                pins: 0,
            },
        );
        Ok(())
    }

    /// Set the committed tick reported to readers.
    pub fn set_last_committed_tick(&self, tick: Tick) {
        self.inner.lock().last_committed_tick = tick;
    }

    /// Number of registered segments.
    pub fn segment_count(&self) -> usize {
        self.inner.lock().segments.len()
    }

    /// Current pin count of a segment, `0` if unknown.
    pub fn pin_count(&self, id: u64) -> usize {
        self.inner
            .lock()
            .segments
            .get(&id)
            .map(|e| e.pins)
            .unwrap_or(0)
    }

    /// Create a barrier protecting ticks `>= min_tick` for `ttl`. Returns its id.
    pub fn create_barrier(&self, ttl: Duration, min_tick: Tick) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_barrier_id += 1;
        let id = inner.next_barrier_id;
        inner.barriers.insert(
            id,
            Barrier {
                min_tick,
                expires_at: Instant::now() + ttl,
            },
        );
        debug!(target: "marklog::segment", barrier = id, min_tick, "Created barrier");
        id
    }

    /// Remove a barrier. Returns whether it existed.
    pub fn remove_barrier(&self, id: u64) -> bool {
        self.inner.lock().barriers.remove(&id).is_some()
    }

    /// Minimum tick of a live barrier.
    pub fn barrier_min_tick(&self, id: u64) -> Option<Tick> {
        let now = Instant::now();
        self.inner
            .lock()
            .barriers
            .get(&id)
            .filter(|b| b.is_live(now))
            .map(|b| b.min_tick)
    }

    /// Drop segments whose ticks all lie below `tick`.
    ///
    /// Pinned segments and segments protected by a live barrier stay.
    /// Expired barriers are discarded first. Returns the reclaimed ids.
    pub fn reclaim_before(&self, tick: Tick) -> Vec<u64> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.barriers.retain(|_, b| b.is_live(now));
        let protected_from = inner
            .barriers
            .values()
            .map(|b| b.min_tick)
            .min()
            .unwrap_or(Tick::MAX);

        let reclaimable: Vec<(u64, Tick)> = inner
            .segments
            .iter()
            .filter(|(_, e)| e.pins == 0)
            .filter_map(|(id, e)| e.segment.tick_range().map(|r| (*id, r.max)))
            .filter(|(_, max)| *max < tick && *max < protected_from)
            .collect();

        let mut reclaimed = Vec::with_capacity(reclaimable.len());
        for (id, max) in reclaimable {
            inner.segments.remove(&id);
            inner.reclaimed_through = inner.reclaimed_through.max(max);
            reclaimed.push(id);
        }
        if !reclaimed.is_empty() {
            info!(
                target: "marklog::segment",
                count = reclaimed.len(),
                reclaimed_through = inner.reclaimed_through,
                "Reclaimed segments"
            );
        }
        reclaimed
    }
}

impl SegmentSource for SegmentRegistry {
    fn ranges(&self) -> Vec<TickRange> {
        let inner = self.inner.lock();
        let mut ranges: Vec<TickRange> = inner
            .segments
            .values()
            .filter_map(|e| e.segment.tick_range())
            .collect();
        ranges.sort_by_key(|r| r.min);
        ranges
    }

    fn last_committed_tick(&self) -> Tick {
        self.inner.lock().last_committed_tick
    }

    fn acquire_range(&self, tick_start: Tick, tick_end: Tick) -> Result<SegmentSelection> {
        let mut inner = self.inner.lock();

        // Data at the start tick is available if nothing at or after it was
        // reclaimed and the log reaches that far.
        let from_tick_included = match inner.max_tick() {
            Some(max) => inner.reclaimed_through <= tick_start && tick_start <= max,
            None => false,
        };

        let mut selected: Vec<(Tick, Arc<Segment>)> = Vec::new();
        for entry in inner.segments.values_mut() {
            let range = match entry.segment.tick_range() {
                Some(range) => range,
                None => continue,
            };
            if range.overlaps_after(tick_start, tick_end) {
                entry.pins += 1;
                selected.push((range.min, Arc::clone(&entry.segment)));
            }
        }
        selected.sort_by_key(|(min, _)| *min);

        Ok(SegmentSelection {
            segments: selected.into_iter().map(|(_, s)| s).collect(),
            from_tick_included,
        })
    }

    fn release(&self, segments: &[Arc<Segment>]) {
        let mut inner = self.inner.lock();
        for segment in segments {
            if let Some(entry) = inner.segments.get_mut(&segment.id()) {
                entry.pins = entry.pins.saturating_sub(1);
            }
        }
    }

    fn extend_barrier(&self, barrier_id: u64, ttl: Duration, min_tick: Tick) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.barriers.get_mut(&barrier_id) {
            Some(barrier) if barrier.is_live(now) => {
                barrier.min_tick = min_tick;
                barrier.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }
}
