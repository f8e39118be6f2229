//! Identifier and tick types shared by every layer.
//!
//! All identifiers are plain `u64` values. `0` is reserved as "none" for
//! database, collection and transaction ids, which is also how filters
//! express "any".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical timestamp assigned to every log marker. Strictly increasing.
pub type Tick = u64;

/// Numeric database identifier (`0` = none / any).
pub type DatabaseId = u64;

/// Numeric, transient collection identifier (`0` = none / any).
pub type CollectionId = u64;

/// Transaction identifier (`0` = not part of a transaction).
pub type TransactionId = u64;

/// Inclusive range of ticks `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    /// Smallest tick in the range
    pub min: Tick,
    /// Largest tick in the range
    pub max: Tick,
}

impl TickRange {
    /// Create a range. Swaps the bounds if they are given in reverse.
    pub fn new(min: Tick, max: Tick) -> Self {
        if min <= max {
            TickRange { min, max }
        } else {
            TickRange { min: max, max: min }
        }
    }

    /// Range covering a single tick.
    pub fn single(tick: Tick) -> Self {
        TickRange {
            min: tick,
            max: tick,
        }
    }

    /// Whether `tick` lies inside the range (both ends inclusive).
    pub fn contains(&self, tick: Tick) -> bool {
        self.min <= tick && tick <= self.max
    }

    /// Extend the range so that it also covers `tick`.
    pub fn include(&mut self, tick: Tick) {
        self.min = self.min.min(tick);
        self.max = self.max.max(tick);
    }

    /// Smallest range covering both `self` and `other`.
    pub fn union(&self, other: &TickRange) -> TickRange {
        TickRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether the range has any tick in the half-open interval `(start, end]`.
    pub fn overlaps_after(&self, start: Tick, end: Tick) -> bool {
        self.max > start && self.min <= end
    }

    /// Union of all ranges, `None` if the iterator is empty.
    pub fn merge_all<'a, I>(ranges: I) -> Option<TickRange>
    where
        I: IntoIterator<Item = &'a TickRange>,
    {
        ranges
            .into_iter()
            .fold(None, |acc: Option<TickRange>, range| match acc {
                Some(acc) => Some(acc.union(range)),
                None => Some(*range),
            })
    }
}

impl fmt::Display for TickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
