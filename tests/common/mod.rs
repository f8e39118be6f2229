//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use marklog::{
    DatabaseRef, Filter, InMemoryCatalog, Record, Segment, SegmentBuilder, SegmentRegistry, Tick,
    TailConfig, TailResult, WalAccess,
};
use marklog_durability::segment_path;
use std::path::Path;
use std::sync::{Arc, Once};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Catalog
// ============================================================================

/// Database id of the standard test database "db1".
pub const DB: u64 = 1;
/// `users` collection, cuid "9"
pub const USERS: u64 = 9;
/// `orders` collection, cuid "10"
pub const ORDERS: u64 = 10;
/// `_graphs` system collection
pub const GRAPHS: u64 = 11;
/// `_statistics` node-local system collection
pub const STATISTICS: u64 = 12;

/// Catalog with one database and a mix of regular and system collections.
pub fn standard_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    catalog.create_database(DB, "db1").unwrap();
    catalog.create_collection(DB, USERS, "users", "9").unwrap();
    catalog.create_collection(DB, ORDERS, "orders", "10").unwrap();
    catalog.create_collection(DB, GRAPHS, "_graphs", "11").unwrap();
    catalog
        .create_collection(DB, STATISTICS, "_statistics", "12")
        .unwrap();
    catalog
}

// ============================================================================
// TestLog - registry, catalog and facade in one place
// ============================================================================

/// A log assembled from in-memory segments.
pub struct TestLog {
    pub registry: Arc<SegmentRegistry>,
    pub catalog: Arc<InMemoryCatalog>,
    pub access: WalAccess,
}

impl TestLog {
    /// Log over `segments` (numbered from 1) with the standard catalog.
    pub fn new(segments: Vec<Vec<u8>>) -> Self {
        Self::with_catalog(segments, standard_catalog())
    }

    /// Log over `segments` with a custom catalog.
    pub fn with_catalog(segments: Vec<Vec<u8>>, catalog: InMemoryCatalog) -> Self {
        init_tracing();
        let registry = Arc::new(SegmentRegistry::new());
        for (i, bytes) in segments.into_iter().enumerate() {
            registry
                .add_segment(Segment::from_bytes(i as u64 + 1, bytes))
                .unwrap();
        }
        Self::from_registry(registry, catalog)
    }

    /// Log over an existing registry.
    pub fn from_registry(registry: Arc<SegmentRegistry>, catalog: InMemoryCatalog) -> Self {
        init_tracing();
        let catalog = Arc::new(catalog);
        let access = WalAccess::new(
            registry.clone(),
            catalog.clone(),
            TailConfig::for_testing(),
        )
        .unwrap();
        TestLog {
            registry,
            catalog,
            access,
        }
    }

    /// One tail call, collecting the records.
    pub fn tail(
        &self,
        tick_start: Tick,
        tick_end: Tick,
        budget: usize,
        filter: &Filter,
    ) -> (Vec<Record>, TailResult) {
        collect_tail(&self.access, tick_start, tick_end, budget, filter)
    }

    /// Tail `(tick_start, tick_end]` in chunks until the range is exhausted.
    pub fn tail_chunked(
        &self,
        tick_start: Tick,
        tick_end: Tick,
        budget: usize,
        filter: &Filter,
    ) -> Vec<Record> {
        let mut all = Vec::new();
        let mut start = tick_start;
        loop {
            let (records, result) = self.tail(start, tick_end, budget, filter);
            assert!(result.is_ok(), "tail failed: {:?}", result.error);
            all.extend(records);
            if !result.has_more {
                break;
            }
            start = result.last_included_tick;
        }
        all
    }
}

/// One tail call against `access`, collecting the records.
pub fn collect_tail(
    access: &WalAccess,
    tick_start: Tick,
    tick_end: Tick,
    budget: usize,
    filter: &Filter,
) -> (Vec<Record>, TailResult) {
    let mut records = Vec::new();
    let result = access.tail(tick_start, tick_end, budget, 0, filter, |_, record| {
        records.push(record.clone())
    });
    (records, result)
}

/// Ticks of `records`, in order.
pub fn ticks(records: &[Record]) -> Vec<Tick> {
    records.iter().map(|r| r.tick).collect()
}

/// Filter for everything in the standard database, system collections included.
pub fn db_filter() -> Filter {
    Filter::new().with_database(DB).with_include_system(true)
}

// ============================================================================
// Segment construction
// ============================================================================

/// A sealed segment with one document per tick in `ticks`, all in `users`.
pub fn document_segment(id: u64, ticks: std::ops::RangeInclusive<Tick>) -> Vec<u8> {
    let (first, last) = (*ticks.start(), *ticks.end());
    let mut builder = SegmentBuilder::new(id, first);
    builder.prologue(first, DB, USERS);
    for tick in ticks {
        let payload = format!(r#"{{"_key":"k{}","value":{}}}"#, tick, tick);
        builder.document(tick, 0, payload.as_bytes());
    }
    builder.footer(last);
    builder.finish().unwrap()
}

/// Write segments as `wal-NNNNNN.seg` files, numbered from 1.
pub fn write_segment_files(dir: &Path, segments: &[Vec<u8>]) {
    for (i, bytes) in segments.iter().enumerate() {
        std::fs::write(segment_path(dir, i as u64 + 1), bytes).unwrap();
    }
}
