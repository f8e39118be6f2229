//! Concurrent Schema Change Tests
//!
//! Tailing while collections and databases are dropped and segments are
//! reclaimed. Calls must finish cleanly; objects that vanish mid-call are
//! skipped, never reported as errors.

use crate::common::*;
use marklog::{SegmentBuilder, SegmentSource, Tick};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn interleaved_log(segments: u64, per_segment: u64) -> TestLog {
    let mut all = Vec::new();
    for id in 1..=segments {
        let base = (id - 1) * (per_segment * 2 + 1) + 1;
        let mut builder = SegmentBuilder::new(id, base);
        for i in 0..per_segment {
            let tick = base + 1 + i * 2;
            let collection = if i % 2 == 0 { USERS } else { ORDERS };
            builder
                .prologue(tick, DB, collection)
                .document(tick + 1, 0, br#"{"_key":"k"}"#);
        }
        all.push(builder.finish().unwrap());
    }
    TestLog::new(all)
}

fn strictly_increasing(ticks: &[Tick]) -> bool {
    ticks.windows(2).all(|w| w[0] < w[1])
}

#[test]
fn test_tail_while_collection_dropped() {
    let log = Arc::new(interleaved_log(8, 200));
    let filter = db_filter();
    let (before, _) = log.tail(0, u64::MAX, usize::MAX, &filter);
    let start = Arc::new(Barrier::new(5));

    let tailers: Vec<_> = (0..4)
        .map(|_| {
            let log = Arc::clone(&log);
            let start = Arc::clone(&start);
            let filter = filter.clone();
            thread::spawn(move || {
                start.wait();
                let mut runs = Vec::new();
                for _ in 0..10 {
                    runs.push(log.tail(0, u64::MAX, usize::MAX, &filter));
                }
                runs
            })
        })
        .collect();

    start.wait();
    log.catalog.drop_collection(DB, ORDERS);

    for handle in tailers {
        for (records, result) in handle.join().unwrap() {
            assert!(result.is_ok(), "tail failed: {:?}", result.error);
            assert!(strictly_increasing(&ticks(&records)));
            assert!(records.len() <= before.len());
            assert!(records
                .iter()
                .all(|r| matches!(r.cuid.as_deref(), Some("9") | Some("10"))));
        }
    }

    // Once the drop is visible, only users documents remain
    let (after, result) = log.tail(0, u64::MAX, usize::MAX, &filter);
    assert!(result.is_ok());
    assert_eq!(after.len(), before.len() / 2);
    assert!(after.iter().all(|r| r.cuid.as_deref() == Some("9")));
}

#[test]
fn test_tail_while_database_dropped() {
    let log = Arc::new(interleaved_log(4, 100));
    let filter = db_filter();
    let start = Arc::new(Barrier::new(3));

    let tailers: Vec<_> = (0..2)
        .map(|_| {
            let log = Arc::clone(&log);
            let start = Arc::clone(&start);
            let filter = filter.clone();
            thread::spawn(move || {
                start.wait();
                (0..10)
                    .map(|_| log.tail(0, u64::MAX, usize::MAX, &filter))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    start.wait();
    log.catalog.drop_database(DB);

    for handle in tailers {
        for (records, result) in handle.join().unwrap() {
            assert!(result.is_ok());
            assert!(strictly_increasing(&ticks(&records)));
            assert!(records.iter().all(|r| r.db.as_deref() == Some("db1")));
        }
    }

    let (after, _) = log.tail(0, u64::MAX, usize::MAX, &filter);
    assert!(after.is_empty());
}

#[test]
fn test_reclaim_never_removes_pinned_segments() {
    let log = Arc::new(interleaved_log(6, 50));
    let filter = db_filter();
    let last = log.access.last_tick();
    let start = Arc::new(Barrier::new(4));

    let tailers: Vec<_> = (0..3)
        .map(|_| {
            let log = Arc::clone(&log);
            let start = Arc::clone(&start);
            let filter = filter.clone();
            thread::spawn(move || {
                start.wait();
                for _ in 0..20 {
                    let (records, result) = log.tail(0, u64::MAX, usize::MAX, &filter);
                    assert!(result.is_ok());
                    assert!(strictly_increasing(&ticks(&records)));
                }
            })
        })
        .collect();

    start.wait();
    let mut reclaimed = Vec::new();
    for tick in (0..=last).step_by(25) {
        reclaimed.extend(log.registry.reclaim_before(tick));
        thread::yield_now();
    }
    for handle in tailers {
        handle.join().unwrap();
    }
    reclaimed.extend(log.registry.reclaim_before(last + 1));

    // Every segment goes eventually, each exactly once
    reclaimed.sort_unstable();
    assert_eq!(reclaimed, (1..=6).collect::<Vec<u64>>());
    assert!(log.registry.ranges().is_empty());
}

#[test]
fn test_barrier_holds_back_reclamation_during_chunked_tail() {
    let log = interleaved_log(4, 50);
    let barrier = log.registry.create_barrier(Duration::from_secs(60), 0);
    let filter = db_filter();

    let mut start = 0;
    let mut emitted = 0;
    loop {
        let mut records = 0;
        let result = log
            .access
            .tail(start, u64::MAX, 512, barrier, &filter, |_, _| records += 1);
        assert!(result.is_ok());
        assert!(result.from_tick_included || start == 0);
        emitted += records;

        // Segments below the resumption tick may go, the rest must stay
        log.registry.reclaim_before(u64::MAX);
        let protected = log.registry.barrier_min_tick(barrier).unwrap();
        assert_eq!(protected, start);
        assert!(log
            .registry
            .ranges()
            .iter()
            .any(|r| r.max >= protected) || !result.has_more);

        if !result.has_more {
            break;
        }
        start = result.last_included_tick;
    }
    assert_eq!(emitted, 4 * 50);

    // The follower is done: releasing its barrier frees the rest of the log
    assert!(!log.registry.ranges().is_empty());
    assert!(log.registry.remove_barrier(barrier));
    assert!(!log.registry.remove_barrier(barrier));
    log.registry.reclaim_before(u64::MAX);
    assert!(log.registry.ranges().is_empty());
}
