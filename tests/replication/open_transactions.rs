//! Open Transaction Tests
//!
//! The window of transactions begun but unresolved in a tick range, and the
//! safe replay cutoff derived from it.

use crate::common::*;
use marklog::{Filter, SegmentBuilder, Tick, TransactionId};

fn open_in(log: &TestLog, start: Tick, end: Tick, filter: &Filter) -> (Vec<(TransactionId, Tick)>, Tick) {
    let mut open = Vec::new();
    let result = log
        .access
        .open_transactions(start, end, filter, |tid, tick| open.push((tid, tick)));
    assert!(result.is_ok(), "scan failed: {:?}", result.error);
    (open, result.last_included_tick)
}

fn transaction_log() -> TestLog {
    let mut first = SegmentBuilder::new(1, 1);
    first
        .begin_transaction(10, DB, 100)
        .prologue(11, DB, USERS)
        .document(12, 100, b"{}")
        .begin_transaction(13, DB, 200)
        .commit_transaction(14, DB, 100)
        .footer(15);
    let mut second = SegmentBuilder::new(2, 16);
    second
        .begin_transaction(17, DB, 300)
        .abort_transaction(18, DB, 300)
        .begin_transaction(19, DB, 400)
        .blank(25);
    TestLog::new(vec![first.finish().unwrap(), second.finish().unwrap()])
}

#[test]
fn test_open_transactions_across_segments() {
    let log = transaction_log();
    let (open, safe) = open_in(&log, 0, 100, &Filter::new());
    assert_eq!(open, vec![(200, 13), (400, 19)]);
    assert_eq!(safe, 12);
}

#[test]
fn test_nothing_open_safe_tick_is_last_tick() {
    let log = transaction_log();
    // 200 and 400 open but their begins are at or before the start
    let (open, safe) = open_in(&log, 19, 100, &Filter::new());
    assert!(open.is_empty());
    assert_eq!(safe, 25);
}

#[test]
fn test_resolution_outside_range_not_seen() {
    let log = transaction_log();
    // 100 begins at 10 but its commit at 14 lies past the end
    let (open, safe) = open_in(&log, 0, 13, &Filter::new());
    assert_eq!(open, vec![(100, 10), (200, 13)]);
    assert_eq!(safe, 9);
}

#[test]
fn test_end_tick_marker_processed() {
    let log = transaction_log();
    let (open, _) = open_in(&log, 0, 14, &Filter::new());
    assert_eq!(open, vec![(200, 13)]);
}

#[test]
fn test_database_scope() {
    let catalog = standard_catalog();
    catalog.create_database(2, "db2").unwrap();
    let mut builder = SegmentBuilder::new(1, 1);
    builder
        .begin_transaction(2, 2, 50)
        .begin_transaction(3, DB, 60)
        .blank(4);
    let log = TestLog::with_catalog(vec![builder.finish().unwrap()], catalog);

    let (open, safe) = open_in(&log, 0, 10, &Filter::new().with_database(DB));
    assert_eq!(open, vec![(60, 3)]);
    assert_eq!(safe, 2);

    let (open, safe) = open_in(&log, 0, 10, &Filter::new());
    assert_eq!(open, vec![(50, 2), (60, 3)]);
    assert_eq!(safe, 1);
}

#[test]
fn test_open_transactions_empty_range() {
    let log = transaction_log();
    let mut calls = 0;
    let result = log
        .access
        .open_transactions(200, 300, &Filter::new(), |_, _| calls += 1);
    assert!(result.is_ok());
    assert_eq!(calls, 0);
    assert_eq!(result.last_included_tick, 0);
    assert!(!result.from_tick_included);
}

#[test]
fn test_corrupt_segment_truncates_window() {
    let mut first = SegmentBuilder::new(1, 1);
    first.begin_transaction(2, DB, 7).blank(3);
    let mut bytes = first.finish().unwrap();
    // Torn write: a size field pointing past the end of the segment
    bytes.extend_from_slice(&[0xFF, 0x00, 0x00, 0x00, 0, 0, 0, 0]);

    let mut second = SegmentBuilder::new(2, 10);
    second.commit_transaction(11, DB, 7);
    let log = TestLog::new(vec![bytes, second.finish().unwrap()]);

    // The scan stops at the damage; 7 stays open
    let (open, safe) = open_in(&log, 0, 100, &Filter::new());
    assert_eq!(open, vec![(7, 2)]);
    assert_eq!(safe, 1);
}

#[test]
fn test_open_transactions_never_pin_after_return() {
    let log = transaction_log();
    let _ = open_in(&log, 0, 100, &Filter::new());
    assert_eq!(log.registry.pin_count(1), 0);
    assert_eq!(log.registry.pin_count(2), 0);
}
