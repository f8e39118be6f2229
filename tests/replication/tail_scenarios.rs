//! Tail Scenarios
//!
//! Record streams produced for mixed logs: schema operations, document
//! context, system collections and objects dropped before tailing.

use crate::common::*;
use marklog::{DatabaseRef, Filter, MarkerKind, OperationType, SegmentBuilder};
use serde_json::json;

fn single(build: impl FnOnce(&mut SegmentBuilder)) -> Vec<Vec<u8>> {
    let mut builder = SegmentBuilder::new(1, 1);
    build(&mut builder);
    vec![builder.finish().unwrap()]
}

#[test]
fn test_create_collection_then_document() {
    let log = TestLog::new(single(|b| {
        b.object_marker(
            MarkerKind::CreateCollection,
            5,
            DB,
            USERS,
            br#"{"name":"users","cuid":"9"}"#,
        )
        .prologue(5, DB, USERS)
        .document(6, 0, br#"{"_key":"alice"}"#)
        .footer(6);
    }));

    let (records, result) = log.tail(0, 100, 1_000_000, &db_filter());
    assert!(result.is_ok());
    assert_eq!(ticks(&records), vec![5, 6]);

    assert_eq!(records[0].operation, OperationType::CollectionCreate);
    assert_eq!(records[0].db.as_deref(), Some("db1"));
    assert_eq!(records[0].cuid.as_deref(), Some("9"));
    assert_eq!(records[0].data, Some(json!({"name": "users", "cuid": "9"})));

    assert_eq!(records[1].operation, OperationType::Document);
    assert_eq!(records[1].db.as_deref(), Some("db1"));
    assert_eq!(records[1].cuid.as_deref(), Some("9"));
    assert_eq!(records[1].data, Some(json!({"_key": "alice"})));

    assert_eq!(result.last_included_tick, 6);
    assert_eq!(result.last_committed_tick, 6);
    assert!(result.from_tick_included);
    assert!(!result.has_more);
}

#[test]
fn test_record_json_shape() {
    let log = TestLog::new(single(|b| {
        b.prologue(2, DB, USERS).document(3, 77, br#"{"_key":"a"}"#);
    }));

    let (records, _) = log.tail(0, 100, usize::MAX, &db_filter());
    let value = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(value["tick"], json!("3"));
    assert_eq!(value["type"], json!(2300));
    assert_eq!(value["tid"], json!("77"));
    assert_eq!(value["db"], json!("db1"));
    assert_eq!(value["cuid"], json!("9"));
    assert_eq!(value["data"], json!({"_key": "a"}));
}

#[test]
fn test_transaction_markers_emitted_in_order() {
    let log = TestLog::new(single(|b| {
        b.begin_transaction(2, DB, 40)
            .prologue(3, DB, USERS)
            .document(4, 40, br#"{"_key":"x"}"#)
            .remove(5, 40, br#"{"_key":"y"}"#)
            .commit_transaction(6, DB, 40);
    }));

    let (records, result) = log.tail(0, 100, usize::MAX, &db_filter());
    assert!(result.is_ok());
    let operations: Vec<_> = records.iter().map(|r| r.operation).collect();
    assert_eq!(
        operations,
        vec![
            OperationType::TransactionStart,
            OperationType::Document,
            OperationType::Remove,
            OperationType::TransactionCommit,
        ]
    );
    assert!(records.iter().all(|r| r.tid == Some(40)));
    // Transaction markers carry no collection
    assert_eq!(records[0].cuid, None);
    assert_eq!(records[3].cuid, None);
}

#[test]
fn test_system_collections_need_opt_in() {
    let segments = single(|b| {
        b.prologue(2, DB, GRAPHS)
            .document(3, 0, br#"{"_key":"g"}"#)
            .prologue(4, DB, USERS)
            .document(5, 0, br#"{"_key":"u"}"#);
    });
    let log = TestLog::new(segments);

    let without = Filter::new().with_database(DB);
    let (records, _) = log.tail(0, 100, usize::MAX, &without);
    assert_eq!(ticks(&records), vec![5]);

    let (records, _) = log.tail(0, 100, usize::MAX, &db_filter());
    assert_eq!(ticks(&records), vec![3, 5]);
}

#[test]
fn test_excluded_collections_never_replicate() {
    let log = TestLog::new(single(|b| {
        b.prologue(2, DB, STATISTICS)
            .document(3, 0, br#"{"_key":"s"}"#)
            .prologue(4, DB, USERS)
            .document(5, 0, br#"{"_key":"u"}"#);
    }));

    // Even with system collections included
    let (records, _) = log.tail(0, 100, usize::MAX, &db_filter());
    assert_eq!(ticks(&records), vec![5]);
}

#[test]
fn test_collection_filter() {
    let log = TestLog::new(single(|b| {
        b.begin_transaction(2, DB, 5)
            .prologue(3, DB, USERS)
            .document(4, 5, br#"{"_key":"u"}"#)
            .prologue(5, DB, ORDERS)
            .document(6, 5, br#"{"_key":"o"}"#)
            .commit_transaction(7, DB, 5);
    }));

    let filter = db_filter().with_collection(ORDERS);
    let (records, _) = log.tail(0, 100, usize::MAX, &filter);
    // Transaction framing passes the collection scope
    assert_eq!(ticks(&records), vec![2, 6, 7]);
}

#[test]
fn test_dropped_collection_documents_omitted() {
    let log = TestLog::new(single(|b| {
        b.prologue(2, DB, ORDERS)
            .document(3, 0, br#"{"_key":"o"}"#)
            .object_marker(
                MarkerKind::DropCollection,
                4,
                DB,
                ORDERS,
                br#"{"name":"orders","cuid":"10"}"#,
            )
            .prologue(5, DB, USERS)
            .document(6, 0, br#"{"_key":"u"}"#);
    }));
    log.catalog.drop_collection(DB, ORDERS);

    let (records, result) = log.tail(0, 100, usize::MAX, &db_filter());
    assert!(result.is_ok());
    assert_eq!(ticks(&records), vec![4, 6]);
    assert_eq!(records[0].operation, OperationType::CollectionDrop);
    assert_eq!(records[0].cuid.as_deref(), Some("10"));
    assert_eq!(records[0].db.as_deref(), Some("db1"));
}

#[test]
fn test_dropped_system_collection_uses_payload_name() {
    let log = TestLog::new(single(|b| {
        b.object_marker(
            MarkerKind::DropCollection,
            2,
            DB,
            STATISTICS,
            br#"{"name":"_statistics","cuid":"12"}"#,
        )
        .object_marker(
            MarkerKind::DropCollection,
            3,
            DB,
            GRAPHS,
            br#"{"name":"_graphs","cuid":"11"}"#,
        );
    }));
    log.catalog.drop_collection(DB, STATISTICS);
    log.catalog.drop_collection(DB, GRAPHS);

    let (records, _) = log.tail(0, 100, usize::MAX, &db_filter());
    assert_eq!(ticks(&records), vec![3]);

    let (records, _) = log.tail(0, 100, usize::MAX, &Filter::new().with_database(DB));
    assert!(records.is_empty());
}

#[test]
fn test_drop_database_reports_payload_name() {
    let catalog = standard_catalog();
    let log = TestLog::with_catalog(
        single(|b| {
            b.database_marker(MarkerKind::CreateDatabase, 2, 2, br#"{"name":"db2"}"#)
                .database_marker(MarkerKind::DropDatabase, 3, 2, br#"{"name":"db2"}"#);
        }),
        catalog,
    );

    let mut seen: Vec<(Option<DatabaseRef>, u64)> = Vec::new();
    let result = log
        .access
        .tail(0, 100, usize::MAX, 0, &Filter::new(), |db, record| {
            seen.push((db.cloned(), record.tick))
        });
    assert!(result.is_ok());
    // Database 2 is gone: its create is skipped, its drop still replicates
    assert_eq!(seen, vec![(None, 3)]);
}

#[test]
fn test_views_and_indexes() {
    let log = TestLog::new(single(|b| {
        b.object_marker(
            MarkerKind::CreateIndex,
            2,
            DB,
            USERS,
            br#"{"id":"77","type":"hash","fields":["email"]}"#,
        )
        .object_marker(MarkerKind::CreateView, 3, DB, 500, br#"{"name":"v"}"#);
    }));

    let (records, result) = log.tail(0, 100, usize::MAX, &db_filter());
    assert!(result.is_ok());
    assert_eq!(ticks(&records), vec![2, 3]);
    assert_eq!(records[0].operation, OperationType::IndexCreate);
    assert_eq!(records[0].cuid.as_deref(), Some("9"));
    assert_eq!(records[1].operation, OperationType::ViewCreate);
    // Views are not collections
    assert_eq!(records[1].cuid, None);
    assert_eq!(records[1].data, Some(json!({"name": "v"})));
}

#[test]
fn test_first_regular_tick_admits_listed_transactions() {
    let log = TestLog::new(single(|b| {
        b.prologue(2, DB, USERS)
            .document(3, 8, br#"{"_key":"a"}"#)
            .document(4, 9, br#"{"_key":"b"}"#)
            .document(5, 0, br#"{"_key":"c"}"#)
            .commit_transaction(6, DB, 8)
            .document(20, 0, br#"{"_key":"d"}"#);
    }));

    let filter = db_filter()
        .with_first_regular_tick(10)
        .with_admitted_transactions([8]);
    let (records, _) = log.tail(0, 100, usize::MAX, &filter);
    assert_eq!(ticks(&records), vec![3, 6, 20]);
}

#[test]
fn test_other_database_filtered() {
    let catalog = standard_catalog();
    catalog.create_database(2, "db2").unwrap();
    catalog.create_collection(2, 30, "items", "30").unwrap();
    let log = TestLog::with_catalog(
        single(|b| {
            b.prologue(2, 2, 30)
                .document(3, 0, br#"{"_key":"i"}"#)
                .prologue(4, DB, USERS)
                .document(5, 0, br#"{"_key":"u"}"#);
        }),
        catalog,
    );

    let (records, _) = log.tail(0, 100, usize::MAX, &db_filter());
    assert_eq!(ticks(&records), vec![5]);

    let (records, _) = log.tail(0, 100, usize::MAX, &Filter::new());
    assert_eq!(ticks(&records), vec![3, 5]);
    assert_eq!(records[0].db.as_deref(), Some("db2"));
}

#[test]
fn test_range_past_log_end() {
    let log = TestLog::new(vec![document_segment(1, 1..=10)]);

    let (records, result) = log.tail(10, 100, usize::MAX, &db_filter());
    assert!(result.is_ok());
    assert!(records.is_empty());
    assert_eq!(result.last_included_tick, 0);
    assert!(result.from_tick_included);

    let (_, result) = log.tail(50, 100, usize::MAX, &db_filter());
    assert!(!result.from_tick_included);
}

#[test]
fn test_empty_log_tails_nothing() {
    let log = TestLog::new(Vec::new());
    let (records, result) = log.tail(0, 100, usize::MAX, &db_filter());
    assert!(result.is_ok());
    assert!(records.is_empty());
    assert!(!result.from_tick_included);
    assert_eq!(result.last_committed_tick, 0);
}

#[test]
fn test_context_carries_across_segment_boundary_until_header() {
    let mut first = SegmentBuilder::new(1, 1);
    first.prologue(2, DB, USERS).document(3, 0, b"{}");
    let mut second = SegmentBuilder::new(2, 4);
    second.prologue(5, DB, ORDERS).document(6, 0, b"{}");
    let log = TestLog::new(vec![first.finish().unwrap(), second.finish().unwrap()]);

    let (records, _) = log.tail(0, 100, usize::MAX, &db_filter());
    assert_eq!(ticks(&records), vec![3, 6]);
    assert_eq!(records[0].cuid.as_deref(), Some("9"));
    assert_eq!(records[1].cuid.as_deref(), Some("10"));
}

#[test]
fn test_collection_scope_keeps_database_and_view_events() {
    let log = TestLog::new(single(|b| {
        b.object_marker(MarkerKind::CreateView, 2, DB, 500, br#"{"name":"v"}"#)
            .prologue(3, DB, USERS)
            .document(4, 0, br#"{"_key":"u"}"#)
            .prologue(5, DB, ORDERS)
            .document(6, 0, br#"{"_key":"o"}"#)
            .database_marker(MarkerKind::DropDatabase, 7, 2, br#"{"name":"db2"}"#);
    }));

    let filter = Filter::new().with_collection(USERS);
    let (records, result) = log.tail(0, 100, usize::MAX, &filter);
    assert!(result.is_ok());
    assert_eq!(ticks(&records), vec![2, 4, 7]);
    assert_eq!(records[0].operation, OperationType::ViewCreate);
    assert_eq!(records[1].cuid.as_deref(), Some("9"));
    assert_eq!(records[2].operation, OperationType::DatabaseDrop);
    assert_eq!(records[2].db.as_deref(), Some("db2"));
}
