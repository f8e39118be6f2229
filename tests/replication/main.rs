//! Replication Integration Tests
//!
//! End-to-end tailing over segmented logs: record streams, open
//! transactions, chunked resumption, concurrent schema changes and
//! file-backed segments.

#[path = "../common/mod.rs"]
mod common;

mod concurrent_drops;
mod open_transactions;
mod tail_scenarios;
