//! Open-transaction discovery.
//!
//! Scans a tick range for transaction framing markers and reports the
//! transactions that began but did not resolve inside it. A follower must
//! not treat anything at or after the earliest open start tick as safely
//! replicated.

use marklog_core::{DatabaseId, Error, Result, Tick, TransactionId};
use marklog_durability::{Marker, MarkerCursor, Segment, TransactionAction};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// A transaction that began inside the scanned range and is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTransaction {
    /// Transaction id
    pub id: TransactionId,
    /// Tick of its begin marker
    pub start_tick: Tick,
}

/// Result of a window scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowScan {
    /// Open transactions, ascending by start tick
    pub open: Vec<OpenTransaction>,
    /// Last tick read inside the range, `0` if none
    pub last_tick: Tick,
    /// Highest tick up to which the range is free of open transactions
    pub last_safe_tick: Tick,
    /// Whether a corrupt segment ended the scan early
    pub truncated: bool,
}

/// Tracks begun-but-unresolved transactions while scanning.
#[derive(Debug, Default)]
pub struct TransactionWindow {
    database: DatabaseId,
    open: FxHashMap<TransactionId, Tick>,
    last_tick: Tick,
    truncated: bool,
}

impl TransactionWindow {
    /// Window over transactions of `database`, or of all databases for `0`.
    pub fn new(database: DatabaseId) -> Self {
        TransactionWindow {
            database,
            ..Default::default()
        }
    }

    /// Scan `segments` for transactions in `(tick_start, tick_end]`.
    ///
    /// A marker exactly at `tick_end` is still processed. A corrupt segment
    /// ends the scan; the window accumulated so far is returned with
    /// `truncated` set.
    pub fn scan(
        segments: &[Arc<Segment>],
        tick_start: Tick,
        tick_end: Tick,
        database: DatabaseId,
        verify_checksums: bool,
    ) -> Result<WindowScan> {
        let mut window = TransactionWindow::new(database);

        'segments: for segment in segments {
            let mut cursor = MarkerCursor::new(segment.bytes()).verify_checksums(verify_checksums);
            while let Some(marker) = cursor.next_marker() {
                let tick = marker.tick();
                if tick <= tick_start {
                    continue;
                }
                if tick > tick_end {
                    break 'segments;
                }
                window.observe(&marker)?;
            }

            if let Some(reason) = cursor.stop_reason().filter(|r| r.is_corruption()) {
                warn!(
                    target: "marklog::window",
                    segment = segment.id(),
                    reason = %reason,
                    last_tick = window.last_tick,
                    "Corrupt segment ends open-transaction scan"
                );
                window.truncated = true;
                break;
            }
        }

        Ok(window.finish())
    }

    /// Account for one in-range marker.
    pub fn observe(&mut self, marker: &Marker<'_>) -> Result<()> {
        let tick = marker.tick();
        self.last_tick = self.last_tick.max(tick);

        let kind = marker.kind();
        if !kind.is_transaction() {
            return Ok(());
        }
        if self.database != 0 && marker.database_id() != self.database {
            return Ok(());
        }

        let tid = marker.transaction_id();
        if tid == 0 {
            warn!(
                target: "marklog::window",
                tick,
                kind = kind.name(),
                "Transaction marker without transaction id"
            );
            return Ok(());
        }

        match kind.transaction_action() {
            Some(TransactionAction::Begin) => {
                self.open.insert(tid, tick);
            }
            Some(TransactionAction::Commit) | Some(TransactionAction::Abort) => {
                // Resolving a transaction begun before the range is a no-op
                if self.open.remove(&tid).is_none() {
                    trace!(target: "marklog::window", tid, tick, "Resolved unknown transaction");
                }
            }
            None => {
                return Err(Error::internal(format!(
                    "{} marker at tick {} has no transaction relation",
                    kind, tick
                )));
            }
        }
        Ok(())
    }

    /// Close the window and compute the safe tick.
    pub fn finish(self) -> WindowScan {
        let mut open: Vec<OpenTransaction> = self
            .open
            .into_iter()
            .map(|(id, start_tick)| OpenTransaction { id, start_tick })
            .collect();
        open.sort_by_key(|t| (t.start_tick, t.id));

        let last_safe_tick = open
            .first()
            .map(|t| self.last_tick.min(t.start_tick.saturating_sub(1)))
            .unwrap_or(self.last_tick);

        WindowScan {
            open,
            last_tick: self.last_tick,
            last_safe_tick,
            truncated: self.truncated,
        }
    }
}
