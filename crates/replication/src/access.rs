//! Replication entry points over one log.
//!
//! [`WalAccess`] owns handles to the segment source and the catalog and
//! answers the four questions a replication follower asks: which ticks the
//! log covers, what the latest tick is, which transactions are still open in
//! a range, and what changed in a range.

use crate::config::TailConfig;
use crate::filter::Filter;
use crate::record::Record;
use crate::result::TailResult;
use crate::tailer::Tailer;
use crate::window::TransactionWindow;
use marklog_core::{Catalog, DatabaseRef, Error, Result, Tick, TickRange, TransactionId};
use marklog_durability::{SegmentLease, SegmentSource};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Read-side access to a log for replication.
///
/// Cheap to share: every call keeps its state local, so one instance can
/// serve several followers concurrently.
pub struct WalAccess {
    source: Arc<dyn SegmentSource>,
    catalog: Arc<dyn Catalog>,
    config: TailConfig,
}

impl WalAccess {
    /// Create an accessor. Fails if `config` does not validate.
    pub fn new(
        source: Arc<dyn SegmentSource>,
        catalog: Arc<dyn Catalog>,
        config: TailConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(WalAccess {
            source,
            catalog,
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Ticks covered by the log. `NotFound` if the log is empty.
    pub fn tick_range(&self) -> Result<TickRange> {
        let ranges = self.source.ranges();
        TickRange::merge_all(&ranges).ok_or_else(|| Error::not_found("log has no segments"))
    }

    /// Highest tick in the log, `0` if empty.
    pub fn last_tick(&self) -> Tick {
        self.source
            .ranges()
            .iter()
            .map(|r| r.max)
            .max()
            .unwrap_or(0)
    }

    /// Report the transactions begun but not resolved in `(tick_start, tick_end]`.
    ///
    /// `callback` receives each open transaction id and its start tick,
    /// ascending by start tick. The result's `last_included_tick` is the
    /// safe replay cutoff.
    pub fn open_transactions<F>(
        &self,
        tick_start: Tick,
        tick_end: Tick,
        filter: &Filter,
        mut callback: F,
    ) -> TailResult
    where
        F: FnMut(TransactionId, Tick),
    {
        let last_committed_tick = self.source.last_committed_tick();
        let lease = match SegmentLease::acquire(self.source.as_ref(), tick_start, tick_end) {
            Ok(lease) => lease,
            Err(e) => {
                error!(target: "marklog::window", error = %e, "Failed to acquire segments");
                return TailResult::failed(e);
            }
        };

        let scan = match TransactionWindow::scan(
            lease.segments(),
            tick_start,
            tick_end,
            filter.database,
            self.config.verify_checksums,
        ) {
            Ok(scan) => scan,
            Err(e) => {
                error!(target: "marklog::window", error = %e, "Open-transaction scan failed");
                return TailResult::failed(e);
            }
        };

        if scan.truncated {
            warn!(
                target: "marklog::window",
                last_safe_tick = scan.last_safe_tick,
                "Open-transaction scan ended early"
            );
        }
        for open in &scan.open {
            callback(open.id, open.start_tick);
        }

        debug!(
            target: "marklog::window",
            tick_start,
            tick_end,
            open = scan.open.len(),
            last_safe_tick = scan.last_safe_tick,
            "Open transactions determined"
        );

        TailResult {
            from_tick_included: lease.from_tick_included(),
            last_included_tick: scan.last_safe_tick,
            last_committed_tick,
            ..Default::default()
        }
    }

    /// Emit records for `(tick_start, tick_end]` until `chunk_budget` bytes.
    ///
    /// A non-zero `barrier_id` is first extended to protect ticks from
    /// `tick_start` on for the configured lease length.
    pub fn tail<F>(
        &self,
        tick_start: Tick,
        tick_end: Tick,
        chunk_budget: usize,
        barrier_id: u64,
        filter: &Filter,
        callback: F,
    ) -> TailResult
    where
        F: FnMut(Option<&DatabaseRef>, &Record),
    {
        if barrier_id != 0
            && !self
                .source
                .extend_barrier(barrier_id, self.config.barrier_ttl(), tick_start)
        {
            debug!(target: "marklog::tail", barrier_id, "Barrier not extended");
        }

        Tailer::new(self.source.as_ref(), self.catalog.as_ref(), &self.config).tail(
            tick_start,
            tick_end,
            chunk_budget,
            filter,
            callback,
        )
    }
}

impl std::fmt::Debug for WalAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalAccess")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
