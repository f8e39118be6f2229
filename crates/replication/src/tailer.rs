//! Chunked log tailing.
//!
//! Walks the segments overlapping a tick range in order, tracks the
//! database/collection context that prologue markers establish for the
//! compact document markers after them, and emits one record per accepted
//! marker until the range or the byte budget is exhausted.

use crate::config::TailConfig;
use crate::filter::{Filter, MarkerFilter};
use crate::names::NameCache;
use crate::record::Record;
use crate::result::TailResult;
use crate::serializer::{serialize, Serialized};
use marklog_core::{Catalog, CollectionId, DatabaseId, DatabaseRef, Error, ErrorKind, Tick};
use marklog_durability::{MarkerCursor, MarkerKind, SegmentLease, SegmentSource};
use tracing::{debug, error, trace, warn};

/// Drives one tailing call over a segment source.
pub struct Tailer<'a> {
    source: &'a dyn SegmentSource,
    catalog: &'a dyn Catalog,
    config: &'a TailConfig,
}

impl<'a> Tailer<'a> {
    /// Create a tailer.
    pub fn new(source: &'a dyn SegmentSource, catalog: &'a dyn Catalog, config: &'a TailConfig) -> Self {
        Tailer {
            source,
            catalog,
            config,
        }
    }

    /// Emit records for markers in `(tick_start, tick_end]`.
    ///
    /// Stops once the JSON size of the emitted records reaches
    /// `chunk_budget` (the record that crosses it is still emitted); resume
    /// with `tick_start = last_included_tick`. Corrupt data ends the current
    /// segment only. Any other error aborts the call; records already
    /// emitted stay emitted.
    pub fn tail<F>(
        &self,
        tick_start: Tick,
        tick_end: Tick,
        chunk_budget: usize,
        filter: &Filter,
        mut emit: F,
    ) -> TailResult
    where
        F: FnMut(Option<&DatabaseRef>, &Record),
    {
        let last_committed_tick = self.source.last_committed_tick();
        let lease = match SegmentLease::acquire(self.source, tick_start, tick_end) {
            Ok(lease) => lease,
            Err(e) => {
                error!(target: "marklog::tail", error = %e, "Failed to acquire segments");
                return TailResult {
                    last_committed_tick,
                    ..TailResult::failed(e)
                };
            }
        };

        let mut result = TailResult {
            from_tick_included: lease.from_tick_included(),
            last_committed_tick,
            ..Default::default()
        };

        debug!(
            target: "marklog::tail",
            tick_start,
            tick_end,
            chunk_budget,
            segments = lease.segments().len(),
            "Tail started"
        );

        let marker_filter = MarkerFilter::new(filter, self.config);
        let mut names = NameCache::new(self.catalog);
        let mut context: (DatabaseId, CollectionId) = (0, 0);
        let mut reached_end = false;

        'segments: for segment in lease.segments() {
            let mut cursor =
                MarkerCursor::new(segment.bytes()).verify_checksums(self.config.verify_checksums);

            while let Some(marker) = cursor.next_marker() {
                let kind = marker.kind();
                let tick = marker.tick();

                // Context applies regardless of the tick range
                match kind {
                    MarkerKind::Prologue => {
                        context = (marker.database_id(), marker.collection_id());
                    }
                    MarkerKind::SegmentHeader | MarkerKind::SegmentFooter => {
                        context = (0, 0);
                    }
                    MarkerKind::CreateCollection => {
                        names.prime(marker.database_id(), marker.collection_id());
                    }
                    _ => {}
                }

                if tick <= tick_start {
                    continue;
                }
                if tick >= tick_end {
                    reached_end = true;
                    if tick > tick_end {
                        break 'segments;
                    }
                }

                let (database, collection) = if kind.uses_context() {
                    context
                } else {
                    (marker.database_id(), marker.collection_id())
                };

                if let Err(rejection) = marker_filter.check(&marker, database, collection, &mut names)
                {
                    trace!(
                        target: "marklog::tail",
                        tick,
                        kind = kind.name(),
                        rejection = rejection.name(),
                        "Marker filtered"
                    );
                    continue;
                }

                match serialize(&marker, database, collection, &mut names) {
                    Ok(Serialized::Record { record, database }) => {
                        let size = match record.encoded_len() {
                            Ok(size) => size,
                            Err(e) => {
                                let e = Error::internal(format!(
                                    "failed to encode record at tick {}: {}",
                                    tick, e
                                ));
                                return self.abort(result, e);
                            }
                        };
                        emit(database.as_ref(), &record);
                        result.records_emitted += 1;
                        result.bytes_emitted += size;
                        result.last_included_tick = tick;

                        if result.bytes_emitted >= chunk_budget {
                            result.has_more = true;
                            break 'segments;
                        }
                    }
                    Ok(Serialized::Skip(reason)) => {
                        trace!(
                            target: "marklog::tail",
                            tick,
                            kind = kind.name(),
                            reason = ?reason,
                            "Marker skipped"
                        );
                    }
                    Err(e) if e.kind() == ErrorKind::Corrupt => {
                        warn!(
                            target: "marklog::tail",
                            segment = segment.id(),
                            tick,
                            error = %e,
                            "Corrupt payload ends segment scan"
                        );
                        if reached_end {
                            break 'segments;
                        }
                        continue 'segments;
                    }
                    Err(e) => return self.abort(result, e),
                }
            }

            if let Some(reason) = cursor.stop_reason().filter(|r| r.is_corruption()) {
                warn!(
                    target: "marklog::tail",
                    segment = segment.id(),
                    reason = %reason,
                    "Corrupt marker ends segment scan"
                );
            }
            if reached_end {
                break;
            }
        }

        debug!(
            target: "marklog::tail",
            records = result.records_emitted,
            bytes = result.bytes_emitted,
            last_included_tick = result.last_included_tick,
            has_more = result.has_more,
            "Tail finished"
        );
        result
    }

    fn abort(&self, mut result: TailResult, e: Error) -> TailResult {
        error!(
            target: "marklog::tail",
            error = %e,
            last_included_tick = result.last_included_tick,
            records = result.records_emitted,
            "Tail aborted"
        );
        result.error = Some(e);
        result
    }
}
