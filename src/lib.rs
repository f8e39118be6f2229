//! marklog - replication log tailing over segmented marker logs
//!
//! marklog reads an append-only log of binary change markers and turns a
//! tick range of it into the record stream replication followers consume.
//!
//! # Quick Start
//!
//! ```ignore
//! use marklog::{Filter, InMemoryCatalog, SegmentRegistry, TailConfig, WalAccess};
//! use std::sync::Arc;
//!
//! let segments = Arc::new(SegmentRegistry::open_dir(log_dir)?);
//! let catalog = Arc::new(InMemoryCatalog::new());
//! let access = WalAccess::new(segments, catalog, TailConfig::default())?;
//!
//! let result = access.tail(0, access.last_tick(), 1 << 20, 0, &Filter::new(), |_, record| {
//!     println!("{}", serde_json::to_string(record).unwrap());
//! });
//! ```
//!
//! # Architecture
//!
//! - `marklog-core`: ids, tick ranges, errors, the catalog seam
//! - `marklog-durability`: marker format, segments, the segment source seam
//! - `marklog-replication`: transaction window, filter, serializer, tailer,
//!   and the [`WalAccess`] facade

pub use marklog_core::{
    Catalog, CollectionId, CollectionRef, DatabaseId, DatabaseRef, Error, ErrorKind,
    InMemoryCatalog, Result, Tick, TickRange, TransactionId,
};
pub use marklog_durability::{
    Marker, MarkerCursor, MarkerKind, ReadStopReason, Segment, SegmentBuilder, SegmentLease,
    SegmentRegistry, SegmentSelection, SegmentSource,
};
pub use marklog_replication::{
    ConfigError, Filter, OpenTransaction, OperationType, Record, Rejection, TailConfig,
    TailResult, WalAccess,
};
