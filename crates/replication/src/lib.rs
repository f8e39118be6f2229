//! Replication log tailing for marklog
//!
//! This crate turns log segments into the change stream replication
//! followers consume:
//!
//! - TransactionWindow: open-transaction discovery and the safe replay tick
//! - MarkerFilter: replication criteria (database/collection scope, system
//!   collections, snapshot cutoff, concurrent drops)
//! - RecordSerializer: marker to JSON record with resolved names
//! - Tailer: chunk-bounded scan loop with prologue context tracking
//! - WalAccess: the public facade
//! - TailConfig: `marklog.toml` settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod config;
pub mod filter;
pub mod names;
pub mod record;
pub mod result;
pub mod serializer;
pub mod tailer;
pub mod window;

pub use access::WalAccess;
pub use config::{ConfigError, TailConfig, CONFIG_FILE_NAME, DEFAULT_EXCLUDED_COLLECTIONS};
pub use filter::{Filter, MarkerFilter, Rejection};
pub use names::NameCache;
pub use record::{OperationType, Record};
pub use result::TailResult;
pub use serializer::{serialize, Serialized, SkipReason};
pub use tailer::Tailer;
pub use window::{OpenTransaction, TransactionWindow, WindowScan};
