//! Core types and traits for marklog
//!
//! This crate defines the foundational types used by the log reader and the
//! replication layer:
//! - Tick, DatabaseId, CollectionId, TransactionId: numeric identifiers
//! - TickRange: inclusive tick interval
//! - Error / ErrorKind: error taxonomy shared across crates
//! - Catalog: name-resolution seam (DatabaseRef, CollectionRef)
//! - InMemoryCatalog: thread-safe catalog implementation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod error;
pub mod traits;
pub mod types;

pub use catalog::InMemoryCatalog;
pub use error::{Error, ErrorKind, Result};
pub use traits::{is_system_name, Catalog, CollectionRef, DatabaseRef};
pub use types::{CollectionId, DatabaseId, Tick, TickRange, TransactionId};
