//! Marker to record conversion.
//!
//! Resolves the names a follower needs (database name, collection unique
//! id) and copies payloads for the kinds that carry data. Objects that
//! disappeared concurrently make the marker a [`Serialized::Skip`], never
//! an error.

use crate::names::NameCache;
use crate::record::{OperationType, Record};
use marklog_core::{CollectionId, DatabaseId, DatabaseRef, Error, Result};
use marklog_durability::{Marker, MarkerKind};

/// Why an accepted marker produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Owning database no longer resolves
    DatabaseGone,
    /// Owning collection no longer resolves
    CollectionGone,
    /// Drop-database marker without a name in its payload
    MissingDatabaseName,
}

/// Outcome of serializing one marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    /// A record to emit, with the live database it belongs to
    Record {
        /// The record
        record: Record,
        /// Owning database, `None` once dropped
        database: Option<DatabaseRef>,
    },
    /// Nothing to emit
    Skip(SkipReason),
}

/// Convert an accepted marker into a record.
///
/// `database` and `collection` are the marker's effective owner ids. A
/// non-replicable kind is a defect and fails with `Internal`; a payload that
/// is not valid JSON fails with `Corrupt`.
pub fn serialize(
    marker: &Marker<'_>,
    database: DatabaseId,
    collection: CollectionId,
    names: &mut NameCache<'_>,
) -> Result<Serialized> {
    let kind = marker.kind();
    let operation = OperationType::from_marker(kind).ok_or_else(|| {
        Error::internal(format!(
            "{} marker at tick {} reached serialization",
            kind,
            marker.tick()
        ))
    })?;

    let mut record = Record::new(marker.tick(), operation);
    if kind.carries_transaction_id() {
        record.tid = Some(marker.transaction_id());
    }

    match kind {
        MarkerKind::DropDatabase => {
            // The database is gone; its name only survives in the payload
            let name = match payload_str(marker, "name")? {
                Some(name) => name,
                None => return Ok(Serialized::Skip(SkipReason::MissingDatabaseName)),
            };
            record.db = Some(name);
            Ok(Serialized::Record {
                record,
                database: None,
            })
        }
        MarkerKind::DropCollection => {
            let db = match names.database(database) {
                Some(db) => db.clone(),
                None => return Ok(Serialized::Skip(SkipReason::DatabaseGone)),
            };
            let cuid = match payload_str(marker, "cuid")? {
                Some(cuid) => cuid,
                None => match names.collection(database, collection) {
                    Some(resolved) => resolved.cuid.clone(),
                    None => return Ok(Serialized::Skip(SkipReason::CollectionGone)),
                },
            };
            record.db = Some(db.name.clone());
            record.cuid = Some(cuid);
            Ok(Serialized::Record {
                record,
                database: Some(db),
            })
        }
        _ => {
            let db = match names.database(database) {
                Some(db) => db.clone(),
                None => return Ok(Serialized::Skip(SkipReason::DatabaseGone)),
            };
            if collection != 0 {
                match names.collection(database, collection) {
                    Some(resolved) => record.cuid = Some(resolved.cuid.clone()),
                    None => return Ok(Serialized::Skip(SkipReason::CollectionGone)),
                }
            }
            if kind.copies_payload() {
                record.data = parse_payload(marker)?;
            }
            record.db = Some(db.name.clone());
            Ok(Serialized::Record {
                record,
                database: Some(db),
            })
        }
    }
}

/// Parse the payload as JSON; an empty payload is `None`.
pub(crate) fn parse_payload(marker: &Marker<'_>) -> Result<Option<serde_json::Value>> {
    let payload = marker.payload();
    if payload.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(payload).map(Some).map_err(|e| {
        Error::corrupt(format!(
            "{} marker at tick {} has an invalid payload: {}",
            marker.kind(),
            marker.tick(),
            e
        ))
    })
}

/// String field of the payload object, `None` if absent.
pub(crate) fn payload_str(marker: &Marker<'_>, field: &str) -> Result<Option<String>> {
    Ok(parse_payload(marker)?
        .as_ref()
        .and_then(|value| value.get(field))
        .and_then(|value| value.as_str())
        .map(str::to_string))
}
