//! Replication records
//!
//! One [`Record`] per replicated marker, in the JSON shape followers
//! consume: ticks and transaction ids as decimal strings, the operation as a
//! numeric code.

use marklog_core::{Tick, TransactionId};
use marklog_durability::MarkerKind;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io;

/// Follower-facing operation code of a record.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// Database created
    DatabaseCreate = 1100,
    /// Database dropped
    DatabaseDrop = 1101,
    /// Collection created
    CollectionCreate = 2000,
    /// Collection dropped
    CollectionDrop = 2001,
    /// Collection renamed
    CollectionRename = 2002,
    /// Collection properties changed
    CollectionChange = 2003,
    /// Index created
    IndexCreate = 2100,
    /// Index dropped
    IndexDrop = 2101,
    /// View created
    ViewCreate = 2110,
    /// View dropped
    ViewDrop = 2111,
    /// View properties changed
    ViewChange = 2112,
    /// Transaction started
    TransactionStart = 2200,
    /// Transaction committed
    TransactionCommit = 2201,
    /// Transaction aborted
    TransactionAbort = 2202,
    /// Document inserted or replaced
    Document = 2300,
    /// Document removed
    Remove = 2302,
}

impl OperationType {
    /// Operation for a marker kind, `None` for non-replicable kinds.
    pub fn from_marker(kind: MarkerKind) -> Option<Self> {
        let op = match kind {
            MarkerKind::CreateDatabase => OperationType::DatabaseCreate,
            MarkerKind::DropDatabase => OperationType::DatabaseDrop,
            MarkerKind::CreateCollection => OperationType::CollectionCreate,
            MarkerKind::DropCollection => OperationType::CollectionDrop,
            MarkerKind::RenameCollection => OperationType::CollectionRename,
            MarkerKind::ChangeCollection => OperationType::CollectionChange,
            MarkerKind::CreateIndex => OperationType::IndexCreate,
            MarkerKind::DropIndex => OperationType::IndexDrop,
            MarkerKind::CreateView => OperationType::ViewCreate,
            MarkerKind::DropView => OperationType::ViewDrop,
            MarkerKind::ChangeView => OperationType::ViewChange,
            MarkerKind::BeginTransaction => OperationType::TransactionStart,
            MarkerKind::CommitTransaction => OperationType::TransactionCommit,
            MarkerKind::AbortTransaction => OperationType::TransactionAbort,
            MarkerKind::Document => OperationType::Document,
            MarkerKind::Remove => OperationType::Remove,
            MarkerKind::SegmentHeader
            | MarkerKind::SegmentFooter
            | MarkerKind::Prologue
            | MarkerKind::Blank => return None,
        };
        Some(op)
    }

    /// Numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Decode a numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        let op = match code {
            1100 => OperationType::DatabaseCreate,
            1101 => OperationType::DatabaseDrop,
            2000 => OperationType::CollectionCreate,
            2001 => OperationType::CollectionDrop,
            2002 => OperationType::CollectionRename,
            2003 => OperationType::CollectionChange,
            2100 => OperationType::IndexCreate,
            2101 => OperationType::IndexDrop,
            2110 => OperationType::ViewCreate,
            2111 => OperationType::ViewDrop,
            2112 => OperationType::ViewChange,
            2200 => OperationType::TransactionStart,
            2201 => OperationType::TransactionCommit,
            2202 => OperationType::TransactionAbort,
            2300 => OperationType::Document,
            2302 => OperationType::Remove,
            _ => return None,
        };
        Some(op)
    }
}

impl Serialize for OperationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for OperationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        OperationType::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown operation type {}", code)))
    }
}

/// One replicated change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Marker tick
    #[serde(with = "tick_string")]
    pub tick: Tick,
    /// Operation code
    #[serde(rename = "type")]
    pub operation: OperationType,
    /// Transaction id, for document and transaction-framing operations
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_tick_string")]
    pub tid: Option<TransactionId>,
    /// Database name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    /// Collection unique id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuid: Option<String>,
    /// Marker payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Record {
    /// Record with only tick and operation set.
    pub fn new(tick: Tick, operation: OperationType) -> Self {
        Record {
            tick,
            operation,
            tid: None,
            db: None,
            cuid: None,
            data: None,
        }
    }

    /// Length of the record's JSON encoding, without building it.
    pub fn encoded_len(&self) -> serde_json::Result<usize> {
        let mut counter = ByteCounter(0);
        serde_json::to_writer(&mut counter, self)?;
        Ok(counter.0)
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

mod tick_string {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

mod opt_tick_string {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => text.parse().map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
