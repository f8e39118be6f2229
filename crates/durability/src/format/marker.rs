//! Log marker layout and kind registry.
//!
//! A segment is a sequence of markers laid out back-to-back, each padded to
//! an 8-byte boundary. Every marker starts with the same 24-byte header;
//! kind-specific fixed fields follow, then an opaque JSON payload.
//!
//! # Marker Layout
//!
//! ```text
//! ┌──────────┬──────────┬──────┬──────────────┬──────────┬───────────────┬──────────────┐
//! │ Size (4) │ CRC32 (4)│ Kind │ Reserved (7) │ Tick (8) │ Fixed fields  │ Payload      │
//! └──────────┴──────────┴──────┴──────────────┴──────────┴───────────────┴──────────────┘
//! ```
//!
//! `Size` is the unpadded length including the header; `0` marks the end of
//! the written part of a segment. The CRC covers bytes `[8, size)`.
//!
//! # Kind Ranges
//!
//! | Range | Group | Fixed fields |
//! |-------|-------|--------------|
//! | 0x01-0x0F | Framing | header: magic, version, segment id; prologue: db, collection |
//! | 0x10-0x1F | Documents | transaction id (owner from the preceding prologue) |
//! | 0x20-0x2F | Transactions | db, transaction id |
//! | 0x30-0x3F | Databases | db |
//! | 0x40-0x4F | Collections | db, collection |
//! | 0x50-0x5F | Indexes | db, collection |
//! | 0x60-0x6F | Views | db, view |

use byteorder::{ByteOrder, LittleEndian};
use marklog_core::{CollectionId, DatabaseId, Tick, TransactionId};

/// Size of the common marker header in bytes.
pub const MARKER_HEADER_SIZE: usize = 24;

/// Markers start on multiples of this many bytes.
pub const MARKER_ALIGNMENT: usize = 8;

/// Upper bound for a single marker; larger sizes are treated as corruption.
pub const MAX_MARKER_SIZE: usize = 64 * 1024 * 1024;

/// Magic bytes carried by the segment header marker: "MLOG"
pub const SEGMENT_MAGIC: [u8; 4] = *b"MLOG";

/// Current segment format version
pub const SEGMENT_FORMAT_VERSION: u32 = 1;

const SIZE_OFFSET: usize = 0;
const CRC_OFFSET: usize = 4;
const KIND_OFFSET: usize = 8;
const TICK_OFFSET: usize = 16;

const FIRST_FIELD: usize = MARKER_HEADER_SIZE;
const SECOND_FIELD: usize = MARKER_HEADER_SIZE + 8;

/// Round a marker size up to the alignment boundary.
pub fn aligned_size(size: usize) -> usize {
    (size + MARKER_ALIGNMENT - 1) & !(MARKER_ALIGNMENT - 1)
}

/// Marker kinds with explicit byte values
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    // ========================================================================
    // Framing (0x01-0x0F)
    // ========================================================================
    /// First marker of every segment
    SegmentHeader = 0x01,

    /// Last marker of a sealed segment
    SegmentFooter = 0x02,

    /// Sets the owning database/collection for the document markers after it
    Prologue = 0x03,

    /// Padding, carries nothing
    Blank = 0x04,

    // ========================================================================
    // Documents (0x10-0x1F)
    // ========================================================================
    /// Document insert/update
    Document = 0x10,

    /// Document removal
    Remove = 0x11,

    // ========================================================================
    // Transactions (0x20-0x2F)
    // ========================================================================
    /// Transaction start
    BeginTransaction = 0x20,

    /// Transaction commit
    CommitTransaction = 0x21,

    /// Transaction abort
    AbortTransaction = 0x22,

    // ========================================================================
    // Databases (0x30-0x3F)
    // ========================================================================
    /// Database creation
    CreateDatabase = 0x30,

    /// Database drop
    DropDatabase = 0x31,

    // ========================================================================
    // Collections (0x40-0x4F)
    // ========================================================================
    /// Collection creation
    CreateCollection = 0x40,

    /// Collection drop
    DropCollection = 0x41,

    /// Collection rename
    RenameCollection = 0x42,

    /// Collection property change
    ChangeCollection = 0x43,

    // ========================================================================
    // Indexes (0x50-0x5F)
    // ========================================================================
    /// Index creation
    CreateIndex = 0x50,

    /// Index drop
    DropIndex = 0x51,

    // ========================================================================
    // Views (0x60-0x6F)
    // ========================================================================
    /// View creation
    CreateView = 0x60,

    /// View drop
    DropView = 0x61,

    /// View property change
    ChangeView = 0x62,
}

/// What a transaction-framing marker does to its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    /// Opens the transaction
    Begin,
    /// Resolves it as committed
    Commit,
    /// Resolves it as aborted
    Abort,
}

impl MarkerKind {
    /// All assigned kinds, in code order.
    pub const ALL: [MarkerKind; 20] = [
        MarkerKind::SegmentHeader,
        MarkerKind::SegmentFooter,
        MarkerKind::Prologue,
        MarkerKind::Blank,
        MarkerKind::Document,
        MarkerKind::Remove,
        MarkerKind::BeginTransaction,
        MarkerKind::CommitTransaction,
        MarkerKind::AbortTransaction,
        MarkerKind::CreateDatabase,
        MarkerKind::DropDatabase,
        MarkerKind::CreateCollection,
        MarkerKind::DropCollection,
        MarkerKind::RenameCollection,
        MarkerKind::ChangeCollection,
        MarkerKind::CreateIndex,
        MarkerKind::DropIndex,
        MarkerKind::CreateView,
        MarkerKind::DropView,
        MarkerKind::ChangeView,
    ];

    /// Decode a kind byte. Unassigned codes (including `0x00`) are `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        let kind = match value {
            0x01 => MarkerKind::SegmentHeader,
            0x02 => MarkerKind::SegmentFooter,
            0x03 => MarkerKind::Prologue,
            0x04 => MarkerKind::Blank,
            0x10 => MarkerKind::Document,
            0x11 => MarkerKind::Remove,
            0x20 => MarkerKind::BeginTransaction,
            0x21 => MarkerKind::CommitTransaction,
            0x22 => MarkerKind::AbortTransaction,
            0x30 => MarkerKind::CreateDatabase,
            0x31 => MarkerKind::DropDatabase,
            0x40 => MarkerKind::CreateCollection,
            0x41 => MarkerKind::DropCollection,
            0x42 => MarkerKind::RenameCollection,
            0x43 => MarkerKind::ChangeCollection,
            0x50 => MarkerKind::CreateIndex,
            0x51 => MarkerKind::DropIndex,
            0x60 => MarkerKind::CreateView,
            0x61 => MarkerKind::DropView,
            0x62 => MarkerKind::ChangeView,
            _ => return None,
        };
        Some(kind)
    }

    /// Byte value of this kind.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            MarkerKind::SegmentHeader => "segment_header",
            MarkerKind::SegmentFooter => "segment_footer",
            MarkerKind::Prologue => "prologue",
            MarkerKind::Blank => "blank",
            MarkerKind::Document => "document",
            MarkerKind::Remove => "remove",
            MarkerKind::BeginTransaction => "begin_transaction",
            MarkerKind::CommitTransaction => "commit_transaction",
            MarkerKind::AbortTransaction => "abort_transaction",
            MarkerKind::CreateDatabase => "create_database",
            MarkerKind::DropDatabase => "drop_database",
            MarkerKind::CreateCollection => "create_collection",
            MarkerKind::DropCollection => "drop_collection",
            MarkerKind::RenameCollection => "rename_collection",
            MarkerKind::ChangeCollection => "change_collection",
            MarkerKind::CreateIndex => "create_index",
            MarkerKind::DropIndex => "drop_index",
            MarkerKind::CreateView => "create_view",
            MarkerKind::DropView => "drop_view",
            MarkerKind::ChangeView => "change_view",
        }
    }

    /// Framing markers (segment header/footer, prologue, blank)
    pub fn is_framing(&self) -> bool {
        matches!(self.as_u8(), 0x00..=0x0F)
    }

    /// Transaction-framing markers, by code range.
    pub fn is_transaction(&self) -> bool {
        matches!(self.as_u8(), 0x20..=0x2F)
    }

    /// Begin/commit/abort relation of a transaction-framing marker.
    pub fn transaction_action(&self) -> Option<TransactionAction> {
        match self {
            MarkerKind::BeginTransaction => Some(TransactionAction::Begin),
            MarkerKind::CommitTransaction => Some(TransactionAction::Commit),
            MarkerKind::AbortTransaction => Some(TransactionAction::Abort),
            _ => None,
        }
    }

    /// Document markers omit their owner ids and rely on the last prologue.
    pub fn uses_context(&self) -> bool {
        matches!(self, MarkerKind::Document | MarkerKind::Remove)
    }

    /// Views store a view id where collection markers store a collection id.
    pub fn is_view(&self) -> bool {
        matches!(self.as_u8(), 0x60..=0x6F)
    }

    /// Kinds that replication followers receive.
    pub fn is_replicable(&self) -> bool {
        !self.is_framing()
    }

    /// Kinds whose marker carries a transaction id.
    pub fn carries_transaction_id(&self) -> bool {
        self.transaction_offset().is_some()
    }

    /// Kinds whose payload is forwarded verbatim to followers.
    pub fn copies_payload(&self) -> bool {
        matches!(
            self,
            MarkerKind::Document
                | MarkerKind::Remove
                | MarkerKind::CreateDatabase
                | MarkerKind::CreateCollection
                | MarkerKind::RenameCollection
                | MarkerKind::ChangeCollection
                | MarkerKind::CreateIndex
                | MarkerKind::DropIndex
                | MarkerKind::CreateView
                | MarkerKind::DropView
                | MarkerKind::ChangeView
        )
    }

    /// Offset of the database id field, if the kind has one.
    pub fn database_offset(&self) -> Option<usize> {
        match self.as_u8() {
            0x03 | 0x20..=0x6F => Some(FIRST_FIELD),
            _ => None,
        }
    }

    /// Offset of the collection (or view) id field, if the kind has one.
    pub fn object_offset(&self) -> Option<usize> {
        match self.as_u8() {
            0x03 | 0x40..=0x6F => Some(SECOND_FIELD),
            _ => None,
        }
    }

    /// Offset of the transaction id field, if the kind has one.
    pub fn transaction_offset(&self) -> Option<usize> {
        match self.as_u8() {
            0x10..=0x1F => Some(FIRST_FIELD),
            0x20..=0x2F => Some(SECOND_FIELD),
            _ => None,
        }
    }

    /// Header plus fixed fields; the payload starts here.
    pub fn fixed_size(&self) -> usize {
        match self {
            MarkerKind::SegmentHeader => MARKER_HEADER_SIZE + 16,
            MarkerKind::SegmentFooter | MarkerKind::Blank => MARKER_HEADER_SIZE,
            MarkerKind::Document | MarkerKind::Remove => MARKER_HEADER_SIZE + 8,
            MarkerKind::CreateDatabase | MarkerKind::DropDatabase => MARKER_HEADER_SIZE + 8,
            _ => MARKER_HEADER_SIZE + 16,
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fields of a segment header marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeaderFields {
    /// Magic bytes, `SEGMENT_MAGIC` when valid
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Segment number written by the log manager
    pub segment_id: u64,
}

impl SegmentHeaderFields {
    /// Whether magic and version are the ones this reader understands.
    pub fn is_valid(&self) -> bool {
        self.magic == SEGMENT_MAGIC && self.format_version == SEGMENT_FORMAT_VERSION
    }
}

/// A decoded marker: a borrowed view into a segment's bytes.
///
/// Only [`crate::wal::MarkerCursor`] creates markers, after checking that the
/// slice is at least `kind.fixed_size()` long, so the accessors never read
/// out of bounds. The view lives as long as the segment bytes it borrows.
#[derive(Debug, Clone, Copy)]
pub struct Marker<'a> {
    bytes: &'a [u8],
    kind: MarkerKind,
    offset: usize,
}

impl<'a> Marker<'a> {
    pub(crate) fn new(bytes: &'a [u8], kind: MarkerKind, offset: usize) -> Self {
        debug_assert!(bytes.len() >= kind.fixed_size());
        Marker {
            bytes,
            kind,
            offset,
        }
    }

    /// Marker kind
    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    /// Marker tick
    pub fn tick(&self) -> Tick {
        LittleEndian::read_u64(&self.bytes[TICK_OFFSET..TICK_OFFSET + 8])
    }

    /// Unpadded size in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Byte offset of the marker inside its segment
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Database id stored in the marker, `0` if the kind has none.
    pub fn database_id(&self) -> DatabaseId {
        self.kind
            .database_offset()
            .map(|o| self.read_u64(o))
            .unwrap_or(0)
    }

    /// Collection id stored in the marker, `0` if the kind has none.
    ///
    /// View markers store a view id in the same slot; use [`Marker::view_id`].
    pub fn collection_id(&self) -> CollectionId {
        if self.kind.is_view() {
            return 0;
        }
        self.kind
            .object_offset()
            .map(|o| self.read_u64(o))
            .unwrap_or(0)
    }

    /// View id of a view marker, `0` otherwise.
    pub fn view_id(&self) -> u64 {
        if !self.kind.is_view() {
            return 0;
        }
        self.kind
            .object_offset()
            .map(|o| self.read_u64(o))
            .unwrap_or(0)
    }

    /// Transaction id, `0` if the kind has none or the write is standalone.
    pub fn transaction_id(&self) -> TransactionId {
        self.kind
            .transaction_offset()
            .map(|o| self.read_u64(o))
            .unwrap_or(0)
    }

    /// Payload bytes after the fixed fields.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.kind.fixed_size()..]
    }

    /// Segment header fields, for `SegmentHeader` markers only.
    pub fn segment_header(&self) -> Option<SegmentHeaderFields> {
        if self.kind != MarkerKind::SegmentHeader {
            return None;
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&self.bytes[FIRST_FIELD..FIRST_FIELD + 4]);
        Some(SegmentHeaderFields {
            magic,
            format_version: LittleEndian::read_u32(&self.bytes[FIRST_FIELD + 4..FIRST_FIELD + 8]),
            segment_id: self.read_u64(SECOND_FIELD),
        })
    }

    /// Checksum stored in the header.
    pub fn stored_checksum(&self) -> u32 {
        stored_checksum(self.bytes)
    }

    /// Raw marker bytes (unpadded).
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    fn read_u64(&self, offset: usize) -> u64 {
        LittleEndian::read_u64(&self.bytes[offset..offset + 8])
    }
}

/// Read the size field at the start of `bytes`. Needs at least 4 bytes.
pub(crate) fn read_size(bytes: &[u8]) -> usize {
    LittleEndian::read_u32(&bytes[SIZE_OFFSET..SIZE_OFFSET + 4]) as usize
}

/// Read the kind byte. Needs a full header.
pub(crate) fn read_kind(bytes: &[u8]) -> u8 {
    bytes[KIND_OFFSET]
}

pub(crate) fn stored_checksum(bytes: &[u8]) -> u32 {
    LittleEndian::read_u32(&bytes[CRC_OFFSET..CRC_OFFSET + 4])
}

/// CRC32 over everything after the checksum field.
pub(crate) fn compute_checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(&bytes[KIND_OFFSET..])
}

pub(crate) fn write_header(buf: &mut [u8], size: usize, kind: MarkerKind, tick: Tick) {
    LittleEndian::write_u32(&mut buf[SIZE_OFFSET..SIZE_OFFSET + 4], size as u32);
    buf[KIND_OFFSET] = kind.as_u8();
    LittleEndian::write_u64(&mut buf[TICK_OFFSET..TICK_OFFSET + 8], tick);
}

pub(crate) fn write_checksum(buf: &mut [u8], size: usize) {
    let crc = compute_checksum(&buf[..size]);
    LittleEndian::write_u32(&mut buf[CRC_OFFSET..CRC_OFFSET + 4], crc);
}
