//! Segment encoder.
//!
//! Writes markers in the layout described in [`crate::format::marker`].
//! Appending to live segments is the log manager's job; this builder exists
//! to produce sealed segments for tooling, recovery tests and benchmarks.

use crate::format::marker::{
    aligned_size, write_checksum, write_header, MarkerKind, MAX_MARKER_SIZE, SEGMENT_FORMAT_VERSION,
    SEGMENT_MAGIC,
};
use byteorder::{ByteOrder, LittleEndian};
use marklog_core::{CollectionId, DatabaseId, Error, Result, Tick, TransactionId};

/// Fixed-field values for one marker. Fields the kind has no slot for are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerFields {
    /// Database id
    pub database: DatabaseId,
    /// Collection id, or view id for view markers, or segment id for headers
    pub object: u64,
    /// Transaction id
    pub transaction: TransactionId,
}

impl MarkerFields {
    /// Fields for a database-scoped marker.
    pub fn database(database: DatabaseId) -> Self {
        MarkerFields {
            database,
            ..Default::default()
        }
    }

    /// Fields for a collection- or view-scoped marker.
    pub fn object(database: DatabaseId, object: u64) -> Self {
        MarkerFields {
            database,
            object,
            ..Default::default()
        }
    }

    /// Fields for a transaction-framing marker.
    pub fn transaction(database: DatabaseId, transaction: TransactionId) -> Self {
        MarkerFields {
            database,
            transaction,
            ..Default::default()
        }
    }
}

/// Encode a single marker, padded to the alignment boundary.
pub fn encode_marker(
    kind: MarkerKind,
    tick: Tick,
    fields: MarkerFields,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let size = kind.fixed_size() + payload.len();
    if size > MAX_MARKER_SIZE {
        return Err(Error::internal(format!(
            "{} marker of {} bytes exceeds the {} byte limit",
            kind, size, MAX_MARKER_SIZE
        )));
    }

    let mut buf = vec![0u8; aligned_size(size)];
    write_header(&mut buf, size, kind, tick);

    if kind == MarkerKind::SegmentHeader {
        buf[24..28].copy_from_slice(&SEGMENT_MAGIC);
        LittleEndian::write_u32(&mut buf[28..32], SEGMENT_FORMAT_VERSION);
        LittleEndian::write_u64(&mut buf[32..40], fields.object);
    } else {
        if let Some(offset) = kind.database_offset() {
            LittleEndian::write_u64(&mut buf[offset..offset + 8], fields.database);
        }
        if let Some(offset) = kind.object_offset() {
            LittleEndian::write_u64(&mut buf[offset..offset + 8], fields.object);
        }
        if let Some(offset) = kind.transaction_offset() {
            LittleEndian::write_u64(&mut buf[offset..offset + 8], fields.transaction);
        }
    }

    buf[kind.fixed_size()..size].copy_from_slice(payload);
    write_checksum(&mut buf, size);
    Ok(buf)
}

/// Builds the bytes of a sealed segment marker by marker.
///
/// Appends chain; the first encoding failure is kept and reported by
/// [`SegmentBuilder::finish`].
#[derive(Debug)]
pub struct SegmentBuilder {
    segment_id: u64,
    bytes: Vec<u8>,
    error: Option<Error>,
}

impl SegmentBuilder {
    /// Start a segment with its header marker at `tick`.
    pub fn new(segment_id: u64, tick: Tick) -> Self {
        let mut builder = Self::without_header(segment_id);
        builder.marker(
            MarkerKind::SegmentHeader,
            tick,
            MarkerFields::object(0, segment_id),
            &[],
        );
        builder
    }

    /// Start a segment with no header marker.
    pub fn without_header(segment_id: u64) -> Self {
        SegmentBuilder {
            segment_id,
            bytes: Vec::new(),
            error: None,
        }
    }

    /// Segment id this builder was created with.
    pub fn segment_id(&self) -> u64 {
        self.segment_id
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append an arbitrary marker.
    pub fn marker(
        &mut self,
        kind: MarkerKind,
        tick: Tick,
        fields: MarkerFields,
        payload: &[u8],
    ) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match encode_marker(kind, tick, fields, payload) {
            Ok(encoded) => self.bytes.extend_from_slice(&encoded),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Append raw bytes, bypassing encoding.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Set the owning database/collection for subsequent document markers.
    pub fn prologue(
        &mut self,
        tick: Tick,
        database: DatabaseId,
        collection: CollectionId,
    ) -> &mut Self {
        self.marker(
            MarkerKind::Prologue,
            tick,
            MarkerFields::object(database, collection),
            &[],
        )
    }

    /// Append a document insert/update.
    pub fn document(&mut self, tick: Tick, transaction: TransactionId, payload: &[u8]) -> &mut Self {
        self.marker(
            MarkerKind::Document,
            tick,
            MarkerFields {
                transaction,
                ..Default::default()
            },
            payload,
        )
    }

    /// Append a document removal.
    pub fn remove(&mut self, tick: Tick, transaction: TransactionId, payload: &[u8]) -> &mut Self {
        self.marker(
            MarkerKind::Remove,
            tick,
            MarkerFields {
                transaction,
                ..Default::default()
            },
            payload,
        )
    }

    /// Append a transaction start.
    pub fn begin_transaction(
        &mut self,
        tick: Tick,
        database: DatabaseId,
        transaction: TransactionId,
    ) -> &mut Self {
        self.marker(
            MarkerKind::BeginTransaction,
            tick,
            MarkerFields::transaction(database, transaction),
            &[],
        )
    }

    /// Append a transaction commit.
    pub fn commit_transaction(
        &mut self,
        tick: Tick,
        database: DatabaseId,
        transaction: TransactionId,
    ) -> &mut Self {
        self.marker(
            MarkerKind::CommitTransaction,
            tick,
            MarkerFields::transaction(database, transaction),
            &[],
        )
    }

    /// Append a transaction abort.
    pub fn abort_transaction(
        &mut self,
        tick: Tick,
        database: DatabaseId,
        transaction: TransactionId,
    ) -> &mut Self {
        self.marker(
            MarkerKind::AbortTransaction,
            tick,
            MarkerFields::transaction(database, transaction),
            &[],
        )
    }

    /// Append a database-scoped marker (create/drop database).
    pub fn database_marker(
        &mut self,
        kind: MarkerKind,
        tick: Tick,
        database: DatabaseId,
        payload: &[u8],
    ) -> &mut Self {
        self.marker(kind, tick, MarkerFields::database(database), payload)
    }

    /// Append a collection, index or view marker.
    pub fn object_marker(
        &mut self,
        kind: MarkerKind,
        tick: Tick,
        database: DatabaseId,
        object: u64,
        payload: &[u8],
    ) -> &mut Self {
        self.marker(kind, tick, MarkerFields::object(database, object), payload)
    }

    /// Append a padding marker.
    pub fn blank(&mut self, tick: Tick) -> &mut Self {
        self.marker(MarkerKind::Blank, tick, MarkerFields::default(), &[])
    }

    /// Seal the segment with a footer marker.
    pub fn footer(&mut self, tick: Tick) -> &mut Self {
        self.marker(MarkerKind::SegmentFooter, tick, MarkerFields::default(), &[])
    }

    /// Take the encoded bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.bytes),
        }
    }
}
