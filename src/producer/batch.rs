//! Record batches and their produce-side wire encoding.
//!
//! A [`RecordBatch`] is an append-only group of records destined for one
//! topic-partition. Each record is numbered exactly once as it enters the
//! batch: its serialized length, its offset delta (position within the
//! batch), and its timestamp delta relative to the batch's first record.
//! The batch tracks its total wire length incrementally so the produce
//! path can bound batch sizes without encoding anything.
//!
//! Encoding happens in a single pass. The header is written before the
//! final size of the record region is known (compression may shrink it),
//! so the encoder records the absolute offsets of the length fields and
//! the attributes word, and patches them in place when compression sticks.
//! The CRC is computed last, over the finished bytes, whether or not the
//! region was compressed.

use bytes::{BufMut, BytesMut};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::compression::Compressor;
use crate::constants::{
    BATCH_LENGTH_OVERHEAD, EMPTY_ENTRY_WIRE_LENGTH, NO_BASE_SEQUENCE, NO_PARTITION_LEADER_EPOCH,
    NO_PRODUCER_EPOCH, NO_PRODUCER_ID, RECORD_BATCH_MAGIC,
};
use crate::encode::{
    encode_varint, encode_varint_bytes, encode_varint_string, varint_bytes_len, varint_len,
    varint_string_len, ToByte,
};
use crate::error::Result;
use crate::protocol::{crc32c, patch_i16, patch_i32, patch_u32};
use crate::types::Record;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A record annotated with its position and size within a batch.
/// Derived once when the record is pushed; immutable afterward.
#[derive(Debug, Clone)]
pub struct NumberedRecord {
    record: Record,
    length_field: i32,
    timestamp_delta: i32,
    offset_delta: i32,
}

impl NumberedRecord {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn offset_delta(&self) -> i32 {
        self.offset_delta
    }

    pub fn timestamp_delta(&self) -> i32 {
        self.timestamp_delta
    }

    /// Total encoded size: the varint length prefix plus the body it
    /// describes.
    fn wire_length(&self) -> i32 {
        varint_len(self.length_field) as i32 + self.length_field
    }

    fn append_to<W: BufMut>(&self, dst: &mut W) -> Result<()> {
        encode_varint(dst, self.length_field);
        0i8.encode(dst)?; // record attributes, unused
        encode_varint(dst, self.timestamp_delta);
        encode_varint(dst, self.offset_delta);
        encode_varint_bytes(dst, self.record.key.as_deref());
        encode_varint_bytes(dst, self.record.value.as_deref());
        encode_varint(dst, self.record.headers.len() as i32);
        for header in &self.record.headers {
            encode_varint_string(dst, &header.key);
            encode_varint_bytes(dst, header.value.as_deref());
        }
        Ok(())
    }
}

/// Serialized size of a record body given the deltas it will carry.
fn record_body_len(record: &Record, timestamp_delta: i32, offset_delta: i32) -> i32 {
    let mut len = 1 // record attributes
        + varint_len(timestamp_delta)
        + varint_len(offset_delta)
        + varint_bytes_len(record.key.as_deref())
        + varint_bytes_len(record.value.as_deref())
        + varint_len(record.headers.len() as i32);
    for header in &record.headers {
        len += varint_string_len(&header.key) + varint_bytes_len(header.value.as_deref());
    }
    len as i32
}

/// An ordered, append-only group of records for one topic-partition,
/// encoded and transmitted as a unit.
///
/// A batch always holds at least one record: construction takes the first
/// record, which also fixes the batch's base timestamp. Once the produce
/// path stops appending, the batch is sealed by convention; encoding via
/// [`append_to`](RecordBatch::append_to) is the only remaining operation
/// and is idempotent given the same compression outcome.
#[derive(Debug)]
pub struct RecordBatch {
    records: Vec<NumberedRecord>,
    first_timestamp_ms: i64,
    attrs: i16,
    wire_length: i32,
}

impl RecordBatch {
    /// Start a batch with its first record. The record's timestamp (wall
    /// clock if unset) becomes the batch's base timestamp.
    pub fn new(first: Record) -> Self {
        let first_timestamp_ms = first.timestamp_ms.unwrap_or_else(now_ms);
        let mut batch = RecordBatch {
            records: Vec::new(),
            first_timestamp_ms,
            attrs: 0,
            wire_length: EMPTY_ENTRY_WIRE_LENGTH,
        };
        batch.push(first);
        batch
    }

    /// Append a record, numbering it in place.
    pub fn push(&mut self, record: Record) {
        let (timestamp_delta, offset_delta) = self.deltas_for(&record);
        let length_field = record_body_len(&record, timestamp_delta, offset_delta);
        let numbered = NumberedRecord {
            record,
            length_field,
            timestamp_delta,
            offset_delta,
        };
        self.wire_length += numbered.wire_length();
        self.records.push(numbered);
    }

    fn deltas_for(&self, record: &Record) -> (i32, i32) {
        let timestamp_ms = record.timestamp_ms.unwrap_or_else(now_ms);
        (
            (timestamp_ms - self.first_timestamp_ms) as i32,
            self.records.len() as i32,
        )
    }

    /// Whether appending `record` would push the encoded batch past
    /// `max_bytes`. Used by the produce path to roll over to a new batch
    /// before a push, since batches only grow.
    pub fn would_exceed(&self, record: &Record, max_bytes: i32) -> bool {
        let (timestamp_delta, offset_delta) = self.deltas_for(record);
        let body = record_body_len(record, timestamp_delta, offset_delta);
        self.wire_length + varint_len(body) as i32 + body > max_bytes
    }

    pub fn records(&self) -> &[NumberedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_timestamp_ms(&self) -> i64 {
        self.first_timestamp_ms
    }

    /// The exact number of bytes [`append_to`](RecordBatch::append_to)
    /// will write before compression.
    pub fn wire_length(&self) -> i32 {
        self.wire_length
    }

    /// Append the batch's produce-entry wire form to `dst`: the leading
    /// nullable-bytes length, the RecordBatch v2 header, and every record.
    ///
    /// When a compressor is supplied, the record region is compressed in
    /// place and the already-written length fields and attributes word are
    /// patched; if the codec fails or its output is not strictly smaller,
    /// the uncompressed region is kept and no codec bit is set. The CRC is
    /// computed last either way, so the stored checksum always covers the
    /// bytes that go on the wire.
    pub fn append_to(&self, dst: &mut BytesMut, compressor: Option<&Compressor>) -> Result<()> {
        let nullable_len = self.wire_length - 4;
        let nullable_len_at = dst.len();
        nullable_len.encode(dst)?;

        0i64.encode(dst)?; // base offset; brokers assign the real one

        let batch_len = nullable_len - BATCH_LENGTH_OVERHEAD;
        let batch_len_at = dst.len();
        batch_len.encode(dst)?;

        NO_PARTITION_LEADER_EPOCH.encode(dst)?;
        RECORD_BATCH_MAGIC.encode(dst)?;

        let crc_at = dst.len();
        0i32.encode(dst)?; // reserved, patched last

        let attrs_at = dst.len();
        let mut attrs = self.attrs;
        attrs.encode(dst)?;

        ((self.records.len() - 1) as i32).encode(dst)?; // last offset delta
        self.first_timestamp_ms.encode(dst)?;

        // max timestamp is the timestamp of the last record in the batch
        let last = self
            .records
            .last()
            .expect("a batch always holds at least one record");
        (self.first_timestamp_ms + i64::from(last.timestamp_delta)).encode(dst)?;

        NO_PRODUCER_ID.encode(dst)?;
        NO_PRODUCER_EPOCH.encode(dst)?;
        NO_BASE_SEQUENCE.encode(dst)?;

        (self.records.len() as i32).encode(dst)?;
        let records_at = dst.len();
        for record in &self.records {
            record.append_to(dst)?;
        }

        if let Some(compressor) = compressor {
            let uncompressed = dst.len() - records_at;
            if let Some(compressed) = compressor.compress(&dst[records_at..]) {
                if compressed.len() < uncompressed {
                    // our compressed form was shorter: swap it in and
                    // update the few batch fields we already wrote
                    let savings = (uncompressed - compressed.len()) as i32;
                    dst.truncate(records_at);
                    dst.extend_from_slice(&compressed);

                    attrs |= compressor.attrs();
                    patch_i32(dst, nullable_len_at, nullable_len - savings);
                    patch_i32(dst, batch_len_at, batch_len - savings);
                    patch_i16(dst, attrs_at, attrs);
                } else {
                    debug!(
                        uncompressed,
                        compressed = compressed.len(),
                        "compressed region no smaller, keeping uncompressed"
                    );
                }
            }
        }

        let crc = crc32c(&dst[crc_at + 4..]);
        patch_u32(dst, crc_at, crc);

        Ok(())
    }
}
