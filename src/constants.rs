//! Wire layout constants for the produce-side record batch entry.
//!
//! A produce request carries, per partition, one "entry": a 4-byte
//! nullable-bytes length followed by a RecordBatch v2. All offsets below
//! are relative to the start of that entry.
//!
//! ```text
//! Offset  Size  Field
//! 0       4     nullable-bytes length (covers everything after itself)
//! 4       8     base_offset (always 0 when producing)
//! 12      4     batch_length (covers everything after itself)
//! 16      4     partition_leader_epoch (-1 from clients)
//! 20      1     magic (2)
//! 21      4     crc (over bytes 25..end)
//! 25      2     attributes
//! 27      4     last_offset_delta
//! 31      8     first_timestamp
//! 39      8     max_timestamp
//! 47      8     producer_id (-1, non-idempotent)
//! 55      2     producer_epoch (-1)
//! 57      4     base_sequence (-1)
//! 61      4     record_count
//! 65      ...   records (the only compressible region)
//! ```

/// Offset of the entry's leading nullable-bytes length field.
pub const ENTRY_LENGTH_OFFSET: usize = 0;

/// Offset of the batch_length field.
pub const ENTRY_BATCH_LENGTH_OFFSET: usize = 12;

/// Offset of the CRC field (4 bytes, u32 big-endian).
pub const ENTRY_CRC_OFFSET: usize = 21;

/// Start of the CRC-covered region (the attributes word).
/// CRC is computed over bytes [25..end] of the entry.
pub const ENTRY_CRC_DATA_START: usize = 25;

/// Offset of the attributes word, patched in place when compression sticks.
pub const ENTRY_ATTRIBUTES_OFFSET: usize = 25;

/// Wire size of an entry holding zero records: the full fixed header.
/// Every appended record adds its encoded size on top of this.
pub const EMPTY_ENTRY_WIRE_LENGTH: i32 = 65;

/// The nullable-bytes length excludes its own 4 bytes; the batch_length
/// field additionally excludes base_offset (8) and itself (4).
pub const BATCH_LENGTH_OVERHEAD: i32 = 12;

/// Record batch format version ("magic") for v0.11.0.0+ records.
pub const RECORD_BATCH_MAGIC: i8 = 2;

/// Partition leader epoch is unused by producing clients.
pub const NO_PARTITION_LEADER_EPOCH: i32 = -1;

/// Producer id / epoch / base sequence for a non-idempotent producer.
pub const NO_PRODUCER_ID: i64 = -1;
pub const NO_PRODUCER_EPOCH: i16 = -1;
pub const NO_BASE_SEQUENCE: i32 = -1;
