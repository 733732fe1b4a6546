//! Core record and offset types shared by the produce and consume paths.

use bytes::{BufMut, Bytes};
use std::collections::HashMap;
use std::fmt;

use crate::encode::ToByte;
use crate::error::Result;

/// A mapping from topic name to the live partition indices the cluster
/// currently reports for it. Supplied whole by the embedding client's
/// metadata machinery on every reconciliation.
pub type TopologyView = HashMap<String, Vec<i32>>;

/// A Kafka message offset within a partition.
///
/// Offsets are 64-bit signed integers that represent the position
/// of a message within a partition's log.
///
/// # Special Values
///
/// Kafka uses negative values for special offset semantics:
/// - `-1` (`LATEST`): start from the end of the log
/// - `-2` (`EARLIEST`): start from the beginning of the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset(pub i64);

impl Offset {
    /// Special offset meaning "earliest available message".
    pub const EARLIEST: Self = Offset(-2);

    /// Special offset meaning "latest available message" (end of log).
    pub const LATEST: Self = Offset(-1);

    /// Create a new offset from a raw value.
    #[inline]
    pub const fn new(value: i64) -> Self {
        Offset(value)
    }

    /// Get the raw i64 value.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Check if this is a concrete (non-negative) offset.
    #[inline]
    pub const fn is_exact(self) -> bool {
        self.0 >= 0
    }
}

impl From<i64> for Offset {
    fn from(value: i64) -> Self {
        Offset(value)
    }
}

impl From<Offset> for i64 {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToByte for Offset {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.0.encode(buffer)
    }
}

/// A record header: an ordered key/value annotation carried alongside a
/// record's key and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: Option<Bytes>,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Header {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// A single message to produce.
///
/// Key and value are nullable and held as [`Bytes`] so that the batching
/// layer references the caller's payload rather than copying it. A record
/// is immutable once pushed into a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Nullable partitioning key.
    pub key: Option<Bytes>,
    /// Nullable payload.
    pub value: Option<Bytes>,
    /// Ordered header annotations.
    pub headers: Vec<Header>,
    /// Destination topic.
    pub topic: String,
    /// Destination partition. Only meaningful with manual partitioning;
    /// strategy partitioners overwrite it with their choice.
    pub partition: i32,
    /// Record timestamp in milliseconds since the epoch. `None` means
    /// "stamp with wall clock when the record enters a batch".
    pub timestamp_ms: Option<i64>,
}

impl Record {
    /// Create an empty record destined for `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Record {
            key: None,
            value: None,
            headers: Vec::new(),
            topic: topic.into(),
            partition: -1,
            timestamp_ms: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}
