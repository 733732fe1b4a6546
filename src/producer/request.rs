//! Produce request assembly for buffered batches.
//!
//! When the produce path flushes, it has a map of batches per topic and
//! partition. [`BufferedProduceRequest`] writes those straight into the
//! produce request body, negotiating compression once for the whole
//! request, rather than materializing an intermediate request structure.
//!
//! The surrounding request envelope (api key, version, correlation id,
//! client id) belongs to the connection layer; this type only encodes the
//! body.

use bytes::BytesMut;
use std::collections::HashMap;

use crate::compression::{load_produce_compressor, CompressionCodec};
use crate::config::RequiredAcks;
use crate::encode::ToByte;
use crate::error::Result;
use crate::producer::batch::RecordBatch;

/// The body of one produce request, assembled from buffered batches.
pub struct BufferedProduceRequest {
    /// Negotiated produce request version.
    pub version: i16,
    /// Acknowledgement level.
    pub acks: RequiredAcks,
    /// Broker-side timeout for the produce.
    pub timeout_ms: i32,
    /// Batches to flush: topic → partition → batch.
    pub data: HashMap<String, HashMap<i32, RecordBatch>>,
    /// Compression codecs in order of preference.
    pub compression: Vec<CompressionCodec>,
}

impl BufferedProduceRequest {
    /// Kafka API key for Produce.
    pub const API_KEY: i16 = 0;
    /// Minimum version this encoding supports (v3 introduced the
    /// transactional id field this writes as null).
    pub const MIN_VERSION: i16 = 3;
    /// Maximum version this encoding supports.
    pub const MAX_VERSION: i16 = 7;

    /// Append the request body to `dst`.
    pub fn append_to(&self, dst: &mut BytesMut) -> Result<()> {
        if self.version >= 3 {
            Option::<&str>::None.encode(dst)?; // transactional id, unused
        }

        let compressor = load_produce_compressor(&self.compression, self.version);

        self.acks.value().encode(dst)?;
        self.timeout_ms.encode(dst)?;

        (self.data.len() as i32).encode(dst)?;
        for (topic, partitions) in &self.data {
            topic.as_str().encode(dst)?;
            (partitions.len() as i32).encode(dst)?;
            for (partition, batch) in partitions {
                partition.encode(dst)?;
                batch.append_to(dst, compressor.as_ref())?;
            }
        }
        Ok(())
    }
}
