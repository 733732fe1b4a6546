//! # Gregor
//! Rust-native Kafka client encoding and selection core.
//!
//! This crate provides the three pieces of a Kafka producer/consumer client
//! that demand exact wire-level and algorithmic fidelity, leaving
//! connection management, request dispatch, and metadata refresh to the
//! embedding client. This is pure Rust all the way down; meaning memory
//! safety, safe concurrency, low resource usage, and speed.
//!
//! # Goals
//! - Bit-exact RecordBatch v2 produce encoding, including CRC-32C and
//!   transparent compression with size-based fallback
//! - Partition selection strategies compatible with the Java client and
//!   with Sarama, down to the hash
//! - Incremental direct-consumption assignment against a live topology view
//! - Be a building block for Kafka-compatible clients
//!
//! ## Producing
//! Records are grouped into a [`RecordBatch`](producer::RecordBatch) per
//! topic-partition, then encoded in one pass:
//!
//! ```rust
//! use bytes::BytesMut;
//! use gregor::prelude::*;
//!
//! let mut batch = RecordBatch::new(Record::new("greetings").with_value("hello"));
//! batch.push(Record::new("greetings").with_value("world"));
//!
//! let mut wire = BytesMut::new();
//! batch.append_to(&mut wire, None).unwrap();
//! ```
//!
//! Which partition a record is routed to is decided by a
//! [`Partitioner`](producer::Partitioner); see
//! [`sticky_key_partitioner`](producer::sticky_key_partitioner) for the
//! Kafka-default behavior.
//!
//! ## Direct consumption
//! A [`DirectConsumer`](consumer::DirectConsumer) reconciles the set of
//! topics, partitions, and regex patterns you want against each metadata
//! update, handing back only partitions not yet assigned:
//!
//! ```rust
//! use std::collections::HashMap;
//! use gregor::consumer::DirectConsumer;
//! use gregor::types::Offset;
//!
//! let mut direct = DirectConsumer::builder()
//!     .topics(Offset::EARLIEST, ["events"])
//!     .build()
//!     .unwrap();
//!
//! let topology = HashMap::from([("events".to_string(), vec![0, 1, 2])]);
//! let delta = direct.find_new_assignments(&topology);
//! assert_eq!(delta["events"].len(), 3);
//! ```
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [A Guide To The Kafka Protocol](https://cwiki.apache.org/confluence/display/KAFKA/A+Guide+To+The+Kafka+Protocol)

#![forbid(unsafe_code)]

pub mod compression;
pub mod config;
pub mod constants;
pub mod consumer;
pub mod encode;
pub mod error;
pub mod producer;
pub mod protocol;
pub mod telemetry;
pub mod types;

pub mod prelude {
    //! Main exports for producing and consuming.

    pub use crate::compression::{load_produce_compressor, CompressionCodec, Compressor};
    pub use crate::consumer::{Assignments, DirectConsumer, TopologyView};
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::producer::{
        kafka_hasher, least_backup_partitioner, manual_partitioner, murmur2, sarama_hasher,
        sticky_key_partitioner, sticky_partitioner, Partitioner, RecordBatch, TopicPartitioner,
    };
    pub use crate::types::{Header, Offset, Record};

    pub use bytes;
}
