//! The produce path: batching, partition selection, request assembly.

pub mod batch;
pub mod partitioner;
pub mod request;

pub use batch::{NumberedRecord, RecordBatch};
pub use partitioner::{
    basic_consistent_partitioner, kafka_hasher, least_backup_partitioner, manual_partitioner,
    murmur2, sarama_hasher, sticky_key_partitioner, sticky_partitioner, BufferedRecords,
    Partitioner, PartitionerHasher, TopicBackupPartitioner, TopicPartitioner,
};
pub use request::BufferedProduceRequest;
