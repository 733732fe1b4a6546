//! Crate & protocol level errors.
//!
//! Two kinds of failure matter to this core:
//!
//! - [`Error`]: local failures (configuration validation, caller contract
//!   problems surfaced as values rather than panics)
//! - [`KafkaCode`]: error codes a broker reports on the wire, relevant when
//!   the embedding client maps produce/fetch responses back onto buffered
//!   work
//!
//! The core itself never retries; [`Error::is_retriable`] only classifies,
//! so that the embedding client's retry policy can act on it.

use num_derive::FromPrimitive;
use std::result;
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

/// Local client errors.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A regex topic pattern failed to compile.
    #[error("invalid topic pattern: {0}")]
    InvalidPattern(String),

    /// A record encodes larger than the client's configured limits allow.
    #[error("record is too large given client max limits")]
    RecordTooLarge,

    /// An error reported by a broker.
    #[error("broker error: {0:?}")]
    Kafka(KafkaCode),
}

impl Error {
    /// Whether the operation that produced this error is worth retrying.
    ///
    /// Local errors are caller mistakes and never retriable; broker errors
    /// are retriable when the code represents a transient cluster state
    /// (leader elections, metadata propagation, timeouts).
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Kafka(code) => code.is_retriable(),
            _ => false,
        }
    }
}

/// Errors reported by a remote Kafka broker, as carried in response error
/// code fields. See also [Kafka Errors](http://kafka.apache.org/protocol.html).
///
/// Only the codes a producing or directly-consuming client can observe are
/// listed; group coordination codes belong to the embedding client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, Default)]
pub enum KafkaCode {
    /// An unexpected server error.
    Unknown = -1,
    #[default]
    None = 0,
    /// The requested offset is outside the range of offsets
    /// maintained by the server for the given topic/partition.
    OffsetOutOfRange = 1,
    /// This indicates that a message contents does not match its CRC.
    CorruptMessage = 2,
    /// This request is for a topic or partition that does not exist
    /// on this broker.
    UnknownTopicOrPartition = 3,
    /// The message has a negative size.
    InvalidMessageSize = 4,
    /// No leader exists for this partition, typically mid-election.
    LeaderNotAvailable = 5,
    /// The client sent to a replica that is not the leader; its
    /// metadata is out of date.
    NotLeaderForPartition = 6,
    /// The request exceeded the user-specified time limit.
    RequestTimedOut = 7,
    /// Used mostly by tools when a broker is not alive.
    BrokerNotAvailable = 8,
    /// A replica is expected on a broker but is not (safe to ignore).
    ReplicaNotAvailable = 9,
    /// The client attempted to produce a message larger than the
    /// broker's configured maximum.
    MessageSizeTooLarge = 10,
    /// The server disconnected before a response was received.
    NetworkException = 13,
    /// The request attempted to access an invalid or internal topic.
    InvalidTopic = 17,
    /// A message batch in a produce request exceeds the maximum
    /// configured segment size.
    RecordListTooLarge = 18,
    /// Fewer in-sync replicas than required and requiredAcks is -1.
    NotEnoughReplicas = 19,
    /// The message was written to the log, but with fewer in-sync
    /// replicas than required.
    NotEnoughReplicasAfterAppend = 20,
    /// The requested requiredAcks is invalid (must be -1, 0, or 1).
    InvalidRequiredAcks = 21,
    /// The client is not authorized to access the requested topic.
    TopicAuthorizationFailed = 29,
    /// The timestamp of the message is out of acceptable range.
    InvalidTimestamp = 32,
    /// The version of API is not supported.
    UnsupportedVersion = 35,
    /// The message format version on the broker does not support the request.
    UnsupportedForMessageFormat = 43,
    /// The requested compression type is not supported by the broker.
    UnsupportedCompressionType = 76,
}

impl KafkaCode {
    /// Whether this broker error represents a transient condition that a
    /// retry (usually after a metadata refresh) can clear.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            KafkaCode::CorruptMessage
                | KafkaCode::UnknownTopicOrPartition
                | KafkaCode::LeaderNotAvailable
                | KafkaCode::NotLeaderForPartition
                | KafkaCode::RequestTimedOut
                | KafkaCode::BrokerNotAvailable
                | KafkaCode::ReplicaNotAvailable
                | KafkaCode::NetworkException
                | KafkaCode::NotEnoughReplicas
                | KafkaCode::NotEnoughReplicasAfterAppend
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_error_display() {
        let err = Error::Config("bad codec".to_string());
        let display = format!("{}", err);
        assert!(display.contains("configuration error"));
        assert!(display.contains("bad codec"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::RecordTooLarge);
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_kafka_code_from_primitive() {
        assert_eq!(KafkaCode::from_i16(-1), Some(KafkaCode::Unknown));
        assert_eq!(KafkaCode::from_i16(0), Some(KafkaCode::None));
        assert_eq!(KafkaCode::from_i16(1), Some(KafkaCode::OffsetOutOfRange));
        assert_eq!(
            KafkaCode::from_i16(3),
            Some(KafkaCode::UnknownTopicOrPartition)
        );
        assert_eq!(KafkaCode::from_i16(7), Some(KafkaCode::RequestTimedOut));
        assert_eq!(KafkaCode::from_i16(35), Some(KafkaCode::UnsupportedVersion));
        assert_eq!(
            KafkaCode::from_i16(76),
            Some(KafkaCode::UnsupportedCompressionType)
        );
    }

    #[test]
    fn test_kafka_code_unknown_value() {
        // Values not in the enum should return None
        assert_eq!(KafkaCode::from_i16(999), None);
        assert_eq!(KafkaCode::from_i16(-100), None);
    }

    #[test]
    fn test_retriable_classification() {
        assert!(Error::Kafka(KafkaCode::NotLeaderForPartition).is_retriable());
        assert!(Error::Kafka(KafkaCode::LeaderNotAvailable).is_retriable());
        assert!(Error::Kafka(KafkaCode::RequestTimedOut).is_retriable());

        assert!(!Error::Kafka(KafkaCode::MessageSizeTooLarge).is_retriable());
        assert!(!Error::Kafka(KafkaCode::InvalidRequiredAcks).is_retriable());
        assert!(!Error::RecordTooLarge.is_retriable());
        assert!(!Error::Config("x".to_string()).is_retriable());
    }

    #[test]
    fn test_kafka_code_values() {
        assert_eq!(KafkaCode::Unknown as i16, -1);
        assert_eq!(KafkaCode::None as i16, 0);
        assert_eq!(KafkaCode::CorruptMessage as i16, 2);
        assert_eq!(KafkaCode::NotLeaderForPartition as i16, 6);
        assert_eq!(KafkaCode::RecordListTooLarge as i16, 18);
        assert_eq!(KafkaCode::UnsupportedForMessageFormat as i16, 43);
    }

    #[test]
    fn test_error_clone() {
        let err = Error::Kafka(KafkaCode::InvalidTopic);
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}
