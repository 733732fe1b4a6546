//! Producer configuration consumed by the encoding core.
//!
//! The embedding client assembles these values (from its own option
//! surface, files, flags) and hands them down as plain data; this core
//! only validates and reads them.

use crate::compression::CompressionCodec;
use crate::error::{Error, Result};

/// The number of acknowledgements a partition leader must gather before a
/// produce request is considered complete.
///
/// This controls the durability of written records and corresponds to
/// "acks" in Kafka's producer configuration documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredAcks {
    /// Records are considered sent as soon as they are written on the
    /// wire. The leader does not reply.
    None,
    /// The leader replies once it has written the record, without waiting
    /// for in-sync replicas. The default.
    #[default]
    Leader,
    /// All in-sync replicas must acknowledge the write before the leader
    /// replies success.
    AllIsr,
}

impl RequiredAcks {
    /// The wire value carried in a produce request.
    pub fn value(self) -> i16 {
        match self {
            RequiredAcks::None => 0,
            RequiredAcks::Leader => 1,
            RequiredAcks::AllIsr => -1,
        }
    }
}

/// Validated producer settings.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Acknowledgement level for produce requests.
    pub acks: RequiredAcks,

    /// Compression codecs in order of preference; the first codec the
    /// negotiated protocol version supports wins.
    pub compression: Vec<CompressionCodec>,

    /// Upper bound on the size of a single record batch before
    /// compression. Corresponds to Kafka's max.message.bytes
    /// (default 1,000,012; we default to a round 1,000,000).
    pub max_record_batch_bytes: i32,

    /// Upper bound on the bytes written to a broker connection in a
    /// single produce request. Corresponds to a broker's
    /// socket.request.max.bytes, default 100 MiB.
    pub max_broker_write_bytes: i32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            acks: RequiredAcks::Leader,
            compression: vec![CompressionCodec::none()],
            max_record_batch_bytes: 1_000_000,
            max_broker_write_bytes: 100 << 20,
        }
    }
}

impl ProducerConfig {
    /// Check internal consistency. Called once by the embedding client
    /// before the configuration reaches the produce path.
    pub fn validate(&self) -> Result<()> {
        for codec in &self.compression {
            codec.validate()?;
        }
        if self.max_record_batch_bytes < 1 << 10 {
            return Err(Error::Config(format!(
                "max record batch bytes {} is less than min acceptable {}",
                self.max_record_batch_bytes,
                1 << 10
            )));
        }
        if self.max_broker_write_bytes < 1 << 10 {
            return Err(Error::Config(format!(
                "max broker write bytes {} is less than min acceptable {}",
                self.max_broker_write_bytes,
                1 << 10
            )));
        }
        if self.max_broker_write_bytes < self.max_record_batch_bytes {
            return Err(Error::Config(format!(
                "max broker write bytes {} is erroneously less than max record batch bytes {}",
                self.max_broker_write_bytes, self.max_record_batch_bytes
            )));
        }
        // upper bound broker write bytes to avoid overflowing
        // calculations downstream
        if self.max_broker_write_bytes > 1 << 30 {
            return Err(Error::Config(format!(
                "max broker write bytes {} is greater than max acceptable {}",
                self.max_broker_write_bytes,
                1 << 30
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_acks_wire_values() {
        assert_eq!(RequiredAcks::None.value(), 0);
        assert_eq!(RequiredAcks::Leader.value(), 1);
        assert_eq!(RequiredAcks::AllIsr.value(), -1);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ProducerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.acks, RequiredAcks::Leader);
    }

    #[test]
    fn test_rejects_tiny_batch_bytes() {
        let config = ProducerConfig {
            max_record_batch_bytes: 512,
            ..ProducerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_write_bytes_below_batch_bytes() {
        let config = ProducerConfig {
            max_record_batch_bytes: 10 << 20,
            max_broker_write_bytes: 1 << 20,
            ..ProducerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_write_bytes() {
        let config = ProducerConfig {
            max_broker_write_bytes: (1 << 30) + 1,
            ..ProducerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_codec_level() {
        let config = ProducerConfig {
            compression: vec![CompressionCodec::gzip().with_level(42)],
            ..ProducerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
