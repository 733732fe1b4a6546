//! Partition selection strategies.
//!
//! A [`Partitioner`] creates one [`TopicPartitioner`] per topic, and that
//! topic partitioner chooses a partition per record. The produce path
//! guarantees at most one in-flight decision per topic at a time, so topic
//! partitioners keep plain mutable state and need no locking.
//!
//! Strategies that want to route around backed-up partitions implement
//! [`TopicBackupPartitioner`] and advertise it through
//! [`TopicPartitioner::as_backup`]; the produce path then supplies live
//! per-partition buffered-record counts via [`BufferedRecords`] instead of
//! calling [`TopicPartitioner::partition`].

use std::fmt;
use std::sync::Arc;

use crate::types::Record;

/// Creates topic partitioners to determine which partition records are
/// sent to.
///
/// `for_topic` is invoked exactly once per topic; the returned
/// [`TopicPartitioner`] lives for the topic's lifetime.
pub trait Partitioner: Send + Sync {
    fn for_topic(&self, topic: &str) -> Box<dyn TopicPartitioner>;
}

/// Partitions records within an individual topic.
pub trait TopicPartitioner: Send {
    /// Called when producing a record would roll the record's current
    /// partition over to a new batch.
    fn on_new_batch(&mut self) {}

    /// True if a record must map to the same partition even if that
    /// partition is down. If true, a record may map to a partition that
    /// cannot be written to and will error until the partition comes back.
    fn requires_consistency(&self, record: &Record) -> bool;

    /// Determines, among a set of `n` partitions, which index to use for
    /// `record`.
    fn partition(&mut self, record: &Record, n: i32) -> i32;

    /// The backup-aware capability, if this strategy has one. When this
    /// returns `Some`, the produce path calls
    /// [`TopicBackupPartitioner::partition_by_backup`] and never
    /// [`TopicPartitioner::partition`].
    fn as_backup(&mut self) -> Option<&mut dyn TopicBackupPartitioner> {
        None
    }
}

/// Extension capability for partitioning by the number of buffered records
/// per partition.
pub trait TopicBackupPartitioner: TopicPartitioner {
    /// Like [`TopicPartitioner::partition`], but with a view over how many
    /// records are currently buffered per partition.
    fn partition_by_backup(
        &mut self,
        record: &Record,
        n: i32,
        backup: &mut BufferedRecords<'_>,
    ) -> i32;
}

/// Lazy per-partition buffered-record counts for one partition decision.
///
/// Each [`next`](BufferedRecords::next) call reads the count for the next
/// partition index in scan order. It may be called at most `n` times per
/// decision; a strategy calling it more often is broken.
pub struct BufferedRecords<'a> {
    on: i32,
    n: i32,
    buffered: &'a mut dyn FnMut(i32) -> i64,
}

impl<'a> BufferedRecords<'a> {
    /// `buffered` returns the number of buffered records for a partition
    /// index; the produce path backs it with its in-flight bookkeeping.
    pub fn new(n: i32, buffered: &'a mut dyn FnMut(i32) -> i64) -> Self {
        BufferedRecords { on: 0, n, buffered }
    }

    /// Returns the next (partition index, buffered record count) pair.
    ///
    /// # Panics
    ///
    /// Panics when called more than `n` times within one decision; that is
    /// a strategy bug, not a runtime condition.
    pub fn next(&mut self) -> (i32, i64) {
        assert!(
            self.on < self.n,
            "buffered counts requested more times than there are partitions"
        );
        let on = self.on;
        let count = (self.buffered)(on);
        self.on += 1;
        (on, count)
    }
}

/// A "bytes → partition index given n partitions" function, shared by all
/// of a partitioner's topic partitioners.
///
/// Build one with [`kafka_hasher`] or [`sarama_hasher`] to select which
/// ecosystem's hash-to-partition behavior keyed records follow.
#[derive(Clone)]
pub struct PartitionerHasher(Arc<dyn Fn(&[u8], i32) -> i32 + Send + Sync>);

impl PartitionerHasher {
    pub fn partition(&self, key: &[u8], n: i32) -> i32 {
        (self.0)(key, n)
    }
}

impl fmt::Debug for PartitionerHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PartitionerHasher")
    }
}

/// Returns a [`PartitionerHasher`] using `hash_fn` that mirrors how the
/// Java client partitions after hashing: mask out the sign bit, then take
/// the remainder by `n`.
pub fn kafka_hasher(hash_fn: fn(&[u8]) -> u32) -> PartitionerHasher {
    PartitionerHasher(Arc::new(move |key, n| {
        ((hash_fn(key) & 0x7fffffff) as i32) % n
    }))
}

/// Returns a [`PartitionerHasher`] using `hash_fn` that mirrors how Sarama
/// partitions after hashing: interpret the hash as signed, take the
/// remainder by `n`, and flip the sign if negative.
pub fn sarama_hasher(hash_fn: fn(&[u8]) -> u32) -> PartitionerHasher {
    PartitionerHasher(Arc::new(move |key, n| {
        let mut p = (hash_fn(key) as i32) % n;
        if p < 0 {
            p = -p;
        }
        p
    }))
}

/// Murmur2, as the Java client computes it for record keys.
///
/// Straight from the reference C++ and the Java code duplicating it:
/// 4-byte little-endian groups, then a tail switch, with every multiply
/// wrapping.
pub fn murmur2(b: &[u8]) -> u32 {
    const SEED: u32 = 0x9747b28c;
    const M: u32 = 0x5bd1e995;
    const R: u32 = 24;

    let mut h = SEED ^ b.len() as u32;
    let mut chunks = b.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    match tail.len() {
        3 => {
            h ^= (tail[2] as u32) << 16;
            h ^= (tail[1] as u32) << 8;
            h ^= tail[0] as u32;
            h = h.wrapping_mul(M);
        }
        2 => {
            h ^= (tail[1] as u32) << 8;
            h ^= tail[0] as u32;
            h = h.wrapping_mul(M);
        }
        1 => {
            h ^= tail[0] as u32;
            h = h.wrapping_mul(M);
        }
        _ => {}
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Wraps a single `(record, n) → index` function per topic into the
/// framework. The result always reports that it requires consistency, so
/// a pinned choice is never remapped around a down partition.
pub fn basic_consistent_partitioner<F>(partition: F) -> Box<dyn Partitioner>
where
    F: Fn(&str) -> Box<dyn FnMut(&Record, i32) -> i32 + Send> + Send + Sync + 'static,
{
    Box::new(BasicPartitioner {
        partition: Box::new(partition),
    })
}

type ForTopicFn = dyn Fn(&str) -> Box<dyn FnMut(&Record, i32) -> i32 + Send> + Send + Sync;

struct BasicPartitioner {
    partition: Box<ForTopicFn>,
}

impl Partitioner for BasicPartitioner {
    fn for_topic(&self, topic: &str) -> Box<dyn TopicPartitioner> {
        Box::new(BasicTopicPartitioner {
            partition: (self.partition)(topic),
        })
    }
}

struct BasicTopicPartitioner {
    partition: Box<dyn FnMut(&Record, i32) -> i32 + Send>,
}

impl TopicPartitioner for BasicTopicPartitioner {
    fn requires_consistency(&self, _record: &Record) -> bool {
        true
    }

    fn partition(&mut self, record: &Record, n: i32) -> i32 {
        (self.partition)(record, n)
    }
}

/// Returns the partition already set on each record.
///
/// A record with an invalid partition fails in the send pipeline rather
/// than being silently reassigned here.
pub fn manual_partitioner() -> Box<dyn Partitioner> {
    basic_consistent_partitioner(|_topic| {
        Box::new(|record: &Record, _n: i32| record.partition)
            as Box<dyn FnMut(&Record, i32) -> i32 + Send>
    })
}

/// Pins a random partition until the pinned partition rolls over to a new
/// batch, then picks a new random partition, avoiding an immediate repeat
/// of the previous pin.
///
/// Random distribution over time matches per-record random choice, but
/// brokers see fewer, larger batches.
pub fn sticky_partitioner() -> Box<dyn Partitioner> {
    Box::new(StickyPartitioner)
}

struct StickyPartitioner;

impl Partitioner for StickyPartitioner {
    fn for_topic(&self, _topic: &str) -> Box<dyn TopicPartitioner> {
        Box::new(StickyTopicPartitioner::new())
    }
}

struct StickyTopicPartitioner {
    last_part: i32,
    on_part: i32,
    rng: fastrand::Rng,
}

impl StickyTopicPartitioner {
    fn new() -> Self {
        StickyTopicPartitioner {
            last_part: -1,
            on_part: -1,
            rng: fastrand::Rng::new(),
        }
    }

    fn pick(&mut self, n: i32) -> i32 {
        if self.on_part == -1 || self.on_part >= n {
            self.on_part = self.rng.i32(0..n);
            if self.on_part == self.last_part {
                self.on_part = (self.on_part + 1) % n;
            }
        }
        self.on_part
    }
}

impl TopicPartitioner for StickyTopicPartitioner {
    fn on_new_batch(&mut self) {
        self.last_part = self.on_part;
        self.on_part = -1;
    }

    fn requires_consistency(&self, _record: &Record) -> bool {
        false
    }

    fn partition(&mut self, _record: &Record, n: i32) -> i32 {
        self.pick(n)
    }
}

/// The Java client's default partitioning since its 2.4.0 release
/// (KAFKA-8601): hash a non-null key consistently; otherwise stick to a
/// pinned partition until batch rollover.
///
/// With `None`, keys hash exactly how Kafka's default partitioner does:
/// murmur2, mask the sign bit, mod by the partition count. Pass a
/// [`sarama_hasher`]-built hasher (or any other) to interop with a
/// different ecosystem.
pub fn sticky_key_partitioner(hasher: Option<PartitionerHasher>) -> Box<dyn Partitioner> {
    Box::new(StickyKeyPartitioner {
        hasher: hasher.unwrap_or_else(|| kafka_hasher(murmur2)),
    })
}

struct StickyKeyPartitioner {
    hasher: PartitionerHasher,
}

impl Partitioner for StickyKeyPartitioner {
    fn for_topic(&self, _topic: &str) -> Box<dyn TopicPartitioner> {
        Box::new(StickyKeyTopicPartitioner {
            hasher: self.hasher.clone(),
            sticky: StickyTopicPartitioner::new(),
        })
    }
}

struct StickyKeyTopicPartitioner {
    hasher: PartitionerHasher,
    sticky: StickyTopicPartitioner,
}

impl TopicPartitioner for StickyKeyTopicPartitioner {
    fn on_new_batch(&mut self) {
        self.sticky.on_new_batch();
    }

    fn requires_consistency(&self, record: &Record) -> bool {
        record.key.is_some()
    }

    fn partition(&mut self, record: &Record, n: i32) -> i32 {
        match &record.key {
            Some(key) => self.hasher.partition(key, n),
            None => self.sticky.pick(n),
        }
    }
}

/// Prioritizes partitioning by three factors, in order:
///
/// 1. pin to the current pick until there is a new batch
/// 2. on new batch, choose the least backed up partition
/// 3. among equally least-backed-up partitions, the first seen in scan
///    order wins
///
/// This prioritizes throughput under flaky connections or problematic
/// brokers, at the cost of potentially uneven partition load: downed
/// partitions back up slightly, and the partitions still accepting writes
/// get everything else.
pub fn least_backup_partitioner() -> Box<dyn Partitioner> {
    Box::new(LeastBackupPartitioner)
}

struct LeastBackupPartitioner;

impl Partitioner for LeastBackupPartitioner {
    fn for_topic(&self, _topic: &str) -> Box<dyn TopicPartitioner> {
        Box::new(LeastBackupTopicPartitioner { on_part: -1 })
    }
}

struct LeastBackupTopicPartitioner {
    on_part: i32,
}

impl TopicPartitioner for LeastBackupTopicPartitioner {
    fn on_new_batch(&mut self) {
        self.on_part = -1;
    }

    fn requires_consistency(&self, _record: &Record) -> bool {
        false
    }

    fn partition(&mut self, _record: &Record, _n: i32) -> i32 {
        unreachable!("least-backup always partitions through buffered counts")
    }

    fn as_backup(&mut self) -> Option<&mut dyn TopicBackupPartitioner> {
        Some(self)
    }
}

impl TopicBackupPartitioner for LeastBackupTopicPartitioner {
    fn partition_by_backup(
        &mut self,
        _record: &Record,
        n: i32,
        backup: &mut BufferedRecords<'_>,
    ) -> i32 {
        if self.on_part == -1 || self.on_part >= n {
            let mut least = i64::MAX;
            for _ in 0..n {
                let (pick, buffered) = backup.next();
                if buffered < least {
                    least = buffered;
                    self.on_part = pick;
                }
            }
        }
        self.on_part
    }
}
