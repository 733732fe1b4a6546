//! Direct topic/partition consumption assignment.
//!
//! A [`DirectConsumer`] holds what the caller wants to consume — topics at
//! an offset, regex patterns over topic names, explicit partition pins —
//! and reconciles that against each metadata update via
//! [`find_new_assignments`](DirectConsumer::find_new_assignments). Each
//! reconciliation returns only the (topic, partition, offset) triples not
//! handed out before; the consumer remembers what it has already assigned
//! and never offers a partition twice.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Offset, TopologyView};

/// An incremental assignment delta: topic → partition → offset to start
/// consuming from. An empty map means "no new assignments", which is a
/// normal outcome, not an error.
pub type Assignments = HashMap<String, HashMap<i32, Offset>>;

/// Decides whether a regex-mode topic wish applies to a topic name.
///
/// [`regex::Regex`] is the production implementation; the trait exists so
/// matching is observable (e.g. a counting stand-in can verify that
/// memoization prevents re-matching).
pub trait TopicMatcher: Send {
    fn is_match(&self, topic: &str) -> bool;
}

impl TopicMatcher for regex::Regex {
    fn is_match(&self, topic: &str) -> bool {
        regex::Regex::is_match(self, topic)
    }
}

/// Builder for a [`DirectConsumer`].
#[derive(Default)]
pub struct DirectConsumerBuilder {
    topics: Vec<(String, Offset)>,
    matchers: Vec<(Box<dyn TopicMatcher>, Offset)>,
    partitions: HashMap<String, HashMap<i32, Offset>>,
    regex_topics: bool,
}

impl DirectConsumerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add topics to consume, all starting at `offset`. In regex mode the
    /// names are treated as patterns, tested in the order they were added
    /// with the first match winning.
    pub fn topics<I, S>(mut self, offset: Offset, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for topic in topics {
            self.topics.push((topic.into(), offset));
        }
        self
    }

    /// Pin explicit partitions to offsets. Pins have higher precedence
    /// than [`topics`](Self::topics): a pinned partition starts at the
    /// pinned offset even when its topic is also wanted wholesale, and a
    /// pin alone is enough to consume that partition.
    pub fn partitions(mut self, partitions: HashMap<String, HashMap<i32, Offset>>) -> Self {
        for (topic, pins) in partitions {
            self.partitions.entry(topic).or_default().extend(pins);
        }
        self
    }

    /// Treat all topic names added via [`topics`](Self::topics) as regular
    /// expressions.
    pub fn regex_topics(mut self) -> Self {
        self.regex_topics = true;
        self
    }

    /// Add a pre-built pattern matcher at `offset`. Implies regex mode.
    /// Matchers are tested after any string patterns, in insertion order.
    pub fn matcher(mut self, offset: Offset, matcher: Box<dyn TopicMatcher>) -> Self {
        self.regex_topics = true;
        self.matchers.push((matcher, offset));
        self
    }

    /// Compile patterns (in regex mode) and build the consumer.
    pub fn build(self) -> Result<DirectConsumer> {
        let mut topics = HashMap::new();
        let mut matchers = Vec::new();

        if self.regex_topics {
            for (pattern, offset) in self.topics {
                let compiled = regex::Regex::new(&pattern)
                    .map_err(|err| Error::InvalidPattern(format!("{}: {}", pattern, err)))?;
                matchers.push((Box::new(compiled) as Box<dyn TopicMatcher>, offset));
            }
            matchers.extend(self.matchers);
        } else {
            for (topic, offset) in self.topics {
                topics.insert(topic, offset);
            }
        }

        Ok(DirectConsumer {
            topics,
            matchers,
            partitions: self.partitions,
            regex_topics: self.regex_topics,
            re_topics: HashMap::new(),
            re_ignore: HashSet::new(),
            using: HashMap::new(),
        })
    }
}

/// Reconciles desired topics/partitions/offsets against live topology.
pub struct DirectConsumer {
    /// Topic → offset wishes (plain mode).
    topics: HashMap<String, Offset>,
    /// Pattern → offset wishes in declaration order (regex mode).
    matchers: Vec<(Box<dyn TopicMatcher>, Offset)>,
    /// Explicit topic → partition → offset pins; highest precedence.
    partitions: HashMap<String, HashMap<i32, Offset>>,
    regex_topics: bool,

    /// Topics a pattern has already matched, with the matched offset.
    re_topics: HashMap<String, Offset>,
    /// Topics no pattern matched; never re-tested.
    re_ignore: HashSet<String>,

    /// Partitions already handed out. Grows monotonically: a partition
    /// that disappears from topology and later reappears is not offered
    /// again.
    using: HashMap<String, HashSet<i32>>,
}

impl DirectConsumer {
    pub fn builder() -> DirectConsumerBuilder {
        DirectConsumerBuilder::new()
    }

    /// Returns new partitions to consume at given offsets based off the
    /// currently known topics.
    ///
    /// Call this whenever cluster metadata changes; calls are expected to
    /// be serialized by the owning consumer. An unchanged topology after a
    /// non-empty delta yields an empty delta.
    pub fn find_new_assignments(&mut self, topology: &TopologyView) -> Assignments {
        // First, build everything we could theoretically want to consume.
        let mut to_use: Assignments = HashMap::new();
        for (topic, partitions) in topology {
            let use_offset = if self.regex_topics {
                self.regex_offset_for(topic)
            } else {
                self.topics.get(topic).copied()
            };

            // If the topic is wanted, stage every visible partition at the
            // topic-level offset.
            if let Some(offset) = use_offset {
                let staged = to_use.entry(topic.clone()).or_default();
                for partition in partitions {
                    staged.insert(*partition, offset);
                }
            }

            // Lastly, overlay any specific partitions pinned for this
            // topic; pins win whether or not the topic itself was wanted.
            if let Some(pins) = self.partitions.get(topic) {
                let staged = to_use.entry(topic.clone()).or_default();
                for (partition, offset) in pins {
                    staged.insert(*partition, *offset);
                }
            }
        }

        // With everything we want to consume, remove what we already are.
        for (topic, used) in &self.using {
            let Some(staged) = to_use.get_mut(topic) else {
                continue;
            };
            if used.len() == staged.len() {
                to_use.remove(topic);
                continue;
            }
            for partition in used {
                staged.remove(partition);
            }
        }

        if to_use.is_empty() {
            return Assignments::new();
        }

        // to_use now contains only partitions we must newly consume; mark
        // them used so they are never offered again.
        for (topic, partitions) in &to_use {
            let topic_using = self.using.entry(topic.clone()).or_default();
            for partition in partitions.keys() {
                topic_using.insert(*partition);
            }
        }

        debug!(
            topics = to_use.len(),
            partitions = to_use.values().map(HashMap::len).sum::<usize>(),
            "staged new direct assignments"
        );
        to_use
    }

    /// Look up (or lazily determine and memoize) whether any pattern wants
    /// `topic`. Once a topic is matched or ignored, the pattern list is
    /// never consulted for it again.
    fn regex_offset_for(&mut self, topic: &str) -> Option<Offset> {
        if let Some(offset) = self.re_topics.get(topic) {
            return Some(*offset);
        }
        if self.re_ignore.contains(topic) {
            return None;
        }
        for (matcher, offset) in &self.matchers {
            if matcher.is_match(topic) {
                self.re_topics.insert(topic.to_string(), *offset);
                return Some(*offset);
            }
        }
        self.re_ignore.insert(topic.to_string());
        None
    }
}
