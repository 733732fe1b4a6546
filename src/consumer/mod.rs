//! The direct-consumption path: assignment reconciliation.

pub mod direct;

pub use crate::types::TopologyView;
pub use direct::{Assignments, DirectConsumer, DirectConsumerBuilder, TopicMatcher};
