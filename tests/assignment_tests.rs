//! Assignment-engine reconciliation scenarios through the public surface.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gregor::consumer::{DirectConsumer, TopicMatcher, TopologyView};
use gregor::types::Offset;

fn topology(entries: &[(&str, &[i32])]) -> TopologyView {
    entries
        .iter()
        .map(|(topic, partitions)| (topic.to_string(), partitions.to_vec()))
        .collect()
}

#[test]
fn test_growing_cluster_yields_incremental_deltas_only() {
    let mut direct = DirectConsumer::builder()
        .topics(Offset::EARLIEST, ["orders", "payments"])
        .build()
        .unwrap();

    // First reconciliation: one topic visible
    let delta = direct.find_new_assignments(&topology(&[("orders", &[0, 1])]));
    assert_eq!(delta.len(), 1);
    assert_eq!(
        delta["orders"].keys().copied().collect::<HashSet<_>>(),
        HashSet::from([0, 1])
    );

    // Second topic appears, first topic grows a partition
    let delta = direct.find_new_assignments(&topology(&[
        ("orders", &[0, 1, 2]),
        ("payments", &[0]),
    ]));
    assert_eq!(
        delta["orders"].keys().copied().collect::<HashSet<_>>(),
        HashSet::from([2])
    );
    assert_eq!(
        delta["payments"].keys().copied().collect::<HashSet<_>>(),
        HashSet::from([0])
    );

    // Unchanged topology: recognizably empty delta, not an error
    let delta = direct.find_new_assignments(&topology(&[
        ("orders", &[0, 1, 2]),
        ("payments", &[0]),
    ]));
    assert!(delta.is_empty());
}

#[test]
fn test_pin_precedence_over_topic_offset() {
    let mut direct = DirectConsumer::builder()
        .topics(Offset::EARLIEST, ["events"])
        .partitions(HashMap::from([(
            "events".to_string(),
            HashMap::from([(1, Offset::LATEST)]),
        )]))
        .build()
        .unwrap();

    let delta = direct.find_new_assignments(&topology(&[("events", &[0, 1, 2])]));
    let events = &delta["events"];
    assert_eq!(events[&1], Offset::LATEST);
    assert_eq!(events[&0], Offset::EARLIEST);
    assert_eq!(events[&2], Offset::EARLIEST);
}

struct CountingMatcher {
    accept: &'static str,
    calls: Arc<AtomicUsize>,
}

impl TopicMatcher for CountingMatcher {
    fn is_match(&self, topic: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        topic.starts_with(self.accept)
    }
}

#[test]
fn test_failed_matches_are_never_retested() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut direct = DirectConsumer::builder()
        .matcher(
            Offset::EARLIEST,
            Box::new(CountingMatcher {
                accept: "logs-",
                calls: calls.clone(),
            }),
        )
        .build()
        .unwrap();

    let view = topology(&[("logs-app", &[0]), ("metrics-app", &[0])]);
    let delta = direct.find_new_assignments(&view);
    assert_eq!(delta.len(), 1);
    assert!(delta.contains_key("logs-app"));
    // Each topic tested exactly once
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Repeated reconciliations hit the memos for both the matched topic
    // and the ignored one
    for _ in 0..3 {
        assert!(direct.find_new_assignments(&view).is_empty());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_regex_and_pins_combine() {
    let mut direct = DirectConsumer::builder()
        .topics(Offset::new(500), ["^logs-.*"])
        .regex_topics()
        .partitions(HashMap::from([(
            "logs-audit".to_string(),
            HashMap::from([(0, Offset::new(9_000))]),
        )]))
        .build()
        .unwrap();

    let delta = direct.find_new_assignments(&topology(&[("logs-audit", &[0, 1])]));
    let staged = &delta["logs-audit"];
    assert_eq!(staged[&0], Offset::new(9_000)); // pin wins
    assert_eq!(staged[&1], Offset::new(500)); // regex offset for the rest
}

#[test]
fn test_assignments_survive_topic_disappearing_and_returning() {
    let mut direct = DirectConsumer::builder()
        .topics(Offset::EARLIEST, ["flaky"])
        .build()
        .unwrap();

    assert_eq!(
        direct.find_new_assignments(&topology(&[("flaky", &[0])]))["flaky"].len(),
        1
    );

    // Topic vanishes from metadata entirely, then returns: the engine
    // never re-offers what it already assigned
    assert!(direct.find_new_assignments(&topology(&[])).is_empty());
    assert!(direct
        .find_new_assignments(&topology(&[("flaky", &[0])]))
        .is_empty());
}
