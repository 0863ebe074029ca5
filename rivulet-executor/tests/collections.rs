//! Integration tests for port collections: zip, merge and balanced sends.

mod common;

use common::{Balance, Merge, Recorder, Zip, ints};
use rivulet_executor::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_zip_stops_at_shortest_input() {
    let (sink, seen) = functional::collector();
    let mut network = Network::new();
    network.add("A", functional::values([1, 2, 3])).unwrap();
    network.add("B", functional::values([10, 20])).unwrap();
    network.add("Zip", Zip).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("A.OUT", "Zip.A", None).unwrap();
    network.connect("B.OUT", "Zip.B", None).unwrap();
    network.connect("Zip.OUT", "Show.IN", None).unwrap();

    network.go().await.unwrap();

    let seen: Vec<_> = seen.lock().iter().map(|v| v.inner().clone()).collect();
    assert_eq!(seen, vec![json!([1, 10]), json!([2, 20])]);

    // The unmatched 3 is dropped, not leaked.
    let counters = network.counters();
    assert_eq!(counters.creates, 7);
    assert_eq!(counters.creates, counters.drops);
}

#[tokio::test]
async fn test_zip_with_static_member_repeats_it() {
    let (sink, seen) = functional::collector();
    let mut network = Network::new();
    network.add("A", functional::values([1, 2, 3])).unwrap();
    network.add_component("Zip", Zip, [("B", 0)]).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("A.OUT", "Zip.A", None).unwrap();
    network.connect("Zip.OUT", "Show.IN", None).unwrap();

    network.go().await.unwrap();

    let seen: Vec<_> = seen.lock().iter().map(|v| v.inner().clone()).collect();
    assert_eq!(seen, vec![json!([1, 0]), json!([2, 0]), json!([3, 0])]);
}

#[tokio::test]
async fn test_merge_forwards_everything() {
    let (sink, seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Odd", functional::values([1, 3, 5])).unwrap();
    network.add("Even", functional::values([2, 4])).unwrap();
    network.add("Merge", Merge).unwrap();
    network.add("Show", sink).unwrap();
    network.connect("Odd.OUT", "Merge.A", Some(1)).unwrap();
    network.connect("Even.OUT", "Merge.B", Some(1)).unwrap();
    network.connect("Merge.OUT", "Show.IN", None).unwrap();

    network.go().await.unwrap();

    let seen = ints(&seen.lock());
    let odd: Vec<_> = seen.iter().copied().filter(|n| n % 2 == 1).collect();
    let even: Vec<_> = seen.iter().copied().filter(|n| n % 2 == 0).collect();
    // Each input keeps its own order.
    assert_eq!(odd, vec![1, 3, 5]);
    assert_eq!(even, vec![2, 4]);
}

#[tokio::test]
async fn test_balanced_send_spreads_load() {
    let (left, left_seen) = Recorder::new();
    let (right, right_seen) = Recorder::new();
    let mut network = Network::new();
    network.add("Gen", functional::values(1..=6)).unwrap();
    network.add("Balance", Balance).unwrap();
    network.add("Left", left).unwrap();
    network.add("Right", right).unwrap();
    network.connect("Gen.OUT", "Balance.IN", None).unwrap();
    network.connect("Balance.OUT1", "Left.IN", None).unwrap();
    network.connect("Balance.OUT2", "Right.IN", None).unwrap();

    network.go().await.unwrap();

    let left = ints(&left_seen.lock());
    let right = ints(&right_seen.lock());
    assert!(!left.is_empty());
    assert!(!right.is_empty());

    let mut all: Vec<_> = left.into_iter().chain(right).collect();
    all.sort_unstable();
    assert_eq!(all, vec![1, 2, 3, 4, 5, 6]);
}
