//! `lift_sequence` / `lift_keyed`: diffed reactive collections over a
//! plain producer closure (§4.6).

use reactor_collections::{lift_keyed, lift_sequence};
use reactor_core::{wrap, Sequence};
use reactor_testing::ReactorHarness;

#[test]
fn lift_sequence_mirrors_the_producers_initial_output() {
    let _harness = ReactorHarness::create();
    let driver: Sequence<i64> = wrap(vec![1, 2, 3]);

    let driver_for_producer = driver.clone();
    let (output, _stop) = lift_sequence(move || driver_for_producer.to_vec());
    assert_eq!(output.to_vec(), vec![1, 2, 3]);
}

#[test]
fn lift_sequence_applies_only_the_appended_tail() {
    let _harness = ReactorHarness::create();
    let driver: Sequence<i64> = wrap(vec![1, 2, 3]);

    let driver_for_producer = driver.clone();
    let (output, _stop) = lift_sequence(move || driver_for_producer.to_vec());
    assert_eq!(output.to_vec(), vec![1, 2, 3]);

    driver.push(4);
    assert_eq!(output.to_vec(), vec![1, 2, 3, 4]);
}

#[test]
fn lift_sequence_handles_a_middle_removal() {
    let _harness = ReactorHarness::create();
    let driver: Sequence<i64> = wrap(vec![1, 2, 3, 4]);

    let driver_for_producer = driver.clone();
    let (output, _stop) = lift_sequence(move || driver_for_producer.to_vec());
    assert_eq!(output.to_vec(), vec![1, 2, 3, 4]);

    driver.splice(1, 2, Vec::new());
    assert_eq!(output.to_vec(), vec![1, 4]);
}

#[test]
fn lift_sequence_handles_a_full_reorder() {
    let _harness = ReactorHarness::create();
    let driver: Sequence<i64> = wrap(vec![1, 2, 3]);

    let driver_for_producer = driver.clone();
    let (output, _stop) = lift_sequence(move || driver_for_producer.to_vec());
    assert_eq!(output.to_vec(), vec![1, 2, 3]);

    driver.splice(0, 3, vec![3, 2, 1]);
    assert_eq!(output.to_vec(), vec![3, 2, 1]);
}

#[test]
fn lift_keyed_tracks_additions_removals_and_updates() {
    let _harness = ReactorHarness::create();
    let driver: Sequence<(u64, i64)> = wrap(vec![(1, 10), (2, 20)]);

    let driver_for_producer = driver.clone();
    let (output, _stop) = lift_keyed(move || driver_for_producer.to_vec());
    assert_eq!(output.get(&1), Some(10));
    assert_eq!(output.get(&2), Some(20));

    // Remove key 1, add key 3, update key 2's value.
    driver.splice(0, 2, vec![(2, 99), (3, 30)]);
    assert_eq!(output.get(&1), None, "key 1 was dropped from the producer's output");
    assert_eq!(output.get(&2), Some(99), "key 2's value was updated in place");
    assert_eq!(output.get(&3), Some(30), "key 3 is a fresh addition");
}

#[test]
fn lift_keyed_leaves_an_unchanged_value_alone() {
    let _harness = ReactorHarness::create();
    let driver: Sequence<(u64, i64)> = wrap(vec![(1, 10)]);

    let driver_for_producer = driver.clone();
    let (output, _stop) = lift_keyed(move || driver_for_producer.to_vec());
    assert_eq!(output.get(&1), Some(10));

    // Re-running the producer with the same (key, value) pair must not
    // issue a redundant `set`.
    driver.push((2, 20));
    assert_eq!(output.get(&1), Some(10));
    assert_eq!(output.get(&2), Some(20));
}
