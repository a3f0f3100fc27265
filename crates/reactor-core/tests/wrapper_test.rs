//! Wrapper accessor/mutator boundary behavior (§4.1, §8 scenario 4).

use reactor_core::{wrap, KeyedMap, Record, Sequence, UnkeyedSet};
use reactor_testing::{assert_ran, recording_effect_simple, ReactorHarness, RunRecorder};

#[test]
fn some_short_circuits_and_does_not_resubscribe_past_the_match() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3, 4, 5]);
    let recorder = RunRecorder::new();

    let source_for_effect = source.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = source_for_effect.some(|&v| v == 2);
    });
    assert_ran!(recorder, 1);

    // Index 2 (value 3) is past the match at index 1 — `some` never scanned
    // it, so a write there must not re-run the effect.
    source.set(2, 99);
    assert_ran!(recorder, 1, "writes past the short-circuit point are not subscribed");

    // Index 1 (the matching element itself) was scanned.
    source.set(1, 20);
    assert_ran!(recorder, 2);
}

#[test]
fn some_that_scans_to_the_end_subscribes_to_a_later_push() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let recorder = RunRecorder::new();

    let source_for_effect = source.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = source_for_effect.some(|&v| v == 99);
    });
    assert_ran!(recorder, 1);

    source.push(100);
    assert_ran!(recorder, 2, "an unsuccessful full scan subscribes to length, so a push reruns it");
}

#[test]
fn every_short_circuits_on_the_first_failure() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3, 4]);
    let recorder = RunRecorder::new();

    let source_for_effect = source.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = source_for_effect.every(|&v| v < 2);
    });
    assert_ran!(recorder, 1);

    source.set(3, 0);
    assert_ran!(recorder, 1, "index 3 was never scanned once index 1 failed the predicate");
}

#[test]
fn record_set_same_value_is_a_no_op() {
    let _harness = ReactorHarness::create();
    let record: Record<i64> = Record::new();
    record.set("a", 1);
    let recorder = RunRecorder::new();

    let record_for_effect = record.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = record_for_effect.get("a");
    });
    assert_ran!(recorder, 1);

    record.set("a", 1);
    assert_ran!(recorder, 1);
    record.set("a", 2);
    assert_ran!(recorder, 2);
}

#[test]
fn record_remove_emits_del_which_a_has_own_watcher_sees() {
    let _harness = ReactorHarness::create();
    let record: Record<i64> = Record::new();
    record.set("a", 1);
    let recorder = RunRecorder::new();

    let record_for_effect = record.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = record_for_effect.has_own("a");
    });
    assert_ran!(recorder, 1);

    record.remove("a");
    assert_ran!(recorder, 2, "has_own tracks KeysOf, which Del also fires");
}

#[test]
fn out_of_bounds_sequence_read_tracks_length_not_a_missing_index() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2]);
    let recorder = RunRecorder::new();

    let source_for_effect = source.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = source_for_effect.get(5);
    });
    assert_ran!(recorder, 1);

    source.push(3);
    assert_ran!(recorder, 2, "an out-of-bounds read subscribes to the length (KeysOf)");
}

#[test]
fn writing_past_the_end_extends_and_triggers_both_index_and_length() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1]);
    let index_recorder = RunRecorder::new();
    let length_recorder = RunRecorder::new();

    let source_for_index = source.clone();
    let _stop_index = recording_effect_simple(&index_recorder, move || {
        let _ = source_for_index.get(3);
    });
    let source_for_length = source.clone();
    let _stop_length = recording_effect_simple(&length_recorder, move || {
        let _ = source_for_length.len();
    });

    assert_ran!(index_recorder, 1);
    assert_ran!(length_recorder, 1);

    source.set(3, 42);
    assert_ran!(index_recorder, 2, "the newly-written index itself reruns its watcher");
    assert_ran!(length_recorder, 2, "extending the sequence also fires KeysOf");
    assert_eq!(source.to_vec(), vec![1, 0, 0, 42]);
}

#[test]
fn keyed_map_set_same_value_is_a_no_op() {
    let _harness = ReactorHarness::create();
    let map: KeyedMap<u64, i64> = KeyedMap::new();
    map.set(1, 100);
    let recorder = RunRecorder::new();

    let map_for_effect = map.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = map_for_effect.get(&1);
    });
    assert_ran!(recorder, 1);

    map.set(1, 100);
    assert_ran!(recorder, 1);
    map.set(1, 200);
    assert_ran!(recorder, 2);
}

#[test]
fn unkeyed_set_membership_reads_are_tracked_per_element() {
    let _harness = ReactorHarness::create();
    let set: UnkeyedSet<i64> = UnkeyedSet::new();
    set.insert(1);
    set.insert(2);
    let recorder = RunRecorder::new();

    let set_for_effect = set.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = set_for_effect.contains(&1);
    });
    assert_ran!(recorder, 1);

    set.insert(3);
    assert_ran!(recorder, 1, "inserting an unrelated element does not disturb a membership watcher");

    set.remove(&1);
    assert_ran!(recorder, 2);
}

#[test]
fn splice_fires_only_for_the_affected_index_range() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3, 4, 5]);
    let recorder_head = RunRecorder::new();
    let recorder_tail = RunRecorder::new();

    let source_for_head = source.clone();
    let _stop_head = recording_effect_simple(&recorder_head, move || {
        let _ = source_for_head.get(0);
    });
    let source_for_tail = source.clone();
    let _stop_tail = recording_effect_simple(&recorder_tail, move || {
        let _ = source_for_tail.get(4);
    });

    assert_ran!(recorder_head, 1);
    assert_ran!(recorder_tail, 1);

    // Replace indices 1..3 — index 0 and 4 are untouched.
    source.splice(1, 2, vec![20, 30, 40]);
    assert_ran!(recorder_head, 1, "index 0 is outside the spliced range");
    assert_ran!(recorder_tail, 2, "index 4 shifts within the spliced range's tail");
}
