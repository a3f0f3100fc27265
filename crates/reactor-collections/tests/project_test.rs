//! `project_sequence` / `project_record` / `project_map`: eager per-key
//! projection whose per-key effects survive the structure watcher's own
//! re-runs via `ascend` (§4.6).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use reactor_collections::{project_map, project_record, project_sequence};
use reactor_core::{wrap, KeyedMap, Record, Sequence};
use reactor_testing::ReactorHarness;

#[test]
fn project_sequence_populates_the_target_eagerly() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let target: Sequence<i64> = Sequence::new();

    let _stop = project_sequence(source, target.clone(), |index, source| source.get(index).unwrap() * 10);
    assert_eq!(target.to_vec(), vec![10, 20, 30]);
}

#[test]
fn project_sequence_per_key_effects_do_not_rerun_when_an_unrelated_index_appears() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2]);
    let target: Sequence<i64> = Sequence::new();
    let run_counts: Rc<RefCell<HashMap<usize, i32>>> = Rc::new(RefCell::new(HashMap::new()));

    let run_counts_for_body = run_counts.clone();
    let _stop = project_sequence(source.clone(), target.clone(), move |index, source| {
        *run_counts_for_body.borrow_mut().entry(index).or_insert(0) += 1;
        source.get(index).unwrap() * 10
    });
    assert_eq!(run_counts.borrow().get(&0), Some(&1));
    assert_eq!(run_counts.borrow().get(&1), Some(&1));

    source.push(3);
    assert_eq!(target.to_vec(), vec![10, 20, 30]);
    assert_eq!(run_counts.borrow().get(&0), Some(&1), "index 0's own effect is untouched by a push");
    assert_eq!(run_counts.borrow().get(&1), Some(&1), "index 1's own effect is untouched by a push");
    assert_eq!(run_counts.borrow().get(&2), Some(&1));
}

#[test]
fn project_sequence_per_key_effect_reruns_when_its_own_source_value_changes() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2]);
    let target: Sequence<i64> = Sequence::new();

    let _stop = project_sequence(source.clone(), target.clone(), |index, source| source.get(index).unwrap() * 10);
    assert_eq!(target.to_vec(), vec![10, 20]);

    source.set(1, 5);
    assert_eq!(target.to_vec(), vec![10, 50]);
}

#[test]
fn project_sequence_truncates_the_target_when_the_source_shrinks() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let target: Sequence<i64> = Sequence::new();

    let _stop = project_sequence(source.clone(), target.clone(), |index, source| source.get(index).unwrap() * 10);
    assert_eq!(target.to_vec(), vec![10, 20, 30]);

    source.pop();
    assert_eq!(target.to_vec(), vec![10, 20], "a shrinking source drops the now out-of-range target entries too");

    source.push(9);
    assert_eq!(target.to_vec(), vec![10, 20, 90], "a regrown index gets a fresh per-key effect");
}

#[test]
fn project_record_removes_the_target_entry_when_a_key_disappears() {
    let _harness = ReactorHarness::create();
    let source: Record<i64> = Record::new();
    source.set("a", 1);
    source.set("b", 2);
    let target: Record<i64> = Record::new();

    let _stop = project_record(source.clone(), target.clone(), |_key, source_inner| {
        source_inner.get("a").unwrap_or(0) + 100
    });
    assert_eq!(target.get("b"), Some(101));

    source.remove("b");
    assert_eq!(target.get("b"), None, "a disappearing source key removes its projected entry too");
}

#[test]
fn project_map_projects_every_key_and_tracks_additions() {
    let _harness = ReactorHarness::create();
    let source: KeyedMap<u64, i64> = KeyedMap::new();
    source.set(1, 10);
    let target: KeyedMap<u64, i64> = KeyedMap::new();

    let _stop = project_map(source.clone(), target.clone(), |key, source_inner| source_inner.get(key).unwrap() * 2);
    assert_eq!(target.get(&1), Some(20));

    source.set(2, 5);
    assert_eq!(target.get(&2), Some(10), "a newly added key is projected too");
}
