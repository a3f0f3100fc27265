//! `morph`: lazy, per-index materialization over a sequence (§4.6).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use reactor_collections::morph;
use reactor_core::{wrap, Sequence};
use reactor_testing::ReactorHarness;

#[test]
fn len_and_is_empty_never_materialize_anything() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let body_calls = Rc::new(Cell::new(0));

    let body_calls_for_body = body_calls.clone();
    let view = morph(source, move |index, source| {
        body_calls_for_body.set(body_calls_for_body.get() + 1);
        source.get(index).unwrap() * 10
    });

    assert_eq!(view.len(), 3);
    assert!(!view.is_empty());
    assert_eq!(body_calls.get(), 0, "neither len() nor is_empty() ever runs the per-index body");
}

#[test]
fn get_materializes_only_the_index_actually_read() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let touched: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

    let touched_for_body = touched.clone();
    let view = morph(source, move |index, source| {
        touched_for_body.borrow_mut().push(index);
        source.get(index).unwrap() * 10
    });

    assert_eq!(view.get(1), Some(20));
    assert_eq!(*touched.borrow(), vec![1], "only index 1 was read, so only index 1 materialized");

    assert_eq!(view.get(1), Some(20));
    assert_eq!(*touched.borrow(), vec![1], "a second read of the same index reuses the live effect");

    assert_eq!(view.get(0), Some(10));
    assert_eq!(*touched.borrow(), vec![1, 0], "reading index 0 materializes it too, independently");
}

#[test]
fn a_materialized_index_stays_current_when_its_source_slot_changes() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let run_counts: Rc<RefCell<HashMap<usize, i32>>> = Rc::new(RefCell::new(HashMap::new()));

    let run_counts_for_body = run_counts.clone();
    let view = morph(source.clone(), move |index, source| {
        *run_counts_for_body.borrow_mut().entry(index).or_insert(0) += 1;
        source.get(index).unwrap() * 10
    });

    assert_eq!(view.get(0), Some(10));
    assert_eq!(run_counts.borrow().get(&0), Some(&1));

    source.set(0, 5);
    assert_eq!(view.get(0), Some(50));
    assert_eq!(run_counts.borrow().get(&0), Some(&2), "the materialized index reruns on its own dependency");

    // Index 1 was never read, so it never materialized and never ran.
    assert_eq!(run_counts.borrow().get(&1), None);
}

#[test]
fn a_materialized_index_goes_quiet_rather_than_panicking_when_the_source_shrinks_past_it() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);

    let view = morph(source.clone(), |index, source| source.get(index).unwrap() * 10);
    assert_eq!(view.get(2), Some(30));

    source.pop();
    source.pop();
    // index 2 no longer exists in the source at all.
    assert_eq!(view.get(2), None);
}
