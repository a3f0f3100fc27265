//! `attend`: per-key child effect lifecycle (§4.6).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use reactor_collections::attend;
use reactor_core::{on_cleanup, wrap, Sequence};
use reactor_testing::ReactorHarness;

#[test]
fn creates_a_child_effect_per_initial_key() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![10, 20, 30]);
    let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

    let seen_for_body = seen.clone();
    let _stop = attend(source, move |key| {
        seen_for_body.borrow_mut().push(key);
    });

    let mut keys = seen.borrow().clone();
    keys.sort_unstable();
    assert_eq!(keys, vec![0, 1, 2]);
}

#[test]
fn appending_a_key_spawns_a_fresh_child_without_disturbing_existing_ones() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![10, 20]);
    let call_counts: Rc<RefCell<HashMap<usize, i32>>> = Rc::new(RefCell::new(HashMap::new()));

    let call_counts_for_body = call_counts.clone();
    let _stop = attend(source.clone(), move |key| {
        *call_counts_for_body.borrow_mut().entry(key).or_insert(0) += 1;
    });

    assert_eq!(call_counts.borrow().get(&0), Some(&1));
    assert_eq!(call_counts.borrow().get(&1), Some(&1));
    assert_eq!(call_counts.borrow().get(&2), None);

    source.push(30);
    assert_eq!(call_counts.borrow().get(&0), Some(&1), "the existing key-0 child is untouched by a push");
    assert_eq!(call_counts.borrow().get(&1), Some(&1), "the existing key-1 child is untouched by a push");
    assert_eq!(call_counts.borrow().get(&2), Some(&1), "the new key-2 child runs once on creation");
}

#[test]
fn a_disappearing_key_disposes_its_child_effect() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![10, 20, 30]);
    let disposed: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

    let disposed_for_body = disposed.clone();
    let _stop = attend(source.clone(), move |key| {
        let disposed = disposed_for_body.clone();
        on_cleanup(move || {
            disposed.borrow_mut().push(key);
        });
    });

    assert!(disposed.borrow().is_empty());
    // Shrinks the sequence to length 1, dropping keys 1 and 2.
    source.pop();
    source.pop();

    let mut gone = disposed.borrow().clone();
    gone.sort_unstable();
    assert_eq!(gone, vec![1, 2], "keys that fell out of range are disposed");
}

#[test]
fn a_key_that_reappears_after_disappearing_gets_a_fresh_child() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![10, 20]);
    let call_counts: Rc<RefCell<HashMap<usize, i32>>> = Rc::new(RefCell::new(HashMap::new()));

    let call_counts_for_body = call_counts.clone();
    let _stop = attend(source.clone(), move |key| {
        *call_counts_for_body.borrow_mut().entry(key).or_insert(0) += 1;
    });
    assert_eq!(call_counts.borrow().get(&1), Some(&1));

    source.pop();
    assert_eq!(call_counts.borrow().get(&1), Some(&1), "count is untouched while the key is gone");

    source.push(99);
    assert_eq!(call_counts.borrow().get(&1), Some(&2), "key 1 reappearing spawns a brand new child");
}

#[test]
fn stopping_the_handle_cascades_to_every_live_child() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2, 3]);
    let disposed: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

    let disposed_for_body = disposed.clone();
    let stop = attend(source, move |key| {
        let disposed = disposed_for_body.clone();
        on_cleanup(move || {
            disposed.borrow_mut().push(key);
        });
    });

    assert!(disposed.borrow().is_empty());
    stop.stop();

    let mut gone = disposed.borrow().clone();
    gone.sort_unstable();
    assert_eq!(gone, vec![0, 1, 2], "stopping attend's handle disposes every live per-key child");
}
