//! Error propagation through `on_effect_throw` handler chains (§4.4, §7).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use reactor_core::{effect, is_broken, on_effect_throw, wrap, EffectError, EffectOptions, Sequence};
use reactor_testing::ReactorHarness;

#[derive(Debug)]
struct BoomError;

impl fmt::Display for BoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for BoomError {}

fn boom() -> EffectError {
    EffectError::User(Box::new(BoomError))
}

#[test]
fn a_handler_that_catches_stops_propagation_to_the_parent() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![0]);
    let parent_saw_error = Rc::new(Cell::new(false));

    let parent_saw_error_for_parent = parent_saw_error.clone();
    let source_for_child = source.clone();
    let _parent = effect(
        move |_access| {
            on_effect_throw({
                let parent_saw_error = parent_saw_error_for_parent.clone();
                move |_err| {
                    parent_saw_error.set(true);
                    Ok(None)
                }
            });

            let source_for_child = source_for_child.clone();
            let _child = effect(
                move |_access| {
                    on_effect_throw(|_err| Ok(None));
                    if source_for_child.get(0).unwrap() == 1 {
                        return Err(boom());
                    }
                    Ok(None)
                },
                EffectOptions::default(),
            );
            Ok(None)
        },
        EffectOptions::default(),
    );

    assert!(!is_broken());
    source.set(0, 1);
    assert!(!parent_saw_error.get(), "the child's own handler caught the error first");
    assert!(!is_broken(), "a caught error never reaches BrokenEffects");
}

#[test]
fn a_handler_that_rethrows_passes_the_error_to_the_parent() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![0]);
    let parent_saw_error: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

    let parent_saw_error_for_parent = parent_saw_error.clone();
    let source_for_child = source.clone();
    let _parent = effect(
        move |_access| {
            on_effect_throw({
                let parent_saw_error = parent_saw_error_for_parent.clone();
                move |err| {
                    *parent_saw_error.borrow_mut() = Some(err.to_string());
                    Ok(None)
                }
            });

            let source_for_child = source_for_child.clone();
            let _child = effect(
                move |_access| {
                    // Always re-throws: the parent's handler is the one
                    // that actually catches it.
                    on_effect_throw(|_err| Err(boom()));
                    if source_for_child.get(0).unwrap() == 1 {
                        return Err(boom());
                    }
                    Ok(None)
                },
                EffectOptions::default(),
            );
            Ok(None)
        },
        EffectOptions::default(),
    );

    source.set(0, 1);
    assert!(parent_saw_error.borrow().is_some(), "an unhandled child error propagates to the parent's handler");
}

#[test]
fn an_uncaught_error_escaping_the_root_effect_marks_the_runtime_broken() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![0]);

    let source_for_effect = source.clone();
    let _stop = effect(
        move |_access| {
            if source_for_effect.get(0).unwrap() == 1 {
                return Err(boom());
            }
            Ok(None)
        },
        EffectOptions::default(),
    );

    assert!(!is_broken());
    source.set(0, 1);
    assert!(is_broken(), "an uncaught root-effect error must mark the runtime broken (§7)");
}

/// Registers a re-throwing handler on a run that does *not* error (so
/// nothing ever drains `EffectNode::handlers` via `propagate_effect_error`
/// for that run), then errors on the next run. If handlers from the first,
/// successful run were not cleared before the second, both would fire
/// (since a re-throwing handler never short-circuits the chain) and the
/// invocation count below would be 2 instead of 1.
#[test]
fn handlers_from_an_earlier_successful_run_do_not_linger_into_a_later_error() {
    let _harness = ReactorHarness::create();
    // `trigger` forces a rerun without affecting whether the body errors;
    // `should_error` is read on every run to decide whether it does.
    let trigger: Sequence<i64> = wrap(vec![0]);
    let should_error: Sequence<bool> = wrap(vec![false]);
    let handler_invocations = Rc::new(Cell::new(0));

    let trigger_for_effect = trigger.clone();
    let should_error_for_effect = should_error.clone();
    let handler_invocations_for_body = handler_invocations.clone();
    let _stop = effect(
        move |_access| {
            let _ = trigger_for_effect.get(0);
            on_effect_throw({
                let handler_invocations = handler_invocations_for_body.clone();
                move |_err| {
                    handler_invocations.set(handler_invocations.get() + 1);
                    Err(boom())
                }
            });
            if should_error_for_effect.get(0).unwrap() {
                return Err(boom());
            }
            Ok(None)
        },
        EffectOptions::default(),
    );

    // First rerun: no error, a handler is registered but never invoked or
    // drained (nothing calls `propagate_effect_error` when the body
    // succeeds).
    trigger.set(0, 1);
    assert_eq!(handler_invocations.get(), 0);

    // Second rerun: errors. Only this run's own handler should fire.
    should_error.set(0, true);
    assert_eq!(handler_invocations.get(), 1, "a stale handler from the non-erroring run must not also fire");
    assert!(is_broken());
}
