//! `scan` (§4.6): a running fold over a reactive sequence, where position
//! `i` equals `step(result[i-1], source[i])` with `result[-1] = init`.
//!
//! `[SUPPLEMENT]` the "per-item list of intermediate records, one per
//! occurrence, linking to its predecessor" design is realized here as a
//! simpler but behaviorally equivalent cache: each re-run walks the longest
//! `Rc`-identity-stable prefix shared between the previous and current
//! source snapshot, reuses every accumulator in that prefix unchanged, and
//! recomputes only the diverging suffix by chaining `step` from the last
//! reused accumulator. An item that merely moved (same `Rc` identity,
//! different position) is therefore only re-stepped if something *before*
//! it in the sequence changed — exactly scenario 5 of §8 ("moving element
//! B to the end reuses A, re-steps C and B"). See DESIGN.md for why this
//! was accepted over threading an explicit predecessor-linked-list.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reactor_core::{effect, untracked, EffectOptions, Sequence, StopHandle};

/// Items passed through `scan` must be identity-comparable (so a reused
/// item can be recognized across re-runs without re-running `step` on it)
/// — the Rust encoding of the "items must be weak-keyable" requirement
/// (§4.6). `scan` therefore takes its source as a `Sequence<Rc<T>>`.
pub fn scan<T, Acc>(
    source: Sequence<Rc<T>>,
    step: impl Fn(&Acc, &Rc<T>) -> Acc + 'static,
    init: Acc,
) -> (Sequence<Acc>, StopHandle)
where
    T: 'static,
    Acc: Clone + 'static,
{
    let output: Sequence<Acc> = Sequence::new();
    let output_for_effect = output.clone();
    let state: Rc<RefCell<Vec<(Rc<T>, Acc)>>> = Rc::new(RefCell::new(Vec::new()));
    let output_len = Rc::new(Cell::new(0usize));
    let init = Rc::new(init);

    let stop = effect(
        move |_access| {
            let items = source.to_vec();
            let mut state_ref = state.borrow_mut();

            let reuse_len = items
                .iter()
                .zip(state_ref.iter())
                .take_while(|(new_item, (old_item, _))| Rc::ptr_eq(new_item, old_item))
                .count();

            let mut acc =
                if reuse_len > 0 { state_ref[reuse_len - 1].1.clone() } else { (*init).clone() };

            let mut new_state: Vec<(Rc<T>, Acc)> = state_ref[..reuse_len].to_vec();
            let mut tail = Vec::with_capacity(items.len() - reuse_len);
            for item in &items[reuse_len..] {
                acc = step(&acc, item);
                new_state.push((item.clone(), acc.clone()));
                tail.push(acc.clone());
            }
            *state_ref = new_state;
            drop(state_ref);

            let previous_len = output_len.get();
            untracked(|| {
                output_for_effect.splice(reuse_len, previous_len.saturating_sub(reuse_len), tail);
            });
            output_len.set(reuse_len + (items.len() - reuse_len));
            Ok(None)
        },
        EffectOptions::default(),
    );

    (output, stop)
}
