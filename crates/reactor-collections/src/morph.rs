//! `morph` (§4.6): a lazy, per-index view over a sequence. Unlike
//! [`crate::project_sequence`], nothing runs until an index of the result
//! is actually read — the mapping body for index `i` only materializes
//! into its own effect the first time [`Morphed::get`] touches it, and
//! that effect is then kept alive, re-running on its own dependencies
//! (including the source's length, so it goes quiet without panicking if
//! the source shrinks past `i` and resumes if it grows back) for as long
//! as the [`Morphed`] handle itself is alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use reactor_core::{effect, untracked, EffectOptions, Sequence, StopHandle};

struct Shared<T, V> {
    source: Sequence<T>,
    body: Rc<dyn Fn(usize, &Sequence<T>) -> V>,
    output: Sequence<V>,
    materialized: RefCell<HashMap<usize, StopHandle>>,
}

/// A lazily-materializing mapped view over `source` (§4.6 `morph`).
/// Reading `morphed.get(i)` the first time spins up a per-index effect
/// that writes `body(i, &source)` into the backing sequence and keeps it
/// current; reading an index that was never touched never runs `body` at
/// all.
pub struct Morphed<T, V> {
    shared: Rc<Shared<T, V>>,
}

impl<T: Clone + 'static, V: Clone + Default + PartialEq + 'static> Morphed<T, V> {
    /// Read index `i`, materializing its per-index effect on first access.
    pub fn get(&self, index: usize) -> Option<V> {
        if index >= self.shared.source.len() {
            return None;
        }
        if !self.shared.materialized.borrow().contains_key(&index) {
            self.materialize(index);
        }
        self.shared.output.get(index)
    }

    /// The source's current length, without materializing anything.
    pub fn len(&self) -> usize {
        self.shared.source.len()
    }

    /// Whether the source is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn materialize(&self, index: usize) {
        let shared = self.shared.clone();
        let handle = effect(
            move |_access| {
                if index >= shared.source.len() {
                    return Ok(None);
                }
                let value = (shared.body)(index, &shared.source);
                untracked(|| shared.output.set(index, value));
                Ok(None)
            },
            EffectOptions::default(),
        );
        self.shared.materialized.borrow_mut().insert(index, handle);
    }
}

impl<T, V> Clone for Morphed<T, V> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

/// Build a lazy mapped view over `source` (§4.6 `morph`): `body(i, source)`
/// computes the value at index `i`, but only ever runs for indices that
/// have actually been read through [`Morphed::get`].
pub fn morph<T, V>(
    source: Sequence<T>,
    body: impl Fn(usize, &Sequence<T>) -> V + 'static,
) -> Morphed<T, V>
where
    T: Clone + 'static,
    V: Clone + Default + PartialEq + 'static,
{
    Morphed {
        shared: Rc::new(Shared {
            source,
            body: Rc::new(body),
            output: Sequence::new(),
            materialized: RefCell::new(HashMap::new()),
        }),
    }
}
