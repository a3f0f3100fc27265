//! Reactive index-keyed sequence (§4.1 `ObservableKind::Sequence`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::effect::{emit, track_read};
use crate::evolution::{Evolution, PropKey};
use crate::identity::{ObjectId, Observable, ObservableKind};
use crate::root;

struct Inner<T> {
    id: ObjectId,
    items: Vec<T>,
}

/// A reactive index-keyed sequence.
pub struct Sequence<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + 'static> Observable for Sequence<T> {
    type Raw = Vec<T>;

    fn wrap(raw: Self::Raw) -> Self {
        let id = root::with_runtime(|rt| rt.identity.borrow_mut().allocate(ObservableKind::Sequence));
        Self { inner: Rc::new(RefCell::new(Inner { id, items: raw })) }
    }

    fn unwrap(self) -> Self::Raw {
        self.inner.borrow().items.clone()
    }

    fn object_id(&self) -> ObjectId {
        self.inner.borrow().id
    }

    fn is_reactive(&self) -> bool {
        root::with_runtime(|rt| !rt.identity.borrow().is_non_reactive(self.object_id()))
    }
}

impl<T: Clone + 'static> Sequence<T> {
    /// An empty reactive sequence.
    pub fn new() -> Self {
        Self::wrap(Vec::new())
    }

    /// Read the element at `index`, tracking that index specifically. An
    /// out-of-bounds read tracks `KeysOf` (the length) instead, per §4.1's
    /// boundary rule: whether `o[i]` exists at all depends on the length.
    pub fn get(&self, index: usize) -> Option<T> {
        let id = self.object_id();
        let len = self.inner.borrow().items.len();
        if index >= len {
            track_read(id, PropKey::KeysOf);
            return None;
        }
        track_read(id, PropKey::Index(index));
        self.inner.borrow().items.get(index).cloned()
    }

    /// Overwrite the element at `index`. Writing past the current end
    /// extends the sequence (§8 boundary behavior) and so also triggers the
    /// `KeysOf` (length) subscribers in addition to the index itself.
    /// Writing the same value an in-bounds index already holds is a no-op
    /// (§8 round-trip invariant).
    pub fn set(&self, index: usize, value: T)
    where
        T: Default + PartialEq,
    {
        let id = self.object_id();
        let (touched_length, prop) = {
            let mut inner = self.inner.borrow_mut();
            let extending = index >= inner.items.len();
            if !extending && inner.items[index] == value {
                return;
            }
            if extending {
                inner.items.resize_with(index + 1, T::default);
            }
            inner.items[index] = value;
            (extending, PropKey::Index(index))
        };
        if touched_length {
            let _ = emit(id, Evolution::Add { prop: prop.clone() }, &[prop, PropKey::KeysOf]);
        } else {
            let _ = emit(id, Evolution::Set { prop: prop.clone() }, &[prop]);
        }
    }

    /// Call `f` on each element until it returns `true`, stopping early.
    /// Subscribes only to the indices actually scanned; if the scan
    /// consumes the whole sequence without finding a match, also subscribes
    /// to the length so a later `push` is observed (§4.1 short-circuit
    /// optimization, scenario 4 of §8).
    pub fn some(&self, mut f: impl FnMut(&T) -> bool) -> bool {
        let id = self.object_id();
        let len = self.inner.borrow().items.len();
        for i in 0..len {
            track_read(id, PropKey::Index(i));
            let item = self.inner.borrow().items.get(i).cloned();
            if let Some(item) = item {
                if f(&item) {
                    return true;
                }
            }
        }
        track_read(id, PropKey::KeysOf);
        false
    }

    /// The negation-shaped counterpart of [`Self::some`]: true iff `f` holds
    /// for every element, short-circuiting on the first failure.
    pub fn every(&self, mut f: impl FnMut(&T) -> bool) -> bool {
        !self.some(|item| !f(item))
    }

    /// The index of the first element for which `f` returns `true`, or
    /// `None`; tracks exactly the indices scanned, plus length on a full,
    /// unsuccessful scan.
    pub fn find_index(&self, mut f: impl FnMut(&T) -> bool) -> Option<usize> {
        let id = self.object_id();
        let len = self.inner.borrow().items.len();
        for i in 0..len {
            track_read(id, PropKey::Index(i));
            let item = self.inner.borrow().items.get(i).cloned();
            if let Some(item) = item {
                if f(&item) {
                    return Some(i);
                }
            }
        }
        track_read(id, PropKey::KeysOf);
        None
    }

    /// Append an element; fires `KeysOf` (a new index appeared).
    pub fn push(&self, value: T) {
        let id = self.object_id();
        let index = {
            let mut inner = self.inner.borrow_mut();
            inner.items.push(value);
            inner.items.len() - 1
        };
        let prop = PropKey::Index(index);
        let _ = emit(id, Evolution::Add { prop: prop.clone() }, &[prop]);
    }

    /// Remove and return the last element, if any.
    pub fn pop(&self) -> Option<T> {
        let id = self.object_id();
        let (popped, index) = {
            let mut inner = self.inner.borrow_mut();
            let index = inner.items.len().saturating_sub(1);
            (inner.items.pop(), index)
        };
        if popped.is_some() {
            let prop = PropKey::Index(index);
            let _ = emit(id, Evolution::Del { prop: prop.clone() }, &[prop]);
        }
        popped
    }

    /// Replace the range `start..start+len` in place (§4.1 bulk-method
    /// optimization): a single `Bunch` evolution plus the per-index
    /// `Set`/`Add`/`Del` evolutions for the affected range, so an
    /// index-precise watcher outside the range is left untouched.
    pub fn splice(&self, start: usize, remove_len: usize, replace_with: impl IntoIterator<Item = T>) -> Vec<T> {
        let id = self.object_id();
        let (removed, props) = {
            let mut inner = self.inner.borrow_mut();
            let end = (start + remove_len).min(inner.items.len());
            let removed: Vec<T> = inner.items.splice(start..end, replace_with).collect();
            let new_len = inner.items.len();
            let touched_end = new_len.max(end);
            let props: Vec<PropKey> = (start..touched_end).map(PropKey::Index).collect();
            (removed, props)
        };
        let _ = emit(id, Evolution::Bunch { method: "splice" }, &props);
        removed
    }

    /// Overwrite every element in `range` with `value` (§4.1 `fill`).
    pub fn fill(&self, value: T, range: std::ops::Range<usize>) {
        let id = self.object_id();
        let props: Vec<PropKey> = {
            let mut inner = self.inner.borrow_mut();
            let end = range.end.min(inner.items.len());
            for i in range.start..end {
                inner.items[i] = value.clone();
            }
            (range.start..end).map(PropKey::Index).collect()
        };
        let _ = emit(id, Evolution::Bunch { method: "fill" }, &props);
    }

    /// Copy `len` elements from `src` to `dst` within the sequence (§4.1
    /// `copyWithin`).
    pub fn copy_within(&self, src: usize, dst: usize, len: usize) {
        let id = self.object_id();
        let props: Vec<PropKey> = {
            let mut inner = self.inner.borrow_mut();
            let n = inner.items.len();
            let src_end = (src + len).min(n);
            let slice: Vec<T> = inner.items[src..src_end].to_vec();
            let dst_end = (dst + slice.len()).min(n);
            for (offset, value) in slice.into_iter().take(dst_end.saturating_sub(dst)).enumerate() {
                inner.items[dst + offset] = value;
            }
            (dst..dst_end).map(PropKey::Index).collect()
        };
        let _ = emit(id, Evolution::Bunch { method: "copyWithin" }, &props);
    }

    /// The current length; tracks `KeysOf` (a structural property).
    pub fn len(&self) -> usize {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().items.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element, in order; tracks `AllProps`.
    pub fn to_vec(&self) -> Vec<T> {
        track_read(self.object_id(), PropKey::AllProps);
        self.inner.borrow().items.clone()
    }
}

impl<T: Clone + 'static> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}
