//! Reactive unkeyed set (§4.1 `ObservableKind::UnkeyedSet`).
//!
//! A set's elements carry no positional or nominal key of their own —
//! membership, not a per-slot value, is what changes. Reads of a single
//! element's membership are tracked under a hashed `PropKey::Symbol` of
//! that element (so two effects watching different elements are not
//! coupled); reads of the set's shape (`len`, iteration) track `KeysOf`.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::effect::{emit, track_read};
use crate::evolution::{Evolution, PropKey};
use crate::identity::{ObjectId, Observable, ObservableKind};
use crate::root;

struct Inner<T> {
    id: ObjectId,
    items: IndexSet<T>,
}

/// A reactive unkeyed set.
pub struct UnkeyedSet<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for UnkeyedSet<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Hash + Eq + Clone + 'static> Observable for UnkeyedSet<T> {
    type Raw = IndexSet<T>;

    fn wrap(raw: Self::Raw) -> Self {
        let id = root::with_runtime(|rt| rt.identity.borrow_mut().allocate(ObservableKind::UnkeyedSet));
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

impl<T: Hash + Eq + Clone + 'static> UnkeyedSet<T> {
    /// An empty reactive set.
    pub fn new() -> Self {
        Self::wrap(IndexSet::new())
    }

    /// Whether `value` is a member, tracking that element's membership
    /// specifically.
    pub fn contains(&self, value: &T) -> bool {
        track_read(self.object_id(), PropKey::symbol(value));
        self.inner.borrow().items.contains(value)
    }

    /// Insert `value`; returns whether it was newly inserted.
    pub fn insert(&self, value: T) -> bool {
        let id = self.object_id();
        let prop = PropKey::symbol(&value);
        let inserted = self.inner.borrow_mut().items.insert(value);
        if inserted {
            let _ = emit(id, Evolution::Add { prop: prop.clone() }, &[prop]);
        }
        inserted
    }

    /// Remove `value`; returns whether it was present.
    pub fn remove(&self, value: &T) -> bool {
        let id = self.object_id();
        let prop = PropKey::symbol(value);
        let removed = self.inner.borrow_mut().items.shift_remove(value);
        if removed {
            let _ = emit(id, Evolution::Del { prop: prop.clone() }, &[prop]);
        }
        removed
    }

    /// The number of elements; tracks `KeysOf`.
    pub fn len(&self) -> usize {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element, insertion-ordered; tracks `AllProps`.
    pub fn to_vec(&self) -> Vec<T> {
        track_read(self.object_id(), PropKey::AllProps);
        self.inner.borrow().items.iter().cloned().collect()
    }
}

impl<T: Hash + Eq + Clone + 'static> Default for UnkeyedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
