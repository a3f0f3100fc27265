//! Reactive string-keyed record (§4.1 `ObservableKind::Record`).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::effect::{emit, track_read};
use crate::evolution::{Evolution, PropKey};
use crate::identity::{ObjectId, Observable, ObservableKind};
use crate::root;

struct Inner<V> {
    id: ObjectId,
    entries: IndexMap<Box<str>, V>,
    /// The analogue of a prototype: a record consulted on a missed key.
    /// A read that falls through subscribes to both this record's and the
    /// fallback's entry for the same key (§4.1 prototype-chain tracking).
    fallback: Option<Record<V>>,
}

/// A reactive string-keyed record.
pub struct Record<V> {
    inner: Rc<RefCell<Inner<V>>>,
}

impl<V> Clone for Record<V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<V: Clone + 'static> Observable for Record<V> {
    type Raw = IndexMap<Box<str>, V>;

    fn wrap(raw: Self::Raw) -> Self {
        let id = root::with_runtime(|rt| rt.identity.borrow_mut().allocate(ObservableKind::Record));
        Self { inner: Rc::new(RefCell::new(Inner { id, entries: raw, fallback: None })) }
    }

    fn unwrap(self) -> Self::Raw {
        self.inner.borrow().entries.clone()
    }

    fn object_id(&self) -> ObjectId {
        self.inner.borrow().id
    }

    fn is_reactive(&self) -> bool {
        root::with_runtime(|rt| !rt.identity.borrow().is_non_reactive(self.object_id()))
    }
}

impl<V: Clone + 'static> Record<V> {
    /// An empty reactive record.
    pub fn new() -> Self {
        Self::wrap(IndexMap::new())
    }

    /// Read `key`, tracking the current effect on it (and, if the key is
    /// absent here, falling through to `fallback` per §4.1).
    pub fn get(&self, key: &str) -> Option<V> {
        let id = self.object_id();
        track_read(id, PropKey::Named(key.into()));
        let (hit, fallback) = {
            let inner = self.inner.borrow();
            (inner.entries.get(key).cloned(), inner.fallback.clone())
        };
        hit.or_else(|| fallback.and_then(|f| f.get(key)))
    }

    /// Whether `key` is present on this record directly (not through the
    /// fallback chain); tracks `KeysOf`.
    pub fn has_own(&self, key: &str) -> bool {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().entries.contains_key(key)
    }

    /// Set `key` to `value`, creating it if absent. Writing the same value
    /// a key already holds is a no-op: no evolution is emitted and no
    /// effect is enqueued (§8 round-trip invariant "`o.p = o.p` is a
    /// no-op").
    pub fn set(&self, key: impl Into<Box<str>>, value: V)
    where
        V: PartialEq,
    {
        let key: Box<str> = key.into();
        let id = self.object_id();
        let prop = PropKey::Named(key.clone());
        let evolution = {
            let mut inner = self.inner.borrow_mut();
            let unchanged = inner.entries.get(&key).is_some_and(|existing| *existing == value);
            if unchanged {
                return;
            }
            let existed = inner.entries.contains_key(&key);
            inner.entries.insert(key, value);
            if existed { Evolution::Set { prop: prop.clone() } } else { Evolution::Add { prop: prop.clone() } }
        };
        let _ = emit(id, evolution, &[prop]);
    }

    /// Remove `key`, returning its prior value if present.
    pub fn remove(&self, key: &str) -> Option<V> {
        let id = self.object_id();
        let removed = self.inner.borrow_mut().entries.shift_remove(key);
        if removed.is_some() {
            let prop = PropKey::Named(key.into());
            let _ = emit(id, Evolution::Del { prop: prop.clone() }, &[prop]);
        }
        removed
    }

    /// This record's own keys, insertion-ordered; tracks `KeysOf`.
    pub fn keys(&self) -> Vec<Box<str>> {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// The number of keys this record carries directly; tracks `KeysOf`.
    pub fn len(&self) -> usize {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().entries.len()
    }

    /// Whether this record carries no keys directly.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `(key, value)` pair, insertion-ordered; tracks `AllProps`.
    pub fn entries(&self) -> Vec<(Box<str>, V)> {
        track_read(self.object_id(), PropKey::AllProps);
        self.inner.borrow().entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Set (or clear) this record's fallback, the analogue of a prototype
    /// link (§4.1).
    pub fn set_fallback(&self, fallback: Option<Record<V>>) {
        self.inner.borrow_mut().fallback = fallback;
    }
}

impl<V: Clone + 'static> Default for Record<V> {
    fn default() -> Self {
        Self::new()
    }
}
