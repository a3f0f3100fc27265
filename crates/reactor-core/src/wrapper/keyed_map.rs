//! Reactive arbitrarily-keyed map (§4.1 `ObservableKind::KeyedMap`).

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::effect::{emit, track_read};
use crate::evolution::{AsPropKey, Evolution, PropKey};
use crate::identity::{ObjectId, Observable, ObservableKind};
use crate::root;

struct Inner<K, V> {
    id: ObjectId,
    entries: IndexMap<K, V>,
}

/// A reactive map keyed by an arbitrary hashable type.
pub struct KeyedMap<K, V> {
    inner: Rc<RefCell<Inner<K, V>>>,
}

impl<K, V> Clone for KeyedMap<K, V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<K: Hash + Eq + Clone + 'static, V: Clone + 'static> Observable for KeyedMap<K, V> {
    type Raw = IndexMap<K, V>;

    fn wrap(raw: Self::Raw) -> Self {
        let id = root::with_runtime(|rt| rt.identity.borrow_mut().allocate(ObservableKind::KeyedMap));
        Self { inner: Rc::new(RefCell::new(Inner { id, entries: raw })) }
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

impl<K: Hash + Eq + Clone + 'static, V: Clone + 'static> KeyedMap<K, V> {
    /// An empty reactive keyed map.
    pub fn new() -> Self {
        Self::wrap(IndexMap::new())
    }

    /// Read the value at `key`, tracking that key.
    pub fn get(&self, key: &K) -> Option<V>
    where
        K: AsPropKey,
    {
        track_read(self.object_id(), key.as_prop_key());
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Write `key`, creating it if absent. Writing the same value a key
    /// already holds is a no-op (§8 round-trip invariant).
    pub fn set(&self, key: K, value: V)
    where
        K: AsPropKey,
        V: PartialEq,
    {
        let id = self.object_id();
        let prop = key.as_prop_key();
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
    pub fn remove(&self, key: &K) -> Option<V>
    where
        K: AsPropKey,
    {
        let id = self.object_id();
        let removed = self.inner.borrow_mut().entries.shift_remove(key);
        if removed.is_some() {
            let prop = key.as_prop_key();
            let _ = emit(id, Evolution::Del { prop: prop.clone() }, &[prop]);
        }
        removed
    }

    /// This map's keys, insertion-ordered; tracks `KeysOf`.
    pub fn keys(&self) -> Vec<K> {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().entries.keys().cloned().collect()
    }

    /// Every `(key, value)` pair, insertion-ordered; tracks `AllProps`.
    pub fn entries(&self) -> Vec<(K, V)> {
        track_read(self.object_id(), PropKey::AllProps);
        self.inner.borrow().entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// The number of entries; tracks `KeysOf`.
    pub fn len(&self) -> usize {
        track_read(self.object_id(), PropKey::KeysOf);
        self.inner.borrow().entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Hash + Eq + Clone + 'static, V: Clone + 'static> Default for KeyedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
