//! `attend` (§4.6): run a per-key child effect for every key currently
//! present in a source, disposing it the instant the key disappears and
//! creating a fresh one the instant it (re)appears.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use reactor_core::{effect, EffectOptions, KeyedMap, Record, Sequence, StopHandle, UnkeyedSet};

/// A source `attend` can enumerate the keys of. Implemented for every
/// built-in reactive collection kind (§4.6: "indexed sequence, keyed
/// record, keyed map, unkeyed set").
pub trait EnumerateKeys<K: Hash + Eq + Clone + 'static> {
    /// The keys currently present, tracking whatever structural dependency
    /// the concrete collection uses for "a key was added or removed".
    fn enumerate_keys(&self) -> Vec<K>;
}

impl<T: Clone + 'static> EnumerateKeys<usize> for Sequence<T> {
    fn enumerate_keys(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }
}

impl<V: Clone + 'static> EnumerateKeys<Box<str>> for Record<V> {
    fn enumerate_keys(&self) -> Vec<Box<str>> {
        self.keys()
    }
}

impl<K: Hash + Eq + Clone + 'static, V: Clone + 'static> EnumerateKeys<K> for KeyedMap<K, V> {
    fn enumerate_keys(&self) -> Vec<K> {
        self.keys()
    }
}

impl<T: Hash + Eq + Clone + 'static> EnumerateKeys<T> for UnkeyedSet<T> {
    fn enumerate_keys(&self) -> Vec<T> {
        self.to_vec()
    }
}

/// Run `body(key)` as a child effect for every key currently in `source`;
/// when a key disappears its effect is disposed, when a key appears a
/// fresh effect is created for it (§4.6 `attend`).
///
/// Returns the structure-watching effect's [`StopHandle`]; stopping it
/// cascades to every live per-key child, per the effect runtime's ordinary
/// parent/child disposal rule (§4.4).
pub fn attend<S, K>(source: S, body: impl Fn(K) + 'static) -> StopHandle
where
    S: EnumerateKeys<K> + Clone + 'static,
    K: Hash + Eq + Clone + 'static,
{
    attend_with(move || source.enumerate_keys(), body)
}

/// The raw-enumerator-callback variant of [`attend`] (§4.6): `enumerate`
/// is called, tracked, on every re-run to produce the current key set —
/// use this when the source is not one of the four built-in collection
/// kinds.
pub fn attend_with<K>(enumerate: impl Fn() -> Vec<K> + 'static, body: impl Fn(K) + 'static) -> StopHandle
where
    K: Hash + Eq + Clone + 'static,
{
    let body = Rc::new(body);
    let children: Rc<RefCell<HashMap<K, StopHandle>>> = Rc::new(RefCell::new(HashMap::new()));

    effect(
        move |_access| {
            let keys = enumerate();
            let live: FxHashSet<K> = keys.iter().cloned().collect();

            let stale: Vec<K> =
                children.borrow().keys().filter(|k| !live.contains(*k)).cloned().collect();
            for key in stale {
                if let Some(handle) = children.borrow_mut().remove(&key) {
                    handle.stop();
                }
            }

            for key in keys {
                let already_present = children.borrow().contains_key(&key);
                if already_present {
                    continue;
                }
                let body = body.clone();
                let key_for_body = key.clone();
                // Created while this structure-watching effect is the
                // active one, so the new per-key effect becomes its
                // child — stopping `attend`'s handle cascades to every
                // live per-key effect (§4.4 parent/child disposal).
                let handle = effect(
                    move |_| {
                        body(key_for_body.clone());
                        Ok(None)
                    },
                    EffectOptions::default(),
                );
                children.borrow_mut().insert(key, handle);
            }
            Ok(None)
        },
        EffectOptions::default(),
    )
}
