//! `project` (§4.6): eager per-key mapping into a target collection, where
//! each key's body runs in an effect that is a child of the *owning*
//! (outer) effect rather than of the structure-watching effect — achieved
//! via [`reactor_core::EffectAccess::ascend`], so restructuring the source
//! does not dispose an already-running per-key computation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use reactor_core::{effect, AsPropKey, EffectOptions, KeyedMap, Record, Sequence, StopHandle};

/// Project every index of `source` through `per_key_body` into `target`
/// (§4.6 sequence variant). `per_key_body(index, source) -> V` is called
/// once per currently-live index and its effect is re-run whenever that
/// index's dependencies change; when an index disappears its effect is
/// disposed and its slot removed from `target`.
pub fn project_sequence<T, V>(
    source: Sequence<T>,
    target: Sequence<V>,
    per_key_body: impl Fn(usize, &Sequence<T>) -> V + 'static,
) -> StopHandle
where
    T: Clone + 'static,
    V: Clone + Default + PartialEq + 'static,
{
    let per_key_body = Rc::new(per_key_body);
    let children: Rc<RefCell<HashMap<usize, StopHandle>>> = Rc::new(RefCell::new(HashMap::new()));

    effect(
        move |access| {
            let live_len = source.len();
            let live: FxHashSet<usize> = (0..live_len).collect();

            let stale: Vec<usize> =
                children.borrow().keys().filter(|k| !live.contains(*k)).cloned().collect();
            for index in stale {
                if let Some(handle) = children.borrow_mut().remove(&index) {
                    handle.stop();
                }
            }
            reactor_core::untracked(|| {
                let target_len = target.len();
                if target_len > live_len {
                    target.splice(live_len, target_len - live_len, Vec::new());
                }
            });

            for index in 0..live_len {
                if children.borrow().contains_key(&index) {
                    continue;
                }
                let per_key_body = per_key_body.clone();
                let source_for_body = source.clone();
                let target_for_body = target.clone();
                // `ascend`: attach this per-key effect to the effect that
                // was active when `project_sequence` was created, not to
                // this structure-watching effect, so it survives this
                // effect's own re-runs.
                let handle = access.ascend(|| {
                    effect(
                        move |_| {
                            let value = per_key_body(index, &source_for_body);
                            target_for_body.set(index, value);
                            Ok(None)
                        },
                        EffectOptions::default(),
                    )
                });
                children.borrow_mut().insert(index, handle);
            }
            Ok(None)
        },
        EffectOptions::default(),
    )
}

/// Project every key of `source` through `per_key_body` into `target`
/// (§4.6 record variant).
pub fn project_record<A, V>(
    source: Record<A>,
    target: Record<V>,
    per_key_body: impl Fn(&str, &Record<A>) -> V + 'static,
) -> StopHandle
where
    A: Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    let per_key_body = Rc::new(per_key_body);
    let children: Rc<RefCell<HashMap<Box<str>, StopHandle>>> = Rc::new(RefCell::new(HashMap::new()));

    effect(
        move |access| {
            let keys = source.keys();
            let live: FxHashSet<Box<str>> = keys.iter().cloned().collect();

            let stale: Vec<Box<str>> =
                children.borrow().keys().filter(|k| !live.contains(*k)).cloned().collect();
            for key in stale {
                if let Some(handle) = children.borrow_mut().remove(&key) {
                    handle.stop();
                }
                target.remove(&key);
            }

            for key in keys {
                if children.borrow().contains_key(&key) {
                    continue;
                }
                let per_key_body = per_key_body.clone();
                let source_for_body = source.clone();
                let target_for_body = target.clone();
                let key_for_body = key.clone();
                let handle = access.ascend(|| {
                    effect(
                        move |_| {
                            let value = per_key_body(&key_for_body, &source_for_body);
                            target_for_body.set(key_for_body.clone(), value);
                            Ok(None)
                        },
                        EffectOptions::default(),
                    )
                });
                children.borrow_mut().insert(key, handle);
            }
            Ok(None)
        },
        EffectOptions::default(),
    )
}

/// Project every key of a `KeyedMap` source through `per_key_body` into
/// `target` (§4.6 keyed-map variant).
pub fn project_map<K, A, V>(
    source: KeyedMap<K, A>,
    target: KeyedMap<K, V>,
    per_key_body: impl Fn(&K, &KeyedMap<K, A>) -> V + 'static,
) -> StopHandle
where
    K: Hash + Eq + Clone + AsPropKey + 'static,
    A: Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    let per_key_body = Rc::new(per_key_body);
    let children: Rc<RefCell<HashMap<K, StopHandle>>> = Rc::new(RefCell::new(HashMap::new()));

    effect(
        move |access| {
            let keys = source.keys();
            let live: FxHashSet<K> = keys.iter().cloned().collect();

            let stale: Vec<K> =
                children.borrow().keys().filter(|k| !live.contains(*k)).cloned().collect();
            for key in stale {
                if let Some(handle) = children.borrow_mut().remove(&key) {
                    handle.stop();
                }
                target.remove(&key);
            }

            for key in keys {
                if children.borrow().contains_key(&key) {
                    continue;
                }
                let per_key_body = per_key_body.clone();
                let source_for_body = source.clone();
                let target_for_body = target.clone();
                let key_for_body = key.clone();
                let key_for_insert = key.clone();
                let handle = access.ascend(|| {
                    effect(
                        move |_| {
                            let value = per_key_body(&key_for_body, &source_for_body);
                            target_for_body.set(key_for_body.clone(), value);
                            Ok(None)
                        },
                        EffectOptions::default(),
                    )
                });
                children.borrow_mut().insert(key_for_insert, handle);
            }
            Ok(None)
        },
        EffectOptions::default(),
    )
}
