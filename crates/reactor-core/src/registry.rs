//! Dependency Registry & Change Propagation (§4.2).

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::evolution::{Evolution, PropKey, Trigger};
use crate::identity::{EffectId, ObjectId};

type WatcherSet = SmallVec<[EffectId; 4]>;

#[derive(Default)]
pub(crate) struct DependencyRegistry {
    watchers: FxHashMap<(ObjectId, PropKey), WatcherSet>,
    effect_reads: FxHashMap<EffectId, FxHashSet<(ObjectId, PropKey)>>,
    dependency_hooks: FxHashMap<EffectId, std::rc::Rc<dyn Fn(ObjectId, &PropKey)>>,
}

impl DependencyRegistry {
    /// Record that `active` (if any, and if tracking is not disabled) read
    /// `(obj, key)`.
    pub(crate) fn register_dep(
        &mut self,
        active: Option<EffectId>,
        tracking_disabled: bool,
        obj: ObjectId,
        key: PropKey,
    ) {
        if tracking_disabled {
            return;
        }
        let Some(effect) = active else { return };
        if let Some(hook) = self.dependency_hooks.get(&effect) {
            hook(obj, &key);
        }
        let watchers = self.watchers.entry((obj, key.clone())).or_default();
        if !watchers.contains(&effect) {
            watchers.push(effect);
        }
        self.effect_reads.entry(effect).or_default().insert((obj, key));
    }

    pub(crate) fn set_dependency_hook(
        &mut self,
        effect: EffectId,
        hook: Option<std::rc::Rc<dyn Fn(ObjectId, &PropKey)>>,
    ) {
        match hook {
            Some(h) => {
                self.dependency_hooks.insert(effect, h);
            }
            None => {
                self.dependency_hooks.remove(&effect);
            }
        }
    }

    /// Compute which keys a given evolution touches, per §4.2: the literal
    /// properties plus `AllProps`, plus `KeysOf` for structural changes.
    fn affected_keys(evolution: &Evolution, props: &[PropKey]) -> SmallVec<[PropKey; 4]> {
        let mut keys: SmallVec<[PropKey; 4]> = props.iter().cloned().collect();
        keys.push(PropKey::AllProps);
        if matches!(evolution, Evolution::Add { .. } | Evolution::Del { .. }) {
            keys.push(PropKey::KeysOf);
        }
        keys
    }

    /// Gather every effect subscribed to any of `props` on `obj` (plus the
    /// synthetic keys), excluding `caller` (the effect whose own write this
    /// is — the scheduler must never re-enqueue the effect that caused the
    /// write it is currently processing).
    pub(crate) fn subscribers_for(
        &self,
        obj: ObjectId,
        evolution: &Evolution,
        props: &[PropKey],
        caller: Option<EffectId>,
    ) -> Vec<(EffectId, Trigger)> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        for key in Self::affected_keys(evolution, props) {
            let Some(set) = self.watchers.get(&(obj, key.clone())) else { continue };
            for &effect in set.iter() {
                if Some(effect) == caller {
                    continue;
                }
                if seen.insert(effect) {
                    out.push((
                        effect,
                        Trigger {
                            object: obj,
                            prop: key.clone(),
                            evolution: evolution.clone(),
                            stack: None,
                        },
                    ));
                }
            }
        }
        out
    }

    /// Prune `effect`'s recorded reads from the forward `watchers` map,
    /// deleting empty watcher sets. Called before every re-run (to let the
    /// run re-track from scratch) as well as on final disposal — the
    /// `dependency_hook` registration survives a rerun (it is only torn
    /// down by [`Self::remove_effect`]'s final-disposal sibling,
    /// [`Self::forget_effect`]) since it is an effect-lifetime option, not
    /// a per-run read.
    pub(crate) fn remove_effect(&mut self, effect: EffectId) {
        if let Some(reads) = self.effect_reads.remove(&effect) {
            for key in reads {
                if let Some(set) = self.watchers.get_mut(&key) {
                    set.retain(|&e| e != effect);
                    if set.is_empty() {
                        self.watchers.remove(&key);
                    }
                }
            }
        }
    }

    /// Final-disposal counterpart of [`Self::remove_effect`]: additionally
    /// drops the effect's `dependency_hook` registration, if any.
    pub(crate) fn forget_effect(&mut self, effect: EffectId) {
        self.remove_effect(effect);
        self.dependency_hooks.remove(&effect);
    }

    /// Forget every watcher entry for an object whose identity is being
    /// retired (e.g. a memo node stopped and never reused).
    pub(crate) fn forget_object(&mut self, obj: ObjectId) {
        self.watchers.retain(|(o, _), _| *o != obj);
    }
}
