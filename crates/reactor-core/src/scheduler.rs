//! Scheduler (§4.3): batched, causally ordered, cycle-checked execution.

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::Key;

use crate::config::{CyclePolicy, OverrunPolicy};
use crate::error::{DebugInfo, ReactorError};
use crate::identity::EffectId;

/// Render an effect id as a plain `u64` for debug payloads.
pub(crate) fn effect_id_as_u64(id: EffectId) -> u64 {
    id.data().as_ffi()
}

/// How a caller wants a single effect scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScheduleMode {
    /// Enqueue into the current (or a new) batch; participates in causal
    /// ordering.
    Enqueue,
    /// Run synchronously right now, outside causal attribution. Used for
    /// an effect's very first run and for detached (memo) root effects.
    Immediate,
}

/// Direct edges plus incrementally maintained transitive closures.
#[derive(Default)]
struct CausalGraph {
    direct: FxHashMap<EffectId, FxHashSet<EffectId>>,
    /// `causes_of[v]` = every effect that can (transitively) reach `v`.
    causes_of: FxHashMap<EffectId, FxHashSet<EffectId>>,
    /// `consequences_of[u]` = every effect reachable (transitively) from `u`.
    consequences_of: FxHashMap<EffectId, FxHashSet<EffectId>>,
}

impl CausalGraph {
    fn reaches(&self, from: EffectId, to: EffectId) -> bool {
        from == to || self.consequences_of.get(&from).is_some_and(|s| s.contains(&to))
    }

    /// Add edge `u -> v`. Returns `Err` (without mutating the graph) if
    /// doing so would close a cycle, i.e. `v` already reaches `u`.
    fn add_edge(&mut self, u: EffectId, v: EffectId) -> Result<(), ()> {
        if u == v {
            return Ok(());
        }
        if self.reaches(v, u) {
            return Err(());
        }
        let is_new = self.direct.entry(u).or_default().insert(v);
        if !is_new {
            return Ok(());
        }
        let new_reach: Vec<EffectId> = std::iter::once(v)
            .chain(self.consequences_of.get(&v).cloned().unwrap_or_default())
            .collect();
        let predecessors: Vec<EffectId> = std::iter::once(u)
            .chain(self.causes_of.get(&u).cloned().unwrap_or_default())
            .collect();
        for &p in &predecessors {
            self.consequences_of.entry(p).or_default().extend(new_reach.iter().copied());
        }
        for &r in &new_reach {
            self.causes_of.entry(r).or_default().extend(predecessors.iter().copied());
        }
        Ok(())
    }

    fn in_degree_within(&self, id: EffectId, batch: &IndexSet<EffectId>, active: Option<EffectId>) -> usize {
        self.causes_of
            .get(&id)
            .map(|causes| {
                causes
                    .iter()
                    .filter(|&&c| c != id && batch.contains(&c) && Some(c) != active)
                    .count()
            })
            .unwrap_or(0)
    }

    fn remaining_causes_satisfied(
        &self,
        id: EffectId,
        batch: &IndexSet<EffectId>,
        executed: &FxHashSet<EffectId>,
        active: Option<EffectId>,
    ) -> bool {
        self.causes_of.get(&id).is_none_or(|causes| {
            causes.iter().all(|&c| {
                c == id || executed.contains(&c) || Some(c) == active || !batch.contains(&c)
            })
        })
    }

    /// Build a witness path from `start` through the batch's members,
    /// following direct edges, for cycle reporting.
    fn witness_path(&self, start: EffectId, batch: &IndexSet<EffectId>) -> Vec<EffectId> {
        let mut path = vec![start];
        let mut seen: FxHashSet<EffectId> = FxHashSet::default();
        seen.insert(start);
        let mut current = start;
        loop {
            let Some(next_set) = self.direct.get(&current) else { break };
            let Some(&next) = next_set.iter().find(|n| batch.contains(n)) else { break };
            path.push(next);
            if !seen.insert(next) {
                break;
            }
            current = next;
            if path.len() > batch.len() + 1 {
                break;
            }
        }
        path
    }

    fn remove_effect(&mut self, id: EffectId) {
        self.direct.remove(&id);
        self.causes_of.remove(&id);
        self.consequences_of.remove(&id);
        for set in self.direct.values_mut() {
            set.remove(&id);
        }
        for set in self.causes_of.values_mut() {
            set.remove(&id);
        }
        for set in self.consequences_of.values_mut() {
            set.remove(&id);
        }
    }
}

/// The current batch's bookkeeping.
#[derive(Default)]
struct BatchState {
    /// Root-id -> pending (insertion-ordered, so tie-breaking is
    /// deterministic in tests).
    all: IndexSet<EffectId>,
    executed: FxHashSet<EffectId>,
    running: bool,
    trigger_count: usize,
    executed_count: usize,
    cleanups: Vec<Box<dyn FnOnce()>>,
}

/// The scheduler. Owned by [`crate::root::Runtime`].
pub(crate) struct Scheduler {
    causal: CausalGraph,
    batch: BatchState,
    broken: Option<String>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { causal: CausalGraph::default(), batch: BatchState::default(), broken: None }
    }
}

impl Scheduler {
    pub(crate) fn is_broken(&self) -> bool {
        self.broken.is_some()
    }

    pub(crate) fn broken_cause(&self) -> Option<&str> {
        self.broken.as_deref()
    }

    pub(crate) fn mark_broken(&mut self, cause: String) {
        self.broken = Some(cause);
    }

    pub(crate) fn reset(&mut self) {
        *self = Scheduler::default();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.batch.running
    }

    pub(crate) fn remove_effect(&mut self, id: EffectId) {
        self.causal.remove_effect(id);
        self.batch.all.shift_remove(&id);
    }

    pub(crate) fn defer_cleanup(&mut self, f: Box<dyn FnOnce()>) {
        self.batch.cleanups.push(f);
    }

    /// Record a causal edge from `active` to `target` unless `active` is
    /// `None`. Applies the cycle policy on conflict; returns whether the
    /// enqueue should still proceed (it does for everything except a
    /// `Break`-policy self-removal, handled by the caller).
    fn record_edge(
        &mut self,
        active: Option<EffectId>,
        target: EffectId,
        cycle_handling: CyclePolicy,
    ) -> Result<(), ReactorError> {
        let Some(active) = active else { return Ok(()) };
        if self.causal.add_edge(active, target).is_err() {
            let chain = self.causal.witness_path(target, &self.batch.all);
            let ids: Vec<u64> = ids_as(&chain);
            match cycle_handling {
                CyclePolicy::Throw => {
                    return Err(ReactorError::CycleDetected {
                        chain: ids.clone(),
                        debug_info: Some(DebugInfo { causal_chain: ids, ..Default::default() }),
                    });
                }
                CyclePolicy::Warn => {
                    log::warn!("reactor: cycle detected among effects {:?}, edge dropped", ids);
                }
                CyclePolicy::Break => {
                    log::warn!("reactor: cycle detected among effects {:?}, breaking", ids);
                    self.batch.all.shift_remove(&target);
                }
            }
        }
        Ok(())
    }

    /// Enqueue `target` for (re-)execution, called by the change bus.
    /// `active` is the effect currently running, if any (its own write
    /// does not re-enqueue it — the registry already excludes it from
    /// `subscribers_for`, but a *different* effect's write can still close
    /// a cycle back to `active`, which is what `record_edge` checks).
    pub(crate) fn enqueue(
        &mut self,
        target: EffectId,
        active: Option<EffectId>,
        cycle_handling: CyclePolicy,
        max_trigger_per_batch: usize,
        overrun: OverrunPolicy,
    ) -> Result<bool, ReactorError> {
        if let Some(cause) = &self.broken {
            return Err(ReactorError::BrokenEffects { cause: Some(cause.clone()) });
        }
        let already_queued = self.batch.all.contains(&target);
        self.batch.all.insert(target);
        self.record_edge(active, target, cycle_handling)?;
        if !already_queued {
            self.batch.trigger_count += 1;
            if self.batch.trigger_count > max_trigger_per_batch {
                return Self::react_overrun(
                    overrun,
                    ReactorError::MaxReactionExceeded { limit: max_trigger_per_batch, debug_info: None },
                );
            }
        }
        Ok(!self.batch.running)
    }

    fn react_overrun(policy: OverrunPolicy, err: ReactorError) -> Result<bool, ReactorError> {
        match policy {
            OverrunPolicy::Throw => Err(err),
            OverrunPolicy::Debug => {
                log::debug!("reactor: {err}");
                Ok(false)
            }
            OverrunPolicy::Warn => {
                log::warn!("reactor: {err}");
                Ok(false)
            }
        }
    }

    /// Pop the next effect ready to run from the current batch, per the
    /// in-degree-0-first / relaxed-fallback selection rule (§4.3 step 2).
    /// Returns `None` both when the batch is empty (done) and when a cycle
    /// blocks all remaining candidates (caller distinguishes via
    /// `self.batch.all.is_empty()`).
    pub(crate) fn pick_next(&self, active: Option<EffectId>) -> Option<EffectId> {
        if let Some(&id) =
            self.batch.all.iter().find(|&&id| self.causal.in_degree_within(id, &self.batch.all, active) == 0)
        {
            return Some(id);
        }
        self.batch
            .all
            .iter()
            .find(|&&id| {
                self.causal.remaining_causes_satisfied(id, &self.batch.all, &self.batch.executed, active)
            })
            .copied()
    }

    pub(crate) fn witness_for(&self, id: EffectId) -> Vec<EffectId> {
        self.causal.witness_path(id, &self.batch.all)
    }

    pub(crate) fn mark_executing(&mut self, id: EffectId) {
        self.batch.all.shift_remove(&id);
        self.batch.executed.insert(id);
        self.batch.executed_count += 1;
    }

    pub(crate) fn batch_is_empty(&self) -> bool {
        self.batch.all.is_empty()
    }

    pub(crate) fn executed_count(&self) -> usize {
        self.batch.executed_count
    }

    pub(crate) fn begin_batch(&mut self) {
        self.batch.running = true;
        self.batch.executed.clear();
        self.batch.trigger_count = 0;
        self.batch.executed_count = 0;
    }

    pub(crate) fn end_batch(&mut self) -> Vec<Box<dyn FnOnce()>> {
        self.batch.running = false;
        std::mem::take(&mut self.batch.cleanups)
    }

    pub(crate) fn cycle_break_victim(&self) -> Option<EffectId> {
        self.batch.all.iter().next().copied()
    }
}

fn ids_as(ids: &[EffectId]) -> Vec<u64> {
    ids.iter().map(|id| effect_id_as_u64(*id)).collect()
}
