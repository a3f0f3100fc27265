//! Process-wide runtime state (§9 "Global state").
//!
//! Everything the kernel needs — the identity registry, the dependency
//! registry, the scheduler, the effect arena, and the options bag — lives
//! in one `thread_local!` instance, a single owner consolidating what would
//! otherwise be several independent thread-locals, so [`reset`] can
//! atomically replace it all.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::SlotMap;

use crate::config::Options;
use crate::effect::EffectNode;
use crate::identity::{EffectId, IdentityRegistry};
use crate::introspection::IntrospectionHook;
use crate::registry::DependencyRegistry;
use crate::scheduler::Scheduler;

pub(crate) struct RuntimeInner {
    pub(crate) identity: RefCell<IdentityRegistry>,
    pub(crate) registry: RefCell<DependencyRegistry>,
    pub(crate) scheduler: RefCell<Scheduler>,
    pub(crate) effects: RefCell<SlotMap<EffectId, EffectNode>>,
    pub(crate) options: RefCell<Options>,
    pub(crate) introspection_hook: RefCell<Option<Rc<dyn IntrospectionHook>>>,
}

impl Default for RuntimeInner {
    fn default() -> Self {
        Self {
            identity: RefCell::new(IdentityRegistry::default()),
            registry: RefCell::new(DependencyRegistry::default()),
            scheduler: RefCell::new(Scheduler::default()),
            effects: RefCell::new(SlotMap::with_key()),
            options: RefCell::new(Options::default()),
            introspection_hook: RefCell::new(None),
        }
    }
}

thread_local! {
    static RUNTIME: RuntimeInner = RuntimeInner::default();
}

/// Run `f` with a reference to the process-wide runtime state.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&RuntimeInner) -> R) -> R {
    RUNTIME.with(f)
}

/// Reinitialize all reactive state: identities, dependency subscriptions,
/// the causal graph, and every outstanding effect. This is the only
/// supported recovery path from [`crate::error::ReactorError::BrokenEffects`]
/// (§9). Effects are dropped without running their cleanups — after a
/// broken batch the object graph they refer to is already inconsistent, so
/// there is nothing trustworthy left for a cleanup to observe.
///
/// The options bag is left untouched: it was configured deliberately and
/// is not part of what a broken batch can corrupt.
pub fn reset() {
    RUNTIME.with(|rt| {
        *rt.identity.borrow_mut() = IdentityRegistry::default();
        *rt.registry.borrow_mut() = DependencyRegistry::default();
        rt.scheduler.borrow_mut().reset();
        rt.effects.borrow_mut().clear();
    });
    crate::active::clear();
}

/// Mutate the process-wide options bag (§6).
pub fn configure(f: impl FnOnce(&mut Options)) {
    RUNTIME.with(|rt| f(&mut rt.options.borrow_mut()));
}

/// Whether an uncaught scheduler error (cycle, chain-limit overrun) has
/// left the runtime in the "broken" state described in §7 — every write
/// raises [`crate::error::ReactorError::BrokenEffects`] until [`reset`].
pub fn is_broken() -> bool {
    RUNTIME.with(|rt| rt.scheduler.borrow().is_broken())
}

/// Read the process-wide options bag.
pub fn with_options<R>(f: impl FnOnce(&Options) -> R) -> R {
    RUNTIME.with(|rt| f(&rt.options.borrow()))
}
