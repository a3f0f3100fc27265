//! `reactor-core`: a fine-grained reactivity kernel.
//!
//! Turns ordinary Rust data structures into observable state
//! ([`wrapper`]), tracks which effect reads which property
//! ([`registry`]/[`active`]), and re-runs the right effects in the right
//! order whenever a write happens ([`scheduler`]/[`effect`]). Built on top:
//! memoization ([`memo`]) and, in the sibling `reactor-collections` crate,
//! derived-collection primitives (`attend`/`scan`/`lift`/`project`/`morph`).
//!
//! Single-threaded, cooperative scheduling (§5): every piece of state this
//! crate owns lives behind a `thread_local!` (see [`root`]) and is only
//! ever touched from the thread that drives the reactive graph.

mod active;
mod config;
mod context;
mod effect;
mod error;
mod evolution;
mod identity;
mod introspection;
mod memo;
mod registry;
mod root;
mod scheduler;
mod wrapper;

pub mod prelude;

pub use config::{AsyncMode, CyclePolicy, Introspection, OverrunPolicy, Options};
pub use context::{capture as capture_context, with_restored as with_restored_context, ContextCarrier, ContextSnapshot};
pub use effect::{
    atomic, bi_di, effect, on_cleanup, on_effect_throw, register_pending_work, untracked, BiDi, CancellationToken,
    CleanupFn, EffectAccess, EffectOptions, EffectOutcome, PendingHandle, Reaction, StopHandle, ThrowHandler,
};
pub use error::{DebugInfo, EffectError, ReactorError};
pub use evolution::{AsPropKey, CleanupReason, Evolution, PropKey, Trigger};
pub use identity::{
    is_non_reactive, is_reactive, mark_non_reactive, mark_type_non_reactive, register_immutability_predicate,
    type_is_non_reactive, unwrap, wrap, EffectId, ImmutabilityPredicate, Observable, ObjectId, ObservableKind,
};
pub use introspection::{set_hook as set_introspection_hook, IntrospectionHook};
pub use memo::{lenient as memoize_lenient, Memoizer};
pub use root::{configure, is_broken, reset};
pub use wrapper::{KeyedMap, Record, Sequence, UnkeyedSet};

/// Build a `memoize`-shaped cache (§6 `memoize`) around `compute`: sugar
/// over [`Memoizer::new`] for the common "one function, called with
/// varying `Rc`-shared arguments" case.
pub fn memoize<A: 'static, V: Clone + PartialEq + 'static>(
    compute: impl Fn(&std::rc::Rc<A>) -> V + 'static,
) -> Memoizer<A, V> {
    Memoizer::new(compute)
}
