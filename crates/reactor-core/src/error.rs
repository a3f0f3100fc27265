//! Error taxonomy surfaced at the public boundary.
//!
//! Kinds mirror the ones enumerated in the specification: cycle/chain-limit
//! errors raised by the scheduler are always fatal to the batch (they are
//! never handed to a per-effect handler chain); user-code errors inside an
//! effect body travel through [`crate::effect::on_effect_throw`] handlers
//! first and only become a `ReactorError` once they escape the root effect.

use std::fmt;

use crate::evolution::PropKey;

/// Structured debug payload attached to runtime-raised errors.
///
/// Populated only when [`crate::config::Introspection::gather_reasons`] is
/// enabled, so the hot path stays allocation-free by default.
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    /// Effect ids involved in the causal chain, root-to-leaf.
    pub causal_chain: Vec<u64>,
    /// Human-readable creation context (effect name, if any).
    pub creation_context: Option<String>,
}

/// An error produced by a user's effect body, or a panic caught while
/// running one.
#[derive(thiserror::Error)]
pub enum EffectError {
    /// The effect body returned an application error via `?`.
    #[error("{0}")]
    User(#[from] Box<dyn std::error::Error + 'static>),
    /// The effect body panicked; the panic payload was caught and converted.
    #[error("effect panicked: {0}")]
    Panic(String),
}

/// Errors raised by the reactive runtime itself.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    /// Adding a causal edge would have closed a cycle among effects.
    #[error("cycle detected among effects: {chain:?}")]
    CycleDetected {
        /// A witness path through the causal graph, root-to-leaf.
        chain: Vec<u64>,
        /// Optional structured debug info.
        debug_info: Option<DebugInfo>,
    },
    /// The scheduler's `max_effect_chain` bound was exceeded within a batch.
    #[error("max effect chain depth exceeded ({limit})")]
    MaxDepthExceeded {
        /// The configured limit that was hit.
        limit: usize,
        /// Optional structured debug info.
        debug_info: Option<DebugInfo>,
    },
    /// The scheduler's `max_trigger_per_batch` bound was exceeded.
    #[error("max reaction count per batch exceeded ({limit})")]
    MaxReactionExceeded {
        /// The configured limit that was hit.
        limit: usize,
        /// Optional structured debug info.
        debug_info: Option<DebugInfo>,
    },
    /// A memoized getter was written to by the computation that produced it.
    #[error("write performed from inside a computed value")]
    WriteInComputed {
        /// The property the write targeted, if known.
        prop: Option<PropKey>,
    },
    /// A dependency could not be tracked (e.g. an invalid key outside the
    /// synthetic `AllProps`/`KeysOf` pair reached a context that requires a
    /// valid one, or a memoization key was not weakly-referenceable where
    /// `memoize.lenient` semantics were not requested).
    #[error("tracking error: {0}")]
    TrackingError(String),
    /// An uncaught error previously escaped a batch; the runtime must be
    /// [`crate::root::reset`] before any further writes are accepted.
    #[error("reactive runtime is broken after an uncaught error; call reset() to recover")]
    BrokenEffects {
        /// The error that broke the runtime, if still available.
        cause: Option<String>,
    },
}

impl fmt::Debug for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::User(e) => f.debug_tuple("User").field(&e.to_string()).finish(),
            EffectError::Panic(s) => f.debug_tuple("Panic").field(s).finish(),
        }
    }
}
