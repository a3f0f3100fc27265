//! Process-wide configuration bag (§6).
//!
//! A single [`Options`] value lives inside [`crate::root::Runtime`]; tests
//! that need isolation construct a fresh `Runtime` via
//! [`crate::root::reset`] rather than mutating global statics directly.

/// What happens when adding a causal edge would close a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Raise [`crate::error::ReactorError::CycleDetected`] and mark the
    /// scheduler broken.
    #[default]
    Throw,
    /// Log the witness path at `warn` level and drop the new edge.
    Warn,
    /// Silently remove one effect from the batch to make progress.
    Break,
}

/// What happens when `max_effect_chain` / `max_trigger_per_batch` is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Raise the corresponding error and mark the scheduler broken.
    #[default]
    Throw,
    /// Log at `debug` level and stop scheduling further effects this batch.
    Debug,
    /// Log at `warn` level and stop scheduling further effects this batch.
    Warn,
}

/// Cancellation policy for an effect whose previous run has outstanding
/// asynchronous work when it is asked to re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsyncMode {
    /// Abort the outstanding work; the re-run observes the newest inputs.
    Cancel,
    /// Defer the new run until the outstanding work completes.
    Queue,
    /// Drop the new run entirely.
    Ignore,
    /// Asynchronous tails are not tracked for this effect.
    #[default]
    Disabled,
}

/// Introspection hooks, gated so the hot path pays nothing when disabled.
#[derive(Debug, Clone, Default)]
pub enum Introspection {
    /// No introspection bookkeeping at all.
    #[default]
    Disabled,
    /// Record reasons / history for the external debug collaborator.
    Enabled {
        /// Attach a stack snapshot to each registered dependency and each
        /// trigger built from it.
        gather_reasons: bool,
        /// Log uncaught effect errors at `error` level.
        log_errors: bool,
        /// Keep a ring buffer of past triggers for history inspection.
        enable_history: bool,
        /// Capacity of that ring buffer.
        history_size: usize,
    },
}

/// The process-wide options bag (§6).
#[derive(Clone)]
pub struct Options {
    /// Only intercept an object's own, non-inherited keys.
    pub instance_members_only: bool,
    /// Do not traverse into accessor (computed-property) reads.
    pub ignore_accessors: bool,
    /// Upper bound on effects run within a single batch before the
    /// overrun policy kicks in.
    pub max_effect_chain: usize,
    /// Upper bound on distinct triggers enqueued within a single batch.
    pub max_trigger_per_batch: usize,
    /// Reaction when either bound above is exceeded.
    pub max_effect_reaction: OverrunPolicy,
    /// Reaction when scheduling a causal edge would close a cycle.
    pub cycle_handling: CyclePolicy,
    /// Default async cancellation policy for newly created effects.
    pub async_mode: AsyncMode,
    /// Introspection configuration.
    pub introspection: Introspection,
    /// Invoked when a memoized getter's cached result and a verification
    /// re-run disagree. Never fatal.
    pub on_memoization_discrepancy: Option<std::rc::Rc<dyn Fn(&str)>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            instance_members_only: false,
            ignore_accessors: false,
            max_effect_chain: 10_000,
            max_trigger_per_batch: 100_000,
            max_effect_reaction: OverrunPolicy::Throw,
            cycle_handling: CyclePolicy::Throw,
            async_mode: AsyncMode::Disabled,
            introspection: Introspection::Disabled,
            on_memoization_discrepancy: None,
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("instance_members_only", &self.instance_members_only)
            .field("ignore_accessors", &self.ignore_accessors)
            .field("max_effect_chain", &self.max_effect_chain)
            .field("max_trigger_per_batch", &self.max_trigger_per_batch)
            .field("max_effect_reaction", &self.max_effect_reaction)
            .field("cycle_handling", &self.cycle_handling)
            .field("async_mode", &self.async_mode)
            .field("introspection", &self.introspection)
            .field("on_memoization_discrepancy", &self.on_memoization_discrepancy.is_some())
            .finish()
    }
}
