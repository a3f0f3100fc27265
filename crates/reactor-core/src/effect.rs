//! Effect Runtime (§4.4): makes a user callback reactive.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::active;
use crate::config::AsyncMode;
use crate::error::{EffectError, ReactorError};
use crate::evolution::{CleanupReason, Evolution, PropKey, Trigger};
use crate::identity::{EffectId, ObjectId};
use crate::root::{self, RuntimeInner};
use crate::scheduler::ScheduleMode;

/// A closure run when an effect tears down, either before re-running or on
/// final disposal.
pub type CleanupFn = Box<dyn FnOnce()>;

/// What an effect body returns: the cleanup to run before its next
/// teardown, or an error.
pub type EffectOutcome = Result<Option<CleanupFn>, EffectError>;

/// A handler registered via [`on_effect_throw`]. Returning `Ok` stops
/// propagation; the optional cleanup becomes the effect's next-dispose
/// cleanup. Returning `Err` re-throws to the parent effect.
pub type ThrowHandler = Box<dyn Fn(&EffectError) -> Result<Option<CleanupFn>, EffectError>>;

/// A dependency-read debug hook (§4.4 `dependency_hook` option).
pub type DependencyHook = Rc<dyn Fn(ObjectId, &PropKey)>;

/// Configuration for a single [`effect`] call (§4.4).
#[derive(Default)]
pub struct EffectOptions {
    /// Async cancellation policy; `None` inherits the process-wide default.
    pub async_mode: Option<AsyncMode>,
    /// Debug callback invoked on each dependency read this effect makes.
    pub dependency_hook: Option<DependencyHook>,
    /// Debug label.
    pub name: Option<String>,
    /// Marks this effect as a memo's internal computation (§4.5): writes
    /// attempted while it is active raise `WriteInComputed` instead of
    /// enqueueing, starting with its very first run. Not part of the
    /// public surface — only [`crate::memo::Memoizer`] sets this.
    pub(crate) computed: bool,
}

/// Whether this is an effect's first run, or a re-run with a reason.
#[derive(Debug, Clone)]
pub enum Reaction {
    /// First execution since creation.
    Initial,
    /// A subsequent run or teardown, with the reason.
    Reason(CleanupReason),
}

/// Passed to an effect body on every run (§4.4 point 3).
pub struct EffectAccess {
    id: EffectId,
    creation_context: Option<EffectId>,
    reaction: Reaction,
}

impl EffectAccess {
    /// Run `f` with this effect active again — used after resuming from a
    /// suspension point (e.g. inside an async continuation).
    pub fn tracked<R>(&self, f: impl FnOnce() -> R) -> R {
        active::with_active(self.id, f)
    }

    /// Run `f` with the creation-context's active effect active instead of
    /// this one, so reads are attributed to the owner rather than to this
    /// nested effect. Used by the derived-collection primitives.
    pub fn ascend<R>(&self, f: impl FnOnce() -> R) -> R {
        active::with_active_opt(self.creation_context, f)
    }

    /// `Initial` on first run, the reason otherwise.
    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }

    /// This effect's id, for advanced use (e.g. recording it as a memo's
    /// internal effect).
    pub fn id(&self) -> EffectId {
        self.id
    }
}

/// An in-flight asynchronous computation's cancellation token.
#[derive(Clone)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    /// Whether the work this token guards has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// An effect's outstanding asynchronous tail, as tracked internally by the
/// runtime (§4.3 cancellation / §9 "Coroutine/async inside effects").
struct PendingWork {
    cancelled: Rc<Cell<bool>>,
}

impl PendingWork {
    fn new() -> Self {
        Self { cancelled: Rc::new(Cell::new(false)) }
    }

    fn token(&self) -> CancellationToken {
        CancellationToken(self.cancelled.clone())
    }

    fn cancel(&self) {
        self.cancelled.set(true);
    }
}

/// Returned by [`register_pending_work`]: the async computation polls
/// [`PendingHandle::token`] to learn it has been cancelled, and calls
/// [`PendingHandle::finish`] once it settles normally so the effect's
/// `async_mode` reconciliation (§4.3) can release whatever it deferred.
pub struct PendingHandle {
    id: EffectId,
    token: CancellationToken,
}

impl PendingHandle {
    /// A cloneable token the async computation polls to learn it has been
    /// cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Shorthand for `token().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Report that this pending work settled normally, not via
    /// cancellation. Under `AsyncMode::Queue` this runs the re-execution
    /// that piled up while the work was outstanding, if any; under every
    /// other mode it just clears the effect's pending slot.
    pub fn finish(self) {
        root::with_runtime(|rt| rt.finish_pending_work(self.id));
    }
}

pub(crate) struct EffectNode {
    pub(crate) body: Box<dyn Fn(&EffectAccess) -> EffectOutcome>,
    pub(crate) parent: Option<EffectId>,
    pub(crate) children: RefCell<Vec<EffectId>>,
    pub(crate) cleanup: RefCell<Option<CleanupFn>>,
    pub(crate) error_cleanup: RefCell<Option<CleanupFn>>,
    pub(crate) stopped: Cell<bool>,
    pub(crate) running: Cell<bool>,
    pub(crate) async_mode: AsyncMode,
    pub(crate) pending: RefCell<Option<PendingWork>>,
    pub(crate) queued_rerun: Cell<Option<Reaction>>,
    pub(crate) handlers: RefCell<Vec<ThrowHandler>>,
    /// Triggers accumulated by `emit` for this effect's next scheduled run
    /// (§4.3); drained into a fresh `Reaction::Reason` by `drain_batch`
    /// right before the run they caused.
    pub(crate) pending_triggers: RefCell<Vec<Trigger>>,
    pub(crate) name: Option<Box<str>>,
    /// Root effects get a live `StopHandle`'s `Drop` wired to them; this
    /// flag only affects whether `Drop` on that handle disposes.
    pub(crate) is_root: bool,
    /// Set on a memo's internal effect (§4.5): writes attempted while this
    /// effect is the active one raise `WriteInComputed` instead of
    /// enqueueing (§4.1 invariant "a computed value must be pure").
    pub(crate) is_computed: Cell<bool>,
}

/// An owning (for root effects) or observing (for children) handle
/// returned by [`effect`]. Dropping a *root* effect's handle disposes it —
/// the idiomatic-Rust substitute for a host-runtime finalizer (see
/// DESIGN.md).
pub struct StopHandle {
    id: EffectId,
    is_root: bool,
    disposed: Cell<bool>,
}

impl StopHandle {
    /// Dispose the effect now. Idempotent.
    pub fn stop(&self) {
        if !self.disposed.replace(true) {
            root::with_runtime(|rt| rt.stop_effect(self.id, CleanupReason::Stopped));
        }
    }

    /// This effect's id.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Whether `stop` has already run (explicitly or via `Drop`).
    pub fn is_stopped(&self) -> bool {
        self.disposed.get()
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        if self.is_root && !self.disposed.get() {
            self.disposed.set(true);
            root::with_runtime(|rt| rt.stop_effect(self.id, CleanupReason::Stopped));
        }
    }
}

/// Create a reactive effect: run `body` now, tracking every reactive read
/// it performs, and re-run it whenever one of those reads changes (§4.4).
pub fn effect<F>(body: F, options: EffectOptions) -> StopHandle
where
    F: Fn(&EffectAccess) -> EffectOutcome + 'static,
{
    root::with_runtime(|rt| rt.create_effect(Box::new(body), options))
}

/// Register a cleanup closure for the currently running effect. Runs
/// before the effect's next re-run (with the reason that triggered it) and
/// on final disposal.
pub fn on_cleanup<F: FnOnce() + 'static>(cleanup: F) {
    let Some(id) = active::active_effect() else { return };
    root::with_runtime(|rt| {
        if let Some(node) = rt.effects.borrow().get(id) {
            *node.cleanup.borrow_mut() = Some(Box::new(cleanup));
        }
    });
}

/// Register an error handler on the currently running effect (§4.4).
pub fn on_effect_throw<H>(handler: H)
where
    H: Fn(&EffectError) -> Result<Option<CleanupFn>, EffectError> + 'static,
{
    let Some(id) = active::active_effect() else { return };
    root::with_runtime(|rt| {
        if let Some(node) = rt.effects.borrow().get(id) {
            node.handlers.borrow_mut().push(Box::new(handler));
        }
    });
}

/// Associate an outstanding asynchronous computation with the currently
/// running effect, so a re-run can cancel/queue/ignore it per the effect's
/// `async_mode` (§4.3).
pub fn register_pending_work() -> Option<PendingHandle> {
    let id = active::active_effect()?;
    root::with_runtime(|rt| {
        let node_ref = rt.effects.borrow();
        let node = node_ref.get(id)?;
        if node.async_mode == AsyncMode::Disabled {
            return None;
        }
        let work = PendingWork::new();
        let token = work.token();
        *node.pending.borrow_mut() = Some(work);
        Some(PendingHandle { id, token })
    })
}

/// Run `f` without tracking any dependencies (§6 `untracked`).
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    active::untracked(f)
}

/// Run `f` as a single immediate batch (§6 `atomic`): writes performed
/// inside are collected and their consumers run, topologically ordered,
/// once `f` returns (or immediately, if a batch is already open).
pub fn atomic<T>(f: impl FnOnce() -> T) -> T {
    root::with_runtime(|rt| rt.atomic(f))
}

/// A live reactive↔external bridge created by [`bi_di`]. Dropping this
/// does not tear down the underlying effect — hold its [`StopHandle`]
/// separately if the bridge needs to be torn down; `BiDi` only exposes the
/// external→reactive direction.
pub struct BiDi<T> {
    provide: Rc<dyn Fn(T)>,
    stop: StopHandle,
}

impl<T> BiDi<T> {
    /// Push a value from the external side into the reactive side, without
    /// re-triggering the effect this same bridge set up to push reactive
    /// changes back out (§6 `bi_di`).
    pub fn provide(&self, value: T) {
        (self.provide)(value)
    }

    /// The bridge's reactive→external effect, for explicit disposal.
    pub fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }
}

/// Build a bidirectional binding between a reactive value and an external
/// one (§6 `bi_di`): an effect pushes `reactive_getter()` out through
/// `external_setter` whenever its reads change, and the returned
/// [`BiDi::provide`] pushes a value from the external side back through
/// `reactive_setter` inside an `atomic` batch, suppressing the bridge's own
/// effect so the external write it just performed does not re-trigger it.
pub fn bi_di<T: 'static>(
    external_setter: impl Fn(T) + 'static,
    reactive_getter: impl Fn() -> T + 'static,
    reactive_setter: impl Fn(T) + 'static,
) -> BiDi<T> {
    let suppressed = Rc::new(Cell::new(false));
    let suppressed_in_effect = suppressed.clone();
    let stop = effect(
        move |_access| {
            // Always read `reactive_getter` so the dependency stays
            // tracked even on a suppressed run — only the forward to
            // `external_setter` is skipped, not the subscription.
            let value = reactive_getter();
            if !suppressed_in_effect.get() {
                external_setter(value);
            }
            Ok(None)
        },
        EffectOptions::default(),
    );
    let reactive_setter = Rc::new(reactive_setter);
    let provide: Rc<dyn Fn(T)> = {
        let suppressed = suppressed.clone();
        Rc::new(move |value: T| {
            suppressed.set(true);
            atomic(|| reactive_setter(value));
            suppressed.set(false);
        })
    };
    BiDi { provide, stop }
}

/// Record that the currently active effect, if any, read `(obj, key)`.
/// Called by every `wrapper::*` accessor on a tracked read. A no-op for
/// objects marked non-reactive (§6 `mark_non_reactive`).
pub(crate) fn track_read(obj: ObjectId, key: PropKey) {
    root::with_runtime(|rt| {
        if rt.identity.borrow().is_non_reactive(obj) {
            return;
        }
        let active = active::active_effect();
        rt.registry.borrow_mut().register_dep(active, active::is_untracked(), obj, key);
    });
}

/// Publish a mutation (§3/§4.2). Called by every `wrapper::*` mutator. A
/// no-op for objects marked non-reactive.
pub(crate) fn emit(obj: ObjectId, evolution: Evolution, props: &[PropKey]) -> Result<(), ReactorError> {
    root::with_runtime(|rt| {
        if rt.identity.borrow().is_non_reactive(obj) {
            return Ok(());
        }
        rt.emit(obj, evolution, props)
    })
}

impl RuntimeInner {
    pub(crate) fn create_effect(
        &self,
        body: Box<dyn Fn(&EffectAccess) -> EffectOutcome>,
        options: EffectOptions,
    ) -> StopHandle {
        let parent = active::active_effect();
        let async_mode = options.async_mode.unwrap_or(self.options.borrow().async_mode);
        let node = EffectNode {
            body,
            parent,
            children: RefCell::new(Vec::new()),
            cleanup: RefCell::new(None),
            error_cleanup: RefCell::new(None),
            stopped: Cell::new(false),
            running: Cell::new(false),
            async_mode,
            pending: RefCell::new(None),
            queued_rerun: Cell::new(None),
            handlers: RefCell::new(Vec::new()),
            pending_triggers: RefCell::new(Vec::new()),
            name: options.name.map(|s| s.into_boxed_str()),
            is_root: parent.is_none(),
            is_computed: Cell::new(options.computed),
        };
        let dependency_hook = options.dependency_hook;
        let id = self.effects.borrow_mut().insert(node);
        if let Some(hook) = dependency_hook {
            self.registry.borrow_mut().set_dependency_hook(id, Some(hook));
        }
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.effects.borrow().get(parent_id) {
                parent_node.children.borrow_mut().push(id);
            }
        }
        let is_root = parent.is_none();
        let name = self.effects.borrow().get(id).and_then(|n| n.name.clone());
        crate::introspection::notify_register_effect(id, name.as_deref());
        self.run_effect(id, Reaction::Initial, ScheduleMode::Immediate);
        StopHandle { id, is_root, disposed: Cell::new(false) }
    }

    /// Execute (or re-execute) an effect's body, handling cleanup,
    /// dependency re-tracking, and error propagation.
    pub(crate) fn run_effect(&self, id: EffectId, reaction: Reaction, _mode: ScheduleMode) {
        let already_running = match self.effects.borrow().get(id) {
            Some(node) => node.running.replace(true),
            None => return,
        };
        if already_running {
            // Reentrant: a rerun was requested while this effect's own
            // body is still on the call stack. Remember it and replay
            // once the in-progress run finishes (see the `queued` check
            // at the end of this function).
            if let Some(node) = self.effects.borrow().get(id) {
                node.queued_rerun.set(Some(reaction));
            }
            return;
        }

        // Async-mode reconciliation: if the previous run left pending
        // work outstanding, decide whether this run may proceed.
        let pending_decision = self.reconcile_pending(id, &reaction);
        if !pending_decision {
            if let Some(node) = self.effects.borrow().get(id) {
                node.running.set(false);
            }
            return;
        }

        self.run_cleanup_for(id, reaction_to_cleanup_reason(&reaction));

        let stopped_during_cleanup = match self.effects.borrow().get(id) {
            Some(node) => {
                node.running.set(false);
                node.stopped.get()
            }
            None => true,
        };
        if stopped_during_cleanup {
            // Its own cleanup stopped the effect (e.g. a memo's internal
            // effect self-stopping); do not run the body, and finish the
            // teardown `stop_effect` deferred while we were running.
            if self.effects.borrow().contains_key(id) {
                self.finish_stop(id, CleanupReason::Stopped);
            }
            return;
        }
        // Not stopped: undo the `running.set(false)` above, the body call
        // below needs it set again so reentrant teardown still defers.
        if let Some(node) = self.effects.borrow().get(id) {
            node.running.set(true);
        }

        self.registry.borrow_mut().remove_effect(id);
        // §7 propagation policy: handlers registered during run N-1 do not
        // carry over to run N — `on_effect_throw` re-registers them fresh
        // each run.
        if let Some(node) = self.effects.borrow().get(id) {
            node.handlers.borrow_mut().clear();
        }

        let creation_context = self.effects.borrow().get(id).and_then(|n| n.parent);
        let access = EffectAccess { id, creation_context, reaction };

        let outcome = active::with_active(id, || {
            let body_ref = self.effects.borrow();
            let Some(node) = body_ref.get(id) else { return Ok(None) };
            // SAFETY-free: we can't hold `body_ref` across the call because
            // the body itself may re-enter `self.effects` (e.g. to create
            // child effects). Clone the closure pointer via Rc would need
            // the field to be Rc; instead we take a raw pointer for the
            // duration of the call, valid because nothing removes `id`
            // from the slotmap while `running` is set.
            let body_ptr: *const (dyn Fn(&EffectAccess) -> EffectOutcome) = &*node.body;
            drop(body_ref);
            let body_fn = unsafe { &*body_ptr };
            catch_effect_panic(|| body_fn(&access))
        });

        match outcome {
            Ok(cleanup) => {
                if let Some(node) = self.effects.borrow().get(id) {
                    *node.cleanup.borrow_mut() = cleanup;
                }
            }
            Err(err) => {
                self.propagate_effect_error(id, err);
            }
        }

        let (stopped, queued) = match self.effects.borrow().get(id) {
            Some(node) => {
                node.running.set(false);
                (node.stopped.get(), node.queued_rerun.take())
            }
            None => (false, None),
        };
        if stopped {
            // A self-stop arrived while the body above was running; finish
            // the teardown `stop_effect` deferred.
            self.finish_stop(id, CleanupReason::Stopped);
        } else if let Some(next) = queued {
            self.run_effect(id, next, ScheduleMode::Enqueue);
        }
    }

    /// Decide whether this run may proceed given whatever pending
    /// asynchronous tail the previous run left outstanding (§4.3). `Queue`
    /// remembers `reaction` in `queued_rerun` so that [`Self::finish_pending_work`]
    /// can replay it once that tail reports completion; `Ignore` just
    /// drops this attempt without remembering anything.
    fn reconcile_pending(&self, id: EffectId, reaction: &Reaction) -> bool {
        let (pending, mode) = match self.effects.borrow().get(id) {
            Some(node) => (node.pending.borrow_mut().take(), node.async_mode),
            None => return false,
        };
        let Some(pending) = pending else { return true };
        match mode {
            AsyncMode::Cancel => {
                pending.cancel();
                true
            }
            AsyncMode::Queue => {
                if let Some(node) = self.effects.borrow().get(id) {
                    node.queued_rerun.set(Some(reaction.clone()));
                    *node.pending.borrow_mut() = Some(pending);
                }
                false
            }
            AsyncMode::Ignore => {
                if let Some(node) = self.effects.borrow().get(id) {
                    *node.pending.borrow_mut() = Some(pending);
                }
                false
            }
            AsyncMode::Disabled => {
                pending.cancel();
                true
            }
        }
    }

    /// Report that `id`'s outstanding pending work (§4.3) settled
    /// normally. Clears the pending slot and, if a rerun was deferred by
    /// `AsyncMode::Queue` while it was outstanding, runs it now.
    pub(crate) fn finish_pending_work(&self, id: EffectId) {
        let deferred = match self.effects.borrow().get(id) {
            Some(node) => {
                *node.pending.borrow_mut() = None;
                node.queued_rerun.take()
            }
            None => return,
        };
        if let Some(reaction) = deferred {
            self.run_effect(id, reaction, ScheduleMode::Enqueue);
        }
    }

    fn run_cleanup_for(&self, id: EffectId, reason: CleanupReason) {
        let cleanup = match self.effects.borrow().get(id) {
            Some(node) => node.cleanup.borrow_mut().take(),
            None => return,
        };
        let error_cleanup = match self.effects.borrow().get(id) {
            Some(node) => node.error_cleanup.borrow_mut().take(),
            None => None,
        };
        let _ = &reason;
        if let Some(cleanup) = cleanup {
            if let Err(panic) = catch_cleanup_panic(cleanup) {
                log::error!("reactor: cleanup panicked and was swallowed: {panic}");
            }
        }
        if let Some(cleanup) = error_cleanup {
            if let Err(panic) = catch_cleanup_panic(cleanup) {
                log::error!("reactor: error-handler cleanup panicked and was swallowed: {panic}");
            }
        }
    }

    fn propagate_effect_error(&self, id: EffectId, err: EffectError) {
        let handlers = match self.effects.borrow().get(id) {
            Some(node) => std::mem::take(&mut *node.handlers.borrow_mut()),
            None => return,
        };
        for handler in &handlers {
            match handler(&err) {
                Ok(cleanup) => {
                    if let Some(node) = self.effects.borrow().get(id) {
                        *node.error_cleanup.borrow_mut() = cleanup;
                    }
                    return;
                }
                Err(_) => continue,
            }
        }
        let parent = self.effects.borrow().get(id).and_then(|n| n.parent);
        match parent {
            Some(parent_id) => self.propagate_effect_error(parent_id, err),
            None => {
                log::error!("reactor: uncaught effect error escaped the root effect: {err}");
                self.scheduler.borrow_mut().mark_broken(err.to_string());
            }
        }
    }

    /// Stop an effect: run its cleanup, recursively stop its children,
    /// detach it from its parent, and erase it from the dependency and
    /// causal graphs (§4.4 cleanup contract).
    ///
    /// If `id`'s own body is currently executing (a self-stop, reached via
    /// its own `StopHandle` or an `on_cleanup` closure run from within its
    /// own teardown), the actual teardown is deferred to `run_effect`,
    /// which checks `stopped` after the body call returns. Tearing down —
    /// and so dropping — the node's closure while it is still on the call
    /// stack would free memory the running call still needs.
    pub(crate) fn stop_effect(&self, id: EffectId, reason: CleanupReason) {
        let (already_stopped, is_running) = match self.effects.borrow().get(id) {
            Some(node) => (node.stopped.replace(true), node.running.get()),
            None => return,
        };
        if already_stopped || is_running {
            return;
        }
        self.finish_stop(id, reason);
    }

    fn finish_stop(&self, id: EffectId, reason: CleanupReason) {
        self.run_cleanup_for(id, reason.clone());

        let children = match self.effects.borrow().get(id) {
            Some(node) => std::mem::take(&mut *node.children.borrow_mut()),
            None => Vec::new(),
        };
        for child in children {
            self.stop_effect(child, CleanupReason::Lineage { parent_reason: Box::new(reason.clone()) });
        }

        let parent = self.effects.borrow().get(id).and_then(|n| n.parent);
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.effects.borrow().get(parent_id) {
                parent_node.children.borrow_mut().retain(|&c| c != id);
            }
        }

        self.registry.borrow_mut().forget_effect(id);
        self.scheduler.borrow_mut().remove_effect(id);
        self.effects.borrow_mut().remove(id);
    }

    fn active_is_computed(&self) -> bool {
        match active::active_effect() {
            Some(id) => self.effects.borrow().get(id).map(|n| n.is_computed.get()).unwrap_or(false),
            None => false,
        }
    }

    /// Publish a mutation (§3/§4.2): fan it out to every subscriber of
    /// `obj`'s affected keys, enqueueing each with the scheduler, and if no
    /// batch was already open, drain the one this write started.
    pub(crate) fn emit(
        &self,
        obj: ObjectId,
        evolution: Evolution,
        props: &[PropKey],
    ) -> Result<(), ReactorError> {
        if self.active_is_computed() {
            return Err(ReactorError::WriteInComputed { prop: props.first().cloned() });
        }
        if let Some(cause) = self.scheduler.borrow().broken_cause() {
            return Err(ReactorError::BrokenEffects { cause: Some(cause.to_string()) });
        }
        let active = active::active_effect();
        let subscribers = self.registry.borrow().subscribers_for(obj, &evolution, props, active);
        if subscribers.is_empty() {
            return Ok(());
        }
        let opts = self.options.borrow().clone();
        let was_running = self.scheduler.borrow().is_running();
        if !was_running {
            self.scheduler.borrow_mut().begin_batch();
        }
        let gather_reasons = crate::introspection::gather_reasons();
        for (effect_id, mut trigger) in subscribers {
            if gather_reasons {
                trigger.stack = crate::introspection::capture_stack();
            }
            crate::introspection::notify_trigger(active, effect_id, obj, &trigger.prop, &evolution);
            if let Some(node) = self.effects.borrow().get(effect_id) {
                node.pending_triggers.borrow_mut().push(trigger);
            }
            if let Err(err) = self.scheduler.borrow_mut().enqueue(
                effect_id,
                active,
                opts.cycle_handling,
                opts.max_trigger_per_batch,
                opts.max_effect_reaction,
            ) {
                // A scheduler-raised error (cycle or chain-limit) is
                // always fatal to the batch and always trips broken state
                // (§7) — unlike a user effect error, it never goes through
                // a per-effect handler chain, and it must not depend on
                // whether this write's own caller bothers to check the
                // `Result` this function returns.
                log::error!("reactor: {err}");
                self.scheduler.borrow_mut().mark_broken(err.to_string());
                if !was_running {
                    self.scheduler.borrow_mut().end_batch();
                }
                return Err(err);
            }
        }
        if !was_running {
            self.drain_batch();
        }
        Ok(())
    }

    pub(crate) fn atomic<T>(&self, f: impl FnOnce() -> T) -> T {
        let was_running = self.scheduler.borrow().is_running();
        if !was_running {
            self.scheduler.borrow_mut().begin_batch();
        }
        let result = f();
        if !was_running {
            self.drain_batch();
        }
        result
    }

    /// Run the scheduling loop until the current batch's `all` set is
    /// empty (§4.3 step 2), then drain deferred batch cleanups.
    pub(crate) fn drain_batch(&self) {
        let cycle_handling = self.options.borrow().cycle_handling;
        let overrun = self.options.borrow().max_effect_reaction;
        let max_chain = self.options.borrow().max_effect_chain;

        loop {
            if self.scheduler.borrow().batch_is_empty() {
                break;
            }
            let active = active::active_effect();
            let next = self.scheduler.borrow().pick_next(active);
            match next {
                Some(id) => {
                    self.scheduler.borrow_mut().mark_executing(id);
                    if self.scheduler.borrow().executed_count() > max_chain {
                        self.react_overrun(overrun, max_chain);
                        break;
                    }
                    let triggers = self
                        .effects
                        .borrow()
                        .get(id)
                        .map(|n| std::mem::take(&mut *n.pending_triggers.borrow_mut()))
                        .unwrap_or_default();
                    let reaction = Reaction::Reason(CleanupReason::PropChange { triggers });
                    self.run_effect(id, reaction, ScheduleMode::Enqueue);
                }
                None => {
                    // Cycle: no candidate has in-degree zero or fully
                    // satisfied causes.
                    match cycle_handling {
                        crate::config::CyclePolicy::Break => {
                            if let Some(victim) = self.scheduler.borrow().cycle_break_victim() {
                                log::warn!("reactor: breaking cycle by skipping effect");
                                self.scheduler.borrow_mut().mark_executing(victim);
                            } else {
                                break;
                            }
                        }
                        crate::config::CyclePolicy::Warn => {
                            if let Some(victim) = self.scheduler.borrow().cycle_break_victim() {
                                let chain = self.scheduler.borrow().witness_for(victim);
                                log::warn!("reactor: cycle among effects {:?}", chain);
                                self.scheduler.borrow_mut().mark_executing(victim);
                            } else {
                                break;
                            }
                        }
                        crate::config::CyclePolicy::Throw => {
                            if let Some(victim) = self.scheduler.borrow().cycle_break_victim() {
                                let chain = self.scheduler.borrow().witness_for(victim);
                                log::error!("reactor: cycle detected among effects {:?}", chain);
                            }
                            self.scheduler.borrow_mut().mark_broken("cycle detected".to_string());
                            break;
                        }
                    }
                }
            }
        }
        for cleanup in self.scheduler.borrow_mut().end_batch() {
            if let Err(panic) = catch_cleanup_panic(cleanup) {
                log::error!("reactor: batch cleanup panicked and was swallowed: {panic}");
            }
        }
    }

    fn react_overrun(&self, policy: crate::config::OverrunPolicy, limit: usize) {
        use crate::config::OverrunPolicy;
        let msg = format!("reactor: max_effect_chain ({limit}) exceeded in one batch");
        match policy {
            OverrunPolicy::Throw => {
                log::error!("{msg}");
                self.scheduler.borrow_mut().mark_broken(msg);
            }
            OverrunPolicy::Debug => log::debug!("{msg}"),
            OverrunPolicy::Warn => log::warn!("{msg}"),
        }
    }
}

fn reaction_to_cleanup_reason(reaction: &Reaction) -> CleanupReason {
    match reaction {
        Reaction::Initial => CleanupReason::PropChange { triggers: Vec::new() },
        Reaction::Reason(reason) => reason.clone(),
    }
}

fn catch_effect_panic(f: impl FnOnce() -> EffectOutcome) -> EffectOutcome {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(EffectError::Panic(panic_message(payload))),
    }
}

fn catch_cleanup_panic(f: CleanupFn) -> Result<(), String> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
