//! Context & Async-Boundary Plumbing (§4.7).
//!
//! The effect runtime requires that "the currently active effect" be
//! restored whenever a callback registered inside one effect runs later,
//! on some host-controlled schedule (a timer, a promise continuation, an
//! executor task). The core does not reach into any such API itself — that
//! integration lives outside this crate's scope (§1 Non-goals) — it only
//! exposes the capture/restore primitives a host integration wraps its
//! callbacks with.

use crate::active;
use crate::identity::EffectId;

/// An opaque capture of "which effect was active", taken at registration
/// time (e.g. right before a host timer API is asked to schedule a
/// callback) and replayed later via [`with_restored`] by the host
/// integration, at the point it actually invokes that callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSnapshot(Option<EffectId>);

/// Capture the currently active effect for later replay across a
/// host-controlled asynchronous boundary.
pub fn capture() -> ContextSnapshot {
    ContextSnapshot(active::active_effect())
}

/// Run `f` with a previously [`capture`]d context restored as the active
/// effect (or untracked, if none was active at capture time), then restore
/// whatever was active before this call. This is the one hook a host
/// integration needs: wrap the callback it hands to its timer/promise API
/// with this, and reads performed when that callback eventually runs are
/// attributed to the effect that was active when it was scheduled, not to
/// whatever happens to be active when the host gets around to invoking it.
pub fn with_restored<R>(snapshot: ContextSnapshot, f: impl FnOnce() -> R) -> R {
    active::with_active_opt(snapshot.0, f)
}

/// Implemented by a host integration that preserves active-effect context
/// across its own async primitives. The core never implements this itself
/// (§1 Non-goals); it is provided purely as the seam a host layers on top
/// of [`capture`]/[`with_restored`] when a single free-function pair isn't
/// enough structure (e.g. the host needs to attach the snapshot to its own
/// task type).
pub trait ContextCarrier {
    /// The host's own task/callback representation.
    type Task;

    /// Wrap `task` so that invoking it restores `snapshot` as the active
    /// effect for the duration of the call.
    fn carrying(task: Self::Task, snapshot: ContextSnapshot) -> Self::Task;
}
