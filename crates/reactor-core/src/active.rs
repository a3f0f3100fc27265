//! Active-Effect Context (§2 item 3): stack-discipline store of "which
//! effect is currently tracking reads."
//!
//! A single thread-local cell generalized to a stack, so `untracked`,
//! `ascend`, and `tracked` can nest and unwind correctly.

use std::cell::RefCell;

use crate::identity::EffectId;

/// One entry on the active-effect stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Reads are attributed to this effect.
    Effect(EffectId),
    /// Reads are not tracked at all (`untracked` / a synthetic root).
    Untracked,
}

thread_local! {
    static ACTIVE_STACK: RefCell<Vec<Slot>> = const { RefCell::new(Vec::new()) };
}

/// The effect reads should currently be attributed to, if any.
///
/// Returns `None` both when the stack is empty and when the top frame is an
/// explicit `Untracked` marker — callers that need to distinguish "no
/// active effect at all" from "tracking explicitly suppressed" should use
/// [`is_untracked`].
pub fn active_effect() -> Option<EffectId> {
    ACTIVE_STACK.with(|stack| match stack.borrow().last() {
        Some(Slot::Effect(id)) => Some(*id),
        _ => None,
    })
}

/// Whether the top of the active stack is an explicit `Untracked` marker.
pub fn is_untracked() -> bool {
    ACTIVE_STACK.with(|stack| matches!(stack.borrow().last(), Some(Slot::Untracked)))
}

struct PopGuard;
impl Drop for PopGuard {
    fn drop(&mut self) {
        ACTIVE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn push(slot: Slot) -> PopGuard {
    ACTIVE_STACK.with(|stack| stack.borrow_mut().push(slot));
    PopGuard
}

/// Run `f` with `effect` active, restoring the previous active effect
/// afterward even if `f` panics.
pub fn with_active<R>(effect: EffectId, f: impl FnOnce() -> R) -> R {
    let _guard = push(Slot::Effect(effect));
    f()
}

/// Run `f` with no active effect — reads inside do not subscribe anything
/// (§6 `untracked`).
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = push(Slot::Untracked);
    f()
}

/// Run `f` with the given optional effect active (`None` behaves like
/// [`untracked`]). Used by `ascend`, which attributes reads to the
/// creation-context's active effect, which may itself be `None`.
pub fn with_active_opt<R>(effect: Option<EffectId>, f: impl FnOnce() -> R) -> R {
    match effect {
        Some(id) => with_active(id, f),
        None => untracked(f),
    }
}

/// Clear the active-effect stack. Only meaningful as part of
/// [`crate::root::reset`], called once control has unwound back to no
/// active effect.
pub(crate) fn clear() {
    ACTIVE_STACK.with(|stack| stack.borrow_mut().clear());
}
