//! Introspection collaborator interface (§6): consumed by the core,
//! implemented by an external debug module. Disabled by default so the hot
//! path pays nothing (`Options::introspection` gates every call site that
//! would otherwise invoke these hooks).

use std::rc::Rc;

use crate::evolution::{Evolution, PropKey};
use crate::identity::{EffectId, ObjectId};
use crate::root;

/// Implemented by a host-side debug module; registered once via
/// [`set_hook`].
pub trait IntrospectionHook {
    /// Called once, right after an effect is registered.
    fn on_register_effect(&self, effect: EffectId, name: Option<&str>);

    /// Called when a write enqueues `target` because of a read `source`
    /// (or no source, for an externally-originated write) performed.
    fn on_record_trigger(
        &self,
        source: Option<EffectId>,
        target: EffectId,
        object: ObjectId,
        prop: &PropKey,
        evolution: &Evolution,
    );

    /// Capture an opaque stack snapshot, attached to triggers when
    /// `gather_reasons` is enabled.
    fn capture_stack(&self) -> Option<Rc<str>>;
}

/// Register (or clear) the process-wide introspection collaborator.
pub fn set_hook(hook: Option<Rc<dyn IntrospectionHook>>) {
    root::with_runtime(|rt| *rt.introspection_hook.borrow_mut() = hook);
}

pub(crate) fn gather_reasons() -> bool {
    root::with_options(|o| matches!(
        o.introspection,
        crate::config::Introspection::Enabled { gather_reasons: true, .. }
    ))
}

pub(crate) fn notify_register_effect(effect: EffectId, name: Option<&str>) {
    root::with_runtime(|rt| {
        if let Some(hook) = rt.introspection_hook.borrow().as_ref() {
            hook.on_register_effect(effect, name);
        }
    });
}

pub(crate) fn notify_trigger(
    source: Option<EffectId>,
    target: EffectId,
    object: ObjectId,
    prop: &PropKey,
    evolution: &Evolution,
) {
    root::with_runtime(|rt| {
        if let Some(hook) = rt.introspection_hook.borrow().as_ref() {
            hook.on_record_trigger(source, target, object, prop, evolution);
        }
    });
}

pub(crate) fn capture_stack() -> Option<Rc<str>> {
    root::with_runtime(|rt| rt.introspection_hook.borrow().as_ref().and_then(|h| h.capture_stack()))
}
