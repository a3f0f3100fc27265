//! Memoization (§4.5): cache a pure-over-reactive-inputs computation keyed
//! by its argument's identity, invalidated precisely when the computation's
//! own reads change.
//!
//! A node is indexed by argument identity using a weak-keyed map: the
//! requirement that memoization keys be weakly-referenceable becomes, in
//! Rust, a concrete, checkable bound rather than a runtime classification.
//! [`Memoizer`] requires its argument type to already be `Rc`-shared, the
//! same upgrade-or-drop pattern a subscriber list keyed by `Weak` handles
//! uses, so weak-keyability is enforced by the type system instead of
//! rejected at runtime. See DESIGN.md for the accepted simplification this
//! implies for `memoize.lenient`.

use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::active;
use crate::effect::{self, EffectOptions};
use crate::evolution::{Evolution, PropKey};
use crate::identity::{ObjectId, ObservableKind};
use crate::root;

struct Node<A, V> {
    arg: Weak<A>,
    object_id: ObjectId,
    result: std::cell::RefCell<Option<V>>,
    internal_effect: std::cell::RefCell<Option<effect::StopHandle>>,
}

/// A memoized computation over `Rc`-identified arguments (§4.5).
pub struct Memoizer<A, V> {
    nodes: std::cell::RefCell<FxHashMap<usize, Rc<Node<A, V>>>>,
    compute: Rc<dyn Fn(&Rc<A>) -> V>,
}

impl<A: 'static, V: Clone + PartialEq + 'static> Memoizer<A, V> {
    /// Build a memoizer around `compute`.
    pub fn new(compute: impl Fn(&Rc<A>) -> V + 'static) -> Self {
        Self { nodes: std::cell::RefCell::new(FxHashMap::default()), compute: Rc::new(compute) }
    }

    /// Read the memoized result for `arg`, computing (and subscribing to
    /// invalidation of) it on first access, tracking the current effect on
    /// the underlying node exactly like a reactive property read.
    pub fn get(&self, arg: &Rc<A>) -> V {
        self.prune_dead();
        let ptr = Rc::as_ptr(arg) as usize;
        let node = {
            let mut nodes = self.nodes.borrow_mut();
            nodes
                .entry(ptr)
                .or_insert_with(|| {
                    let object_id =
                        root::with_runtime(|rt| rt.identity.borrow_mut().allocate(ObservableKind::MemoNode));
                    Rc::new(Node {
                        arg: Rc::downgrade(arg),
                        object_id,
                        result: std::cell::RefCell::new(None),
                        internal_effect: std::cell::RefCell::new(None),
                    })
                })
                .clone()
        };

        effect::track_read(node.object_id, PropKey::AllProps);

        if node.internal_effect.borrow().is_none() {
            self.spawn(&node);
        }

        let cached = node.result.borrow().clone();
        match cached {
            Some(value) => {
                self.maybe_verify(arg, &value);
                value
            }
            // The internal effect's argument upgrade failed at the instant
            // it ran (the caller's own `Rc` died between this call's entry
            // and the synchronous spawn above) — fall back to a direct,
            // untracked recomputation rather than panicking.
            None => active::untracked(|| (self.compute)(arg)),
        }
    }

    fn spawn(&self, node: &Rc<Node<A, V>>) {
        let compute = self.compute.clone();
        let node_for_body = node.clone();
        let arg_weak = node.arg.clone();
        let handle = active::untracked(|| {
            effect::effect(
                move |access| {
                    let Some(arg) = arg_weak.upgrade() else {
                        return Ok(None);
                    };
                    let value = (compute)(&arg);
                    *node_for_body.result.borrow_mut() = Some(value);
                    let node_for_cleanup = node_for_body.clone();
                    let id = access.id();
                    Ok(Some(Box::new(move || {
                        *node_for_cleanup.result.borrow_mut() = None;
                        let object_id = node_for_cleanup.object_id;
                        let _ = effect::emit(
                            object_id,
                            Evolution::Invalidate { prop: PropKey::AllProps },
                            &[PropKey::AllProps],
                        );
                        *node_for_cleanup.internal_effect.borrow_mut() = None;
                        root::with_runtime(|rt| {
                            rt.stop_effect(id, crate::evolution::CleanupReason::Stopped)
                        });
                    }) as effect::CleanupFn))
                },
                EffectOptions { computed: true, ..EffectOptions::default() },
            )
        });
        *node.internal_effect.borrow_mut() = Some(handle);
    }

    fn maybe_verify(&self, arg: &Rc<A>, cached: &V) {
        let hook = root::with_options(|o| o.on_memoization_discrepancy.clone());
        let Some(hook) = hook else { return };
        let fresh = active::untracked(|| (self.compute)(arg));
        if &fresh != cached {
            hook("memoized result diverged from a fresh recomputation");
        }
    }

    /// Drop nodes whose argument has been collected. Cheap to call
    /// opportunistically; the entry's `Rc<Node>` refcount, not this method,
    /// is what actually frees its internal effect.
    fn prune_dead(&self) {
        self.nodes.borrow_mut().retain(|_, node| node.arg.upgrade().is_some());
    }
}

/// The lenient counterpart to [`Memoizer`] (§6 `memoize.lenient`): accepts
/// any argument type, including ones that cannot be weakly referenced, by
/// never caching at all — every call recomputes. This is the accepted,
/// documented shape of "recomputes for non-weak-keyable arguments without
/// raising" once weak-keyability is a type-level requirement rather than a
/// runtime check (see DESIGN.md).
pub fn lenient<K, V>(compute: impl Fn(&K) -> V + 'static) -> impl Fn(&K) -> V {
    compute
}
