//! Identity Registry (§4.1).
//!
//! Raw Rust values have no ambient notion of "the same object" the way a
//! host language with reference semantics for every aggregate does,
//! so the bidirectional raw↔wrapped mapping is realized per observable
//! kind in `wrapper/*`, keyed by the pointer address of the
//! `Rc<RefCell<_>>` backing a wrapped value (a stable, comparable identity,
//! exactly the thing JS object identity gives for free). This module owns
//! the pieces that are kind-agnostic: id allocation, the immutability
//! classifier, and the non-reactive marker set.

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use std::any::{Any, TypeId};
use std::rc::Rc;

slotmap::new_key_type! {
    /// Stable identity of a wrapped object, used as half of every
    /// dependency-registry key.
    pub struct ObjectId;
}

slotmap::new_key_type! {
    /// Stable identity of an effect node.
    pub struct EffectId;
}

/// What kind of observable a given [`ObjectId`] backs — the dispatch tag
/// from the design notes' "replace prototype tricks with a variant and a
/// dispatch table" strategy (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservableKind {
    /// A string-keyed reactive record.
    Record,
    /// An index-keyed reactive sequence.
    Sequence,
    /// An arbitrarily-keyed reactive map.
    KeyedMap,
    /// An unkeyed reactive set.
    UnkeyedSet,
    /// A memoization node (§4.5) — carries no raw backing of its own, only
    /// a dependency-registry identity for its cached result.
    MemoNode,
}

/// A predicate consulted by the classifier before a value is wrapped: if
/// any registered predicate returns `true` for a value's `TypeId`, values
/// of that type are treated as immutable and never wrapped.
pub type ImmutabilityPredicate = Rc<dyn Fn(TypeId) -> bool>;

#[derive(Default)]
pub(crate) struct IdentityRegistry {
    pub(crate) ids: SlotMap<ObjectId, ObservableKind>,
    non_reactive: FxHashSet<ObjectId>,
    non_reactive_types: FxHashSet<TypeId>,
    immutability_predicates: Vec<ImmutabilityPredicate>,
}

impl IdentityRegistry {
    pub(crate) fn allocate(&mut self, kind: ObservableKind) -> ObjectId {
        self.ids.insert(kind)
    }

    pub(crate) fn kind_of(&self, id: ObjectId) -> Option<ObservableKind> {
        self.ids.get(id).copied()
    }

    pub(crate) fn mark_non_reactive(&mut self, id: ObjectId) {
        self.non_reactive.insert(id);
    }

    pub(crate) fn mark_type_non_reactive<T: Any>(&mut self) {
        self.non_reactive_types.insert(TypeId::of::<T>());
    }

    pub(crate) fn is_non_reactive(&self, id: ObjectId) -> bool {
        self.non_reactive.contains(&id)
    }

    pub(crate) fn type_is_non_reactive<T: Any>(&self) -> bool {
        self.non_reactive_types.contains(&TypeId::of::<T>())
    }

    pub(crate) fn register_immutability_predicate(&mut self, pred: ImmutabilityPredicate) {
        self.immutability_predicates.push(pred);
    }

    pub(crate) fn is_immutable_type(&self, id: TypeId) -> bool {
        self.immutability_predicates.iter().any(|p| p(id))
    }

    pub(crate) fn forget(&mut self, id: ObjectId) {
        self.ids.remove(id);
        self.non_reactive.remove(&id);
    }
}

/// Trait implemented by every concrete observable wrapper kind
/// (`Record`, `Sequence`, `KeyedMap`, `UnkeyedSet`), giving the generic
/// `wrap`/`unwrap`/`is_reactive` free functions (§6) something to dispatch
/// on.
pub trait Observable: Clone + Sized {
    /// The raw backing storage, an identity-bearing handle (an
    /// `Rc<RefCell<_>>`) so repeated `wrap` calls on the same raw value
    /// return the same wrapper (§3 invariant).
    type Raw;

    /// Wrap `raw`, returning the cached wrapper if one already exists for
    /// this raw identity.
    fn wrap(raw: Self::Raw) -> Self;

    /// Recover the raw backing storage.
    fn unwrap(self) -> Self::Raw;

    /// This object's identity in the dependency registry.
    fn object_id(&self) -> ObjectId;

    /// Whether this object is currently eligible for dependency tracking
    /// (not marked non-reactive).
    fn is_reactive(&self) -> bool;
}

/// Wrap a raw value, returning the cached wrapper if one exists (§6).
pub fn wrap<O: Observable>(raw: O::Raw) -> O {
    O::wrap(raw)
}

/// Recover the raw value backing a wrapper (§6).
pub fn unwrap<O: Observable>(value: O) -> O::Raw {
    value.unwrap()
}

/// Whether `value` is presently tracked for dependencies (§6).
pub fn is_reactive<O: Observable>(value: &O) -> bool {
    value.is_reactive()
}

/// The negation of [`is_reactive`] (§6).
pub fn is_non_reactive<O: Observable>(value: &O) -> bool {
    !value.is_reactive()
}

/// Mark a single wrapped instance as exempt from dependency tracking (§6
/// `mark_non_reactive(instance)`): every future read/write on it is a
/// silent pass-through.
pub fn mark_non_reactive<O: Observable>(value: &O) {
    let id = value.object_id();
    crate::root::with_runtime(|rt| rt.identity.borrow_mut().mark_non_reactive(id));
}

/// Mark an entire Rust type as never reactive (§6
/// `mark_non_reactive(type)`): [`wrap`] on a value of this type returns it
/// unwrapped.
pub fn mark_type_non_reactive<T: Any>() {
    crate::root::with_runtime(|rt| rt.identity.borrow_mut().mark_type_non_reactive::<T>());
}

/// Whether `T` was previously marked via [`mark_type_non_reactive`].
pub fn type_is_non_reactive<T: Any>() -> bool {
    crate::root::with_runtime(|rt| rt.identity.borrow().type_is_non_reactive::<T>())
}

/// Register a predicate consulted before wrapping any value of a given
/// `TypeId` (§6 `register_immutability_predicate`) — e.g. to exempt an
/// external clock, regex, or error type from wrapping.
pub fn register_immutability_predicate(pred: ImmutabilityPredicate) {
    crate::root::with_runtime(|rt| rt.identity.borrow_mut().register_immutability_predicate(pred));
}
