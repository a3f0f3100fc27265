//! Property keys, mutation events (`Evolution`), and re-run reasons
//! (`CleanupReason`) — the vocabulary the dependency registry and scheduler
//! pass around (§3).

use crate::identity::ObjectId;

/// A property key: a name, an index, an interned symbol, or one of the two
/// distinguished synthetic keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    /// A named field, as on a record.
    Named(Box<str>),
    /// A positional index, as on a sequence.
    Index(usize),
    /// An opaque symbol key (e.g. a hashed map key that is not
    /// string/index-shaped). Subscribing with any symbol other than one
    /// produced by [`PropKey::symbol`] is a no-op per §4.1's failure model.
    Symbol(u64),
    /// Subscribes to "the value of any property may have changed"; used by
    /// full-iteration reads (`iter`, `values`, short scans that ran to
    /// completion without an index-precise answer).
    AllProps,
    /// Subscribes to structural changes (key add/delete) only, not value
    /// updates; used by key-enumeration reads (`keys`, `len`).
    KeysOf,
}

impl PropKey {
    /// Build a symbol key from an arbitrary hashable value.
    pub fn symbol<H: std::hash::Hash>(value: &H) -> Self {
        use std::hash::{BuildHasher, Hasher};
        let mut hasher = rustc_hash::FxBuildHasher.build_hasher();
        value.hash(&mut hasher);
        PropKey::Symbol(hasher.finish())
    }
}

/// Anything that can be projected into a [`PropKey`] for a keyed
/// collection. Implemented for the common scalar key types; a type not
/// covered here can still be used as a `KeyedMap`/`UnkeyedSet` key, it will
/// just be tracked under a hashed [`PropKey::Symbol`].
pub trait AsPropKey {
    /// Project `self` into the key space the dependency registry tracks.
    fn as_prop_key(&self) -> PropKey;
}

impl AsPropKey for str {
    fn as_prop_key(&self) -> PropKey {
        PropKey::Named(self.into())
    }
}

impl AsPropKey for String {
    fn as_prop_key(&self) -> PropKey {
        PropKey::Named(self.as_str().into())
    }
}

impl AsPropKey for Box<str> {
    fn as_prop_key(&self) -> PropKey {
        PropKey::Named(self.clone())
    }
}

macro_rules! index_like_prop_key {
    ($($t:ty),*) => {
        $(impl AsPropKey for $t {
            fn as_prop_key(&self) -> PropKey {
                PropKey::Index(*self as usize)
            }
        })*
    };
}
index_like_prop_key!(usize, u8, u16, u32, u64, i8, i16, i32, i64);

impl<T: std::hash::Hash> AsPropKey for std::rc::Rc<T> {
    fn as_prop_key(&self) -> PropKey {
        PropKey::symbol(self.as_ref())
    }
}

/// A mutation description (§3). Carried by [`crate::registry::emit`] into
/// the scheduler's trigger bookkeeping and, when introspection is enabled,
/// into the debug collaborator.
#[derive(Debug, Clone)]
pub enum Evolution {
    /// An existing key's value changed.
    Set { prop: PropKey },
    /// A new key appeared.
    Add { prop: PropKey },
    /// A key was removed.
    Del { prop: PropKey },
    /// A memoization node (or other derived value) was invalidated.
    Invalidate { prop: PropKey },
    /// A bulk collection mutation (sort, splice, clear, ...). Per-index
    /// evolutions for the exact affected range accompany this when cheaply
    /// determinable (§4.1); this variant always also fires so that an
    /// effect watching the whole collection (via `AllProps`/`KeysOf`) still
    /// re-runs even when no individual index changed.
    Bunch { method: &'static str },
}

/// One recorded trigger: the write that caused a particular effect to be
/// (re-)enqueued.
#[derive(Debug, Clone)]
pub struct Trigger {
    /// The object that changed.
    pub object: ObjectId,
    /// The specific subscribed key that matched (one of the affected keys
    /// computed from the evolution — `AllProps`/`KeysOf` included).
    pub prop: PropKey,
    /// What happened to it.
    pub evolution: Evolution,
    /// Optional captured stack, present only under introspection.
    pub stack: Option<std::rc::Rc<str>>,
}

/// Why an effect's cleanup is running, or why it is about to re-run.
#[derive(Debug, Clone)]
pub enum CleanupReason {
    /// One or more of the effect's tracked properties changed.
    PropChange {
        /// The writes that caused this re-run.
        triggers: Vec<Trigger>,
    },
    /// `stop()` was called explicitly (or the root stop-handle was dropped).
    Stopped,
    /// A finalizer fired. Reserved for host integrations that layer an
    /// async-context/finalization mechanism atop the core (§4.7); the core
    /// itself never produces this reason since Rust's `Drop` already gives
    /// deterministic disposal (see DESIGN.md).
    Gc,
    /// A parent's disposal cascaded down to this effect.
    Lineage {
        /// The parent's own cleanup reason.
        parent_reason: Box<CleanupReason>,
    },
    /// An uncaught error forced disposal.
    Error {
        /// A rendering of the error (kept as a string so `CleanupReason`
        /// does not need to be generic over the error type).
        err: String,
    },
}
