//! Observable Wrapper (§4.1): the four concrete reactive aggregate kinds
//! and the dispatch table they back.
//!
//! A host language with reference semantics for every aggregate gets
//! object identity, and therefore the "wrap the same raw value twice,
//! get the same wrapper back" invariant, for free via a proxy/trap
//! mechanism. Rust's ownership model makes that proxy approach a dead
//! end — there is no ambient "any mutable aggregate" to intercept. Instead
//! each kind below *is* the reference-counted handle (an `Rc<RefCell<_>>`
//! underneath `Clone`): wrap once, then share the wrapper the way you
//! would share any `Rc`. See DESIGN.md for the full resolution of this
//! Open Question.

mod keyed_map;
mod record;
mod sequence;
mod unkeyed_set;

pub use keyed_map::KeyedMap;
pub use record::Record;
pub use sequence::Sequence;
pub use unkeyed_set::UnkeyedSet;
