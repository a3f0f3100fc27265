//! `reactor-collections`: derived reactive collection primitives
//! (§4.6) built purely on `reactor-core`'s public API — nothing here
//! reaches into the kernel's internals.
//!
//! - [`attend`] / [`attend_with`] — run a per-key effect for every key
//!   currently present in a source, disposing it when the key disappears.
//! - [`scan`] — a running fold over a sequence, reusing prior accumulator
//!   results for a reused prefix.
//! - [`lift_sequence`] / [`lift_keyed`] — turn a plain producer closure into
//!   a diffed reactive sequence / keyed map.
//! - [`project_sequence`] / [`project_record`] / [`project_map`] — eager
//!   per-key projection into a target collection, with per-key effects
//!   owned by the caller rather than by the structure-watching effect.
//! - [`morph`] — lazy, per-index mapping over a sequence.

mod attend;
mod lift;
mod morph;
mod project;
mod scan;

pub use attend::{attend, attend_with, EnumerateKeys};
pub use lift::{lift_keyed, lift_sequence};
pub use morph::{morph, Morphed};
pub use project::{project_map, project_record, project_sequence};
pub use scan::scan;
