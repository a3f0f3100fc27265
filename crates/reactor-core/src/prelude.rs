//! Convenience re-exports for consumers: `use reactor_core::prelude::*;`
//! pulls in the operations most call sites need without naming every
//! module.

pub use crate::{
    atomic, bi_di, effect, is_non_reactive, is_reactive, mark_non_reactive, memoize, memoize_lenient, on_cleanup,
    on_effect_throw, reset, unwrap, untracked, wrap, AsyncMode, CyclePolicy, EffectOptions, KeyedMap, Options,
    ReactorError, Record, Sequence, StopHandle, UnkeyedSet,
};
