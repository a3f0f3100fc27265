//! Headless test harness for `reactor-core` reactive graphs.
//!
//! No rendering, no I/O: this crate exists to make tests that assert "this
//! effect ran exactly N times, for this reason" easy to write and to keep
//! every test isolated from whatever ran before it on the same thread.
//!
//! ```
//! use reactor_core::{wrap, Sequence};
//! use reactor_testing::{recording_effect_simple, ReactorHarness, RunRecorder};
//!
//! let _harness = ReactorHarness::create();
//! let count: Sequence<i64> = wrap(vec![0]);
//! let recorder = RunRecorder::new();
//! let count_for_effect = count.clone();
//! let _stop = recording_effect_simple(&recorder, move || {
//!     let _ = count_for_effect.get(0);
//! });
//! assert_eq!(recorder.count(), 1);
//! count.set(0, 1);
//! assert_eq!(recorder.count(), 2);
//! ```

mod harness;
mod recorder;

#[macro_use]
mod macros;

pub use harness::ReactorHarness;
pub use recorder::{recording_effect, recording_effect_simple, RecordedRun, RunRecorder};
