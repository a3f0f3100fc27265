//! Run recording: track how many times, and for what reason, an effect's
//! body actually executed — the thing almost every reactor-core test
//! wants to assert on.

use std::cell::RefCell;
use std::rc::Rc;

use reactor_core::{effect, EffectAccess, EffectOptions, EffectOutcome, Reaction, StopHandle};

/// One recorded run of a [`RunRecorder`]-wrapped effect.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    /// `None` on the effect's first run, `Some(reason)` on every re-run.
    pub reason: Option<reactor_core::CleanupReason>,
}

/// Counts and records every run of one effect, independent of what the
/// effect's own body returns.
#[derive(Default)]
pub struct RunRecorder {
    runs: RefCell<Vec<RecordedRun>>,
}

impl RunRecorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// How many times the wrapped effect has run so far, including the
    /// initial run.
    pub fn count(&self) -> usize {
        self.runs.borrow().len()
    }

    /// All recorded runs, oldest first.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.borrow().clone()
    }

    /// Forget every recorded run without touching the underlying effect.
    pub fn clear(&self) {
        self.runs.borrow_mut().clear();
    }

    fn record(&self, access: &EffectAccess) {
        let reason = match access.reaction() {
            Reaction::Initial => None,
            Reaction::Reason(r) => Some(r.clone()),
        };
        self.runs.borrow_mut().push(RecordedRun { reason });
    }
}

/// Wrap `body` in an effect that records every run on `recorder` before
/// calling through. Use this instead of hand-counting in a `Cell` at every
/// call site.
pub fn recording_effect(
    recorder: &Rc<RunRecorder>,
    body: impl Fn(&EffectAccess) -> EffectOutcome + 'static,
    options: EffectOptions,
) -> StopHandle {
    let recorder = recorder.clone();
    effect(
        move |access| {
            recorder.record(access);
            body(access)
        },
        options,
    )
}

/// The common case: an infallible effect body with no cleanup, wrapped for
/// run-counting with default options.
pub fn recording_effect_simple(recorder: &Rc<RunRecorder>, mut body: impl FnMut() + 'static) -> StopHandle {
    recording_effect(
        recorder,
        move |_access| {
            body();
            Ok(None)
        },
        EffectOptions::default(),
    )
}
