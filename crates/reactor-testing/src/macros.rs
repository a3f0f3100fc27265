//! Assertion macros for run-counting tests.

/// Assert that a [`crate::RunRecorder`] has recorded exactly `n` runs.
///
/// ```
/// use reactor_core::{wrap, Sequence};
/// use reactor_testing::{assert_ran, recording_effect_simple, ReactorHarness, RunRecorder};
///
/// let _harness = ReactorHarness::create();
/// let source: Sequence<i64> = wrap(vec![1]);
/// let recorder = RunRecorder::new();
/// let source_for_effect = source.clone();
/// let _stop = recording_effect_simple(&recorder, move || {
///     let _ = source_for_effect.get(0);
/// });
/// assert_ran!(recorder, 1);
/// source.set(0, 2);
/// assert_ran!(recorder, 2);
/// ```
#[macro_export]
macro_rules! assert_ran {
    ($recorder:expr, $n:expr) => {
        assert_eq!(
            $recorder.count(),
            $n,
            "expected {} recorded run(s), found {}: {:?}",
            $n,
            $recorder.count(),
            $recorder.runs()
        );
    };
}

/// Assert that a [`crate::RunRecorder`] has never run.
#[macro_export]
macro_rules! assert_did_not_run {
    ($recorder:expr) => {
        $crate::assert_ran!($recorder, 0);
    };
}
