//! `EffectAccess::reaction()` (§4.4 point 3): the `CleanupReason` a rerun
//! actually sees should reflect the write that caused it, not a stale or
//! empty placeholder.

use reactor_core::{wrap, CleanupReason, Evolution, PropKey, Record, Sequence};
use reactor_testing::{recording_effect_simple, ReactorHarness, RunRecorder};

#[test]
fn first_run_has_no_reason_and_a_rerun_carries_the_triggering_write() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2]);
    let recorder = RunRecorder::new();

    let source_for_effect = source.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = source_for_effect.get(0);
    });

    let runs = recorder.runs();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].reason.is_none(), "the initial run has no CleanupReason");

    source.set(0, 10);
    let runs = recorder.runs();
    assert_eq!(runs.len(), 2);
    let reason = runs[1].reason.clone().expect("a rerun always carries a reason");
    match reason {
        CleanupReason::PropChange { triggers } => {
            assert_eq!(triggers.len(), 1, "exactly the one write that caused this rerun");
            assert_eq!(triggers[0].prop, PropKey::Index(0));
            assert!(matches!(triggers[0].evolution, Evolution::Set { .. }));
        }
        other => panic!("expected PropChange, got {other:?}"),
    }
}

#[test]
fn each_rerun_carries_only_its_own_triggers_not_the_previous_runs() {
    let _harness = ReactorHarness::create();
    let source: Sequence<i64> = wrap(vec![1, 2]);
    let recorder = RunRecorder::new();

    let source_for_effect = source.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = source_for_effect.get(0);
    });

    source.set(0, 10);
    source.set(0, 20);
    let runs = recorder.runs();
    assert_eq!(runs.len(), 3);

    for run in &runs[1..] {
        let CleanupReason::PropChange { triggers } = run.reason.clone().unwrap() else {
            panic!("expected PropChange");
        };
        assert_eq!(triggers.len(), 1, "a rerun's triggers are its own, not accumulated across runs");
    }
}

#[test]
fn a_write_touching_two_subscribed_keys_reports_both_triggers() {
    let _harness = ReactorHarness::create();
    let record: Record<i64> = Record::new();
    record.set("a", 1);
    let recorder = RunRecorder::new();

    let record_for_effect = record.clone();
    let _stop = recording_effect_simple(&recorder, move || {
        let _ = record_for_effect.get("a");
        let _ = record_for_effect.has_own("a");
    });

    record.remove("a");
    let runs = recorder.runs();
    let CleanupReason::PropChange { triggers } = runs[1].reason.clone().unwrap() else {
        panic!("expected PropChange");
    };
    // `remove` fires a `Del` that both the value watcher (`get`) and the
    // structural watcher (`has_own`, via `KeysOf`) are subscribed to.
    assert_eq!(triggers.len(), 2, "both the prop and the KeysOf subscription are reported as distinct triggers");
    assert!(triggers.iter().all(|t| matches!(t.evolution, Evolution::Del { .. })));
}
