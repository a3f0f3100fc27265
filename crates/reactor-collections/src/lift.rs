//! `lift` (§4.6): turn a plain producer closure into a reactive collection
//! kept in sync by diffing its output against the previous output and
//! applying only the difference, instead of replacing the whole thing on
//! every run.

use std::hash::Hash;

use indexmap::IndexSet;
use reactor_core::{effect, untracked, AsPropKey, EffectOptions, KeyedMap, Sequence, StopHandle};

/// Above this edit distance, [`lift_sequence`] gives up on a precise diff
/// and replaces the whole sequence in one `splice` — the "bail-out to a
/// single replacement patch" §4.6 calls for. Chosen generously: a
/// completely reshuffled 500-element list is still worth diffing
/// precisely; only a genuinely pathological edit distance falls back.
const MYERS_BAILOUT: usize = 1_000;

/// `lift` over a sequence-shaped producer (§4.6): the producer's return
/// type must stay a sequence across every run (an invariant the caller
/// enforces by construction — the producer's signature is `Vec<T>` on
/// every call, there is no way to return a record instead).
pub fn lift_sequence<T>(producer: impl Fn() -> Vec<T> + 'static) -> (Sequence<T>, StopHandle)
where
    T: Clone + PartialEq + 'static,
{
    let output: Sequence<T> = Sequence::new();
    let output_for_effect = output.clone();
    let mut previous: Vec<T> = Vec::new();

    let stop = effect(
        move |_access| {
            let next = producer();
            let ops = myers_diff(&previous, &next, MYERS_BAILOUT);
            untracked(|| apply_sequence_diff(&output_for_effect, &previous, &ops, &next));
            previous = next;
            Ok(None)
        },
        EffectOptions::default(),
    );

    (output, stop)
}

/// One step of a Myers edit script, in terms of the *old* sequence's
/// indices.
enum EditOp {
    /// Copy the old element at this index forward unchanged.
    Keep,
    /// Delete the old element at this index.
    Delete,
    /// Insert a new element (by its index into `new`) before continuing.
    Insert(usize),
}

/// Classic Myers O(ND) shortest-edit-script diff, bailing out to a single
/// "replace everything" script once the edit distance exceeds `cap`.
fn myers_diff<T: PartialEq>(old: &[T], new: &[T], cap: usize) -> Vec<EditOp> {
    let n = old.len();
    let m = new.len();
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }
    let max_d = max.min(cap);

    let offset = max_d as isize;
    let mut v = vec![0isize; 2 * max_d + 1];
    let mut trace: Vec<Vec<isize>> = Vec::with_capacity(max_d + 1);
    let mut found_at: Option<usize> = None;

    for d in 0..=max_d {
        trace.push(v.clone());
        let d_i = d as isize;
        let mut k = -d_i;
        while k <= d_i {
            let idx = (k + offset) as usize;
            let take_down = k == -d_i || (k != d_i && v[idx - 1] < v[idx + 1]);
            let mut x = if take_down { v[idx + 1] } else { v[idx - 1] + 1 };
            let mut y = x - k;
            while (x as usize) < n && (y as usize) < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x as usize >= n && y as usize >= m {
                found_at = Some(d);
            }
            k += 2;
        }
        if found_at.is_some() {
            break;
        }
    }

    match found_at {
        Some(_) => backtrack(&trace, n, m, offset),
        None => {
            // Edit distance exceeds `cap`: bail to a single replace patch.
            let mut ops = vec![EditOp::Delete; n];
            ops.extend((0..m).map(EditOp::Insert));
            ops
        }
    }
}

fn backtrack(trace: &[Vec<isize>], n: usize, m: usize, offset: isize) -> Vec<EditOp> {
    let mut x = n as isize;
    let mut y = m as isize;
    let mut ops_rev: Vec<EditOp> = Vec::new();

    for d in (0..trace.len()).rev() {
        let v = &trace[d];
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -(d as isize) || (k != d as isize && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_idx = (prev_k + offset) as usize;
        let prev_x = v.get(prev_idx).copied().unwrap_or(0);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops_rev.push(EditOp::Keep);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops_rev.push(EditOp::Insert((prev_y) as usize));
                y -= 1;
            } else {
                ops_rev.push(EditOp::Delete);
                x -= 1;
            }
        }
    }
    ops_rev.reverse();
    ops_rev
}

/// Apply a Myers edit script to the live output sequence, issuing only the
/// `splice` calls the script actually requires.
fn apply_sequence_diff<T: Clone>(output: &Sequence<T>, _old: &[T], ops: &[EditOp], new: &[T]) {
    let mut cursor = 0usize;
    let mut i = 0usize;
    while i < ops.len() {
        match &ops[i] {
            EditOp::Keep => {
                cursor += 1;
                i += 1;
            }
            EditOp::Delete | EditOp::Insert(_) => {
                let mut deletes = 0usize;
                let mut inserts: Vec<T> = Vec::new();
                while i < ops.len() {
                    match &ops[i] {
                        EditOp::Delete => {
                            deletes += 1;
                            i += 1;
                        }
                        EditOp::Insert(new_idx) => {
                            inserts.push(new[*new_idx].clone());
                            i += 1;
                        }
                        EditOp::Keep => break,
                    }
                }
                output.splice(cursor, deletes, inserts.clone());
                cursor += inserts.len();
            }
        }
    }
}

/// `lift` over a keyed producer (§4.6 record variant, resolved in
/// DESIGN.md §9 to produce a plain keyed collection of values): diffs the
/// producer's `(key, value)` output against the previous run using the
/// same add/remove/reuse key classification a keyed-child-list diff would
/// use, generalized from "child slots" to "entries of a `KeyedMap`".
pub fn lift_keyed<K, V>(producer: impl Fn() -> Vec<(K, V)> + 'static) -> (KeyedMap<K, V>, StopHandle)
where
    K: Hash + Eq + Clone + AsPropKey + 'static,
    V: Clone + PartialEq + 'static,
{
    let output: KeyedMap<K, V> = KeyedMap::new();
    let output_for_effect = output.clone();
    let mut previous_keys: IndexSet<K> = IndexSet::new();

    let stop = effect(
        move |_access| {
            let next = producer();
            let next_keys: IndexSet<K> = next.iter().map(|(k, _)| k.clone()).collect();

            untracked(|| {
                for key in previous_keys.iter() {
                    if !next_keys.contains(key) {
                        output_for_effect.remove(key);
                    }
                }
                for (key, value) in &next {
                    match output_for_effect.get(key) {
                        Some(existing) if &existing == value => {}
                        _ => output_for_effect.set(key.clone(), value.clone()),
                    }
                }
            });
            previous_keys = next_keys;
            Ok(None)
        },
        EffectOptions::default(),
    );

    (output, stop)
}
