//! Gesture recognition: matching live pointers on a target against a
//! set of candidate [`Gesture`] specs (spec §4.3).
//!
//! Stateless by design — every piece of mutable state it consults or
//! updates (bound pointers, timers, repeat counters) lives on the
//! [`Gesture`] handles themselves or in the [`PointerRegistry`], the
//! same separation the teacher keeps between a recognizer's pure
//! geometry helpers and the `Arc<Mutex<...>>` state its
//! `GestureRecognizer` impl mutates.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::expression::{Ordinal, Permutation};
use crate::gesture::Gesture;
use crate::ids::{PointerId, TargetId};
use crate::pointer::{PointerKind, PointerRegistry};

/// Outcome of running recognition for a target's current live pointers.
#[derive(Debug)]
pub enum RecognitionOutcome {
    /// A gesture's permutation fully matched; it should transition to
    /// `Active`.
    Activate {
        /// The winning gesture.
        gesture: Gesture,
        /// Index into the gesture's compiled permutation list.
        permutation_index: usize,
        /// Resolved ordinal-to-pointer bindings, in slot order.
        bindings: Vec<(Ordinal, PointerId)>,
    },
    /// No gesture fully matched, but one or more remain plausible if
    /// more pointers arrive.
    Recognizing(Vec<Gesture>),
    /// No candidate can ever match the current live pointer set.
    NoMatch,
}

fn live_kinded(
    registry: &PointerRegistry,
    target: TargetId,
) -> SmallVec<[(PointerId, PointerKind); 4]> {
    registry
        .live_pointers(target)
        .into_iter()
        .filter_map(|id| registry.initial_event(target, id).map(|e| (id, e.kind)))
        .collect()
}

fn kind_counts(kinds: impl Iterator<Item = PointerKind>) -> HashMap<PointerKind, u32> {
    let mut counts = HashMap::new();
    for kind in kinds {
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}

/// Attempts a full match of `live` against `permutation`. On success,
/// returns bindings in slot order; concrete-kind slots are filled
/// before `any` slots, each consuming the earliest-arrived remaining
/// pointer of a compatible kind (spec's FIFO-binding convention).
fn try_full_match(
    live: &[(PointerId, PointerKind)],
    permutation: &Permutation,
) -> Option<Vec<(Ordinal, PointerId)>> {
    if live.len() != permutation.slots.len() {
        return None;
    }

    let mut remaining: Vec<(PointerId, PointerKind)> = live.to_vec();
    let mut bound: Vec<(usize, Ordinal, PointerId)> = Vec::with_capacity(live.len());

    for (slot_index, slot) in permutation.slots.iter().enumerate() {
        if slot.kind == PointerKind::Any {
            continue;
        }
        let pos = remaining.iter().position(|(_, k)| *k == slot.kind)?;
        let (pid, _) = remaining.remove(pos);
        bound.push((slot_index, *slot, pid));
    }

    for (slot_index, slot) in permutation.slots.iter().enumerate() {
        if slot.kind != PointerKind::Any {
            continue;
        }
        if remaining.is_empty() {
            return None;
        }
        let (pid, _) = remaining.remove(0);
        bound.push((slot_index, *slot, pid));
    }

    if !remaining.is_empty() {
        return None;
    }

    bound.sort_by_key(|(index, _, _)| *index);
    Some(bound.into_iter().map(|(_, ord, pid)| (ord, pid)).collect())
}

/// Whether `live` could still grow into a full match of `permutation`
/// (i.e. every live pointer's kind is accounted for by either a
/// matching concrete slot or spare `any` capacity), used to decide
/// whether a gesture stays in `Recognizing`.
fn could_still_match(live: &[(PointerId, PointerKind)], permutation: &Permutation) -> bool {
    if live.len() >= permutation.slots.len() {
        return false;
    }

    let mut required: HashMap<PointerKind, u32> = HashMap::new();
    let mut any_capacity = 0u32;
    for slot in &permutation.slots {
        if slot.kind == PointerKind::Any {
            any_capacity += 1;
        } else {
            *required.entry(slot.kind).or_insert(0) += 1;
        }
    }

    let live_counts = kind_counts(live.iter().map(|(_, k)| *k));
    let mut spare_any = any_capacity;
    for (kind, count) in live_counts {
        let cap = required.get(&kind).copied().unwrap_or(0);
        if count <= cap {
            continue;
        }
        let overflow = count - cap;
        if overflow > spare_any {
            return false;
        }
        spare_any -= overflow;
    }
    true
}

/// A candidate gesture for recognition on a target: already filtered
/// by the caller (host) for `target` match, `enabled`, group
/// enablement and the conditional predicate.
pub struct Candidate<'a> {
    /// The gesture under consideration.
    pub gesture: &'a Gesture,
}

/// The earliest down-time among `live`'s pointers on `target`: the
/// baseline a permutation's `recognition_timeout` is measured from
/// (spec §4.2).
fn earliest_live_time(
    registry: &PointerRegistry,
    target: TargetId,
    live: &[(PointerId, PointerKind)],
) -> Option<Instant> {
    live.iter()
        .filter_map(|(id, _)| registry.initial_event(target, *id))
        .map(|e| e.time)
        .min()
}

struct FullMatch {
    gesture: Gesture,
    index: usize,
    bindings: Vec<(Ordinal, PointerId)>,
    slot_count: usize,
}

/// Runs recognition for `target`'s current live pointers against
/// `candidates`. Exclusive gestures are preferred over non-exclusive
/// ones; ties break on earliest `add_order` (spec §4.3's "earliest
/// creation order of the gesture (add order)").
///
/// Whether every live `hover`-kind pointer on `target` has dwelled in
/// place for at least `hover_dwell` (spec's hover dwell timer): a
/// `hover` contact only counts toward a full match once it has been
/// present this long, so a hover permutation whose pointer count is
/// otherwise already satisfied stays `Recognizing` until it elapses.
fn hover_dwelled(
    registry: &PointerRegistry,
    target: TargetId,
    live: &[(PointerId, PointerKind)],
    now: Instant,
    hover_dwell: Duration,
) -> bool {
    live.iter().all(|(id, kind)| {
        *kind != PointerKind::Hover
            || registry
                .initial_event(target, *id)
                .is_some_and(|e| now.duration_since(e.time) >= hover_dwell)
    })
}

/// `allow_hold` gates the arena-style hold: when `true` (the
/// pointer-down invocation point), a full match is held back — kept
/// `Recognizing` instead of activated — while some candidate's larger,
/// still-[`could_still_match`]-plausible permutation on the same live
/// set remains within its own `recognition_timeout` window, the way
/// the teacher's `GestureArenaMember` holds a smaller recognizer's win
/// open for a competing member. Re-checks triggered by a pointer
/// lifting (`check_for_gestures_on_end`) or the repeat-gap timer pass
/// `false`: pointers are only ever removed on those paths, so there is
/// no larger permutation left to grow into and a ready match should
/// commit immediately.
///
/// `hover_dwell` is the host's configured dwell duration (spec's
/// "global hover dwell" setting); a permutation whose pointer count is
/// otherwise satisfied but includes a `hover` contact that has not yet
/// dwelled this long stays `Recognizing`.
#[must_use]
pub fn recognize(
    registry: &PointerRegistry,
    target: TargetId,
    candidates: &[Candidate<'_>],
    now: Instant,
    allow_hold: bool,
    hover_dwell: Duration,
) -> RecognitionOutcome {
    let live = live_kinded(registry, target);
    if live.is_empty() {
        return RecognitionOutcome::NoMatch;
    }
    let earliest = earliest_live_time(registry, target, live.as_slice());
    let dwelled = hover_dwelled(registry, target, live.as_slice(), now, hover_dwell);

    let mut full_matches: Vec<FullMatch> = Vec::new();
    let mut recognizing: Vec<Gesture> = Vec::new();
    let mut largest_pending: usize = 0;

    for candidate in candidates {
        let gesture = candidate.gesture;
        let Some(compiled) = gesture.compiled_expression() else {
            continue;
        };

        let mut matched: Option<(usize, Vec<(Ordinal, PointerId)>, usize)> = None;
        let mut plausible = false;
        for (index, permutation) in compiled.permutations.iter().enumerate() {
            let count_matches = live.len() == permutation.slots.len();
            if matched.is_none() && dwelled {
                if let Some(bindings) = try_full_match(live.as_slice(), permutation) {
                    matched = Some((index, bindings, permutation.slots.len()));
                }
            }
            if could_still_match(live.as_slice(), permutation) || (count_matches && !dwelled) {
                plausible = true;
                let within_window = earliest
                    .is_some_and(|t| now.duration_since(t) < gesture.recognition_timeout());
                if allow_hold && within_window {
                    largest_pending = largest_pending.max(permutation.slots.len());
                }
            }
        }

        match matched {
            Some((index, bindings, slot_count)) => {
                full_matches.push(FullMatch { gesture: gesture.clone(), index, bindings, slot_count });
            }
            None if plausible => recognizing.push(gesture.clone()),
            None => {}
        }
    }

    let mut ready: Vec<FullMatch> = Vec::new();
    for full_match in full_matches {
        if full_match.slot_count < largest_pending {
            recognizing.push(full_match.gesture);
        } else {
            ready.push(full_match);
        }
    }

    if ready.is_empty() {
        return if recognizing.is_empty() {
            RecognitionOutcome::NoMatch
        } else {
            RecognitionOutcome::Recognizing(recognizing)
        };
    }

    ready.sort_by_key(|full_match| {
        (
            !full_match.gesture.is_exclusive(),
            full_match.gesture.add_order().unwrap_or(u64::MAX),
        )
    });

    let winner = ready.into_iter().next().unwrap();
    RecognitionOutcome::Activate {
        gesture: winner.gesture,
        permutation_index: winner.index,
        bindings: winner.bindings,
    }
}

/// Applies spec §4.3's repeat bookkeeping when `gesture` ends: if a
/// prior occurrence ended within `repeat_gap_timeout`, the occurrence
/// counter advances; otherwise it resets to `1` for this occurrence.
/// Returns the occurrence count after applying this end.
pub fn record_repeat_occurrence(gesture: &Gesture, now: Instant) -> u32 {
    if gesture.repeat_count() <= 1 {
        return 0;
    }
    let elapsed_ok = gesture
        .take_repeat_timer()
        .map(|t| !t.is_cancelled())
        .unwrap_or(true);
    let _ = now;
    if elapsed_ok {
        gesture.increment_repeat_occurrence()
    } else {
        gesture.reset_repeat_occurrence();
        gesture.increment_repeat_occurrence()
    }
}
