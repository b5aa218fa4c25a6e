//! Event routing: pointer capture and per-target event buffering.
//!
//! Two responsibilities kept deliberately separate (spec §4.5):
//!
//! - [`EventRouter::capture`]/`release` maintain the capture table,
//!   which must always equal the union of bound pointer IDs of active
//!   `capturesPointers` gestures (spec §5) — a captured pointer's
//!   events go straight to its capturing target, bypassing ancestor
//!   replay.
//! - A bounded per-target ring buffer decouples event ingestion from
//!   recognition so a host can enqueue faster than it drains, backed
//!   by `crossbeam`'s lock-free `ArrayQueue` the way the teacher uses
//!   `crossbeam` channels to decouple producers from its event loop.

use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;

use crate::error::MilError;
use crate::ids::{PointerId, TargetId};
use crate::pointer::PointerEventData;

const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Routes pointer events to captured targets or an ancestor chain, and
/// buffers per-target events in bounded ring buffers.
#[derive(Debug)]
pub struct EventRouter {
    queues: DashMap<TargetId, Arc<ArrayQueue<PointerEventData>>>,
    captures: DashMap<PointerId, TargetId>,
    queue_capacity: usize,
}

impl EventRouter {
    /// Creates a router with the default per-target queue capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a router whose per-target ring buffers hold at most
    /// `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: DashMap::new(),
            captures: DashMap::new(),
            queue_capacity: capacity.max(1),
        }
    }

    fn queue_for(&self, target: TargetId) -> Arc<ArrayQueue<PointerEventData>> {
        self.queues
            .entry(target)
            .or_insert_with(|| Arc::new(ArrayQueue::new(self.queue_capacity)))
            .clone()
    }

    /// Buffers `event` for later draining by `target`. Fails with
    /// [`MilError::TransientMiss`] (non-fatal) if the target's queue is
    /// full; the event is dropped.
    pub fn enqueue(&self, target: TargetId, event: PointerEventData) -> Result<(), MilError> {
        self.queue_for(target).push(event).map_err(|_| {
            MilError::TransientMiss(format!("event queue full for target {target}"))
        })
    }

    /// Drains every currently-buffered event for `target`, oldest
    /// first.
    pub fn drain(&self, target: TargetId) -> Vec<PointerEventData> {
        let queue = self.queue_for(target);
        let mut events = Vec::with_capacity(queue.len());
        while let Some(event) = queue.pop() {
            events.push(event);
        }
        events
    }

    /// Marks `pointer` as captured by `target`: future events for this
    /// pointer route directly to `target`.
    pub fn capture(&self, pointer: PointerId, target: TargetId) {
        self.captures.insert(pointer, target);
    }

    /// Releases `pointer`'s capture, if any.
    pub fn release(&self, pointer: PointerId) {
        self.captures.remove(&pointer);
    }

    /// Releases every pointer currently captured by `target` (called
    /// when a `capturesPointers` gesture on `target` ends or cancels).
    pub fn release_all_for_target(&self, target: TargetId) {
        self.captures.retain(|_, t| *t != target);
    }

    /// The target currently capturing `pointer`, if any.
    #[must_use]
    pub fn captured_target(&self, pointer: PointerId) -> Option<TargetId> {
        self.captures.get(&pointer).map(|r| *r)
    }

    /// All pointers currently captured by `target`.
    #[must_use]
    pub fn captured_pointers_for(&self, target: TargetId) -> Vec<PointerId> {
        self.captures
            .iter()
            .filter(|entry| *entry.value() == target)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Routes `event`: if its pointer is captured, dispatches straight
    /// to the capturing target via `try_target`; otherwise walks
    /// `chain` (self first, then ancestors) until `try_target` reports
    /// the event was handled. Returns whether any target handled it.
    pub fn route<F>(&self, event: &PointerEventData, chain: &[TargetId], mut try_target: F) -> bool
    where
        F: FnMut(TargetId, &PointerEventData) -> bool,
    {
        if let Some(captured_target) = self.captured_target(event.pointer_id) {
            return try_target(captured_target, event);
        }
        for &target in chain {
            if try_target(target, event) {
                return true;
            }
        }
        false
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::pointer::PointerKind;
    use std::time::Instant;

    fn ev(id: i32, target: u64) -> PointerEventData {
        PointerEventData::new(
            PointerId::new(id),
            TargetId::new(target),
            PointerKind::Touch,
            Point::ZERO,
            Instant::now(),
        )
    }

    #[test]
    fn test_enqueue_and_drain_fifo() {
        let router = EventRouter::new();
        router.enqueue(TargetId::new(1), ev(1, 1)).unwrap();
        router.enqueue(TargetId::new(1), ev(2, 1)).unwrap();
        let drained = router.drain(TargetId::new(1));
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].pointer_id, PointerId::new(1));
        assert_eq!(drained[1].pointer_id, PointerId::new(2));
    }

    #[test]
    fn test_queue_full_is_transient_miss() {
        let router = EventRouter::with_capacity(1);
        router.enqueue(TargetId::new(1), ev(1, 1)).unwrap();
        let err = router.enqueue(TargetId::new(1), ev(2, 1)).unwrap_err();
        assert!(matches!(err, MilError::TransientMiss(_)));
        assert!(err.is_non_fatal());
    }

    #[test]
    fn test_capture_routes_directly() {
        let router = EventRouter::new();
        router.capture(PointerId::new(1), TargetId::new(5));
        let mut tried = Vec::new();
        let handled = router.route(&ev(1, 1), &[TargetId::new(1), TargetId::new(2)], |t, _| {
            tried.push(t);
            true
        });
        assert!(handled);
        assert_eq!(tried, vec![TargetId::new(5)]);
    }

    #[test]
    fn test_uncaptured_walks_chain_until_handled() {
        let router = EventRouter::new();
        let mut tried = Vec::new();
        let handled = router.route(
            &ev(1, 1),
            &[TargetId::new(1), TargetId::new(2), TargetId::new(3)],
            |t, _| {
                tried.push(t);
                t == TargetId::new(2)
            },
        );
        assert!(handled);
        assert_eq!(tried, vec![TargetId::new(1), TargetId::new(2)]);
    }

    #[test]
    fn test_no_target_handles_returns_false() {
        let router = EventRouter::new();
        let handled = router.route(&ev(1, 1), &[TargetId::new(1)], |_, _| false);
        assert!(!handled);
    }

    #[test]
    fn test_release_all_for_target() {
        let router = EventRouter::new();
        router.capture(PointerId::new(1), TargetId::new(5));
        router.capture(PointerId::new(2), TargetId::new(5));
        router.capture(PointerId::new(3), TargetId::new(9));
        router.release_all_for_target(TargetId::new(5));
        assert!(router.captured_target(PointerId::new(1)).is_none());
        assert!(router.captured_target(PointerId::new(2)).is_none());
        assert_eq!(router.captured_target(PointerId::new(3)), Some(TargetId::new(9)));
    }

    #[test]
    fn test_captured_pointers_for_target() {
        let router = EventRouter::new();
        router.capture(PointerId::new(1), TargetId::new(5));
        router.capture(PointerId::new(2), TargetId::new(5));
        let mut pointers = router.captured_pointers_for(TargetId::new(5));
        pointers.sort_by_key(|p| p.get());
        assert_eq!(pointers, vec![PointerId::new(1), PointerId::new(2)]);
    }
}
