//! Pointer events and the per-target Pointer Registry.
//!
//! The registry maintains, for every target element, a FIFO list of
//! live pointer IDs and two maps from pointer ID to its initial-down
//! event and its most recent event. It is updated only by the event
//! [`crate::router`]; every other component consults it read-only.

use std::collections::HashMap;
use std::time::Instant;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::ids::{PointerId, TargetId};

/// The kind of device a pointer event originated from, plus the two
/// pseudo-kinds used by pointer-type expressions: `hover` (a pointer
/// that is tracked but not in contact) and `any` (matches anything,
/// expression-only — never appears on a live [`PointerEventData`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerKind {
    /// A stylus/pen contact.
    Pen,
    /// A touch contact.
    Touch,
    /// A mouse button contact.
    Mouse,
    /// A pointer tracked while hovering, not in contact.
    Hover,
    /// Expression-only wildcard; matches any concrete kind.
    Any,
}

impl PointerKind {
    /// Parses a case-insensitive kind name used in pointer-type
    /// expressions. Returns `None` for unrecognized names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pen" => Some(Self::Pen),
            "touch" => Some(Self::Touch),
            "mouse" => Some(Self::Mouse),
            "hover" => Some(Self::Hover),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// Whether a live pointer of kind `live` satisfies an expression
    /// slot of kind `self`.
    #[must_use]
    pub fn matches(self, live: PointerKind) -> bool {
        match self {
            PointerKind::Any => true,
            slot => slot == live,
        }
    }
}

bitflags! {
    /// Which pointer buttons were held during an event, matching the
    /// W3C `PointerEvent.buttons` bitmask convention.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PointerButtons: u8 {
        /// Primary (usually left) button or touch/pen contact.
        const PRIMARY = 0b0000_0001;
        /// Secondary (usually right) button.
        const SECONDARY = 0b0000_0010;
        /// Auxiliary (usually middle/wheel) button.
        const AUXILIARY = 0b0000_0100;
        /// Browser "back" button.
        const BACK = 0b0000_1000;
        /// Browser "forward" button.
        const FORWARD = 0b0001_0000;
        /// Pen eraser end.
        const ERASER = 0b0010_0000;
    }
}

/// A single raw pointer event as observed by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEventData {
    /// The pointer this event belongs to.
    pub pointer_id: PointerId,
    /// The target element the event was dispatched to.
    pub target: TargetId,
    /// Device kind. Never [`PointerKind::Any`] on a live event.
    pub kind: PointerKind,
    /// Position in the target's local (SVG) coordinate space.
    pub position: crate::geometry::Point,
    /// Normalized pressure (`0.0`–`1.0`), present for pen contacts.
    pub pressure: Option<f64>,
    /// Buttons held at the time of this event.
    pub buttons: PointerButtons,
    /// When this event was observed.
    pub time: Instant,
}

impl PointerEventData {
    /// Convenience constructor for tests and simple hosts; `pressure`
    /// and `buttons` default to "no pressure reported" / "primary only".
    #[must_use]
    pub fn new(
        pointer_id: PointerId,
        target: TargetId,
        kind: PointerKind,
        position: crate::geometry::Point,
        time: Instant,
    ) -> Self {
        Self {
            pointer_id,
            target,
            kind,
            position,
            pressure: None,
            buttons: PointerButtons::PRIMARY,
            time,
        }
    }
}

#[derive(Debug, Clone)]
struct PointerState {
    initial: PointerEventData,
    latest: Option<PointerEventData>,
}

/// Per-target table of currently-down pointers.
///
/// Maintains FIFO arrival order (used by the recognizer to prefer
/// earliest-arrived pointers when filling permutation slots) alongside
/// the initial-down and most-recent-move event for each live pointer.
#[derive(Debug, Default)]
pub struct PointerRegistry {
    targets: HashMap<TargetId, TargetPointers>,
}

#[derive(Debug, Default)]
struct TargetPointers {
    order: SmallVec<[PointerId; 4]>,
    state: HashMap<PointerId, PointerState>,
}

impl PointerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pointer-down, making the pointer live on its target.
    pub fn on_down(&mut self, event: PointerEventData) {
        let entry = self.targets.entry(event.target).or_default();
        if !entry.state.contains_key(&event.pointer_id) {
            entry.order.push(event.pointer_id);
        }
        entry.state.insert(
            event.pointer_id,
            PointerState {
                initial: event,
                latest: None,
            },
        );
    }

    /// Records a pointer-move for an already-live pointer. No-op if the
    /// pointer is not currently live on `event.target`.
    pub fn on_move(&mut self, event: PointerEventData) {
        if let Some(target) = self.targets.get_mut(&event.target) {
            if let Some(state) = target.state.get_mut(&event.pointer_id) {
                state.latest = Some(event);
            }
        }
    }

    /// Removes a pointer on up/cancel. No-op if not currently live.
    pub fn on_up_or_cancel(&mut self, target: TargetId, pointer: PointerId) {
        if let Some(t) = self.targets.get_mut(&target) {
            t.state.remove(&pointer);
            t.order.retain(|id| *id != pointer);
        }
    }

    /// Lists live pointers on `target` in arrival (FIFO) order.
    #[must_use]
    pub fn live_pointers(&self, target: TargetId) -> SmallVec<[PointerId; 4]> {
        self.targets
            .get(&target)
            .map(|t| t.order.clone())
            .unwrap_or_default()
    }

    /// The initial-down event of `pointer` on `target`, if live.
    #[must_use]
    pub fn initial_event(&self, target: TargetId, pointer: PointerId) -> Option<PointerEventData> {
        self.targets
            .get(&target)
            .and_then(|t| t.state.get(&pointer))
            .map(|s| s.initial)
    }

    /// The most recent event of `pointer` on `target` — its latest move
    /// if one occurred, otherwise its initial-down event.
    #[must_use]
    pub fn current_event(&self, target: TargetId, pointer: PointerId) -> Option<PointerEventData> {
        self.targets.get(&target).and_then(|t| t.state.get(&pointer)).map(|s| s.latest.unwrap_or(s.initial))
    }

    /// Whether `pointer` is currently live on `target`.
    #[must_use]
    pub fn contains(&self, target: TargetId, pointer: PointerId) -> bool {
        self.targets
            .get(&target)
            .is_some_and(|t| t.state.contains_key(&pointer))
    }
}
