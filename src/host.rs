//! [`HostRoot`]: the top-level engine aggregate and the crate's single
//! external surface (spec §6).
//!
//! One `HostRoot` binds to one SVG root element on the host side: it
//! owns the pointer registry, event router, gesture table, ink table
//! and the pluggable geometry/shape collaborators, and is the only
//! type a host embeds directly.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{MilError, MilResult};
use crate::geometry::{DefaultGeometry, GeometryProvider, Point};
use crate::gesture::{Gesture, GestureState, PointerSelector};
use crate::ids::{InkId, PointerId, TargetId};
use crate::ink::{HullKind, Ink};
use crate::pointer::{PointerEventData, PointerRegistry};
use crate::recognizer::{self, Candidate, RecognitionOutcome};
use crate::router::EventRouter;
use crate::settings::{GestureDefaults, Settings};
use crate::shape::{DefaultShapeAnalyzer, RadialSwipeMatch, RadialSwipeRecognizer, ShapeMatch, ShapeRecognizer, ShapeTemplate};
use crate::timer::GestureTimerService;

/// The top-level engine bound to one host SVG root.
pub struct HostRoot {
    settings: Mutex<Settings>,
    gesture_defaults: Mutex<GestureDefaults>,
    gestures: DashMap<String, Gesture>,
    group_enabled: DashMap<String, bool>,
    registry: Mutex<PointerRegistry>,
    router: EventRouter,
    timers: GestureTimerService,
    geometry: Arc<dyn GeometryProvider>,
    shapes: Arc<dyn ShapeRecognizer>,
    swipes: Arc<dyn RadialSwipeRecognizer>,
    inks: DashMap<InkId, Ink>,
    parents: DashMap<TargetId, TargetId>,
}

impl HostRoot {
    /// Initializes a host root with library-default settings, the
    /// bundled [`DefaultGeometry`], and the bundled
    /// [`DefaultShapeAnalyzer`].
    #[must_use]
    pub fn initialize() -> Self {
        let shapes = Arc::new(DefaultShapeAnalyzer);
        Self::with_providers(Arc::new(DefaultGeometry), shapes.clone(), shapes)
    }

    /// Initializes a host root with host-supplied geometry, shape and
    /// radial-swipe providers (spec §6's "referenced only through the
    /// interfaces" seam) — a host may pass the same value for `shapes`
    /// and `swipes` if one type implements both traits.
    #[must_use]
    pub fn with_providers(
        geometry: Arc<dyn GeometryProvider>,
        shapes: Arc<dyn ShapeRecognizer>,
        swipes: Arc<dyn RadialSwipeRecognizer>,
    ) -> Self {
        Self {
            settings: Mutex::new(Settings::defaults()),
            gesture_defaults: Mutex::new(GestureDefaults::new()),
            gestures: DashMap::new(),
            group_enabled: DashMap::new(),
            registry: Mutex::new(PointerRegistry::new()),
            router: EventRouter::new(),
            timers: GestureTimerService::new(),
            geometry,
            shapes,
            swipes,
            inks: DashMap::new(),
            parents: DashMap::new(),
        }
    }

    /// Declares `parent` as `target`'s ancestor for unmatched-event
    /// replay (spec §4.5 step 5). Hosts call this once per SVG nesting
    /// edge they want the engine to know about.
    pub fn set_target_parent(&self, target: TargetId, parent: TargetId) {
        self.parents.insert(target, parent);
    }

    /// Removes `target`'s registered parent, if any.
    pub fn clear_target_parent(&self, target: TargetId) {
        self.parents.remove(&target);
    }

    /// `target` followed by its ancestors, nearest first. Stops at the
    /// first target with no registered parent, or on a cycle.
    fn ancestor_chain(&self, target: TargetId) -> Vec<TargetId> {
        let mut chain = vec![target];
        let mut current = target;
        while let Some(parent) = self.parents.get(&current).map(|p| *p) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Removes every gesture and ink, and releases all captures,
    /// tearing this host root down to its initial state (spec's
    /// `removeHost`).
    pub fn remove_host(&self) {
        for entry in self.gestures.iter() {
            entry.value().cancel("host removed");
        }
        self.gestures.clear();
        self.inks.clear();
        self.parents.clear();
        self.timers.cancel_all();
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> Settings {
        *self.settings.lock()
    }

    /// Replaces the current settings.
    pub fn set_settings(&self, settings: Settings) {
        *self.settings.lock() = settings;
    }

    /// Current process-wide gesture-construction defaults.
    #[must_use]
    pub fn gesture_defaults(&self) -> GestureDefaults {
        self.gesture_defaults.lock().clone()
    }

    /// Replaces the gesture-construction defaults.
    pub fn set_gesture_defaults(&self, defaults: GestureDefaults) {
        *self.gesture_defaults.lock() = defaults;
    }

    /// Creates a new, unregistered gesture pre-populated from the
    /// current [`GestureDefaults`].
    #[must_use]
    pub fn create_gesture(&self, name: impl Into<String>) -> Gesture {
        let defaults = self.gesture_defaults();
        let mut gesture = Gesture::new(name).with_recognition_timeout(defaults.default_recognition_timeout());
        if let Some(target) = defaults.default_target() {
            gesture = gesture.with_target(target);
        }
        if let Some(group) = defaults.default_group() {
            gesture = gesture.with_group(group);
        }
        gesture
    }

    /// Registers `gesture`. If its name collides with an
    /// already-registered gesture, it is uniquified with a numeric
    /// `-N` suffix before insertion (spec §3: "Names must be unique
    /// after `*`-suffix uniquification"). Returns the (possibly
    /// renamed) handle.
    pub fn add_gesture(&self, gesture: Gesture) -> Gesture {
        let mut name = gesture.name().to_string();
        if self.gestures.contains_key(&name) {
            let mut suffix = 2;
            loop {
                let candidate = format!("{name}-{suffix}");
                if !self.gestures.contains_key(&candidate) {
                    name = candidate;
                    break;
                }
                suffix += 1;
            }
        }
        gesture.assign_add_order_if_unset();
        self.gestures.insert(name, gesture.clone());
        gesture
    }

    /// Removes the gesture named `name`, cancelling it first if
    /// active. Returns whether a gesture was found.
    pub fn remove_gesture_by_name(&self, name: &str) -> bool {
        if let Some((_, gesture)) = self.gestures.remove(name) {
            gesture.cancel("removed");
            true
        } else {
            false
        }
    }

    /// Removes every gesture targeting `target`. Returns how many were
    /// removed.
    pub fn remove_gestures_by_target(&self, target: TargetId) -> usize {
        let names: Vec<String> = self
            .gestures
            .iter()
            .filter(|e| e.value().target() == Some(target))
            .map(|e| e.key().clone())
            .collect();
        for name in &names {
            self.remove_gesture_by_name(name);
        }
        names.len()
    }

    /// Looks up a registered gesture by name.
    #[must_use]
    pub fn get_gesture_by_name(&self, name: &str) -> Option<Gesture> {
        self.gestures.get(name).map(|e| e.value().clone())
    }

    /// Number of currently-`Active` gestures.
    #[must_use]
    pub fn get_active_gesture_count(&self) -> usize {
        self.gestures
            .iter()
            .filter(|e| e.value().state() == GestureState::Active)
            .count()
    }

    /// Enables or disables every gesture in `group`. Groups are enabled
    /// by default.
    pub fn enable_gesture_group(&self, group: &str, enabled: bool) {
        self.group_enabled.insert(group.to_string(), enabled);
    }

    /// Whether `group` currently participates in recognition.
    #[must_use]
    pub fn is_gesture_group_enabled(&self, group: &str) -> bool {
        self.group_enabled.get(group).map_or(true, |e| *e)
    }

    fn group_is_enabled_for(&self, gesture: &Gesture) -> bool {
        gesture
            .group()
            .is_none_or(|g| self.is_gesture_group_enabled(&g))
    }

    /// Dispatches a pointer-down event: a pointer already captured by
    /// an active gesture routes straight to its capturing target;
    /// otherwise the event is tried against `target` and, on
    /// recognition failure, replayed up the ancestor chain (spec
    /// §4.5 steps 1 and 5) until some target's gestures make progress
    /// or the chain is exhausted.
    pub fn dispatch_pointer_down(&self, event: PointerEventData) {
        let chain = self.ancestor_chain(event.target);
        let last = *chain.last().expect("ancestor_chain always includes target");
        self.router.route(&event, &chain, |target, evt| {
            let retargeted = PointerEventData { target, ..*evt };
            if let Err(err) = self.router.enqueue(target, retargeted) {
                tracing::debug!(%err, target = %target, "pointer queue full");
            }
            self.registry.lock().on_down(retargeted);
            let handled = self.run_recognition(target, true);
            self.router.drain(target);
            if handled || target == last {
                true
            } else {
                self.registry.lock().on_up_or_cancel(target, retargeted.pointer_id);
                false
            }
        });
    }

    /// Dispatches a pointer-move event: updates the registry, fires
    /// `onMove` for any active gesture with this pointer bound, and
    /// re-runs recognition on the target so a `Recognizing` gesture
    /// waiting only on a hover pointer's dwell timer (no further
    /// down/up events arrive while hovering) can still advance to
    /// `Active` once the dwell elapses.
    pub fn dispatch_pointer_move(&self, event: PointerEventData) {
        self.registry.lock().on_move(event);
        let mut any_recognizing = false;
        for entry in self.gestures.iter() {
            let gesture = entry.value();
            if gesture.target() != Some(event.target) {
                continue;
            }
            if gesture.state() == GestureState::Active && gesture.bound_pointers().contains(&event.pointer_id) {
                gesture.fire_move();
            } else if gesture.state() == GestureState::Recognizing {
                any_recognizing = true;
            }
        }
        if any_recognizing {
            self.run_recognition(event.target, true);
        }
    }

    /// Dispatches a pointer-up or pointer-cancel event.
    pub fn dispatch_pointer_up_or_cancel(&self, target: TargetId, pointer: PointerId, cancelled: bool) {
        let mut to_recheck = false;
        for entry in self.gestures.iter() {
            let gesture = entry.value();
            if gesture.target() != Some(target) || gesture.state() != GestureState::Active {
                continue;
            }
            if !gesture.bound_pointers().contains(&pointer) {
                continue;
            }
            if cancelled {
                gesture.cancel("pointer cancelled");
            } else {
                gesture.end(pointer);
                recognizer::record_repeat_occurrence(gesture, std::time::Instant::now());
            }
            self.router.release(pointer);
            to_recheck = gesture.check_for_gestures_on_end();
        }
        self.registry.lock().on_up_or_cancel(target, pointer);
        if to_recheck {
            self.run_recognition(target, false);
        }
    }

    /// Runs recognition for `target`'s current live pointers and
    /// applies the outcome. Returns whether any candidate gesture made
    /// progress (activated or stayed `Recognizing`), the signal
    /// `dispatch_pointer_down` uses to decide whether an event should
    /// bubble to the ancestor chain.
    ///
    /// `allow_hold` is forwarded to [`recognizer::recognize`]: `true`
    /// on the pointer-down path, `false` on re-checks triggered by a
    /// pointer lifting, where no larger permutation is still growing.
    fn run_recognition(&self, target: TargetId, allow_hold: bool) -> bool {
        let candidate_gestures: Vec<Gesture> = self
            .gestures
            .iter()
            .filter(|e| {
                let g = e.value();
                g.target() == Some(target)
                    && g.is_enabled()
                    && g.state() != GestureState::Active
                    && self.group_is_enabled_for(g)
                    && g.evaluate_conditional()
            })
            .map(|e| e.value().clone())
            .collect();
        let candidates: Vec<Candidate<'_>> = candidate_gestures
            .iter()
            .map(|g| Candidate { gesture: g })
            .collect();

        let hover_dwell = self.settings().hover_dwell();
        let registry = self.registry.lock();
        let outcome = recognizer::recognize(&registry, target, &candidates, std::time::Instant::now(), allow_hold, hover_dwell);
        drop(registry);

        match outcome {
            RecognitionOutcome::Activate { gesture, permutation_index, bindings } => {
                gesture.activate(permutation_index, bindings);
                for other in &candidate_gestures {
                    if *other != gesture && other.state() == GestureState::Recognizing {
                        other.reset_to_pending();
                    }
                }
                if gesture.captures_pointers() {
                    for pointer in gesture.bound_pointers() {
                        self.router.capture(pointer, target);
                    }
                }
                if let Some(timeout) = gesture.completion_timeout() {
                    let gesture_clone = gesture.clone();
                    let timer = self.timers.schedule(timeout, move || {
                        gesture_clone.cancel("completion timeout elapsed");
                    });
                    gesture.set_completion_timer(Some(timer));
                }
                true
            }
            RecognitionOutcome::Recognizing(held) => {
                for gesture in &held {
                    gesture.mark_recognizing();
                }
                for other in &candidate_gestures {
                    if !held.contains(other) && other.state() == GestureState::Recognizing {
                        other.reset_to_pending();
                    }
                }
                !held.is_empty()
            }
            RecognitionOutcome::NoMatch => {
                for other in &candidate_gestures {
                    if other.state() == GestureState::Recognizing {
                        other.reset_to_pending();
                    }
                }
                false
            }
        }
    }

    /// Drives pending timers; hosts not on a `tokio` runtime call this
    /// from their own frame loop.
    pub fn check_timers(&self) -> usize {
        self.timers.check_timers()
    }

    /// The pointer currently bound to `selector` on `gesture`, if
    /// active.
    #[must_use]
    pub fn get_pointer_id(&self, gesture: &Gesture, selector: PointerSelector) -> Option<PointerId> {
        gesture.pointer_id(selector)
    }

    /// The initial-down event for `selector` on `gesture`.
    #[must_use]
    pub fn get_start_event(&self, gesture: &Gesture, selector: PointerSelector) -> Option<PointerEventData> {
        let registry = self.registry.lock();
        gesture.start_event(&registry, selector)
    }

    /// The most recent event for `selector` on `gesture`.
    #[must_use]
    pub fn get_current_event(&self, gesture: &Gesture, selector: PointerSelector) -> Option<PointerEventData> {
        let registry = self.registry.lock();
        gesture.current_event(&registry, selector)
    }

    /// The current position for `selector` on `gesture`, in target
    /// coordinate space.
    #[must_use]
    pub fn get_current_point(&self, gesture: &Gesture, selector: PointerSelector) -> Option<Point> {
        self.get_current_event(gesture, selector).map(|e| e.position)
    }

    /// Distance between `gesture`'s `a` and `b` bound pointers'
    /// current positions.
    #[must_use]
    pub fn get_distance(&self, gesture: &Gesture, a: PointerSelector, b: PointerSelector) -> Option<f64> {
        let registry = self.registry.lock();
        gesture.distance(&registry, a, b)
    }

    /// Begins a new ink for `pointer` on `target`, associates it with
    /// `gesture`, and returns its identifier.
    pub fn begin_ink(&self, gesture: &Gesture, pointer: PointerId, target: TargetId, drawing: bool, hull_kind: HullKind, first: Point) -> InkId {
        let ink = Ink::new(pointer, target, drawing, hull_kind, first);
        let id = ink.id();
        self.inks.insert(id, ink);
        gesture.set_current_ink(Some(id));
        id
    }

    /// Appends a point to an in-progress ink. No-op if `id` is
    /// unknown.
    pub fn update_ink(&self, id: InkId, point: Point) -> bool {
        self.inks.get_mut(&id).map_or(false, |mut ink| ink.add_point(point))
    }

    /// Consolidates and removes the ink `id`, returning its composite
    /// path data and straight-line classification. Errors with
    /// [`MilError::InvalidState`] if `id` is unknown.
    pub fn end_ink(&self, id: InkId) -> MilResult<(String, bool)> {
        let (_, mut ink) = self
            .inks
            .remove(&id)
            .ok_or_else(|| MilError::InvalidState(format!("unknown ink {id}")))?;
        ink.consolidate(self.geometry.as_ref());
        let path = ink.path_data(self.geometry.as_ref());
        let straight = ink.is_straight_line();

        if self.settings().auto_combine_mode().bits() != 0 {
            let target = ink.target();
            let mode = self.settings().auto_combine_mode();
            let combine_with = self.inks.iter().find(|e| {
                e.value().target() == target && ink.satisfies_auto_combine(e.value(), mode, self.geometry.as_ref())
            }).map(|e| *e.key());
            if let Some(other_id) = combine_with {
                if let Some(mut other) = self.inks.get_mut(&other_id) {
                    other.absorb(&ink);
                }
            }
        }
        Ok((path, straight))
    }

    /// Forwards to the configured [`ShapeRecognizer`].
    #[must_use]
    pub fn recognize_shape(
        &self,
        points: &[Point],
        min_match_pct: f64,
        w: f64,
        h: f64,
        target_shapes: &[ShapeTemplate],
    ) -> Option<ShapeMatch> {
        self.shapes.recognize_shape(points, min_match_pct, w, h, target_shapes)
    }

    /// Forwards to the configured [`RadialSwipeRecognizer`].
    #[must_use]
    pub fn recognize_radial_swipe(
        &self,
        points: &[Point],
        n_segments: u32,
        min_distance: f64,
    ) -> Option<RadialSwipeMatch> {
        self.swipes.recognize_radial_swipe(points, n_segments, min_distance)
    }
}

impl Default for HostRoot {
    fn default() -> Self {
        Self::initialize()
    }
}

impl std::fmt::Debug for HostRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRoot")
            .field("gestures", &self.gestures.len())
            .field("inks", &self.inks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn down(host: &HostRoot, pointer: i32, target: u64, kind: crate::pointer::PointerKind, pos: Point) {
        host.dispatch_pointer_down(PointerEventData::new(
            PointerId::new(pointer),
            TargetId::new(target),
            kind,
            pos,
            Instant::now(),
        ));
    }

    #[test]
    fn test_add_gesture_uniquifies_name() {
        let host = HostRoot::initialize();
        let a = host.create_gesture("tap").with_target(TargetId::new(1)).with_pointer_type("touch").unwrap();
        let b = host.create_gesture("tap").with_target(TargetId::new(1)).with_pointer_type("touch").unwrap();
        let registered_a = host.add_gesture(a);
        let registered_b = host.add_gesture(b);
        assert_eq!(registered_a.name(), "tap");
        assert_eq!(registered_b.name(), "tap-2");
    }

    #[test]
    fn test_single_tap_activates_and_ends() {
        let host = HostRoot::initialize();
        let started = Arc::new(AtomicU32::new(0));
        let ended = Arc::new(AtomicU32::new(0));
        let s = started.clone();
        let e = ended.clone();

        let gesture = host
            .create_gesture("tap")
            .with_target(TargetId::new(1))
            .with_pointer_type("touch")
            .unwrap()
            .with_on_start(Arc::new(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            }))
            .with_on_end(Arc::new(move |_, _| {
                e.fetch_add(1, Ordering::SeqCst);
            }));
        host.add_gesture(gesture);

        down(&host, 1, 1, crate::pointer::PointerKind::Touch, Point::ZERO);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(host.get_active_gesture_count(), 1);

        host.dispatch_pointer_up_or_cancel(TargetId::new(1), PointerId::new(1), false);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
        assert_eq!(host.get_active_gesture_count(), 0);
    }

    #[test]
    fn test_remove_gestures_by_target() {
        let host = HostRoot::initialize();
        let a = host.create_gesture("a").with_target(TargetId::new(1)).with_pointer_type("touch").unwrap();
        let b = host.create_gesture("b").with_target(TargetId::new(2)).with_pointer_type("touch").unwrap();
        host.add_gesture(a);
        host.add_gesture(b);
        assert_eq!(host.remove_gestures_by_target(TargetId::new(1)), 1);
        assert!(host.get_gesture_by_name("a").is_none());
        assert!(host.get_gesture_by_name("b").is_some());
    }

    #[test]
    fn test_disabled_group_excluded_from_recognition() {
        let host = HostRoot::initialize();
        let gesture = host
            .create_gesture("grouped")
            .with_target(TargetId::new(1))
            .with_pointer_type("touch")
            .unwrap()
            .with_group("drawing");
        host.add_gesture(gesture);
        host.enable_gesture_group("drawing", false);

        down(&host, 1, 1, crate::pointer::PointerKind::Touch, Point::ZERO);
        assert_eq!(host.get_active_gesture_count(), 0);
    }

    #[test]
    fn test_ink_lifecycle_round_trip() {
        let host = HostRoot::initialize();
        let gesture = host.create_gesture("draw").with_target(TargetId::new(1)).with_pointer_type("pen").unwrap();
        let id = host.begin_ink(&gesture, PointerId::new(1), TargetId::new(1), true, HullKind::Convex, Point::ZERO);
        host.update_ink(id, Point::new(10.0, 0.0));
        host.update_ink(id, Point::new(10.0, 10.0));
        let (path, _straight) = host.end_ink(id).unwrap();
        assert!(path.starts_with('M'));
        assert!(host.end_ink(id).is_err());
    }
}
