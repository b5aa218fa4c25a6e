//! Gesture specification and its runtime instance.
//!
//! [`Gesture`] is a cheaply-cloned handle (`Arc`-backed) combining the
//! *declarative* spec (target, pointer-type expression, timeouts,
//! handlers, ...) with the single runtime instance a spec may have
//! active on its target at a time (spec §3's `GestureSpec` and
//! `GestureInstance`, merged the way the teacher keeps a recognizer's
//! static tolerances and its mutable in-flight state in one `Arc`-
//! wrapped handle). Fluent setters follow the teacher's consuming
//! `with_*` builder idiom.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::{MilError, MilResult};
use crate::expression::{compile, CompiledExpression, Ordinal};
use crate::ids::{InkId, PointerId, TargetId};
use crate::pointer::{PointerEventData, PointerKind, PointerRegistry};
use crate::timer::GestureTimer;

/// Lifecycle state of a gesture instance (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// Registered, no pointer activity yet.
    Pending,
    /// First pointer down observed; still collecting the rest of a
    /// permutation.
    Recognizing,
    /// Every required pointer is bound; `started` has fired.
    Active,
    /// The first bound pointer has lifted; `ended` has not fired yet.
    Ending,
    /// `ended` has fired; instance is inert until the spec recognizes
    /// again from `Pending`.
    Ended,
    /// `cancelled` has fired; instance is inert until the spec
    /// recognizes again from `Pending`.
    Cancelled,
}

/// Selects a pointer within a gesture's bound ordinal list for the
/// runtime accessor queries of spec §6 (`{Pn}`, `kind`, `kind:i`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSelector {
    /// `{Pn}`: the n-th pointer in arrival/binding order (1-based).
    Ordinal(u32),
    /// `kind`: the first pointer of the given kind.
    Kind(PointerKind),
    /// `kind:i`: the i-th pointer of the given kind (1-based).
    KindIndexed(PointerKind, u8),
}

/// Handler invoked when a gesture transitions to `Active`.
pub type StartHandler = Arc<dyn Fn(&Gesture) + Send + Sync>;
/// Handler invoked when a gesture transitions `Ending` → `Ended`,
/// receiving the pointer that lifted to end it.
pub type EndHandler = Arc<dyn Fn(&Gesture, PointerId) + Send + Sync>;
/// Handler invoked when a gesture is cancelled, receiving the reason.
pub type CancelHandler = Arc<dyn Fn(&Gesture, &str) + Send + Sync>;
/// Handler invoked on every move of a bound pointer while `Active`.
pub type MoveHandler = Arc<dyn Fn(&Gesture) + Send + Sync>;
/// A conditional predicate gating recognition; a panic inside is
/// treated as `false` (spec §4.4: "a conditional that throws is
/// treated as false (non-fatal)").
pub type Conditional = Arc<dyn Fn(&Gesture) -> bool + Send + Sync>;

#[derive(Default)]
struct Handlers {
    on_start: Option<StartHandler>,
    on_end: Option<EndHandler>,
    on_cancel: Option<CancelHandler>,
    on_move: Option<MoveHandler>,
}

struct Runtime {
    state: GestureState,
    bound_pointers: SmallVec<[PointerId; 4]>,
    ordinal_bindings: Vec<(Ordinal, PointerId)>,
    matched_permutation_index: Option<usize>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    repeat_occurrence: u32,
    last_occurrence_time: Option<Instant>,
    completion_timer: Option<GestureTimer>,
    repeat_timer: Option<GestureTimer>,
    ink: Option<InkId>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            state: GestureState::Pending,
            bound_pointers: SmallVec::new(),
            ordinal_bindings: Vec::new(),
            matched_permutation_index: None,
            start_time: None,
            end_time: None,
            repeat_occurrence: 0,
            last_occurrence_time: None,
            completion_timer: None,
            repeat_timer: None,
            ink: None,
        }
    }
}

struct GestureInner {
    name: String,
    target: Mutex<Option<TargetId>>,
    pointer_type_expr: Mutex<Option<String>>,
    compiled: Mutex<Option<CompiledExpression>>,
    conditional: Mutex<Option<Conditional>>,
    group: Mutex<Option<String>>,
    exclusive: Mutex<bool>,
    enabled: Mutex<bool>,
    recognition_timeout: Mutex<Duration>,
    completion_timeout: Mutex<Option<Duration>>,
    repeat_count: Mutex<u32>,
    repeat_gap_timeout: Mutex<Duration>,
    captures_pointers: Mutex<bool>,
    allow_propagation: Mutex<bool>,
    check_for_gestures_on_end: Mutex<bool>,
    handlers: Mutex<Handlers>,
    runtime: Mutex<Runtime>,
    add_order: Mutex<Option<u64>>,
}

static NEXT_ADD_ORDER: AtomicU64 = AtomicU64::new(1);

/// A declarative gesture description plus its single runtime instance.
///
/// Cheap to clone (an `Arc` handle); all mutation goes through interior
/// locks, matching the teacher's `Arc<Mutex<...>>`-per-field recognizer
/// state and the "drop the lock before invoking a callback" discipline
/// used throughout its `recognizers/` modules.
#[derive(Clone)]
pub struct Gesture(Arc<GestureInner>);

impl Gesture {
    /// Creates a new, unregistered gesture named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(GestureInner {
            name: name.into(),
            target: Mutex::new(None),
            pointer_type_expr: Mutex::new(None),
            compiled: Mutex::new(None),
            conditional: Mutex::new(None),
            group: Mutex::new(None),
            exclusive: Mutex::new(false),
            enabled: Mutex::new(true),
            recognition_timeout: Mutex::new(crate::settings::DEFAULT_RECOGNITION_TIMEOUT),
            completion_timeout: Mutex::new(None),
            repeat_count: Mutex::new(1),
            repeat_gap_timeout: Mutex::new(Duration::from_millis(300)),
            captures_pointers: Mutex::new(true),
            allow_propagation: Mutex::new(false),
            check_for_gestures_on_end: Mutex::new(false),
            handlers: Mutex::new(Handlers::default()),
            runtime: Mutex::new(Runtime::default()),
            add_order: Mutex::new(None),
        }))
    }

    /// This gesture's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// This gesture's target element, if set.
    #[must_use]
    pub fn target(&self) -> Option<TargetId> {
        *self.0.target.lock()
    }

    /// Sets the target element.
    #[must_use]
    pub fn with_target(self, target: TargetId) -> Self {
        *self.0.target.lock() = Some(target);
        self
    }

    /// Sets the pointer-type expression, compiling it immediately.
    ///
    /// # Errors
    /// Returns [`MilError::InvalidSpec`] if the expression fails to
    /// compile (see [`crate::expression::compile`]).
    pub fn with_pointer_type(self, expr: impl Into<String>) -> MilResult<Self> {
        let expr = expr.into();
        let compiled = compile(&expr)?;
        *self.0.pointer_type_expr.lock() = Some(expr);
        *self.0.compiled.lock() = Some(compiled);
        Ok(self)
    }

    /// The source pointer-type expression, if set.
    #[must_use]
    pub fn pointer_type(&self) -> Option<String> {
        self.0.pointer_type_expr.lock().clone()
    }

    /// The compiled pointer-type expression, if set.
    #[must_use]
    pub fn compiled_expression(&self) -> Option<CompiledExpression> {
        self.0.compiled.lock().clone()
    }

    /// Sets the conditional predicate.
    #[must_use]
    pub fn with_conditional(self, predicate: Conditional) -> Self {
        *self.0.conditional.lock() = Some(predicate);
        self
    }

    /// Evaluates the conditional predicate, if any. A panicking
    /// predicate is treated as `false` and logged, never propagated
    /// (spec §4.4).
    #[must_use]
    pub fn evaluate_conditional(&self) -> bool {
        let predicate = self.0.conditional.lock().clone();
        match predicate {
            None => true,
            Some(f) => {
                let gesture = self.clone();
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&gesture))).unwrap_or(false)
            }
        }
    }

    /// Sets the gesture group name.
    #[must_use]
    pub fn with_group(self, group: impl Into<String>) -> Self {
        *self.0.group.lock() = Some(group.into());
        self
    }

    /// The gesture group name, if set.
    #[must_use]
    pub fn group(&self) -> Option<String> {
        self.0.group.lock().clone()
    }

    /// Sets whether this gesture is exclusive on its target.
    #[must_use]
    pub fn with_exclusive(self, exclusive: bool) -> Self {
        *self.0.exclusive.lock() = exclusive;
        self
    }

    /// Whether this gesture is exclusive.
    #[must_use]
    pub fn is_exclusive(&self) -> bool {
        *self.0.exclusive.lock()
    }

    /// Sets whether this gesture currently participates in recognition.
    #[must_use]
    pub fn with_enabled(self, enabled: bool) -> Self {
        *self.0.enabled.lock() = enabled;
        self
    }

    /// Whether this gesture currently participates in recognition.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        *self.0.enabled.lock()
    }

    /// Sets the recognition window.
    #[must_use]
    pub fn with_recognition_timeout(self, timeout: Duration) -> Self {
        *self.0.recognition_timeout.lock() = timeout;
        self
    }

    /// The recognition window.
    #[must_use]
    pub fn recognition_timeout(&self) -> Duration {
        *self.0.recognition_timeout.lock()
    }

    /// Sets the completion timeout. `None` means infinite (spec's
    /// `-1`).
    #[must_use]
    pub fn with_completion_timeout(self, timeout: Option<Duration>) -> Self {
        *self.0.completion_timeout.lock() = timeout;
        self
    }

    /// The completion timeout, `None` meaning infinite.
    #[must_use]
    pub fn completion_timeout(&self) -> Option<Duration> {
        *self.0.completion_timeout.lock()
    }

    /// Sets the repeat count (`>= 1`; `1` means "no repeat tracking").
    ///
    /// # Errors
    /// [`MilError::InvalidArgument`] if `count == 0`.
    pub fn with_repeat_count(self, count: u32) -> MilResult<Self> {
        if count == 0 {
            return Err(MilError::InvalidArgument("repeat count must be >= 1".into()));
        }
        *self.0.repeat_count.lock() = count;
        Ok(self)
    }

    /// The repeat count.
    #[must_use]
    pub fn repeat_count(&self) -> u32 {
        *self.0.repeat_count.lock()
    }

    /// Sets the repeat-gap timeout (time allowed between repeat
    /// occurrences before the in-progress repeat is abandoned).
    #[must_use]
    pub fn with_repeat_gap_timeout(self, timeout: Duration) -> Self {
        *self.0.repeat_gap_timeout.lock() = timeout;
        self
    }

    /// The repeat-gap timeout.
    #[must_use]
    pub fn repeat_gap_timeout(&self) -> Duration {
        *self.0.repeat_gap_timeout.lock()
    }

    /// Sets whether becoming active acquires native pointer capture.
    #[must_use]
    pub fn with_captures_pointers(self, captures: bool) -> Self {
        *self.0.captures_pointers.lock() = captures;
        self
    }

    /// Whether becoming active acquires native pointer capture.
    #[must_use]
    pub fn captures_pointers(&self) -> bool {
        *self.0.captures_pointers.lock()
    }

    /// Sets whether unmatched events are allowed to propagate to
    /// ancestors even while this gesture is recognizing.
    #[must_use]
    pub fn with_allow_propagation(self, allow: bool) -> Self {
        *self.0.allow_propagation.lock() = allow;
        self
    }

    /// Whether unmatched events propagate to ancestors.
    #[must_use]
    pub fn allow_propagation(&self) -> bool {
        *self.0.allow_propagation.lock()
    }

    /// Sets whether the recognizer re-runs on remaining pointers after
    /// this gesture ends (spec's gesture-downgrade scenario).
    #[must_use]
    pub fn with_check_for_gestures_on_end(self, check: bool) -> Self {
        *self.0.check_for_gestures_on_end.lock() = check;
        self
    }

    /// Whether the recognizer re-runs on remaining pointers on end.
    #[must_use]
    pub fn check_for_gestures_on_end(&self) -> bool {
        *self.0.check_for_gestures_on_end.lock()
    }

    /// Sets the start handler.
    #[must_use]
    pub fn with_on_start(self, handler: StartHandler) -> Self {
        self.0.handlers.lock().on_start = Some(handler);
        self
    }

    /// Sets the end handler.
    #[must_use]
    pub fn with_on_end(self, handler: EndHandler) -> Self {
        self.0.handlers.lock().on_end = Some(handler);
        self
    }

    /// Sets the cancel handler.
    #[must_use]
    pub fn with_on_cancel(self, handler: CancelHandler) -> Self {
        self.0.handlers.lock().on_cancel = Some(handler);
        self
    }

    /// Sets the move handler. Fails with [`MilError::InvalidSpec`] if
    /// the target has not been set yet (spec §4.4).
    pub fn with_on_move(self, handler: MoveHandler) -> MilResult<Self> {
        if self.target().is_none() {
            return Err(MilError::InvalidSpec(
                "OnMoveHandler cannot be set before Target".into(),
            ));
        }
        self.0.handlers.lock().on_move = Some(handler);
        Ok(self)
    }

    pub(crate) fn fire_start(&self) {
        let handler = self.0.handlers.lock().on_start.clone();
        if let Some(h) = handler {
            h(self);
        }
    }

    pub(crate) fn fire_end(&self, lifted: PointerId) {
        let handler = self.0.handlers.lock().on_end.clone();
        if let Some(h) = handler {
            h(self, lifted);
        }
    }

    pub(crate) fn fire_cancel(&self, reason: &str) {
        let handler = self.0.handlers.lock().on_cancel.clone();
        if let Some(h) = handler {
            h(self, reason);
        }
    }

    pub(crate) fn fire_move(&self) {
        let handler = self.0.handlers.lock().on_move.clone();
        if let Some(h) = handler {
            h(self);
        }
    }

    /// Assigns the process-wide add order used to break recognizer
    /// ties (spec §4.3: "earliest creation order of the gesture"). A
    /// no-op if already assigned; called once by
    /// [`crate::host::HostRoot::add_gesture`].
    pub(crate) fn assign_add_order_if_unset(&self) {
        let mut order = self.0.add_order.lock();
        if order.is_none() {
            *order = Some(NEXT_ADD_ORDER.fetch_add(1, Ordering::Relaxed));
        }
    }

    /// The add-order tie-breaker value, if registered.
    #[must_use]
    pub fn add_order(&self) -> Option<u64> {
        *self.0.add_order.lock()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> GestureState {
        self.0.runtime.lock().state
    }

    /// Currently bound pointers, in ordinal order.
    #[must_use]
    pub fn bound_pointers(&self) -> SmallVec<[PointerId; 4]> {
        self.0.runtime.lock().bound_pointers.clone()
    }

    /// Resolves a [`PointerSelector`] to the concrete bound pointer, if
    /// the gesture is currently active with a matching binding.
    #[must_use]
    pub fn pointer_id(&self, selector: PointerSelector) -> Option<PointerId> {
        let runtime = self.0.runtime.lock();
        match selector {
            PointerSelector::Ordinal(n) => runtime
                .ordinal_bindings
                .get(n.checked_sub(1)? as usize)
                .map(|(_, id)| *id),
            PointerSelector::Kind(kind) => runtime
                .ordinal_bindings
                .iter()
                .find(|(ord, _)| ord.kind == kind)
                .map(|(_, id)| *id),
            PointerSelector::KindIndexed(kind, index) => runtime
                .ordinal_bindings
                .iter()
                .find(|(ord, _)| ord.kind == kind && ord.index == index)
                .map(|(_, id)| *id),
        }
    }

    /// The initial-down event for the pointer resolved by `selector`.
    #[must_use]
    pub fn start_event(
        &self,
        registry: &PointerRegistry,
        selector: PointerSelector,
    ) -> Option<PointerEventData> {
        let target = self.target()?;
        let pointer = self.pointer_id(selector)?;
        registry.initial_event(target, pointer)
    }

    /// The most recent event for the pointer resolved by `selector`.
    #[must_use]
    pub fn current_event(
        &self,
        registry: &PointerRegistry,
        selector: PointerSelector,
    ) -> Option<PointerEventData> {
        let target = self.target()?;
        let pointer = self.pointer_id(selector)?;
        registry.current_event(target, pointer)
    }

    /// Euclidean distance between the current positions of the two
    /// pointers resolved by `a` and `b`.
    #[must_use]
    pub fn distance(
        &self,
        registry: &PointerRegistry,
        a: PointerSelector,
        b: PointerSelector,
    ) -> Option<f64> {
        let ea = self.current_event(registry, a)?;
        let eb = self.current_event(registry, b)?;
        Some(ea.position.distance(eb.position))
    }

    /// The ink currently associated with this gesture's active
    /// instance, if any.
    #[must_use]
    pub fn current_ink(&self) -> Option<InkId> {
        self.0.runtime.lock().ink
    }

    pub(crate) fn set_current_ink(&self, ink: Option<InkId>) {
        self.0.runtime.lock().ink = ink;
    }

    pub(crate) fn take_completion_timer(&self) -> Option<GestureTimer> {
        self.0.runtime.lock().completion_timer.take()
    }

    pub(crate) fn set_completion_timer(&self, timer: Option<GestureTimer>) {
        self.0.runtime.lock().completion_timer = timer;
    }

    pub(crate) fn take_repeat_timer(&self) -> Option<GestureTimer> {
        self.0.runtime.lock().repeat_timer.take()
    }

    pub(crate) fn set_repeat_timer(&self, timer: Option<GestureTimer>) {
        self.0.runtime.lock().repeat_timer = timer;
    }

    pub(crate) fn repeat_occurrence(&self) -> u32 {
        self.0.runtime.lock().repeat_occurrence
    }

    /// Transitions `Pending`/`Ended`/`Cancelled` → `Active`: binds the
    /// matched permutation's pointers, fires `started`, and arms the
    /// completion timer if configured.
    pub(crate) fn activate(
        &self,
        permutation_index: usize,
        ordinal_bindings: Vec<(Ordinal, PointerId)>,
    ) {
        {
            let mut runtime = self.0.runtime.lock();
            runtime.state = GestureState::Active;
            runtime.bound_pointers = ordinal_bindings.iter().map(|(_, id)| *id).collect();
            runtime.matched_permutation_index = Some(permutation_index);
            runtime.ordinal_bindings = ordinal_bindings;
            runtime.start_time = Some(Instant::now());
            runtime.end_time = None;
        }
        tracing::debug!(gesture = self.name(), "activated");
        self.fire_start();
    }

    /// Transitions `Active` → `Ending` → `Ended` → `Pending`: fires
    /// `ended`, tears down the completion timer, and resets runtime
    /// state the same way `cancel` does so the spec is ready to
    /// recognize again ("`Ended`: ... instance is inert until the spec
    /// recognizes again from `Pending`").
    pub(crate) fn end(&self, lifted: PointerId) {
        {
            let mut runtime = self.0.runtime.lock();
            runtime.state = GestureState::Ending;
            runtime.end_time = Some(Instant::now());
        }
        tracing::debug!(gesture = self.name(), pointer = %lifted, "ending");
        self.fire_end(lifted);

        if let Some(t) = self.take_completion_timer() {
            t.cancel();
        }

        {
            let mut runtime = self.0.runtime.lock();
            runtime.state = GestureState::Ended;
        }
        self.reset_to_pending();
    }

    /// Transitions `Pending` → `Recognizing`: a permutation prefix
    /// matches the live pointer set, or a full match is held pending a
    /// larger competing permutation (spec §4.4). A no-op from any other
    /// state.
    pub(crate) fn mark_recognizing(&self) {
        let mut runtime = self.0.runtime.lock();
        if runtime.state == GestureState::Pending {
            runtime.state = GestureState::Recognizing;
        }
    }

    /// Idempotent cancellation: tears down timers, clears bound
    /// pointers, fires `cancelled`, and returns to `Pending` (spec
    /// §5: "`cancel(reason)` is idempotent, synchronous").
    pub(crate) fn cancel(&self, reason: &str) {
        let already_pending = {
            let runtime = self.0.runtime.lock();
            matches!(runtime.state, GestureState::Pending)
                && runtime.bound_pointers.is_empty()
        };
        if already_pending {
            return;
        }

        if let Some(t) = self.take_completion_timer() {
            t.cancel();
        }
        if let Some(t) = self.take_repeat_timer() {
            t.cancel();
        }

        {
            let mut runtime = self.0.runtime.lock();
            runtime.state = GestureState::Cancelled;
            runtime.bound_pointers.clear();
            runtime.ordinal_bindings.clear();
            runtime.matched_permutation_index = None;
        }
        tracing::debug!(gesture = self.name(), reason, "cancelled");
        self.fire_cancel(reason);

        let mut runtime = self.0.runtime.lock();
        runtime.state = GestureState::Pending;
    }

    pub(crate) fn reset_to_pending(&self) {
        let mut runtime = self.0.runtime.lock();
        runtime.state = GestureState::Pending;
        runtime.bound_pointers.clear();
        runtime.ordinal_bindings.clear();
        runtime.matched_permutation_index = None;
    }

    pub(crate) fn increment_repeat_occurrence(&self) -> u32 {
        let mut runtime = self.0.runtime.lock();
        runtime.repeat_occurrence += 1;
        runtime.last_occurrence_time = Some(Instant::now());
        runtime.repeat_occurrence
    }

    pub(crate) fn reset_repeat_occurrence(&self) {
        self.0.runtime.lock().repeat_occurrence = 0;
    }
}

impl fmt::Debug for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gesture")
            .field("name", &self.0.name)
            .field("target", &self.target())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Gesture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Gesture {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_new_gesture_is_pending() {
        let g = Gesture::new("tap");
        assert_eq!(g.state(), GestureState::Pending);
        assert_eq!(g.name(), "tap");
    }

    #[test]
    fn test_fluent_setters_chain() {
        let g = Gesture::new("tap")
            .with_target(TargetId::new(1))
            .with_exclusive(true)
            .with_group("drawing")
            .with_recognition_timeout(Duration::from_millis(100));
        assert_eq!(g.target(), Some(TargetId::new(1)));
        assert!(g.is_exclusive());
        assert_eq!(g.group(), Some("drawing".to_string()));
        assert_eq!(g.recognition_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_pointer_type_compiles() {
        let g = Gesture::new("tap").with_pointer_type("touch").unwrap();
        assert_eq!(g.compiled_expression().unwrap().permutations.len(), 1);
    }

    #[test]
    fn test_invalid_pointer_type_rejected() {
        let g = Gesture::new("tap");
        assert!(g.with_pointer_type("bogus").is_err());
    }

    #[test]
    fn test_on_move_requires_target() {
        let g = Gesture::new("tap");
        let result = g.with_on_move(Arc::new(|_: &Gesture| {}));
        assert!(matches!(result, Err(MilError::InvalidSpec(_))));

        let g = Gesture::new("tap").with_target(TargetId::new(1));
        assert!(g.with_on_move(Arc::new(|_: &Gesture| {})).is_ok());
    }

    #[test]
    fn test_activate_fires_start_and_binds_pointers() {
        let started = Arc::new(AtomicBool::new(false));
        let started_clone = started.clone();
        let g = Gesture::new("tap").with_on_start(Arc::new(move |_| {
            started_clone.store(true, Ordering::SeqCst);
        }));

        let ordinal = crate::expression::compile("touch").unwrap().permutations[0].slots[0];
        g.activate(0, vec![(ordinal, PointerId::new(1))]);

        assert!(started.load(Ordering::SeqCst));
        assert_eq!(g.state(), GestureState::Active);
        assert_eq!(g.bound_pointers().as_slice(), &[PointerId::new(1)]);
    }

    #[test]
    fn test_end_fires_handler_with_lifted_pointer() {
        let lifted_id = Arc::new(Mutex::new(None));
        let lifted_clone = lifted_id.clone();
        let g = Gesture::new("tap").with_on_end(Arc::new(move |_, pointer| {
            *lifted_clone.lock() = Some(pointer);
        }));
        let ordinal = crate::expression::compile("touch").unwrap().permutations[0].slots[0];
        g.activate(0, vec![(ordinal, PointerId::new(7))]);
        g.end(PointerId::new(7));
        assert_eq!(g.state(), GestureState::Pending);
        assert!(g.bound_pointers().is_empty());
        assert_eq!(*lifted_id.lock(), Some(PointerId::new(7)));
    }

    #[test]
    fn test_cancel_is_idempotent_and_returns_to_pending() {
        let cancel_count = Arc::new(AtomicBool::new(false));
        let cc = cancel_count.clone();
        let g = Gesture::new("tap").with_on_cancel(Arc::new(move |_, _| {
            cc.store(true, Ordering::SeqCst);
        }));
        let ordinal = crate::expression::compile("touch").unwrap().permutations[0].slots[0];
        g.activate(0, vec![(ordinal, PointerId::new(1))]);

        g.cancel("moved too far");
        assert_eq!(g.state(), GestureState::Pending);
        assert!(g.bound_pointers().is_empty());
        assert!(cancel_count.load(Ordering::SeqCst));

        // Idempotent: calling again on an already-pending, unbound
        // gesture does nothing further.
        g.cancel("moved too far");
        assert_eq!(g.state(), GestureState::Pending);
    }

    #[test]
    fn test_pointer_selector_resolution() {
        let g = Gesture::new("multi");
        let compiled = crate::expression::compile("pen+touch").unwrap();
        let slots = compiled.permutations[0].slots.clone();
        g.activate(
            0,
            vec![(slots[0], PointerId::new(10)), (slots[1], PointerId::new(11))],
        );
        assert_eq!(g.pointer_id(PointerSelector::Ordinal(1)), Some(PointerId::new(10)));
        assert_eq!(g.pointer_id(PointerSelector::Ordinal(2)), Some(PointerId::new(11)));
        assert_eq!(
            g.pointer_id(PointerSelector::Kind(PointerKind::Touch)),
            Some(PointerId::new(11))
        );
    }

    #[test]
    fn test_conditional_panic_treated_as_false() {
        let g = Gesture::new("tap").with_conditional(Arc::new(|_: &Gesture| -> bool { panic!("boom") }));
        assert!(!g.evaluate_conditional());
    }

    #[test]
    fn test_conditional_default_true() {
        let g = Gesture::new("tap");
        assert!(g.evaluate_conditional());
    }

    #[test]
    fn test_conditional_false_is_respected() {
        let g = Gesture::new("tap").with_conditional(Arc::new(|_| false));
        assert!(!g.evaluate_conditional());
    }

    #[test]
    fn test_mark_recognizing_only_from_pending() {
        let g = Gesture::new("tap");
        g.mark_recognizing();
        assert_eq!(g.state(), GestureState::Recognizing);

        let ordinal = crate::expression::compile("touch").unwrap().permutations[0].slots[0];
        g.activate(0, vec![(ordinal, PointerId::new(1))]);
        g.mark_recognizing();
        assert_eq!(g.state(), GestureState::Active);
    }
}
