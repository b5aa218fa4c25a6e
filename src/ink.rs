//! The Ink Engine: freehand stroke capture, consolidation and
//! classification (spec §4.6).
//!
//! A stroke's raw points are deduplicated by Chebyshev distance as they
//! arrive and fanned out into bounded "constituent" paths so no single
//! SVG path element grows unbounded while drawing; on pointer-up the
//! constituents consolidate into one composite path, which is then
//! classified (straight line / ruler), hulled, and optionally folded
//! into an existing ink via auto-combine.

use crate::geometry::{GeometryProvider, Point};
use crate::ids::{InkId, PointerId, TargetId};
use crate::settings::AutoCombineMode;

/// Minimum Chebyshev distance between consecutive recorded points
/// (spec §4.6).
pub const POINT_DEDUP_THRESHOLD: f64 = 3.0;
/// Points per constituent path while actively drawing.
pub const DRAWING_CONSTITUENT_CAPACITY: usize = 100;
/// Points the next drawing constituent is pre-seeded with from the
/// tail of the previous one.
pub const DRAWING_CONSTITUENT_SEED: usize = 2;
/// Points per constituent path for a non-drawing ("comet-tail")
/// transform preview.
pub const COMET_TAIL_CONSTITUENT_CAPACITY: usize = 8;
/// Points the next comet-tail constituent is pre-seeded with.
pub const COMET_TAIL_CONSTITUENT_SEED: usize = 7;
/// Straight-line heuristic: endpoint/length ratio above which a stroke
/// is always classified a straight line.
const STRAIGHT_ENDPOINT_RATIO_ABSOLUTE: f64 = 0.95;
/// Straight-line heuristic: combined with a low-enough area/length
/// ratio, this weaker endpoint/length ratio also counts.
const STRAIGHT_ENDPOINT_RATIO_WEAK: f64 = 0.5;
/// Straight-line heuristic: area/length ratio threshold paired with
/// [`STRAIGHT_ENDPOINT_RATIO_WEAK`].
const STRAIGHT_AREA_RATIO: f64 = 0.1;
/// Fraction of ruler thickness within which a stroke coerces to a
/// straight ruler line.
const RULER_COERCION_FRACTION: f64 = 0.25;

/// Which hull an ink computes on consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullKind {
    /// No hull is computed (resize gestures skip touching `start_scale`
    /// for these inks; spec §9 Open Question).
    None,
    /// Convex hull.
    Convex,
    /// Concave hull.
    Concave,
}

struct ConstituentPath {
    points: Vec<Point>,
}

impl ConstituentPath {
    fn seeded(seed: &[Point]) -> Self {
        Self { points: seed.to_vec() }
    }
}

/// A single freehand stroke's accumulated state.
pub struct Ink {
    id: InkId,
    pointer: PointerId,
    target: TargetId,
    drawing: bool,
    hull_kind: HullKind,
    points: Vec<Point>,
    constituents: Vec<ConstituentPath>,
    start_scale: f64,
    start_distance: Option<f64>,
    translation: Point,
    coerced: bool,
    hull: Option<Vec<Point>>,
    straight_line: bool,
}

impl Ink {
    /// Begins a new ink for `pointer` on `target`, seeded with its
    /// first point. `drawing` selects the constituent-path capacity
    /// policy (100pt/seed-2 for real drawing, 8pt/seed-7 for a
    /// non-drawing comet-tail preview).
    #[must_use]
    pub fn new(pointer: PointerId, target: TargetId, drawing: bool, hull_kind: HullKind, first: Point) -> Self {
        Self {
            id: InkId::next(),
            pointer,
            target,
            drawing,
            hull_kind,
            points: vec![first],
            constituents: vec![ConstituentPath::seeded(&[first])],
            start_scale: 1.0,
            start_distance: None,
            translation: Point::ZERO,
            coerced: false,
            hull: None,
            straight_line: false,
        }
    }

    /// This ink's identifier.
    #[must_use]
    pub fn id(&self) -> InkId {
        self.id
    }

    /// The pointer this ink is tracking.
    #[must_use]
    pub fn pointer(&self) -> PointerId {
        self.pointer
    }

    /// The target this ink is drawn on.
    #[must_use]
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// All recorded (post-dedup) points, in arrival order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of constituent paths spawned so far.
    #[must_use]
    pub fn constituent_count(&self) -> usize {
        self.constituents.len()
    }

    /// Whether this ink was ever coerced to a ruler line.
    #[must_use]
    pub fn coerced(&self) -> bool {
        self.coerced
    }

    /// Whether consolidation classified this ink as a straight line.
    #[must_use]
    pub fn is_straight_line(&self) -> bool {
        self.straight_line
    }

    /// The computed hull, if [`consolidate`](Self::consolidate) has run
    /// and `hull_kind != HullKind::None`.
    #[must_use]
    pub fn hull(&self) -> Option<&[Point]> {
        self.hull.as_deref()
    }

    fn capacity(&self) -> usize {
        if self.drawing {
            DRAWING_CONSTITUENT_CAPACITY
        } else {
            COMET_TAIL_CONSTITUENT_CAPACITY
        }
    }

    fn seed_len(&self) -> usize {
        if self.drawing {
            DRAWING_CONSTITUENT_SEED
        } else {
            COMET_TAIL_CONSTITUENT_SEED
        }
    }

    /// Appends a raw point, applying the Chebyshev dedup filter and
    /// spawning a new constituent path once the current one fills up.
    /// Returns `true` if the point was recorded (not deduplicated).
    pub fn add_point(&mut self, point: Point) -> bool {
        if let Some(&last) = self.points.last() {
            if last.chessboard_distance(point) < POINT_DEDUP_THRESHOLD {
                return false;
            }
        }

        self.points.push(point);
        let capacity = self.capacity();
        let seed_len_base = self.seed_len();
        let current = self.constituents.last_mut().expect("always >= 1 constituent");
        current.points.push(point);

        if current.points.len() >= capacity {
            let seed_len = seed_len_base.min(current.points.len());
            let seed = current.points[current.points.len() - seed_len..].to_vec();
            self.constituents.push(ConstituentPath::seeded(&seed));
        }
        true
    }

    /// Consolidates constituent paths into the composite point list
    /// (already maintained incrementally in `points`), computes the
    /// hull via `geometry` (skipped for [`HullKind::None`]), and
    /// classifies the stroke as a straight line.
    pub fn consolidate(&mut self, geometry: &dyn GeometryProvider) {
        self.hull = match self.hull_kind {
            HullKind::None => None,
            HullKind::Convex => Some(geometry.convex_hull(&self.points)),
            HullKind::Concave => Some(geometry.concave_hull(&self.points)),
        };
        self.straight_line = classify_straight_line(&self.points);
    }

    /// Renders this ink's composite path data via `geometry`.
    #[must_use]
    pub fn path_data(&self, geometry: &dyn GeometryProvider) -> String {
        geometry.path_data(&self.points, false)
    }

    /// Attempts to coerce this stroke to a straight ruler line: if
    /// every point's perpendicular deviation from the line joining the
    /// first and last point is within `ruler_thickness * 0.25`, the
    /// point list collapses to just the two endpoints and `coerced`
    /// latches `true` (spec §4.6/§9).
    pub fn try_coerce_to_ruler(&mut self, ruler_thickness: f64) -> bool {
        if self.points.len() < 2 {
            return false;
        }
        let deviation = max_perpendicular_deviation(&self.points);
        if deviation <= RULER_COERCION_FRACTION * ruler_thickness {
            let first = self.points[0];
            let last = *self.points.last().unwrap();
            self.points = vec![first, last];
            self.constituents = vec![ConstituentPath::seeded(&[first, last])];
            self.coerced = true;
            true
        } else {
            false
        }
    }

    /// Records a resize/pinch update. `start_distance` is latched on
    /// the first call. `start_scale` is only read or updated when
    /// `hull_kind != HullKind::None` (spec §9 Open Question: resize's
    /// `startScale` bookkeeping is restricted to hulled inks). Returns
    /// the new scale factor.
    pub fn resize_update(&mut self, current_distance: f64) -> f64 {
        let start_distance = *self.start_distance.get_or_insert(current_distance.max(f64::EPSILON));
        let ratio = current_distance / start_distance;
        if self.hull_kind == HullKind::None {
            return ratio;
        }
        let scale = ratio * self.start_scale;
        self.start_scale = scale;
        scale
    }

    /// Accumulates a drag translation without touching the point list
    /// (the fast path for a pure transform preview).
    pub fn drag_translate(&mut self, delta: Point) {
        self.translation = self.translation + delta;
    }

    /// Folds the accumulated drag translation into every recorded
    /// point and resets it to zero (called when the drag ends).
    pub fn fold_drag_translation(&mut self) {
        if self.translation == Point::ZERO {
            return;
        }
        for p in &mut self.points {
            *p = *p + self.translation;
        }
        for c in &mut self.constituents {
            for p in &mut c.points {
                *p = *p + self.translation;
            }
        }
        self.translation = Point::ZERO;
    }

    /// Tests whether `self` and `other` satisfy `mode`'s spatial
    /// relation, per [`AutoCombineMode`]'s bit semantics, using
    /// `geometry` for point-in-polygon tests against `other`'s hull
    /// (or point list, if it has none). Always `false` if `self` was
    /// ever coerced to a ruler (spec §9 Open Question: a coerced ink
    /// never auto-combines).
    #[must_use]
    pub fn satisfies_auto_combine(
        &self,
        other: &Ink,
        mode: AutoCombineMode,
        geometry: &dyn GeometryProvider,
    ) -> bool {
        if self.coerced || mode.is_empty() {
            return false;
        }
        let boundary: &[Point] = other.hull.as_deref().unwrap_or(&other.points);
        if boundary.len() < 3 {
            return false;
        }

        if mode.contains(AutoCombineMode::CONTAINED_WITHIN)
            && self.points.iter().all(|p| geometry.point_in_polygon(*p, boundary))
        {
            return true;
        }
        if mode.contains(AutoCombineMode::STARTS_WITHIN)
            && self
                .points
                .first()
                .is_some_and(|p| geometry.point_in_polygon(*p, boundary))
        {
            return true;
        }
        if mode.contains(AutoCombineMode::ENDS_WITHIN)
            && self
                .points
                .last()
                .is_some_and(|p| geometry.point_in_polygon(*p, boundary))
        {
            return true;
        }
        if mode.contains(AutoCombineMode::ANY_POINT_WITHIN)
            && self.points.iter().any(|p| geometry.point_in_polygon(*p, boundary))
        {
            return true;
        }
        false
    }

    /// Merges `other`'s points into `self` (used once auto-combine is
    /// accepted). `other` should be discarded by the caller afterward.
    pub fn absorb(&mut self, other: &Ink) {
        self.points.extend_from_slice(&other.points);
        self.coerced = self.coerced || other.coerced;
    }
}

impl std::fmt::Debug for Ink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ink")
            .field("id", &self.id)
            .field("pointer", &self.pointer)
            .field("target", &self.target)
            .field("points", &self.points.len())
            .field("constituents", &self.constituents.len())
            .field("coerced", &self.coerced)
            .finish()
    }
}

fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

fn polygon_area_shoelace(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum / 2.0).abs()
}

fn classify_straight_line(points: &[Point]) -> bool {
    if points.len() < 2 {
        return true;
    }
    let length = polyline_length(points);
    if length <= f64::EPSILON {
        return true;
    }
    let endpoint_distance = points[0].distance(*points.last().unwrap());
    let endpoint_ratio = endpoint_distance / length;
    if endpoint_ratio >= STRAIGHT_ENDPOINT_RATIO_ABSOLUTE {
        return true;
    }
    let area_ratio = polygon_area_shoelace(points) / length;
    area_ratio > STRAIGHT_AREA_RATIO && endpoint_ratio > STRAIGHT_ENDPOINT_RATIO_WEAK
}

fn max_perpendicular_deviation(points: &[Point]) -> f64 {
    let a = points[0];
    let b = *points.last().unwrap();
    let ab = b - a;
    let len = ab.length();
    if len <= f64::EPSILON {
        return points.iter().map(|p| p.distance(a)).fold(0.0, f64::max);
    }
    points
        .iter()
        .map(|p| {
            let ap = *p - a;
            ((ap.x * ab.y - ap.y * ab.x) / len).abs()
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DefaultGeometry;

    fn ink(drawing: bool, hull: HullKind) -> Ink {
        Ink::new(PointerId::new(1), TargetId::new(1), drawing, hull, Point::ZERO)
    }

    #[test]
    fn test_dedup_rejects_close_points() {
        let mut i = ink(true, HullKind::Convex);
        assert!(!i.add_point(Point::new(1.0, 1.0)));
        assert_eq!(i.points().len(), 1);
        assert!(i.add_point(Point::new(5.0, 0.0)));
        assert_eq!(i.points().len(), 2);
    }

    #[test]
    fn test_constituent_spawns_with_seed() {
        let mut i = ink(true, HullKind::Convex);
        for n in 1..DRAWING_CONSTITUENT_CAPACITY {
            i.add_point(Point::new(n as f64 * 10.0, 0.0));
        }
        assert_eq!(i.constituent_count(), 1);
        i.add_point(Point::new(DRAWING_CONSTITUENT_CAPACITY as f64 * 10.0, 0.0));
        assert_eq!(i.constituent_count(), 2);
    }

    #[test]
    fn test_comet_tail_uses_smaller_capacity() {
        let mut i = ink(false, HullKind::None);
        for n in 1..COMET_TAIL_CONSTITUENT_CAPACITY {
            i.add_point(Point::new(n as f64 * 10.0, 0.0));
        }
        assert_eq!(i.constituent_count(), 1);
        i.add_point(Point::new(COMET_TAIL_CONSTITUENT_CAPACITY as f64 * 10.0, 0.0));
        assert_eq!(i.constituent_count(), 2);
    }

    #[test]
    fn test_consolidate_computes_hull_only_when_requested() {
        let geo = DefaultGeometry;
        let mut i = ink(true, HullKind::None);
        i.add_point(Point::new(10.0, 10.0));
        i.consolidate(&geo);
        assert!(i.hull().is_none());

        let mut i = ink(true, HullKind::Convex);
        i.add_point(Point::new(10.0, 0.0));
        i.add_point(Point::new(10.0, 10.0));
        i.add_point(Point::new(0.0, 10.0));
        i.consolidate(&geo);
        assert!(i.hull().is_some());
    }

    #[test]
    fn test_straight_line_classification() {
        let mut i = ink(true, HullKind::None);
        for n in 1..10 {
            i.add_point(Point::new(n as f64 * 10.0, 0.0));
        }
        i.consolidate(&DefaultGeometry);
        assert!(i.is_straight_line());
    }

    #[test]
    fn test_curvy_stroke_not_classified_straight() {
        let mut i = ink(true, HullKind::None);
        i.add_point(Point::new(10.0, 0.0));
        i.add_point(Point::new(10.0, 10.0));
        i.add_point(Point::new(0.0, 10.0));
        i.add_point(Point::new(0.0, 0.0));
        i.consolidate(&DefaultGeometry);
        assert!(!i.is_straight_line());
    }

    #[test]
    fn test_coerce_to_ruler_within_threshold() {
        let mut i = ink(true, HullKind::None);
        i.add_point(Point::new(10.0, 0.5));
        i.add_point(Point::new(20.0, 0.0));
        assert!(i.try_coerce_to_ruler(10.0));
        assert!(i.coerced());
        assert_eq!(i.points().len(), 2);
    }

    #[test]
    fn test_coerce_to_ruler_rejected_when_too_curved() {
        let mut i = ink(true, HullKind::None);
        i.add_point(Point::new(10.0, 20.0));
        i.add_point(Point::new(20.0, 0.0));
        assert!(!i.try_coerce_to_ruler(1.0));
        assert!(!i.coerced());
    }

    #[test]
    fn test_resize_skips_start_scale_without_hull() {
        let mut i = ink(false, HullKind::None);
        let scale = i.resize_update(20.0);
        let _ = scale;
        let scale2 = i.resize_update(40.0);
        // With HullKind::None, start_scale is never updated: each call
        // is relative to the first-seen distance only.
        assert!((scale2 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_accumulates_start_scale_with_hull() {
        let mut i = ink(false, HullKind::Convex);
        let s1 = i.resize_update(20.0); // ratio 1.0
        assert!((s1 - 1.0).abs() < 1e-9);
        let s2 = i.resize_update(40.0); // ratio 2.0 applied on top
        assert!((s2 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_fast_path_then_fold() {
        let mut i = ink(false, HullKind::None);
        i.drag_translate(Point::new(5.0, 5.0));
        i.drag_translate(Point::new(5.0, 0.0));
        assert_eq!(i.points()[0], Point::ZERO); // not yet folded
        i.fold_drag_translation();
        assert_eq!(i.points()[0], Point::new(10.0, 5.0));
    }

    #[test]
    fn test_auto_combine_contained_within() {
        let geo = DefaultGeometry;
        let mut outer = ink(true, HullKind::Convex);
        outer.add_point(Point::new(20.0, 0.0));
        outer.add_point(Point::new(20.0, 20.0));
        outer.add_point(Point::new(0.0, 20.0));
        outer.consolidate(&geo);

        let mut inner = Ink::new(PointerId::new(2), TargetId::new(1), true, HullKind::None, Point::new(5.0, 5.0));
        inner.add_point(Point::new(8.0, 8.0));

        assert!(inner.satisfies_auto_combine(&outer, AutoCombineMode::CONTAINED_WITHIN, &geo));
    }

    #[test]
    fn test_coerced_ink_never_auto_combines() {
        let geo = DefaultGeometry;
        let mut outer = ink(true, HullKind::Convex);
        outer.add_point(Point::new(20.0, 0.0));
        outer.add_point(Point::new(20.0, 20.0));
        outer.add_point(Point::new(0.0, 20.0));
        outer.consolidate(&geo);

        let mut inner = Ink::new(PointerId::new(2), TargetId::new(1), true, HullKind::None, Point::new(5.0, 5.0));
        inner.add_point(Point::new(8.0, 8.0));
        inner.try_coerce_to_ruler(1000.0);

        assert!(!inner.satisfies_auto_combine(&outer, AutoCombineMode::CONTAINED_WITHIN, &geo));
    }
}
