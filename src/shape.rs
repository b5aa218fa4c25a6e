//! Shape and radial-swipe analyzers — pluggable external collaborators
//! (spec §6: "Shape recognition heuristics and the radial-swipe
//! analyzer" are out of scope to implement sophisticatedly, referenced
//! only through interfaces). Mirrors [`crate::geometry::GeometryProvider`]'s
//! seam pattern: a trait the host may swap out, plus a minimal bundled
//! default so the crate remains self-testable.

use crate::geometry::Point;

/// A named target shape a [`ShapeRecognizer`] may match a stroke
/// against.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTemplate {
    /// The shape's name (returned in a successful [`ShapeMatch`]).
    pub name: String,
    /// Template points, normalized to a unit bounding box.
    pub points: Vec<Point>,
}

/// A successful shape match.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMatch {
    /// The matched template's name.
    pub name: String,
    /// Match quality in `0.0..=1.0`.
    pub score: f64,
}

/// Matches a completed stroke against a set of named template shapes.
pub trait ShapeRecognizer: Send + Sync {
    /// Attempts to match `points` (already resampled/normalized by the
    /// caller is not assumed) against `target_shapes` within a
    /// `w`x`h` bounding box. Returns the best match scoring at least
    /// `min_match_pct` (`0.0..=1.0`), if any.
    fn recognize_shape(
        &self,
        points: &[Point],
        min_match_pct: f64,
        w: f64,
        h: f64,
        target_shapes: &[ShapeTemplate],
    ) -> Option<ShapeMatch>;
}

/// A successful radial-swipe match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialSwipeMatch {
    /// Index of the matched angular segment (`0..n_segments`).
    pub segment: u32,
    /// Total distance travelled.
    pub distance: f64,
}

/// Classifies a stroke as a swipe along one of `n_segments` equal
/// angular divisions of a full circle, anchored at the stroke's first
/// point.
pub trait RadialSwipeRecognizer: Send + Sync {
    /// Attempts to classify `points` as a radial swipe. Returns `None`
    /// if the total travelled distance is below `min_distance`.
    fn recognize_radial_swipe(
        &self,
        points: &[Point],
        n_segments: u32,
        min_distance: f64,
    ) -> Option<RadialSwipeMatch>;
}

/// Minimal bundled implementations good enough for tests and simple
/// hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShapeAnalyzer;

impl ShapeRecognizer for DefaultShapeAnalyzer {
    fn recognize_shape(
        &self,
        points: &[Point],
        min_match_pct: f64,
        w: f64,
        h: f64,
        target_shapes: &[ShapeTemplate],
    ) -> Option<ShapeMatch> {
        if points.len() < 2 || w <= 0.0 || h <= 0.0 {
            return None;
        }
        let normalized = normalize(points, w, h);

        let mut best: Option<ShapeMatch> = None;
        for template in target_shapes {
            let score = 1.0 - mean_point_distance(&normalized, &template.points).min(1.0);
            if score >= min_match_pct && best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(ShapeMatch { name: template.name.clone(), score });
            }
        }
        best
    }
}

impl RadialSwipeRecognizer for DefaultShapeAnalyzer {
    fn recognize_radial_swipe(
        &self,
        points: &[Point],
        n_segments: u32,
        min_distance: f64,
    ) -> Option<RadialSwipeMatch> {
        if points.len() < 2 || n_segments == 0 {
            return None;
        }
        let first = points[0];
        let last = *points.last().unwrap();
        let distance = first.distance(last);
        if distance < min_distance {
            return None;
        }
        let delta = last - first;
        let angle = delta.y.atan2(delta.x).rem_euclid(std::f64::consts::TAU);
        let segment_width = std::f64::consts::TAU / f64::from(n_segments);
        let segment = ((angle / segment_width).floor() as u32).min(n_segments - 1);
        Some(RadialSwipeMatch { segment, distance })
    }
}

fn normalize(points: &[Point], w: f64, h: f64) -> Vec<Point> {
    points.iter().map(|p| Point::new(p.x / w, p.y / h)).collect()
}

/// Mean distance between `a` and `b` resampled to the shorter length,
/// a cheap stand-in for a true elastic-matching shape comparator.
fn mean_point_distance(a: &[Point], b: &[Point]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::MAX;
    }
    let n = a.len().min(b.len());
    let mut total = 0.0;
    for i in 0..n {
        let ai = a[i * a.len() / n];
        let bi = b[i * b.len() / n];
        total += ai.distance(bi);
    }
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radial_swipe_classifies_east() {
        let analyzer = DefaultShapeAnalyzer;
        let points = vec![Point::ZERO, Point::new(100.0, 0.0)];
        let result = analyzer.recognize_radial_swipe(&points, 4, 10.0).unwrap();
        assert_eq!(result.segment, 0);
    }

    #[test]
    fn test_radial_swipe_below_min_distance_is_none() {
        let analyzer = DefaultShapeAnalyzer;
        let points = vec![Point::ZERO, Point::new(1.0, 0.0)];
        assert!(analyzer.recognize_radial_swipe(&points, 4, 10.0).is_none());
    }

    #[test]
    fn test_shape_recognizer_matches_identical_template() {
        let analyzer = DefaultShapeAnalyzer;
        let points = vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)];
        let template = ShapeTemplate {
            name: "triangle".to_string(),
            points: vec![Point::new(0.0, 0.0), Point::new(0.5, 0.5), Point::new(1.0, 0.0)],
        };
        let result = analyzer
            .recognize_shape(&points, 0.5, 10.0, 10.0, &[template])
            .unwrap();
        assert_eq!(result.name, "triangle");
        assert!(result.score >= 0.5);
    }

    #[test]
    fn test_shape_recognizer_rejects_below_threshold() {
        let analyzer = DefaultShapeAnalyzer;
        let points = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        let template = ShapeTemplate {
            name: "far".to_string(),
            points: vec![Point::new(5.0, 5.0), Point::new(5.0, 5.0)],
        };
        assert!(analyzer
            .recognize_shape(&points, 0.99, 1.0, 1.0, &[template])
            .is_none());
    }
}
