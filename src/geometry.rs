//! Minimal 2D geometry primitives and the pluggable geometry seam.
//!
//! Polygon-point tests, hull computation, path-data string construction
//! and compass-heading mapping are treated as external collaborators
//! (see the crate's governing specification): the engine only ever
//! calls through the [`GeometryProvider`] trait. [`DefaultGeometry`] is
//! a small bundled implementation so the crate is self-testable without
//! a host supplying its own; a production host is expected to bring a
//! more sophisticated provider.

use std::fmt;

/// A point in SVG user-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Euclidean distance to `other`.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    /// Chebyshev (chessboard) distance to `other`: `max(|dx|, |dy|)`.
    ///
    /// Used by the ink engine's point-deduplication filter (spec §4.6).
    #[inline]
    #[must_use]
    pub fn chessboard_distance(self, other: Point) -> f64 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Vector length from the origin.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Midpoint between `self` and `other`.
    #[inline]
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Point;
    #[inline]
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Geometric utility operations the engine needs but never implements
/// itself: polygon-point tests, hull computation, path-data rendering,
/// and compass-heading mapping.
pub trait GeometryProvider: Send + Sync {
    /// Computes the convex hull of `points`, returned in counter-clockwise
    /// order starting from the lowest, then leftmost, point.
    fn convex_hull(&self, points: &[Point]) -> Vec<Point>;

    /// Computes a concave ("alpha shape"-like) hull of `points`. A
    /// provider unable to compute a true concave hull may fall back to
    /// the convex hull.
    fn concave_hull(&self, points: &[Point]) -> Vec<Point>;

    /// Tests whether `point` lies within `polygon` (even-odd rule).
    fn point_in_polygon(&self, point: Point, polygon: &[Point]) -> bool;

    /// Renders an SVG path `d` attribute string from `points`.
    fn path_data(&self, points: &[Point], closed: bool) -> String;

    /// Maps the direction from `from` to `to` onto an 8-point compass
    /// heading (`"N"`, `"NE"`, `"E"`, ...).
    fn compass_heading(&self, from: Point, to: Point) -> &'static str;
}

/// Small bundled [`GeometryProvider`] good enough for tests and simple
/// hosts. Uses Andrew's monotone chain for the convex hull and a naive
/// ray-casting point-in-polygon test.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGeometry;

impl GeometryProvider for DefaultGeometry {
    fn convex_hull(&self, points: &[Point]) -> Vec<Point> {
        monotone_chain_hull(points)
    }

    fn concave_hull(&self, points: &[Point]) -> Vec<Point> {
        // No true concave-hull algorithm is bundled; the convex hull is
        // a conservative, always-valid fallback.
        monotone_chain_hull(points)
    }

    fn point_in_polygon(&self, point: Point, polygon: &[Point]) -> bool {
        if polygon.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = polygon.len() - 1;
        for i in 0..polygon.len() {
            let pi = polygon[i];
            let pj = polygon[j];
            let intersects = (pi.y > point.y) != (pj.y > point.y)
                && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    fn path_data(&self, points: &[Point], closed: bool) -> String {
        let mut d = String::new();
        for (i, p) in points.iter().enumerate() {
            if i == 0 {
                d.push_str(&format!("M{:.2},{:.2}", p.x, p.y));
            } else {
                d.push_str(&format!(" L{:.2},{:.2}", p.x, p.y));
            }
        }
        if closed {
            d.push_str(" Z");
        }
        d
    }

    fn compass_heading(&self, from: Point, to: Point) -> &'static str {
        let delta = to - from;
        if delta.x == 0.0 && delta.y == 0.0 {
            return "N";
        }
        // SVG y grows downward; compass north is -y.
        let angle = delta.y.atan2(delta.x).to_degrees();
        let heading = (angle + 90.0 + 360.0) % 360.0;
        const DIRS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
        let idx = (((heading + 22.5) / 45.0).floor() as usize) % 8;
        DIRS[idx]
    }
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn monotone_chain_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap().then(a.y.partial_cmp(&b.y).unwrap()));
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
