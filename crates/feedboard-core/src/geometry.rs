//! Drawing primitives shared by rendering and persistence.
//!
//! Stored items only keep their sampled points; everything drawn is derived
//! from those points here, so two clients rendering the same document produce
//! the same geometry.

use kurbo::{BezPath, Circle, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};

/// Flattening tolerance used when converting curves to paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Kinds of paintable geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Stroke,
    Rectangle,
    Circle,
    Arrow,
}

impl PathKind {
    /// Whether the interior can be filled.
    pub fn is_closed(self) -> bool {
        matches!(self, PathKind::Rectangle | PathKind::Circle)
    }
}

/// Arrowhead dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowHead {
    /// Length of each barb.
    pub length: f64,
    /// Angle between shaft and barb, in radians.
    pub angle: f64,
}

impl Default for ArrowHead {
    fn default() -> Self {
        Self {
            length: 15.0,
            angle: std::f64::consts::FRAC_PI_6,
        }
    }
}

/// Rectangle spanned by two opposite corners, with non-negative size.
pub fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

/// Circle centered on the first point passing through the second.
pub fn circle_from_points(center: Point, edge: Point) -> (Point, f64) {
    (center, center.distance(edge))
}

/// Endpoints of the two arrowhead barbs at `tip`.
///
/// Each barb leaves the tip at `head.angle` on either side of the reversed
/// shaft direction.
pub fn arrowhead(tail: Point, tip: Point, head: ArrowHead) -> (Point, Point) {
    let angle = (tip.y - tail.y).atan2(tip.x - tail.x);
    let barb = |offset: f64| {
        let a = angle + offset;
        Point::new(tip.x - head.length * a.cos(), tip.y - head.length * a.sin())
    };
    (barb(-head.angle), barb(head.angle))
}

/// Build the path for a paintable item from its stored points.
///
/// Rectangles use the first and last points as opposite corners, circles use
/// the first point as center and the distance to the last as radius, arrows
/// draw the shaft plus two barbs. Fewer than two points yield an empty path.
pub fn shape_path(kind: PathKind, points: &[Point], head: ArrowHead) -> BezPath {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return BezPath::new();
    };
    if points.len() < 2 {
        return BezPath::new();
    }

    match kind {
        PathKind::Stroke => polyline(points),
        PathKind::Rectangle => normalized_rect(first, last).to_path(PATH_TOLERANCE),
        PathKind::Circle => {
            let (center, radius) = circle_from_points(first, last);
            Circle::new(center, radius).to_path(PATH_TOLERANCE)
        }
        PathKind::Arrow => {
            let mut path = BezPath::new();
            path.move_to(first);
            path.line_to(last);
            if first != last {
                let (left, right) = arrowhead(first, last, head);
                path.move_to(last);
                path.line_to(left);
                path.move_to(last);
                path.line_to(right);
            }
            path
        }
    }
}

/// Open polyline through the given points.
pub fn polyline(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.move_to(*first);
        for p in iter {
            path.line_to(*p);
        }
    }
    path
}

/// Axis-aligned bounds of a point list.
pub fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Bounds of the geometry a paintable item draws.
pub fn shape_bounds(kind: PathKind, points: &[Point], head: ArrowHead) -> Rect {
    match (kind, points.first(), points.last()) {
        (PathKind::Circle, Some(&c), Some(&e)) => {
            let (center, r) = circle_from_points(c, e);
            Rect::new(center.x - r, center.y - r, center.x + r, center.y + r)
        }
        (PathKind::Arrow, Some(&tail), Some(&tip)) if points.len() >= 2 => {
            let (left, right) = arrowhead(tail, tip, head);
            points_bounds(points).union_pt(left).union_pt(right)
        }
        _ => points_bounds(points),
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    point.distance(proj)
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => point.distance(*only),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Ramer-Douglas-Peucker simplification of a sampled stroke.
///
/// The first and last samples are always kept.
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 || tolerance <= 0.0 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(*point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        let mut left = simplify(&points[..=max_index], tolerance);
        let right = simplify(&points[max_index..], tolerance);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    let line_len_sq = dx * dx + dy * dy;
    if line_len_sq < f64::EPSILON {
        return point.distance(line_start);
    }
    // Twice the triangle area over the base.
    let area2 = ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs();
    area2 / line_len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalized_rect_from_any_corner() {
        let r = normalized_rect(Point::new(300.0, 250.0), Point::new(100.0, 100.0));
        assert!(close(r.x0, 100.0) && close(r.y0, 100.0));
        assert!(close(r.width(), 200.0) && close(r.height(), 150.0));
    }

    #[test]
    fn test_circle_radius() {
        let (c, r) = circle_from_points(Point::new(10.0, 10.0), Point::new(13.0, 14.0));
        assert_eq!(c, Point::new(10.0, 10.0));
        assert!(close(r, 5.0));
    }

    #[test]
    fn test_arrowhead_barbs_at_thirty_degrees() {
        let head = ArrowHead::default();
        let (left, right) = arrowhead(Point::new(0.0, 0.0), Point::new(100.0, 0.0), head);
        let dx = head.length * head.angle.cos();
        let dy = head.length * head.angle.sin();
        assert!(close(left.x, 100.0 - dx) && close(left.y, dy));
        assert!(close(right.x, 100.0 - dx) && close(right.y, -dy));
        assert!(close(left.distance(Point::new(100.0, 0.0)), 15.0));
    }

    #[test]
    fn test_shape_path_needs_two_points() {
        let path = shape_path(PathKind::Rectangle, &[Point::new(1.0, 1.0)], ArrowHead::default());
        assert!(path.elements().is_empty());
    }

    #[test]
    fn test_rectangle_path_bounds() {
        let pts = [Point::new(100.0, 100.0), Point::new(300.0, 250.0)];
        let path = shape_path(PathKind::Rectangle, &pts, ArrowHead::default());
        let b = path.bounding_box();
        assert!(close(b.width(), 200.0) && close(b.height(), 150.0));
    }

    #[test]
    fn test_shape_path_is_deterministic() {
        let pts = vec![Point::new(5.0, 5.0), Point::new(40.0, 90.0)];
        for kind in [PathKind::Stroke, PathKind::Rectangle, PathKind::Circle, PathKind::Arrow] {
            let a = shape_path(kind, &pts, ArrowHead::default());
            let b = shape_path(kind, &pts.clone(), ArrowHead::default());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_arrow_bounds_include_barbs() {
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let b = shape_bounds(PathKind::Arrow, &pts, ArrowHead::default());
        assert!(b.y0 < 0.0 && b.y1 > 0.0);
    }

    #[test]
    fn test_polyline_distance() {
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        assert!(close(point_to_polyline_dist(Point::new(50.0, 5.0), &pts), 5.0));
        assert!(point_to_polyline_dist(Point::ZERO, &[]).is_infinite());
    }

    #[test]
    fn test_simplify() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.1),
            Point::new(4.0, 0.0),
        ];
        let out = simplify(&pts, 0.5);
        assert_eq!(out, vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)]);
        assert_eq!(simplify(&pts, 0.0).len(), 5);
    }
}
