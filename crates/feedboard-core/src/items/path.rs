//! Sampled point data for strokes and parametric shapes.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Ordered sample points in canvas space.
///
/// Finalized items always carry at least two points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    pub points: Vec<Point>,
}

impl PathData {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }

    /// Keep only the first and last samples.
    pub fn collapse_to_endpoints(&mut self) {
        if let (Some(first), Some(last)) = (self.first(), self.last()) {
            self.points = vec![first, last];
        }
    }
}
