//! Zoom-only presentation transform.
//!
//! Stored coordinates live in the fixed virtual canvas space; zoom is applied
//! on the way in (pointer events) and on the way out (rendering) only.

use kurbo::{Affine, Point, Rect, Size};

/// The current zoom of the canvas view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.1, 5.0)
    }
}

impl Viewport {
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            zoom: 1.0,
            min_zoom,
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom, clamped to the configured range. Non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Multiply the zoom by a factor.
    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    /// Convert a screen point to canvas space.
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new(screen.x / self.zoom, screen.y / self.zoom)
    }

    /// Convert a canvas point to screen space.
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(canvas.x * self.zoom, canvas.y * self.zoom)
    }

    pub fn canvas_rect_to_screen(&self, rect: Rect) -> Rect {
        self.transform().transform_rect_bbox(rect)
    }

    /// A screen-space distance expressed in canvas units.
    pub fn screen_len_to_canvas(&self, len: f64) -> f64 {
        len / self.zoom
    }

    /// Screen size of the whole virtual canvas.
    pub fn screen_size(&self, canvas: Size) -> Size {
        Size::new(canvas.width * self.zoom, canvas.height * self.zoom)
    }

    /// Transform from canvas to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom)
    }
}
