//! Vello-based painter.

use crate::renderer::Painter;
use kurbo::{Affine, BezPath, Rect, Size, Stroke};
use peniko::{Color, Fill};
use vello::Scene;

/// Painter that records into a Vello scene for GPU rendering.
pub struct VelloPainter {
    /// The Vello scene being built.
    scene: Scene,
}

impl Default for VelloPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloPainter {
    pub fn new() -> Self {
        Self { scene: Scene::new() }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the built scene, leaving an empty one behind.
    pub fn take_scene(&mut self) -> Scene {
        std::mem::replace(&mut self.scene, Scene::new())
    }
}

impl Painter for VelloPainter {
    fn clear(&mut self, color: Color, size: Size) {
        self.scene.reset();
        let background = Rect::from_origin_size((0.0, 0.0), size);
        self.scene.fill(Fill::NonZero, Affine::IDENTITY, color, None, &background);
    }

    fn fill_path(&mut self, path: &BezPath, transform: Affine, color: Color) {
        self.scene.fill(Fill::NonZero, transform, color, None, path);
    }

    fn stroke_path(&mut self, path: &BezPath, transform: Affine, color: Color, width: f64) {
        self.scene.stroke(&Stroke::new(width), transform, color, None, path);
    }
}
