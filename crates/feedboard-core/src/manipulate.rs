//! Drag and resize of individual items.
//!
//! The controller only computes new item states. The session writes them into
//! the layer store, queues the debounced commit and issues the final write
//! when the gesture ends.

use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::items::{ContentItem, ItemId};
use crate::tools::Modifiers;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight];

    fn is_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }

    fn of(self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }
}

/// Type of manipulation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Corner handle for resizing.
    Corner(Corner),
}

/// A handle with its position in canvas space.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    /// `tolerance` should already be divided by zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// Resize handles of an item. Only sized items have any.
pub fn handles(item: &ContentItem) -> Vec<Handle> {
    if !item.is_resizable() {
        return Vec::new();
    }
    let bounds = item.bounds();
    Corner::ALL
        .iter()
        .map(|&corner| Handle {
            position: corner.of(bounds),
            kind: HandleKind::Corner(corner),
        })
        .collect()
}

/// Find the handle under a canvas point.
pub fn hit_test_handles(item: &ContentItem, point: Point, tolerance: f64) -> Option<HandleKind> {
    handles(item)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

/// Compute the new rect of a corner resize.
///
/// The opposite corner stays fixed. With `keep_aspect` the axis whose size
/// changed most drives the other. Sizes never drop below `min`.
pub fn resize_rect(original: Rect, corner: Corner, delta: Vec2, keep_aspect: bool, min: Size) -> Rect {
    let dx = if corner.is_left() { -delta.x } else { delta.x };
    let dy = if corner.is_top() { -delta.y } else { delta.y };
    let mut width = original.width() + dx;
    let mut height = original.height() + dy;

    if keep_aspect && original.height() > 0.0 && original.width() > 0.0 {
        let aspect = original.width() / original.height();
        if dx.abs() >= dy.abs() {
            height = width / aspect;
        } else {
            width = height * aspect;
        }
        if width < min.width {
            width = min.width;
            height = width / aspect;
        }
        if height < min.height {
            height = min.height;
            width = height * aspect;
        }
    } else {
        width = width.max(min.width);
        height = height.max(min.height);
    }

    let x0 = if corner.is_left() { original.x1 - width } else { original.x0 };
    let y0 = if corner.is_top() { original.y1 - height } else { original.y0 };
    Rect::new(x0, y0, x0 + width, y0 + height)
}

/// What the current gesture does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Move with the pointer; `offset` is item center minus pointer at start.
    Drag { offset: Vec2 },
    /// Resize from a corner.
    Resize {
        corner: Corner,
        start_pointer: Point,
        original: Rect,
    },
}

/// State of an active manipulation.
#[derive(Debug, Clone)]
pub struct ManipulationState {
    pub item_id: ItemId,
    pub gesture: Gesture,
    /// The item as it was when the gesture started.
    pub original_item: ContentItem,
}

/// Drives one drag or resize gesture at a time.
#[derive(Debug, Clone)]
pub struct ManipulationController {
    state: Option<ManipulationState>,
    handle_hit_tolerance: f64,
    cfg: CanvasConfig,
}

impl ManipulationController {
    pub fn new(cfg: &CanvasConfig) -> Self {
        Self {
            state: None,
            handle_hit_tolerance: cfg.handle_hit_tolerance,
            cfg: cfg.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&ManipulationState> {
        self.state.as_ref()
    }

    pub fn active_item(&self) -> Option<ItemId> {
        self.state.as_ref().map(|s| s.item_id)
    }

    /// Handle hit radius in canvas units at the given zoom.
    pub fn handle_tolerance(&self, zoom: f64) -> f64 {
        self.handle_hit_tolerance / zoom.max(f64::EPSILON)
    }

    /// Start a gesture for a pointer press on `item`.
    ///
    /// A press on a resize handle starts a resize, anywhere else a drag.
    pub fn begin(&mut self, item: &ContentItem, pointer: Point, zoom: f64) -> Gesture {
        let tolerance = self.handle_tolerance(zoom);
        let gesture = match hit_test_handles(item, pointer, tolerance) {
            Some(HandleKind::Corner(corner)) => Gesture::Resize {
                corner,
                start_pointer: pointer,
                original: item.bounds(),
            },
            None => Gesture::Drag {
                offset: item.center() - pointer,
            },
        };
        self.state = Some(ManipulationState {
            item_id: item.id(),
            gesture,
            original_item: item.clone(),
        });
        gesture
    }

    /// Start a resize from an explicit corner.
    pub fn begin_resize(&mut self, item: &ContentItem, corner: Corner, pointer: Point) -> CanvasResult<()> {
        if !item.is_resizable() {
            return Err(CanvasError::validation(format!("{} items cannot be resized", item.item_type())));
        }
        self.state = Some(ManipulationState {
            item_id: item.id(),
            gesture: Gesture::Resize {
                corner,
                start_pointer: pointer,
                original: item.bounds(),
            },
            original_item: item.clone(),
        });
        Ok(())
    }

    /// Compute the item for a pointer move.
    ///
    /// `current` is the item as it is in the layer store now, so edits that
    /// arrived mid-gesture (style, text) are kept. Returns `None` if no
    /// gesture is active for that item.
    pub fn update(&self, current: &ContentItem, pointer: Point, modifiers: Modifiers) -> Option<ContentItem> {
        let state = self.state.as_ref().filter(|s| s.item_id == current.id())?;
        let mut item = current.clone();
        match state.gesture {
            Gesture::Drag { offset } => item.move_center_to(pointer + offset),
            Gesture::Resize {
                corner,
                start_pointer,
                original,
            } => {
                let keep_aspect = item.locks_aspect_by_default() || modifiers.shift;
                let rect = resize_rect(
                    original,
                    corner,
                    pointer - start_pointer,
                    keep_aspect,
                    item.min_size(&self.cfg),
                );
                item.set_rect(rect);
            }
        }
        Some(item)
    }

    /// Finish the gesture, returning the state that was active.
    pub fn end(&mut self) -> Option<ManipulationState> {
        self.state.take()
    }

    /// Abandon the gesture without a final commit.
    pub fn cancel(&mut self) {
        if let Some(state) = self.state.take() {
            log::debug!("Manipulation of {} cancelled", state.item_id);
        }
    }

    /// Drop the gesture if it targets an item that no longer exists.
    pub fn forget_item(&mut self, id: ItemId) -> bool {
        if self.active_item() == Some(id) {
            self.state = None;
            true
        } else {
            false
        }
    }
}
