//! Tool state machine.
//!
//! Interprets canvas-space pointer input for the active tool. The machine
//! never touches layers itself; it reports what happened through
//! [`ToolEffect`] and the session applies it.

mod editor;

pub use editor::{EditorKind, InlineEditor};

use crate::config::CanvasConfig;
use crate::geometry::{self, PathKind};
use crate::items::{ContentItem, ItemStyle};
use crate::project::UserId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Select,
    Pen,
    Rectangle,
    Circle,
    Arrow,
    Text,
    Comment,
}

impl ToolKind {
    /// Geometry drawn by drawing tools.
    pub fn path_kind(self) -> Option<PathKind> {
        match self {
            ToolKind::Pen => Some(PathKind::Stroke),
            ToolKind::Rectangle => Some(PathKind::Rectangle),
            ToolKind::Circle => Some(PathKind::Circle),
            ToolKind::Arrow => Some(PathKind::Arrow),
            ToolKind::Select | ToolKind::Text | ToolKind::Comment => None,
        }
    }

    pub fn is_drawing_tool(self) -> bool {
        self.path_kind().is_some()
    }

    fn editor_kind(self) -> Option<EditorKind> {
        match self {
            ToolKind::Text => Some(EditorKind::Text),
            ToolKind::Comment => Some(EditorKind::Comment),
            _ => None,
        }
    }

    /// Whether this tool creates content in the active layer.
    pub fn creates_content(self) -> bool {
        self != ToolKind::Select
    }
}

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    /// A drawing tool is collecting points for an item.
    Drawing { item: ContentItem },
    /// Text/comment tool pressed; becomes an editor if released as a click.
    Pressed { tool: ToolKind, origin: Point },
    /// An inline editor is open.
    Editing(InlineEditor),
}

/// Outcome of feeding an event to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolEffect {
    None,
    /// The in-progress item changed.
    Redraw,
    /// A drawing finished; the item goes into the active layer.
    Commit(ContentItem),
    /// A drawing ended with too few points and was dropped.
    Discarded,
    /// An inline editor opened at this canvas point.
    EditorOpened(Point),
}

/// Manages the current tool and its interaction state.
#[derive(Debug, Clone)]
pub struct ToolMachine {
    current_tool: ToolKind,
    state: ToolState,
    /// Style applied to new items.
    pub current_style: ItemStyle,
    click_tolerance: f64,
    simplify_tolerance: f64,
}

impl Default for ToolMachine {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl ToolMachine {
    pub fn new(cfg: &CanvasConfig) -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::Idle,
            current_style: ItemStyle::default(),
            click_tolerance: cfg.click_tolerance,
            simplify_tolerance: cfg.stroke_simplify_tolerance,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    /// Switch tools. Any interaction in progress is dropped without effect.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Drop any interaction in progress and keep the current tool.
    pub fn reset(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, ToolState::Idle)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, ToolState::Drawing { .. })
    }

    /// The item being drawn, for the render engine.
    pub fn in_progress(&self) -> Option<&ContentItem> {
        match &self.state {
            ToolState::Drawing { item } => Some(item),
            _ => None,
        }
    }

    pub fn editor(&self) -> Option<&InlineEditor> {
        match &self.state {
            ToolState::Editing(editor) => Some(editor),
            _ => None,
        }
    }

    pub fn editor_mut(&mut self) -> Option<&mut InlineEditor> {
        match &mut self.state {
            ToolState::Editing(editor) => Some(editor),
            _ => None,
        }
    }

    /// Pointer pressed at a canvas point.
    ///
    /// The caller has already checked that a writable layer is active.
    pub fn pointer_down(&mut self, point: Point) -> ToolEffect {
        if !self.is_idle() {
            return ToolEffect::None;
        }
        if let Some(kind) = self.current_tool.path_kind() {
            let item = ContentItem::path(kind, vec![point], self.current_style.clone());
            self.state = ToolState::Drawing { item };
            return ToolEffect::Redraw;
        }
        if self.current_tool.editor_kind().is_some() {
            self.state = ToolState::Pressed {
                tool: self.current_tool,
                origin: point,
            };
        }
        ToolEffect::None
    }

    /// Pointer moved to a canvas point.
    pub fn pointer_move(&mut self, point: Point) -> ToolEffect {
        match &mut self.state {
            ToolState::Drawing { item } => {
                if let Some(path) = item.path_data_mut() {
                    path.push(point);
                }
                ToolEffect::Redraw
            }
            ToolState::Pressed { origin, .. } => {
                if origin.distance(point) > self.click_tolerance {
                    // A drag is not a click.
                    self.state = ToolState::Idle;
                }
                ToolEffect::None
            }
            ToolState::Idle | ToolState::Editing(_) => ToolEffect::None,
        }
    }

    /// Pointer released at a canvas point.
    pub fn pointer_up(&mut self, point: Point) -> ToolEffect {
        match std::mem::take(&mut self.state) {
            ToolState::Drawing { item } => self.finalize(item),
            ToolState::Pressed { tool, origin } => {
                match tool.editor_kind() {
                    Some(kind) if origin.distance(point) <= self.click_tolerance => {
                        self.state = ToolState::Editing(InlineEditor::new(kind, origin));
                        ToolEffect::EditorOpened(origin)
                    }
                    _ => ToolEffect::None,
                }
            }
            other => {
                self.state = other;
                ToolEffect::None
            }
        }
    }

    /// Pointer left the canvas. A drawing in progress finalizes as on release.
    pub fn pointer_leave(&mut self) -> ToolEffect {
        match std::mem::take(&mut self.state) {
            ToolState::Drawing { item } => self.finalize(item),
            ToolState::Pressed { .. } => ToolEffect::None,
            other => {
                self.state = other;
                ToolEffect::None
            }
        }
    }

    /// Close the inline editor, returning the item to append, if any.
    ///
    /// Blank text counts as a cancel.
    pub fn complete_edit(&mut self, author: &UserId) -> Option<ContentItem> {
        match std::mem::take(&mut self.state) {
            ToolState::Editing(editor) => editor.finish(self.current_style.clone(), author),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Close the inline editor without producing anything.
    pub fn cancel_edit(&mut self) -> bool {
        if matches!(self.state, ToolState::Editing(_)) {
            self.state = ToolState::Idle;
            true
        } else {
            false
        }
    }

    fn finalize(&self, mut item: ContentItem) -> ToolEffect {
        let kind = item.path_kind();
        let Some(path) = item.path_data_mut() else {
            return ToolEffect::Discarded;
        };
        match kind {
            Some(PathKind::Stroke) => {
                path.points = geometry::simplify(&path.points, self.simplify_tolerance);
            }
            Some(_) => path.collapse_to_endpoints(),
            None => {}
        }
        if path.len() < 2 {
            log::debug!("Dropping {} with fewer than two points", item.item_type());
            return ToolEffect::Discarded;
        }
        if let Some(first) = path.first() {
            item.position = first;
        }
        ToolEffect::Commit(item)
    }
}
