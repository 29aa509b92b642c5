//! Inline editor for text and comment items.

use crate::items::{CommentContent, ContentItem, ItemKind, ItemStyle, TextContent};
use crate::project::UserId;
use kurbo::Point;

/// What the inline editor produces on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Text,
    Comment,
}

/// An open inline editor anchored at a canvas point.
///
/// Nothing is written to any layer until [`InlineEditor::finish`] returns an item.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineEditor {
    pub kind: EditorKind,
    pub position: Point,
    pub text: String,
}

impl InlineEditor {
    pub fn new(kind: EditorKind, position: Point) -> Self {
        Self {
            kind,
            position,
            text: String::new(),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Build the item for this edit, or `None` if there is nothing to keep.
    pub fn finish(self, style: ItemStyle, author: &UserId) -> Option<ContentItem> {
        let text = self.text.trim_end().to_string();
        if text.trim().is_empty() {
            return None;
        }
        let kind = match self.kind {
            EditorKind::Text => ItemKind::Text(TextContent::new(text)),
            EditorKind::Comment => ItemKind::Comment(CommentContent::new(author.clone(), text)),
        };
        Some(ContentItem::new(self.position, style, kind))
    }
}
