//! Review items with an append-only status log.

use crate::error::{CanvasError, CanvasResult};
use crate::project::UserId;
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for review items.
pub type ReviewId = Uuid;

/// Status of a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Todo,
    InProgress,
    Done,
    WontFix,
}

impl ReviewStatus {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;
        matches!(
            (self, next),
            (Todo, InProgress | Done | WontFix)
                | (InProgress, Todo | Done | WontFix)
                | (Done, Todo | InProgress)
                | (WontFix, Todo)
        )
    }

    pub fn is_open(self) -> bool {
        matches!(self, ReviewStatus::Todo | ReviewStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCategory {
    #[default]
    Design,
    Content,
    Bug,
    Usability,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// What a review item points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewAnchor {
    /// A point in canvas space.
    Canvas { position: Point },
    /// A task in the external task tracker.
    Task { task_id: String },
}

/// One entry of the status log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    /// `None` for the entry written at creation.
    pub from: Option<ReviewStatus>,
    pub to: ReviewStatus,
    pub changed_by: UserId,
    pub at: DateTime<Utc>,
}

/// A piece of review feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    id: ReviewId,
    pub description: String,
    pub category: ReviewCategory,
    pub priority: ReviewPriority,
    status: ReviewStatus,
    created_by: UserId,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<ReviewAnchor>,
    status_history: Vec<StatusChange>,
}

/// Fields supplied when creating a review item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReview {
    pub description: String,
    pub category: ReviewCategory,
    pub priority: ReviewPriority,
    pub anchor: Option<ReviewAnchor>,
}

impl NewReview {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.anchor = Some(ReviewAnchor::Canvas { position });
        self
    }

    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.anchor = Some(ReviewAnchor::Task { task_id: task_id.into() });
        self
    }

    pub fn priority(mut self, priority: ReviewPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn category(mut self, category: ReviewCategory) -> Self {
        self.category = category;
        self
    }
}

impl ReviewItem {
    /// Create a `Todo` item whose log holds the creation entry.
    pub fn create(new: NewReview, author: &UserId) -> CanvasResult<Self> {
        let description = new.description.trim();
        if description.is_empty() {
            return Err(CanvasError::validation("review description must not be empty"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            description: description.to_string(),
            category: new.category,
            priority: new.priority,
            status: ReviewStatus::Todo,
            created_by: author.clone(),
            created_at: now,
            anchor: new.anchor,
            status_history: vec![StatusChange {
                from: None,
                to: ReviewStatus::Todo,
                changed_by: author.clone(),
                at: now,
            }],
        })
    }

    pub fn id(&self) -> ReviewId {
        self.id
    }

    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The status log, oldest first. Entries are never rewritten.
    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    /// Move to a new status, appending to the log.
    pub fn transition(&mut self, to: ReviewStatus, by: &UserId) -> CanvasResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(CanvasError::validation(format!(
                "cannot move review from {:?} to {:?}",
                self.status, to
            )));
        }
        self.status_history.push(StatusChange {
            from: Some(self.status),
            to,
            changed_by: by.clone(),
            at: Utc::now(),
        });
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> UserId {
        "bob".to_string()
    }

    #[test]
    fn test_create_starts_in_todo_with_one_entry() {
        let item = ReviewItem::create(NewReview::new("Header overlaps logo").at(Point::new(40.0, 20.0)), &bob()).unwrap();
        assert_eq!(item.status(), ReviewStatus::Todo);
        assert_eq!(item.status_history().len(), 1);
        assert_eq!(item.status_history()[0].from, None);
        assert_eq!(item.anchor, Some(ReviewAnchor::Canvas { position: Point::new(40.0, 20.0) }));
    }

    #[test]
    fn test_empty_description_rejected() {
        assert!(matches!(ReviewItem::create(NewReview::new(" "), &bob()), Err(CanvasError::Validation(_))));
    }

    #[test]
    fn test_transitions_append() {
        let mut item = ReviewItem::create(NewReview::new("Fix copy").for_task("T-12"), &bob()).unwrap();
        item.transition(ReviewStatus::InProgress, &bob()).unwrap();
        item.transition(ReviewStatus::Done, &"alice".to_string()).unwrap();
        let log: Vec<_> = item.status_history().iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(
            log,
            vec![
                (None, ReviewStatus::Todo),
                (Some(ReviewStatus::Todo), ReviewStatus::InProgress),
                (Some(ReviewStatus::InProgress), ReviewStatus::Done),
            ]
        );
    }

    #[test]
    fn test_illegal_transition_leaves_item_untouched() {
        let mut item = ReviewItem::create(NewReview::new("Spacing"), &bob()).unwrap();
        item.transition(ReviewStatus::WontFix, &bob()).unwrap();
        let before = item.clone();
        assert!(item.transition(ReviewStatus::Done, &bob()).is_err());
        assert!(item.transition(ReviewStatus::WontFix, &bob()).is_err());
        assert_eq!(item, before);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(ReviewStatus::WontFix).unwrap(), "WONT_FIX");
        assert_eq!(serde_json::to_value(ReviewStatus::Todo).unwrap(), "TODO");
    }
}
