//! Version snapshots of the layer state.

use crate::error::{CanvasError, CanvasResult};
use crate::layer::{self, Layer};
use crate::project::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for version snapshots.
pub type VersionId = Uuid;

/// Fixed tag vocabulary for snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionTag {
    Final,
    Draft,
    Review,
    Approved,
    Rejected,
    InProgress,
}

impl VersionTag {
    pub const ALL: [VersionTag; 6] = [
        VersionTag::Final,
        VersionTag::Draft,
        VersionTag::Review,
        VersionTag::Approved,
        VersionTag::Rejected,
        VersionTag::InProgress,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VersionTag::Final => "Final",
            VersionTag::Draft => "Draft",
            VersionTag::Review => "Review",
            VersionTag::Approved => "Approved",
            VersionTag::Rejected => "Rejected",
            VersionTag::InProgress => "In Progress",
        }
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An immutable deep copy of all layers at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    id: VersionId,
    created_at: DateTime<Utc>,
    description: String,
    #[serde(default)]
    tags: BTreeSet<VersionTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_by: Option<UserId>,
    layers: Vec<Layer>,
}

impl VersionSnapshot {
    fn capture(description: String, tags: BTreeSet<VersionTag>, layers: &[Layer], author: Option<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            description,
            tags,
            created_by: author,
            layers: layer::structural_clone(layers),
        }
    }

    pub fn id(&self) -> VersionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &BTreeSet<VersionTag> {
        &self.tags
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn has_tag(&self, tag: VersionTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// The project's list of snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionHistory {
    versions: Vec<VersionSnapshot>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(versions: Vec<VersionSnapshot>) -> Self {
        Self { versions }
    }

    pub fn as_slice(&self) -> &[VersionSnapshot] {
        &self.versions
    }

    pub fn to_vec(&self) -> Vec<VersionSnapshot> {
        self.versions.clone()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Capture `layers` into a new snapshot.
    pub fn create(
        &mut self,
        description: &str,
        tags: impl IntoIterator<Item = VersionTag>,
        layers: &[Layer],
        author: Option<UserId>,
    ) -> CanvasResult<&VersionSnapshot> {
        let description = description.trim();
        if description.is_empty() {
            return Err(CanvasError::validation("version description must not be empty"));
        }
        let snapshot = VersionSnapshot::capture(description.to_string(), tags.into_iter().collect(), layers, author);
        log::info!("Created version {} ({})", snapshot.id, snapshot.description);
        self.versions.push(snapshot);
        let index = self.versions.len() - 1;
        Ok(&self.versions[index])
    }

    /// Snapshots ordered by creation time, oldest first.
    pub fn list(&self) -> Vec<&VersionSnapshot> {
        let mut list: Vec<_> = self.versions.iter().collect();
        list.sort_by_key(|v| v.created_at);
        list
    }

    /// Snapshots carrying `tag`, ordered by creation time.
    pub fn filter_by_tag(&self, tag: VersionTag) -> Vec<&VersionSnapshot> {
        self.list().into_iter().filter(|v| v.has_tag(tag)).collect()
    }

    pub fn find(&self, id: VersionId) -> Option<&VersionSnapshot> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Deep copy of a snapshot's layers, ready to become live state.
    pub fn restore_layers(&self, id: VersionId) -> CanvasResult<Vec<Layer>> {
        self.find(id)
            .map(|v| layer::structural_clone(&v.layers))
            .ok_or_else(|| CanvasError::not_found(format!("version {id}")))
    }

    /// Remove a snapshot permanently.
    pub fn delete(&mut self, id: VersionId) -> CanvasResult<VersionSnapshot> {
        let index = self
            .versions
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| CanvasError::not_found(format!("version {id}")))?;
        Ok(self.versions.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PathKind;
    use crate::items::{ContentItem, ItemStyle};
    use kurbo::Point;

    const NO_TAGS: [VersionTag; 0] = [];

    fn layers() -> Vec<Layer> {
        let mut layer = Layer::new("Sketch");
        layer.items.push(ContentItem::path(
            PathKind::Circle,
            vec![Point::new(10.0, 10.0), Point::new(20.0, 10.0)],
            ItemStyle::default(),
        ));
        vec![layer, Layer::new("Notes")]
    }

    #[test]
    fn test_create_and_restore_round_trip() {
        let live = layers();
        let mut history = VersionHistory::new();
        let id = history.create("First pass", [VersionTag::Draft], &live, None).unwrap().id();
        assert_eq!(history.restore_layers(id).unwrap(), live);
    }

    #[test]
    fn test_snapshot_is_independent_of_live_state() {
        let mut live = layers();
        let mut history = VersionHistory::new();
        let id = history.create("Before edit", NO_TAGS, &live, None).unwrap().id();

        live[0].items.clear();
        live[0].name = "Changed".to_string();
        let snapshot = history.find(id).unwrap();
        assert_eq!(snapshot.layers()[0].items.len(), 1);
        assert_eq!(snapshot.layers()[0].name, "Sketch");
    }

    #[test]
    fn test_empty_description_rejected() {
        let mut history = VersionHistory::new();
        assert!(matches!(history.create("  ", NO_TAGS, &[], None), Err(CanvasError::Validation(_))));
        assert!(history.is_empty());
    }

    #[test]
    fn test_filter_by_tag() {
        let mut history = VersionHistory::new();
        history.create("a", [VersionTag::Draft], &[], None).unwrap();
        history.create("b", [VersionTag::Final, VersionTag::Approved], &[], None).unwrap();
        history.create("c", [VersionTag::Draft, VersionTag::InProgress], &[], None).unwrap();

        let drafts: Vec<_> = history.filter_by_tag(VersionTag::Draft).iter().map(|v| v.description()).collect();
        assert_eq!(drafts, vec!["a", "c"]);
        assert!(history.filter_by_tag(VersionTag::Rejected).is_empty());
    }

    #[test]
    fn test_delete() {
        let mut history = VersionHistory::new();
        let id = history.create("a", NO_TAGS, &[], None).unwrap().id();
        history.delete(id).unwrap();
        assert!(history.find(id).is_none());
        assert!(matches!(history.delete(id), Err(CanvasError::NotFound(_))));
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(VersionTag::InProgress.to_string(), "In Progress");
        assert_eq!(serde_json::to_value(VersionTag::InProgress).unwrap(), "in_progress");
    }
}
