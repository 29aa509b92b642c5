//! Projects and the shared project document.

use crate::layer::Layer;
use crate::policy::Role;
use crate::review::ReviewItem;
use crate::versions::VersionSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a user, as issued by the authentication service.
pub type UserId = String;

/// Identifier of a project document in the remote store.
pub type ProjectId = String;

/// Approval status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    ChangesRequested,
}

/// Project metadata and membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner: UserId,
    /// Roles of non-owner members.
    #[serde(default)]
    pub members: BTreeMap<UserId, Role>,
}

impl Project {
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>, owner: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
            members: BTreeMap::new(),
        }
    }

    pub fn with_member(mut self, user: impl Into<UserId>, role: Role) -> Self {
        self.members.insert(user.into(), role);
        self
    }

    /// The user's role, or `None` for non-members.
    pub fn role_of(&self, user: &str) -> Option<Role> {
        if self.owner == user {
            Some(Role::Owner)
        } else {
            self.members.get(user).copied()
        }
    }
}

/// The remote document shared by every client of a project.
///
/// Each write replaces whole fields; there is no finer-grained merge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub versions: Vec<VersionSnapshot>,
    #[serde(default)]
    pub reviews: Vec<ReviewItem>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// A partial or full project document sent with a write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<VersionSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl DocumentPatch {
    pub fn layers(layers: Vec<Layer>) -> Self {
        Self {
            layers: Some(layers),
            ..Self::default()
        }
    }

    pub fn versions(versions: Vec<VersionSnapshot>) -> Self {
        Self {
            versions: Some(versions),
            ..Self::default()
        }
    }

    pub fn reviews(reviews: Vec<ReviewItem>) -> Self {
        Self {
            reviews: Some(reviews),
            ..Self::default()
        }
    }

    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A patch carrying every field of `doc`.
    pub fn full(doc: ProjectDocument) -> Self {
        Self {
            layers: Some(doc.layers),
            versions: Some(doc.versions),
            reviews: Some(doc.reviews),
            status: Some(doc.status),
            last_modified: doc.last_modified,
        }
    }

    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = Some(layers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_none()
            && self.versions.is_none()
            && self.reviews.is_none()
            && self.status.is_none()
            && self.last_modified.is_none()
    }

    /// Apply this patch to a document.
    ///
    /// With `merge` only the present fields are overwritten; without it the
    /// document is replaced and absent fields fall back to their defaults.
    pub fn apply_to(self, doc: &mut ProjectDocument, merge: bool) {
        if !merge {
            *doc = ProjectDocument::default();
        }
        if let Some(layers) = self.layers {
            doc.layers = layers;
        }
        if let Some(versions) = self.versions {
            doc.versions = versions;
        }
        if let Some(reviews) = self.reviews {
            doc.reviews = reviews;
        }
        if let Some(status) = self.status {
            doc.status = status;
        }
        if self.last_modified.is_some() {
            doc.last_modified = self.last_modified;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_of() {
        let project = Project::new("p1", "Landing page", "alice")
            .with_member("bob", Role::Reviewer)
            .with_member("carol", Role::Viewer);
        assert_eq!(project.role_of("alice"), Some(Role::Owner));
        assert_eq!(project.role_of("bob"), Some(Role::Reviewer));
        assert_eq!(project.role_of("mallory"), None);
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut doc = ProjectDocument {
            layers: vec![Layer::new("A")],
            status: ProjectStatus::Approved,
            ..ProjectDocument::default()
        };
        DocumentPatch::reviews(Vec::new()).apply_to(&mut doc, true);
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.status, ProjectStatus::Approved);
    }

    #[test]
    fn test_replace_resets_absent_fields() {
        let mut doc = ProjectDocument {
            layers: vec![Layer::new("A")],
            status: ProjectStatus::Approved,
            ..ProjectDocument::default()
        };
        DocumentPatch::layers(vec![Layer::new("B"), Layer::new("C")]).apply_to(&mut doc, false);
        assert_eq!(doc.layers.len(), 2);
        assert_eq!(doc.status, ProjectStatus::Pending);
    }

    #[test]
    fn test_document_wire_names() {
        let doc = ProjectDocument {
            status: ProjectStatus::ChangesRequested,
            last_modified: Some(Utc::now()),
            ..ProjectDocument::default()
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["status"], "CHANGES_REQUESTED");
        assert!(json.get("lastModified").is_some());

        let patch = serde_json::to_value(DocumentPatch::status(ProjectStatus::Approved)).unwrap();
        assert_eq!(patch.as_object().unwrap().len(), 1);
    }
}
