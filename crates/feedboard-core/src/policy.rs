//! Role-based permission policy.
//!
//! Every mutating session entry point asks [`can_perform`] before touching
//! state; there are no other role checks in the crate.

use serde::{Deserialize, Serialize};

/// A member's role on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Editor,
    Reviewer,
    Viewer,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Reviewer => "reviewer",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Actions guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Draw, move, resize or delete items; add, remove, rename or toggle layers.
    EditCanvas,
    UploadMedia,
    /// Create, tag or delete version snapshots.
    ManageVersions,
    RestoreVersion,
    CreateReview,
    UpdateReviewStatus,
    SetProjectStatus,
    ManageMembers,
}

impl Action {
    pub fn describe(self) -> &'static str {
        match self {
            Action::EditCanvas => "edit the canvas",
            Action::UploadMedia => "upload media",
            Action::ManageVersions => "manage versions",
            Action::RestoreVersion => "restore a version",
            Action::CreateReview => "create review items",
            Action::UpdateReviewStatus => "change review status",
            Action::SetProjectStatus => "set the project status",
            Action::ManageMembers => "manage members",
        }
    }
}

/// Whether `role` may perform `action`.
///
/// Only non-owner reviewers create review items. Viewers are read-only.
pub fn can_perform(role: Role, action: Action) -> bool {
    use Action::*;
    match role {
        Role::Owner => !matches!(action, CreateReview),
        Role::Editor => matches!(action, EditCanvas | UploadMedia | ManageVersions | RestoreVersion),
        Role::Reviewer => matches!(
            action,
            EditCanvas | UploadMedia | CreateReview | UpdateReviewStatus | SetProjectStatus
        ),
        Role::Viewer => false,
    }
}
