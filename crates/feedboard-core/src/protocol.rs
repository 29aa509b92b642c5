//! Wire protocol between clients and the document server.
//!
//! Messages are JSON objects tagged by `type`.

use crate::project::{DocumentPatch, ProjectDocument, ProjectId};
use serde::{Deserialize, Serialize};

/// Messages sent to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving changes for a project
    Subscribe { project: ProjectId },
    /// Stop receiving changes for a project
    Unsubscribe { project: ProjectId },
    /// Write a partial or full document
    Write {
        project: ProjectId,
        patch: DocumentPatch,
        #[serde(default)]
        merge: bool,
    },
}

/// Messages received from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription confirmed, with the current document
    Subscribed {
        project: ProjectId,
        document: ProjectDocument,
    },
    /// The document changed; carries the whole new document
    Changed {
        project: ProjectId,
        document: ProjectDocument,
    },
    /// A request failed
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project: Option<ProjectId>,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(project: Option<ProjectId>, message: impl Into<String>) -> Self {
        Self::Error {
            project,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectStatus;

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Write {
            project: "p1".to_string(),
            patch: DocumentPatch::status(ProjectStatus::Approved),
            merge: true,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "write");
        assert_eq!(json["patch"]["status"], "APPROVED");
        assert_eq!(json["merge"], true);
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"changed","project":"p1","document":{"layers":[],"status":"PENDING"}}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ServerMessage::Changed { project, document } => {
                assert_eq!(project, "p1");
                assert!(document.layers.is_empty());
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_merge_defaults_to_false() {
        let json = r#"{"type":"write","project":"p1","patch":{}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Write { merge: false, .. }));
    }
}
