//! Shared server state: project documents, their change channels and stored
//! media.

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use feedboard_core::CanvasConfig;
use feedboard_core::project::{DocumentPatch, ProjectDocument, ProjectId};
use feedboard_core::protocol::ServerMessage;
use feedboard_core::upload::{self, UploadError, UploadedAsset};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Buffered change notifications per project.
pub const CHANNEL_CAPACITY: usize = 256;

/// One project document and the channel its changes go out on.
struct ProjectEntry {
    /// `None` until the first write.
    document: Option<ProjectDocument>,
    tx: broadcast::Sender<ServerMessage>,
}

impl ProjectEntry {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { document: None, tx }
    }
}

/// A stored media file.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub mime: String,
    pub bytes: Bytes,
}

/// Shared application state
pub struct AppState {
    projects: DashMap<ProjectId, ProjectEntry>,
    media: DashMap<String, StoredMedia>,
    config: CanvasConfig,
    /// Base URL that media URLs are built from.
    public_url: String,
}

impl AppState {
    pub fn new(config: CanvasConfig, public_url: impl Into<String>) -> Self {
        Self {
            projects: DashMap::new(),
            media: DashMap::new(),
            config,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register a subscriber, returning its change receiver and the current
    /// document, if the project has one.
    ///
    /// Both come from the same locked entry, so no change falls between them.
    pub fn subscribe(&self, project: &str) -> (broadcast::Receiver<ServerMessage>, Option<ProjectDocument>) {
        let entry = self.projects.entry(project.to_string()).or_insert_with(ProjectEntry::new);
        (entry.tx.subscribe(), entry.document.clone())
    }

    pub fn read(&self, project: &str) -> Option<ProjectDocument> {
        self.projects.get(project).and_then(|e| e.document.clone())
    }

    /// Apply a write and broadcast the whole resulting document to every
    /// subscriber, the writer included. Writes are applied in arrival order,
    /// so the last one wins.
    pub fn write(&self, project: &str, patch: DocumentPatch, merge: bool) -> ProjectDocument {
        let mut entry = self.projects.entry(project.to_string()).or_insert_with(ProjectEntry::new);
        let mut document = entry.document.take().unwrap_or_default();
        patch.apply_to(&mut document, merge);
        document.last_modified = Some(Utc::now());
        entry.document = Some(document.clone());

        let receivers = entry.tx.send(ServerMessage::Changed {
            project: project.to_string(),
            document: document.clone(),
        });
        debug!(
            "Write to {} (merge={}) delivered to {} subscribers",
            project,
            merge,
            receivers.unwrap_or(0)
        );
        document
    }

    pub fn subscriber_count(&self, project: &str) -> usize {
        self.projects.get(project).map(|e| e.tx.receiver_count()).unwrap_or(0)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Store an uploaded file. The type is checked against the whitelist
    /// before anything is stored.
    pub fn store_media(&self, project: &str, name: &str, mime: &str, bytes: Bytes) -> Result<UploadedAsset, UploadError> {
        let mime = mime.trim().to_ascii_lowercase();
        if upload::media_kind(&mime).is_none() || !self.config.is_mime_allowed(&mime) {
            return Err(UploadError::UnsupportedType(mime));
        }
        let name = sanitize(name);
        let path = format!("projects/{}/{}-{}", sanitize(project), Uuid::new_v4(), name);
        let asset = UploadedAsset {
            url: format!("{}/media/{}", self.public_url, path),
            path: path.clone(),
            name,
            mime: mime.clone(),
            size: bytes.len() as u64,
        };
        self.media.insert(path, StoredMedia { mime, bytes });
        info!("Stored media {} ({} bytes)", asset.path, asset.size);
        Ok(asset)
    }

    pub fn media(&self, path: &str) -> Option<StoredMedia> {
        self.media.get(path).map(|m| m.clone())
    }

    pub fn delete_media(&self, path: &str) -> Result<(), UploadError> {
        self.media
            .remove(path)
            .map(|_| info!("Deleted media {}", path))
            .ok_or_else(|| UploadError::NotFound(path.to_string()))
    }
}

/// Keep a name safe for use as a storage path segment.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
