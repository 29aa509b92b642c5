//! Error taxonomy for canvas operations.

use crate::sync::SyncError;
use crate::upload::UploadError;
use thiserror::Error;

/// Errors surfaced by the canvas session.
///
/// Validation and permission errors are raised before any state changes.
/// Remote errors carry the underlying store failure.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Bad input (empty name, unsupported file type, no active layer).
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The current role may not perform the action, or the layer is locked.
    #[error("Permission denied: {0}")]
    Permission(String),
    /// A remote commit failed.
    #[error("Remote write failed: {0}")]
    RemoteWrite(#[source] SyncError),
    /// Reading or subscribing to the remote document failed.
    #[error("Remote read failed: {0}")]
    RemoteRead(#[source] SyncError),
    /// A referenced layer, item, version or review does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The media upload service failed.
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl CanvasError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the failure happened before any state was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Permission(_) | Self::NotFound(_))
    }
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;
