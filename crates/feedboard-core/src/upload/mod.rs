//! Media upload service boundary.
//!
//! Only the returned URL ends up in a content item; bytes never do.

#[cfg(not(target_arch = "wasm32"))]
mod http;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpUploader;

use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::items::{ContentItem, EmbedContent, ItemKind, ItemStyle};
use crate::sync::BoxFuture;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Upload service errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Upload service error: {0}")]
    Service(String),
}

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// What the upload service returns for a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    /// Storage path, used for deletion.
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
}

/// How an uploaded asset is shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Svg,
    File,
}

/// Classify a MIME type. Unknown types map to `None`.
pub fn media_kind(mime: &str) -> Option<MediaKind> {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/png" | "image/jpeg" => Some(MediaKind::Image),
        "image/svg+xml" => Some(MediaKind::Svg),
        "application/pdf" => Some(MediaKind::File),
        _ => None,
    }
}

/// Check a file type against the whitelist. Runs before any network call.
pub fn validate_mime(cfg: &CanvasConfig, mime: &str) -> CanvasResult<MediaKind> {
    match media_kind(mime) {
        Some(kind) if cfg.is_mime_allowed(mime) => Ok(kind),
        _ => Err(CanvasError::validation(format!("file type '{mime}' is not supported"))),
    }
}

/// Build the content item for an uploaded asset centered on `center`.
pub fn asset_item(asset: &UploadedAsset, kind: MediaKind, center: Point, cfg: &CanvasConfig) -> ContentItem {
    let side = cfg.min_media_size * 2.0;
    let size = Size::new(side, side);
    let embed = EmbedContent::new(&asset.url, &asset.name, &asset.mime, size).with_storage_path(&asset.path);
    let kind = match kind {
        MediaKind::Image => ItemKind::Image(embed),
        MediaKind::Svg => ItemKind::Svg(embed),
        MediaKind::File => ItemKind::File(embed),
    };
    let origin = Point::new(center.x - side / 2.0, center.y - side / 2.0);
    ContentItem::new(origin, ItemStyle::default(), kind)
}

/// The media upload service.
pub trait MediaUploader: Send + Sync {
    fn upload(&self, file: UploadFile, project: &str) -> BoxFuture<'_, Result<UploadedAsset, UploadError>>;

    /// Remove a stored asset.
    fn delete(&self, path: &str) -> BoxFuture<'_, Result<(), UploadError>>;
}

/// In-memory upload service for tests.
#[derive(Debug)]
pub struct MemoryUploader {
    base_url: String,
    assets: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl Default for MemoryUploader {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

impl MemoryUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            assets: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of upload and delete requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.assets.lock().map(|a| a.contains_key(path)).unwrap_or(false)
    }
}

impl MediaUploader for MemoryUploader {
    fn upload(&self, file: UploadFile, project: &str) -> BoxFuture<'_, Result<UploadedAsset, UploadError>> {
        let project = project.to_string();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = format!("projects/{}/{}-{}", project, uuid::Uuid::new_v4(), file.name);
            let asset = UploadedAsset {
                url: format!("{}/{}", self.base_url, path),
                path: path.clone(),
                name: file.name,
                mime: file.mime,
                size: file.bytes.len() as u64,
            };
            self.assets
                .lock()
                .map_err(|e| UploadError::Service(format!("Lock error: {}", e)))?
                .insert(path, file.bytes);
            Ok(asset)
        })
    }

    fn delete(&self, path: &str) -> BoxFuture<'_, Result<(), UploadError>> {
        let path = path.to_string();
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut assets = self
                .assets
                .lock()
                .map_err(|e| UploadError::Service(format!("Lock error: {}", e)))?;
            assets.remove(&path).map(|_| ()).ok_or(UploadError::NotFound(path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ItemType;
    use crate::testing::block_on;

    #[test]
    fn test_validate_mime() {
        let cfg = CanvasConfig::default();
        assert_eq!(validate_mime(&cfg, "image/jpeg").unwrap(), MediaKind::Image);
        assert_eq!(validate_mime(&cfg, "image/svg+xml").unwrap(), MediaKind::Svg);
        assert_eq!(validate_mime(&cfg, "application/pdf").unwrap(), MediaKind::File);
        assert!(matches!(validate_mime(&cfg, "application/zip"), Err(CanvasError::Validation(_))));
    }

    #[test]
    fn test_whitelist_can_be_narrowed() {
        let cfg = CanvasConfig {
            allowed_mime_types: vec!["image/png".to_string()],
            ..CanvasConfig::default()
        };
        assert!(validate_mime(&cfg, "image/png").is_ok());
        assert!(validate_mime(&cfg, "application/pdf").is_err());
    }

    #[test]
    fn test_memory_upload_and_delete() {
        let uploader = MemoryUploader::default();
        let asset = block_on(uploader.upload(UploadFile::new("a.png", "image/png", vec![1, 2, 3]), "p1")).unwrap();
        assert_eq!(asset.size, 3);
        assert!(asset.url.starts_with("memory://media/projects/p1/"));
        assert!(uploader.contains(&asset.path));

        block_on(uploader.delete(&asset.path)).unwrap();
        assert!(!uploader.contains(&asset.path));
        assert!(matches!(block_on(uploader.delete(&asset.path)), Err(UploadError::NotFound(_))));
        assert_eq!(uploader.calls(), 3);
    }

    #[test]
    fn test_uploaded_asset_wire_format() {
        let json = serde_json::json!({
            "url": "https://cdn/p1/a.png",
            "path": "projects/p1/a.png",
            "name": "a.png",
            "type": "image/png",
            "size": 3
        });
        let asset: UploadedAsset = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(asset.mime, "image/png");
        assert_eq!(serde_json::to_value(&asset).unwrap(), json);
    }

    #[test]
    fn test_asset_item_holds_url_only() {
        let cfg = CanvasConfig::default();
        let asset = UploadedAsset {
            url: "https://cdn/x.svg".to_string(),
            path: "projects/p1/x.svg".to_string(),
            name: "x.svg".to_string(),
            mime: "image/svg+xml".to_string(),
            size: 2048,
        };
        let item = asset_item(&asset, MediaKind::Svg, Point::new(960.0, 540.0), &cfg);
        assert_eq!(item.item_type(), ItemType::Svg);
        assert_eq!(item.center(), Point::new(960.0, 540.0));
        match &item.kind {
            ItemKind::Svg(e) => {
                assert_eq!(e.url, "https://cdn/x.svg");
                assert_eq!(e.storage_path.as_deref(), Some("projects/p1/x.svg"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
