//! File-backed remote store for native platforms.

use super::{BoxFuture, RemoteEvent, RemoteStore, Subscribers, Subscription, SyncError, SyncResult, WriteOptions};
use crate::project::{DocumentPatch, ProjectDocument};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores each project document as a JSON file in a directory.
///
/// Subscribers in the same process are notified after every write, which
/// makes this a single-machine stand-in for the shared document store.
pub struct FileStore {
    /// Base directory for document storage.
    base_path: PathBuf,
    subscribers: Subscribers,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store in the given directory, creating it if needed.
    pub fn new(base_path: PathBuf) -> SyncResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| SyncError::Io(format!("Failed to create storage directory: {}", e)))?;
        }
        Ok(Self {
            base_path,
            subscribers: Subscribers::default(),
            write_lock: Mutex::new(()),
        })
    }

    /// Create a store in the default location.
    ///
    /// On Unix: `~/.local/share/feedboard/projects/`
    /// On Windows: `%LOCALAPPDATA%\feedboard\projects\`
    pub fn default_location() -> SyncResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| SyncError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("feedboard").join("projects"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn document_path(&self, project: &str) -> PathBuf {
        let safe_id: String = project
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }

    fn load(&self, project: &str) -> SyncResult<Option<ProjectDocument>> {
        let path = self.document_path(project);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| SyncError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| SyncError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn store(&self, project: &str, doc: &ProjectDocument) -> SyncResult<()> {
        let path = self.document_path(project);
        let json = serde_json::to_string_pretty(doc).map_err(|e| SyncError::Serialization(e.to_string()))?;
        fs::write(&path, json).map_err(|e| SyncError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn apply_write(&self, project: &str, patch: DocumentPatch, options: WriteOptions) -> SyncResult<()> {
        let document = {
            let _guard = self
                .write_lock
                .lock()
                .map_err(|e| SyncError::Other(format!("Lock error: {}", e)))?;
            let mut doc = self.load(project)?.unwrap_or_default();
            patch.apply_to(&mut doc, options.merge);
            doc.last_modified = Some(Utc::now());
            self.store(project, &doc)?;
            doc
        };
        self.subscribers.broadcast(project, &RemoteEvent::Changed(document));
        Ok(())
    }

    /// IDs of every stored project.
    pub fn list(&self) -> SyncResult<Vec<String>> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| SyncError::Io(format!("Failed to read directory: {}", e)))?;
        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl RemoteStore for FileStore {
    fn subscribe(&self, project: &str) -> SyncResult<Subscription> {
        let initial = match self.load(project) {
            Ok(doc) => doc.map(RemoteEvent::Changed),
            Err(e) => Some(RemoteEvent::ReadFailed(e.to_string())),
        };
        self.subscribers.register(project, initial)
    }

    fn read(&self, project: &str) -> BoxFuture<'_, SyncResult<ProjectDocument>> {
        let project = project.to_string();
        Box::pin(async move { self.load(&project)?.ok_or(SyncError::NotFound(project)) })
    }

    fn write(&self, project: &str, patch: DocumentPatch, options: WriteOptions) -> BoxFuture<'_, SyncResult<()>> {
        let project = project.to_string();
        Box::pin(async move { self.apply_write(&project, patch, options) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use crate::project::ProjectStatus;
    use crate::testing::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.write("p1", DocumentPatch::layers(vec![Layer::new("A")]), WriteOptions::MERGE)).unwrap();
        let doc = block_on(store.read("p1")).unwrap();
        assert_eq!(doc.layers[0].name, "A");
        assert!(dir.path().join("p1.json").exists());
    }

    #[test]
    fn test_merge_and_replace() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        block_on(store.write("p1", DocumentPatch::layers(vec![Layer::new("A")]), WriteOptions::MERGE)).unwrap();
        block_on(store.write("p1", DocumentPatch::status(ProjectStatus::Rejected), WriteOptions::MERGE)).unwrap();
        let doc = block_on(store.read("p1")).unwrap();
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.status, ProjectStatus::Rejected);

        block_on(store.write("p1", DocumentPatch::status(ProjectStatus::Approved), WriteOptions::REPLACE)).unwrap();
        let doc = block_on(store.read("p1")).unwrap();
        assert!(doc.layers.is_empty());
    }

    #[test]
    fn test_not_found() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(block_on(store.read("missing")), Err(SyncError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(matches!(block_on(store.read("bad")), Err(SyncError::Serialization(_))));

        let sub = store.subscribe("bad").unwrap();
        assert!(matches!(sub.drain().as_slice(), [RemoteEvent::ReadFailed(_)]));
    }

    #[test]
    fn test_subscriber_notified_on_write() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let sub = store.subscribe("p1").unwrap();
        assert!(sub.drain().is_empty());

        block_on(store.write("p1", DocumentPatch::status(ProjectStatus::Approved), WriteOptions::MERGE)).unwrap();
        assert!(matches!(sub.drain().as_slice(), [RemoteEvent::Changed(doc)] if doc.status == ProjectStatus::Approved));
    }

    #[test]
    fn test_list_and_sanitized_ids() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        block_on(store.write("team/p1", DocumentPatch::default(), WriteOptions::MERGE)).unwrap();
        block_on(store.write("p2", DocumentPatch::default(), WriteOptions::MERGE)).unwrap();
        assert_eq!(store.list().unwrap(), vec!["p2".to_string(), "team_p1".to_string()]);
    }
}
