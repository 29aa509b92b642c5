//! In-memory remote store.

use super::{BoxFuture, RemoteEvent, RemoteStore, Subscribers, Subscription, SyncError, SyncResult, WriteOptions};
use crate::project::{DocumentPatch, ProjectDocument, ProjectId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// A write accepted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub project: ProjectId,
    pub patch: DocumentPatch,
    pub merge: bool,
}

/// In-memory store for testing and ephemeral use.
///
/// Every accepted write is recorded, and reads or writes can be made to fail
/// on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<ProjectId, ProjectDocument>>,
    subscribers: Subscribers,
    writes: Mutex<Vec<WriteRecord>>,
    fail_writes: Mutex<Option<String>>,
    fail_reads: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one document.
    pub fn with_document(project: impl Into<ProjectId>, document: ProjectDocument) -> Self {
        let store = Self::new();
        if let Ok(mut docs) = store.documents.write() {
            docs.insert(project.into(), document);
        }
        store
    }

    /// Make every following write fail with `message`, or succeed again with `None`.
    pub fn fail_writes(&self, message: Option<&str>) {
        if let Ok(mut slot) = self.fail_writes.lock() {
            *slot = message.map(str::to_string);
        }
    }

    /// Make every following read fail with `message`, or succeed again with `None`.
    pub fn fail_reads(&self, message: Option<&str>) {
        if let Ok(mut slot) = self.fail_reads.lock() {
            *slot = message.map(str::to_string);
        }
    }

    /// All accepted writes, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn clear_writes(&self) {
        if let Ok(mut w) = self.writes.lock() {
            w.clear();
        }
    }

    /// Current document without going through the async API.
    pub fn document(&self, project: &str) -> Option<ProjectDocument> {
        self.documents.read().ok()?.get(project).cloned()
    }

    pub fn subscriber_count(&self, project: &str) -> usize {
        self.subscribers.count(project)
    }

    fn injected(slot: &Mutex<Option<String>>) -> Option<String> {
        slot.lock().ok().and_then(|s| s.clone())
    }

    fn apply_write(&self, project: &str, patch: DocumentPatch, options: WriteOptions) -> SyncResult<()> {
        if let Some(message) = Self::injected(&self.fail_writes) {
            return Err(SyncError::Rejected(message));
        }

        let document = {
            let mut docs = self
                .documents
                .write()
                .map_err(|e| SyncError::Other(format!("Lock error: {}", e)))?;
            let doc = docs.entry(project.to_string()).or_default();
            patch.clone().apply_to(doc, options.merge);
            doc.last_modified = Some(Utc::now());
            doc.clone()
        };

        self.writes
            .lock()
            .map_err(|e| SyncError::Other(format!("Lock error: {}", e)))?
            .push(WriteRecord {
                project: project.to_string(),
                patch,
                merge: options.merge,
            });

        self.subscribers.broadcast(project, &RemoteEvent::Changed(document));
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    /// Subscribers get the current document right away when one exists.
    fn subscribe(&self, project: &str) -> SyncResult<Subscription> {
        let initial = match Self::injected(&self.fail_reads) {
            Some(message) => Some(RemoteEvent::ReadFailed(message)),
            None => self.document(project).map(RemoteEvent::Changed),
        };
        self.subscribers.register(project, initial)
    }

    fn read(&self, project: &str) -> BoxFuture<'_, SyncResult<ProjectDocument>> {
        let project = project.to_string();
        Box::pin(async move {
            if let Some(message) = Self::injected(&self.fail_reads) {
                return Err(SyncError::Io(message));
            }
            self.document(&project).ok_or(SyncError::NotFound(project))
        })
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

    #[test]
    fn test_write_and_read() {
        let store = MemoryStore::new();
        block_on(store.write("p1", DocumentPatch::layers(vec![Layer::new("A")]), WriteOptions::MERGE)).unwrap();
        let doc = block_on(store.read("p1")).unwrap();
        assert_eq!(doc.layers.len(), 1);
        assert!(doc.last_modified.is_some());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_not_found() {
        let store = MemoryStore::new();
        let result = block_on(store.read("nonexistent"));
        assert!(matches!(result, Err(SyncError::NotFound(_))));
    }

    #[test]
    fn test_subscribers_see_every_write_including_their_own() {
        let store = MemoryStore::with_document("p1", ProjectDocument::default());
        let a = store.subscribe("p1").unwrap();
        let b = store.subscribe("p1").unwrap();
        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);

        block_on(store.write("p1", DocumentPatch::status(ProjectStatus::Approved), WriteOptions::MERGE)).unwrap();
        for sub in [&a, &b] {
            let events = sub.drain();
            assert_eq!(events.len(), 1);
            assert!(matches!(&events[0], RemoteEvent::Changed(doc) if doc.status == ProjectStatus::Approved));
        }
    }

    #[test]
    fn test_last_writer_wins() {
        let store = MemoryStore::new();
        block_on(store.write("p1", DocumentPatch::layers(vec![Layer::new("From A")]), WriteOptions::MERGE)).unwrap();
        block_on(store.write("p1", DocumentPatch::layers(vec![Layer::new("From B")]), WriteOptions::MERGE)).unwrap();
        let doc = store.document("p1").unwrap();
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.layers[0].name, "From B");
    }

    #[test]
    fn test_injected_write_failure() {
        let store = MemoryStore::new();
        store.fail_writes(Some("offline"));
        let err = block_on(store.write("p1", DocumentPatch::default(), WriteOptions::MERGE)).unwrap_err();
        assert!(matches!(err, SyncError::Rejected(_)));
        assert_eq!(store.write_count(), 0);
        assert!(store.document("p1").is_none());

        store.fail_writes(None);
        block_on(store.write("p1", DocumentPatch::default(), WriteOptions::MERGE)).unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_subscribe_reports_read_failure() {
        let store = MemoryStore::new();
        store.fail_reads(Some("denied"));
        let sub = store.subscribe("p1").unwrap();
        assert_eq!(sub.drain(), vec![RemoteEvent::ReadFailed("denied".to_string())]);
    }
}
