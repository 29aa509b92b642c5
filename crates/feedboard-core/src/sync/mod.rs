//! Sync with the shared project document.
//!
//! The remote store is a whole-document, last-writer-wins store: every
//! notification carries the complete document, and every write replaces the
//! fields it carries. There is no merge of concurrent edits.

mod debounce;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(not(target_arch = "wasm32"))]
mod ws;

pub use debounce::Debouncer;
pub use memory::{MemoryStore, WriteRecord};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;
#[cfg(not(target_arch = "wasm32"))]
pub use ws::{ConnectionState, WsStore};

use crate::project::{DocumentPatch, ProjectDocument, ProjectId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};
use thiserror::Error;

/// Remote store errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Write rejected: {0}")]
    Rejected(String),
    #[error("Sync error: {0}")]
    Other(String),
}

/// Result type for remote store operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Options for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Overwrite only the fields present in the patch.
    pub merge: bool,
}

impl WriteOptions {
    pub const MERGE: Self = Self { merge: true };
    pub const REPLACE: Self = Self { merge: false };
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// The document changed; this is its full new state.
    Changed(ProjectDocument),
    /// The subscription could not read the document.
    ReadFailed(String),
}

/// A live subscription to one project document.
///
/// Events queue up until the owner drains them with [`Subscription::drain`].
#[derive(Debug)]
pub struct Subscription {
    project: ProjectId,
    receiver: Receiver<RemoteEvent>,
}

impl Subscription {
    pub fn new(project: impl Into<ProjectId>, receiver: Receiver<RemoteEvent>) -> Self {
        Self {
            project: project.into(),
            receiver,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Take every pending event in delivery order (non-blocking).
    pub fn drain(&self) -> Vec<RemoteEvent> {
        self.receiver.try_iter().collect()
    }
}

/// The shared project document store.
pub trait RemoteStore: Send + Sync {
    /// Register for change notifications on a project.
    fn subscribe(&self, project: &str) -> SyncResult<Subscription>;

    /// Read the current document.
    fn read(&self, project: &str) -> BoxFuture<'_, SyncResult<ProjectDocument>>;

    /// Write a partial or full document.
    fn write(&self, project: &str, patch: DocumentPatch, options: WriteOptions) -> BoxFuture<'_, SyncResult<()>>;
}

/// Subscriber registry shared by the in-process stores.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Mutex<HashMap<ProjectId, Vec<Sender<RemoteEvent>>>>,
}

impl Subscribers {
    /// Register a subscriber; `initial` is delivered to it alone.
    pub(crate) fn register(&self, project: &str, initial: Option<RemoteEvent>) -> SyncResult<Subscription> {
        let (tx, rx) = channel();
        if let Some(event) = initial {
            let _ = tx.send(event);
        }
        let mut senders = self
            .senders
            .lock()
            .map_err(|e| SyncError::Other(format!("Lock error: {}", e)))?;
        senders.entry(project.to_string()).or_default().push(tx);
        Ok(Subscription::new(project, rx))
    }

    /// Send an event to every live subscriber, dropping closed ones.
    pub(crate) fn broadcast(&self, project: &str, event: &RemoteEvent) {
        let Ok(mut senders) = self.senders.lock() else {
            log::error!("Subscriber registry poisoned; dropping notification for {}", project);
            return;
        };
        if let Some(list) = senders.get_mut(project) {
            list.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub(crate) fn count(&self, project: &str) -> usize {
        self.senders
            .lock()
            .map(|s| s.get(project).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_drops_closed_subscribers() {
        let subs = Subscribers::default();
        let kept = subs.register("p1", None).unwrap();
        let dropped = subs.register("p1", None).unwrap();
        drop(dropped);
        assert_eq!(subs.count("p1"), 2);

        subs.broadcast("p1", &RemoteEvent::Changed(ProjectDocument::default()));
        assert_eq!(subs.count("p1"), 1);
        assert_eq!(kept.drain().len(), 1);
        assert!(kept.drain().is_empty());
    }

    #[test]
    fn test_broadcast_is_per_project() {
        let subs = Subscribers::default();
        let a = subs.register("a", None).unwrap();
        let b = subs.register("b", None).unwrap();
        subs.broadcast("a", &RemoteEvent::ReadFailed("x".into()));
        assert_eq!(a.drain().len(), 1);
        assert!(b.drain().is_empty());
    }
}
