//! Feedboard Core Library
//!
//! Platform-agnostic core of the Feedboard collaborative canvas: layered
//! content, drawing tools, drag/resize manipulation, optimistic sync against a
//! shared project document, version snapshots and review items.

pub mod config;
pub mod error;
pub mod geometry;
pub mod items;
pub mod layer;
pub mod manipulate;
pub mod policy;
pub mod project;
pub mod protocol;
pub mod review;
pub mod session;
pub mod sync;
pub mod tools;
pub mod upload;
pub mod versions;
pub mod viewport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::CanvasConfig;
pub use error::{CanvasError, CanvasResult};
pub use items::{ContentItem, ItemId, ItemKind, ItemStyle, ItemType};
pub use layer::{Layer, LayerId, LayerStore};
pub use manipulate::{HandleKind, ManipulationController};
pub use policy::{Action, Role, can_perform};
pub use project::{DocumentPatch, Project, ProjectDocument, ProjectStatus, UserId};
pub use review::{ReviewItem, ReviewStatus};
pub use session::{CanvasSession, Notice, NoticeLevel};
pub use sync::{Debouncer, MemoryStore, RemoteEvent, RemoteStore, SyncError, WriteOptions};
pub use tools::{ToolKind, ToolMachine};
pub use upload::{MediaUploader, UploadFile, UploadedAsset};
pub use versions::{VersionHistory, VersionSnapshot, VersionTag};
pub use viewport::Viewport;
