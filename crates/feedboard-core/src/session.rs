//! Canvas session: one user editing one project.
//!
//! Every mutation is applied to local state first and then committed to the
//! remote store. Remote notifications replace layers, versions, reviews and
//! status wholesale. Handlers re-read local state after every await rather
//! than holding on to values taken before it.

use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::items::{ContentItem, ItemId, ItemKind};
use crate::layer::{LayerId, LayerStore};
use crate::manipulate::ManipulationController;
use crate::policy::{Action, Role, can_perform};
use crate::project::{DocumentPatch, Project, ProjectDocument, ProjectStatus, UserId};
use crate::review::{NewReview, ReviewId, ReviewItem, ReviewStatus};
use crate::sync::{Debouncer, RemoteEvent, RemoteStore, Subscription, SyncError, WriteOptions};
use crate::tools::{InlineEditor, Modifiers, ToolEffect, ToolKind, ToolMachine};
use crate::upload::{self, MediaUploader, UploadFile};
use crate::versions::{VersionHistory, VersionId, VersionSnapshot, VersionTag};
use crate::viewport::Viewport;
use chrono::{DateTime, Utc};
use kurbo::Point;
use std::sync::Arc;
use std::time::Instant;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A non-blocking notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// One user's editing session on one project.
pub struct CanvasSession<S: RemoteStore> {
    store: Arc<S>,
    project: Project,
    user: UserId,
    role: Option<Role>,
    cfg: CanvasConfig,
    layers: LayerStore,
    versions: VersionHistory,
    reviews: Vec<ReviewItem>,
    status: ProjectStatus,
    last_modified: Option<DateTime<Utc>>,
    tools: ToolMachine,
    manipulation: ManipulationController,
    viewport: Viewport,
    /// Pending drag/resize commit; carries the item being manipulated.
    pending: Debouncer<ItemId>,
    subscription: Option<Subscription>,
    notices: Vec<Notice>,
    revision: u64,
}

impl<S: RemoteStore> CanvasSession<S> {
    pub fn new(store: Arc<S>, project: Project, user: impl Into<UserId>, cfg: CanvasConfig) -> Self {
        let user = user.into();
        let role = project.role_of(&user);
        Self {
            store,
            role,
            user,
            project,
            layers: LayerStore::new(),
            versions: VersionHistory::new(),
            reviews: Vec::new(),
            status: ProjectStatus::default(),
            last_modified: None,
            tools: ToolMachine::new(&cfg),
            manipulation: ManipulationController::new(&cfg),
            viewport: Viewport::new(cfg.min_zoom, cfg.max_zoom),
            pending: Debouncer::new(cfg.debounce_window()),
            subscription: None,
            notices: Vec::new(),
            revision: 0,
            cfg,
        }
    }

    // ------------------------------------------------------------------
    // State access
    // ------------------------------------------------------------------

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.cfg
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.layers.active_id()
    }

    pub fn versions(&self) -> &VersionHistory {
        &self.versions
    }

    pub fn versions_by_tag(&self, tag: VersionTag) -> Vec<&VersionSnapshot> {
        self.versions.filter_by_tag(tag)
    }

    pub fn reviews(&self) -> &[ReviewItem] {
        &self.reviews
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn tools(&self) -> &ToolMachine {
        &self.tools
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.tool()
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tools.set_tool(tool);
        self.touch();
    }

    /// The item being drawn, if any.
    pub fn in_progress(&self) -> Option<&ContentItem> {
        self.tools.in_progress()
    }

    pub fn editor(&self) -> Option<&InlineEditor> {
        self.tools.editor()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
        self.touch();
    }

    pub fn is_manipulating(&self) -> bool {
        self.manipulation.is_active()
    }

    /// The item under an active drag or resize.
    pub fn manipulated_item(&self) -> Option<ItemId> {
        self.manipulation.active_item()
    }

    /// Bumped on every change that affects what is drawn.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a debounced commit is waiting.
    pub fn has_pending_write(&self) -> bool {
        self.pending.is_pending()
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn require(&self, action: Action) -> CanvasResult<Role> {
        let role = self
            .role
            .ok_or_else(|| CanvasError::permission(format!("{} is not a member of this project", self.user)))?;
        if !can_perform(role, action) {
            return Err(CanvasError::permission(format!("a {} cannot {}", role, action.describe())));
        }
        Ok(role)
    }

    /// The active layer, if it accepts new content.
    fn writable_active_layer(&self) -> CanvasResult<LayerId> {
        let layer = self
            .layers
            .active()
            .ok_or_else(|| CanvasError::validation("no active layer"))?;
        if layer.locked {
            return Err(CanvasError::permission(format!("layer '{}' is locked", layer.name)));
        }
        Ok(layer.id())
    }

    // ------------------------------------------------------------------
    // Remote document
    // ------------------------------------------------------------------

    /// Subscribe to the project document. The current document, if the store
    /// has one, arrives with the next [`poll_remote`](Self::poll_remote).
    pub fn subscribe(&mut self) -> CanvasResult<()> {
        let subscription = self.store.subscribe(&self.project.id).map_err(CanvasError::RemoteRead)?;
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Load the current document once, without subscribing.
    pub async fn load(&mut self) -> CanvasResult<()> {
        let doc = self.store.read(&self.project.id).await.map_err(|e| {
            log::error!("Failed to read project {}: {}", self.project.id, e);
            CanvasError::RemoteRead(e)
        })?;
        self.apply_remote(doc);
        Ok(())
    }

    /// Apply every queued remote notification in delivery order.
    ///
    /// Returns how many documents were applied. Read failures are logged and
    /// the session keeps its last known state.
    pub fn poll_remote(&mut self) -> usize {
        let events = match &self.subscription {
            Some(sub) => sub.drain(),
            None => return 0,
        };
        let mut applied = 0;
        for event in events {
            match event {
                RemoteEvent::Changed(doc) => {
                    self.apply_remote(doc);
                    applied += 1;
                }
                RemoteEvent::ReadFailed(message) => {
                    log::error!("Remote read failed for {}: {}", self.project.id, message);
                    self.notify(NoticeLevel::Error, format!("Could not load the latest changes: {message}"));
                }
            }
        }
        applied
    }

    /// Replace local document state with a remote document.
    pub fn apply_remote(&mut self, doc: ProjectDocument) {
        log::debug!(
            "Applying remote document for {}: {} layers, {} versions, {} reviews",
            self.project.id,
            doc.layers.len(),
            doc.versions.len(),
            doc.reviews.len()
        );
        self.layers.replace_all(doc.layers);
        self.versions = VersionHistory::from_vec(doc.versions);
        self.reviews = doc.reviews;
        self.status = doc.status;
        self.last_modified = doc.last_modified;
        if let Some(id) = self.manipulation.active_item() {
            if self.layers.find_item(id).is_none() {
                self.manipulation.forget_item(id);
            }
        }
        self.touch();
    }

    async fn write(&self, patch: DocumentPatch) -> Result<(), SyncError> {
        self.store.write(&self.project.id, patch, WriteOptions::MERGE).await
    }

    /// Commit without reverting: failures become a notice.
    async fn commit(&mut self, patch: DocumentPatch, what: &str) {
        if let Err(e) = self.write(patch).await {
            log::warn!("Failed to save {} for {}: {}", what, self.project.id, e);
            self.notify(NoticeLevel::Warning, format!("Could not save {what}: {e}"));
        }
    }

    async fn commit_layers(&mut self, what: &str) {
        let patch = DocumentPatch::layers(self.layers.snapshot());
        self.commit(patch, what).await;
    }

    /// Fire the debounced commit if its window has passed.
    pub async fn tick(&mut self, now: Instant) -> bool {
        match self.pending.take_due(now) {
            Some(item) => {
                log::debug!("Debounced commit for item {}", item);
                self.commit_layers("changes").await;
                true
            }
            None => false,
        }
    }

    /// Send a pending debounced commit right away.
    pub async fn flush(&mut self) -> bool {
        match self.pending.flush() {
            Some(_) => {
                self.commit_layers("changes").await;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    pub fn set_active_layer(&mut self, id: LayerId) -> CanvasResult<()> {
        self.layers.set_active(id)?;
        self.touch();
        Ok(())
    }

    pub async fn add_layer(&mut self, name: &str) -> CanvasResult<LayerId> {
        self.require(Action::EditCanvas)?;
        let id = self.layers.add_layer(name)?;
        self.touch();
        self.commit_layers("the new layer").await;
        Ok(id)
    }

    /// Delete a layer and its content. Reverted if the commit fails.
    pub async fn remove_layer(&mut self, id: LayerId) -> CanvasResult<()> {
        self.require(Action::EditCanvas)?;
        let before = self.layers.snapshot();
        let active = self.layers.active_id();
        self.layers.remove_layer(id)?;
        self.touch();

        if let Err(e) = self.write(DocumentPatch::layers(self.layers.snapshot())).await {
            log::warn!("Reverting layer delete on {}: {}", self.project.id, e);
            self.layers.restore(before, active);
            self.touch();
            self.notify(NoticeLevel::Error, format!("Could not delete the layer: {e}"));
            return Err(CanvasError::RemoteWrite(e));
        }
        Ok(())
    }

    pub async fn rename_layer(&mut self, id: LayerId, name: &str) -> CanvasResult<()> {
        self.require(Action::EditCanvas)?;
        self.layers.rename_layer(id, name)?;
        self.touch();
        self.commit_layers("the layer name").await;
        Ok(())
    }

    pub async fn toggle_layer_visibility(&mut self, id: LayerId) -> CanvasResult<bool> {
        self.require(Action::EditCanvas)?;
        let visible = self.layers.toggle_visibility(id)?;
        self.touch();
        self.commit_layers("layer visibility").await;
        Ok(visible)
    }

    pub async fn toggle_layer_lock(&mut self, id: LayerId) -> CanvasResult<bool> {
        self.require(Action::EditCanvas)?;
        let locked = self.layers.toggle_lock(id)?;
        self.touch();
        self.commit_layers("the layer lock").await;
        Ok(locked)
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Append an item to the active layer and commit it.
    pub async fn add_item(&mut self, item: ContentItem) -> CanvasResult<ItemId> {
        self.require(Action::EditCanvas)?;
        let layer = self.writable_active_layer()?;
        let id = self.layers.add_item(layer, item)?;
        self.touch();
        self.commit_layers("the new item").await;
        Ok(id)
    }

    /// Delete an item. Reverted if the commit fails.
    pub async fn delete_item(&mut self, id: ItemId) -> CanvasResult<ContentItem> {
        self.require(Action::EditCanvas)?;
        let before = self.layers.snapshot();
        let active = self.layers.active_id();
        let (_, removed) = self.layers.remove_item(id)?;
        self.manipulation.forget_item(id);
        self.touch();

        if let Err(e) = self.write(DocumentPatch::layers(self.layers.snapshot())).await {
            log::warn!("Reverting item delete on {}: {}", self.project.id, e);
            self.layers.restore(before, active);
            self.touch();
            self.notify(NoticeLevel::Error, format!("Could not delete the item: {e}"));
            return Err(CanvasError::RemoteWrite(e));
        }
        Ok(removed)
    }

    pub async fn move_item_to_layer(&mut self, id: ItemId, layer: LayerId) -> CanvasResult<()> {
        self.require(Action::EditCanvas)?;
        self.layers.move_item(id, layer)?;
        self.touch();
        self.commit_layers("the moved item").await;
        Ok(())
    }

    /// Replace an item's content (text edits, style changes).
    pub async fn update_item(&mut self, item: ContentItem) -> CanvasResult<()> {
        self.require(Action::EditCanvas)?;
        self.layers.replace_item(item)?;
        self.touch();
        self.commit_layers("the item").await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pointer input (screen coordinates)
    // ------------------------------------------------------------------

    /// Top-most item under a canvas point that can be grabbed.
    fn grab_target(&self, canvas: Point) -> Option<ContentItem> {
        let handle_tolerance = self.manipulation.handle_tolerance(self.viewport.zoom());
        let tolerance = self.viewport.screen_len_to_canvas(self.cfg.click_tolerance);
        self.layers
            .layers()
            .iter()
            .rev()
            .filter(|l| l.visible && !l.locked)
            .find_map(|l| {
                l.items.iter().rev().find(|item| {
                    crate::manipulate::hit_test_handles(item, canvas, handle_tolerance).is_some()
                        || item.hit_test(canvas, tolerance)
                })
            })
            .cloned()
    }

    pub fn pointer_down(&mut self, screen: Point) -> CanvasResult<()> {
        let canvas = self.viewport.screen_to_canvas(screen);

        if self.tools.tool() == ToolKind::Select {
            if self.require(Action::EditCanvas).is_err() {
                return Ok(());
            }
            if let Some(item) = self.grab_target(canvas) {
                self.manipulation.begin(&item, canvas, self.viewport.zoom());
                self.touch();
            }
            return Ok(());
        }

        if !self.tools.is_idle() {
            return Ok(());
        }
        self.require(Action::EditCanvas)?;
        self.writable_active_layer()?;
        if self.tools.pointer_down(canvas) == ToolEffect::Redraw {
            self.touch();
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, screen: Point, modifiers: Modifiers, now: Instant) -> CanvasResult<()> {
        let canvas = self.viewport.screen_to_canvas(screen);

        if let Some(id) = self.manipulation.active_item() {
            let Some((_, current)) = self.layers.find_item(id) else {
                self.manipulation.forget_item(id);
                return Ok(());
            };
            if let Some(updated) = self.manipulation.update(current, canvas, modifiers) {
                if let Err(e) = self.layers.replace_item(updated) {
                    // The layer was locked under us.
                    self.manipulation.forget_item(id);
                    return Err(e);
                }
                self.pending.call(id, now);
                self.touch();
            }
            return Ok(());
        }

        if self.tools.pointer_move(canvas) == ToolEffect::Redraw {
            self.touch();
        }
        Ok(())
    }

    pub async fn pointer_up(&mut self, screen: Point) -> CanvasResult<()> {
        let canvas = self.viewport.screen_to_canvas(screen);
        if self.manipulation.is_active() {
            return self.end_manipulation().await;
        }
        let effect = self.tools.pointer_up(canvas);
        self.apply_tool_effect(effect).await
    }

    /// Pointer left the canvas: drawings finalize, gestures end.
    pub async fn pointer_leave(&mut self) -> CanvasResult<()> {
        if self.manipulation.is_active() {
            return self.end_manipulation().await;
        }
        let effect = self.tools.pointer_leave();
        self.apply_tool_effect(effect).await
    }

    /// Final, non-debounced write at the end of a drag or resize.
    ///
    /// A press that never moved the item writes nothing.
    async fn end_manipulation(&mut self) -> CanvasResult<()> {
        let Some(state) = self.manipulation.end() else {
            return Ok(());
        };
        self.touch();
        let unchanged = self
            .layers
            .find_item(state.item_id)
            .is_some_and(|(_, item)| *item == state.original_item);
        if unchanged {
            log::debug!("Manipulation of {} ended without changes", state.item_id);
            return Ok(());
        }
        log::debug!("Manipulation of {} ended", state.item_id);
        self.commit_layers("the item position").await;
        Ok(())
    }

    async fn apply_tool_effect(&mut self, effect: ToolEffect) -> CanvasResult<()> {
        match effect {
            ToolEffect::Commit(item) => {
                self.touch();
                self.add_item(item).await?;
            }
            ToolEffect::Discarded | ToolEffect::Redraw | ToolEffect::EditorOpened(_) => self.touch(),
            ToolEffect::None => {}
        }
        Ok(())
    }

    /// Replace the text of the open inline editor.
    pub fn set_editor_text(&mut self, text: &str) -> bool {
        match self.tools.editor_mut() {
            Some(editor) => {
                editor.set_text(text);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Close the inline editor and append its item, if it has text.
    pub async fn complete_edit(&mut self) -> CanvasResult<Option<ItemId>> {
        let author = self.user.clone();
        let Some(item) = self.tools.complete_edit(&author) else {
            self.touch();
            return Ok(None);
        };
        self.touch();
        self.add_item(item).await.map(Some)
    }

    /// Close the inline editor without any change.
    pub fn cancel_edit(&mut self) {
        if self.tools.cancel_edit() {
            self.touch();
        }
    }

    // ------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------

    /// Upload a file and place it on the active layer centered at a canvas point.
    ///
    /// The type check and layer check happen before any network call.
    pub async fn upload_media<U: MediaUploader>(
        &mut self,
        uploader: &U,
        file: UploadFile,
        center: Point,
    ) -> CanvasResult<ItemId> {
        self.require(Action::UploadMedia)?;
        let kind = upload::validate_mime(&self.cfg, &file.mime)?;
        self.writable_active_layer()?;

        let asset = uploader.upload(file, &self.project.id).await?;
        log::info!("Uploaded {} ({} bytes) to {}", asset.name, asset.size, asset.path);

        let item = upload::asset_item(&asset, kind, center, &self.cfg);
        match self.add_item(item).await {
            Ok(id) => Ok(id),
            Err(e) => {
                // The layer went away or got locked during the upload.
                if let Err(cleanup) = uploader.delete(&asset.path).await {
                    log::warn!("Failed to delete orphaned asset {}: {}", asset.path, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Delete a media item and its stored asset.
    pub async fn delete_media_item<U: MediaUploader>(&mut self, uploader: &U, id: ItemId) -> CanvasResult<()> {
        let removed = self.delete_item(id).await?;
        let path = match &removed.kind {
            ItemKind::Image(e) | ItemKind::Svg(e) | ItemKind::File(e) => e.storage_path.clone(),
            _ => None,
        };
        if let Some(path) = path {
            if let Err(e) = uploader.delete(&path).await {
                log::warn!("Failed to delete asset {}: {}", path, e);
                self.notify(NoticeLevel::Warning, format!("The file could not be removed from storage: {e}"));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------

    pub async fn create_version(
        &mut self,
        description: &str,
        tags: impl IntoIterator<Item = VersionTag>,
    ) -> CanvasResult<VersionId> {
        self.require(Action::ManageVersions)?;
        let author = Some(self.user.clone());
        let id = self
            .versions
            .create(description, tags, self.layers.layers(), author)?
            .id();
        self.commit(DocumentPatch::versions(self.versions.to_vec()), "the version").await;
        Ok(id)
    }

    /// Overwrite live layers with a snapshot. Destructive: the caller must
    /// have confirmed with the user. Reverted if the commit fails.
    pub async fn restore_version(&mut self, id: VersionId, confirmed: bool) -> CanvasResult<()> {
        self.require(Action::RestoreVersion)?;
        if !confirmed {
            return Err(CanvasError::validation("restoring a version needs confirmation"));
        }
        let restored = self.versions.restore_layers(id)?;
        let before = self.layers.snapshot();
        let active = self.layers.active_id();

        self.tools.reset();
        self.manipulation.cancel();
        self.layers.replace_all(restored);
        self.touch();

        if let Err(e) = self.write(DocumentPatch::layers(self.layers.snapshot())).await {
            log::warn!("Reverting version restore on {}: {}", self.project.id, e);
            self.layers.restore(before, active);
            self.touch();
            self.notify(NoticeLevel::Error, format!("Could not restore the version: {e}"));
            return Err(CanvasError::RemoteWrite(e));
        }
        log::info!("Restored version {} on {}", id, self.project.id);
        Ok(())
    }

    /// Delete a snapshot permanently. Reverted if the commit fails.
    pub async fn delete_version(&mut self, id: VersionId) -> CanvasResult<()> {
        self.require(Action::ManageVersions)?;
        let before = self.versions.clone();
        self.versions.delete(id)?;

        if let Err(e) = self.write(DocumentPatch::versions(self.versions.to_vec())).await {
            log::warn!("Reverting version delete on {}: {}", self.project.id, e);
            self.versions = before;
            self.notify(NoticeLevel::Error, format!("Could not delete the version: {e}"));
            return Err(CanvasError::RemoteWrite(e));
        }
        log::info!("Deleted version {} on {}", id, self.project.id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reviews and status
    // ------------------------------------------------------------------

    pub async fn create_review(&mut self, new: NewReview) -> CanvasResult<ReviewId> {
        self.require(Action::CreateReview)?;
        let item = ReviewItem::create(new, &self.user)?;
        let id = item.id();
        self.reviews.push(item);
        self.touch();
        self.commit(DocumentPatch::reviews(self.reviews.clone()), "the review").await;
        Ok(id)
    }

    pub async fn set_review_status(&mut self, id: ReviewId, status: ReviewStatus) -> CanvasResult<()> {
        self.require(Action::UpdateReviewStatus)?;
        let user = self.user.clone();
        let review = self
            .reviews
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| CanvasError::not_found(format!("review {id}")))?;
        review.transition(status, &user)?;
        self.touch();
        self.commit(DocumentPatch::reviews(self.reviews.clone()), "the review status").await;
        Ok(())
    }

    pub async fn set_project_status(&mut self, status: ProjectStatus) -> CanvasResult<()> {
        self.require(Action::SetProjectStatus)?;
        self.status = status;
        self.touch();
        self.commit(DocumentPatch::status(status), "the project status").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{EmbedContent, ItemStyle, ItemType};
    use crate::sync::MemoryStore;
    use crate::testing::block_on;
    use crate::upload::MemoryUploader;
    use kurbo::{Shape, Size};
    use std::time::Duration;

    const OWNER: &str = "olivia";
    const EDITOR: &str = "eddie";
    const REVIEWER: &str = "rita";
    const VIEWER: &str = "victor";

    fn project() -> Project {
        Project::new("p1", "Landing page", OWNER)
            .with_member(EDITOR, Role::Editor)
            .with_member(REVIEWER, Role::Reviewer)
            .with_member(VIEWER, Role::Viewer)
    }

    fn session_for(store: &Arc<MemoryStore>, user: &str) -> CanvasSession<MemoryStore> {
        CanvasSession::new(Arc::clone(store), project(), user, CanvasConfig::default())
    }

    fn editor_with_layer() -> (Arc<MemoryStore>, CanvasSession<MemoryStore>, LayerId) {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_for(&store, EDITOR);
        let layer = block_on(session.add_layer("L1")).unwrap();
        store.clear_writes();
        (store, session, layer)
    }

    fn image_item(x: f64, y: f64) -> ContentItem {
        ContentItem::new(
            Point::new(x, y),
            ItemStyle::default(),
            ItemKind::Image(EmbedContent::new("https://cdn/a.png", "a.png", "image/png", Size::new(200.0, 100.0))),
        )
    }

    fn draw(session: &mut CanvasSession<MemoryStore>, points: &[Point]) -> CanvasResult<()> {
        let now = Instant::now();
        session.pointer_down(points[0])?;
        for p in &points[1..] {
            session.pointer_move(*p, Modifiers::default(), now)?;
        }
        block_on(session.pointer_up(*points.last().unwrap()))
    }

    #[test]
    fn test_rectangle_scenario() {
        let (store, mut session, layer) = editor_with_layer();
        session.set_tool(ToolKind::Rectangle);
        draw(&mut session, &[Point::new(100.0, 100.0), Point::new(300.0, 250.0)]).unwrap();

        let items = &session.layers().get(layer).unwrap().items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type(), ItemType::Rectangle);
        assert_eq!(items[0].points(), &[Point::new(100.0, 100.0), Point::new(300.0, 250.0)]);
        let bounds = items[0].paint_path(Default::default()).unwrap().bounding_box();
        assert!((bounds.width() - 200.0).abs() < 1e-9);
        assert!((bounds.height() - 150.0).abs() < 1e-9);

        // Finalize commits immediately.
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.document("p1").unwrap().layers[0].items.len(), 1);
    }

    #[test]
    fn test_pointer_coordinates_are_divided_by_zoom() {
        let (_store, mut session, layer) = editor_with_layer();
        session.set_zoom(2.0);
        session.set_tool(ToolKind::Arrow);
        draw(&mut session, &[Point::new(200.0, 200.0), Point::new(600.0, 500.0)]).unwrap();
        let item = &session.layers().get(layer).unwrap().items[0];
        assert_eq!(item.points(), &[Point::new(100.0, 100.0), Point::new(300.0, 250.0)]);
    }

    #[test]
    fn test_draw_without_active_layer_mutates_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_for(&store, EDITOR);
        session.set_tool(ToolKind::Pen);
        let err = session.pointer_down(Point::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, CanvasError::Validation(_)));
        assert!(session.in_progress().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_draw_on_locked_layer_is_rejected() {
        let (store, mut session, layer) = editor_with_layer();
        block_on(session.toggle_layer_lock(layer)).unwrap();
        store.clear_writes();
        session.set_tool(ToolKind::Circle);
        assert!(matches!(session.pointer_down(Point::ZERO), Err(CanvasError::Permission(_))));
        assert!(session.in_progress().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_viewer_cannot_draw() {
        let store = Arc::new(MemoryStore::new());
        let mut owner = session_for(&store, OWNER);
        block_on(owner.add_layer("L1")).unwrap();

        let mut viewer = session_for(&store, VIEWER);
        viewer.subscribe().unwrap();
        viewer.poll_remote();
        viewer.set_tool(ToolKind::Pen);
        assert!(matches!(viewer.pointer_down(Point::ZERO), Err(CanvasError::Permission(_))));
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let (_store, mut session, layer) = editor_with_layer();
        session.set_tool(ToolKind::Circle);
        draw(&mut session, &[Point::new(50.0, 50.0), Point::new(80.0, 90.0)]).unwrap();
        block_on(session.add_layer("Notes")).unwrap();
        let original = session.layers().snapshot();

        let version = block_on(session.create_version("Before cleanup", [VersionTag::Draft])).unwrap();
        block_on(session.remove_layer(layer)).unwrap();
        session.set_tool(ToolKind::Pen);
        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(9.0, 2.0)]).unwrap();
        assert_ne!(session.layers().layers(), original.as_slice());

        block_on(session.restore_version(version, true)).unwrap();
        assert_eq!(session.layers().layers(), original.as_slice());
    }

    #[test]
    fn test_restore_requires_confirmation() {
        let (_store, mut session, _) = editor_with_layer();
        let version = block_on(session.create_version("v1", [])).unwrap();
        assert!(matches!(
            block_on(session.restore_version(version, false)),
            Err(CanvasError::Validation(_))
        ));
    }

    #[test]
    fn test_failed_restore_reverts() {
        let (store, mut session, _) = editor_with_layer();
        let version = block_on(session.create_version("empty layer", [])).unwrap();
        block_on(session.add_item(image_item(0.0, 0.0))).unwrap();
        let before = session.layers().snapshot();

        store.fail_writes(Some("offline"));
        let err = block_on(session.restore_version(version, true)).unwrap_err();
        assert!(matches!(err, CanvasError::RemoteWrite(_)));
        assert_eq!(session.layers().layers(), before.as_slice());
        assert_eq!(session.take_notices().len(), 1);
    }

    #[test]
    fn test_drag_debounce_write_count() {
        let (store, mut session, layer) = editor_with_layer();
        let id = block_on(session.add_item(image_item(100.0, 100.0))).unwrap();
        store.clear_writes();

        let start = Instant::now();
        session.set_tool(ToolKind::Select);
        session.pointer_down(Point::new(200.0, 150.0)).unwrap();
        assert!(session.is_manipulating());
        for i in 1..=10 {
            let at = start + Duration::from_millis(i * 50);
            session
                .pointer_move(Point::new(200.0 + i as f64 * 10.0, 150.0), Modifiers::default(), at)
                .unwrap();
            assert!(!block_on(session.tick(at)));
        }
        assert_eq!(store.write_count(), 0);

        block_on(session.pointer_up(Point::new(300.0, 150.0))).unwrap();
        assert_eq!(store.write_count(), 1);

        let last_move = start + Duration::from_millis(500);
        assert!(!block_on(session.tick(last_move + Duration::from_millis(999))));
        assert!(block_on(session.tick(last_move + Duration::from_millis(1000))));
        assert!(!block_on(session.tick(last_move + Duration::from_secs(5))));

        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        for w in &writes {
            let layers = w.patch.layers.as_ref().unwrap();
            let item = layers[0].item(id).unwrap();
            assert_eq!(item.center(), Point::new(300.0, 150.0));
        }
        assert_eq!(session.layers().get(layer).unwrap().items[0].center(), Point::new(300.0, 150.0));
    }

    #[test]
    fn test_resize_image_keeps_aspect() {
        let (_store, mut session, layer) = editor_with_layer();
        block_on(session.add_item(image_item(0.0, 0.0))).unwrap();
        session.set_tool(ToolKind::Select);
        session.pointer_down(Point::new(200.0, 100.0)).unwrap();
        session
            .pointer_move(Point::new(400.0, 120.0), Modifiers::default(), Instant::now())
            .unwrap();
        block_on(session.pointer_up(Point::new(400.0, 120.0))).unwrap();
        let item = &session.layers().get(layer).unwrap().items[0];
        assert_eq!(item.size(), Some(Size::new(400.0, 200.0)));
    }

    #[test]
    fn test_delete_active_layer_reassigns_to_first() {
        let (_store, mut session, first) = editor_with_layer();
        let second = block_on(session.add_layer("L2")).unwrap();
        let third = block_on(session.add_layer("L3")).unwrap();
        session.set_active_layer(third).unwrap();
        session.set_tool(ToolKind::Pen);
        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(10.0, 10.0)]).unwrap();
        session.set_active_layer(second).unwrap();
        draw(&mut session, &[Point::new(0.0, 0.0), Point::new(10.0, 10.0)]).unwrap();

        block_on(session.remove_layer(second)).unwrap();
        assert_eq!(session.active_layer_id(), Some(first));
        assert_eq!(session.layers().get(third).unwrap().items.len(), 1);

        block_on(session.remove_layer(first)).unwrap();
        block_on(session.remove_layer(third)).unwrap();
        assert_eq!(session.active_layer_id(), None);
    }

    #[test]
    fn test_failed_item_delete_reverts() {
        let (store, mut session, layer) = editor_with_layer();
        let id = block_on(session.add_item(image_item(0.0, 0.0))).unwrap();
        store.fail_writes(Some("permission denied"));
        assert!(matches!(block_on(session.delete_item(id)), Err(CanvasError::RemoteWrite(_))));
        assert!(session.layers().get(layer).unwrap().item(id).is_some());
    }

    #[test]
    fn test_failed_optimistic_commit_keeps_state() {
        let (store, mut session, _) = editor_with_layer();
        store.fail_writes(Some("offline"));
        let id = block_on(session.add_layer("Kept")).unwrap();
        assert!(session.layers().get(id).is_some());
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn test_reviewer_creates_todo_review() {
        let store = Arc::new(MemoryStore::new());
        let mut reviewer = session_for(&store, REVIEWER);
        let id = block_on(reviewer.create_review(NewReview::new("Button contrast").at(Point::new(10.0, 10.0)))).unwrap();
        let review = reviewer.reviews().iter().find(|r| r.id() == id).unwrap();
        assert_eq!(review.status(), ReviewStatus::Todo);
        assert_eq!(review.status_history().len(), 1);
        assert_eq!(store.document("p1").unwrap().reviews.len(), 1);
    }

    #[test]
    fn test_owner_review_rejected_without_change() {
        let store = Arc::new(MemoryStore::new());
        let mut owner = session_for(&store, OWNER);
        let err = block_on(owner.create_review(NewReview::new("Self review"))).unwrap_err();
        assert!(matches!(err, CanvasError::Permission(_)));
        assert!(owner.reviews().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_owner_can_resolve_review() {
        let store = Arc::new(MemoryStore::new());
        let mut reviewer = session_for(&store, REVIEWER);
        let id = block_on(reviewer.create_review(NewReview::new("Typo in header"))).unwrap();

        let mut owner = session_for(&store, OWNER);
        owner.subscribe().unwrap();
        assert_eq!(owner.poll_remote(), 1);
        block_on(owner.set_review_status(id, ReviewStatus::Done)).unwrap();
        assert_eq!(owner.reviews()[0].status_history().len(), 2);
    }

    #[test]
    fn test_zip_upload_rejected_before_network() {
        let (store, mut session, layer) = editor_with_layer();
        let uploader = MemoryUploader::default();
        let file = UploadFile::new("assets.zip", "application/zip", vec![0; 16]);
        let err = block_on(session.upload_media(&uploader, file, Point::new(500.0, 500.0))).unwrap_err();
        assert!(matches!(err, CanvasError::Validation(_)));
        assert_eq!(uploader.calls(), 0);
        assert!(session.layers().get(layer).unwrap().items.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_upload_and_delete_media() {
        let (_store, mut session, layer) = editor_with_layer();
        let uploader = MemoryUploader::default();
        let file = UploadFile::new("hero.png", "image/png", vec![1, 2, 3, 4]);
        let id = block_on(session.upload_media(&uploader, file, Point::new(960.0, 540.0))).unwrap();

        let item = session.layers().get(layer).unwrap().item(id).unwrap().clone();
        assert_eq!(item.item_type(), ItemType::Image);
        assert_eq!(item.center(), Point::new(960.0, 540.0));

        block_on(session.delete_media_item(&uploader, id)).unwrap();
        assert!(session.layers().get(layer).unwrap().items.is_empty());
        assert_eq!(uploader.calls(), 2);
    }

    #[test]
    fn test_comment_click_and_complete() {
        let (_store, mut session, layer) = editor_with_layer();
        session.set_tool(ToolKind::Comment);
        session.pointer_down(Point::new(300.0, 300.0)).unwrap();
        block_on(session.pointer_up(Point::new(301.0, 300.0))).unwrap();
        assert!(session.editor().is_some());
        assert!(session.set_editor_text("Align with grid"));

        let id = block_on(session.complete_edit()).unwrap().unwrap();
        let item = session.layers().get(layer).unwrap().item(id).unwrap();
        match &item.kind {
            ItemKind::Comment(c) => assert_eq!(c.author, EDITOR),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_edit_mutates_nothing() {
        let (store, mut session, layer) = editor_with_layer();
        session.set_tool(ToolKind::Text);
        session.pointer_down(Point::new(10.0, 10.0)).unwrap();
        block_on(session.pointer_up(Point::new(10.0, 10.0))).unwrap();
        session.set_editor_text("never mind");
        session.cancel_edit();
        assert!(session.layers().get(layer).unwrap().items.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_remote_change_replaces_state_wholesale() {
        let store = Arc::new(MemoryStore::new());
        let mut alice = session_for(&store, OWNER);
        let mut bob = session_for(&store, EDITOR);
        alice.subscribe().unwrap();
        bob.subscribe().unwrap();

        block_on(alice.add_layer("Alice layer")).unwrap();
        assert_eq!(bob.poll_remote(), 1);
        assert_eq!(bob.layers().layers()[0].name, "Alice layer");
        assert!(bob.active_layer_id().is_some());

        // Bob's write lands last and wins over Alice's.
        block_on(alice.add_layer("Alice second")).unwrap();
        block_on(bob.add_layer("Bob layer")).unwrap();
        alice.poll_remote();
        bob.poll_remote();
        let names: Vec<_> = alice.layers().layers().iter().map(|l| l.name.clone()).collect();
        assert_eq!(names, vec!["Alice layer", "Bob layer"]);
        assert_eq!(bob.layers().layers(), alice.layers().layers());
    }

    #[test]
    fn test_remote_read_failure_keeps_last_state() {
        let (store, mut session, layer) = editor_with_layer();
        store.fail_reads(Some("quota exceeded"));
        session.subscribe().unwrap();
        assert_eq!(session.poll_remote(), 0);
        assert!(session.layers().get(layer).is_some());
        assert_eq!(session.take_notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn test_remote_delete_cancels_drag() {
        let store = Arc::new(MemoryStore::new());
        let mut alice = session_for(&store, OWNER);
        let mut bob = session_for(&store, EDITOR);
        alice.subscribe().unwrap();
        bob.subscribe().unwrap();
        block_on(alice.add_layer("L1")).unwrap();
        let id = block_on(alice.add_item(image_item(0.0, 0.0))).unwrap();
        bob.poll_remote();

        bob.set_tool(ToolKind::Select);
        bob.pointer_down(Point::new(100.0, 50.0)).unwrap();
        assert!(bob.is_manipulating());

        block_on(alice.delete_item(id)).unwrap();
        bob.poll_remote();
        assert!(!bob.is_manipulating());
    }

    #[test]
    fn test_version_delete_and_filter() {
        let (_store, mut session, _) = editor_with_layer();
        let a = block_on(session.create_version("a", [VersionTag::Draft])).unwrap();
        block_on(session.create_version("b", [VersionTag::Final])).unwrap();
        assert_eq!(session.versions_by_tag(VersionTag::Draft).len(), 1);
        block_on(session.delete_version(a)).unwrap();
        assert!(session.versions_by_tag(VersionTag::Draft).is_empty());
        assert_eq!(session.versions().len(), 1);
    }

    #[test]
    fn test_reviewer_cannot_restore() {
        let store = Arc::new(MemoryStore::new());
        let mut owner = session_for(&store, OWNER);
        block_on(owner.add_layer("L1")).unwrap();
        let version = block_on(owner.create_version("v1", [])).unwrap();

        let mut reviewer = session_for(&store, REVIEWER);
        reviewer.subscribe().unwrap();
        reviewer.poll_remote();
        assert!(matches!(
            block_on(reviewer.restore_version(version, true)),
            Err(CanvasError::Permission(_))
        ));
    }

    #[test]
    fn test_non_member_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut stranger = session_for(&store, "mallory");
        assert_eq!(stranger.role(), None);
        assert!(matches!(block_on(stranger.add_layer("x")), Err(CanvasError::Permission(_))));
    }

    #[test]
    fn test_pointer_leave_ends_drag_with_immediate_write() {
        let (store, mut session, _) = editor_with_layer();
        let id = block_on(session.add_item(image_item(100.0, 100.0))).unwrap();
        store.clear_writes();

        let now = Instant::now();
        session.set_tool(ToolKind::Select);
        session.pointer_down(Point::new(200.0, 150.0)).unwrap();
        session
            .pointer_move(Point::new(260.0, 150.0), Modifiers::default(), now)
            .unwrap();
        assert_eq!(store.write_count(), 0);

        block_on(session.pointer_leave()).unwrap();
        assert_eq!(store.write_count(), 1);
        assert!(session.manipulated_item().is_none());
        assert!(!session.is_manipulating());
        let written = &store.writes()[0];
        let item = written.patch.layers.as_ref().unwrap()[0].item(id).unwrap();
        assert_eq!(item.center(), Point::new(260.0, 150.0));
    }

    #[test]
    fn test_select_click_without_move_writes_nothing() {
        let (store, mut session, _) = editor_with_layer();
        block_on(session.add_item(image_item(100.0, 100.0))).unwrap();
        store.clear_writes();

        session.set_tool(ToolKind::Select);
        session.pointer_down(Point::new(200.0, 150.0)).unwrap();
        assert!(session.is_manipulating());
        block_on(session.pointer_up(Point::new(200.0, 150.0))).unwrap();
        assert!(!session.is_manipulating());
        assert_eq!(store.write_count(), 0);
        assert!(!session.has_pending_write());
    }

    #[test]
    fn test_project_status_bumps_revision() {
        let store = Arc::new(MemoryStore::new());
        let mut owner = session_for(&store, OWNER);
        let before = owner.revision();
        block_on(owner.set_project_status(ProjectStatus::Approved)).unwrap();
        assert_eq!(owner.status(), ProjectStatus::Approved);
        assert!(owner.revision() > before);
    }

    #[test]
    fn test_restore_drops_drawing_and_gesture() {
        let (_store, mut session, _) = editor_with_layer();
        block_on(session.add_item(image_item(100.0, 100.0))).unwrap();
        let version = block_on(session.create_version("v1", [])).unwrap();

        session.set_tool(ToolKind::Select);
        session.pointer_down(Point::new(200.0, 150.0)).unwrap();
        assert!(session.is_manipulating());
        block_on(session.restore_version(version, true)).unwrap();
        assert!(!session.is_manipulating());
        assert_eq!(session.tool(), ToolKind::Select);

        session.set_tool(ToolKind::Pen);
        session.pointer_down(Point::new(500.0, 500.0)).unwrap();
        session
            .pointer_move(Point::new(520.0, 510.0), Modifiers::default(), Instant::now())
            .unwrap();
        block_on(session.restore_version(version, true)).unwrap();
        assert!(session.in_progress().is_none());
        assert_eq!(session.tool(), ToolKind::Pen);
    }
}
