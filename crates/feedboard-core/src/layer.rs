//! Layers and the ordered layer store.

use crate::error::{CanvasError, CanvasResult};
use crate::items::{ContentItem, ItemId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for layers.
pub type LayerId = Uuid;

/// An ordered, independently visible and lockable bucket of items.
///
/// Item order is compositing order (later = on top).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            items: Vec::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn item(&self, id: ItemId) -> Option<&ContentItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    fn item_index(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id() == id)
    }

    /// Deep copy of the layer and all of its items.
    pub fn structural_clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            visible: self.visible,
            locked: self.locked,
            items: self.items.iter().map(ContentItem::structural_clone).collect(),
        }
    }
}

/// Deep copy of a whole layer list.
pub fn structural_clone(layers: &[Layer]) -> Vec<Layer> {
    layers.iter().map(Layer::structural_clone).collect()
}

fn require_name(name: &str) -> CanvasResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CanvasError::validation("layer name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Ordered layers plus the active-layer selection.
///
/// The active layer is local UI state and never persisted.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    active: Option<LayerId>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted layers, activating the first one.
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        let active = layers.first().map(|l| l.id);
        Self { layers, active }
    }

    /// Layers in compositing order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn get_mut(&mut self, id: LayerId) -> CanvasResult<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| CanvasError::not_found(format!("layer {id}")))
    }

    fn unlocked_mut(&mut self, id: LayerId) -> CanvasResult<&mut Layer> {
        let layer = self.get_mut(id)?;
        if layer.locked {
            return Err(CanvasError::permission(format!("layer '{}' is locked", layer.name)));
        }
        Ok(layer)
    }

    pub fn active_id(&self) -> Option<LayerId> {
        self.active
    }

    pub fn active(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn set_active(&mut self, id: LayerId) -> CanvasResult<()> {
        if self.get(id).is_none() {
            return Err(CanvasError::not_found(format!("layer {id}")));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Append a new layer on top and make it active.
    pub fn add_layer(&mut self, name: &str) -> CanvasResult<LayerId> {
        let layer = Layer::new(require_name(name)?);
        let id = layer.id;
        self.layers.push(layer);
        self.active = Some(id);
        Ok(id)
    }

    /// Remove a layer and its content.
    ///
    /// When the active layer is removed the first remaining layer becomes
    /// active, or none if the store is now empty.
    pub fn remove_layer(&mut self, id: LayerId) -> CanvasResult<Layer> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| CanvasError::not_found(format!("layer {id}")))?;
        let removed = self.layers.remove(index);
        if self.active == Some(id) {
            self.active = self.layers.first().map(|l| l.id);
        }
        Ok(removed)
    }

    pub fn rename_layer(&mut self, id: LayerId, name: &str) -> CanvasResult<()> {
        let name = require_name(name)?;
        self.get_mut(id)?.name = name;
        Ok(())
    }

    /// Flip visibility, returning the new value.
    pub fn toggle_visibility(&mut self, id: LayerId) -> CanvasResult<bool> {
        let layer = self.get_mut(id)?;
        layer.visible = !layer.visible;
        Ok(layer.visible)
    }

    /// Flip the lock flag, returning the new value.
    pub fn toggle_lock(&mut self, id: LayerId) -> CanvasResult<bool> {
        let layer = self.get_mut(id)?;
        layer.locked = !layer.locked;
        Ok(layer.locked)
    }

    /// Append an item on top of a layer.
    pub fn add_item(&mut self, layer_id: LayerId, item: ContentItem) -> CanvasResult<ItemId> {
        let id = item.id();
        if self.find_item(id).is_some() {
            return Err(CanvasError::validation(format!("item {id} already exists")));
        }
        self.unlocked_mut(layer_id)?.items.push(item);
        Ok(id)
    }

    /// Remove an item from whichever layer holds it.
    pub fn remove_item(&mut self, id: ItemId) -> CanvasResult<(LayerId, ContentItem)> {
        let (layer_id, index) = self.locate(id)?;
        let layer = self.unlocked_mut(layer_id)?;
        Ok((layer_id, layer.items.remove(index)))
    }

    /// Replace an item in place, keeping its stacking position.
    pub fn replace_item(&mut self, item: ContentItem) -> CanvasResult<()> {
        let (layer_id, index) = self.locate(item.id())?;
        let layer = self.unlocked_mut(layer_id)?;
        layer.items[index] = item;
        Ok(())
    }

    /// Move an item to the top of another layer (delete + insert).
    pub fn move_item(&mut self, id: ItemId, target: LayerId) -> CanvasResult<()> {
        let (source, _) = self.locate(id)?;
        if source == target {
            return Ok(());
        }
        // Check both ends before touching either.
        self.unlocked_mut(source)?;
        self.unlocked_mut(target)?;
        let (_, item) = self.remove_item(id)?;
        self.unlocked_mut(target)?.items.push(item);
        Ok(())
    }

    fn locate(&self, id: ItemId) -> CanvasResult<(LayerId, usize)> {
        self.layers
            .iter()
            .find_map(|l| l.item_index(id).map(|i| (l.id, i)))
            .ok_or_else(|| CanvasError::not_found(format!("item {id}")))
    }

    /// Find an item and the layer holding it.
    pub fn find_item(&self, id: ItemId) -> Option<(&Layer, &ContentItem)> {
        self.layers
            .iter()
            .find_map(|l| l.item(id).map(|item| (l, item)))
    }

    /// Top-most item under a point across visible layers.
    pub fn item_at(&self, point: Point, tolerance: f64) -> Option<(&Layer, &ContentItem)> {
        self.layers
            .iter()
            .rev()
            .filter(|l| l.visible)
            .find_map(|l| {
                l.items
                    .iter()
                    .rev()
                    .find(|item| item.hit_test(point, tolerance))
                    .map(|item| (l, item))
            })
    }

    /// Replace every layer, keeping the active selection when it still exists.
    pub fn replace_all(&mut self, layers: Vec<Layer>) {
        self.layers = layers;
        let still_there = self.active.is_some_and(|id| self.get(id).is_some());
        if !still_there {
            self.active = self.layers.first().map(|l| l.id);
        }
    }

    /// Deep copy of all layers.
    pub fn snapshot(&self) -> Vec<Layer> {
        structural_clone(&self.layers)
    }

    /// Restore a previous snapshot together with its active selection.
    pub fn restore(&mut self, layers: Vec<Layer>, active: Option<LayerId>) {
        self.layers = layers;
        self.active = active.filter(|id| self.layers.iter().any(|l| l.id == *id));
    }

    pub fn item_count(&self) -> usize {
        self.layers.iter().map(|l| l.items.len()).sum()
    }
}
