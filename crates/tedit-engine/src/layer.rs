//! Layer Stack
//!
//! This module defines the layer data model and the ordered stack that owns
//! it. Orders are dense integers `0..n-1` after every mutation; higher order
//! means closer to the viewer. The stack never drops below one layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier for a layer
pub type LayerId = Uuid;

/// Kind of content a layer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Freely paintable raster layer
    Pixel,
    /// Imported image layer
    Image,
    /// Non-destructive embedded object
    SmartObject,
    /// Adjustment layer affecting layers beneath
    Adjustment,
}

fn default_opacity() -> u8 {
    100
}

fn default_visible() -> bool {
    true
}

/// One drawable layer with stacking metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier
    pub id: LayerId,

    /// Display name
    pub name: String,

    /// Content kind
    pub kind: LayerKind,

    /// Whether the layer contributes to the composite
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Opacity, 0-100
    #[serde(default = "default_opacity")]
    pub opacity: u8,

    /// Locked layers reject activation and drawing
    #[serde(default)]
    pub locked: bool,

    /// Stacking position; higher is closer to the viewer
    #[serde(default)]
    pub order: u32,
}

/// Attributes for a layer to be added
#[derive(Debug, Clone, Default)]
pub struct NewLayer {
    /// Display name (defaults to "Layer {n}")
    pub name: Option<String>,
    /// Content kind (defaults to Pixel)
    pub kind: Option<LayerKind>,
    /// Initial visibility (defaults to true)
    pub visible: Option<bool>,
    /// Initial opacity (defaults to 100)
    pub opacity: Option<u8>,
    /// Initial lock state (defaults to false)
    pub locked: Option<bool>,
}

/// Ordered stack of layers belonging to one document
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: LayerId,
}

impl LayerStack {
    /// Create a stack with a single default layer
    #[must_use]
    pub fn new() -> Self {
        let layer = Layer {
            id: Uuid::new_v4(),
            name: "Layer 1".to_string(),
            kind: LayerKind::Pixel,
            visible: true,
            opacity: 100,
            locked: false,
            order: 0,
        };
        let active = layer.id;
        Self {
            layers: vec![layer],
            active,
        }
    }

    /// Rebuild a stack from persisted layer metadata.
    ///
    /// Stable-sorts by stored order and renormalizes, so entries that were
    /// saved without an order keep their array position. An empty list
    /// falls back to a fresh single-layer stack.
    #[must_use]
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        if layers.is_empty() {
            return Self::new();
        }
        let mut stack = Self {
            active: layers[0].id,
            layers,
        };
        stack.renormalize();
        // Bottom-most layer starts active, as on a fresh document load.
        if let Some(bottom) = stack.sorted().first() {
            stack.active = bottom.id;
        }
        stack
    }

    /// Number of layers
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// A stack is never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All layers in insertion order
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Get a layer by id
    #[must_use]
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn get_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(Error::LayerNotFound(id))
    }

    /// The active layer
    #[must_use]
    pub fn active(&self) -> &Layer {
        // The active id always refers to a live layer; delete() re-targets it.
        self.layers
            .iter()
            .find(|l| l.id == self.active)
            .expect("active layer exists")
    }

    /// Id of the active layer
    #[must_use]
    pub fn active_id(&self) -> LayerId {
        self.active
    }

    /// Layers sorted bottom-to-top (ascending order)
    #[must_use]
    pub fn sorted(&self) -> Vec<&Layer> {
        let mut sorted: Vec<&Layer> = self.layers.iter().collect();
        sorted.sort_by_key(|l| l.order);
        sorted
    }

    /// Visible layers sorted bottom-to-top
    #[must_use]
    pub fn visible_sorted(&self) -> Vec<&Layer> {
        self.sorted().into_iter().filter(|l| l.visible).collect()
    }

    /// Add a layer at the top of the stack; it becomes active.
    pub fn add(&mut self, attrs: NewLayer) -> LayerId {
        let layer = Layer {
            id: Uuid::new_v4(),
            name: attrs
                .name
                .unwrap_or_else(|| format!("Layer {}", self.layers.len() + 1)),
            kind: attrs.kind.unwrap_or(LayerKind::Pixel),
            visible: attrs.visible.unwrap_or(true),
            opacity: attrs.opacity.unwrap_or(100).min(100),
            locked: attrs.locked.unwrap_or(false),
            order: self.layers.len() as u32,
        };
        let id = layer.id;
        self.layers.push(layer);
        self.active = id;
        self.renormalize();
        id
    }

    /// Delete a layer. Rejected for the last remaining layer. If the active
    /// layer is removed, the bottom-most remaining layer becomes active.
    pub fn delete(&mut self, id: LayerId) -> Result<Layer> {
        if self.layers.len() == 1 {
            return Err(Error::LastLayer);
        }
        let pos = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(Error::LayerNotFound(id))?;
        let removed = self.layers.remove(pos);
        if self.active == id {
            self.active = self.sorted()[0].id;
        }
        self.renormalize();
        Ok(removed)
    }

    /// Duplicate a layer. The clone is inserted immediately above the source
    /// and becomes active. Buffer contents are cloned by the caller.
    pub fn duplicate(&mut self, id: LayerId) -> Result<LayerId> {
        let source = self.get(id).ok_or(Error::LayerNotFound(id))?.clone();
        let source_order = source.order;
        for layer in &mut self.layers {
            if layer.order > source_order {
                layer.order += 1;
            }
        }
        let clone = Layer {
            id: Uuid::new_v4(),
            name: format!("{} copy", source.name),
            order: source_order + 1,
            ..source
        };
        let clone_id = clone.id;
        self.layers.push(clone);
        self.active = clone_id;
        self.renormalize();
        Ok(clone_id)
    }

    /// Move a layer to an arbitrary stacking position, shifting the
    /// displaced layers by one slot each.
    pub fn reorder(&mut self, id: LayerId, target_order: u32) -> Result<()> {
        self.get(id).ok_or(Error::LayerNotFound(id))?;
        let target = (target_order as usize).min(self.layers.len() - 1);

        let mut ids: Vec<LayerId> = self.sorted().iter().map(|l| l.id).collect();
        let pos = ids.iter().position(|&x| x == id).expect("layer in stack");
        ids.remove(pos);
        ids.insert(target, id);

        for (index, layer_id) in ids.iter().enumerate() {
            self.get_mut(*layer_id)?.order = index as u32;
        }
        Ok(())
    }

    /// Move a layer one slot toward the viewer. No-op at the top.
    pub fn move_up(&mut self, id: LayerId) -> Result<()> {
        let order = self.get(id).ok_or(Error::LayerNotFound(id))?.order;
        if (order as usize) < self.layers.len() - 1 {
            self.reorder(id, order + 1)?;
        }
        Ok(())
    }

    /// Move a layer one slot away from the viewer. No-op at the bottom.
    pub fn move_down(&mut self, id: LayerId) -> Result<()> {
        let order = self.get(id).ok_or(Error::LayerNotFound(id))?.order;
        if order > 0 {
            self.reorder(id, order - 1)?;
        }
        Ok(())
    }

    /// Set layer opacity, clamped to 0-100
    pub fn set_opacity(&mut self, id: LayerId, opacity: u8) -> Result<()> {
        self.get_mut(id)?.opacity = opacity.min(100);
        Ok(())
    }

    /// Toggle layer visibility
    pub fn toggle_visibility(&mut self, id: LayerId) -> Result<()> {
        let layer = self.get_mut(id)?;
        layer.visible = !layer.visible;
        Ok(())
    }

    /// Toggle the lock flag
    pub fn toggle_lock(&mut self, id: LayerId) -> Result<()> {
        let layer = self.get_mut(id)?;
        layer.locked = !layer.locked;
        Ok(())
    }

    /// Rename a layer. A blank name keeps the existing one.
    pub fn rename(&mut self, id: LayerId, name: &str) -> Result<()> {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.get_mut(id)?.name = trimmed.to_string();
        } else {
            self.get(id).ok_or(Error::LayerNotFound(id))?;
        }
        Ok(())
    }

    /// Make a layer active. Rejected when the target is locked.
    pub fn set_active(&mut self, id: LayerId) -> Result<()> {
        let layer = self.get(id).ok_or(Error::LayerNotFound(id))?;
        if layer.locked {
            return Err(Error::LayerLocked(id));
        }
        self.active = id;
        Ok(())
    }

    /// Reassign orders to the dense sequence `0..n-1`, stable over the
    /// previous ordering.
    fn renormalize(&mut self) {
        let mut ids: Vec<(u32, LayerId)> =
            self.layers.iter().map(|l| (l.order, l.id)).collect();
        ids.sort_by_key(|&(order, _)| order);
        for (index, (_, id)) in ids.iter().enumerate() {
            if let Some(layer) = self.layers.iter_mut().find(|l| l.id == *id) {
                layer.order = index as u32;
            }
        }
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders(stack: &LayerStack) -> Vec<u32> {
        stack.sorted().iter().map(|l| l.order).collect()
    }

    #[test]
    fn test_new_stack_has_one_layer() {
        let stack = LayerStack::new();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active().name, "Layer 1");
    }

    #[test]
    fn test_add_appends_at_top_and_activates() {
        let mut stack = LayerStack::new();
        let id = stack.add(NewLayer::default());
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.active_id(), id);
        assert_eq!(stack.get(id).unwrap().order, 1);
    }

    #[test]
    fn test_delete_last_layer_rejected() {
        let mut stack = LayerStack::new();
        let id = stack.active_id();
        let err = stack.delete(id).unwrap_err();
        assert!(matches!(err, Error::LastLayer));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_delete_retargets_active() {
        let mut stack = LayerStack::new();
        let bottom = stack.active_id();
        let top = stack.add(NewLayer::default());
        assert_eq!(stack.active_id(), top);

        stack.delete(top).unwrap();
        assert_eq!(stack.active_id(), bottom);
        assert_eq!(orders(&stack), vec![0]);
    }

    #[test]
    fn test_orders_stay_dense_after_mutations() {
        let mut stack = LayerStack::new();
        let a = stack.active_id();
        let b = stack.add(NewLayer::default());
        let c = stack.add(NewLayer::default());

        stack.delete(b).unwrap();
        assert_eq!(orders(&stack), vec![0, 1]);

        stack.reorder(c, 0).unwrap();
        assert_eq!(orders(&stack), vec![0, 1]);
        assert_eq!(stack.get(c).unwrap().order, 0);
        assert_eq!(stack.get(a).unwrap().order, 1);
    }

    #[test]
    fn test_duplicate_inserts_above_source() {
        let mut stack = LayerStack::new();
        let a = stack.active_id();
        let b = stack.add(NewLayer::default());

        let copy = stack.duplicate(a).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.active_id(), copy);
        assert_eq!(stack.get(a).unwrap().order, 0);
        assert_eq!(stack.get(copy).unwrap().order, 1);
        assert_eq!(stack.get(b).unwrap().order, 2);
        assert!(stack.get(copy).unwrap().name.ends_with("copy"));
    }

    #[test]
    fn test_reorder_target_position_exact() {
        let mut stack = LayerStack::new();
        let a = stack.active_id();
        let b = stack.add(NewLayer::default());
        let c = stack.add(NewLayer::default());
        let d = stack.add(NewLayer::default());

        stack.reorder(a, 2).unwrap();
        assert_eq!(stack.get(a).unwrap().order, 2);
        // Displaced layers shift by exactly one slot.
        assert_eq!(stack.get(b).unwrap().order, 0);
        assert_eq!(stack.get(c).unwrap().order, 1);
        assert_eq!(stack.get(d).unwrap().order, 3);
    }

    #[test]
    fn test_reorder_clamps_out_of_range() {
        let mut stack = LayerStack::new();
        let a = stack.active_id();
        stack.add(NewLayer::default());

        stack.reorder(a, 99).unwrap();
        assert_eq!(stack.get(a).unwrap().order, 1);
    }

    #[test]
    fn test_move_up_down_noop_at_ends() {
        let mut stack = LayerStack::new();
        let a = stack.active_id();
        let b = stack.add(NewLayer::default());

        stack.move_down(a).unwrap();
        assert_eq!(stack.get(a).unwrap().order, 0);

        stack.move_up(b).unwrap();
        assert_eq!(stack.get(b).unwrap().order, 1);

        stack.move_up(a).unwrap();
        assert_eq!(stack.get(a).unwrap().order, 1);
        assert_eq!(stack.get(b).unwrap().order, 0);
    }

    #[test]
    fn test_set_active_locked_rejected() {
        let mut stack = LayerStack::new();
        let a = stack.active_id();
        let b = stack.add(NewLayer::default());

        stack.toggle_lock(a).unwrap();
        let err = stack.set_active(a).unwrap_err();
        assert!(matches!(err, Error::LayerLocked(_)));
        assert_eq!(stack.active_id(), b);
    }

    #[test]
    fn test_opacity_clamped() {
        let mut stack = LayerStack::new();
        let id = stack.active_id();
        stack.set_opacity(id, 250).unwrap();
        assert_eq!(stack.get(id).unwrap().opacity, 100);
    }

    #[test]
    fn test_rename_blank_keeps_name() {
        let mut stack = LayerStack::new();
        let id = stack.active_id();
        stack.rename(id, "  ").unwrap();
        assert_eq!(stack.get(id).unwrap().name, "Layer 1");
        stack.rename(id, "Sketch").unwrap();
        assert_eq!(stack.get(id).unwrap().name, "Sketch");
    }

    #[test]
    fn test_from_layers_fills_defaults() {
        let json = r#"[
            {"id":"00000000-0000-0000-0000-000000000001","name":"bg","kind":"pixel"},
            {"id":"00000000-0000-0000-0000-000000000002","name":"fg","kind":"pixel"}
        ]"#;
        let layers: Vec<Layer> = serde_json::from_str(json).unwrap();
        let stack = LayerStack::from_layers(layers);
        assert_eq!(stack.len(), 2);
        assert_eq!(orders(&stack), vec![0, 1]);
        let bottom = stack.sorted()[0];
        assert_eq!(bottom.name, "bg");
        assert_eq!(bottom.opacity, 100);
        assert!(bottom.visible);
        assert!(!bottom.locked);
        assert_eq!(stack.active_id(), bottom.id);
    }

    #[test]
    fn test_from_layers_empty_falls_back() {
        let stack = LayerStack::from_layers(Vec::new());
        assert_eq!(stack.len(), 1);
    }
}
