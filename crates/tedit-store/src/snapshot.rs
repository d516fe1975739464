//! Document snapshot payload

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A flattened document image plus its per-layer images, as produced by
/// persistence and consumed by the remote store and newly joining peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Composite image as a PNG data URL
    pub composite: String,

    /// Declared logical width
    pub width: u32,

    /// Declared logical height
    pub height: u32,

    /// Per-layer images keyed by layer id
    #[serde(default)]
    pub layers: HashMap<Uuid, String>,
}

impl DocumentSnapshot {
    /// Create a snapshot with no per-layer images
    #[must_use]
    pub fn new(composite: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            composite: composite.into(),
            width,
            height,
            layers: HashMap::new(),
        }
    }

    /// Attach a per-layer image
    pub fn add_layer(&mut self, layer_id: Uuid, data_url: impl Into<String>) {
        self.layers.insert(layer_id, data_url.into());
    }
}
