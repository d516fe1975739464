//! Document snapshot API
//!
//! GET returns the stored composite, per-layer images and metadata for a
//! document; POST accepts a partial payload and merges it, so a
//! metadata-only write at document setup and a later image write coexist.
//! Snapshots live in memory and mirror to the data directory; disk
//! failures degrade to memory-only with a warning.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// One document's stored snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSnapshot {
    data_url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    layers: HashMap<Uuid, String>,
}

/// Sidecar metadata file contents
#[derive(Debug, Serialize, Deserialize)]
struct DiskMetadata {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    layers: HashMap<Uuid, String>,
}

/// In-memory snapshot store with a best-effort disk mirror
pub struct SnapshotStore {
    entries: RwLock<HashMap<String, StoredSnapshot>>,
    data_dir: Option<PathBuf>,
}

impl SnapshotStore {
    /// Create a store; None keeps snapshots in memory only
    #[must_use]
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            data_dir,
        }
    }

    async fn get(&self, document_id: &str) -> Option<StoredSnapshot> {
        if let Some(entry) = self.entries.read().await.get(document_id) {
            return Some(entry.clone());
        }
        let loaded = self.load_from_disk(document_id).await?;
        self.entries
            .write()
            .await
            .insert(document_id.to_string(), loaded.clone());
        Some(loaded)
    }

    async fn merge(&self, document_id: &str, payload: CanvasPayload) {
        let merged = {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(document_id.to_string()).or_default();
            if let Some(data_url) = payload.data_url {
                entry.data_url = Some(data_url);
            }
            if let Some(width) = payload.width {
                entry.width = Some(width);
            }
            if let Some(height) = payload.height {
                entry.height = Some(height);
            }
            if let Some(layers) = payload.layers {
                entry.layers = layers;
            }
            entry.clone()
        };

        if let Err(e) = self.write_to_disk(document_id, &merged).await {
            warn!(document_id, error = %e, "snapshot disk write failed, keeping in memory");
        }
    }

    async fn load_from_disk(&self, document_id: &str) -> Option<StoredSnapshot> {
        let dir = self.data_dir.as_ref()?;
        let id = safe_id(document_id)?;

        let data_url = tokio::fs::read_to_string(dir.join(format!("{id}.png")))
            .await
            .ok();
        let metadata: Option<DiskMetadata> =
            match tokio::fs::read_to_string(dir.join(format!("{id}.json"))).await {
                Ok(json) => serde_json::from_str(&json).ok(),
                Err(_) => None,
            };
        if data_url.is_none() && metadata.is_none() {
            return None;
        }
        debug!(document_id, "snapshot loaded from disk");
        let metadata = metadata.unwrap_or(DiskMetadata {
            width: None,
            height: None,
            layers: HashMap::new(),
        });
        Some(StoredSnapshot {
            data_url,
            width: metadata.width,
            height: metadata.height,
            layers: metadata.layers,
        })
    }

    async fn write_to_disk(&self, document_id: &str, entry: &StoredSnapshot) -> std::io::Result<()> {
        let Some(dir) = self.data_dir.as_ref() else {
            return Ok(());
        };
        let Some(id) = safe_id(document_id) else {
            warn!(document_id, "document id not filesystem-safe, keeping in memory");
            return Ok(());
        };
        tokio::fs::create_dir_all(dir).await?;
        if let Some(data_url) = &entry.data_url {
            tokio::fs::write(dir.join(format!("{id}.png")), data_url).await?;
        }
        let metadata = DiskMetadata {
            width: entry.width,
            height: entry.height,
            layers: entry.layers.clone(),
        };
        let json = serde_json::to_string(&metadata).map_err(std::io::Error::other)?;
        tokio::fs::write(dir.join(format!("{id}.json")), json).await?;
        Ok(())
    }
}

/// Document ids become file names; anything else stays memory-only.
fn safe_id(document_id: &str) -> Option<String> {
    if document_id.is_empty()
        || !document_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some(document_id.to_string())
}

/// Partial snapshot payload accepted by POST
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasPayload {
    #[serde(default)]
    data_url: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    layers: Option<HashMap<Uuid, String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layers: Option<HashMap<Uuid, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
struct Metadata {
    width: u32,
    height: u32,
}

async fn get_canvas(
    State(store): State<Arc<SnapshotStore>>,
    Path(document_id): Path<String>,
) -> Json<FetchResponse> {
    match store.get(&document_id).await {
        Some(entry) => Json(FetchResponse {
            success: true,
            data_url: entry.data_url,
            layers: if entry.layers.is_empty() {
                None
            } else {
                Some(entry.layers)
            },
            metadata: entry.width.zip(entry.height).map(|(width, height)| Metadata {
                width,
                height,
            }),
        }),
        None => Json(FetchResponse {
            success: false,
            data_url: None,
            layers: None,
            metadata: None,
        }),
    }
}

async fn post_canvas(
    State(store): State<Arc<SnapshotStore>>,
    Path(document_id): Path<String>,
    Json(payload): Json<CanvasPayload>,
) -> Json<serde_json::Value> {
    store.merge(&document_id, payload).await;
    Json(serde_json::json!({ "success": true }))
}

/// Create snapshot routes
pub fn snapshot_routes(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route(
            "/api/documents/:document_id/canvas",
            get(get_canvas).post(post_canvas),
        )
        .with_state(store)
}
