//! Remote snapshot store client
//!
//! Request/response client for the document snapshot service. GET returns
//! the latest composite, per-layer images and declared dimensions; POST
//! accepts any subset of the same (metadata-only writes happen at
//! document-setup time). This store is a best-effort mirror: failures must
//! never block local operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// What the snapshot service returned for a document
#[derive(Debug, Clone, Default)]
pub struct SnapshotFetch {
    /// Latest composite image, if any
    pub data_url: Option<String>,
    /// Per-layer image map, if any
    pub layers: Option<HashMap<Uuid, String>>,
    /// Declared logical width
    pub width: Option<u32>,
    /// Declared logical height
    pub height: Option<u32>,
}

/// A partial payload to persist; omitted fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    /// Composite image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    /// Logical width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Logical height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Per-layer image map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<HashMap<Uuid, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchResponse {
    success: bool,
    #[serde(default)]
    data_url: Option<String>,
    #[serde(default)]
    layers: Option<HashMap<Uuid, String>>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    width: u32,
    height: u32,
}

/// HTTP client for the snapshot service
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteStore {
    /// Create a client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn canvas_url(&self, document_id: &str) -> String {
        format!("{}/api/documents/{document_id}/canvas", self.base_url)
    }

    /// Fetch the stored snapshot for a document
    pub async fn fetch(&self, document_id: &str) -> Result<SnapshotFetch> {
        let response = self
            .client
            .get(self.canvas_url(document_id))
            .send()
            .await?
            .error_for_status()?;
        let body: FetchResponse = response.json().await?;
        if !body.success {
            return Err(Error::Remote("snapshot service reported failure".into()));
        }
        Ok(SnapshotFetch {
            data_url: body.data_url,
            layers: body.layers,
            width: body.metadata.as_ref().map(|m| m.width),
            height: body.metadata.map(|m| m.height),
        })
    }

    /// Store a (partial) snapshot payload for a document
    pub async fn store(&self, document_id: &str, payload: &SnapshotPayload) -> Result<()> {
        self.client
            .post(self.canvas_url(document_id))
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
