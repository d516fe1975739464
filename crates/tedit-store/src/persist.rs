//! Snapshot persister
//!
//! Writes go to the local cache first (durable, never skipped once the
//! debounce window admits the write), then mirror to the remote store
//! best-effort. A remote failure is logged and swallowed; the cached copy
//! is the source of truth for the next restore if the remote stays down.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::cache::LocalCache;
use crate::error::Result;
use crate::remote::{RemoteStore, SnapshotPayload};
use crate::snapshot::DocumentSnapshot;

/// Minimum spacing between debounced writes
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(750);

/// Background autosave interval
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Cache-first snapshot persister with an optional remote mirror
pub struct Persister {
    cache: LocalCache,
    remote: Option<RemoteStore>,
    debounce: Duration,
    last_write: Mutex<Option<Instant>>,
}

impl Persister {
    /// Create a persister over a cache and an optional remote mirror
    #[must_use]
    pub fn new(cache: LocalCache, remote: Option<RemoteStore>) -> Self {
        Self {
            cache,
            remote,
            debounce: DEBOUNCE_WINDOW,
            last_write: Mutex::new(None),
        }
    }

    /// Override the debounce window (tests)
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// The underlying cache
    #[must_use]
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Persist unconditionally: durable cache write, then best-effort
    /// remote mirror.
    pub async fn persist(&self, document_id: &str, snapshot: &DocumentSnapshot) -> Result<()> {
        self.cache.save_snapshot(document_id, snapshot).await?;
        *self.last_write.lock().await = Some(Instant::now());

        if let Some(remote) = &self.remote {
            let payload = SnapshotPayload {
                data_url: Some(snapshot.composite.clone()),
                width: Some(snapshot.width),
                height: Some(snapshot.height),
                layers: Some(snapshot.layers.clone()),
            };
            if let Err(err) = remote.store(document_id, &payload).await {
                tracing::warn!(document_id, error = %err, "remote snapshot mirror failed");
            }
        }
        Ok(())
    }

    /// Persist unless a write landed within the debounce window. Returns
    /// whether a write happened.
    pub async fn maybe_persist(
        &self,
        document_id: &str,
        snapshot: &DocumentSnapshot,
    ) -> Result<bool> {
        {
            let last = self.last_write.lock().await;
            if let Some(at) = *last {
                if at.elapsed() < self.debounce {
                    return Ok(false);
                }
            }
        }
        self.persist(document_id, snapshot).await?;
        Ok(true)
    }

    /// Whether the autosave interval has elapsed since the last write.
    /// A persister that has never written is due immediately.
    pub async fn autosave_due(&self) -> bool {
        match *self.last_write.lock().await {
            Some(at) => at.elapsed() >= AUTOSAVE_INTERVAL,
            None => true,
        }
    }
}
