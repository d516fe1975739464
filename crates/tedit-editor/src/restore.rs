//! Snapshot Restore
//!
//! Once-per-session restore of a document's persisted state: the layer
//! metadata list from the cache, then per-layer images remote-first with
//! the cache as fallback. A layer whose buffer already holds content is
//! skipped; the user's stroke beat the restore and must not be clobbered.
//! A single undecodable image skips that layer only.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use tedit_store::{
    cache::document_key, decode_data_url, LocalCache, RemoteStore,
};

use crate::editor::EditorSession;
use crate::error::Result;

/// Restore a session from its persisted snapshot.
///
/// Returns false when the session was already restored (the latch is set
/// on first attempt, successful or not). Remote fetch failures degrade to
/// the cache; a hit from either source is written back to the cache.
pub async fn restore_session(
    session: &mut EditorSession,
    cache: &LocalCache,
    remote: Option<&RemoteStore>,
) -> Result<bool> {
    if session.restored {
        return Ok(false);
    }
    session.restored = true;

    let document_id = session.config().document_id.clone();
    session.load_layers(cache).await?;

    let (composite, layers, declared) = load_snapshot(&document_id, cache, remote).await?;

    if layers.is_empty() {
        // No per-layer data survives; a composite alone lands on the
        // bottom layer.
        if let Some(data_url) = composite {
            let bottom = session.stack().sorted()[0].id;
            apply_layer_image(session, bottom, &data_url, declared);
        }
    } else {
        for (layer_id, data_url) in &layers {
            if session.stack().get(*layer_id).is_none() {
                debug!(layer_id = %layer_id, "snapshot references unknown layer, skipping");
                continue;
            }
            apply_layer_image(session, *layer_id, data_url, declared);
        }
    }

    session.recomposite();
    info!(document_id, layers = layers.len(), "session restored");
    Ok(true)
}

/// Decode one layer image into its buffer, honoring the content guard.
fn apply_layer_image(
    session: &mut EditorSession,
    layer_id: Uuid,
    data_url: &str,
    declared: Option<(u32, u32)>,
) {
    if !session.surfaces_mut().begin_restore(layer_id) {
        debug!(layer_id = %layer_id, "layer already has content, restore skipped");
        return;
    }
    let img = match decode_data_url(data_url) {
        Ok(img) => img,
        Err(e) => {
            warn!(layer_id = %layer_id, error = %e, "layer image undecodable, skipping");
            session.surfaces_mut().abandon_restore(layer_id);
            return;
        }
    };
    let (width, height) = declared.unwrap_or((
        session.config().logical_width,
        session.config().logical_height,
    ));
    let dpr = session.config().dpr;
    let surface = session.surfaces_mut().ensure(layer_id, width, height, dpr);
    surface.draw_image_replace(&img);
    session.surfaces_mut().finish_restore(layer_id);
}

/// Fetch the snapshot remote-first, falling back to the cache. A remote
/// hit is written back to the cache.
async fn load_snapshot(
    document_id: &str,
    cache: &LocalCache,
    remote: Option<&RemoteStore>,
) -> Result<(Option<String>, HashMap<Uuid, String>, Option<(u32, u32)>)> {
    if let Some(remote) = remote {
        match remote.fetch(document_id).await {
            Ok(fetch) => {
                if fetch.data_url.is_some() || fetch.layers.is_some() {
                    if let Some(data_url) = &fetch.data_url {
                        cache.put(&document_key(document_id), data_url).await?;
                    }
                    if let Some(layers) = &fetch.layers {
                        cache.save_layer_images(document_id, layers).await?;
                    }
                    let declared = fetch.width.zip(fetch.height);
                    return Ok((fetch.data_url, fetch.layers.unwrap_or_default(), declared));
                }
            }
            Err(e) => {
                warn!(document_id, error = %e, "remote snapshot fetch failed, using cache");
            }
        }
    }

    let composite = cache.load_composite(document_id).await?;
    let layers = cache
        .load_layer_images(document_id)
        .await?
        .unwrap_or_default();
    Ok((composite, layers, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tedit_engine::{Point, Tool};
    use crate::editor::EditorConfig;

    fn session(document_id: &str) -> EditorSession {
        EditorSession::new(EditorConfig {
            document_id: document_id.to_string(),
            user_id: Uuid::new_v4(),
            logical_width: 32,
            logical_height: 32,
            dpr: 1.0,
        })
    }

    fn draw_dot(session: &mut EditorSession, x: f32, y: f32) {
        let origin = Point::new(0.0, 0.0);
        let displayed = (32.0, 32.0);
        assert!(session
            .pointer_down(Point::new(x, y), origin, displayed)
            .unwrap());
        session.pointer_up().unwrap();
    }

    async fn persist(session: &EditorSession, cache: &LocalCache) {
        let snapshot = session.snapshot().unwrap();
        cache
            .save_snapshot(&session.config().document_id, &snapshot)
            .await
            .unwrap();
        session.persist_layers(cache).await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let cache = LocalCache::in_memory().await.unwrap();

        let mut original = session("doc-1");
        draw_dot(&mut original, 10.0, 10.0);
        persist(&original, &cache).await;

        let mut reloaded = session("doc-1");
        assert!(restore_session(&mut reloaded, &cache, None).await.unwrap());

        assert_eq!(reloaded.stack().len(), original.stack().len());
        assert_eq!(
            reloaded.composite().pixels().as_raw(),
            original.composite().pixels().as_raw()
        );
    }

    #[tokio::test]
    async fn test_restore_runs_once() {
        let cache = LocalCache::in_memory().await.unwrap();
        let mut editor = session("doc-1");

        assert!(restore_session(&mut editor, &cache, None).await.unwrap());
        assert!(!restore_session(&mut editor, &cache, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_stroke_wins_over_restore() {
        let cache = LocalCache::in_memory().await.unwrap();

        let mut original = session("doc-1");
        draw_dot(&mut original, 25.0, 25.0);
        persist(&original, &cache).await;

        // The reloading user starts drawing before the restore applies.
        let mut reloaded = session("doc-1");
        reloaded.load_layers(&cache).await.unwrap();
        draw_dot(&mut reloaded, 5.0, 5.0);

        assert!(restore_session(&mut reloaded, &cache, None).await.unwrap());

        // The restored image never replaced the drawn-on buffer: the new
        // stroke survives and the persisted dot is absent.
        let layer = reloaded.stack().sorted()[0].id;
        let surface = reloaded.surfaces().get(layer).unwrap();
        assert!(surface.pixels().get_pixel(5, 5).0[3] > 0);
        assert_eq!(surface.pixels().get_pixel(25, 25).0[3], 0);
    }

    #[tokio::test]
    async fn test_stroke_before_restore_survives() {
        let cache = LocalCache::in_memory().await.unwrap();

        let mut original = session("doc-1");
        draw_dot(&mut original, 10.0, 10.0);
        persist(&original, &cache).await;

        // A fresh session whose user draws before restore runs: the drawn
        // layer is absent from the persisted list, but loading that list
        // must not orphan it.
        let mut reloaded = session("doc-1");
        draw_dot(&mut reloaded, 5.0, 5.0);
        let drawn = reloaded.stack().active_id();

        assert!(restore_session(&mut reloaded, &cache, None).await.unwrap());

        assert!(reloaded.stack().get(drawn).is_some());
        assert_ne!(
            reloaded.composite().pixels().get_pixel(5, 5).0,
            [248, 250, 252, 255],
            "stroke lost after restore"
        );
        // The persisted dot restored onto its own layer alongside.
        assert_ne!(
            reloaded.composite().pixels().get_pixel(10, 10).0,
            [248, 250, 252, 255]
        );
    }

    #[tokio::test]
    async fn test_corrupt_layer_image_skipped() {
        let cache = LocalCache::in_memory().await.unwrap();

        let mut original = session("doc-1");
        draw_dot(&mut original, 10.0, 10.0);
        let mut snapshot = original.snapshot().unwrap();
        for value in snapshot.layers.values_mut() {
            *value = "data:image/png;base64,corrupt".to_string();
        }
        cache.save_snapshot("doc-1", &snapshot).await.unwrap();
        original.persist_layers(&cache).await.unwrap();

        let mut reloaded = session("doc-1");
        assert!(restore_session(&mut reloaded, &cache, None).await.unwrap());

        // The bad layer stayed empty and is reallocatable again.
        let layer = reloaded.stack().sorted()[0].id;
        assert_eq!(
            reloaded.surfaces().state(layer),
            tedit_engine::ContentState::Empty
        );
    }

    #[tokio::test]
    async fn test_composite_only_restore_lands_on_bottom_layer() {
        let cache = LocalCache::in_memory().await.unwrap();

        let mut original = session("doc-1");
        draw_dot(&mut original, 10.0, 10.0);
        let mut snapshot = original.snapshot().unwrap();
        snapshot.layers.clear();
        cache.save_snapshot("doc-1", &snapshot).await.unwrap();

        let mut reloaded = session("doc-1");
        assert!(restore_session(&mut reloaded, &cache, None).await.unwrap());

        let bottom = reloaded.stack().sorted()[0].id;
        assert_eq!(
            reloaded.surfaces().state(bottom),
            tedit_engine::ContentState::Content
        );
    }
}
