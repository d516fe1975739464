//! Editor Session
//!
//! One session per open document. The session owns the layer stack, the
//! surface registry, the stroke engine and the composite buffer, and turns
//! pointer input into draw events for the relay at a fixed flush cadence.
//! Incoming relay traffic is rasterized onto a dedicated receive-side
//! layer so remote strokes never collide with the local user's layers.

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};
use uuid::Uuid;

use std::collections::{HashMap, HashSet};

use tedit_engine::{
    apply_stroke, draw_image_fitted, extend_stroke, format_hex_color, map_to_logical,
    parse_hex_color, render_composite, BrushStyle, CompositeMode, ContentState, Layer, LayerId,
    LayerStack, LineCap, NewLayer, Point, StrokeEngine, Surface, SurfaceRegistry, Tool,
    DEFAULT_BACKGROUND,
};
use tedit_store::{cache::layer_list_key, encode_png_data_url, DocumentSnapshot, LocalCache};
use tedit_sync::{BlendOp, ClientMessage, ServerMessage, StrokeCap, WirePoint};

use crate::error::{Error, Result};

/// Points accumulated before a partial stroke is flushed to peers.
pub const STROKE_FLUSH_POINTS: usize = 3;

/// Settings for an editor session
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Document being edited
    pub document_id: String,
    /// Local user identity on the wire
    pub user_id: Uuid,
    /// Logical canvas width
    pub logical_width: u32,
    /// Logical canvas height
    pub logical_height: u32,
    /// Device pixel ratio
    pub dpr: f32,
}

/// Editing state for one open document
pub struct EditorSession {
    config: EditorConfig,
    stack: LayerStack,
    surfaces: SurfaceRegistry,
    engine: StrokeEngine,
    composite: Surface,
    tool: Tool,
    brush_color: Rgba<u8>,
    brush_width: f32,
    remote_layer: Option<LayerId>,
    remote_last: HashMap<Uuid, Point>,
    flushed: usize,
    pub(crate) restored: bool,
}

impl EditorSession {
    /// Create a session with a fresh single-layer document
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let composite = Surface::new(config.logical_width, config.logical_height, config.dpr);
        let mut session = Self {
            config,
            stack: LayerStack::new(),
            surfaces: SurfaceRegistry::new(),
            engine: StrokeEngine::new(),
            composite,
            tool: Tool::Brush,
            brush_color: Rgba([0, 0, 0, 255]),
            brush_width: 2.0,
            remote_layer: None,
            remote_last: HashMap::new(),
            flushed: 0,
            restored: false,
        };
        session.recomposite();
        session
    }

    /// The session config
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The layer stack
    #[must_use]
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// The surface registry
    #[must_use]
    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    /// The rendered composite
    #[must_use]
    pub fn composite(&self) -> &Surface {
        &self.composite
    }

    /// Select the active tool
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Current tool
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Set the brush color from a hex string
    pub fn set_brush_color(&mut self, value: &str) -> Result<()> {
        self.brush_color =
            parse_hex_color(value).ok_or_else(|| Error::InvalidColor(value.to_string()))?;
        Ok(())
    }

    /// Set the brush width in logical pixels
    pub fn set_brush_width(&mut self, width: f32) {
        self.brush_width = width.max(0.1);
    }

    // ---- Pointer input ----

    /// Begin a stroke from an on-screen pointer position.
    ///
    /// Returns false when the input was rejected (non-drawing tool, locked
    /// layer); rejections are expected interaction outcomes, not faults.
    pub fn pointer_down(
        &mut self,
        display: Point,
        origin: Point,
        displayed: (f32, f32),
    ) -> Result<bool> {
        let point = self.to_logical(display, origin, displayed);
        let style = BrushStyle::for_tool(self.tool, self.brush_color, self.brush_width);
        match self.engine.begin(
            &self.stack,
            &mut self.surfaces,
            self.tool,
            style,
            point,
            (self.config.logical_width, self.config.logical_height),
            self.config.dpr,
        ) {
            Ok(()) => {
                self.flushed = 0;
                self.recomposite();
                Ok(true)
            }
            Err(e) if e.is_rejection() => {
                debug!(reason = %e, "stroke rejected");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Extend the open stroke. Every [`STROKE_FLUSH_POINTS`] accumulated
    /// points a partial draw event is returned for the relay.
    pub fn pointer_move(
        &mut self,
        display: Point,
        origin: Point,
        displayed: (f32, f32),
    ) -> Result<Option<ClientMessage>> {
        if !self.engine.is_drawing() {
            return Ok(None);
        }
        let point = self.to_logical(display, origin, displayed);
        let count = self.engine.continue_to(&mut self.surfaces, point)?;
        self.recomposite();

        if count - self.flushed >= STROKE_FLUSH_POINTS {
            let event = self.flush_from(self.flushed);
            self.flushed = count;
            return Ok(event);
        }
        Ok(None)
    }

    /// Close the open stroke, returning a draw event for any unflushed
    /// tail. Redundant pointer-up is a no-op.
    pub fn pointer_up(&mut self) -> Result<Option<ClientMessage>> {
        let Some(stroke) = self.engine.end() else {
            return Ok(None);
        };
        let event = if stroke.points.len() > self.flushed {
            // Re-send the last flushed point so peers join the segments.
            let start = self.flushed.saturating_sub(1);
            Some(self.draw_event(&stroke.points[start..], &stroke.style))
        } else {
            None
        };
        self.flushed = 0;
        self.recomposite();
        Ok(event)
    }

    fn flush_from(&self, flushed: usize) -> Option<ClientMessage> {
        let style = self.engine.drawing_style()?;
        let points = self.engine.pending_points();
        let start = flushed.saturating_sub(1);
        if start >= points.len() {
            return None;
        }
        Some(self.draw_event(&points[start..], &style))
    }

    fn draw_event(&self, points: &[Point], style: &BrushStyle) -> ClientMessage {
        ClientMessage::DrawEvent {
            document_id: self.config.document_id.clone(),
            path: points
                .iter()
                .map(|p| WirePoint { x: p.x, y: p.y })
                .collect(),
            stroke_style: format_hex_color(style.color),
            line_width: style.line_width,
            user_id: self.config.user_id,
            mode: match style.mode {
                CompositeMode::SourceOver => BlendOp::SourceOver,
                CompositeMode::DestinationOut => BlendOp::DestinationOut,
            },
            cap: match style.cap {
                LineCap::Round => StrokeCap::Round,
                LineCap::Square => StrokeCap::Square,
            },
        }
    }

    fn to_logical(&self, display: Point, origin: Point, displayed: (f32, f32)) -> Point {
        map_to_logical(
            display,
            origin,
            displayed,
            (self.config.logical_width, self.config.logical_height),
        )
    }

    // ---- Layer operations ----

    /// Add a layer; it becomes active
    pub fn add_layer(&mut self, attrs: NewLayer) -> LayerId {
        let id = self.stack.add(attrs);
        self.recomposite();
        id
    }

    /// Delete a layer and its buffer
    pub fn delete_layer(&mut self, id: LayerId) -> Result<()> {
        self.stack.delete(id)?;
        self.surfaces.remove(id);
        if self.remote_layer == Some(id) {
            self.remote_layer = None;
        }
        self.recomposite();
        Ok(())
    }

    /// Duplicate a layer, cloning its buffer
    pub fn duplicate_layer(&mut self, id: LayerId) -> Result<LayerId> {
        let clone = self.stack.duplicate(id)?;
        self.surfaces.clone_into(id, clone);
        self.recomposite();
        Ok(clone)
    }

    /// Move a layer to an arbitrary stacking position
    pub fn reorder_layer(&mut self, id: LayerId, target_order: u32) -> Result<()> {
        self.stack.reorder(id, target_order)?;
        self.recomposite();
        Ok(())
    }

    /// Move a layer one slot toward the viewer
    pub fn move_layer_up(&mut self, id: LayerId) -> Result<()> {
        self.stack.move_up(id)?;
        self.recomposite();
        Ok(())
    }

    /// Move a layer one slot away from the viewer
    pub fn move_layer_down(&mut self, id: LayerId) -> Result<()> {
        self.stack.move_down(id)?;
        self.recomposite();
        Ok(())
    }

    /// Set a layer's opacity (0-100)
    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: u8) -> Result<()> {
        self.stack.set_opacity(id, opacity)?;
        self.recomposite();
        Ok(())
    }

    /// Toggle a layer's visibility
    pub fn toggle_layer_visibility(&mut self, id: LayerId) -> Result<()> {
        self.stack.toggle_visibility(id)?;
        self.recomposite();
        Ok(())
    }

    /// Toggle a layer's lock
    pub fn toggle_layer_lock(&mut self, id: LayerId) -> Result<()> {
        self.stack.toggle_lock(id)?;
        Ok(())
    }

    /// Rename a layer
    pub fn rename_layer(&mut self, id: LayerId, name: &str) -> Result<()> {
        self.stack.rename(id, name)?;
        Ok(())
    }

    /// Make a layer active
    pub fn set_active_layer(&mut self, id: LayerId) -> Result<()> {
        self.stack.set_active(id)?;
        Ok(())
    }

    /// Draw an imported image centered and scaled-to-fit onto the active
    /// layer.
    pub fn import_image(&mut self, img: &RgbaImage) -> Result<()> {
        let active = self.stack.active();
        if active.locked {
            return Err(tedit_engine::Error::LayerLocked(active.id).into());
        }
        let id = active.id;
        let surface = self.surfaces.ensure(
            id,
            self.config.logical_width,
            self.config.logical_height,
            self.config.dpr,
        );
        draw_image_fitted(surface, img);
        self.surfaces.mark_content(id);
        self.recomposite();
        Ok(())
    }

    // ---- Sync ----

    /// Apply an incoming relay message. A state request yields the reply
    /// to send back; everything else mutates session state.
    pub fn apply_remote(&mut self, msg: &ServerMessage) -> Result<Option<ClientMessage>> {
        match msg {
            ServerMessage::DrawEvent {
                path,
                stroke_style,
                line_width,
                mode,
                cap,
                user_id,
                ..
            } => {
                let Some(color) = parse_hex_color(stroke_style) else {
                    warn!(stroke_style, "dropping draw event with unparseable color");
                    return Ok(None);
                };
                let style = BrushStyle {
                    color,
                    line_width: *line_width,
                    mode: match mode {
                        BlendOp::SourceOver => CompositeMode::SourceOver,
                        BlendOp::DestinationOut => CompositeMode::DestinationOut,
                    },
                    cap: match cap {
                        StrokeCap::Round => LineCap::Round,
                        StrokeCap::Square => LineCap::Square,
                    },
                };
                let points: Vec<Point> =
                    path.iter().map(|p| Point::new(p.x, p.y)).collect();
                debug!(user_id = %user_id, points = points.len(), "applying remote stroke");

                // A chunk whose first point is the sender's previous last
                // point continues an in-flight stroke; that point was
                // already stamped, so only the segments are drawn. A
                // single-point path is always a fresh click: chunks carry
                // the join point plus at least one new point.
                let continuation = points.len() > 1
                    && points
                        .first()
                        .is_some_and(|p| self.remote_last.get(user_id) == Some(p));
                if let Some(last) = points.last() {
                    self.remote_last.insert(*user_id, *last);
                }

                let id = self.remote_layer_id();
                let surface = self.surfaces.ensure(
                    id,
                    self.config.logical_width,
                    self.config.logical_height,
                    self.config.dpr,
                );
                if continuation {
                    extend_stroke(surface, &points, &style);
                } else {
                    apply_stroke(surface, &points, &style);
                }
                self.surfaces.mark_content(id);
                self.recomposite();
                Ok(None)
            }

            ServerMessage::CanvasUpdate { data_url } => {
                let img = tedit_store::decode_data_url(data_url)?;
                let id = self.remote_layer_id();
                let surface = self.surfaces.ensure(
                    id,
                    self.config.logical_width,
                    self.config.logical_height,
                    self.config.dpr,
                );
                surface.draw_image_replace(&img);
                self.surfaces.mark_content(id);
                self.recomposite();
                Ok(None)
            }

            ServerMessage::RequestCanvasState { requester_id, .. } => {
                let data_url = encode_png_data_url(self.composite.pixels())
                    .map_err(tedit_store::Error::from)?;
                Ok(Some(ClientMessage::SendCanvasState {
                    document_id: self.config.document_id.clone(),
                    data_url,
                    target_user_id: Some(*requester_id),
                }))
            }

            ServerMessage::UserJoined { user_id } => {
                debug!(user_id = %user_id, "peer joined");
                Ok(None)
            }
            ServerMessage::UserLeft { user_id } => {
                debug!(user_id = %user_id, "peer left");
                self.remote_last.remove(user_id);
                Ok(None)
            }
        }
    }

    /// The layer remote strokes land on, created above the stack on first
    /// use without stealing the active layer.
    fn remote_layer_id(&mut self) -> LayerId {
        if let Some(id) = self.remote_layer {
            if self.stack.get(id).is_some() {
                return id;
            }
        }
        let prev = self.stack.active_id();
        let id = self.stack.add(NewLayer {
            name: Some("Remote".to_string()),
            ..Default::default()
        });
        if self.stack.set_active(prev).is_err() {
            // prev is locked; the remote layer stays active instead
        }
        self.remote_layer = Some(id);
        id
    }

    // ---- Persistence ----

    /// Flatten the session into a snapshot: the composite plus every layer
    /// buffer that holds content.
    pub fn snapshot(&self) -> Result<DocumentSnapshot> {
        let composite =
            encode_png_data_url(self.composite.pixels()).map_err(tedit_store::Error::from)?;
        let mut snapshot = DocumentSnapshot::new(
            composite,
            self.config.logical_width,
            self.config.logical_height,
        );
        for layer in self.stack.layers() {
            if self.surfaces.state(layer.id) != ContentState::Content {
                continue;
            }
            if let Some(surface) = self.surfaces.get(layer.id) {
                let data_url =
                    encode_png_data_url(surface.pixels()).map_err(tedit_store::Error::from)?;
                snapshot.add_layer(layer.id, data_url);
            }
        }
        Ok(snapshot)
    }

    /// Persist the layer metadata list so the stack survives reloads
    pub async fn persist_layers(&self, cache: &LocalCache) -> Result<()> {
        let json = serde_json::to_string(self.stack.layers())
            .map_err(tedit_store::Error::from)?;
        cache
            .put(&layer_list_key(&self.config.document_id), &json)
            .await?;
        Ok(())
    }

    /// Load the persisted layer metadata list, if present.
    ///
    /// Layers drawn on before the list arrived are not in it; they are
    /// retained on top of the persisted stack so a stroke that raced the
    /// load keeps its layer and its buffer.
    pub async fn load_layers(&mut self, cache: &LocalCache) -> Result<bool> {
        let Some(json) = cache.get(&layer_list_key(&self.config.document_id)).await? else {
            return Ok(false);
        };
        let mut layers: Vec<Layer> =
            serde_json::from_str(&json).map_err(tedit_store::Error::from)?;

        let persisted: HashSet<LayerId> = layers.iter().map(|l| l.id).collect();
        let drawn: Vec<Layer> = self
            .stack
            .layers()
            .iter()
            .filter(|l| {
                self.surfaces.state(l.id) == ContentState::Content && !persisted.contains(&l.id)
            })
            .cloned()
            .collect();
        let mut next_order = layers.iter().map(|l| l.order + 1).max().unwrap_or(0);
        for mut layer in drawn {
            layer.order = next_order;
            next_order += 1;
            layers.push(layer);
        }

        let prev_active = self.stack.active_id();
        self.stack = LayerStack::from_layers(layers);
        if self.stack.get(prev_active).is_some() {
            let _ = self.stack.set_active(prev_active);
        }
        self.recomposite();
        Ok(true)
    }

    /// Re-render the composite from current state
    pub fn recomposite(&mut self) {
        render_composite(
            &self.stack,
            &self.surfaces,
            &mut self.composite,
            DEFAULT_BACKGROUND,
        );
    }

    pub(crate) fn surfaces_mut(&mut self) -> &mut SurfaceRegistry {
        &mut self.surfaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EditorSession {
        EditorSession::new(EditorConfig {
            document_id: "doc-1".to_string(),
            user_id: Uuid::new_v4(),
            logical_width: 64,
            logical_height: 64,
            dpr: 1.0,
        })
    }

    fn identity(p: Point) -> (Point, Point, (f32, f32)) {
        (p, Point::new(0.0, 0.0), (64.0, 64.0))
    }

    #[test]
    fn test_pointer_down_with_non_drawing_tool() {
        let mut session = session();
        session.set_tool(Tool::Move);
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        assert!(!session.pointer_down(p, o, d).unwrap());
    }

    #[test]
    fn test_flush_cadence() {
        let mut session = session();
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        assert!(session.pointer_down(p, o, d).unwrap());

        // Second point: below cadence, nothing flushed.
        assert!(session
            .pointer_move(Point::new(10.0, 5.0), o, d)
            .unwrap()
            .is_none());

        // Third point reaches the cadence.
        let event = session
            .pointer_move(Point::new(15.0, 5.0), o, d)
            .unwrap()
            .expect("flush at cadence");
        match event {
            ClientMessage::DrawEvent { path, .. } => assert_eq!(path.len(), 3),
            other => unreachable!("Expected DrawEvent, got {:?}", other),
        }

        // Tail flush on pointer-up re-sends the join point.
        session.pointer_move(Point::new(20.0, 5.0), o, d).unwrap();
        let tail = session.pointer_up().unwrap().expect("tail flush");
        match tail {
            ClientMessage::DrawEvent { path, .. } => assert_eq!(path.len(), 2),
            other => unreachable!("Expected DrawEvent, got {:?}", other),
        }
    }

    #[test]
    fn test_single_click_emits_one_point() {
        let mut session = session();
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        session.pointer_down(p, o, d).unwrap();
        let event = session.pointer_up().unwrap().expect("click flush");
        match event {
            ClientMessage::DrawEvent { path, mode, .. } => {
                assert_eq!(path.len(), 1);
                assert_eq!(mode, BlendOp::SourceOver);
            }
            other => unreachable!("Expected DrawEvent, got {:?}", other),
        }
    }

    #[test]
    fn test_eraser_event_carries_mode() {
        let mut session = session();
        session.set_tool(Tool::Eraser);
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        session.pointer_down(p, o, d).unwrap();
        let event = session.pointer_up().unwrap().unwrap();
        match event {
            ClientMessage::DrawEvent { mode, .. } => {
                assert_eq!(mode, BlendOp::DestinationOut);
            }
            other => unreachable!("Expected DrawEvent, got {:?}", other),
        }
    }

    #[test]
    fn test_pencil_event_carries_square_cap() {
        let mut session = session();
        session.set_tool(Tool::Pencil);
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        session.pointer_down(p, o, d).unwrap();
        let event = session.pointer_up().unwrap().unwrap();
        match event {
            ClientMessage::DrawEvent { cap, mode, .. } => {
                assert_eq!(cap, StrokeCap::Square);
                assert_eq!(mode, BlendOp::SourceOver);
            }
            other => unreachable!("Expected DrawEvent, got {:?}", other),
        }
    }

    #[test]
    fn test_remote_click_at_previous_stroke_end_still_paints() {
        let mut session = session();
        let peer = Uuid::new_v4();
        let stroke = ServerMessage::DrawEvent {
            document_id: "doc-1".to_string(),
            path: vec![WirePoint { x: 10.0, y: 10.0 }, WirePoint { x: 20.0, y: 20.0 }],
            stroke_style: "#000000".to_string(),
            line_width: 8.0,
            user_id: peer,
            mode: BlendOp::SourceOver,
            cap: StrokeCap::Round,
        };
        session.apply_remote(&stroke).unwrap();

        // A separate click starting exactly where the stroke ended is a
        // new one-point stroke, not a chunk continuation; it must stamp.
        let click = ServerMessage::DrawEvent {
            document_id: "doc-1".to_string(),
            path: vec![WirePoint { x: 20.0, y: 20.0 }],
            stroke_style: "#ff0000".to_string(),
            line_width: 8.0,
            user_id: peer,
            mode: BlendOp::SourceOver,
            cap: StrokeCap::Round,
        };
        session.apply_remote(&click).unwrap();

        let px = session.composite().pixels().get_pixel(20, 20);
        assert_eq!(px.0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_remote_stroke_keeps_active_layer() {
        let mut session = session();
        let active = session.stack().active_id();

        let msg = ServerMessage::DrawEvent {
            document_id: "doc-1".to_string(),
            path: vec![WirePoint { x: 10.0, y: 10.0 }, WirePoint { x: 20.0, y: 20.0 }],
            stroke_style: "#ff0000".to_string(),
            line_width: 4.0,
            user_id: Uuid::new_v4(),
            mode: BlendOp::SourceOver,
            cap: StrokeCap::Round,
        };
        session.apply_remote(&msg).unwrap();

        assert_eq!(session.stack().active_id(), active);
        assert_eq!(session.stack().len(), 2);

        // The remote stroke shows in the composite.
        let px = session.composite().pixels().get_pixel(15, 15);
        assert_ne!(px.0, [248, 250, 252, 255]);
    }

    #[test]
    fn test_state_request_yields_targeted_reply() {
        let mut session = session();
        let requester = Uuid::new_v4();
        let reply = session
            .apply_remote(&ServerMessage::request_canvas_state(requester, "doc-1"))
            .unwrap()
            .expect("state reply");
        match reply {
            ClientMessage::SendCanvasState {
                document_id,
                target_user_id,
                data_url,
            } => {
                assert_eq!(document_id, "doc-1");
                assert_eq!(target_user_id, Some(requester));
                assert!(data_url.starts_with("data:image/png;base64,"));
            }
            other => unreachable!("Expected SendCanvasState, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_includes_only_content_layers() {
        let mut session = session();
        let empty = session.add_layer(NewLayer::default());
        session.set_active_layer(session.stack().sorted()[0].id).unwrap();

        let (p, o, d) = identity(Point::new(5.0, 5.0));
        session.pointer_down(p, o, d).unwrap();
        session.pointer_up().unwrap();

        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.layers.len(), 1);
        assert!(!snapshot.layers.contains_key(&empty));
        assert_eq!(snapshot.width, 64);
    }

    #[test]
    fn test_delete_layer_drops_surface() {
        let mut session = session();
        let extra = session.add_layer(NewLayer::default());
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        session.pointer_down(p, o, d).unwrap();
        session.pointer_up().unwrap();
        assert!(session.surfaces().get(extra).is_some());

        session.delete_layer(extra).unwrap();
        assert!(session.surfaces().get(extra).is_none());
    }

    #[tokio::test]
    async fn test_layer_list_round_trip() {
        let cache = LocalCache::in_memory().await.unwrap();
        let mut session = session();
        session.add_layer(NewLayer {
            name: Some("Sketch".to_string()),
            ..Default::default()
        });
        session.persist_layers(&cache).await.unwrap();

        let mut reloaded = self::session();
        assert!(reloaded.load_layers(&cache).await.unwrap());
        assert_eq!(reloaded.stack().len(), 2);
        assert!(reloaded
            .stack()
            .layers()
            .iter()
            .any(|l| l.name == "Sketch"));
    }

    #[tokio::test]
    async fn test_load_layers_retains_drawn_layer() {
        let cache = LocalCache::in_memory().await.unwrap();
        let other = session();
        other.persist_layers(&cache).await.unwrap();

        // The user draws before the persisted list arrives; their layer is
        // not in that list but must survive the load, on top and active.
        let mut session = session();
        let (p, o, d) = identity(Point::new(5.0, 5.0));
        session.pointer_down(p, o, d).unwrap();
        session.pointer_up().unwrap();
        let drawn = session.stack().active_id();

        assert!(session.load_layers(&cache).await.unwrap());
        assert_eq!(session.stack().len(), 2);
        assert_eq!(session.stack().active_id(), drawn);
        let top = session.stack().sorted().last().map(|l| l.id);
        assert_eq!(top, Some(drawn));
        assert_ne!(
            session.composite().pixels().get_pixel(5, 5).0,
            [248, 250, 252, 255]
        );
    }
}
