//! Stroke Engine
//!
//! Converts pointer input into buffer-space points and rasterizes them onto
//! the active layer's buffer with tool-specific blend rules. One state
//! machine per pointer interaction: Idle -> Drawing -> Idle. A stroke may
//! never be left open; pointer-up anywhere forces `end`.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::compositor::blend_over;
use crate::error::{Error, Result};
use crate::layer::{LayerId, LayerStack};
use crate::surface::{Surface, SurfaceRegistry};

/// A point in logical buffer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Point {
    /// Create a point
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Editor tools. Only brush, pencil and eraser may begin a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Soft round paint tool
    Brush,
    /// Hard square-capped paint tool
    Pencil,
    /// Removes pixels instead of painting
    Eraser,
    /// Pan/arrange tool
    Move,
    /// Flood fill tool
    Fill,
    /// Region selection tool
    Select,
}

impl Tool {
    /// Whether this tool rasterizes strokes
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Brush | Self::Pencil | Self::Eraser)
    }

    /// Stable name for logs and errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Brush => "brush",
            Self::Pencil => "pencil",
            Self::Eraser => "eraser",
            Self::Move => "move",
            Self::Fill => "fill",
            Self::Select => "select",
        }
    }
}

/// How stroke pixels combine with the destination buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Paint over existing pixels
    #[default]
    SourceOver,
    /// Erase existing pixels
    DestinationOut,
}

/// Line cap shape for stroke stamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    /// Disc stamps (brush)
    #[default]
    Round,
    /// Square stamps (pencil)
    Square,
}

/// Resolved drawing parameters for one stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStyle {
    /// Stroke color (ignored by the eraser)
    pub color: Rgba<u8>,
    /// Stroke width in logical pixels
    pub line_width: f32,
    /// Blend rule
    pub mode: CompositeMode,
    /// Stamp shape
    pub cap: LineCap,
}

impl BrushStyle {
    /// Derive the style for a tool: brush paints with round caps, pencil
    /// with square caps, the eraser removes pixels.
    #[must_use]
    pub fn for_tool(tool: Tool, color: Rgba<u8>, line_width: f32) -> Self {
        match tool {
            Tool::Pencil => Self {
                color,
                line_width,
                mode: CompositeMode::SourceOver,
                cap: LineCap::Square,
            },
            Tool::Eraser => Self {
                color,
                line_width,
                mode: CompositeMode::DestinationOut,
                cap: LineCap::Round,
            },
            _ => Self {
                color,
                line_width,
                mode: CompositeMode::SourceOver,
                cap: LineCap::Round,
            },
        }
    }
}

/// A completed stroke, ready for persistence and sync flush
#[derive(Debug, Clone)]
pub struct Stroke {
    /// Layer the stroke was rasterized onto
    pub layer_id: LayerId,
    /// Ordered path in logical buffer coordinates
    pub points: Vec<Point>,
    /// Style the stroke was drawn with
    pub style: BrushStyle,
}

enum Phase {
    Idle,
    Drawing {
        layer_id: LayerId,
        style: BrushStyle,
        last: Point,
        path: Vec<Point>,
    },
}

/// Per-pointer-interaction stroke state machine
pub struct StrokeEngine {
    phase: Phase,
}

impl StrokeEngine {
    /// Create an idle engine
    #[must_use]
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Whether a stroke is currently open
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self.phase, Phase::Drawing { .. })
    }

    /// Layer the open stroke targets, if any
    #[must_use]
    pub fn drawing_layer(&self) -> Option<LayerId> {
        match &self.phase {
            Phase::Drawing { layer_id, .. } => Some(*layer_id),
            Phase::Idle => None,
        }
    }

    /// Style of the open stroke, if any. Settings changed mid-stroke take
    /// effect on the next stroke.
    #[must_use]
    pub fn drawing_style(&self) -> Option<BrushStyle> {
        match &self.phase {
            Phase::Drawing { style, .. } => Some(*style),
            Phase::Idle => None,
        }
    }

    /// Begin a stroke at `point` on the active layer.
    ///
    /// Requires an unlocked active layer and a drawing tool. Resolves the
    /// layer's surface and marks its content state synchronously, so a
    /// concurrent restore can no longer touch this buffer.
    pub fn begin(
        &mut self,
        stack: &LayerStack,
        registry: &mut SurfaceRegistry,
        tool: Tool,
        style: BrushStyle,
        point: Point,
        logical: (u32, u32),
        dpr: f32,
    ) -> Result<()> {
        if !tool.is_drawing() {
            return Err(Error::NotDrawingTool(tool.name()));
        }
        let active = stack.get(stack.active_id()).ok_or(Error::NoActiveLayer)?;
        if active.locked {
            return Err(Error::LayerLocked(active.id));
        }
        let layer_id = active.id;

        let surface = registry.ensure(layer_id, logical.0, logical.1, dpr);
        stamp(surface, point, &style);
        registry.mark_content(layer_id);

        self.phase = Phase::Drawing {
            layer_id,
            style,
            last: point,
            path: vec![point],
        };
        Ok(())
    }

    /// Extend the open stroke to `point`, returning the accumulated point
    /// count so callers can flush partial strokes at a fixed cadence.
    pub fn continue_to(&mut self, registry: &mut SurfaceRegistry, point: Point) -> Result<usize> {
        let Phase::Drawing {
            layer_id,
            style,
            last,
            path,
        } = &mut self.phase
        else {
            return Err(Error::NoStrokeInProgress);
        };

        let surface = registry
            .get_mut(*layer_id)
            .ok_or(Error::SurfaceMissing(*layer_id))?;
        draw_segment(surface, *last, point, style);
        *last = point;
        path.push(point);
        Ok(path.len())
    }

    /// Close the open stroke and yield it for sync flush and persistence.
    /// Returns `None` when no stroke was open (redundant pointer-up).
    pub fn end(&mut self) -> Option<Stroke> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => None,
            Phase::Drawing {
                layer_id,
                style,
                path,
                ..
            } => Some(Stroke {
                layer_id,
                points: path,
                style,
            }),
        }
    }

    /// Points accumulated since `begin`, for partial flushes
    #[must_use]
    pub fn pending_points(&self) -> &[Point] {
        match &self.phase {
            Phase::Drawing { path, .. } => path,
            Phase::Idle => &[],
        }
    }
}

impl Default for StrokeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an on-screen pointer position to logical buffer coordinates:
/// `logical = (display - origin) / displayed * logical_size`, independent
/// of any zoom or pan applied to the display.
#[must_use]
pub fn map_to_logical(
    display: Point,
    origin: Point,
    displayed: (f32, f32),
    logical: (u32, u32),
) -> Point {
    if displayed.0 <= 0.0 || displayed.1 <= 0.0 {
        return Point::new(0.0, 0.0);
    }
    Point::new(
        (display.x - origin.x) / displayed.0 * logical.0 as f32,
        (display.y - origin.y) / displayed.1 * logical.1 as f32,
    )
}

/// Rasterize a full path onto a surface. Shared by the local stroke engine
/// and the remote-stroke applier so both sides converge pixel-for-pixel.
pub fn apply_stroke(surface: &mut Surface, points: &[Point], style: &BrushStyle) {
    match points {
        [] => {}
        [single] => stamp(surface, *single, style),
        _ => {
            stamp(surface, points[0], style);
            for pair in points.windows(2) {
                draw_segment(surface, pair[0], pair[1], style);
            }
        }
    }
}

/// Rasterize a path continuation: segments only, no stamp at the first
/// point. Used when the first point was already drawn by a previous
/// chunk of the same stroke, so replaying chunks matches a single
/// uninterrupted stroke stamp-for-stamp.
pub fn extend_stroke(surface: &mut Surface, points: &[Point], style: &BrushStyle) {
    for pair in points.windows(2) {
        draw_segment(surface, pair[0], pair[1], style);
    }
}

/// Draw a decoded image centered and scaled-to-fit onto a surface,
/// source-over at full alpha (external image drop).
pub fn draw_image_fitted(surface: &mut Surface, img: &RgbaImage) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let lw = surface.logical_width() as f32;
    let lh = surface.logical_height() as f32;
    let fit = (lw / img.width() as f32).min(lh / img.height() as f32);
    let draw_w = img.width() as f32 * fit;
    let draw_h = img.height() as f32 * fit;
    let offset_x = (lw - draw_w) / 2.0;
    let offset_y = (lh - draw_h) / 2.0;

    let scale = surface.scale();
    let x0 = (offset_x * scale).round().max(0.0) as u32;
    let y0 = (offset_y * scale).round().max(0.0) as u32;
    let x1 = (((offset_x + draw_w) * scale).round() as u32).min(surface.width());
    let y1 = (((offset_y + draw_h) * scale).round() as u32).min(surface.height());
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    for y in y0..y1 {
        let sy = ((y - y0) as u64 * img.height() as u64 / (y1 - y0) as u64)
            .min(img.height() as u64 - 1) as u32;
        for x in x0..x1 {
            let sx = ((x - x0) as u64 * img.width() as u64 / (x1 - x0) as u64)
                .min(img.width() as u64 - 1) as u32;
            let s = *img.get_pixel(sx, sy);
            if s.0[3] == 0 {
                continue;
            }
            let d = *surface.pixels().get_pixel(x, y);
            surface.pixels_mut().put_pixel(x, y, blend_over(d, s, 1.0));
        }
    }
}

/// Parse a `#rrggbb` or `#rrggbbaa` CSS color
#[must_use]
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().strip_prefix('#')?;
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgba([r, g, b, 255]))
        }
        8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
            Some(Rgba([r, g, b, a]))
        }
        _ => None,
    }
}

/// Format a color as `#rrggbb` for the wire
#[must_use]
pub fn format_hex_color(color: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0[0], color.0[1], color.0[2])
}

/// Stamp the brush footprint along the segment from `a` to `b`, spaced at
/// one device pixel so thick lines stay solid.
fn draw_segment(surface: &mut Surface, a: Point, b: Point, style: &BrushStyle) {
    let scale = surface.scale();
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist_dev = (dx * dx + dy * dy).sqrt() * scale;
    let steps = dist_dev.ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp(
            surface,
            Point::new(a.x + dx * t, a.y + dy * t),
            style,
        );
    }
}

/// Rasterize one brush footprint at a logical-coordinate center.
fn stamp(surface: &mut Surface, center: Point, style: &BrushStyle) {
    let scale = surface.scale();
    let cx = center.x * scale;
    let cy = center.y * scale;
    let radius = (style.line_width * scale / 2.0).max(0.5);

    let x0 = (cx - radius - 1.0).floor().max(0.0) as u32;
    let y0 = (cy - radius - 1.0).floor().max(0.0) as u32;
    let x1 = ((cx + radius + 1.0).ceil() as i64).clamp(0, surface.width() as i64) as u32;
    let y1 = ((cy + radius + 1.0).ceil() as i64).clamp(0, surface.height() as i64) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let coverage = match style.cap {
                LineCap::Round => {
                    let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
                    (radius + 0.5 - d).clamp(0.0, 1.0)
                }
                LineCap::Square => {
                    let inside = (px - cx).abs() <= radius && (py - cy).abs() <= radius;
                    if inside {
                        1.0
                    } else {
                        0.0
                    }
                }
            };
            if coverage <= 0.0 {
                continue;
            }
            let d = *surface.pixels().get_pixel(x, y);
            let out = match style.mode {
                CompositeMode::SourceOver => {
                    let src_a = (style.color.0[3] as f32 / 255.0) * coverage;
                    let src = Rgba([
                        style.color.0[0],
                        style.color.0[1],
                        style.color.0[2],
                        (src_a * 255.0).round() as u8,
                    ]);
                    blend_over(d, src, 1.0)
                }
                CompositeMode::DestinationOut => {
                    let kept = d.0[3] as f32 * (1.0 - coverage);
                    Rgba([d.0[0], d.0[1], d.0[2], kept.round() as u8])
                }
            };
            surface.pixels_mut().put_pixel(x, y, out);
        }
    }
}
