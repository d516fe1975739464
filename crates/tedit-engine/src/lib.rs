//! Tedit Engine - Layered Canvas Core
//!
//! This crate provides the layered-canvas engine for tedit:
//! - Layer: Layer stack with ordering, visibility, opacity and locking
//! - Surface: Raster surface registry with content-state guarding
//! - Compositor: Bottom-to-top blending of visible layers
//! - Stroke: Pointer-driven paint/erase with tool-specific blend rules
//! - Error: Error types for engine operations
//!
//! ## Usage
//!
//! ```ignore
//! use tedit_engine::{LayerStack, SurfaceRegistry, StrokeEngine, Tool, BrushStyle, Point};
//!
//! let mut stack = LayerStack::new();
//! let mut registry = SurfaceRegistry::new();
//! let mut engine = StrokeEngine::new();
//!
//! let style = BrushStyle::for_tool(Tool::Brush, [20, 20, 20, 255].into(), 4.0);
//! engine.begin(&stack, &mut registry, Tool::Brush, style, Point::new(10.0, 10.0), (800, 600), 1.0)?;
//! engine.continue_to(&mut registry, Point::new(40.0, 30.0))?;
//! let stroke = engine.end();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compositor;
pub mod error;
pub mod layer;
pub mod stroke;
pub mod surface;

// Re-export main types
pub use compositor::{blend_over, render_composite, DEFAULT_BACKGROUND};
pub use error::{Error, Result};
pub use layer::{Layer, LayerId, LayerKind, LayerStack, NewLayer};
pub use stroke::{
    apply_stroke, draw_image_fitted, extend_stroke, format_hex_color, map_to_logical,
    parse_hex_color, BrushStyle, CompositeMode, LineCap, Point, Stroke, StrokeEngine, Tool,
};
pub use surface::{ContentState, Surface, SurfaceRegistry, MAX_SURFACE_DIM};
