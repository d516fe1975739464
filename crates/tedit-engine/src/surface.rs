//! Raster Surface Registry
//!
//! Maps layer ids to allocated bitmap buffers. The registry's core
//! invariant: a buffer whose content state has left `Empty` is never
//! destructively resized, because reallocation erases pixel data.

use std::collections::HashMap;

use image::RgbaImage;
use tracing::debug;

use crate::layer::LayerId;

/// Hard ceiling for either buffer dimension, in device pixels.
pub const MAX_SURFACE_DIM: u32 = 8192;

/// Content lifecycle of a layer buffer.
///
/// `Empty` buffers may be reallocated freely. `Restoring` marks a decode in
/// flight; once `Content` is reached (by a stroke or a finished restore) the
/// buffer dimensions are frozen for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentState {
    /// No real pixel data yet; safe to reallocate
    #[default]
    Empty,
    /// A restore decode is being applied
    Restoring,
    /// Holds drawn or restored pixels; never resized
    Content,
}

/// A bitmap buffer with logical dimensions and a device-pixel scale
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    logical_width: u32,
    logical_height: u32,
    scale: f32,
}

impl Surface {
    /// Allocate a transparent surface for the given logical size.
    ///
    /// Buffer dimensions are `logical * dpr`, uniformly shrunk so neither
    /// exceeds [`MAX_SURFACE_DIM`].
    #[must_use]
    pub fn new(logical_width: u32, logical_height: u32, dpr: f32) -> Self {
        let logical_width = logical_width.max(1);
        let logical_height = logical_height.max(1);
        let dpr = if dpr > 0.0 { dpr } else { 1.0 };

        let scaled_w = logical_width as f32 * dpr;
        let scaled_h = logical_height as f32 * dpr;
        let largest = scaled_w.max(scaled_h);
        let clamp = if largest > MAX_SURFACE_DIM as f32 {
            MAX_SURFACE_DIM as f32 / largest
        } else {
            1.0
        };
        let scale = dpr * clamp;

        let width = ((logical_width as f32 * scale).round() as u32).max(1);
        let height = ((logical_height as f32 * scale).round() as u32).max(1);

        Self {
            // RgbaImage::new zero-fills: fully transparent, never opaque.
            pixels: RgbaImage::new(width, height),
            logical_width,
            logical_height,
            scale,
        }
    }

    /// Buffer width in device pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Buffer height in device pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Logical width
    #[must_use]
    pub fn logical_width(&self) -> u32 {
        self.logical_width
    }

    /// Logical height
    #[must_use]
    pub fn logical_height(&self) -> u32 {
        self.logical_height
    }

    /// Effective logical-to-device pixel scale
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Whether the buffer has zero drawable area
    #[must_use]
    pub fn is_zero_area(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    /// Read access to the pixel buffer
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Write access to the pixel buffer
    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Clear every pixel to transparent
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = image::Rgba([0, 0, 0, 0]);
        }
    }

    /// Clear the buffer and draw `img` scaled to fill it (nearest sampling).
    /// Used when applying a decoded restore or snapshot image.
    pub fn draw_image_replace(&mut self, img: &RgbaImage) {
        self.clear();
        if img.width() == 0 || img.height() == 0 {
            return;
        }
        let (w, h) = (self.pixels.width(), self.pixels.height());
        for y in 0..h {
            let sy = (y as u64 * img.height() as u64 / h as u64).min(img.height() as u64 - 1);
            for x in 0..w {
                let sx = (x as u64 * img.width() as u64 / w as u64).min(img.width() as u64 - 1);
                self.pixels.put_pixel(x, y, *img.get_pixel(sx as u32, sy as u32));
            }
        }
    }
}

/// Registry of layer buffers plus their content states
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<LayerId, Surface>,
    content: HashMap<LayerId, ContentState>,
}

impl SurfaceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the surface for a layer, allocating on demand.
    ///
    /// If the layer's buffer already holds (or is receiving) content it is
    /// returned unmodified regardless of any size mismatch; resizing would
    /// erase it.
    pub fn ensure(
        &mut self,
        layer_id: LayerId,
        logical_width: u32,
        logical_height: u32,
        dpr: f32,
    ) -> &mut Surface {
        let state = self.state(layer_id);
        let needs_alloc = match self.surfaces.get(&layer_id) {
            None => true,
            Some(existing) if state == ContentState::Empty => {
                existing.logical_width() != logical_width.max(1)
                    || existing.logical_height() != logical_height.max(1)
            }
            Some(_) => {
                debug!(layer_id = %layer_id, "surface has content, keeping existing buffer");
                false
            }
        };

        if needs_alloc {
            self.surfaces
                .insert(layer_id, Surface::new(logical_width, logical_height, dpr));
        }
        self.surfaces.get_mut(&layer_id).expect("surface allocated")
    }

    /// Get a surface without allocating
    #[must_use]
    pub fn get(&self, layer_id: LayerId) -> Option<&Surface> {
        self.surfaces.get(&layer_id)
    }

    /// Mutable access without allocating
    pub fn get_mut(&mut self, layer_id: LayerId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&layer_id)
    }

    /// Current content state for a layer
    #[must_use]
    pub fn state(&self, layer_id: LayerId) -> ContentState {
        self.content.get(&layer_id).copied().unwrap_or_default()
    }

    /// Mark a buffer as holding real content. Set synchronously on the
    /// first stroke point so no concurrent restore or reallocation can
    /// clobber the buffer.
    pub fn mark_content(&mut self, layer_id: LayerId) {
        self.content.insert(layer_id, ContentState::Content);
    }

    /// Begin restoring a layer. Refused once the buffer holds content:
    /// a user stroke beat the restore to this layer.
    pub fn begin_restore(&mut self, layer_id: LayerId) -> bool {
        match self.state(layer_id) {
            ContentState::Content => false,
            _ => {
                self.content.insert(layer_id, ContentState::Restoring);
                true
            }
        }
    }

    /// Complete a restore: the buffer now holds content.
    pub fn finish_restore(&mut self, layer_id: LayerId) {
        self.content.insert(layer_id, ContentState::Content);
    }

    /// Abandon a restore that never applied, releasing the buffer for
    /// future reallocation.
    pub fn abandon_restore(&mut self, layer_id: LayerId) {
        if self.state(layer_id) == ContentState::Restoring {
            self.content.insert(layer_id, ContentState::Empty);
        }
    }

    /// Drop a layer's buffer and state (layer deleted)
    pub fn remove(&mut self, layer_id: LayerId) {
        self.surfaces.remove(&layer_id);
        self.content.remove(&layer_id);
    }

    /// Copy one layer's buffer and content state onto another (layer
    /// duplication).
    pub fn clone_into(&mut self, source: LayerId, target: LayerId) {
        if let Some(surface) = self.surfaces.get(&source).cloned() {
            self.surfaces.insert(target, surface);
            self.content.insert(target, self.state(source));
        }
    }

    /// Ids of all layers with an allocated surface
    #[must_use]
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.surfaces.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_surface_allocation_transparent() {
        let surface = Surface::new(100, 50, 2.0);
        assert_eq!(surface.width(), 200);
        assert_eq!(surface.height(), 100);
        assert_eq!(surface.scale(), 2.0);
        assert!(surface.pixels().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_surface_clamped_to_ceiling() {
        let surface = Surface::new(6000, 3000, 2.0);
        assert!(surface.width() <= MAX_SURFACE_DIM);
        assert!(surface.height() <= MAX_SURFACE_DIM);
        // Uniform shrink preserves the aspect ratio.
        assert_eq!(surface.width(), MAX_SURFACE_DIM);
        assert_eq!(surface.height(), MAX_SURFACE_DIM / 2);
    }

    #[test]
    fn test_ensure_allocates_once() {
        let mut registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();
        registry.ensure(id, 100, 100, 1.0);
        assert!(registry.get(id).is_some());
        assert_eq!(registry.state(id), ContentState::Empty);
    }

    #[test]
    fn test_ensure_reallocates_empty_on_size_change() {
        let mut registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();
        registry.ensure(id, 100, 100, 1.0);
        let surface = registry.ensure(id, 200, 100, 1.0);
        assert_eq!(surface.width(), 200);
    }

    #[test]
    fn test_ensure_never_resizes_content() {
        let mut registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();
        {
            let surface = registry.ensure(id, 100, 100, 1.0);
            surface
                .pixels_mut()
                .put_pixel(5, 5, image::Rgba([255, 0, 0, 255]));
        }
        registry.mark_content(id);

        let surface = registry.ensure(id, 400, 400, 1.0);
        assert_eq!(surface.width(), 100);
        assert_eq!(surface.pixels().get_pixel(5, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_restore_state_machine() {
        let mut registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();

        assert!(registry.begin_restore(id));
        assert_eq!(registry.state(id), ContentState::Restoring);
        registry.finish_restore(id);
        assert_eq!(registry.state(id), ContentState::Content);

        // A second restore attempt is refused once content exists.
        assert!(!registry.begin_restore(id));
    }

    #[test]
    fn test_begin_restore_refused_after_stroke() {
        let mut registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();
        registry.mark_content(id);
        assert!(!registry.begin_restore(id));
    }

    #[test]
    fn test_abandon_restore_releases_buffer() {
        let mut registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.begin_restore(id));
        registry.abandon_restore(id);
        assert_eq!(registry.state(id), ContentState::Empty);
    }

    #[test]
    fn test_clone_into_copies_pixels_and_state() {
        let mut registry = SurfaceRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        registry
            .ensure(a, 10, 10, 1.0)
            .pixels_mut()
            .put_pixel(1, 1, image::Rgba([0, 255, 0, 255]));
        registry.mark_content(a);

        registry.clone_into(a, b);
        assert_eq!(registry.state(b), ContentState::Content);
        assert_eq!(
            registry.get(b).unwrap().pixels().get_pixel(1, 1).0,
            [0, 255, 0, 255]
        );
    }

    #[test]
    fn test_draw_image_replace_scales_to_fill() {
        let mut surface = Surface::new(4, 4, 1.0);
        let mut img = RgbaImage::new(2, 2);
        for px in img.pixels_mut() {
            *px = image::Rgba([10, 20, 30, 255]);
        }
        surface.draw_image_replace(&img);
        assert!(surface.pixels().pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }
}
