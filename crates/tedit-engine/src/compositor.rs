//! Compositor
//!
//! Deterministically blends all visible layer buffers, bottom to top, into
//! one output buffer. Pure with respect to the layer stack snapshot at call
//! time and idempotent, so callers may re-invoke it redundantly after any
//! mutation that can change visible output.

use image::Rgba;

use crate::layer::LayerStack;
use crate::surface::{Surface, SurfaceRegistry};

/// Document background color, an opaque near-white.
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([248, 250, 252, 255]);

/// Source-over blend of `src` (with an extra global alpha) onto `dst`.
#[must_use]
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>, global_alpha: f32) -> Rgba<u8> {
    let sa = (src.0[3] as f32 / 255.0) * global_alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = src.0[c] as f32;
        let d = dst.0[c] as f32;
        out[c] = (((s * sa) + (d * da * (1.0 - sa))) / out_a).round() as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    Rgba(out)
}

/// Render every visible layer into `output`, ascending by stacking order.
///
/// The output is first cleared to `background`. Layers that are invisible
/// or have a zero-area buffer are skipped; each remaining buffer is drawn
/// at full scale (nearest-sampled when dimensions differ) with
/// `alpha = opacity / 100`. Draw order is the sole determinant of stacking.
pub fn render_composite(
    stack: &LayerStack,
    registry: &SurfaceRegistry,
    output: &mut Surface,
    background: Rgba<u8>,
) {
    let (out_w, out_h) = (output.width(), output.height());
    for px in output.pixels_mut().pixels_mut() {
        *px = background;
    }

    for layer in stack.visible_sorted() {
        let Some(surface) = registry.get(layer.id) else {
            continue;
        };
        if surface.is_zero_area() {
            continue;
        }
        let global_alpha = layer.opacity as f32 / 100.0;
        let src = surface.pixels();
        let (src_w, src_h) = (src.width(), src.height());

        for y in 0..out_h {
            let sy = ((y as u64 * src_h as u64 / out_h as u64) as u32).min(src_h - 1);
            for x in 0..out_w {
                let sx = ((x as u64 * src_w as u64 / out_w as u64) as u32).min(src_w - 1);
                let s = *src.get_pixel(sx, sy);
                if s.0[3] == 0 {
                    continue;
                }
                let d = *output.pixels().get_pixel(x, y);
                output
                    .pixels_mut()
                    .put_pixel(x, y, blend_over(d, s, global_alpha));
            }
        }
    }
}
