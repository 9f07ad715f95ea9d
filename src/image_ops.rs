// this_file: src/image_ops.rs
//! Pixel operations used by the renderers.
//!
//! Coverage-mask compositing for text, inward rectangle strokes for debug
//! outlines, and the two image placement modes (fit-inside and crop-to-fill).

use crate::metrics::LineMask;
use crate::section::Rect;
use crate::template::Color;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

/// Composite a coverage mask onto `canvas` in `color` (source-over).
///
/// `x`/`y` is the mask's top-left corner and may lie partly off-canvas; the
/// mask is clipped.
pub fn blend_mask(canvas: &mut RgbaImage, mask: &LineMask, x: i64, y: i64, color: Color) {
    let [r, g, b, a] = color.rgba();
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);

    for my in 0..mask.height as i64 {
        let py = y + my;
        if py < 0 || py >= ch {
            continue;
        }
        let row = (my as usize) * (mask.width as usize);
        for mx in 0..mask.width as i64 {
            let px = x + mx;
            if px < 0 || px >= cw {
                continue;
            }
            let coverage = mask.alpha[row + mx as usize] as u32 * a as u32 / 255;
            if coverage == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            let inv = 255 - coverage;
            let mix = |src: u8, d: u8| ((src as u32 * coverage + d as u32 * inv + 127) / 255) as u8;
            *dst = Rgba([
                mix(r, dst[0]),
                mix(g, dst[1]),
                mix(b, dst[2]),
                (coverage + dst[3] as u32 * inv / 255).min(255) as u8,
            ]);
        }
    }
}

/// Stroke the border of `rect` `width` pixels thick, drawn inside the box.
pub fn stroke_rect(canvas: &mut RgbaImage, rect: Rect, width: u32, color: Color) {
    let right = rect.right().min(canvas.width());
    let bottom = rect.bottom().min(canvas.height());
    let pixel = Rgba(color.rgba());

    for y in rect.y..bottom {
        for x in rect.x..right {
            let inside = x >= rect.x + width
                && y >= rect.y + width
                && x + width < rect.right()
                && y + width < rect.bottom();
            if !inside {
                canvas.put_pixel(x, y, pixel);
            }
        }
    }
}

/// Largest size with the source aspect ratio that fits in `max_w` x `max_h`.
///
/// Never upscales; a source already inside the box keeps its size.
pub fn thumbnail_dims(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return (src_w, src_h);
    }
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Offset that centers `inner` within `outer`.
pub fn center_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// Draw `picture` into `rect`.
///
/// With `crop` the picture is scaled to cover the whole box and the overflow
/// is cut off. Otherwise it is shrunk to fit, centered horizontally and
/// aligned to the top of the box.
pub fn place_image(canvas: &mut RgbaImage, picture: &DynamicImage, rect: Rect, crop: bool) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }

    if crop {
        let filled = picture
            .resize_to_fill(rect.width, rect.height, FilterType::Lanczos3)
            .to_rgba8();
        imageops::replace(canvas, &filled, rect.x as i64, rect.y as i64);
        return;
    }

    let (w, h) = thumbnail_dims(picture.width(), picture.height(), rect.width, rect.height);
    let pixels = if (w, h) == (picture.width(), picture.height()) {
        picture.to_rgba8()
    } else {
        imageops::resize(&picture.to_rgba8(), w, h, FilterType::Lanczos3)
    };
    let x = rect.x + center_offset(rect.width, w);
    imageops::replace(canvas, &pixels, x as i64, rect.y as i64);
}

/// Background scaled to exactly `width` x `height`.
pub fn fit_background(background: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if background.dimensions() == (width, height) {
        background.clone()
    } else {
        imageops::resize(background, width, height, FilterType::Lanczos3)
    }
}
