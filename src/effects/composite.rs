use image::{DynamicImage, GenericImage, GenericImageView, Rgba};

use crate::foundation::error::{WatermarkError, WmResult};
use crate::foundation::math::{mul_div255_u8, premultiply_rgba8, unpremultiply_rgba8};
use crate::render::overlay::OverlayRaster;

pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over of premultiplied `src` onto premultiplied `dst`, with `src` scaled by `opacity`.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Blend a premultiplied overlay pixel onto a straight-alpha host pixel.
///
/// Returns `None` when the overlay has no effective coverage at this pixel.
pub(crate) fn blend_straight_px(host: [u8; 4], src: PremulRgba8, opacity: f32) -> Option<[u8; 4]> {
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if mul_div255_u8(u16::from(src[3]), op) == 0 {
        return None;
    }
    let out = over(premultiply_rgba8(host), src, opacity);
    Some(unpremultiply_rgba8(out))
}

/// Blend `overlay` into `host` in place.
///
/// Pixels without effective overlay coverage are never written, so they keep their exact
/// original values whatever the host's color type.
pub(crate) fn blend_overlay_into_image(
    host: &mut DynamicImage,
    overlay: &OverlayRaster,
    opacity: f32,
) -> WmResult<()> {
    check_bounds(host.width(), host.height(), overlay)?;
    for oy in 0..overlay.height {
        for ox in 0..overlay.width {
            let (hx, hy) = (overlay.x + ox, overlay.y + oy);
            let host_px = host.get_pixel(hx, hy).0;
            if let Some(out) = blend_straight_px(host_px, overlay.pixel(ox, oy), opacity) {
                host.put_pixel(hx, hy, Rgba(out));
            }
        }
    }
    Ok(())
}

/// Blend `overlay` into a straight-alpha RGBA8 frame of `width` x `height` in place.
pub(crate) fn blend_overlay_into_rgba8(
    frame: &mut [u8],
    width: u32,
    height: u32,
    overlay: &OverlayRaster,
    opacity: f32,
) -> WmResult<()> {
    if frame.len() != (width as usize) * (height as usize) * 4 {
        return Err(WatermarkError::composite(format!(
            "frame buffer is {} bytes, expected {width}x{height} rgba8",
            frame.len()
        )));
    }
    check_bounds(width, height, overlay)?;

    let stride = width as usize * 4;
    for oy in 0..overlay.height {
        let row = (overlay.y + oy) as usize * stride;
        for ox in 0..overlay.width {
            let i = row + (overlay.x + ox) as usize * 4;
            let px = &mut frame[i..i + 4];
            if let Some(out) =
                blend_straight_px([px[0], px[1], px[2], px[3]], overlay.pixel(ox, oy), opacity)
            {
                px.copy_from_slice(&out);
            }
        }
    }
    Ok(())
}

fn check_bounds(width: u32, height: u32, overlay: &OverlayRaster) -> WmResult<()> {
    let b = overlay.bounds();
    if b.right() > width || b.bottom() > height {
        return Err(WatermarkError::composite(format!(
            "overlay {}x{} at ({}, {}) exceeds {width}x{height} host",
            b.width, b.height, b.x, b.y
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
