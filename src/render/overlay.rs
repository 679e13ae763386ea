use image::imageops::{self, FilterType};

use crate::assets::decode::decode_overlay_image;
use crate::assets::fonts::FontSet;
use crate::foundation::error::{WatermarkError, WmResult};
use crate::foundation::geometry::PixelRect;
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::model::watermark::Overlay;
use crate::render::text::rasterize_text;

/// Rendered overlay pixels positioned in host coordinates.
#[derive(Clone, Debug)]
pub(crate) struct OverlayRaster {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Premultiplied RGBA8, `width * height * 4` bytes.
    pub(crate) rgba8_premul: Vec<u8>,
}

impl OverlayRaster {
    pub(crate) fn bounds(&self) -> PixelRect {
        PixelRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub(crate) fn pixel(&self, ox: u32, oy: u32) -> [u8; 4] {
        let i = ((oy as usize) * (self.width as usize) + ox as usize) * 4;
        let p = &self.rgba8_premul[i..i + 4];
        [p[0], p[1], p[2], p[3]]
    }
}

/// Render `overlay` into `watermark_box`.
///
/// Image overlays keep their aspect ratio and are anchored to the bottom-right corner of the box.
/// Text fills the whole box.
pub(crate) fn build_overlay(
    overlay: &Overlay,
    watermark_box: PixelRect,
    fonts: &FontSet,
) -> WmResult<OverlayRaster> {
    match overlay {
        Overlay::Text(text) => {
            let rgba8_premul =
                rasterize_text(text, watermark_box.width, watermark_box.height, fonts)?;
            Ok(OverlayRaster {
                x: watermark_box.x,
                y: watermark_box.y,
                width: watermark_box.width,
                height: watermark_box.height,
                rgba8_premul,
            })
        }
        Overlay::Image(image) => {
            let src = decode_overlay_image(&image.bytes)?;
            if src.width() == 0 || src.height() == 0 {
                return Err(WatermarkError::composite("overlay image has zero size"));
            }
            let (w, h) = fit_within(
                src.width(),
                src.height(),
                watermark_box.width,
                watermark_box.height,
            );

            let resized = if (w, h) == src.dimensions() {
                src
            } else {
                let filter = if w < src.width() {
                    FilterType::Lanczos3
                } else {
                    FilterType::Triangle
                };
                imageops::resize(&src, w, h, filter)
            };

            let mut rgba8_premul = resized.into_raw();
            premultiply_rgba8_in_place(&mut rgba8_premul);
            Ok(OverlayRaster {
                x: watermark_box.right() - w,
                y: watermark_box.bottom() - h,
                width: w,
                height: h,
                rgba8_premul,
            })
        }
    }
}

/// Largest size with the source aspect ratio that fits `max_w` x `max_h`, never below 1x1.
pub(crate) fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let s = (f64::from(max_w) / f64::from(src_w)).min(f64::from(max_h) / f64::from(src_h));
    let w = (f64::from(src_w) * s).round().clamp(1.0, f64::from(max_w.max(1))) as u32;
    let h = (f64::from(src_h) * s).round().clamp(1.0, f64::from(max_h.max(1))) as u32;
    (w, h)
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
