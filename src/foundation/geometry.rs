use kurbo::Rect;

use crate::foundation::error::{WatermarkError, WmResult};
use crate::model::watermark::Position;

/// Default margin between the watermark box and the image edges, as a fraction of the shorter
/// image dimension.
pub const DEFAULT_MARGIN_RATIO: f32 = 0.02;

/// Integer pixel rectangle (top-left origin).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Return `true` when `(px, py)` lies inside the rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}

/// Resolved placement of a watermark on a host of a given size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatermarkLayout {
    /// Margin kept free between the box and every image edge.
    pub margin: u32,
    /// The square box the overlay is rendered into.
    pub watermark_box: PixelRect,
}

/// Compute the watermark box for a `width` x `height` host.
///
/// The box is square with side `scale * min(width, height)`, clamped so that it always fits
/// inside the image with `margin` pixels free on every side. `Position::BottomRight` puts the
/// box flush against the bottom-right margin; `Position::SafeZone` slides it within the
/// bottom-right quadrant.
pub fn layout_watermark(
    width: u32,
    height: u32,
    scale: f32,
    position: Position,
    margin_ratio: f32,
) -> WmResult<WatermarkLayout> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(WatermarkError::validation(
            "watermark scale must be finite and > 0",
        ));
    }
    if !margin_ratio.is_finite() || !(0.0..0.5).contains(&margin_ratio) {
        return Err(WatermarkError::validation(
            "margin ratio must be finite and in [0, 0.5)",
        ));
    }

    let (w, h) = (f64::from(width), f64::from(height));
    let short = w.min(h);
    let margin = (f64::from(margin_ratio) * short).round();

    let inner = Rect::new(margin, margin, w - margin, h - margin);
    let max_side = inner.width().min(inner.height()).floor();
    if max_side < 1.0 {
        return Err(WatermarkError::composite(format!(
            "host {width}x{height} leaves no room for a watermark inside a {margin}px margin"
        )));
    }
    let side = (f64::from(scale) * short).round().clamp(1.0, max_side);

    let (right, bottom) = match position {
        Position::BottomRight => (inner.x1, inner.y1),
        Position::SafeZone { x, y } => {
            let quadrant = Rect::new(
                (w / 2.0).max(inner.x0),
                (h / 2.0).max(inner.y0),
                inner.x1,
                inner.y1,
            );
            let slack_x = (quadrant.width() - side).max(0.0);
            let slack_y = (quadrant.height() - side).max(0.0);
            let x = f64::from(x.clamp(0.0, 1.0));
            let y = f64::from(y.clamp(0.0, 1.0));
            (
                inner.x1 - ((1.0 - x) * slack_x).round(),
                inner.y1 - ((1.0 - y) * slack_y).round(),
            )
        }
    };

    let rect = Rect::new(right - side, bottom - side, right, bottom);
    Ok(WatermarkLayout {
        margin: margin as u32,
        watermark_box: PixelRect {
            x: rect.x0 as u32,
            y: rect.y0 as u32,
            width: rect.width() as u32,
            height: rect.height() as u32,
        },
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/geometry.rs"]
mod tests;
