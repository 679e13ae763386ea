use resvg::tiny_skia;

use crate::assets::fonts::{FontSet, make_font_resolver};
use crate::foundation::error::{WatermarkError, WmResult};
use crate::model::watermark::TextOverlay;

/// Font size the text is shaped at before it is scaled to fit the box.
const REFERENCE_FONT_PX: f32 = 100.0;

/// Rasterize `text` into a transparent `width` x `height` premultiplied RGBA8 buffer.
///
/// The text is scaled uniformly to the largest size whose tight outline bounds fit the box,
/// right-aligned and vertically centered. Nothing but glyph coverage is drawn.
pub(crate) fn rasterize_text(
    text: &TextOverlay,
    width: u32,
    height: u32,
    fonts: &FontSet,
) -> WmResult<Vec<u8>> {
    let len = width as usize * height as usize * 4;
    if text.color[3] == 0 {
        return Ok(vec![0; len]);
    }

    let svg = text_svg(text, fonts.default_family());
    let opts = usvg::Options {
        fontdb: fonts.database(),
        font_resolver: make_font_resolver(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &opts)
        .map_err(|e| WatermarkError::composite(format!("build text watermark tree: {e}")))?;

    let root = tree.root();
    let bounds = root.bounding_box();
    if !root.has_children() || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Err(WatermarkError::composite(format!(
            "no font face could render watermark text ({} faces loaded)",
            fonts.face_count()
        )));
    }

    let (w, h) = (width as f32, height as f32);
    let scale = (w / bounds.width()).min(h / bounds.height());
    let tx = w - bounds.right() * scale;
    let ty = (h - bounds.height() * scale) / 2.0 - bounds.top() * scale;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| WatermarkError::composite("failed to allocate text pixmap"))?;
    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, tx, ty);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Ok(pixmap.take())
}

fn text_svg(text: &TextOverlay, default_family: Option<&str>) -> String {
    let family = match text.font_family.as_deref().or(default_family) {
        Some(f) => format!("'{}', sans-serif", escape_xml(f)),
        None => "sans-serif".to_string(),
    };
    let [r, g, b, a] = text.color;
    let chars = text.text.chars().count().max(1) as f32;
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
            r#"<text x="0" y="{size}" font-family="{family}" font-size="{size}" "#,
            r#"fill="rgb({r},{g},{b})" fill-opacity="{opacity}" xml:space="preserve">{body}</text>"#,
            "</svg>"
        ),
        w = REFERENCE_FONT_PX * chars,
        h = REFERENCE_FONT_PX * 2.0,
        size = REFERENCE_FONT_PX,
        family = family,
        r = r,
        g = g,
        b = b,
        opacity = f32::from(a) / 255.0,
        body = escape_xml(&text.text),
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
