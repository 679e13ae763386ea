use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::foundation::error::{WatermarkError, WmResult};
use crate::model::artifact::EncodedMedia;

/// Decoded host image plus the format it was encoded in.
pub(crate) struct HostImage {
    pub(crate) image: DynamicImage,
    pub(crate) format: ImageFormat,
}

/// Decode a source image. The declared MIME type picks the decoder; content sniffing is the
/// fallback when the MIME is unknown or wrong.
pub(crate) fn decode_host_image(bytes: &[u8], mime: &str) -> WmResult<HostImage> {
    let declared = ImageFormat::from_mime_type(mime);
    let sniffed = image::guess_format(bytes).ok().filter(|f| Some(*f) != declared);

    let mut last_err = None;
    for format in [declared, sniffed].into_iter().flatten() {
        match image::load_from_memory_with_format(bytes, format) {
            Ok(image) => return Ok(HostImage { image, format }),
            Err(e) => last_err = Some(format!("{format:?}: {e}")),
        }
    }

    Err(WatermarkError::decode(match last_err {
        Some(e) => format!("decode source image ({mime}): {e}"),
        None => format!("unrecognized image format for '{mime}'"),
    }))
}

/// Decode an overlay image into straight-alpha RGBA8.
pub(crate) fn decode_overlay_image(bytes: &[u8]) -> WmResult<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| WatermarkError::composite(format!("decode overlay image: {e}")))
}

/// Re-encode `image` in `format`.
///
/// JPEG uses `jpeg_quality`, WebP is written lossless. Formats without an encoder here fall back
/// to PNG, which is reflected in the returned MIME type.
pub(crate) fn encode_host_image(
    image: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> WmResult<EncodedMedia> {
    match encode_native(image, format, jpeg_quality) {
        Ok(Some(bytes)) => return Ok(EncodedMedia::new(bytes, format.to_mime_type())),
        Ok(None) => {
            tracing::debug!(?format, "no encoder for source format, writing png");
        }
        Err(e) => {
            tracing::warn!(
                ?format,
                error = %e,
                "re-encoding in source format failed, writing png"
            );
        }
    }

    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| WatermarkError::composite(format!("PNG encode failed: {e}")))?;
    Ok(EncodedMedia::new(buf.into_inner(), ImageFormat::Png.to_mime_type()))
}

fn encode_native(
    image: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> image::ImageResult<Option<Vec<u8>>> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100));
            image.to_rgb8().write_with_encoder(encoder)?;
        }
        ImageFormat::WebP => {
            let encoder = WebPEncoder::new_lossless(&mut buf);
            if image.color().has_alpha() {
                image.to_rgba8().write_with_encoder(encoder)?;
            } else {
                image.to_rgb8().write_with_encoder(encoder)?;
            }
        }
        ImageFormat::Png
        | ImageFormat::Bmp
        | ImageFormat::Tiff
        | ImageFormat::Gif
        | ImageFormat::Ico
        | ImageFormat::Tga
        | ImageFormat::Qoi => image.write_to(&mut buf, format)?,
        _ => return Ok(None),
    }
    Ok(Some(buf.into_inner()))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
