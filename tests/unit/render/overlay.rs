use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::*;
use crate::model::watermark::ImageOverlay;

fn png(img: RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn square_box() -> PixelRect {
    PixelRect {
        x: 100,
        y: 200,
        width: 50,
        height: 50,
    }
}

#[test]
fn fit_within_preserves_aspect() {
    assert_eq!(fit_within(200, 100, 50, 50), (50, 25));
    assert_eq!(fit_within(100, 200, 50, 50), (25, 50));
    assert_eq!(fit_within(10, 10, 50, 50), (50, 50));
    assert_eq!(fit_within(1000, 1, 50, 50), (50, 1));
}

#[test]
fn wide_image_is_anchored_bottom_right() {
    let fonts = FontSet::load(false, &[], None);
    let bytes = png(RgbaImage::from_pixel(200, 100, Rgba([10, 20, 30, 255])));
    let raster = build_overlay(
        &Overlay::Image(ImageOverlay { bytes }),
        square_box(),
        &fonts,
    )
    .unwrap();

    assert_eq!((raster.width, raster.height), (50, 25));
    assert_eq!(raster.bounds().right(), square_box().right());
    assert_eq!(raster.bounds().bottom(), square_box().bottom());
    assert_eq!(raster.pixel(10, 10), [10, 20, 30, 255]);
}

#[test]
fn overlay_pixels_are_premultiplied() {
    let fonts = FontSet::load(false, &[], None);
    let bytes = png(RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 128])));
    let raster = build_overlay(
        &Overlay::Image(ImageOverlay { bytes }),
        square_box(),
        &fonts,
    )
    .unwrap();
    assert_eq!(raster.pixel(0, 0), [128, 128, 128, 128]);
}

#[test]
fn undecodable_overlay_fails_as_composite() {
    let fonts = FontSet::load(false, &[], None);
    let err = build_overlay(
        &Overlay::Image(ImageOverlay {
            bytes: b"junk".to_vec(),
        }),
        square_box(),
        &fonts,
    )
    .unwrap_err();
    assert!(matches!(err, WatermarkError::Composite(_)));
}
