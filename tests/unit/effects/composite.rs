use image::RgbImage;

use super::*;

fn solid_overlay(x: u32, y: u32, w: u32, h: u32, px: PremulRgba8) -> OverlayRaster {
    OverlayRaster {
        x,
        y,
        width: w,
        height: h,
        rgba8_premul: px.repeat((w * h) as usize),
    }
}

#[test]
fn over_opacity_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [200, 150, 100, 255];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    assert_eq!(over(dst, [0, 0, 0, 0], 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let src = [200, 150, 100, 255];
    assert_eq!(over([10, 20, 30, 255], src, 1.0), src);
}

#[test]
fn over_half_white_on_black() {
    assert_eq!(
        over([0, 0, 0, 255], [255, 255, 255, 255], 0.5),
        [128, 128, 128, 255]
    );
}

#[test]
fn straight_blend_skips_uncovered_pixels() {
    assert_eq!(blend_straight_px([1, 2, 3, 4], [0, 0, 0, 0], 1.0), None);
    assert_eq!(blend_straight_px([1, 2, 3, 4], [255, 0, 0, 255], 0.0), None);
    assert_eq!(
        blend_straight_px([1, 2, 3, 255], [255, 0, 0, 255], 1.0),
        Some([255, 0, 0, 255])
    );
}

#[test]
fn image_blend_touches_only_covered_pixels() {
    let mut host = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, y| {
        image::Rgb([x as u8 * 10, y as u8 * 10, 7])
    }));
    let before = host.clone();
    let overlay = solid_overlay(4, 4, 3, 3, [255, 255, 255, 255]);

    blend_overlay_into_image(&mut host, &overlay, 1.0).unwrap();

    for y in 0..8 {
        for x in 0..8 {
            let got = host.get_pixel(x, y);
            if overlay.bounds().contains(x, y) {
                assert_eq!(got.0, [255, 255, 255, 255]);
            } else {
                assert_eq!(got, before.get_pixel(x, y));
            }
        }
    }
}

#[test]
fn frame_blend_matches_image_blend() {
    let (w, h) = (6u32, 5u32);
    let mut frame: Vec<u8> = (0..w * h * 4).map(|i| (i % 251) as u8).collect();
    for px in frame.chunks_exact_mut(4) {
        px[3] = 255;
    }
    let mut host = DynamicImage::ImageRgba8(
        image::RgbaImage::from_raw(w, h, frame.clone()).unwrap(),
    );
    let overlay = solid_overlay(2, 1, 3, 3, [100, 50, 0, 200]);

    blend_overlay_into_rgba8(&mut frame, w, h, &overlay, 0.7).unwrap();
    blend_overlay_into_image(&mut host, &overlay, 0.7).unwrap();
    assert_eq!(host.to_rgba8().into_raw(), frame);
}

#[test]
fn out_of_bounds_overlay_is_rejected() {
    let mut frame = vec![0u8; 4 * 4 * 4];
    let overlay = solid_overlay(2, 2, 3, 3, [255, 255, 255, 255]);
    assert!(matches!(
        blend_overlay_into_rgba8(&mut frame, 4, 4, &overlay, 1.0),
        Err(WatermarkError::Composite(_))
    ));
    assert!(matches!(
        blend_overlay_into_rgba8(&mut frame[..8], 4, 4, &overlay, 1.0),
        Err(WatermarkError::Composite(_))
    ));
}
