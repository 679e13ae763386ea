use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::*;
use crate::foundation::error::FailureKind;

fn no_fonts() -> Compositor {
    Compositor::new(CompositorOpts {
        load_system_fonts: false,
        ..CompositorOpts::default()
    })
    .unwrap()
}

fn png_artifact(img: RgbaImage) -> Artifact {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    Artifact::from_mime(buf, "image/png").unwrap()
}

fn red_square_png(side: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(side, side, Rgba([255, 0, 0, 255])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn default_opts_validate() {
    let opts = CompositorOpts::default();
    assert!(opts.validate().is_ok());
    assert_eq!(opts.margin_ratio, DEFAULT_MARGIN_RATIO);
    assert_eq!(opts.jpeg_quality, 95);
}

#[test]
fn out_of_range_opts_are_rejected() {
    for opts in [
        CompositorOpts {
            margin_ratio: 0.5,
            ..CompositorOpts::default()
        },
        CompositorOpts {
            margin_ratio: f32::NAN,
            ..CompositorOpts::default()
        },
        CompositorOpts {
            jpeg_quality: 0,
            ..CompositorOpts::default()
        },
    ] {
        assert!(matches!(
            Compositor::new(opts),
            Err(WatermarkError::Validation(_))
        ));
    }
}

#[test]
fn opts_deserialize_with_defaults() {
    let opts: CompositorOpts = serde_json::from_str(r#"{ "jpeg_quality": 80 }"#).unwrap();
    assert_eq!(opts.jpeg_quality, 80);
    assert_eq!(opts.margin_ratio, DEFAULT_MARGIN_RATIO);
    assert!(opts.load_system_fonts);
}

#[test]
fn none_and_zero_opacity_pass_through_the_same_buffer() {
    let c = no_fonts();
    let input = png_artifact(RgbaImage::new(16, 16));

    let out = c.composite(&input, None).unwrap();
    assert!(out.media().shares_buffer_with(input.media()));

    let cfg = WatermarkConfig::image("wm", red_square_png(4)).with_opacity(0.0);
    let out = c.composite(&input, Some(&cfg)).unwrap();
    assert!(out.media().shares_buffer_with(input.media()));
}

#[test]
fn invalid_config_is_a_validation_error_even_when_transparent() {
    let c = no_fonts();
    let input = png_artifact(RgbaImage::new(16, 16));
    let cfg = WatermarkConfig::image("wm", red_square_png(4)).with_opacity(-1.0);
    let err = c.composite(&input, Some(&cfg)).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Validation);
}

#[test]
fn image_overlay_lands_in_the_bottom_right_box() {
    let c = no_fonts();
    let input = png_artifact(RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255])));
    let cfg = WatermarkConfig::image("wm", red_square_png(10)).with_opacity(1.0);

    let out = c.composite(&input, Some(&cfg)).unwrap();
    assert_eq!(out.mime(), "image/png");
    let img = image::load_from_memory(out.bytes()).unwrap().to_rgba8();

    // margin 2, side 25 -> box (73, 73)..(98, 98)
    let layout = c.layout_for(100, 100, &cfg).unwrap();
    assert_eq!(layout.margin, 2);
    assert_eq!(layout.watermark_box.x, 73);
    assert_eq!(img.get_pixel(80, 80).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(97, 97).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(98, 98).0, [0, 0, 255, 255]);
    assert_eq!(img.get_pixel(10, 10).0, [0, 0, 255, 255]);
}

#[test]
fn undecodable_image_is_a_decode_failure_and_falls_back() {
    let c = no_fonts();
    let input = Artifact::from_mime(b"not an image".to_vec(), "image/png").unwrap();
    let cfg = WatermarkConfig::image("wm", red_square_png(4));

    assert!(matches!(
        c.composite(&input, Some(&cfg)),
        Err(WatermarkError::Decode(_))
    ));

    let (out, err) = c.composite_or_original(&input, Some(&cfg)).unwrap();
    assert_eq!(out, input);
    assert_eq!(err.map(|e| e.kind()), Some(FailureKind::Decode));
}

#[test]
fn text_without_fonts_degrades_to_the_original() {
    let c = no_fonts();
    let input = png_artifact(RgbaImage::new(64, 64));
    let cfg = WatermarkConfig::text("wm", "Zopkit");

    let (out, err) = c.composite_or_original(&input, Some(&cfg)).unwrap();
    assert_eq!(out, input);
    assert_eq!(err.map(|e| e.kind()), Some(FailureKind::Composite));
}

#[test]
fn cancelled_token_aborts_before_work() {
    let c = no_fonts();
    let input = png_artifact(RgbaImage::new(16, 16));
    let cfg = WatermarkConfig::image("wm", red_square_png(4));
    let cancel = CancelToken::new();
    cancel.cancel();

    assert!(matches!(
        c.composite_with_cancel(&input, Some(&cfg), &cancel),
        Err(WatermarkError::Cancelled)
    ));
}

#[test]
fn batch_keeps_order_and_per_item_results() {
    let c = no_fonts();
    let good = png_artifact(RgbaImage::new(32, 32));
    let bad = Artifact::from_mime(b"junk".to_vec(), "image/png").unwrap();
    let cfg = WatermarkConfig::image("wm", red_square_png(4)).with_opacity(1.0);

    let results = c.composite_batch(&[good.clone(), bad, good], Some(&cfg));
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(WatermarkError::Decode(_))));
    assert_eq!(
        results[0].as_ref().unwrap().bytes(),
        results[2].as_ref().unwrap().bytes()
    );
}
