use super::*;

fn fonts() -> Option<FontSet> {
    let fonts = FontSet::load(true, &[], None);
    if fonts.face_count() == 0 {
        eprintln!("skipping: no system fonts available");
        return None;
    }
    Some(fonts)
}

fn overlay(text: &str) -> TextOverlay {
    TextOverlay {
        text: text.to_string(),
        color: [255, 255, 255, 255],
        font_family: None,
    }
}

#[test]
fn escape_xml_handles_markup_characters() {
    assert_eq!(
        escape_xml(r#"<a href="x">&'"#),
        "&lt;a href=&quot;x&quot;&gt;&amp;&apos;"
    );
}

#[test]
fn svg_prefers_configured_family_then_sans_serif() {
    let mut t = overlay("Hi");
    let svg = text_svg(&t, Some("Inter"));
    assert!(svg.contains("font-family=\"'Inter', sans-serif\""));

    t.font_family = Some("Roboto".to_string());
    let svg = text_svg(&t, Some("Inter"));
    assert!(svg.contains("'Roboto'"));
    assert!(!svg.contains("Inter"));
}

#[test]
fn text_fills_box_and_hugs_right_edge() {
    let Some(fonts) = fonts() else { return };
    let (w, h) = (256u32, 256u32);
    let px = rasterize_text(&overlay("Zopkit"), w, h, &fonts).unwrap();
    assert_eq!(px.len(), (w * h * 4) as usize);

    let mut min_x = u32::MAX;
    let mut max_x = 0;
    let mut covered = 0usize;
    for y in 0..h {
        for x in 0..w {
            let a = px[((y * w + x) * 4 + 3) as usize];
            if a > 0 {
                covered += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
            }
        }
    }
    assert!(covered > 0);
    // Wide text is width-bound, so it spans nearly the whole box.
    assert!(max_x >= w - 3, "max_x = {max_x}");
    assert!(min_x <= 3, "min_x = {min_x}");
}

#[test]
fn transparent_color_draws_nothing() {
    let Some(fonts) = fonts() else { return };
    let mut t = overlay("Zopkit");
    t.color = [255, 0, 0, 0];
    let px = rasterize_text(&t, 64, 64, &fonts).unwrap();
    assert!(px.chunks_exact(4).all(|p| p[3] == 0));
}

#[test]
fn no_fonts_is_a_composite_failure() {
    let fonts = FontSet::load(false, &[], None);
    assert!(matches!(
        rasterize_text(&overlay("Zopkit"), 64, 64, &fonts),
        Err(WatermarkError::Composite(_))
    ));
}
