use super::*;

#[test]
fn text_config_json_shape_is_tagged() {
    let cfg = WatermarkConfig::text("brand", "Zopkit").with_name("Brand");
    let v = serde_json::to_value(&cfg).unwrap();
    assert_eq!(v["id"], "brand");
    assert_eq!(v["name"], "Brand");
    assert_eq!(v["overlay"]["kind"], "text");
    assert_eq!(v["overlay"]["text"], "Zopkit");
    assert_eq!(v["position"]["anchor"], "bottom_right");
    assert!(v["overlay"].get("font_family").is_none());
}

#[test]
fn image_bytes_serialize_as_base64_and_roundtrip() {
    let cfg = WatermarkConfig::image("logo", vec![0u8, 1, 2, 250, 251, 252])
        .with_position(Position::SafeZone { x: 0.5, y: 0.25 })
        .with_opacity(1.0)
        .with_scale(0.1);
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"bytes\":\"AAEC+vv8\""));

    let back: WatermarkConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
    assert_eq!(back.kind(), WatermarkKind::Image);
}

#[test]
fn missing_optional_fields_take_defaults() {
    let cfg: WatermarkConfig = serde_json::from_str(
        r#"{"id":"a","overlay":{"kind":"text","text":"hi"},"opacity":0.5,"scale":0.2}"#,
    )
    .unwrap();
    assert_eq!(cfg.position, Position::BottomRight);
    assert_eq!(cfg.display_name(), "a");
    let Overlay::Text(t) = &cfg.overlay else {
        panic!("expected text overlay");
    };
    assert_eq!(t.color, [255, 255, 255, 255]);
}

#[test]
fn text_fields_on_image_kind_are_rejected() {
    let err = serde_json::from_str::<WatermarkConfig>(
        r#"{"id":"a","overlay":{"kind":"image","text":"hi"},"opacity":0.5,"scale":0.2}"#,
    );
    assert!(err.is_err());
}

#[test]
fn validate_catches_bad_values() {
    assert!(WatermarkConfig::text("a", "x").validate().is_ok());
    assert!(WatermarkConfig::text("", "x").validate().is_err());
    assert!(WatermarkConfig::text("a", "  ").validate().is_err());
    assert!(WatermarkConfig::image("a", Vec::new()).validate().is_err());
    assert!(
        WatermarkConfig::text("a", "x")
            .with_opacity(1.5)
            .validate()
            .is_err()
    );
    assert!(
        WatermarkConfig::text("a", "x")
            .with_opacity(f32::NAN)
            .validate()
            .is_err()
    );
    assert!(
        WatermarkConfig::text("a", "x")
            .with_scale(0.0)
            .validate()
            .is_err()
    );
    assert!(
        WatermarkConfig::text("a", "x")
            .with_position(Position::SafeZone { x: 2.0, y: 0.0 })
            .validate()
            .is_err()
    );
}

#[test]
fn zero_opacity_is_noop() {
    assert!(WatermarkConfig::text("a", "x").with_opacity(0.0).is_noop());
    assert!(!WatermarkConfig::text("a", "x").is_noop());
}
