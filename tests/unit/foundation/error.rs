use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        WatermarkError::config_not_found("x")
            .to_string()
            .contains("watermark config not found:")
    );
    assert!(
        WatermarkError::decode("x")
            .to_string()
            .contains("decode failure:")
    );
    assert!(
        WatermarkError::composite("x")
            .to_string()
            .contains("composite failure:")
    );
    assert!(
        WatermarkError::persistence("x")
            .to_string()
            .contains("persistence failure:")
    );
    assert!(
        WatermarkError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = WatermarkError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.kind(), FailureKind::Other);
}

#[test]
fn only_media_failures_are_degradable() {
    assert!(WatermarkError::decode("x").is_degradable());
    assert!(WatermarkError::composite("x").is_degradable());
    assert!(WatermarkError::Cancelled.is_degradable());

    assert!(!WatermarkError::validation("x").is_degradable());
    assert!(!WatermarkError::persistence("x").is_degradable());
    assert!(!WatermarkError::config_not_found("x").is_degradable());
}
