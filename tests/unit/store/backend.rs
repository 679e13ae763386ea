use super::*;

#[test]
fn storage_keys_with_separators_are_rejected() {
    assert!(JsonFileBackend::new("x", "").is_err());
    assert!(JsonFileBackend::new("x", "../evil").is_err());
    assert!(JsonFileBackend::new("x", "a\\b").is_err());
    assert!(JsonFileBackend::new("x", ".hidden").is_err());
    assert!(JsonFileBackend::new("x", DEFAULT_STORAGE_KEY).is_ok());
}

#[test]
fn json_backend_missing_files_load_empty() {
    let dir = tempfile::tempdir().unwrap();
    let b = JsonFileBackend::new(dir.path(), "wm").unwrap();
    assert!(b.load().unwrap().is_empty());
    assert_eq!(b.load_active().unwrap(), None);
}

#[test]
fn json_backend_roundtrips_configs_and_active() {
    let dir = tempfile::tempdir().unwrap();
    let b = JsonFileBackend::new(dir.path().join("nested"), "wm").unwrap();
    let configs = vec![
        WatermarkConfig::text("a", "Zopkit"),
        WatermarkConfig::image("b", vec![9u8, 8, 7]).with_opacity(1.0),
    ];
    b.save(&configs).unwrap();
    b.save_active(Some("b")).unwrap();

    assert_eq!(b.load().unwrap(), configs);
    assert_eq!(b.load_active().unwrap().as_deref(), Some("b"));

    b.save_active(None).unwrap();
    assert_eq!(b.load_active().unwrap(), None);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(b.configs_path()).unwrap()).unwrap();
    assert!(raw.is_array());
}

#[test]
fn json_backend_reports_malformed_data() {
    let dir = tempfile::tempdir().unwrap();
    let b = JsonFileBackend::new(dir.path(), "wm").unwrap();
    std::fs::write(b.configs_path(), b"{ not json").unwrap();
    assert!(matches!(b.load(), Err(WatermarkError::Persistence(_))));
}

#[test]
fn in_memory_clones_share_state() {
    let a = InMemoryBackend::new();
    let b = a.clone();
    a.save(&[WatermarkConfig::text("x", "y")]).unwrap();
    a.save_active(Some("x")).unwrap();
    assert_eq!(b.load().unwrap().len(), 1);
    assert_eq!(b.load_active().unwrap().as_deref(), Some("x"));
}
