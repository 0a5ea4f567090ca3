use airdrum_core::{CoreError, EngineConfig, ZoneMap, ZoneShape};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_toml_kit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kit.toml");
    fs::write(
        &path,
        r#"
[detector]
velocity_threshold = 0.3

[[zones]]
id = "crash"
assignable_joints = ["wrist"]
shape = { type = "height_band", y_min = 0.0, y_max = 0.25 }

[[zones]]
id = "kick"
assignable_joints = ["knee", "ankle"]
shape = { type = "box", x_min = 0.3, x_max = 0.7, y_min = 0.7, y_max = 1.0 }
proximity = { center = [0.5, 0.85, 0.0], radius = 0.2 }

[[zones]]
id = "ride"
assignable_joints = ["wrist"]
velocity_threshold = 0.5
shape = { type = "radial", center = [0.8, 0.3, 0.0], trigger_radius = 0.1 }
"#,
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.detector.velocity_threshold, 0.3);
    assert_eq!(config.detector.cooldown_secs, 0.1);

    let map = ZoneMap::new(config.zones).unwrap();
    let ids: Vec<&str> = map.all_zones().iter().map(|z| z.id.as_str()).collect();
    assert_eq!(ids, vec!["crash", "ride", "kick"]);
    assert!(map.zone("kick").unwrap().is_foot_only());
    assert!(matches!(
        map.zone("ride").unwrap().shape,
        ZoneShape::Radial { .. }
    ));
}

#[test]
fn test_partial_source_section_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feet.toml");
    fs::write(
        &path,
        r#"
[unified.foot]
threshold = 2.0

[unified.mic]
window = 3
"#,
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    let foot = &config.unified.foot;
    assert_eq!(foot.threshold, 2.0);
    assert_eq!(foot.max_value, 2.0);
    assert_eq!(foot.buffer_capacity, 10);
    assert_eq!(foot.window, 3);

    // Each source falls back to its own defaults
    let mic = &config.unified.mic;
    assert_eq!(mic.window, 3);
    assert_eq!(mic.threshold, 0.2);
    assert_eq!(mic.buffer_capacity, 20);
    assert_eq!(config.unified.hand.threshold, 0.5);
}

#[test]
fn test_duplicate_zone_rejected_at_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kit.json");
    fs::write(
        &path,
        r#"{
            "zones": [
                { "id": "snare", "assignable_joints": ["wrist"],
                  "shape": { "type": "height_band", "y_min": 0.4, "y_max": 0.6 } },
                { "id": "snare", "assignable_joints": ["wrist"],
                  "shape": { "type": "height_band", "y_min": 0.6, "y_max": 0.8 } }
            ]
        }"#,
    )
    .unwrap();

    assert!(matches!(
        EngineConfig::load(&path),
        Err(CoreError::DuplicateZone(id)) if id == "snare"
    ));
}

#[test]
fn test_inverted_band_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kit.json");
    fs::write(
        &path,
        r#"{ "zones": [ { "id": "tom", "assignable_joints": ["wrist"],
             "shape": { "type": "height_band", "y_min": 0.8, "y_max": 0.2 } } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        EngineConfig::load(&path),
        Err(CoreError::InvalidZone(_))
    ));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kit.toml");
    fs::write(&path, "smoothing_window = \"five\"").unwrap();
    assert!(matches!(EngineConfig::load(&path), Err(CoreError::Parse(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        EngineConfig::load(&dir.path().join("absent.toml")),
        Err(CoreError::Io(_))
    ));
}

#[test]
fn test_save_and_reload_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");

    let mut config = EngineConfig::default();
    config.unified.debounce_secs = 0.08;
    config.forwarding.osc.enabled = true;
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_save_toml_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    let config = EngineConfig::default();
    config.save(&path).unwrap();
    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded.zones.len(), config.zones.len());
    assert_eq!(loaded.unified.latency, config.unified.latency);
}
