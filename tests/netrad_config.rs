use std::sync::Mutex;

use tempfile::NamedTempFile;

use indra_netra::config::NetradConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "NETRA_CONFIG",
        "NETRA_DB_PATH",
        "NETRA_BACKEND",
        "NETRA_CAMERA",
        "NETRA_MODEL_PATH",
        "NETRA_HEALTH_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = NetradConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "netra.db");
    assert_eq!(cfg.backend, "stub");
    assert_eq!(cfg.camera_device, "stub://camera0");
    assert!(cfg.model_path.is_none());
    assert_eq!(cfg.health_interval.as_secs(), 5);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "netra_prod.db",
        "backend": "tract",
        "camera": {
            "device": "/dev/video2"
        },
        "model_path": "models/detector.onnx",
        "health_interval_secs": 30
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("NETRA_CONFIG", file.path());
    std::env::set_var("NETRA_CAMERA", "stub://override");
    std::env::set_var("NETRA_HEALTH_SECS", "10");

    let cfg = NetradConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "netra_prod.db");
    assert_eq!(cfg.backend, "tract");
    assert_eq!(cfg.camera_device, "stub://override");
    assert_eq!(
        cfg.model_path.as_deref(),
        Some(std::path::Path::new("models/detector.onnx"))
    );
    assert_eq!(cfg.health_interval.as_secs(), 10);

    clear_env();
}

#[test]
fn empty_env_values_do_not_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("NETRA_DB_PATH", "  ");
    std::env::set_var("NETRA_BACKEND", "");

    let cfg = NetradConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "netra.db");
    assert_eq!(cfg.backend, "stub");

    clear_env();
}

#[test]
fn bad_health_interval_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("NETRA_HEALTH_SECS", "soon");
    assert!(NetradConfig::load().is_err());

    std::env::set_var("NETRA_HEALTH_SECS", "0");
    assert!(NetradConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("NETRA_CONFIG", "/nonexistent/netra.json");
    assert!(NetradConfig::load().is_err());

    clear_env();
}
