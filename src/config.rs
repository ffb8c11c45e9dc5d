//! Daemon configuration.
//!
//! `netrad` reads a JSON config file (path from `NETRA_CONFIG` or a CLI
//! flag), applies `NETRA_*` environment overrides, fills defaults, then
//! validates. This is daemon wiring only; per-user detection settings live
//! in the KV store (`crate::settings`).

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "netra.db";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_CAMERA_DEVICE: &str = "stub://camera0";
const DEFAULT_HEALTH_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct NetradConfigFile {
    db_path: Option<String>,
    backend: Option<String>,
    camera: Option<CameraConfigFile>,
    model_path: Option<PathBuf>,
    health_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NetradConfig {
    pub db_path: String,
    /// Detector backend name in the registry.
    pub backend: String,
    /// Capture device: `stub://...` or a `/dev/video*` path.
    pub camera_device: String,
    /// Model file for file-backed backends.
    pub model_path: Option<PathBuf>,
    /// Interval between health log lines.
    pub health_interval: Duration,
}

impl NetradConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("NETRA_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: NetradConfigFile) -> Self {
        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            backend: file.backend.unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            camera_device: file
                .camera
                .and_then(|camera| camera.device)
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            model_path: file.model_path,
            health_interval: Duration::from_secs(
                file.health_interval_secs.unwrap_or(DEFAULT_HEALTH_SECS),
            ),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(db_path) = std::env::var("NETRA_DB_PATH") {
            if !db_path.trim().is_empty() {
                self.db_path = db_path;
            }
        }
        if let Ok(backend) = std::env::var("NETRA_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend;
            }
        }
        if let Ok(device) = std::env::var("NETRA_CAMERA") {
            if !device.trim().is_empty() {
                self.camera_device = device;
            }
        }
        if let Ok(model_path) = std::env::var("NETRA_MODEL_PATH") {
            if !model_path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(model_path));
            }
        }
        if let Ok(health) = std::env::var("NETRA_HEALTH_SECS") {
            let seconds: u64 = health
                .parse()
                .map_err(|_| anyhow!("NETRA_HEALTH_SECS must be an integer number of seconds"))?;
            self.health_interval = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.db_path.trim().is_empty() {
            return Err(anyhow!("db_path must not be empty"));
        }
        if self.backend.trim().is_empty() {
            return Err(anyhow!("backend must not be empty"));
        }
        if self.camera_device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if self.health_interval.as_secs() == 0 {
            return Err(anyhow!("health interval must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<NetradConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
