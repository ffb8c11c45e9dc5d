//! Application settings.
//!
//! Settings live in the KV store as one JSON-encoded value per field under
//! `indra-netra-settings-<key>`. Each field falls back to its own default
//! when missing or unparsable; a broken value never drags the rest of the
//! settings down with it. Sessions read settings at start; later changes
//! take effect on the next read.

use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::log::now_ms;
use crate::storage::KvStore;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_DETECTION_FREQUENCY: u32 = 3;
pub const DEFAULT_ALERTS_ENABLED: bool = true;
pub const DEFAULT_ALERT_VOLUME: u32 = 50;
pub const DEFAULT_ALERT_THRESHOLD: f32 = 0.8;
pub const DEFAULT_CAMERA_RESOLUTION: &str = "1280x720";
pub const DEFAULT_CAMERA_FPS: u32 = 30;
pub const DEFAULT_THEME: &str = "dark";

/// Resolutions the capture layer accepts.
pub const SUPPORTED_RESOLUTIONS: [&str; 3] = ["640x480", "1280x720", "1920x1080"];

const KEY_CONFIDENCE_THRESHOLD: &str = "confidence-threshold";
const KEY_DETECTION_FREQUENCY: &str = "detection-frequency";
const KEY_ALERTS_ENABLED: &str = "alerts-enabled";
const KEY_ALERT_VOLUME: &str = "alert-volume";
const KEY_ALERT_THRESHOLD: &str = "alert-threshold";
const KEY_CAMERA_RESOLUTION: &str = "camera-resolution";
const KEY_CAMERA_FPS: &str = "camera-fps";
const KEY_THEME: &str = "theme";

const ALL_KEYS: [&str; 8] = [
    KEY_CONFIDENCE_THRESHOLD,
    KEY_DETECTION_FREQUENCY,
    KEY_ALERTS_ENABLED,
    KEY_ALERT_VOLUME,
    KEY_ALERT_THRESHOLD,
    KEY_CAMERA_RESOLUTION,
    KEY_CAMERA_FPS,
    KEY_THEME,
];

/// Full KV key for a settings field suffix.
pub fn settings_key(suffix: &str) -> String {
    format!("indra-netra-settings-{}", suffix)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub confidence_threshold: f32,
    /// Run inference every Nth frame.
    pub detection_frequency: u32,
    pub alerts_enabled: bool,
    /// 0..=100.
    pub alert_volume: u32,
    /// Minimum max-score before a High-threat sample may alert.
    pub alert_threshold: f32,
    /// `<width>x<height>`.
    pub camera_resolution: String,
    pub camera_fps: u32,
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            detection_frequency: DEFAULT_DETECTION_FREQUENCY,
            alerts_enabled: DEFAULT_ALERTS_ENABLED,
            alert_volume: DEFAULT_ALERT_VOLUME,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            camera_resolution: DEFAULT_CAMERA_RESOLUTION.to_string(),
            camera_fps: DEFAULT_CAMERA_FPS,
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

/// Detection sensitivity presets: confidence threshold + sampling frequency
/// pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionPreset {
    Conservative,
    Balanced,
    Aggressive,
    Maximum,
}

impl DetectionPreset {
    pub const ALL: [DetectionPreset; 4] = [
        DetectionPreset::Conservative,
        DetectionPreset::Balanced,
        DetectionPreset::Aggressive,
        DetectionPreset::Maximum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectionPreset::Conservative => "conservative",
            DetectionPreset::Balanced => "balanced",
            DetectionPreset::Aggressive => "aggressive",
            DetectionPreset::Maximum => "maximum",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == name.to_ascii_lowercase())
    }

    pub fn confidence_threshold(&self) -> f32 {
        match self {
            DetectionPreset::Conservative => 0.8,
            DetectionPreset::Balanced => 0.6,
            DetectionPreset::Aggressive => 0.4,
            DetectionPreset::Maximum => 0.2,
        }
    }

    pub fn detection_frequency(&self) -> u32 {
        match self {
            DetectionPreset::Conservative => 5,
            DetectionPreset::Balanced => 3,
            DetectionPreset::Aggressive => 2,
            DetectionPreset::Maximum => 1,
        }
    }
}

/// Export artifact: current settings plus a capture timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettingsExport {
    pub exported_at_ms: u64,
    pub settings: Settings,
}

impl Settings {
    /// Read every field from the store, falling back per field.
    pub fn load(store: &dyn KvStore) -> Self {
        let defaults = Settings::default();
        Self {
            confidence_threshold: read_field(
                store,
                KEY_CONFIDENCE_THRESHOLD,
                defaults.confidence_threshold,
            ),
            detection_frequency: read_field(
                store,
                KEY_DETECTION_FREQUENCY,
                defaults.detection_frequency,
            )
            .max(1),
            alerts_enabled: read_field(store, KEY_ALERTS_ENABLED, defaults.alerts_enabled),
            alert_volume: read_field(store, KEY_ALERT_VOLUME, defaults.alert_volume).min(100),
            alert_threshold: read_field(store, KEY_ALERT_THRESHOLD, defaults.alert_threshold),
            camera_resolution: read_field(
                store,
                KEY_CAMERA_RESOLUTION,
                defaults.camera_resolution,
            ),
            camera_fps: read_field(store, KEY_CAMERA_FPS, defaults.camera_fps).max(1),
            theme: read_field(store, KEY_THEME, defaults.theme),
        }
    }

    /// Write every field back, one key per field.
    pub fn save(&self, store: &mut dyn KvStore) -> Result<()> {
        write_field(store, KEY_CONFIDENCE_THRESHOLD, &self.confidence_threshold)?;
        write_field(store, KEY_DETECTION_FREQUENCY, &self.detection_frequency)?;
        write_field(store, KEY_ALERTS_ENABLED, &self.alerts_enabled)?;
        write_field(store, KEY_ALERT_VOLUME, &self.alert_volume)?;
        write_field(store, KEY_ALERT_THRESHOLD, &self.alert_threshold)?;
        write_field(store, KEY_CAMERA_RESOLUTION, &self.camera_resolution)?;
        write_field(store, KEY_CAMERA_FPS, &self.camera_fps)?;
        write_field(store, KEY_THEME, &self.theme)?;
        Ok(())
    }

    /// Restore defaults and remove every per-field key.
    pub fn reset(store: &mut dyn KvStore) -> Result<Settings> {
        for suffix in ALL_KEYS {
            store.remove_item(&settings_key(suffix))?;
        }
        Ok(Settings::default())
    }

    pub fn apply_preset(&mut self, preset: DetectionPreset) {
        self.confidence_threshold = preset.confidence_threshold();
        self.detection_frequency = preset.detection_frequency();
    }

    /// Parse `camera_resolution` as `(width, height)`.
    pub fn resolution(&self) -> Result<(u32, u32)> {
        parse_resolution(&self.camera_resolution)
    }

    pub fn export(&self) -> SettingsExport {
        SettingsExport {
            exported_at_ms: now_ms(),
            settings: self.clone(),
        }
    }
}

/// Parse a `<width>x<height>` string.
pub fn parse_resolution(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| anyhow!("resolution '{}' is not <width>x<height>", value))?;
    let width: u32 = width
        .parse()
        .map_err(|_| anyhow!("resolution width '{}' is not a number", width))?;
    let height: u32 = height
        .parse()
        .map_err(|_| anyhow!("resolution height '{}' is not a number", height))?;
    if width == 0 || height == 0 {
        return Err(anyhow!("resolution '{}' has a zero dimension", value));
    }
    Ok((width, height))
}

fn read_field<T: DeserializeOwned>(store: &dyn KvStore, suffix: &str, default: T) -> T {
    match store.get_item(&settings_key(suffix)) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or(default),
        Ok(None) => default,
        Err(e) => {
            log::warn!("settings read for '{}' failed, using default: {:#}", suffix, e);
            default
        }
    }
}

fn write_field<T: Serialize>(store: &mut dyn KvStore, suffix: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    store.set_item(&settings_key(suffix), &encoded)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
