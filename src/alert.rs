//! Audio alert boundary.
//!
//! The pipeline only decides whether an alert is permitted; the sink plays
//! it. `AlertGate` enforces the cooldown: alerts requested inside the window
//! are dropped, not queued. The tone itself is a 440 Hz sine burst of 200 ms
//! at gain `(volume / 100) * 0.3`.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

/// Minimum spacing between audible alerts.
pub const ALERT_COOLDOWN: Duration = Duration::from_secs(3);
pub const ALERT_TONE_HZ: f32 = 440.0;
pub const ALERT_TONE_MS: u32 = 200;
pub const ALERT_SAMPLE_RATE: u32 = 44_100;

/// Side-effecting audio capability.
pub trait AlertSink: Send {
    /// Play the alert tone at `volume` (0..=100).
    fn play(&mut self, volume: u32) -> Result<()>;
}

/// Cooldown gate. Pure timing logic, no audio.
#[derive(Debug)]
pub struct AlertGate {
    cooldown: Duration,
    last_fired: Option<Instant>,
}

impl AlertGate {
    pub fn new() -> Self {
        Self::with_cooldown(ALERT_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: None,
        }
    }

    /// Whether an alert may fire at `now`. Firing updates the cooldown
    /// anchor; a denied request does not.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_fired {
            if now.duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }

    /// Clear the cooldown anchor (session reset).
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

impl Default for AlertGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthesize the alert tone as signed 16-bit mono PCM.
pub fn synth_alert_tone(volume: u32) -> Vec<i16> {
    let gain = (volume.min(100) as f32 / 100.0) * 0.3;
    let samples = (ALERT_SAMPLE_RATE * ALERT_TONE_MS / 1000) as usize;
    (0..samples)
        .map(|i| {
            let t = i as f32 / ALERT_SAMPLE_RATE as f32;
            // Linear fade-out over the burst so it ends without a click.
            let envelope = 1.0 - i as f32 / samples as f32;
            let value = (t * ALERT_TONE_HZ * std::f32::consts::TAU).sin() * gain * envelope;
            (value * i16::MAX as f32) as i16
        })
        .collect()
}

/// Sink that pipes the tone to `aplay`.
pub struct AplaySink;

impl AlertSink for AplaySink {
    fn play(&mut self, volume: u32) -> Result<()> {
        let tone = synth_alert_tone(volume);
        let mut pcm = Vec::with_capacity(tone.len() * 2);
        for sample in tone {
            pcm.extend_from_slice(&sample.to_le_bytes());
        }

        let mut child = Command::new("aplay")
            .args(["-q", "-f", "S16_LE", "-c", "1", "-r"])
            .arg(ALERT_SAMPLE_RATE.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("spawn aplay")?;

        child
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("aplay stdin unavailable"))?
            .write_all(&pcm)
            .context("write alert tone to aplay")?;
        let status = child.wait().context("wait for aplay")?;
        if !status.success() {
            return Err(anyhow!("aplay exited with {}", status));
        }
        Ok(())
    }
}

/// Sink that swallows alerts, for tests and headless runs.
#[derive(Debug, Default)]
pub struct NullSink {
    pub played: u32,
}

impl AlertSink for NullSink {
    fn play(&mut self, _volume: u32) -> Result<()> {
        self.played += 1;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
