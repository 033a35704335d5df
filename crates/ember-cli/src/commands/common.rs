//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use ember_config::EngineSettings;
use ember_core::linear_to_db;
use std::path::Path;

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, f32), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter format: '{s}' (expected key=value)"))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("Invalid value for '{key}': {e}"))?;
    Ok((key.trim().to_string(), value))
}

/// Loads a settings file, or the defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<EngineSettings> {
    let Some(path) = path else {
        return Ok(EngineSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let settings = EngineSettings::from_toml(&text)
        .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}

/// Sine tone at `amplitude_db` dBFS.
pub fn tone(freq_hz: f32, amplitude_db: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    let amplitude = ember_core::db_to_linear(amplitude_db);
    let step = core::f32::consts::TAU * freq_hz / sample_rate;
    (0..num_samples)
        .map(|n| amplitude * libm::sinf(step * n as f32))
        .collect()
}

/// Peak and RMS of a buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    /// Largest absolute sample.
    pub peak: f32,
    /// Root mean square.
    pub rms: f32,
}

impl Levels {
    /// Measures `signal`. An empty buffer reads as silence.
    pub fn measure(signal: &[f32]) -> Self {
        if signal.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = signal.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let sum_sq: f64 = signal.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let rms = (sum_sq / signal.len() as f64).sqrt() as f32;
        Self { peak, rms }
    }

    /// Peak in dBFS.
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak)
    }

    /// RMS in dBFS.
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms)
    }

    /// Peak over RMS in dB.
    pub fn crest_db(&self) -> f32 {
        self.peak_db() - self.rms_db()
    }
}
