//! Per-stage settings tables.
//!
//! Every table mirrors one stage's control table in `ember-voices`: its
//! defaults are read from the stage's `PARAMS`, and [`StageSettings::values`]
//! lays the fields out in control-index order so they can be checked and
//! written generically.

use ember_voices::{
    Controls, ParamSpec, amp_eq, borealis, compressor, engine, fuzz, helios, nebula,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A settings table that maps one-to-one onto a stage's controls.
pub trait StageSettings {
    /// Table name, also the stage name understood by the engine handle.
    const STAGE: &'static str;

    /// The stage's control table.
    fn specs() -> &'static [ParamSpec];

    /// Field values in control-index order.
    fn values(&self) -> Vec<f32>;

    /// Bypass flag, for stages that carry one.
    fn bypassed(&self) -> Option<bool> {
        None
    }

    /// Writes every value into `controls`, leaving the bypass flag alone.
    fn write_values(&self, controls: &Controls) {
        for (index, value) in self.values().into_iter().enumerate() {
            controls.set(index, value);
        }
    }

    /// Checks every value against its declared range.
    fn validate(&self) -> Result<(), ConfigError> {
        for (spec, value) in Self::specs().iter().zip(self.values()) {
            if !spec.contains(value) {
                return Err(ConfigError::OutOfRange {
                    stage: Self::STAGE,
                    param: spec.name,
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
        Ok(())
    }
}

fn default_of(specs: &[ParamSpec], index: usize) -> f32 {
    specs[index].default
}

fn in_order<const N: usize>(fields: [(usize, f32); N]) -> Vec<f32> {
    let mut values = vec![0.0; N];
    for (index, value) in fields {
        values[index] = value;
    }
    values
}

/// `[engine]` table: voice selection and gain staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainSettings {
    /// Overdrive voice name (`borealis`, `helios` or `nebula`).
    pub voice: String,
    /// Input gain in dB.
    pub input: f32,
    /// Amp master in dB.
    pub master: f32,
    /// Output gain in dB.
    pub output: f32,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            voice: ember_voices::VoiceKind::default().name().to_string(),
            input: default_of(&engine::PARAMS, engine::INPUT),
            master: default_of(&engine::PARAMS, engine::MASTER),
            output: default_of(&engine::PARAMS, engine::OUTPUT),
        }
    }
}

impl StageSettings for ChainSettings {
    const STAGE: &'static str = "engine";

    fn specs() -> &'static [ParamSpec] {
        &engine::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (engine::INPUT, self.input),
            (engine::MASTER, self.master),
            (engine::OUTPUT, self.output),
        ])
    }
}

/// `[fuzz]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuzzSettings {
    /// Stage bypass. The fuzz starts bypassed.
    pub bypassed: bool,
    /// Tone knob, 0–10.
    pub tone: f32,
    /// Sustain knob, 0–10.
    pub sustain: f32,
    /// Wet/dry blend.
    pub mix: f32,
    /// Output level, 0–3.
    pub level: f32,
}

impl Default for FuzzSettings {
    fn default() -> Self {
        Self {
            bypassed: true,
            tone: default_of(&fuzz::PARAMS, fuzz::TONE),
            sustain: default_of(&fuzz::PARAMS, fuzz::SUSTAIN),
            mix: default_of(&fuzz::PARAMS, fuzz::MIX),
            level: default_of(&fuzz::PARAMS, fuzz::LEVEL),
        }
    }
}

impl StageSettings for FuzzSettings {
    const STAGE: &'static str = "fuzz";

    fn specs() -> &'static [ParamSpec] {
        &fuzz::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (fuzz::TONE, self.tone),
            (fuzz::SUSTAIN, self.sustain),
            (fuzz::MIX, self.mix),
            (fuzz::LEVEL, self.level),
        ])
    }

    fn bypassed(&self) -> Option<bool> {
        Some(self.bypassed)
    }
}

/// `[borealis]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BorealisSettings {
    /// Drive knob, 0–10.
    pub drive: f32,
    /// Level knob, 0–10.
    pub level: f32,
    /// Wet/dry blend.
    pub mix: f32,
    /// Band split in Hz.
    pub crossover: f32,
    /// Low band corner in Hz.
    pub bass: f32,
}

impl Default for BorealisSettings {
    fn default() -> Self {
        let p = &borealis::PARAMS;
        Self {
            drive: default_of(p, borealis::DRIVE),
            level: default_of(p, borealis::LEVEL),
            mix: default_of(p, borealis::MIX),
            crossover: default_of(p, borealis::CROSSOVER),
            bass: default_of(p, borealis::BASS),
        }
    }
}

impl StageSettings for BorealisSettings {
    const STAGE: &'static str = "borealis";

    fn specs() -> &'static [ParamSpec] {
        &borealis::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (borealis::DRIVE, self.drive),
            (borealis::LEVEL, self.level),
            (borealis::MIX, self.mix),
            (borealis::CROSSOVER, self.crossover),
            (borealis::BASS, self.bass),
        ])
    }
}

/// `[helios]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeliosSettings {
    /// Drive knob, 0–10.
    pub drive: f32,
    /// Level knob, 0–10.
    pub level: f32,
    /// Wet/dry blend.
    pub mix: f32,
    /// Era knob, 0–10.
    pub era: f32,
}

impl Default for HeliosSettings {
    fn default() -> Self {
        let p = &helios::PARAMS;
        Self {
            drive: default_of(p, helios::DRIVE),
            level: default_of(p, helios::LEVEL),
            mix: default_of(p, helios::MIX),
            era: default_of(p, helios::ERA),
        }
    }
}

impl StageSettings for HeliosSettings {
    const STAGE: &'static str = "helios";

    fn specs() -> &'static [ParamSpec] {
        &helios::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (helios::DRIVE, self.drive),
            (helios::LEVEL, self.level),
            (helios::MIX, self.mix),
            (helios::ERA, self.era),
        ])
    }
}

/// `[nebula]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NebulaSettings {
    /// Drive knob, 0–10.
    pub drive: f32,
    /// Level knob, 0–10.
    pub level: f32,
    /// Wet/dry blend.
    pub mix: f32,
    /// Attack knob, 0–10.
    pub attack: f32,
}

impl Default for NebulaSettings {
    fn default() -> Self {
        let p = &nebula::PARAMS;
        Self {
            drive: default_of(p, nebula::DRIVE),
            level: default_of(p, nebula::LEVEL),
            mix: default_of(p, nebula::MIX),
            attack: default_of(p, nebula::ATTACK),
        }
    }
}

impl StageSettings for NebulaSettings {
    const STAGE: &'static str = "nebula";

    fn specs() -> &'static [ParamSpec] {
        &nebula::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (nebula::DRIVE, self.drive),
            (nebula::LEVEL, self.level),
            (nebula::MIX, self.mix),
            (nebula::ATTACK, self.attack),
        ])
    }
}

/// `[compressor]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorSettings {
    /// Stage bypass. The compressor starts bypassed.
    pub bypassed: bool,
    /// Detector law name (`opto`, `fet` or `vca`).
    pub kind: String,
    /// Threshold in dB.
    pub threshold: f32,
    /// Compression ratio.
    pub ratio: f32,
    /// Wet/dry blend.
    pub mix: f32,
    /// Makeup factor, 0–10.
    pub level: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        let p = &compressor::PARAMS;
        Self {
            bypassed: true,
            kind: ember_voices::CompressorKind::default().name().to_string(),
            threshold: default_of(p, compressor::THRESHOLD),
            ratio: default_of(p, compressor::RATIO),
            mix: default_of(p, compressor::MIX),
            level: default_of(p, compressor::LEVEL),
        }
    }
}

impl StageSettings for CompressorSettings {
    const STAGE: &'static str = "compressor";

    fn specs() -> &'static [ParamSpec] {
        &compressor::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (compressor::THRESHOLD, self.threshold),
            (compressor::RATIO, self.ratio),
            (compressor::MIX, self.mix),
            (compressor::LEVEL, self.level),
        ])
    }

    fn bypassed(&self) -> Option<bool> {
        Some(self.bypassed)
    }
}

/// `[amp_eq]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmpEqSettings {
    /// Stage bypass.
    pub bypassed: bool,
    /// Bass shelf gain in dB.
    pub bass: f32,
    /// Low-mid peak gain in dB.
    pub low_mid: f32,
    /// High-mid peak gain in dB.
    pub high_mid: f32,
    /// Treble shelf gain in dB.
    pub treble: f32,
}

impl Default for AmpEqSettings {
    fn default() -> Self {
        let p = &amp_eq::PARAMS;
        Self {
            bypassed: false,
            bass: default_of(p, amp_eq::BASS),
            low_mid: default_of(p, amp_eq::LOW_MID),
            high_mid: default_of(p, amp_eq::HIGH_MID),
            treble: default_of(p, amp_eq::TREBLE),
        }
    }
}

impl StageSettings for AmpEqSettings {
    const STAGE: &'static str = "amp_eq";

    fn specs() -> &'static [ParamSpec] {
        &amp_eq::PARAMS
    }

    fn values(&self) -> Vec<f32> {
        in_order([
            (amp_eq::BASS, self.bass),
            (amp_eq::LOW_MID, self.low_mid),
            (amp_eq::HIGH_MID, self.high_mid),
            (amp_eq::TREBLE, self.treble),
        ])
    }

    fn bypassed(&self) -> Option<bool> {
        Some(self.bypassed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults_match<S: StageSettings + Default>() {
        let values = S::default().values();
        assert_eq!(values.len(), S::specs().len(), "{}", S::STAGE);
        for (spec, value) in S::specs().iter().zip(values) {
            assert_eq!(spec.default, value, "{}.{}", S::STAGE, spec.name);
        }
    }

    #[test]
    fn defaults_follow_the_control_tables() {
        defaults_match::<ChainSettings>();
        defaults_match::<FuzzSettings>();
        defaults_match::<BorealisSettings>();
        defaults_match::<HeliosSettings>();
        defaults_match::<NebulaSettings>();
        defaults_match::<CompressorSettings>();
        defaults_match::<AmpEqSettings>();
    }

    #[test]
    fn values_follow_control_indices() {
        let settings = BorealisSettings {
            crossover: 1200.0,
            bass: 90.0,
            ..Default::default()
        };
        let values = settings.values();
        assert_eq!(values[borealis::CROSSOVER], 1200.0);
        assert_eq!(values[borealis::BASS], 90.0);
    }

    #[test]
    fn rejects_out_of_range() {
        let settings = HeliosSettings {
            era: 11.0,
            ..Default::default()
        };
        match settings.validate() {
            Err(ConfigError::OutOfRange { stage, param, .. }) => {
                assert_eq!(stage, "helios");
                assert_eq!(param, "era");
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert!(HeliosSettings::default().validate().is_ok());
    }

    #[test]
    fn stage_names_are_engine_stages() {
        for name in [
            ChainSettings::STAGE,
            FuzzSettings::STAGE,
            BorealisSettings::STAGE,
            HeliosSettings::STAGE,
            NebulaSettings::STAGE,
            CompressorSettings::STAGE,
            AmpEqSettings::STAGE,
        ] {
            assert!(engine::STAGE_NAMES.contains(&name), "{name}");
        }
    }
}
