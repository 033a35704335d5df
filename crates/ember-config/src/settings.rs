//! Whole-engine settings document.

use ember_core::{OversamplingFactor, PipelineConfig};
use ember_voices::{
    CompressorKind, EngineHandle, VoiceKind, amp_eq, borealis, compressor, engine, fuzz, helios,
    nebula,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stages::{
    AmpEqSettings, BorealisSettings, ChainSettings, CompressorSettings, FuzzSettings,
    HeliosSettings, NebulaSettings, StageSettings,
};

/// `[pipeline]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Base sample rate in Hz.
    pub sample_rate: f32,
    /// Largest block the host will pass.
    pub max_block_size: usize,
    /// Channel count.
    pub channels: usize,
    /// Oversampling ratio for stages that follow the pipeline's factor.
    pub oversampling: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            sample_rate: config.sample_rate(),
            max_block_size: config.max_block_size(),
            channels: config.channels(),
            oversampling: config.oversampling().ratio(),
        }
    }
}

impl PipelineSettings {
    /// Validated pipeline configuration.
    pub fn config(&self) -> Result<PipelineConfig, ConfigError> {
        let factor = OversamplingFactor::from_ratio(self.oversampling)
            .ok_or(ConfigError::InvalidOversampling(self.oversampling))?;
        Ok(PipelineConfig::new(
            self.sample_rate,
            self.max_block_size,
            self.channels,
            factor,
        )?)
    }
}

/// Every setting of an engine, as stored in TOML.
///
/// Missing tables and keys take the stage defaults, so an empty document is
/// a valid configuration. Unknown keys are rejected.
///
/// # TOML Format
///
/// ```toml
/// [pipeline]
/// sample_rate = 48000.0
/// max_block_size = 512
/// channels = 2
/// oversampling = 1
///
/// [engine]
/// voice = "nebula"
/// input = 0.0
/// master = -3.0
/// output = 0.0
///
/// [compressor]
/// bypassed = false
/// kind = "fet"
/// threshold = -24.0
/// ratio = 4.0
///
/// [nebula]
/// drive = 7.0
/// attack = 6.5
///
/// [amp_eq]
/// treble = 3.0
/// ```
///
/// # Example
///
/// ```rust
/// use ember_config::EngineSettings;
/// use ember_voices::{Engine, VoiceKind};
///
/// let settings = EngineSettings::from_toml("[engine]\nvoice = \"helios\"\n").unwrap();
/// let engine = Engine::new(&settings.pipeline().unwrap());
/// let handle = engine.handle();
/// settings.apply(&handle).unwrap();
/// assert_eq!(handle.voice(), VoiceKind::Helios);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Sample rate, block size, channels, oversampling.
    pub pipeline: PipelineSettings,
    /// Voice selection and gains.
    pub engine: ChainSettings,
    /// Fuzz controls.
    pub fuzz: FuzzSettings,
    /// Borealis controls.
    pub borealis: BorealisSettings,
    /// Helios controls.
    pub helios: HeliosSettings,
    /// Nebula controls.
    pub nebula: NebulaSettings,
    /// Compressor law and controls.
    pub compressor: CompressorSettings,
    /// Amp tone stack.
    pub amp_eq: AmpEqSettings,
}

impl EngineSettings {
    /// Parses and validates a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the pipeline, names and every control range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.config()?;
        self.voice()?;
        self.compressor_kind()?;
        self.engine.validate()?;
        self.fuzz.validate()?;
        self.borealis.validate()?;
        self.helios.validate()?;
        self.nebula.validate()?;
        self.compressor.validate()?;
        self.amp_eq.validate()?;
        Ok(())
    }

    /// Pipeline configuration to build the engine with.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        self.pipeline.config()
    }

    /// Selected overdrive voice.
    pub fn voice(&self) -> Result<VoiceKind, ConfigError> {
        self.engine
            .voice
            .parse()
            .map_err(|_| ConfigError::UnknownVoice(self.engine.voice.clone()))
    }

    /// Selected compressor law.
    pub fn compressor_kind(&self) -> Result<CompressorKind, ConfigError> {
        self.compressor
            .kind
            .parse()
            .map_err(|_| ConfigError::UnknownCompressor(self.compressor.kind.clone()))
    }

    /// Validates, then publishes every value through `handle`.
    ///
    /// Nothing is written when validation fails.
    pub fn apply(&self, handle: &EngineHandle) -> Result<(), ConfigError> {
        self.validate()?;
        handle.select_voice(self.voice()?);
        handle.select_compressor(self.compressor_kind()?);
        publish(handle, &self.engine);
        publish(handle, &self.fuzz);
        publish(handle, &self.borealis);
        publish(handle, &self.helios);
        publish(handle, &self.nebula);
        publish(handle, &self.compressor);
        publish(handle, &self.amp_eq);
        Ok(())
    }

    /// Snapshot of the values currently published through `handle`.
    pub fn capture(handle: &EngineHandle, pipeline: &PipelineConfig) -> Self {
        let mut settings = Self {
            pipeline: PipelineSettings {
                sample_rate: pipeline.sample_rate(),
                max_block_size: pipeline.max_block_size(),
                channels: pipeline.channels(),
                oversampling: pipeline.oversampling().ratio(),
            },
            ..Self::default()
        };
        settings.engine.voice = handle.voice().name().to_string();
        settings.compressor.kind = handle.compressor_link().kind().name().to_string();

        let read = |stage: &str, index: usize| {
            handle
                .controls_for(stage)
                .map_or(0.0, |controls| controls.get(index))
        };
        let bypassed = |stage: &str| {
            handle
                .controls_for(stage)
                .is_some_and(|controls| controls.is_bypassed())
        };
        settings.engine.input = read("engine", engine::INPUT);
        settings.engine.master = read("engine", engine::MASTER);
        settings.engine.output = read("engine", engine::OUTPUT);

        settings.fuzz.bypassed = bypassed("fuzz");
        settings.fuzz.tone = read("fuzz", fuzz::TONE);
        settings.fuzz.sustain = read("fuzz", fuzz::SUSTAIN);
        settings.fuzz.mix = read("fuzz", fuzz::MIX);
        settings.fuzz.level = read("fuzz", fuzz::LEVEL);

        settings.borealis.drive = read("borealis", borealis::DRIVE);
        settings.borealis.level = read("borealis", borealis::LEVEL);
        settings.borealis.mix = read("borealis", borealis::MIX);
        settings.borealis.crossover = read("borealis", borealis::CROSSOVER);
        settings.borealis.bass = read("borealis", borealis::BASS);

        settings.helios.drive = read("helios", helios::DRIVE);
        settings.helios.level = read("helios", helios::LEVEL);
        settings.helios.mix = read("helios", helios::MIX);
        settings.helios.era = read("helios", helios::ERA);

        settings.nebula.drive = read("nebula", nebula::DRIVE);
        settings.nebula.level = read("nebula", nebula::LEVEL);
        settings.nebula.mix = read("nebula", nebula::MIX);
        settings.nebula.attack = read("nebula", nebula::ATTACK);

        settings.compressor.bypassed = bypassed("compressor");
        settings.compressor.threshold = read("compressor", compressor::THRESHOLD);
        settings.compressor.ratio = read("compressor", compressor::RATIO);
        settings.compressor.mix = read("compressor", compressor::MIX);
        settings.compressor.level = read("compressor", compressor::LEVEL);

        settings.amp_eq.bypassed = bypassed("amp_eq");
        settings.amp_eq.bass = read("amp_eq", amp_eq::BASS);
        settings.amp_eq.low_mid = read("amp_eq", amp_eq::LOW_MID);
        settings.amp_eq.high_mid = read("amp_eq", amp_eq::HIGH_MID);
        settings.amp_eq.treble = read("amp_eq", amp_eq::TREBLE);

        settings
    }
}

fn publish<S: StageSettings>(handle: &EngineHandle, settings: &S) {
    let Some(controls) = handle.controls_for(S::STAGE) else {
        return;
    };
    settings.write_values(controls);
    if let Some(bypassed) = settings.bypassed() {
        controls.set_bypassed(bypassed);
    }
}
