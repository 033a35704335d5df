//! The full signal chain and its control-thread handle.
//!
//! ```text
//! input gain → compressor → fuzz → overdrive voice → amp EQ → master → output
//! ```
//!
//! All three overdrive voices are built and prepared up front; only the
//! selected one runs. The selection is a single `AtomicU8` written by the
//! control thread. The audio thread compares it with the voice it ran last
//! at the start of every block and, on a change, resets the newly selected
//! voice before its first sample, so it never starts from state left over
//! from an earlier selection.
//!
//! ## Engine controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | input | -24–24 dB | 0 |
//! | 1 | master | -60–12 dB | 0 |
//! | 2 | output | -60–12 dB | 0 |

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU8, Ordering};

use ember_core::{LinearSmoothedParam, PipelineConfig, Stage, block_len, db_to_linear};

use crate::amp_eq::AmpEq;
use crate::compressor::{Compressor, CompressorKind, CompressorLink};
use crate::fuzz::Fuzz;
use crate::params::{Controls, ParamSpec, ParamUnit, find_param};
use crate::voice::{Voice, VoiceKind};

/// Input gain control index.
pub const INPUT: usize = 0;
/// Amp master control index.
pub const MASTER: usize = 1;
/// Output gain control index.
pub const OUTPUT: usize = 2;

/// Control table of the engine's own gains.
pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::new("input", ParamUnit::Decibels, -24.0, 24.0, 0.0),
    ParamSpec::new("master", ParamUnit::Decibels, -60.0, 12.0, 0.0),
    ParamSpec::new("output", ParamUnit::Decibels, -60.0, 12.0, 0.0),
];

/// Names accepted by [`EngineHandle::controls_for`], in chain order.
pub const STAGE_NAMES: [&str; 7] = [
    "engine",
    "compressor",
    "fuzz",
    "borealis",
    "helios",
    "nebula",
    "amp_eq",
];

/// Control-thread view of an [`Engine`].
///
/// Cheap to clone; every clone publishes into the same engine. Nothing here
/// blocks or allocates.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    engine: Arc<Controls>,
    voice: Arc<AtomicU8>,
    compressor: Arc<Controls>,
    compressor_link: Arc<CompressorLink>,
    fuzz: Arc<Controls>,
    voices: [Arc<Controls>; 3],
    amp_eq: Arc<Controls>,
}

impl EngineHandle {
    /// Publishes a new overdrive voice.
    pub fn select_voice(&self, kind: VoiceKind) {
        self.voice.store(kind.index(), Ordering::Relaxed);
    }

    /// Last published overdrive voice.
    pub fn voice(&self) -> VoiceKind {
        VoiceKind::from_index(self.voice.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Publishes a new compressor law.
    pub fn select_compressor(&self, kind: CompressorKind) {
        self.compressor_link.select(kind);
    }

    /// Engine gains (see [`INPUT`], [`MASTER`], [`OUTPUT`]).
    pub fn engine(&self) -> &Arc<Controls> {
        &self.engine
    }

    /// Compressor controls.
    pub fn compressor(&self) -> &Arc<Controls> {
        &self.compressor
    }

    /// Compressor law selection and gain-reduction meter.
    pub fn compressor_link(&self) -> &Arc<CompressorLink> {
        &self.compressor_link
    }

    /// Fuzz controls.
    pub fn fuzz(&self) -> &Arc<Controls> {
        &self.fuzz
    }

    /// Controls of one overdrive voice, selected or not.
    pub fn voice_controls(&self, kind: VoiceKind) -> &Arc<Controls> {
        &self.voices[usize::from(kind.index())]
    }

    /// Amp EQ controls.
    pub fn amp_eq(&self) -> &Arc<Controls> {
        &self.amp_eq
    }

    /// Controls by stage name (see [`STAGE_NAMES`]), case-insensitive.
    pub fn controls_for(&self, stage: &str) -> Option<&Arc<Controls>> {
        let index = STAGE_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(stage.trim()))?;
        Some(match index {
            0 => &self.engine,
            1 => &self.compressor,
            2 => &self.fuzz,
            3 => &self.voices[0],
            4 => &self.voices[1],
            5 => &self.voices[2],
            _ => &self.amp_eq,
        })
    }

    /// Sets `stage.control` to `value`. Returns `false` when either name is
    /// unknown.
    pub fn set(&self, path: &str, value: f32) -> bool {
        let Some((stage, control)) = path.split_once('.') else {
            return false;
        };
        match self.controls_for(stage) {
            Some(controls) => match find_param(controls.specs(), control.trim()) {
                Some(index) => {
                    controls.set(index, value);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Enables or disables bypass of a stage by name.
    pub fn set_bypassed(&self, stage: &str, bypassed: bool) -> bool {
        match self.controls_for(stage) {
            Some(controls) => {
                controls.set_bypassed(bypassed);
                true
            }
            None => false,
        }
    }

    /// Deepest compressor gain reduction of the last block, in dB.
    pub fn gain_reduction_db(&self) -> f32 {
        self.compressor_link.gain_reduction_db()
    }
}

/// The complete chain.
///
/// The compressor and fuzz start bypassed; the overdrive voice, amp EQ and
/// gains start active.
///
/// # Example
///
/// ```rust
/// use ember_core::{PipelineConfig, Stage};
/// use ember_voices::{Engine, VoiceKind};
///
/// let mut engine = Engine::new(&PipelineConfig::default());
/// let handle = engine.handle();
///
/// handle.select_voice(VoiceKind::Nebula);
/// handle.set("nebula.drive", 7.0);
///
/// let mut block = vec![0.0_f32; 512];
/// engine.process_mono(&mut block);
/// assert_eq!(engine.active_voice(), VoiceKind::Nebula);
/// ```
#[derive(Debug)]
pub struct Engine {
    handle: EngineHandle,
    compressor: Compressor,
    fuzz: Fuzz,
    voices: [Voice; 3],
    amp_eq: AmpEq,
    active: VoiceKind,
    smoothed: [LinearSmoothedParam; 3],
    gain: Vec<f32>,
    scratch: Vec<f32>,
}

impl Engine {
    /// Builds and prepares every stage.
    pub fn new(config: &PipelineConfig) -> Self {
        let compressor = Compressor::new(config);
        let fuzz = Fuzz::new(config);
        let voices = VoiceKind::ALL.map(|kind| Voice::new(kind, config));
        let amp_eq = AmpEq::new(config);

        let engine = Arc::new(Controls::new(&PARAMS));
        let handle = EngineHandle {
            voice: Arc::new(AtomicU8::new(VoiceKind::default().index())),
            compressor: Arc::clone(compressor.controls()),
            compressor_link: Arc::clone(compressor.link()),
            fuzz: Arc::clone(fuzz.controls()),
            voices: [
                Arc::clone(voices[0].controls()),
                Arc::clone(voices[1].controls()),
                Arc::clone(voices[2].controls()),
            ],
            amp_eq: Arc::clone(amp_eq.controls()),
            engine,
        };
        handle.compressor.set_bypassed(true);
        handle.fuzz.set_bypassed(true);

        let smoothed = handle.engine.smoothers(config.sample_rate());
        let mut chain = Self {
            handle,
            compressor,
            fuzz,
            voices,
            amp_eq,
            active: VoiceKind::default(),
            smoothed,
            gain: Vec::new(),
            scratch: Vec::new(),
        };
        chain.prepare(config);
        chain
    }

    /// A new control-thread handle.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Voice the audio side ran in the last block.
    pub fn active_voice(&self) -> VoiceKind {
        self.active
    }

    fn voice_mut(&mut self, kind: VoiceKind) -> &mut Voice {
        &mut self.voices[usize::from(kind.index())]
    }

    fn follow_selection(&mut self) {
        let selected = self.handle.voice();
        if selected != self.active {
            #[cfg(feature = "tracing")]
            tracing::debug!("voice_switch: {} -> {}", self.active, selected);
            self.voice_mut(selected).reset();
            self.active = selected;
        }
    }

    /// Multiplies every channel by the smoothed dB gain(s) in `params`,
    /// summed, chunk by chunk.
    fn apply_gain(&mut self, channels: &mut [&mut [f32]], params: &[usize]) {
        let total = block_len(channels);
        let step = self.gain.len().max(1);
        let mut start = 0;
        while start < total {
            let len = step.min(total - start);
            let gain = &mut self.gain[..len];
            gain.fill(0.0);
            for &index in params {
                self.smoothed[index].fill(&mut self.scratch[..len]);
                for (g, &db) in gain.iter_mut().zip(&self.scratch[..len]) {
                    *g += db;
                }
            }
            for g in gain.iter_mut() {
                *g = db_to_linear(*g);
            }
            for channel in channels.iter_mut() {
                for (sample, &g) in channel[start..start + len].iter_mut().zip(gain.iter()) {
                    *sample *= g;
                }
            }
            start += len;
        }
    }
}

impl Stage for Engine {
    fn prepare(&mut self, config: &PipelineConfig) {
        self.compressor.prepare(config);
        self.fuzz.prepare(config);
        for voice in &mut self.voices {
            voice.prepare(config);
        }
        self.amp_eq.prepare(config);

        self.smoothed = self.handle.engine.smoothers(config.sample_rate());
        self.gain = vec![0.0; config.max_block_size()];
        self.scratch = vec![0.0; config.max_block_size()];
        self.active = self.handle.voice();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "engine_prepare: {} Hz, block {}, {} channels, voice {}",
            config.sample_rate(),
            config.max_block_size(),
            config.channels(),
            self.active
        );
    }

    fn reset(&mut self) {
        self.handle.engine.snap(&mut self.smoothed);
        self.compressor.reset();
        self.fuzz.reset();
        for voice in &mut self.voices {
            voice.reset();
        }
        self.amp_eq.reset();
        self.active = self.handle.voice();
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.handle.engine.is_bypassed() {
            return;
        }
        self.handle.engine.pull(&mut self.smoothed);
        self.follow_selection();

        self.apply_gain(channels, &[INPUT]);
        self.compressor.process(channels);
        self.fuzz.process(channels);
        let active = self.active;
        self.voice_mut(active).process(channels);
        self.amp_eq.process(channels);
        self.apply_gain(channels, &[MASTER, OUTPUT]);
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.handle.engine.set_bypassed(bypassed);
    }

    fn is_bypassed(&self) -> bool {
        self.handle.engine.is_bypassed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}

    #[test]
    fn handle_crosses_threads() {
        assert_send_sync::<EngineHandle>();
        assert_send::<Engine>();
    }

    #[test]
    fn set_by_path() {
        let engine = Engine::new(&PipelineConfig::default());
        let handle = engine.handle();
        assert!(handle.set("fuzz.sustain", 8.0));
        assert_eq!(handle.fuzz().get(crate::fuzz::SUSTAIN), 8.0);
        assert!(handle.set("Engine.Output", -6.0));
        assert_eq!(handle.engine().get(OUTPUT), -6.0);
        assert!(!handle.set("fuzz.grunt", 1.0));
        assert!(!handle.set("plexi.drive", 1.0));
        assert!(!handle.set("drive", 1.0));
    }

    #[test]
    fn switching_takes_effect_at_block_start() {
        let mut engine = Engine::new(&PipelineConfig::default());
        let handle = engine.handle();
        assert_eq!(engine.active_voice(), VoiceKind::Borealis);

        handle.select_voice(VoiceKind::Helios);
        assert_eq!(engine.active_voice(), VoiceKind::Borealis);
        let mut block = vec![0.0_f32; 64];
        engine.process_mono(&mut block);
        assert_eq!(engine.active_voice(), VoiceKind::Helios);
    }

    #[test]
    fn output_gain_scales_the_chain() {
        let render = |output_db: f32| {
            let mut engine = Engine::new(&PipelineConfig::default());
            engine.handle().engine().set(OUTPUT, output_db);
            engine.reset();
            let mut block: Vec<f32> = (0..4800)
                .map(|i| 0.2 * libm::sinf(core::f32::consts::TAU * 440.0 * i as f32 / 48000.0))
                .collect();
            for chunk in block.chunks_mut(512) {
                engine.process_mono(chunk);
            }
            block[2400..].iter().map(|s| s * s).sum::<f32>()
        };
        let ratio = render(0.0) / render(-20.0);
        assert!((ratio - 100.0).abs() < 1.0, "{ratio}");
    }

    #[test]
    fn bypassed_engine_leaves_the_buffer() {
        let mut engine = Engine::new(&PipelineConfig::default());
        engine.set_bypassed(true);
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut block = input.clone();
        engine.process_mono(&mut block);
        assert_eq!(block, input);
    }
}
