//! Germanium fuzz.
//!
//! Runs at 4x. The input is band-limited, gated, and pushed through a
//! resonant drive boost into a germanium diode pair, boosted again into an
//! op-amp clipper, then tamed by a mid peak (the tone control) and three
//! low-pass sections.
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | tone | 0–10 | 5 |
//! | 1 | sustain | 0–10 | 5 |
//! | 2 | mix | 0–1 | 1 |
//! | 3 | level | 0–3 | 1 |

use alloc::sync::Arc;

use ember_circuits::{DiodeClipper, OpAmpTanh, Stateful};
use ember_core::{
    Biquad, BiquadCoefficients, LinearSmoothedParam, OversamplingFactor, PipelineConfig, Stage,
    block_len, db_to_linear, drive_filter, highpass, lerp, lowpass, peaking, BUTTERWORTH_Q,
};

use crate::gate::NoiseGate;
use crate::params::{Controls, ParamSpec, ParamUnit};
use crate::voice::{Oversampled, WetPath};

/// Tone control index.
pub const TONE: usize = 0;
/// Sustain control index.
pub const SUSTAIN: usize = 1;
/// Mix control index.
pub const MIX: usize = 2;
/// Level control index.
pub const LEVEL: usize = 3;

/// Control table.
pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::knob("tone", 5.0),
    ParamSpec::knob("sustain", 5.0),
    ParamSpec::mix(),
    ParamSpec::new("level", ParamUnit::Factor, 0.0, 3.0, 1.0),
];

const OVERSAMPLING: OversamplingFactor = OversamplingFactor::X4;

const PRE_LPF_HZ: f32 = 1540.0;
const PRE_HPF_HZ: f32 = 25.0;
const GATE_THRESHOLD_DB: f32 = -40.0;
const DRIVE_HPF_HZ: f32 = 25.0;
const DRIVE_LPF_HZ: f32 = 3000.0;
const DRIVE_MIN_DB: f32 = 14.0;
const DRIVE_MAX_DB: f32 = 20.0;
const POST_GAIN_DB: f32 = -16.0;
const TONE_HZ: f32 = 800.0;
const TONE_Q: f32 = 0.707;
const TONE_MIN_DB: f32 = -12.0;
const POST_LPF_HZ: f32 = 3000.0;
const POST_LPF_Q: f32 = 0.67;

fn drive_coefficients(sustain: f32, sample_rate: f32) -> BiquadCoefficients {
    let gain = lerp(db_to_linear(DRIVE_MIN_DB), db_to_linear(DRIVE_MAX_DB), sustain * 0.1);
    drive_filter(sample_rate, DRIVE_HPF_HZ, DRIVE_LPF_HZ, gain)
}

fn tone_coefficients(tone: f32, sample_rate: f32) -> BiquadCoefficients {
    let gain = lerp(db_to_linear(TONE_MIN_DB), 1.0, tone * 0.1);
    peaking(TONE_HZ, TONE_Q, gain, sample_rate)
}

#[derive(Debug, Clone)]
struct FuzzPath {
    pre_lpf: Biquad,
    pre_hpf: Biquad,
    gate: NoiseGate,
    drive: Biquad,
    diode: Stateful<DiodeClipper>,
    boost: Biquad,
    opamp: OpAmpTanh,
    post_gain: f32,
    tone: Biquad,
    post: [Biquad; 3],
}

impl FuzzPath {
    fn new(sample_rate: f32, tone: f32, sustain: f32) -> Self {
        Self {
            pre_lpf: Biquad::with_coefficients(lowpass(PRE_LPF_HZ, BUTTERWORTH_Q, sample_rate)),
            pre_hpf: Biquad::with_coefficients(highpass(PRE_HPF_HZ, BUTTERWORTH_Q, sample_rate)),
            gate: NoiseGate::new(GATE_THRESHOLD_DB, sample_rate),
            drive: Biquad::with_coefficients(drive_coefficients(sustain, sample_rate)),
            diode: Stateful::new(DiodeClipper::germanium(sample_rate)),
            boost: Biquad::with_coefficients(drive_coefficients(0.0, sample_rate)),
            opamp: OpAmpTanh::new(),
            post_gain: db_to_linear(POST_GAIN_DB),
            tone: Biquad::with_coefficients(tone_coefficients(tone, sample_rate)),
            post: core::array::from_fn(|_| {
                Biquad::with_coefficients(lowpass(POST_LPF_HZ, POST_LPF_Q, sample_rate))
            }),
        }
    }
}

impl WetPath for FuzzPath {
    fn process(&mut self, block: &mut [f32], level: &[f32]) {
        for (sample, &l) in block.iter_mut().zip(level) {
            let mut x = self.pre_hpf.process(self.pre_lpf.process(*sample));
            x = self.gate.process(x);
            x = self.diode.process(self.drive.process(x));
            x = self.opamp.transfer(self.boost.process(x)) * self.post_gain;
            x = self.tone.process(x);
            for filter in &mut self.post {
                x = filter.process(x);
            }
            *sample = x * l;
        }
    }

    fn clear(&mut self) {
        self.pre_lpf.clear();
        self.pre_hpf.clear();
        self.gate.reset();
        self.drive.clear();
        self.diode.reset();
        self.boost.clear();
        self.tone.clear();
        for filter in &mut self.post {
            filter.clear();
        }
    }
}

/// Germanium fuzz voice.
///
/// # Example
///
/// ```rust
/// use ember_core::{PipelineConfig, Stage};
/// use ember_voices::{fuzz, Fuzz};
///
/// let mut fuzz = Fuzz::new(&PipelineConfig::default());
/// fuzz.controls().set(fuzz::SUSTAIN, 8.0);
///
/// let mut block = vec![0.0_f32; 256];
/// fuzz.process_mono(&mut block);
/// ```
#[derive(Debug, Clone)]
pub struct Fuzz {
    controls: Arc<Controls>,
    smoothed: [LinearSmoothedParam; 4],
    core: Oversampled<FuzzPath>,
}

impl Fuzz {
    /// Creates and prepares the voice.
    pub fn new(config: &PipelineConfig) -> Self {
        let controls = Arc::new(Controls::new(&PARAMS));
        let smoothed = controls.smoothers(config.sample_rate());
        let mut fuzz = Self {
            controls,
            smoothed,
            core: Oversampled::new(OVERSAMPLING),
        };
        fuzz.prepare(config);
        fuzz
    }

    /// Control block shared with the control thread.
    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    fn update_filters(&mut self, len: usize) {
        let rate = self.core.rate();
        if self.smoothed[TONE].is_smoothing() {
            let coefficients = tone_coefficients(self.smoothed[TONE].skip(len), rate);
            for path in self.core.paths_mut() {
                path.tone.set_coefficients(coefficients);
            }
        }
        if self.smoothed[SUSTAIN].is_smoothing() {
            let coefficients = drive_coefficients(self.smoothed[SUSTAIN].skip(len), rate);
            for path in self.core.paths_mut() {
                path.drive.set_coefficients(coefficients);
            }
        }
    }
}

impl Stage for Fuzz {
    fn prepare(&mut self, config: &PipelineConfig) {
        let rate = config.with_oversampling(OVERSAMPLING).oversampled_rate();
        self.smoothed = self.controls.smoothers(rate);
        let tone = self.smoothed[TONE].current();
        let sustain = self.smoothed[SUSTAIN].current();
        self.core.prepare(config, |rate| FuzzPath::new(rate, tone, sustain));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "fuzz_prepare: {} Hz x{}, {} channels",
            config.sample_rate(),
            self.core.ratio(),
            config.channels()
        );
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        self.core.reset();
        let rate = self.core.rate();
        let tone = tone_coefficients(self.smoothed[TONE].current(), rate);
        let drive = drive_coefficients(self.smoothed[SUSTAIN].current(), rate);
        for path in self.core.paths_mut() {
            path.tone.set_coefficients(tone);
            path.drive.set_coefficients(drive);
        }
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.controls.is_bypassed() || !self.core.is_prepared() {
            return;
        }
        self.controls.pull(&mut self.smoothed);

        let ratio = self.core.ratio();
        for range in self.core.chunks(block_len(channels)) {
            self.update_filters(range.len() * ratio);
            let [_, _, mix, level] = &mut self.smoothed;
            self.core.render(channels, range, mix, level);
        }
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.controls.set_bypassed(bypassed);
    }

    fn is_bypassed(&self) -> bool {
        self.controls.is_bypassed()
    }
}
