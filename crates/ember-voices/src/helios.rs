//! Diode and CMOS overdrive with an era control.
//!
//! Runs at 2x. A driven high-passed copy of the input is summed with a clean
//! low-passed copy, clipped by an asymmetric pair of silicon diodes and
//! squared up by a tabulated CMOS inverter. The era control sweeps a mid
//! scoop and a high shelf from a darker, scooped voicing (0) to a brighter,
//! flatter one (10).
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | drive | 0–10 | 5 |
//! | 1 | level | 0–10 | 5 |
//! | 2 | mix | 0–1 | 1 |
//! | 3 | era | 0–10 | 5 |

use alloc::sync::Arc;

use ember_circuits::{CmosLut, DiodeClipper, DiodePolarity, Stateful};
use ember_core::{
    BUTTERWORTH_Q, Biquad, BiquadCoefficients, LinearSmoothedParam, OversamplingFactor,
    PipelineConfig, Stage, block_len, db_to_linear, high_shelf, highpass, lowpass, peaking,
};

use crate::params::{Controls, ParamSpec};
use crate::voice::{Oversampled, WetPath};

/// Drive control index.
pub const DRIVE: usize = 0;
/// Level control index.
pub const LEVEL: usize = 1;
/// Mix control index.
pub const MIX: usize = 2;
/// Era control index.
pub const ERA: usize = 3;

/// Control table.
pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::knob("drive", 5.0),
    ParamSpec::knob("level", 5.0),
    ParamSpec::mix(),
    ParamSpec::knob("era", 5.0),
];

const OVERSAMPLING: OversamplingFactor = OversamplingFactor::X2;

const INPUT_PAD_DB: f32 = 12.0;
const INPUT_HPF_HZ: f32 = 70.0;
const INPUT_LPF_HZ: f32 = 1540.0;
const INPUT_LPF_Q: f32 = 1.5;
const SPLIT_HZ: f32 = 330.0;
const DRIVE_MAX_DB: f32 = 36.0;
const DC_HPF_HZ: f32 = 20.0;
const SHELF_HZ: f32 = 500.0;
const SHELF_Q: f32 = 0.7;
const POST_LPF1_HZ: f32 = 10730.0;
const POST_LPF1_Q: f32 = 1.0;
const POST_LPF2_HZ: f32 = 2287.0;
const POST_LPF2_Q: f32 = 0.67;
const OUTPUT_DB: f32 = -12.0;
const LEVEL_SCALE: f32 = 0.2;

/// Linear gain of the driven branch: cubic taper up to +36 dB.
fn drive_gain(drive: f32) -> f32 {
    let t = (drive * 0.1).clamp(0.0, 1.0);
    1.0 + t * t * t * (db_to_linear(DRIVE_MAX_DB) - 1.0)
}

/// Mid scoop and high shelf for an era position.
fn era_coefficients(era: f32, sample_rate: f32) -> (BiquadCoefficients, BiquadCoefficients) {
    let e = (era * 0.1).clamp(0.0, 1.0);
    let scoop = peaking(
        1200.0 - 500.0 * e,
        0.5 + 0.5 * e,
        db_to_linear(-4.0 - 4.0 * e),
        sample_rate,
    );
    let shelf = high_shelf(SHELF_HZ, SHELF_Q, db_to_linear(-18.0 + 10.0 * e), sample_rate);
    (scoop, shelf)
}

#[derive(Debug, Clone)]
struct HeliosPath {
    pad: f32,
    input_hpf: Biquad,
    input_lpf: Biquad,
    gain: f32,
    driven: Biquad,
    clean: Biquad,
    positive: Stateful<DiodeClipper>,
    negative: Stateful<DiodeClipper>,
    cmos: CmosLut,
    dc_block: Biquad,
    scoop: Biquad,
    shelf: Biquad,
    post: [Biquad; 2],
    output: f32,
}

impl HeliosPath {
    fn new(sample_rate: f32, cmos: CmosLut, drive: f32, era: f32) -> Self {
        let (scoop, shelf) = era_coefficients(era, sample_rate);
        Self {
            pad: db_to_linear(INPUT_PAD_DB),
            input_hpf: Biquad::with_coefficients(highpass(
                INPUT_HPF_HZ,
                BUTTERWORTH_Q,
                sample_rate,
            )),
            input_lpf: Biquad::with_coefficients(lowpass(INPUT_LPF_HZ, INPUT_LPF_Q, sample_rate)),
            gain: drive_gain(drive),
            driven: Biquad::with_coefficients(highpass(SPLIT_HZ, BUTTERWORTH_Q, sample_rate)),
            clean: Biquad::with_coefficients(lowpass(SPLIT_HZ, BUTTERWORTH_Q, sample_rate)),
            positive: Stateful::new(DiodeClipper::silicon(sample_rate, DiodePolarity::Positive)),
            negative: Stateful::new(DiodeClipper::silicon(sample_rate, DiodePolarity::Negative)),
            cmos,
            dc_block: Biquad::with_coefficients(highpass(DC_HPF_HZ, BUTTERWORTH_Q, sample_rate)),
            scoop: Biquad::with_coefficients(scoop),
            shelf: Biquad::with_coefficients(shelf),
            post: [
                Biquad::with_coefficients(lowpass(POST_LPF1_HZ, POST_LPF1_Q, sample_rate)),
                Biquad::with_coefficients(lowpass(POST_LPF2_HZ, POST_LPF2_Q, sample_rate)),
            ],
            output: db_to_linear(OUTPUT_DB) * LEVEL_SCALE,
        }
    }
}

impl WetPath for HeliosPath {
    fn process(&mut self, block: &mut [f32], level: &[f32]) {
        for (sample, &l) in block.iter_mut().zip(level) {
            let mut x = self.input_lpf.process(self.input_hpf.process(*sample * self.pad));
            x = self.driven.process(self.gain * x) + self.clean.process(x);

            x = 0.5 * (self.positive.process(x) + x);
            x = self.negative.process(x);
            x = self.dc_block.process(self.cmos.transfer(x));

            x = self.shelf.process(self.scoop.process(x));
            for filter in &mut self.post {
                x = filter.process(x);
            }
            *sample = x * self.output * l;
        }
    }

    fn clear(&mut self) {
        self.input_hpf.clear();
        self.input_lpf.clear();
        self.driven.clear();
        self.clean.clear();
        self.positive.reset();
        self.negative.reset();
        self.dc_block.clear();
        self.scoop.clear();
        self.shelf.clear();
        for filter in &mut self.post {
            filter.clear();
        }
    }
}

/// Diode/CMOS overdrive voice.
#[derive(Debug, Clone)]
pub struct Helios {
    controls: Arc<Controls>,
    smoothed: [LinearSmoothedParam; 4],
    core: Oversampled<HeliosPath>,
    cmos: CmosLut,
}

impl Helios {
    /// Creates and prepares the voice. Builds the inverter table once.
    pub fn new(config: &PipelineConfig) -> Self {
        let controls = Arc::new(Controls::new(&PARAMS));
        let smoothed = controls.smoothers(config.sample_rate());
        let mut voice = Self {
            controls,
            smoothed,
            core: Oversampled::new(OVERSAMPLING),
            cmos: CmosLut::new(),
        };
        voice.prepare(config);
        voice
    }

    /// Control block shared with the control thread.
    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    fn update_filters(&mut self, len: usize) {
        let rate = self.core.rate();
        if self.smoothed[DRIVE].is_smoothing() {
            let gain = drive_gain(self.smoothed[DRIVE].skip(len));
            for path in self.core.paths_mut() {
                path.gain = gain;
            }
        }
        if self.smoothed[ERA].is_smoothing() {
            let (scoop, shelf) = era_coefficients(self.smoothed[ERA].skip(len), rate);
            for path in self.core.paths_mut() {
                path.scoop.set_coefficients(scoop);
                path.shelf.set_coefficients(shelf);
            }
        }
    }
}

impl Stage for Helios {
    fn prepare(&mut self, config: &PipelineConfig) {
        let rate = config.with_oversampling(OVERSAMPLING).oversampled_rate();
        self.smoothed = self.controls.smoothers(rate);
        let drive = self.smoothed[DRIVE].current();
        let era = self.smoothed[ERA].current();
        let cmos = &self.cmos;
        self.core
            .prepare(config, |rate| HeliosPath::new(rate, cmos.clone(), drive, era));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "helios_prepare: {} Hz x{}, {} channels",
            config.sample_rate(),
            self.core.ratio(),
            config.channels()
        );
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        self.core.reset();
        let rate = self.core.rate();
        let gain = drive_gain(self.smoothed[DRIVE].current());
        let (scoop, shelf) = era_coefficients(self.smoothed[ERA].current(), rate);
        for path in self.core.paths_mut() {
            path.gain = gain;
            path.scoop.set_coefficients(scoop);
            path.shelf.set_coefficients(shelf);
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
            let [_, level, mix, _] = &mut self.smoothed;
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
