//! Split-band BJT/CMOS overdrive.
//!
//! Runs at 2x. A clean low band, shaped by the bass control, is summed with
//! a high band that is boosted through a resonant drive filter into an
//! emitter follower and a CMOS inverter. The level control scales only the
//! driven band.
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | drive | 0–10 | 5 |
//! | 1 | level | 0–10 | 5 |
//! | 2 | mix | 0–1 | 1 |
//! | 3 | crossover | 100–2000 Hz | 700 |
//! | 4 | bass | 50–1000 Hz | 330 |

use alloc::sync::Arc;

use ember_circuits::{BjtFollower, CmosApprox};
use ember_core::{
    BUTTERWORTH_Q, Biquad, BiquadCoefficients, LinearSmoothedParam, OversamplingFactor,
    PipelineConfig, Stage, block_len, db_to_linear, drive_filter, highpass, knob, lowpass,
};

use crate::params::{Controls, ParamSpec, ParamUnit};
use crate::voice::{Oversampled, WetPath};

/// Drive control index.
pub const DRIVE: usize = 0;
/// Level control index.
pub const LEVEL: usize = 1;
/// Mix control index.
pub const MIX: usize = 2;
/// Crossover control index.
pub const CROSSOVER: usize = 3;
/// Bass control index.
pub const BASS: usize = 4;

/// Control table.
pub static PARAMS: [ParamSpec; 5] = [
    ParamSpec::knob("drive", 5.0),
    ParamSpec::knob("level", 5.0),
    ParamSpec::mix(),
    ParamSpec::new("crossover", ParamUnit::Hertz, 100.0, 2000.0, 700.0),
    ParamSpec::new("bass", ParamUnit::Hertz, 50.0, 1000.0, 330.0),
];

const OVERSAMPLING: OversamplingFactor = OversamplingFactor::X2;

const LOW_HPF_HZ: f32 = 50.0;
const HIGH_LPF_HZ: f32 = 3300.0;
const DRIVE_HPF_HZ: f32 = 209.0;
const DRIVE_LPF_HZ: f32 = 3200.0;
const DRIVE_MAX_DB: f32 = 40.0;
const POST_LPF_HZ: f32 = 3300.0;
const LEVEL_SCALE: f32 = 0.2;

fn drive_coefficients(drive: f32, sample_rate: f32) -> BiquadCoefficients {
    let gain = db_to_linear(knob(drive, 0.0, DRIVE_MAX_DB));
    drive_filter(sample_rate, DRIVE_HPF_HZ, DRIVE_LPF_HZ, gain)
}

#[derive(Debug, Clone)]
struct BorealisPath {
    low_hpf: Biquad,
    bass: Biquad,
    high_lpf: Biquad,
    crossover: Biquad,
    drive: Biquad,
    bjt: BjtFollower,
    bjt_rest: f32,
    cmos: CmosApprox,
    post: [Biquad; 2],
}

impl BorealisPath {
    fn new(sample_rate: f32, drive: f32, crossover: f32, bass: f32) -> Self {
        let bjt = BjtFollower::new();
        Self {
            low_hpf: Biquad::with_coefficients(highpass(LOW_HPF_HZ, BUTTERWORTH_Q, sample_rate)),
            bass: Biquad::with_coefficients(lowpass(bass, BUTTERWORTH_Q, sample_rate)),
            high_lpf: Biquad::with_coefficients(lowpass(HIGH_LPF_HZ, BUTTERWORTH_Q, sample_rate)),
            crossover: Biquad::with_coefficients(highpass(crossover, BUTTERWORTH_Q, sample_rate)),
            drive: Biquad::with_coefficients(drive_coefficients(drive, sample_rate)),
            bjt_rest: bjt.transfer(0.0),
            bjt,
            cmos: CmosApprox::new(),
            post: core::array::from_fn(|_| {
                Biquad::with_coefficients(lowpass(POST_LPF_HZ, BUTTERWORTH_Q, sample_rate))
            }),
        }
    }
}

impl WetPath for BorealisPath {
    fn process(&mut self, block: &mut [f32], level: &[f32]) {
        for (sample, &l) in block.iter_mut().zip(level) {
            let x = *sample;
            let low = self.bass.process(self.low_hpf.process(x));

            let mut high = self.crossover.process(self.high_lpf.process(x));
            high = self.drive.process(high);
            high = self.bjt.transfer(high) - self.bjt_rest;
            high = self.cmos.transfer(high);
            for filter in &mut self.post {
                high = filter.process(high);
            }

            *sample = low + l * LEVEL_SCALE * high;
        }
    }

    fn clear(&mut self) {
        self.low_hpf.clear();
        self.bass.clear();
        self.high_lpf.clear();
        self.crossover.clear();
        self.drive.clear();
        for filter in &mut self.post {
            filter.clear();
        }
    }
}

/// Split-band overdrive voice.
#[derive(Debug, Clone)]
pub struct Borealis {
    controls: Arc<Controls>,
    smoothed: [LinearSmoothedParam; 5],
    core: Oversampled<BorealisPath>,
}

impl Borealis {
    /// Creates and prepares the voice.
    pub fn new(config: &PipelineConfig) -> Self {
        let controls = Arc::new(Controls::new(&PARAMS));
        let smoothed = controls.smoothers(config.sample_rate());
        let mut voice = Self {
            controls,
            smoothed,
            core: Oversampled::new(OVERSAMPLING),
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
            let coefficients = drive_coefficients(self.smoothed[DRIVE].skip(len), rate);
            for path in self.core.paths_mut() {
                path.drive.set_coefficients(coefficients);
            }
        }
        if self.smoothed[CROSSOVER].is_smoothing() {
            let coefficients = highpass(self.smoothed[CROSSOVER].skip(len), BUTTERWORTH_Q, rate);
            for path in self.core.paths_mut() {
                path.crossover.set_coefficients(coefficients);
            }
        }
        if self.smoothed[BASS].is_smoothing() {
            let coefficients = lowpass(self.smoothed[BASS].skip(len), BUTTERWORTH_Q, rate);
            for path in self.core.paths_mut() {
                path.bass.set_coefficients(coefficients);
            }
        }
    }

    fn redesign(&mut self) {
        let rate = self.core.rate();
        let drive = drive_coefficients(self.smoothed[DRIVE].current(), rate);
        let crossover = highpass(self.smoothed[CROSSOVER].current(), BUTTERWORTH_Q, rate);
        let bass = lowpass(self.smoothed[BASS].current(), BUTTERWORTH_Q, rate);
        for path in self.core.paths_mut() {
            path.drive.set_coefficients(drive);
            path.crossover.set_coefficients(crossover);
            path.bass.set_coefficients(bass);
        }
    }
}

impl Stage for Borealis {
    fn prepare(&mut self, config: &PipelineConfig) {
        let rate = config.with_oversampling(OVERSAMPLING).oversampled_rate();
        self.smoothed = self.controls.smoothers(rate);
        let drive = self.smoothed[DRIVE].current();
        let crossover = self.smoothed[CROSSOVER].current();
        let bass = self.smoothed[BASS].current();
        self.core
            .prepare(config, |rate| BorealisPath::new(rate, drive, crossover, bass));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "borealis_prepare: {} Hz x{}, {} channels",
            config.sample_rate(),
            self.core.ratio(),
            config.channels()
        );
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        self.core.reset();
        self.redesign();
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.controls.is_bypassed() || !self.core.is_prepared() {
            return;
        }
        self.controls.pull(&mut self.smoothed);

        let ratio = self.core.ratio();
        for range in self.core.chunks(block_len(channels)) {
            self.update_filters(range.len() * ratio);
            let [_, level, mix, _, _] = &mut self.smoothed;
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

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn sine(freq: f32, amplitude: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * libm::sinf(core::f32::consts::TAU * freq * i as f32 / 48000.0))
            .collect()
    }

    fn energy(block: &[f32]) -> f32 {
        block.iter().map(|s| s * s).sum()
    }

    #[test]
    fn silence_stays_quiet() {
        let mut voice = Borealis::new(&PipelineConfig::default());
        let mut block = vec![0.0_f32; 512];
        for _ in 0..10 {
            block.fill(0.0);
            voice.process_mono(&mut block);
        }
        // The inverter's closed form rests a few 1e-4 off zero.
        assert!(block.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn zero_level_leaves_only_the_low_band() {
        let mut voice = Borealis::new(&PipelineConfig::default());
        voice.controls().set(LEVEL, 0.0);
        voice.reset();
        let mut block = sine(3000.0, 0.5, 9600);
        for chunk in block.chunks_mut(512) {
            voice.process_mono(chunk);
        }
        // 3 kHz sits far above the 330 Hz bass corner.
        let peak = block[4800..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak < 0.05, "{peak}");
    }

    #[test]
    fn drive_raises_high_band_output() {
        let render = |drive: f32| {
            let mut voice = Borealis::new(&PipelineConfig::default());
            voice.controls().set(DRIVE, drive);
            voice.reset();
            let mut block = sine(1500.0, 0.01, 9600);
            for chunk in block.chunks_mut(512) {
                voice.process_mono(chunk);
            }
            energy(&block[4800..])
        };
        assert!(render(10.0) > render(0.0));
    }

    #[test]
    fn output_is_bounded_under_heavy_drive() {
        let mut voice = Borealis::new(&PipelineConfig::default());
        voice.controls().set(DRIVE, 10.0);
        voice.controls().set(LEVEL, 10.0);
        let mut block = sine(440.0, 1.0, 9600);
        for chunk in block.chunks_mut(512) {
            voice.process_mono(chunk);
        }
        assert!(block.iter().all(|s| s.is_finite() && s.abs() < 8.0));
    }
}
