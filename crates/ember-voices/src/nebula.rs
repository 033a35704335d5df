//! Triode preamp into an op-amp knee.
//!
//! Runs at 2x. The padded input drives a wave-digital triode stage, a
//! resonant drive boost, an attack shelf and a rail-knee op-amp, then a
//! fixed voicing (high-pass, 300 Hz scoop, low-pass). A band-passed copy of
//! the clean input is fed forward around the tube and grows with drive.
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | drive | 0–10 | 5 |
//! | 1 | level | 0–10 | 5 |
//! | 2 | mix | 0–1 | 1 |
//! | 3 | attack | 0–10 | 5 |

use alloc::sync::Arc;

use ember_circuits::{OpAmpKnee, Stateful, Triode};
use ember_core::{
    BUTTERWORTH_Q, Biquad, BiquadCoefficients, LinearSmoothedParam, OversamplingFactor,
    PipelineConfig, Stage, block_len, db_to_linear, drive_filter, high_shelf, highpass, knob,
    lowpass, peaking,
};

use crate::params::{Controls, ParamSpec};
use crate::voice::{Oversampled, WetPath};

/// Drive control index.
pub const DRIVE: usize = 0;
/// Level control index.
pub const LEVEL: usize = 1;
/// Mix control index.
pub const MIX: usize = 2;
/// Attack control index.
pub const ATTACK: usize = 3;

/// Control table.
pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::knob("drive", 5.0),
    ParamSpec::knob("level", 5.0),
    ParamSpec::mix(),
    ParamSpec::knob("attack", 5.0),
];

const OVERSAMPLING: OversamplingFactor = OversamplingFactor::X2;

const INPUT_PAD_DB: f32 = 12.0;
const FEED_LPF_HZ: f32 = 666.0;
const FEED_HPF_HZ: f32 = 177.0;
const FEED_DRIVE_SCALE: f32 = 0.1;
const TUBE_HPF_HZ: f32 = 50.0;
const DRIVE_HPF_HZ: f32 = 177.0;
const DRIVE_LPF_HZ: f32 = 3300.0;
const DRIVE_MAX_DB: f32 = 36.0;
const ATTACK_HZ: f32 = 1200.0;
const ATTACK_Q: f32 = 0.7;
const ATTACK_RANGE_DB: f32 = 12.0;
const POST_HPF_HZ: f32 = 106.0;
const SCOOP_HZ: f32 = 300.0;
const SCOOP_Q: f32 = 0.707;
const SCOOP_DB: f32 = -15.0;
const POST_LPF_HZ: f32 = 3300.0;
const OUTPUT_DB: f32 = -12.0;
const LEVEL_SCALE: f32 = 0.2;

fn drive_coefficients(drive: f32, sample_rate: f32) -> BiquadCoefficients {
    let gain = db_to_linear(knob(drive, 0.0, DRIVE_MAX_DB));
    drive_filter(sample_rate, DRIVE_HPF_HZ, DRIVE_LPF_HZ, gain)
}

fn attack_coefficients(attack: f32, sample_rate: f32) -> BiquadCoefficients {
    let gain = db_to_linear(knob(attack, -ATTACK_RANGE_DB, ATTACK_RANGE_DB));
    high_shelf(ATTACK_HZ, ATTACK_Q, gain, sample_rate)
}

#[derive(Debug, Clone)]
struct NebulaPath {
    pad: f32,
    feed_lpf: Biquad,
    feed_hpf: Biquad,
    feed_amount: f32,
    tube_hpf: Biquad,
    tube: Stateful<Triode>,
    drive: Biquad,
    attack: Biquad,
    opamp: OpAmpKnee,
    post_hpf: Biquad,
    scoop: Biquad,
    post_lpf: Biquad,
    output: f32,
}

impl NebulaPath {
    fn new(sample_rate: f32, drive: f32, attack: f32) -> Self {
        Self {
            pad: db_to_linear(INPUT_PAD_DB),
            feed_lpf: Biquad::with_coefficients(lowpass(FEED_LPF_HZ, BUTTERWORTH_Q, sample_rate)),
            feed_hpf: Biquad::with_coefficients(highpass(FEED_HPF_HZ, BUTTERWORTH_Q, sample_rate)),
            feed_amount: FEED_DRIVE_SCALE * drive,
            tube_hpf: Biquad::with_coefficients(highpass(TUBE_HPF_HZ, BUTTERWORTH_Q, sample_rate)),
            tube: Stateful::new(Triode::new(sample_rate)),
            drive: Biquad::with_coefficients(drive_coefficients(drive, sample_rate)),
            attack: Biquad::with_coefficients(attack_coefficients(attack, sample_rate)),
            opamp: OpAmpKnee::new(),
            post_hpf: Biquad::with_coefficients(highpass(POST_HPF_HZ, BUTTERWORTH_Q, sample_rate)),
            scoop: Biquad::with_coefficients(peaking(
                SCOOP_HZ,
                SCOOP_Q,
                db_to_linear(SCOOP_DB),
                sample_rate,
            )),
            post_lpf: Biquad::with_coefficients(lowpass(POST_LPF_HZ, BUTTERWORTH_Q, sample_rate)),
            output: db_to_linear(OUTPUT_DB) * LEVEL_SCALE,
        }
    }
}

impl WetPath for NebulaPath {
    fn process(&mut self, block: &mut [f32], level: &[f32]) {
        for (sample, &l) in block.iter_mut().zip(level) {
            let x = *sample * self.pad;
            let feed = self.feed_hpf.process(self.feed_lpf.process(x));

            let mut main = self.tube.process(self.tube_hpf.process(x));
            main = self.attack.process(self.drive.process(main));
            main = self.opamp.transfer(main);
            main = self.post_lpf.process(self.scoop.process(self.post_hpf.process(main)));

            *sample = (main + feed * (1.0 + self.feed_amount)) * self.output * l;
        }
    }

    fn clear(&mut self) {
        self.feed_lpf.clear();
        self.feed_hpf.clear();
        self.tube_hpf.clear();
        self.tube.reset();
        self.drive.clear();
        self.attack.clear();
        self.post_hpf.clear();
        self.scoop.clear();
        self.post_lpf.clear();
    }
}

/// Triode preamp voice.
#[derive(Debug, Clone)]
pub struct Nebula {
    controls: Arc<Controls>,
    smoothed: [LinearSmoothedParam; 4],
    core: Oversampled<NebulaPath>,
}

impl Nebula {
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

    fn apply_drive(&mut self, drive: f32) {
        let coefficients = drive_coefficients(drive, self.core.rate());
        for path in self.core.paths_mut() {
            path.drive.set_coefficients(coefficients);
            path.feed_amount = FEED_DRIVE_SCALE * drive;
        }
    }

    fn apply_attack(&mut self, attack: f32) {
        let coefficients = attack_coefficients(attack, self.core.rate());
        for path in self.core.paths_mut() {
            path.attack.set_coefficients(coefficients);
        }
    }
}

impl Stage for Nebula {
    fn prepare(&mut self, config: &PipelineConfig) {
        let rate = config.with_oversampling(OVERSAMPLING).oversampled_rate();
        self.smoothed = self.controls.smoothers(rate);
        let drive = self.smoothed[DRIVE].current();
        let attack = self.smoothed[ATTACK].current();
        self.core.prepare(config, |rate| NebulaPath::new(rate, drive, attack));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "nebula_prepare: {} Hz x{}, {} channels",
            config.sample_rate(),
            self.core.ratio(),
            config.channels()
        );
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        self.core.reset();
        self.apply_drive(self.smoothed[DRIVE].current());
        self.apply_attack(self.smoothed[ATTACK].current());
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.controls.is_bypassed() || !self.core.is_prepared() {
            return;
        }
        self.controls.pull(&mut self.smoothed);

        let ratio = self.core.ratio();
        for range in self.core.chunks(block_len(channels)) {
            let len = range.len() * ratio;
            if self.smoothed[DRIVE].is_smoothing() {
                let drive = self.smoothed[DRIVE].skip(len);
                self.apply_drive(drive);
            }
            if self.smoothed[ATTACK].is_smoothing() {
                let attack = self.smoothed[ATTACK].skip(len);
                self.apply_attack(attack);
            }
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
