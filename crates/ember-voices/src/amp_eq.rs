//! Four-band amp tone stack: bass shelf, two mid peaks, treble shelf.
//!
//! Gains are smoothed in dB. While a gain ramps, its section is redesigned
//! once per block from the value reached at the end of that block.
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | bass | ±12 dB | 0 |
//! | 1 | low_mid | ±12 dB | 0 |
//! | 2 | high_mid | ±12 dB | 0 |
//! | 3 | treble | ±12 dB | 0 |

use alloc::sync::Arc;
use alloc::vec::Vec;

use ember_core::{
    Biquad, BiquadCoefficients, LinearSmoothedParam, PipelineConfig, Stage, block_len,
    db_to_linear, high_shelf, low_shelf, peaking,
};

use crate::params::{Controls, ParamSpec, ParamUnit};

/// Bass control index.
pub const BASS: usize = 0;
/// Low-mid control index.
pub const LOW_MID: usize = 1;
/// High-mid control index.
pub const HIGH_MID: usize = 2;
/// Treble control index.
pub const TREBLE: usize = 3;

/// Control table.
pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::new("bass", ParamUnit::Decibels, -12.0, 12.0, 0.0),
    ParamSpec::new("low_mid", ParamUnit::Decibels, -12.0, 12.0, 0.0),
    ParamSpec::new("high_mid", ParamUnit::Decibels, -12.0, 12.0, 0.0),
    ParamSpec::new("treble", ParamUnit::Decibels, -12.0, 12.0, 0.0),
];

const Q: f32 = 0.707;
const BASS_HZ: f32 = 100.0;
const LOW_MID_HZ: f32 = 500.0;
const HIGH_MID_HZ: f32 = 1500.0;
const TREBLE_HZ: f32 = 5000.0;

fn band_coefficients(band: usize, gain_db: f32, sample_rate: f32) -> BiquadCoefficients {
    let gain = db_to_linear(gain_db);
    match band {
        BASS => low_shelf(BASS_HZ, Q, gain, sample_rate),
        LOW_MID => peaking(LOW_MID_HZ, Q, gain, sample_rate),
        HIGH_MID => peaking(HIGH_MID_HZ, Q, gain, sample_rate),
        _ => high_shelf(TREBLE_HZ, Q, gain, sample_rate),
    }
}

/// Tone stack stage.
#[derive(Debug, Clone)]
pub struct AmpEq {
    controls: Arc<Controls>,
    smoothed: [LinearSmoothedParam; 4],
    sections: Vec<[Biquad; 4]>,
    sample_rate: f32,
}

impl AmpEq {
    /// Creates and prepares the stage.
    pub fn new(config: &PipelineConfig) -> Self {
        let controls = Arc::new(Controls::new(&PARAMS));
        let smoothed = controls.smoothers(config.sample_rate());
        let mut eq = Self {
            controls,
            smoothed,
            sections: Vec::new(),
            sample_rate: config.sample_rate(),
        };
        eq.prepare(config);
        eq
    }

    /// Control block shared with the control thread.
    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    fn design(&mut self, band: usize, gain_db: f32) {
        let coefficients = band_coefficients(band, gain_db, self.sample_rate);
        for sections in &mut self.sections {
            sections[band].set_coefficients(coefficients);
        }
    }

    fn design_all(&mut self) {
        for band in 0..PARAMS.len() {
            self.design(band, self.smoothed[band].current());
        }
    }
}

impl Stage for AmpEq {
    fn prepare(&mut self, config: &PipelineConfig) {
        self.sample_rate = config.sample_rate();
        self.smoothed = self.controls.smoothers(self.sample_rate);
        self.sections = (0..config.channels()).map(|_| Default::default()).collect();
        self.design_all();

        #[cfg(feature = "tracing")]
        tracing::debug!("amp_eq_prepare: {} Hz, {} channels", self.sample_rate, config.channels());
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        for sections in &mut self.sections {
            for section in sections.iter_mut() {
                section.clear();
            }
        }
        self.design_all();
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.controls.is_bypassed() {
            return;
        }
        self.controls.pull(&mut self.smoothed);

        let len = block_len(channels);
        for band in 0..PARAMS.len() {
            if self.smoothed[band].is_smoothing() {
                let gain_db = self.smoothed[band].skip(len);
                self.design(band, gain_db);
            }
        }

        for (sections, channel) in self.sections.iter_mut().zip(channels.iter_mut()) {
            for sample in channel.iter_mut() {
                let mut x = *sample;
                for section in sections.iter_mut() {
                    x = section.process(x);
                }
                *sample = x;
            }
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
    use alloc::vec::Vec;

    fn tone_gain(eq: &mut AmpEq, freq: f32) -> f32 {
        let input: Vec<f32> = (0..9600)
            .map(|i| libm::sinf(core::f32::consts::TAU * freq * i as f32 / 48000.0))
            .collect();
        let mut block = input.clone();
        for chunk in block.chunks_mut(512) {
            eq.process_mono(chunk);
        }
        let peak = block[4800..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        20.0 * libm::log10f(peak)
    }

    #[test]
    fn flat_by_default() {
        let mut eq = AmpEq::new(&PipelineConfig::default());
        for freq in [60.0, 500.0, 1500.0, 6000.0] {
            let gain = tone_gain(&mut eq, freq);
            assert!(gain.abs() < 0.05, "{freq} Hz: {gain} dB");
        }
    }

    #[test]
    fn bands_boost_where_they_should() {
        let mut eq = AmpEq::new(&PipelineConfig::default());
        eq.controls().set(LOW_MID, 12.0);
        eq.reset();
        let at_band = tone_gain(&mut eq, 500.0);
        assert!((at_band - 12.0).abs() < 0.3, "{at_band}");

        let mut eq = AmpEq::new(&PipelineConfig::default());
        eq.controls().set(TREBLE, -12.0);
        eq.reset();
        let top = tone_gain(&mut eq, 15000.0);
        assert!(top < -10.0, "{top}");
    }

    #[test]
    fn ramps_reach_the_target() {
        let mut eq = AmpEq::new(&PipelineConfig::default());
        eq.controls().set(BASS, 6.0);
        let mut block = [0.0_f32; 512];
        for _ in 0..10 {
            eq.process_mono(&mut block);
        }
        assert!(!eq.smoothed[BASS].is_smoothing());
        let expected = band_coefficients(BASS, 6.0, 48000.0);
        assert_eq!(eq.sections[0][BASS].coefficients(), expected);
    }

    #[test]
    fn clamps_out_of_range_gains() {
        let eq = AmpEq::new(&PipelineConfig::default());
        eq.controls().set(HIGH_MID, 40.0);
        assert_eq!(eq.controls().get(HIGH_MID), 12.0);
    }
}
