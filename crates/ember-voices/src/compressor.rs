//! Three-law compressor: opto, FET and VCA.
//!
//! The three laws share the control set and the output stage
//! `dry·(1 - mix) + wet·mix·level` but differ in how they detect level:
//!
//! - **Opto** follows the instantaneous input level. The gain moves with a
//!   fast attack and a two-stage release (quick while the signal is still
//!   above threshold, slow once it has fallen below).
//! - **FET** is a feedback design: it detects on its own output, held by a
//!   slowly decaying peak, with a 0.3 ms attack. The compressed signal is
//!   coloured by a JFET curve in proportion to the gain reduction.
//! - **VCA** detects the RMS of a 64-sample window, applies the gain with
//!   no further smoothing and rounds the threshold with a 6 dB knee.
//!
//! The detector state is per channel. The deepest reduction seen in each
//! block is published for metering through [`CompressorLink`].
//!
//! ## Controls
//!
//! | Index | Name | Range | Default |
//! |-------|------|-------|---------|
//! | 0 | threshold | -60–6 dB | -20 |
//! | 1 | ratio | 1–20 | 4 |
//! | 2 | mix | 0–1 | 1 |
//! | 3 | level | 0–10 | 1 |

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};

use ember_circuits::Jfet;
use ember_core::{
    AtomicParam, LinearSmoothedParam, PipelineConfig, Stage, block_len, db_to_linear,
    linear_to_db,
};
use libm::{expf, logf, sqrtf};

use crate::params::{Controls, ParamSpec, ParamUnit};

/// Threshold control index.
pub const THRESHOLD: usize = 0;
/// Ratio control index.
pub const RATIO: usize = 1;
/// Mix control index.
pub const MIX: usize = 2;
/// Level control index.
pub const LEVEL: usize = 3;

/// Control table.
pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::new("threshold", ParamUnit::Decibels, -60.0, 6.0, -20.0),
    ParamSpec::new("ratio", ParamUnit::Ratio, 1.0, 20.0, 4.0),
    ParamSpec::mix(),
    ParamSpec::new("level", ParamUnit::Factor, 0.0, 10.0, 1.0),
];

const DETECTOR_FLOOR: f32 = 1e-10;
const SILENCE_DB: f32 = -120.0;

const OPTO_ATTACK: f32 = 0.01;
const OPTO_RELEASE_ABOVE: f32 = 0.06;
const OPTO_RELEASE_BELOW: f32 = 0.5;

const FET_ATTACK: f32 = 0.0003;
const FET_RELEASE: f32 = 0.1;
const FET_HOLD: f32 = 0.99;
const FET_COLOUR_RANGE_DB: f32 = 24.0;
const FET_COLOUR_DEPTH: f32 = 0.5;

const VCA_WINDOW: usize = 64;
const VCA_ATTACK: f32 = 0.005;
const VCA_RELEASE: f32 = 0.05;
const VCA_KNEE_DB: f32 = 6.0;

/// Detector law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressorKind {
    /// Optical cell.
    #[default]
    Opto,
    /// Feedback FET.
    Fet,
    /// RMS-detecting VCA.
    Vca,
}

impl CompressorKind {
    /// Every law, in selection order.
    pub const ALL: [Self; 3] = [Self::Opto, Self::Fet, Self::Vca];

    /// Lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Opto => "opto",
            Self::Fet => "fet",
            Self::Vca => "vca",
        }
    }

    /// Selection index.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }
}

impl fmt::Display for CompressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised compressor name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCompressorKindError(pub alloc::string::String);

impl fmt::Display for ParseCompressorKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown compressor '{}'", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseCompressorKindError {}

impl FromStr for CompressorKind {
    type Err = ParseCompressorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCompressorKindError(s.into()))
    }
}

/// Law selection and gain-reduction meter, shared with the control thread.
#[derive(Debug, Default)]
pub struct CompressorLink {
    kind: AtomicU8,
    gain_reduction: AtomicParam,
}

impl CompressorLink {
    /// Publishes a new law. The audio side switches at the next block.
    pub fn select(&self, kind: CompressorKind) {
        self.kind.store(kind.index(), Ordering::Relaxed);
    }

    /// Last published law.
    pub fn kind(&self) -> CompressorKind {
        CompressorKind::from_index(self.kind.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Deepest gain reduction of the last processed block, in dB (≤ 0).
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction.load()
    }
}

/// `ln(0.01)`-style coefficient: the detector covers 99% of a step in `seconds`.
fn settle_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    expf(logf(0.01) / (sample_rate * seconds))
}

/// Classic one-pole coefficient with time constant `seconds`.
fn time_constant_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    expf(-1.0 / (sample_rate * seconds))
}

#[derive(Debug, Clone, Copy)]
struct Coefficients {
    opto_attack: f32,
    opto_release_above: f32,
    opto_release_below: f32,
    fet_attack: f32,
    fet_release: f32,
    vca_attack: f32,
    vca_release: f32,
}

impl Coefficients {
    fn new(sample_rate: f32) -> Self {
        Self {
            opto_attack: settle_coefficient(OPTO_ATTACK, sample_rate),
            opto_release_above: settle_coefficient(OPTO_RELEASE_ABOVE, sample_rate),
            opto_release_below: settle_coefficient(OPTO_RELEASE_BELOW, sample_rate),
            fet_attack: time_constant_coefficient(FET_ATTACK, sample_rate),
            fet_release: time_constant_coefficient(FET_RELEASE, sample_rate),
            vca_attack: settle_coefficient(VCA_ATTACK, sample_rate),
            vca_release: settle_coefficient(VCA_RELEASE, sample_rate),
        }
    }
}

/// JFET colouring normalised to unit small-signal gain.
#[derive(Debug, Clone, Copy)]
struct Colour {
    jfet: Jfet,
    inverse_slope: f32,
}

impl Colour {
    fn new() -> Self {
        let jfet = Jfet::new(0.5, 0.15).with_scales(1.0, 0.9);
        let probe = 1e-3;
        Self {
            jfet,
            inverse_slope: probe / jfet.transfer(probe),
        }
    }

    #[inline]
    fn apply(&self, x: f32) -> f32 {
        self.jfet.transfer(x) * self.inverse_slope
    }
}

/// Sliding mean of squares over a fixed window. The running sum is
/// recomputed from the window at every wrap so rounding cannot accumulate.
#[derive(Debug, Clone)]
struct RmsWindow {
    squares: Vec<f32>,
    index: usize,
    sum: f32,
}

impl RmsWindow {
    fn new(len: usize) -> Self {
        Self {
            squares: vec![0.0; len.max(1)],
            index: 0,
            sum: 0.0,
        }
    }

    #[inline]
    fn push(&mut self, square: f32) -> f32 {
        self.sum += square - self.squares[self.index];
        self.squares[self.index] = square;
        self.index += 1;
        if self.index == self.squares.len() {
            self.index = 0;
            self.sum = self.squares.iter().sum();
        }
        self.sum.max(0.0) / self.squares.len() as f32
    }

    fn clear(&mut self) {
        self.squares.fill(0.0);
        self.index = 0;
        self.sum = 0.0;
    }
}

#[derive(Debug, Clone)]
struct Channel {
    level_db: f32,
    gain_db: f32,
    last_output: f32,
    window: RmsWindow,
}

impl Channel {
    fn new() -> Self {
        Self {
            level_db: SILENCE_DB,
            gain_db: 0.0,
            last_output: 0.0,
            window: RmsWindow::new(VCA_WINDOW),
        }
    }

    fn clear(&mut self) {
        self.level_db = SILENCE_DB;
        self.gain_db = 0.0;
        self.last_output = 0.0;
        self.window.clear();
    }

    #[inline]
    fn opto(&mut self, c: &Coefficients, x: f32, threshold: f32, slope: f32) -> f32 {
        let level_db = linear_to_db(x.abs() + DETECTOR_FLOOR);
        let coefficient = if level_db > self.level_db {
            c.opto_attack
        } else if self.level_db > threshold {
            c.opto_release_above
        } else {
            c.opto_release_below
        };
        self.level_db = level_db;

        let target = if level_db > threshold {
            (threshold - level_db) * slope
        } else {
            0.0
        };
        self.gain_db = coefficient * self.gain_db + (1.0 - coefficient) * target;
        x * db_to_linear(self.gain_db)
    }

    #[inline]
    fn fet(
        &mut self,
        c: &Coefficients,
        colour: &Colour,
        x: f32,
        threshold: f32,
        slope: f32,
    ) -> f32 {
        let gain = db_to_linear(self.gain_db);
        let level = (gain * x).abs().max(self.last_output.abs() * FET_HOLD);
        let level_db = linear_to_db(level + DETECTOR_FLOOR);

        let target = if level_db > threshold {
            (threshold - level_db) * slope
        } else {
            0.0
        };
        let coefficient = if target < self.gain_db {
            c.fet_attack
        } else {
            c.fet_release
        };
        self.gain_db = coefficient * self.gain_db + (1.0 - coefficient) * target;

        let amount = (-self.gain_db / FET_COLOUR_RANGE_DB).clamp(0.0, 1.0) * FET_COLOUR_DEPTH;
        let coloured = if amount > 0.0 {
            x + amount * (colour.apply(x) - x)
        } else {
            x
        };
        let y = coloured * db_to_linear(self.gain_db);
        self.last_output = y;
        y
    }

    #[inline]
    fn vca(&mut self, c: &Coefficients, x: f32, threshold: f32, slope: f32) -> f32 {
        let rms_db = linear_to_db(sqrtf(self.window.push(x * x)) + DETECTOR_FLOOR);
        let coefficient = if rms_db > self.level_db {
            c.vca_attack
        } else {
            c.vca_release
        };
        self.level_db = coefficient * self.level_db + (1.0 - coefficient) * rms_db;

        self.gain_db = if self.level_db > threshold {
            let over = self.level_db - threshold;
            let target = -over * slope;
            if over < VCA_KNEE_DB {
                let knee = over / VCA_KNEE_DB;
                target * knee * knee
            } else {
                target
            }
        } else {
            0.0
        };
        x * db_to_linear(self.gain_db)
    }
}

/// Compressor stage.
///
/// # Example
///
/// ```rust
/// use ember_core::{PipelineConfig, Stage};
/// use ember_voices::{compressor, Compressor, CompressorKind};
///
/// let mut comp = Compressor::new(&PipelineConfig::default());
/// comp.link().select(CompressorKind::Vca);
/// comp.controls().set(compressor::THRESHOLD, -30.0);
///
/// let mut block = vec![0.5_f32; 512];
/// comp.process_mono(&mut block);
/// assert!(comp.link().gain_reduction_db() < 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    controls: Arc<Controls>,
    link: Arc<CompressorLink>,
    smoothed: [LinearSmoothedParam; 4],
    ramps: [Vec<f32>; 4],
    channels: Vec<Channel>,
    coefficients: Coefficients,
    colour: Colour,
    active: CompressorKind,
}

impl Compressor {
    /// Creates and prepares the compressor.
    pub fn new(config: &PipelineConfig) -> Self {
        let controls = Arc::new(Controls::new(&PARAMS));
        let smoothed = controls.smoothers(config.sample_rate());
        let mut comp = Self {
            controls,
            link: Arc::new(CompressorLink::default()),
            smoothed,
            ramps: Default::default(),
            channels: Vec::new(),
            coefficients: Coefficients::new(config.sample_rate()),
            colour: Colour::new(),
            active: CompressorKind::default(),
        };
        comp.prepare(config);
        comp
    }

    /// Control block shared with the control thread.
    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    /// Law selection and metering shared with the control thread.
    pub fn link(&self) -> &Arc<CompressorLink> {
        &self.link
    }

    /// Law currently running on the audio side.
    pub fn active_kind(&self) -> CompressorKind {
        self.active
    }

    fn clear_detectors(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    fn render(&mut self, channels: &mut [&mut [f32]], start: usize, len: usize) -> f32 {
        for (param, ramp) in self.smoothed.iter_mut().zip(&mut self.ramps) {
            param.fill(&mut ramp[..len]);
        }
        let [threshold, ratio, mix, level] = &self.ramps;
        let c = &self.coefficients;
        let colour = &self.colour;
        let kind = self.active;
        let mut deepest = 0.0_f32;

        for (state, channel) in self.channels.iter_mut().zip(channels.iter_mut()) {
            let block = &mut channel[start..start + len];
            for (i, sample) in block.iter_mut().enumerate() {
                let dry = *sample;
                let slope = 1.0 - 1.0 / ratio[i];
                let wet = match kind {
                    CompressorKind::Opto => state.opto(c, dry, threshold[i], slope),
                    CompressorKind::Fet => state.fet(c, colour, dry, threshold[i], slope),
                    CompressorKind::Vca => state.vca(c, dry, threshold[i], slope),
                };
                deepest = deepest.min(state.gain_db);
                *sample = dry * (1.0 - mix[i]) + wet * mix[i] * level[i];
            }
        }
        deepest
    }
}

impl Stage for Compressor {
    fn prepare(&mut self, config: &PipelineConfig) {
        let rate = config.sample_rate();
        self.smoothed = self.controls.smoothers(rate);
        self.coefficients = Coefficients::new(rate);
        self.ramps = core::array::from_fn(|_| vec![0.0; config.max_block_size()]);
        self.channels = (0..config.channels()).map(|_| Channel::new()).collect();
        self.active = self.link.kind();
        self.link.gain_reduction.store(0.0);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "compressor_prepare: {} Hz, {} channels, {}",
            rate,
            config.channels(),
            self.active
        );
    }

    fn reset(&mut self) {
        self.controls.snap(&mut self.smoothed);
        self.clear_detectors();
        self.active = self.link.kind();
        self.link.gain_reduction.store(0.0);
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        if self.controls.is_bypassed() || self.channels.is_empty() {
            return;
        }
        self.controls.pull(&mut self.smoothed);

        let kind = self.link.kind();
        if kind != self.active {
            #[cfg(feature = "tracing")]
            tracing::debug!("compressor_switch: {} -> {}", self.active, kind);
            self.active = kind;
            self.clear_detectors();
        }

        let total = block_len(channels);
        let step = self.ramps[0].len().max(1);
        let mut deepest = 0.0_f32;
        let mut start = 0;
        while start < total {
            let len = step.min(total - start);
            deepest = deepest.min(self.render(channels, start, len));
            start += len;
        }
        self.link.gain_reduction.store(deepest);
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.controls.set_bypassed(bypassed);
    }

    fn is_bypassed(&self) -> bool {
        self.controls.is_bypassed()
    }
}
