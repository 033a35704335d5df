//! Machinery shared by the oversampled voices, and the closed set of
//! selectable overdrive voices.
//!
//! A voice is a per-channel wet path (filters and circuit models) run
//! between an [`Oversampler`]'s up and down passes, followed by a smoothed
//! wet/dry blend. [`Oversampled`] owns the lanes and the scratch buffers;
//! each voice only describes its wet path and which filters follow which
//! control.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;
use core::str::FromStr;

use ember_core::{
    LinearSmoothedParam, Oversampler, OversamplingFactor, PipelineConfig, Stage,
};

use crate::borealis::Borealis;
use crate::helios::Helios;
use crate::nebula::Nebula;
use crate::params::{Controls, ParamSpec};

/// The per-channel signal path of a voice, run at the oversampled rate.
pub(crate) trait WetPath {
    /// Replaces `block` with the wet signal. `level` holds one output level
    /// value per sample.
    fn process(&mut self, block: &mut [f32], level: &[f32]);

    /// Clears filter and circuit state.
    fn clear(&mut self);
}

#[derive(Debug, Clone)]
struct Lane<P> {
    oversampler: Oversampler,
    path: P,
}

/// Oversampled lanes plus the scratch shared by every channel.
#[derive(Debug, Clone)]
pub(crate) struct Oversampled<P> {
    factor: OversamplingFactor,
    lanes: Vec<Lane<P>>,
    max_block: usize,
    rate: f32,
    wet: Vec<f32>,
    mix: Vec<f32>,
    level: Vec<f32>,
}

impl<P: WetPath> Oversampled<P> {
    pub(crate) fn new(factor: OversamplingFactor) -> Self {
        Self {
            factor,
            lanes: Vec::new(),
            max_block: 0,
            rate: 0.0,
            wet: Vec::new(),
            mix: Vec::new(),
            level: Vec::new(),
        }
    }

    /// Rebuilds one lane per channel, each path made by `make(oversampled_rate)`.
    pub(crate) fn prepare(&mut self, config: &PipelineConfig, mut make: impl FnMut(f32) -> P) {
        let config = config.with_oversampling(self.factor);
        let factor = self.factor;
        let rate = config.oversampled_rate();
        let max_block = config.max_block_size();

        self.lanes = (0..config.channels())
            .map(|_| {
                let mut oversampler = Oversampler::new(factor);
                oversampler.prepare(max_block);
                Lane {
                    oversampler,
                    path: make(rate),
                }
            })
            .collect();

        let len = config.oversampled_block_size();
        self.wet = vec![0.0; len];
        self.mix = vec![0.0; len];
        self.level = vec![0.0; len];
        self.rate = rate;
        self.max_block = max_block;
    }

    pub(crate) fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.oversampler.reset();
            lane.path.clear();
        }
    }

    /// Oversampled sample rate.
    pub(crate) fn rate(&self) -> f32 {
        self.rate
    }

    pub(crate) fn ratio(&self) -> usize {
        self.factor.ratio()
    }

    pub(crate) fn is_prepared(&self) -> bool {
        !self.lanes.is_empty()
    }

    /// Base-rate ranges of at most the prepared block size covering `len`.
    pub(crate) fn chunks(&self, len: usize) -> impl Iterator<Item = Range<usize>> + use<P> {
        let step = self.max_block.max(1);
        (0..len).step_by(step).map(move |start| start..(start + step).min(len))
    }

    pub(crate) fn paths_mut(&mut self) -> impl Iterator<Item = &mut P> {
        self.lanes.iter_mut().map(|lane| &mut lane.path)
    }

    /// Runs `range` of every channel through its lane and blends
    /// `mix·wet + (1 - mix)·dry` at the oversampled rate.
    pub(crate) fn render(
        &mut self,
        channels: &mut [&mut [f32]],
        range: Range<usize>,
        mix: &mut LinearSmoothedParam,
        level: &mut LinearSmoothedParam,
    ) {
        let len = range.len() * self.factor.ratio();
        if len == 0 || len > self.wet.len() {
            return;
        }
        mix.fill(&mut self.mix[..len]);
        level.fill(&mut self.level[..len]);
        let mix_ramp = &self.mix[..len];
        let level_ramp = &self.level[..len];

        for (lane, channel) in self.lanes.iter_mut().zip(channels.iter_mut()) {
            let block = &mut channel[range.clone()];
            let up = lane.oversampler.process_up(block);
            let wet = &mut self.wet[..up.len()];
            wet.copy_from_slice(up);
            lane.path.process(wet, level_ramp);

            for ((y, &w), &m) in up.iter_mut().zip(wet.iter()).zip(mix_ramp) {
                *y = m * w + (1.0 - m) * *y;
            }
            lane.oversampler.process_down(block);
        }
    }
}

/// Identifies one of the selectable overdrive voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoiceKind {
    /// Split-band BJT/CMOS drive.
    #[default]
    Borealis,
    /// Diode and CMOS drive with an era control.
    Helios,
    /// Triode preamp into an op-amp knee.
    Nebula,
}

impl VoiceKind {
    /// Every voice, in selection order.
    pub const ALL: [Self; 3] = [Self::Borealis, Self::Helios, Self::Nebula];

    /// Lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Borealis => "borealis",
            Self::Helios => "helios",
            Self::Nebula => "nebula",
        }
    }

    /// Selection index, stable across releases.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// The voice's control table.
    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::Borealis => &crate::borealis::PARAMS,
            Self::Helios => &crate::helios::PARAMS,
            Self::Nebula => &crate::nebula::PARAMS,
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised voice name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVoiceKindError(pub alloc::string::String);

impl fmt::Display for ParseVoiceKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown voice '{}'", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseVoiceKindError {}

impl FromStr for VoiceKind {
    type Err = ParseVoiceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseVoiceKindError(s.into()))
    }
}

/// Any overdrive voice. Dispatch happens once per block.
#[derive(Debug, Clone)]
pub enum Voice {
    /// See [`Borealis`].
    Borealis(Borealis),
    /// See [`Helios`].
    Helios(Helios),
    /// See [`Nebula`].
    Nebula(Nebula),
}

macro_rules! dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            Voice::Borealis($v) => $body,
            Voice::Helios($v) => $body,
            Voice::Nebula($v) => $body,
        }
    };
}

impl Voice {
    /// Builds and prepares a voice of `kind`.
    pub fn new(kind: VoiceKind, config: &PipelineConfig) -> Self {
        match kind {
            VoiceKind::Borealis => Self::Borealis(Borealis::new(config)),
            VoiceKind::Helios => Self::Helios(Helios::new(config)),
            VoiceKind::Nebula => Self::Nebula(Nebula::new(config)),
        }
    }

    /// Which voice this is.
    pub fn kind(&self) -> VoiceKind {
        match self {
            Self::Borealis(_) => VoiceKind::Borealis,
            Self::Helios(_) => VoiceKind::Helios,
            Self::Nebula(_) => VoiceKind::Nebula,
        }
    }

    /// Shared control block.
    pub fn controls(&self) -> &Arc<Controls> {
        dispatch!(self, v => v.controls())
    }
}

impl Stage for Voice {
    fn prepare(&mut self, config: &PipelineConfig) {
        dispatch!(self, v => v.prepare(config))
    }

    fn reset(&mut self) {
        dispatch!(self, v => v.reset())
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        dispatch!(self, v => v.process(channels))
    }

    fn set_bypassed(&mut self, bypassed: bool) {
        self.controls().set_bypassed(bypassed);
    }

    fn is_bypassed(&self) -> bool {
        self.controls().is_bypassed()
    }
}
