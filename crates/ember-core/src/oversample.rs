//! Polyphase half-band oversampling around nonlinear stages.
//!
//! Waveshaping a signal creates harmonics far above its bandwidth. Running
//! the nonlinear stage at 2×, 4× or 8× the base rate keeps most of them
//! below the raised Nyquist frequency, and the decimation filter removes
//! them before they fold back into the audible band.
//!
//! Each 2× step is a two-branch polyphase IIR half-band: two chains of
//! first-order allpass sections whose outputs interleave on the way up and
//! average on the way down. Higher factors cascade 2× steps. All buffers are
//! sized by [`Oversampler::prepare`]; processing never allocates.
//!
//! ```rust
//! use ember_core::{Oversampler, OversamplingFactor};
//!
//! let mut os = Oversampler::new(OversamplingFactor::X4);
//! os.prepare(256);
//!
//! let mut block = [0.25_f32; 256];
//! let up = os.process_up(&block);
//! assert_eq!(up.len(), 1024);
//! for s in up.iter_mut() {
//!     *s = s.clamp(-0.2, 0.2); // nonlinear stage at 4x
//! }
//! os.process_down(&mut block);
//! ```

use alloc::vec;
use alloc::vec::Vec;

/// Supported oversampling ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversamplingFactor {
    /// No oversampling.
    X1,
    /// 2× (one half-band stage).
    #[default]
    X2,
    /// 4× (two cascaded stages).
    X4,
    /// 8× (three cascaded stages).
    X8,
}

impl OversamplingFactor {
    /// Rate multiplier.
    pub fn ratio(self) -> usize {
        1 << self.stages()
    }

    /// Number of cascaded 2× stages.
    pub fn stages(self) -> usize {
        match self {
            Self::X1 => 0,
            Self::X2 => 1,
            Self::X4 => 2,
            Self::X8 => 3,
        }
    }

    /// Factor for a ratio of 1, 2, 4 or 8.
    pub fn from_ratio(ratio: usize) -> Option<Self> {
        match ratio {
            1 => Some(Self::X1),
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            8 => Some(Self::X8),
            _ => None,
        }
    }
}

/// Allpass coefficients for the even-sample branch.
const BRANCH_A: [f32; 3] = [0.036_681_502_163_648, 0.248_030_921_580_110, 0.643_184_620_136_480];
/// Allpass coefficients for the odd-sample branch.
const BRANCH_B: [f32; 3] = [0.110_377_634_768_680, 0.420_399_304_190_880, 0.854_640_112_701_920];

/// Three cascaded first-order allpass sections in `z^-2` form.
#[derive(Debug, Clone)]
struct AllpassChain {
    coefficients: [f32; 3],
    state: [f32; 3],
}

impl AllpassChain {
    fn new(coefficients: [f32; 3]) -> Self {
        Self {
            coefficients,
            state: [0.0; 3],
        }
    }

    #[inline]
    fn process(&mut self, mut x: f32) -> f32 {
        for (a, s) in self.coefficients.iter().zip(self.state.iter_mut()) {
            let y = a * x + *s;
            *s = x - a * y;
            x = y;
        }
        x
    }

    fn reset(&mut self) {
        self.state = [0.0; 3];
    }
}

/// One 2× half-band stage with independent interpolation and decimation
/// state.
#[derive(Debug, Clone)]
pub struct HalfBandStage {
    up_a: AllpassChain,
    up_b: AllpassChain,
    down_a: AllpassChain,
    down_b: AllpassChain,
    down_delay: f32,
}

impl HalfBandStage {
    /// Creates a stage with cleared state.
    pub fn new() -> Self {
        Self {
            up_a: AllpassChain::new(BRANCH_A),
            up_b: AllpassChain::new(BRANCH_B),
            down_a: AllpassChain::new(BRANCH_A),
            down_b: AllpassChain::new(BRANCH_B),
            down_delay: 0.0,
        }
    }

    /// Interpolates `input` into `output` (`output.len() == 2 * input.len()`).
    pub fn upsample(&mut self, input: &[f32], output: &mut [f32]) {
        for (x, pair) in input.iter().zip(output.chunks_exact_mut(2)) {
            pair[0] = self.up_a.process(*x);
            pair[1] = self.up_b.process(*x);
        }
    }

    /// Decimates `input` into `output` (`input.len() == 2 * output.len()`).
    pub fn downsample(&mut self, input: &[f32], output: &mut [f32]) {
        for (pair, y) in input.chunks_exact(2).zip(output.iter_mut()) {
            let even = self.down_a.process(pair[0]);
            *y = (even + self.down_delay) * 0.5;
            self.down_delay = self.down_b.process(pair[1]);
        }
    }

    /// Clears both directions.
    pub fn reset(&mut self) {
        self.up_a.reset();
        self.up_b.reset();
        self.down_a.reset();
        self.down_b.reset();
        self.down_delay = 0.0;
    }
}

impl Default for HalfBandStage {
    fn default() -> Self {
        Self::new()
    }
}

/// Cascaded half-band up/down sampler for one channel.
#[derive(Debug, Clone)]
pub struct Oversampler {
    factor: OversamplingFactor,
    stages: Vec<HalfBandStage>,
    /// `buffers[i]` holds the signal at `2^(i+1)×` (or the base rate for X1).
    buffers: Vec<Vec<f32>>,
    max_block: usize,
    /// Base-rate length of the block currently held in the buffers.
    current: usize,
}

impl Oversampler {
    /// Creates an unprepared oversampler.
    pub fn new(factor: OversamplingFactor) -> Self {
        Self {
            factor,
            stages: (0..factor.stages()).map(|_| HalfBandStage::new()).collect(),
            buffers: Vec::new(),
            max_block: 0,
            current: 0,
        }
    }

    /// Sizes the internal buffers for blocks of up to `max_block` base-rate
    /// samples and clears the filter state.
    pub fn prepare(&mut self, max_block: usize) {
        let max_block = max_block.max(1);
        self.max_block = max_block;
        self.buffers = if self.factor == OversamplingFactor::X1 {
            vec![vec![0.0; max_block]]
        } else {
            (0..self.stages.len())
                .map(|i| vec![0.0; max_block << (i + 1)])
                .collect()
        };
        self.reset();
        #[cfg(feature = "tracing")]
        tracing::debug!("oversampler_prepare: {:?}, max block {max_block}", self.factor);
    }

    /// Interpolates a base-rate block and returns the oversampled signal.
    ///
    /// Blocks longer than the prepared size are truncated to it; callers
    /// split larger buffers.
    pub fn process_up(&mut self, input: &[f32]) -> &mut [f32] {
        if self.buffers.is_empty() {
            self.prepare(input.len());
        }
        let n = input.len().min(self.max_block);
        self.current = n;

        if self.stages.is_empty() {
            let out = &mut self.buffers[0][..n];
            out.copy_from_slice(&input[..n]);
            return out;
        }

        for i in 0..self.stages.len() {
            let len_in = n << i;
            let (lower, upper) = self.buffers.split_at_mut(i);
            let dst = &mut upper[0][..len_in * 2];
            let src = if i == 0 { &input[..n] } else { &lower[i - 1][..len_in] };
            self.stages[i].upsample(src, dst);
        }

        let last = self.stages.len() - 1;
        &mut self.buffers[last][..n << self.stages.len()]
    }

    /// Decimates the block produced by the last [`process_up`](Self::process_up)
    /// (after in-place processing) into `output`.
    pub fn process_down(&mut self, output: &mut [f32]) {
        let n = output.len().min(self.current);
        if self.buffers.is_empty() {
            return;
        }

        if self.stages.is_empty() {
            output[..n].copy_from_slice(&self.buffers[0][..n]);
            return;
        }

        for i in (1..self.stages.len()).rev() {
            let len_out = n << i;
            let (lower, upper) = self.buffers.split_at_mut(i);
            self.stages[i].downsample(&upper[0][..len_out * 2], &mut lower[i - 1][..len_out]);
        }
        self.stages[0].downsample(&self.buffers[0][..n * 2], &mut output[..n]);
    }

    /// Clears filter state and buffers.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.current = 0;
    }

    /// Configured factor.
    pub fn factor(&self) -> OversamplingFactor {
        self.factor
    }

    /// Prepared maximum base-rate block length.
    pub fn max_block_size(&self) -> usize {
        self.max_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios() {
        assert_eq!(OversamplingFactor::X1.ratio(), 1);
        assert_eq!(OversamplingFactor::X4.ratio(), 4);
        assert_eq!(OversamplingFactor::from_ratio(8), Some(OversamplingFactor::X8));
        assert_eq!(OversamplingFactor::from_ratio(3), None);
    }

    #[test]
    fn dc_survives_round_trip() {
        for factor in [
            OversamplingFactor::X1,
            OversamplingFactor::X2,
            OversamplingFactor::X4,
            OversamplingFactor::X8,
        ] {
            let mut os = Oversampler::new(factor);
            os.prepare(64);
            let mut block = [0.5_f32; 64];
            for _ in 0..20 {
                block = [0.5; 64];
                let up = os.process_up(&block);
                assert_eq!(up.len(), 64 * factor.ratio());
                os.process_down(&mut block);
            }
            for s in block {
                assert!((s - 0.5).abs() < 1e-4, "{factor:?}: {s}");
            }
        }
    }

    #[test]
    fn upsampled_dc_is_flat() {
        let mut os = Oversampler::new(OversamplingFactor::X2);
        os.prepare(32);
        let ones = [1.0_f32; 32];
        for _ in 0..10 {
            os.process_up(&ones);
        }
        for s in os.process_up(&ones).iter() {
            assert!((s - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn reset_clears_history() {
        let mut os = Oversampler::new(OversamplingFactor::X4);
        os.prepare(16);
        let mut block = [1.0_f32; 16];
        os.process_up(&block);
        os.process_down(&mut block);
        os.reset();
        let mut silence = [0.0_f32; 16];
        os.process_up(&silence);
        os.process_down(&mut silence);
        assert!(silence.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn oversize_block_is_truncated() {
        let mut os = Oversampler::new(OversamplingFactor::X2);
        os.prepare(8);
        let block = [0.1_f32; 20];
        assert_eq!(os.process_up(&block).len(), 16);
    }
}
