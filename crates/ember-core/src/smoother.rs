//! Click-free control values.
//!
//! [`LinearSmoothedParam`] is owned by the audio thread and ramps linearly
//! to its target over a fixed number of samples. [`AtomicParam`] is the
//! single-producer / single-consumer hand-off from the control thread: the
//! control side stores a new target, the audio side loads it once per block
//! and forwards it into [`LinearSmoothedParam::set_target`].
//!
//! ```rust
//! use ember_core::{AtomicParam, LinearSmoothedParam};
//!
//! let shared = AtomicParam::new(0.0);
//! let mut drive = LinearSmoothedParam::new(0.0, 48000.0, 0.05);
//!
//! shared.store(1.0); // control thread
//! drive.set_target(shared.load()); // audio thread, block start
//! for _ in 0..2400 {
//!     drive.advance();
//! }
//! assert_eq!(drive.current(), 1.0);
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

/// Default ramp duration for every voice control, in seconds.
pub const DEFAULT_RAMP_SECONDS: f32 = 0.05;

/// A value that ramps linearly (constant rate) towards its target.
///
/// The ramp always lasts `round(ramp_seconds × sample_rate)` samples and is
/// recomputed from the *current* value whenever a new target arrives, so a
/// change mid-ramp never jumps. The final step assigns the target exactly.
#[derive(Debug, Clone)]
pub struct LinearSmoothedParam {
    /// Current value
    current: f32,
    /// Target value
    target: f32,
    /// Increment per sample (can be positive or negative)
    increment: f32,
    /// Samples remaining until target reached
    samples_remaining: u32,
    /// Length of a full ramp in samples
    ramp_samples: u32,
}

impl LinearSmoothedParam {
    /// Creates a settled parameter at `initial`.
    pub fn new(initial: f32, sample_rate: f32, ramp_seconds: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
            ramp_samples: ramp_length(sample_rate, ramp_seconds),
        }
    }

    /// Recomputes the ramp length for a new sample rate and settles on the
    /// current target.
    pub fn reset(&mut self, sample_rate: f32, ramp_seconds: f32) {
        self.ramp_samples = ramp_length(sample_rate, ramp_seconds);
        self.snap_to_target();
    }

    /// Sets current and target together, cancelling any ramp.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Starts a ramp from the current value to `target`.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;

        if self.ramp_samples == 0 {
            self.set_current_and_target(target);
        } else {
            self.increment = (target - self.current) / self.ramp_samples as f32;
            self.samples_remaining = self.ramp_samples;
        }
    }

    /// Advances one sample and returns the new current value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.samples_remaining -= 1;
            self.current = self.position();
        }
        self.current
    }

    /// Advances `n` samples at once without producing intermediate values.
    pub fn skip(&mut self, n: usize) -> f32 {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        if n >= self.samples_remaining {
            self.snap_to_target();
        } else {
            self.samples_remaining -= n;
            self.current = self.position();
        }
        self.current
    }

    /// Ramp value for the remaining sample count. Measured back from the
    /// target so rounding never carries the ramp past it.
    #[inline]
    fn position(&self) -> f32 {
        if self.samples_remaining == 0 {
            self.target
        } else {
            self.target - self.increment * self.samples_remaining as f32
        }
    }

    /// Writes one advanced value per slot of `out`.
    pub fn fill(&mut self, out: &mut [f32]) {
        if self.samples_remaining == 0 {
            out.fill(self.current);
            return;
        }
        for slot in out.iter_mut() {
            *slot = self.advance();
        }
    }

    /// Current value without advancing.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True while a ramp is in progress.
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.samples_remaining > 0
    }

    /// Samples in a full ramp.
    pub fn ramp_samples(&self) -> u32 {
        self.ramp_samples
    }

    /// Jumps to the target immediately.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }
}

impl Default for LinearSmoothedParam {
    fn default() -> Self {
        Self::new(0.0, 48000.0, DEFAULT_RAMP_SECONDS)
    }
}

fn ramp_length(sample_rate: f32, ramp_seconds: f32) -> u32 {
    let samples = libm::roundf(ramp_seconds.max(0.0) * sample_rate.max(0.0));
    if samples.is_finite() { samples as u32 } else { 0 }
}

/// An `f32` that can be written from one thread and read from another
/// without locking.
///
/// Stored as raw bits in an [`AtomicU32`] with relaxed ordering: each
/// control is independent, so there is nothing to order against.
#[derive(Debug, Default)]
pub struct AtomicParam {
    bits: AtomicU32,
}

impl AtomicParam {
    /// Creates a new atomic value.
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    /// Publishes a new value.
    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Reads the latest published value.
    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_target_after_ramp_length() {
        let mut param = LinearSmoothedParam::new(0.0, 48000.0, 0.05);
        param.set_target(0.7);

        let steps = libm::ceilf(0.05 * 48000.0) as usize;
        for _ in 0..steps {
            param.advance();
        }
        assert_eq!(param.current(), 0.7);
        assert!(!param.is_smoothing());
    }

    #[test]
    fn odd_ramp_lengths_land_exactly() {
        // 0.05 s at 44.1 kHz is 2205 samples
        let mut param = LinearSmoothedParam::new(3.0, 44100.0, 0.05);
        param.set_target(-1.3);
        let steps = libm::ceilf(0.05 * 44100.0) as usize;
        for _ in 0..steps {
            param.advance();
        }
        assert_eq!(param.current(), -1.3);
    }

    #[test]
    fn constant_rate() {
        let mut param = LinearSmoothedParam::new(0.0, 48000.0, 0.01);
        param.set_target(1.0);
        for _ in 0..240 {
            param.advance();
        }
        assert!((param.current() - 0.5).abs() < 1e-3, "got {}", param.current());
    }

    #[test]
    fn retarget_mid_ramp_is_continuous() {
        let mut param = LinearSmoothedParam::new(0.0, 1000.0, 0.1);
        param.set_target(1.0);
        for _ in 0..50 {
            param.advance();
        }
        let before = param.current();
        param.set_target(0.0);
        let after = param.advance();
        assert!((after - before).abs() < 0.02, "{before} -> {after}");
        for _ in 0..100 {
            param.advance();
        }
        assert_eq!(param.current(), 0.0);
    }

    #[test]
    fn skip_matches_advance() {
        let mut a = LinearSmoothedParam::new(0.0, 48000.0, 0.05);
        let mut b = a.clone();
        a.set_target(2.0);
        b.set_target(2.0);
        for _ in 0..512 {
            a.advance();
        }
        b.skip(512);
        assert!((a.current() - b.current()).abs() < 1e-4);
        assert_eq!(b.skip(1_000_000), 2.0);
    }

    #[test]
    fn fill_writes_ramp() {
        let mut param = LinearSmoothedParam::new(0.0, 100.0, 0.04);
        param.set_target(1.0);
        let mut out = [0.0; 6];
        param.fill(&mut out);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert_eq!(out[3], 1.0);
        assert_eq!(out[5], 1.0);
    }

    #[test]
    fn long_ramps_never_pass_the_target() {
        let mut param = LinearSmoothedParam::new(9.04878, 71979.195, 0.05);
        param.set_target(9.411002);
        for _ in 0..param.ramp_samples() {
            let v = param.advance();
            assert!((9.04878..=9.411002).contains(&v), "{v}");
        }
        assert_eq!(param.current(), 9.411002);

        let mut skipped = LinearSmoothedParam::new(9.04878, 71979.195, 0.05);
        skipped.set_target(9.411002);
        for _ in 0..35 {
            let v = skipped.skip(100);
            assert!(v <= 9.411002, "{v}");
        }
    }

    #[test]
    fn zero_ramp_jumps() {
        let mut param = LinearSmoothedParam::new(0.0, 48000.0, 0.0);
        param.set_target(5.0);
        assert_eq!(param.current(), 5.0);
    }

    #[test]
    fn atomic_param_round_trips_bits() {
        let p = AtomicParam::new(0.25);
        assert_eq!(p.load(), 0.25);
        p.store(-3.5);
        assert_eq!(p.load(), -3.5);
    }
}
