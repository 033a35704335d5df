//! Downward expander used as a noise gate.
//!
//! Level detection runs in two stages: an RMS detector with instant attack
//! and 50 ms release, then a peak envelope with the gate's own attack and
//! release. Below the threshold the gain falls as
//! `(envelope / threshold)^(ratio - 1)`.

use core::f32::consts::TAU;

use ember_core::{db_to_linear, flush_denormal};
use libm::{expf, powf, sqrtf};

/// Level detector law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Rectified signal.
    Peak,
    /// Mean square, returned as its root.
    Rms,
}

/// One-pole attack/release level follower.
#[derive(Debug, Clone)]
pub struct Ballistics {
    detection: Detection,
    attack: f32,
    release: f32,
    state: f32,
}

impl Ballistics {
    /// Creates a follower. Times below 1 µs mean an instant response.
    pub fn new(detection: Detection, attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self {
            detection,
            attack: coefficient(attack_ms, sample_rate),
            release: coefficient(release_ms, sample_rate),
            state: 0.0,
        }
    }

    /// Follows one sample and returns the detected level.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let input = match self.detection {
            Detection::Peak => x.abs(),
            Detection::Rms => x * x,
        };
        let cte = if input > self.state { self.attack } else { self.release };
        self.state = flush_denormal(input + cte * (self.state - input));
        match self.detection {
            Detection::Peak => self.state,
            Detection::Rms => sqrtf(self.state),
        }
    }

    /// Clears the detector.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

fn coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    if time_ms < 1e-3 {
        0.0
    } else {
        expf(-TAU * 1000.0 / (sample_rate.max(1.0) * time_ms))
    }
}

/// Noise gate with a fixed ratio and ballistics.
///
/// # Example
///
/// ```rust
/// use ember_voices::NoiseGate;
///
/// let mut gate = NoiseGate::new(-40.0, 48000.0);
/// assert_eq!(gate.process(0.0), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct NoiseGate {
    threshold: f32,
    threshold_inverse: f32,
    ratio: f32,
    rms: Ballistics,
    envelope: Ballistics,
}

impl NoiseGate {
    /// Expansion ratio below threshold.
    pub const RATIO: f32 = 10.0;
    /// Envelope attack (ms).
    pub const ATTACK_MS: f32 = 1.0;
    /// Envelope release (ms).
    pub const RELEASE_MS: f32 = 100.0;
    const RMS_RELEASE_MS: f32 = 50.0;

    /// Creates a gate at `threshold_db`.
    pub fn new(threshold_db: f32, sample_rate: f32) -> Self {
        let mut gate = Self {
            threshold: 1.0,
            threshold_inverse: 1.0,
            ratio: Self::RATIO,
            rms: Ballistics::new(Detection::Rms, 0.0, Self::RMS_RELEASE_MS, sample_rate),
            envelope: Ballistics::new(
                Detection::Peak,
                Self::ATTACK_MS,
                Self::RELEASE_MS,
                sample_rate,
            ),
        };
        gate.set_threshold_db(threshold_db);
        gate
    }

    /// Moves the threshold.
    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold = db_to_linear(threshold_db);
        self.threshold_inverse = 1.0 / self.threshold;
    }

    /// Gates one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let env = self.envelope.process(self.rms.process(x));
        let gain = if env > self.threshold {
            1.0
        } else {
            powf(env * self.threshold_inverse, self.ratio - 1.0)
        };
        gain * x
    }

    /// Clears both detectors.
    pub fn reset(&mut self) {
        self.rms.reset();
        self.envelope.reset();
    }
}
