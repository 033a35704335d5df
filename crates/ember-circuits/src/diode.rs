//! Diode clipper: an RC network loaded by a diode pair, solved in closed
//! form each sample.
//!
//! Combining the Shockley law `I = Is(e^{V/Vt} - 1)` with the RC node
//! equation gives an implicit equation in the output voltage. Rewriting it
//! around the sign of the driving term turns it into `W` of an affine
//! function of that term, so every sample costs one [`omega`] evaluation
//! and the update is unconditionally stable.
//!
//! Small inputs (`|v| < 0.1`) never reach the conduction knee and pass
//! through unchanged.

use ember_core::{omega, sign};
use libm::logf;

use crate::model::CircuitModel;

/// Which half-waves the diodes clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiodePolarity {
    /// Anti-parallel pair, both half-waves clipped.
    #[default]
    Symmetric,
    /// Single diode conducting on positive swings only.
    Positive,
    /// Single diode conducting on negative swings only.
    Negative,
}

/// Germanium saturation current (A).
pub const GERMANIUM_SATURATION_CURRENT: f32 = 200e-9;
/// Silicon (1N4148-like) saturation current (A).
pub const SILICON_SATURATION_CURRENT: f32 = 2.52e-9;

const CAPACITANCE: f32 = 1e-8;
const RESISTANCE: f32 = 2200.0;
const THERMAL_VOLTAGE: f32 = 0.02585;
const PASSTHROUGH_LIMIT: f32 = 0.1;

/// Closed-form diode clipper.
///
/// The state is the recursive term of the input network's bilinear
/// discretisation.
#[derive(Debug, Clone, Copy)]
pub struct DiodeClipper {
    polarity: DiodePolarity,
    a1: f32,
    k1: f32,
    k2: f32,
    k3: f32,
    k4: f32,
    k5: f32,
    k6: f32,
}

impl DiodeClipper {
    /// Builds a clipper for a diode with the given saturation current at
    /// `sample_rate`.
    pub fn new(sample_rate: f32, saturation_current: f32, polarity: DiodePolarity) -> Self {
        let sample_rate = sample_rate.max(ember_core::MIN_SAMPLE_RATE);
        let cr = CAPACITANCE * RESISTANCE;
        let b0 = 2.0 / sample_rate;
        let b1 = -2.0 / sample_rate;
        let a1 = -1.0;

        let crb = cr + b0 + 1.0;
        let isr = saturation_current * RESISTANCE;
        Self {
            polarity,
            a1,
            k1: 1.0 / cr,
            k2: cr / crb,
            k3: isr / crb,
            k4: 1.0 / THERMAL_VOLTAGE,
            k5: logf(isr / crb * THERMAL_VOLTAGE),
            k6: b1 - a1 * b0,
        }
    }

    /// Symmetric germanium pair.
    pub fn germanium(sample_rate: f32) -> Self {
        Self::new(sample_rate, GERMANIUM_SATURATION_CURRENT, DiodePolarity::Symmetric)
    }

    /// Silicon diode(s) with the given polarity.
    pub fn silicon(sample_rate: f32, polarity: DiodePolarity) -> Self {
        Self::new(sample_rate, SILICON_SATURATION_CURRENT, polarity)
    }

    /// Clipping polarity.
    pub fn polarity(&self) -> DiodePolarity {
        self.polarity
    }

    #[inline]
    fn conducts(&self, direction: f32) -> bool {
        match self.polarity {
            DiodePolarity::Symmetric => true,
            DiodePolarity::Positive => direction > 0.0,
            DiodePolarity::Negative => direction < 0.0,
        }
    }

    #[inline]
    fn advance_state(&self, p: f32, v: f32) -> f32 {
        self.k6 * v - self.a1 * p
    }
}

impl CircuitModel for DiodeClipper {
    type State = f32;

    fn initial_state(&self) -> f32 {
        self.k6
    }

    #[inline]
    fn step(&self, p: f32, vin: f32) -> (f32, f32) {
        if vin.abs() < PASSTHROUGH_LIMIT {
            return (vin, self.advance_state(p, vin));
        }

        let q = self.k1 * vin - p;
        let rt = sign(q);
        if !self.conducts(rt) {
            return (vin, self.advance_state(p, vin));
        }

        let w = self.k2 * q + self.k3 * rt;
        let vout = w - THERMAL_VOLTAGE * rt * omega(self.k4 * rt * w + self.k5);
        (vout, self.advance_state(p, vout))
    }

    fn dc_operating_point(&self) -> f32 {
        0.0
    }
}
