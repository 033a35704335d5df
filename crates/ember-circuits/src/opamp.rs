//! Op-amp soft clippers.
//!
//! [`OpAmpTanh`] integrates a tanh-shaped gain curve analytically, which
//! gives a cheap symmetric soft knee at ±1. [`OpAmpKnee`] models the output
//! stage running into its rail with the exact omega-based relation, and
//! replaces it with a cubic below the knee where the curve is nearly linear.

use ember_core::{log_cosh, omega};
use libm::expf;

use crate::model::CircuitModel;

/// Integrated-tanh soft clipper with rails at ±1.
#[derive(Debug, Clone, Copy)]
pub struct OpAmpTanh {
    vt: f32,
    offset: f32,
}

impl OpAmpTanh {
    const VT: f32 = 0.026;
    const HARD_LIMIT: f32 = 2.0;

    /// Creates the clipper.
    pub fn new() -> Self {
        let vt = Self::VT;
        Self {
            vt,
            offset: 0.5 * vt * log_cosh(1.0 / vt),
        }
    }

    /// Static transfer.
    #[inline]
    pub fn transfer(&self, x: f32) -> f32 {
        if x > Self::HARD_LIMIT {
            return 1.0;
        }
        if x < -Self::HARD_LIMIT {
            return -1.0;
        }
        if x > 0.0 {
            0.5 * x - 0.5 * self.vt * log_cosh((x - 1.0) / self.vt) + self.offset
        } else {
            0.5 * x + 0.5 * self.vt * log_cosh((-x - 1.0) / self.vt) - self.offset
        }
    }
}

impl Default for OpAmpTanh {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitModel for OpAmpTanh {
    type State = ();

    fn initial_state(&self) {}

    #[inline]
    fn step(&self, _state: (), input: f32) -> (f32, ()) {
        (self.transfer(input), ())
    }

    fn dc_operating_point(&self) -> f32 {
        0.0
    }
}

/// Rail-knee op-amp model with a cubic small-signal region.
///
/// Above the knee point `x1 = bias - k·vt` the output follows the exact
/// omega solution; below it a cubic `a·x³ + b·x` matched in value and slope
/// at `x1` takes over. Odd-symmetric.
#[derive(Debug, Clone, Copy)]
pub struct OpAmpKnee {
    bias: f32,
    vt: f32,
    v0: f32,
    x1: f32,
    a: f32,
    b: f32,
}

impl OpAmpKnee {
    const BIAS: f32 = 1.02;
    const VT: f32 = 5e-4;
    const EPS: f32 = 1e-4;
    const K: f32 = 100.0;

    /// Creates the model and fits the cubic to the knee.
    pub fn new() -> Self {
        let bias = Self::BIAS;
        let vt = Self::VT;
        let x1 = bias - Self::K * vt;
        let mut model = Self {
            bias,
            vt,
            v0: vt * omega((bias + 1.0) / vt) - 2.0,
            x1,
            a: 0.0,
            b: 0.0,
        };

        let v1 = model.knee(x1);
        let v1p = (model.knee(x1 + Self::EPS) - model.knee(x1 - Self::EPS)) / (2.0 * Self::EPS);
        model.a = (v1p * x1 - v1) / (2.0 * x1 * x1 * x1);
        model.b = (-v1p * x1 + 3.0 * v1) / (2.0 * x1);
        model
    }

    /// Input level where the exact knee takes over from the cubic.
    pub fn knee_point(&self) -> f32 {
        self.x1
    }

    /// Cubic coefficients `(a, b)` below the knee.
    pub fn cubic(&self) -> (f32, f32) {
        (self.a, self.b)
    }

    #[inline]
    fn knee(&self, x: f32) -> f32 {
        let expx = expf(-x / self.vt);
        let vout = self.vt * omega((-x + self.bias + expx) / self.vt) - expx;
        -(vout - 1.0 - self.v0) / (1.0 + self.v0)
    }

    /// Static transfer.
    #[inline]
    pub fn transfer(&self, x: f32) -> f32 {
        let x_abs = x.abs();
        let y = if x_abs >= self.x1 {
            self.knee(x_abs)
        } else {
            (self.a * x_abs * x_abs + self.b) * x_abs
        };
        if x < 0.0 { -y } else { y }
    }
}

impl Default for OpAmpKnee {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitModel for OpAmpKnee {
    type State = ();

    fn initial_state(&self) {}

    #[inline]
    fn step(&self, _state: (), input: f32) -> (f32, ()) {
        (self.transfer(input), ())
    }

    fn dc_operating_point(&self) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tanh_is_linear_then_rails() {
        let op = OpAmpTanh::new();
        assert_eq!(op.transfer(0.0), 0.0);
        assert!((op.transfer(0.5) - 0.5).abs() < 1e-3);
        assert!((op.transfer(-0.5) + 0.5).abs() < 1e-3);
        assert_eq!(op.transfer(2.5), 1.0);
        assert_eq!(op.transfer(-2.5), -1.0);
    }

    #[test]
    fn tanh_is_continuous_at_hard_limit() {
        let op = OpAmpTanh::new();
        assert!((op.transfer(2.0) - 1.0).abs() < 1e-4);
        assert!((op.transfer(-2.0) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn tanh_large_argument_does_not_overflow() {
        let op = OpAmpTanh::new();
        let mut x = -2.0;
        while x <= 2.0 {
            assert!(op.transfer(x).is_finite(), "x = {x}");
            x += 0.001;
        }
    }

    #[test]
    fn knee_constants() {
        let op = OpAmpKnee::new();
        assert!((op.knee_point() - 0.97).abs() < 1e-6);
        let (a, b) = op.cubic();
        assert!((a + 0.004415).abs() < 2e-3, "a = {a}");
        assert!((b - 0.98665).abs() < 5e-3, "b = {b}");
    }

    #[test]
    fn knee_saturates_at_one() {
        let op = OpAmpKnee::new();
        for x in [1.1, 2.0, 10.0, 1000.0] {
            assert!((op.transfer(x) - 1.0).abs() < 1e-3, "x = {x}");
            assert!((op.transfer(-x) + 1.0).abs() < 1e-3, "x = {x}");
        }
    }

    #[test]
    fn knee_is_continuous_at_x1() {
        let op = OpAmpKnee::new();
        let x1 = op.knee_point();
        let below = op.transfer(x1 - 1e-4);
        let above = op.transfer(x1);
        assert!((below - above).abs() < 1e-3, "{below} vs {above}");
    }

    #[test]
    fn knee_small_signal_gain_near_unity() {
        let op = OpAmpKnee::new();
        assert_eq!(op.transfer(0.0), 0.0);
        let gain = op.transfer(0.1) / 0.1;
        assert!((gain - 0.987).abs() < 1e-2, "{gain}");
    }
}
