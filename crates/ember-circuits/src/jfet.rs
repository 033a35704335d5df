//! Single-ended JFET gain stage.
//!
//! Linear up to the pinch-off voltage, then a quadratic compression that
//! reaches full saturation at `xsat = vp + 1/(2a)` with `a = γ(1 - vp)`.
//! The curve is normalised so saturation maps to 1, and each polarity has
//! its own output scale to mimic the bias asymmetry of a single device.

use crate::model::CircuitModel;

/// Algebraic JFET transfer.
#[derive(Debug, Clone, Copy)]
pub struct Jfet {
    pinch_off: f32,
    a: f32,
    x_sat: f32,
    f_sat: f32,
    positive_scale: f32,
    negative_scale: f32,
}

impl Jfet {
    /// Creates a stage with pinch-off `vp` and compression `gamma`.
    ///
    /// `vp` is kept inside `(0, 1)` and `gamma` positive so the quadratic
    /// zone always bends towards saturation.
    pub fn new(pinch_off: f32, gamma: f32) -> Self {
        let pinch_off = pinch_off.clamp(1e-3, 0.999);
        let a = (gamma * (1.0 - pinch_off)).max(1e-6);
        Self {
            pinch_off,
            a,
            x_sat: pinch_off + 1.0 / (2.0 * a),
            f_sat: pinch_off + 1.0 / (4.0 * a),
            positive_scale: 1.0,
            negative_scale: 0.8,
        }
    }

    /// Same stage with different per-polarity output scales.
    pub fn with_scales(self, positive: f32, negative: f32) -> Self {
        Self {
            positive_scale: positive,
            negative_scale: negative,
            ..self
        }
    }

    /// Input magnitude at which the output reaches its scale.
    pub fn saturation_input(&self) -> f32 {
        self.x_sat
    }

    /// Static transfer.
    #[inline]
    pub fn transfer(&self, x: f32) -> f32 {
        let x_abs = x.abs();
        let shaped = if x_abs >= self.x_sat {
            1.0
        } else if x_abs < self.pinch_off {
            x_abs / self.f_sat
        } else {
            let d = x_abs - self.pinch_off;
            ((-self.a * d + 1.0) * d + self.pinch_off) / self.f_sat
        };

        let shaped = shaped.min(1.0);
        if x >= 0.0 {
            self.positive_scale * shaped
        } else {
            -self.negative_scale * shaped
        }
    }
}

impl Default for Jfet {
    fn default() -> Self {
        Self::new(0.5, 0.3)
    }
}

impl CircuitModel for Jfet {
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
