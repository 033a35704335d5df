//! Bipolar-transistor emitter follower.
//!
//! The follower's transfer relation, with the emitter resistor in series
//! with the base-emitter junction, inverts through the same `W(e^x)`
//! primitive as the diode models. Inputs at or above the supply take a
//! saturation branch with the collector junction fully on.

use ember_core::omega;
use libm::{expf, logf};

use crate::model::CircuitModel;

const SUPPLY: f32 = 9.0;
const THERMAL_VOLTAGE: f32 = 0.026;
const SATURATION_CURRENT: f32 = 1e-16;
const BETA_F: f32 = 100.0;
const EMITTER_RESISTANCE: f32 = 1000.0;

/// Emitter follower biased at half supply. Input and output are AC-coupled
/// around that bias, so the stage swings between roughly -4.5 V and
/// +3.7 V.
#[derive(Debug, Clone, Copy)]
pub struct BjtFollower {
    k: f32,
    v_ref: f32,
    saturated_vx: f32,
}

impl BjtFollower {
    /// Creates the follower with its fixed component values.
    pub fn new() -> Self {
        let is_re = SATURATION_CURRENT * EMITTER_RESISTANCE;
        Self {
            k: logf((is_re / THERMAL_VOLTAGE) * (1.0 + 1.0 / BETA_F)),
            v_ref: SUPPLY / 2.0,
            saturated_vx: is_re * (1.0 + 1.0 / BETA_F),
        }
    }

    /// Static transfer for an input relative to the bias point.
    #[inline]
    pub fn transfer(&self, input: f32) -> f32 {
        let vin = input + self.v_ref;
        if vin >= SUPPLY {
            let x = (SUPPLY + self.saturated_vx) / THERMAL_VOLTAGE + self.k;
            let v_out = THERMAL_VOLTAGE * omega(x) - self.saturated_vx;
            return v_out - self.v_ref;
        }
        let v_x = SATURATION_CURRENT
            * EMITTER_RESISTANCE
            * (expf((vin - SUPPLY) / THERMAL_VOLTAGE) + 1.0 / BETA_F);
        let v_out = THERMAL_VOLTAGE * omega((vin + v_x) / THERMAL_VOLTAGE + self.k) - v_x;
        v_out - self.v_ref
    }
}

impl Default for BjtFollower {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitModel for BjtFollower {
    type State = ();

    fn initial_state(&self) {}

    #[inline]
    fn step(&self, _state: (), input: f32) -> (f32, ()) {
        (self.transfer(input), ())
    }

    fn dc_operating_point(&self) -> f32 {
        self.transfer(0.0)
    }
}
