//! Common-cathode triode stage as a wave digital filter.
//!
//! The linear network (input coupling capacitor with its grid resistors,
//! bypassed cathode resistor, plate load with output coupling capacitor)
//! is decomposed into adaptors whose reflection coefficients are computed
//! once from component values and sample rate. Each sample, the three
//! capacitor states produce incident waves at the grid, cathode and plate
//! ports; the nonlinear triode junction returns the reflected waves in
//! closed form, and the states are updated from them.
//!
//! The junction solves a quadratic plate-current law. When the tube is
//! driven into cutoff, or when the conducting root would imply a negative
//! plate-cathode voltage, it falls back to the reflection of an open
//! circuit (cutoff) or a symmetric clamp.
//!
//! State and coefficients are `f64`: the plate sits at ~147 V while signal
//! detail lives in millivolts.

use libm::sqrt;

use crate::model::CircuitModel;

/// Tube and circuit constants.
mod values {
    pub const KP: f64 = 1.014e-5;
    pub const KP2: f64 = 5.498e-8;
    pub const KPG: f64 = 1.076e-5;
    /// Plate supply (V).
    pub const E: f64 = 250.0;
    pub const RI: f64 = 1e6;
    pub const RG: f64 = 20e3;
    pub const CK: f64 = 10e-6;
    pub const CO: f64 = 10e-9;
    pub const RP: f64 = 100e3;
    pub const RO: f64 = 1e6;
    pub const RK: f64 = 1e3;
    pub const CI: f64 = 100e-9;
    /// Source resistance of the input voltage source.
    pub const RVI: f64 = 1e-6;
    /// Output trim bringing the stage's gain into line with the other voices.
    pub const OUTPUT_PADDING: f64 = -2.0 / 27.0;
}

use values::*;

/// Capacitor wave states of the three coupling/bypass networks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriodeState {
    /// Input coupling capacitor.
    pub ci: f64,
    /// Cathode bypass capacitor.
    pub ck: f64,
    /// Output coupling capacitor.
    pub co: f64,
}

/// Reflected waves at the junction ports.
#[derive(Debug, Clone, Copy)]
struct Reflected {
    grid: f64,
    cathode: f64,
    plate: f64,
}

/// 12AX7-style common-cathode stage.
#[derive(Debug, Clone, Copy)]
pub struct Triode {
    wpk_kt: f64,
    wsp_kl: f64,

    k_t_xci: f64,
    k_t_ck: f64,
    k_t_co: f64,
    k_t0: f64,
    k_y_t: f64,
    k_y_co: f64,
    k_y0: f64,
    k_ci_t: f64,
    k_ci_xci: f64,
    k_co_co: f64,
    k_co0: f64,

    bk_bp: f64,
    k_eta: f64,
    k_delta: f64,
    k_bp_s: f64,
    bp_ap_0: f64,
    bp_ak_0: f64,

    cathode_bias: f64,
    plate_bias: f64,
}

impl Triode {
    /// Derives every adaptor coefficient for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let fs = f64::from(sample_rate.max(ember_core::MIN_SAMPLE_RATE));

        let w_ci_r = 1.0 / (2.0 * fs * CI);
        let w_ck_r = 1.0 / (2.0 * fs * CK);
        let w_co_r = 1.0 / (2.0 * fs * CO);

        // Grid side: series (Vi, Ci), parallel with Ri, series with Rg.
        let wsi_kl = w_ci_r / (w_ci_r + RVI);
        let wsi_r = w_ci_r + RVI;
        let wpg_kt = wsi_r / (wsi_r + RI);
        let wpg_r = (wsi_r * RI) / (wsi_r + RI);
        let wsg_kl = RG / (RG + wpg_r);

        // Cathode: Rk parallel with Ck.
        let wpk_kt = w_ck_r / (RK + w_ck_r);
        let wpk_r = (RK * w_ck_r) / (RK + w_ck_r);

        // Plate: (Co series Ro) parallel with Rp.
        let wsp_kl = w_co_r / (w_co_r + RO);
        let wsp_r = w_co_r + RO;
        let wpp_kt = wsp_r / (wsp_r + RP);
        let wpp_r = (wsp_r * RP) / (wsp_r + RP);

        let bk_bp = wpk_r / wpp_r;
        let k_eta = 1.0 / (bk_bp * (0.5 * KPG + KP2) + KP2);

        // DC operating point of the cathode and plate.
        let k1 = KPG / (2.0 * KP2) + RP / RK + 1.0;
        let k2 = k1 * (KP / KP2 + 2.0 * E) * KP2;
        let k3 = RK * k2 + 1.0;
        let sign_k1 = if k1 >= 0.0 { 1.0 } else { -1.0 };
        let cathode_bias = (k3 - sign_k1 * sqrt(2.0 * k3 - 1.0)) / (2.0 * RK * k1 * k1 * KP2);
        let plate_bias = E - RP / RK * cathode_bias;

        Self {
            wpk_kt,
            wsp_kl,
            k_t_xci: 1.0 - wpg_kt,
            k_t_ck: 1.0 - wpk_kt,
            k_t_co: 1.0 - wpp_kt,
            k_t0: wpp_kt * E,
            k_y_t: 0.5 * (1.0 - wsp_kl),
            k_y_co: -0.5 * (1.0 - wsp_kl) * (1.0 + wpp_kt),
            k_y0: 0.5 * (1.0 - wsp_kl) * wpp_kt * E,
            k_ci_t: wsi_kl * (1.0 - wsg_kl),
            k_ci_xci: wsi_kl * ((1.0 - wpg_kt) * (wsg_kl + 1.0) - 2.0),
            k_co_co: 1.0 - wsp_kl * (1.0 + wpp_kt),
            k_co0: wsp_kl * wpp_kt * E,
            bk_bp,
            k_eta,
            k_delta: KP2 * k_eta * k_eta / (wpp_r + wpp_r),
            k_bp_s: k_eta * sqrt((KP2 + KP2) / wpp_r),
            bp_ap_0: (wpk_r - wpp_r) / (wpp_r + wpk_r),
            bp_ak_0: (wpp_r + wpp_r) / (wpp_r + wpk_r),
            cathode_bias,
            plate_bias,
        }
    }

    /// Quiescent `(cathode, plate)` voltages.
    pub fn bias_voltages(&self) -> (f64, f64) {
        (self.cathode_bias, self.plate_bias)
    }

    /// Nonlinear junction: incident waves in, reflected waves out.
    fn junction(&self, ag: f64, ak: f64, ap: f64) -> Reflected {
        let v1 = 0.5 * ap;
        let v2 = ak + v1 * self.bk_bp;
        let alpha = KPG * (ag - v2) + KP;
        let beta = KP2 * (v1 - v2);
        let eta = self.k_eta * (beta + beta + alpha);
        let v3 = eta + self.k_delta;
        let delta = ap + v3;

        let (mut bp, bk, vpk) = if delta >= 0.0 {
            let bp = self.k_bp_s * sqrt(delta) - v3 - self.k_delta;
            let d = self.bk_bp * (ap - bp);
            let bk = ak + d;
            let vpk2 = ap + bp - ak - bk;
            if KPG * (ag - ak - 0.5 * d) + KP2 * vpk2 + KP < 0.0 {
                (ap, ak, ap - ak)
            } else {
                (bp, bk, 0.5 * vpk2)
            }
        } else {
            (ap, ak, ap - ak)
        };

        if vpk < 0.0 {
            bp = self.bp_ap_0 * ap + self.bp_ak_0 * ak;
        }

        Reflected {
            grid: ag,
            cathode: bk,
            plate: bp,
        }
    }

    /// One sample in `f64`.
    pub fn step_f64(&self, state: TriodeState, input: f64) -> (f64, TriodeState) {
        let x_ci = input + state.ci;
        let ag = self.k_t_xci * x_ci;
        let ak = self.k_t_ck * state.ck;
        let ap = self.k_t_co * state.co + self.k_t0;

        let waves = self.junction(ag, ak, ap);

        let vout = self.k_y_t * waves.plate + self.k_y_co * state.co + self.k_y0;
        let next = TriodeState {
            ci: self.k_ci_t * waves.grid + self.k_ci_xci * x_ci + state.ci,
            ck: waves.cathode - self.wpk_kt * state.ck,
            co: self.wsp_kl * waves.plate + self.k_co_co * state.co + self.k_co0,
        };
        (OUTPUT_PADDING * vout, next)
    }
}

impl CircuitModel for Triode {
    type State = TriodeState;

    fn initial_state(&self) -> TriodeState {
        TriodeState {
            ci: 0.0,
            ck: self.cathode_bias,
            co: self.plate_bias,
        }
    }

    #[inline]
    fn step(&self, state: TriodeState, input: f32) -> (f32, TriodeState) {
        let (y, next) = self.step_f64(state, f64::from(input));
        (y as f32, next)
    }

    /// The output is AC-coupled, so the stage rests at 0 V.
    fn dc_operating_point(&self) -> f32 {
        0.0
    }
}
