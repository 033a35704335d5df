//! Wright omega function: `w = W(e^x)`, the solution of `w + ln(w) = x`.
//!
//! Every diode, tube and op-amp model that ends up with an implicit
//! exponential equation is rewritten so the unknown appears as
//! `W(e^{affine(state, input)})`. This module is the single shared solver
//! for that form.
//!
//! Two regimes:
//!
//! - `|x| <= 1.5`: a fixed 5th-order polynomial fitted offline against the
//!   true function. Below `-1.0` the fit drifts (residual up to ~4e-3 at
//!   `-1.5`), so there it is only a seed for one logarithmic Newton step.
//! - `|x| > 1.5`: a piecewise cubic / asymptotic seed ([`omega3`]), one
//!   seed-refinement step ([`omega4`]) and one logarithmic Newton step.
//!
//! # Accuracy
//!
//! The residual `|w·e^w - e^x| / e^x` stays below `1e-3` for
//! `x ∈ [-30, 40]`.

use libm::{expf, logf};

/// Branch point between the polynomial and the refined asymptotic form.
pub const POLYNOMIAL_LIMIT: f32 = 1.5;

/// Below this input the polynomial is refined by a Newton step.
const POLYNOMIAL_EXACT_LOWER: f32 = -1.0;

/// Below this input the cubic seed returns 0 (`W(e^x) ≈ e^x` there).
const SEED_LOWER: f32 = -3.341_459_552_768_620;
/// Above this input the seed switches to the asymptotic `x - ln x`.
const SEED_UPPER: f32 = 8.0;

const SEED_A: f32 = -1.314_293_149_877_800e-3;
const SEED_B: f32 = 4.775_931_364_975_583e-2;
const SEED_C: f32 = 3.631_952_663_804_445e-1;
const SEED_D: f32 = 6.313_183_464_296_682e-1;

const POLY: [f32; 6] = [
    0.567_143_290_409_783_8,
    0.361_896_323_609_802_3,
    0.073_677_846_377_983_6,
    -0.001_343_734_688_913_5,
    -0.001_635_543_788_934_4,
    0.000_216_654_273_434_6,
];

/// Piecewise seed: zero, cubic, then `x - ln x`.
#[inline]
pub fn omega3(x: f32) -> f32 {
    if x < SEED_LOWER {
        0.0
    } else if x < SEED_UPPER {
        SEED_D + x * (SEED_C + x * (SEED_B + x * SEED_A))
    } else {
        x - logf(x)
    }
}

/// [`omega3`] followed by one refinement step `y - (y - e^{x-y}) / (y + 1)`.
#[inline]
pub fn omega4(x: f32) -> f32 {
    let y = omega3(x);
    y - (y - expf(x - y)) / (y + 1.0)
}

/// Fast approximation of `W(e^x)`.
///
/// Stateless and allocation free; safe to call from any model on the audio
/// thread.
#[inline]
pub fn omega(x: f32) -> f32 {
    if x.abs() > POLYNOMIAL_LIMIT {
        log_newton(omega4(x), x)
    } else {
        let w =
            POLY[0] + x * (POLY[1] + x * (POLY[2] + x * (POLY[3] + x * (POLY[4] + x * POLY[5]))));
        if x < POLYNOMIAL_EXACT_LOWER { log_newton(w, x) } else { w }
    }
}

/// One Newton step on `w + ln w = x`. Non-positive seeds are returned as is.
#[inline]
fn log_newton(w: f32, x: f32) -> f32 {
    if w <= 0.0 {
        return w;
    }
    w - (w + logf(w) - x) * w / (w + 1.0)
}
