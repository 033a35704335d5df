//! Scalar helpers shared by the circuit models and voices.
//!
//! All functions are allocation-free and `no_std`.

use libm::{expf, log1pf, logf};

/// Convert decibels to linear gain.
///
/// ```rust
/// use ember_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels, floored at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// `ln(cosh(x))` without overflowing for large `|x|`.
///
/// Uses `|x| + ln(1 + e^{-2|x|}) - ln 2`.
#[inline]
pub fn log_cosh(x: f32) -> f32 {
    let ax = x.abs();
    ax + log1pf(expf(-2.0 * ax)) - core::f32::consts::LN_2
}

/// Sign with `sign(0) = 0`.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Flush values below 1e-20 to zero to keep feedback paths out of the
/// subnormal range.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Crossfade: `dry * (1 - mix) + wet * mix`.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Maps a 0–10 knob position onto `[min, max]` linearly.
#[inline]
pub fn knob(value: f32, min: f32, max: f32) -> f32 {
    lerp(min, max, (value * 0.1).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::coshf;

    #[test]
    fn db_round_trip() {
        for db in [-40.0, -12.0, 0.0, 6.0, 36.0] {
            assert!((linear_to_db(db_to_linear(db)) - db).abs() < 1e-3);
        }
    }

    #[test]
    fn log_cosh_matches_direct_form() {
        for x in [-5.0, -1.0, -0.1, 0.0, 0.3, 2.0, 7.0] {
            let direct = logf(coshf(x));
            assert!((log_cosh(x) - direct).abs() < 1e-5, "x = {x}");
        }
    }

    #[test]
    fn log_cosh_survives_huge_arguments() {
        let y = log_cosh(1.0e4);
        assert!(y.is_finite());
        assert!((y - (1.0e4 - core::f32::consts::LN_2)).abs() < 1.0);
    }

    #[test]
    fn knob_clamps() {
        assert_eq!(knob(-1.0, 2.0, 4.0), 2.0);
        assert_eq!(knob(5.0, 2.0, 4.0), 3.0);
        assert_eq!(knob(20.0, 2.0, 4.0), 4.0);
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.2), -1.0);
        assert_eq!(sign(3.0), 1.0);
    }
}
