//! Second-order IIR sections and their coefficient designers.
//!
//! Coefficients are a normalized 5-tuple ([`BiquadCoefficients`]) so that a
//! stage can redesign them once per block while its governing parameter is
//! ramping and hand them to the filter without renormalizing.
//!
//! The standard responses follow the RBJ Audio EQ Cookbook. Peak and shelf
//! gains are linear factors, not decibels. [`drive_filter`] is the bilinear
//! transform of a broad band-pass-with-boost used in front of clipping
//! stages.

use core::f32::consts::PI;
use libm::{cosf, sinf, sqrtf};

/// Default Q for second-order Butterworth responses.
pub const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    /// Feedforward x[n]
    pub b0: f32,
    /// Feedforward x[n-1]
    pub b1: f32,
    /// Feedforward x[n-2]
    pub b2: f32,
    /// Feedback y[n-1]
    pub a1: f32,
    /// Feedback y[n-2]
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Passthrough.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalizes a raw 6-coefficient design by `a0`.
    pub fn from_raw(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }

    /// Magnitude response at `frequency`.
    pub fn magnitude_at(&self, frequency: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (cosf(w), sinf(w));
        let (c2, s2) = (cosf(2.0 * w), sinf(2.0 * w));

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        sqrtf((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im))
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Direct Form I biquad section.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coefficients: BiquadCoefficients,

    /// Input delay line: x[n-1], x[n-2]
    x1: f32,
    x2: f32,

    /// Output delay line: y[n-1], y[n-2]
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a passthrough section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a section with the given coefficients.
    pub fn with_coefficients(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            ..Self::default()
        }
    }

    /// Swaps in new coefficients, keeping the delay lines.
    #[inline]
    pub fn set_coefficients(&mut self, coefficients: BiquadCoefficients) {
        self.coefficients = coefficients;
    }

    /// Current coefficients.
    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coefficients
    }

    /// Processes a single sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coefficients;
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = crate::math::flush_denormal(output);

        output
    }

    /// Filters a block in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clears the delay lines without touching the coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

struct Prototype {
    cos_w: f32,
    alpha: f32,
    sin_w: f32,
}

fn prototype(frequency: f32, q: f32, sample_rate: f32) -> Prototype {
    let nyquist_guard = 0.49 * sample_rate;
    let frequency = frequency.clamp(1.0, nyquist_guard.max(1.0));
    let q = q.max(1e-3);
    let w = 2.0 * PI * frequency / sample_rate;
    let sin_w = sinf(w);
    Prototype {
        cos_w: cosf(w),
        alpha: sin_w / (2.0 * q),
        sin_w,
    }
}

/// Low-pass.
pub fn lowpass(frequency: f32, q: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    let b1 = 1.0 - p.cos_w;
    BiquadCoefficients::from_raw(
        b1 / 2.0,
        b1,
        b1 / 2.0,
        1.0 + p.alpha,
        -2.0 * p.cos_w,
        1.0 - p.alpha,
    )
}

/// High-pass.
pub fn highpass(frequency: f32, q: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    let b0 = (1.0 + p.cos_w) / 2.0;
    BiquadCoefficients::from_raw(
        b0,
        -(1.0 + p.cos_w),
        b0,
        1.0 + p.alpha,
        -2.0 * p.cos_w,
        1.0 - p.alpha,
    )
}

/// Band-pass with 0 dB peak gain.
pub fn bandpass(frequency: f32, q: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    BiquadCoefficients::from_raw(
        p.alpha,
        0.0,
        -p.alpha,
        1.0 + p.alpha,
        -2.0 * p.cos_w,
        1.0 - p.alpha,
    )
}

/// Notch (band-reject).
pub fn notch(frequency: f32, q: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    BiquadCoefficients::from_raw(
        1.0,
        -2.0 * p.cos_w,
        1.0,
        1.0 + p.alpha,
        -2.0 * p.cos_w,
        1.0 - p.alpha,
    )
}

/// Peaking EQ; `gain` is the linear factor at the centre frequency.
pub fn peaking(frequency: f32, q: f32, gain: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    let a = sqrtf(gain.max(0.0));
    BiquadCoefficients::from_raw(
        1.0 + p.alpha * a,
        -2.0 * p.cos_w,
        1.0 - p.alpha * a,
        1.0 + p.alpha / a.max(1e-6),
        -2.0 * p.cos_w,
        1.0 - p.alpha / a.max(1e-6),
    )
}

/// Low shelf; `gain` is the linear factor below the corner.
pub fn low_shelf(frequency: f32, q: f32, gain: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    let a = sqrtf(gain.max(1e-6));
    let beta = p.sin_w * sqrtf(a) / q.max(1e-3);
    let (ap1, am1) = (a + 1.0, a - 1.0);
    BiquadCoefficients::from_raw(
        a * (ap1 - am1 * p.cos_w + beta),
        2.0 * a * (am1 - ap1 * p.cos_w),
        a * (ap1 - am1 * p.cos_w - beta),
        ap1 + am1 * p.cos_w + beta,
        -2.0 * (am1 + ap1 * p.cos_w),
        ap1 + am1 * p.cos_w - beta,
    )
}

/// High shelf; `gain` is the linear factor above the corner.
pub fn high_shelf(frequency: f32, q: f32, gain: f32, sample_rate: f32) -> BiquadCoefficients {
    let p = prototype(frequency, q, sample_rate);
    let a = sqrtf(gain.max(1e-6));
    let beta = p.sin_w * sqrtf(a) / q.max(1e-3);
    let (ap1, am1) = (a + 1.0, a - 1.0);
    BiquadCoefficients::from_raw(
        a * (ap1 + am1 * p.cos_w + beta),
        -2.0 * a * (am1 + ap1 * p.cos_w),
        a * (ap1 + am1 * p.cos_w - beta),
        ap1 - am1 * p.cos_w + beta,
        2.0 * (am1 - ap1 * p.cos_w),
        ap1 - am1 * p.cos_w - beta,
    )
}

/// Broad band-pass with a boost of roughly `1 + gain` between the corners.
///
/// Bilinear transform of
/// `(τh·τl·s² + (τh·(1+gain) + τl)·s + 1) / (τh·τl·s² + (τh + τl)·s + 1)`
/// with `τ = 1 / (2π·f)`. Unity at DC and at Nyquist.
pub fn drive_filter(sample_rate: f32, f_hpf: f32, f_lpf: f32, gain: f32) -> BiquadCoefficients {
    let tau_h = 1.0 / (2.0 * PI * f_hpf.max(1.0));
    let tau_l = 1.0 / (2.0 * PI * f_lpf.max(1.0));

    let a2s = tau_h * tau_l;
    let a1s = tau_h + tau_l;
    let a0s = 1.0;
    let b2s = tau_h * tau_l;
    let b1s = tau_h * (1.0 + gain) + tau_l;
    let b0s = 1.0;

    let k = 2.0 * sample_rate;
    let k2 = k * k;

    BiquadCoefficients::from_raw(
        b2s * k2 + b1s * k + b0s,
        2.0 * (b0s - b2s * k2),
        b2s * k2 - b1s * k + b0s,
        a2s * k2 + a1s * k + a0s,
        2.0 * (a0s - a2s * k2),
        a2s * k2 - a1s * k + a0s,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::db_to_linear;

    const SR: f32 = 48000.0;

    #[test]
    fn passthrough_by_default() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let input = i as f32 * 0.1;
            assert!((biquad.process(input) - input).abs() < 1e-6);
        }
    }

    #[test]
    fn clear_resets_state() {
        let mut biquad = Biquad::with_coefficients(lowpass(1000.0, BUTTERWORTH_Q, SR));
        for _ in 0..10 {
            biquad.process(1.0);
        }
        biquad.clear();
        assert_eq!(biquad.x1, 0.0);
        assert_eq!(biquad.y2, 0.0);
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut biquad = Biquad::with_coefficients(lowpass(1000.0, BUTTERWORTH_Q, SR));
        let mut out = 0.0;
        for _ in 0..2000 {
            out = biquad.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-3);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut biquad = Biquad::with_coefficients(highpass(100.0, BUTTERWORTH_Q, SR));
        let mut out = 1.0;
        for _ in 0..48000 {
            out = biquad.process(1.0);
        }
        assert!(out.abs() < 1e-3);
    }

    #[test]
    fn butterworth_corner_is_minus_3_db() {
        let c = lowpass(1000.0, BUTTERWORTH_Q, SR);
        assert!((c.magnitude_at(1000.0, SR) - core::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        let c = highpass(1000.0, BUTTERWORTH_Q, SR);
        assert!((c.magnitude_at(1000.0, SR) - core::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn peaking_gain_at_centre() {
        let c = peaking(800.0, 0.707, db_to_linear(-12.0), SR);
        assert!((c.magnitude_at(800.0, SR) - db_to_linear(-12.0)).abs() < 1e-3);
        assert!((c.magnitude_at(20.0, SR) - 1.0).abs() < 0.02);
    }

    #[test]
    fn shelves_reach_their_gain() {
        let gain = db_to_linear(6.0);
        let low = low_shelf(100.0, 0.707, gain, SR);
        assert!((low.magnitude_at(10.0, SR) - gain).abs() < 0.02);
        assert!((low.magnitude_at(10000.0, SR) - 1.0).abs() < 0.02);

        let high = high_shelf(5000.0, 0.707, gain, SR);
        assert!((high.magnitude_at(20000.0, SR) - gain).abs() < 0.05);
        assert!((high.magnitude_at(50.0, SR) - 1.0).abs() < 0.02);
    }

    #[test]
    fn notch_kills_centre() {
        let c = notch(1000.0, 2.0, SR);
        assert!(c.magnitude_at(1000.0, SR) < 1e-3);
    }

    #[test]
    fn bandpass_unity_peak() {
        let c = bandpass(1000.0, 1.0, SR);
        assert!((c.magnitude_at(1000.0, SR) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn drive_filter_boosts_band_only() {
        let gain = db_to_linear(20.0);
        let c = drive_filter(SR, 25.0, 3000.0, gain);
        assert!((c.magnitude_at(0.0, SR) - 1.0).abs() < 1e-2);
        let mid = c.magnitude_at(275.0, SR);
        assert!(mid > 0.8 * gain && mid < 1.2 * (1.0 + gain), "mid gain {mid}");
        assert!(c.magnitude_at(23000.0, SR) < 2.0);
    }

    #[test]
    fn extreme_frequencies_stay_finite() {
        for c in [
            lowpass(0.0, 0.707, SR),
            lowpass(1.0e6, 0.707, SR),
            highpass(-5.0, 0.0, SR),
        ] {
            assert!(c.b0.is_finite() && c.a1.is_finite() && c.a2.is_finite());
        }
    }
}
