//! Property-based tests for ember-core primitives.
//!
//! Filter stability, smoother convergence, omega accuracy and oversampler
//! boundedness under randomized inputs.

use ember_core::{
    Biquad, LinearSmoothedParam, Oversampler, OversamplingFactor, bandpass, highpass, lowpass,
    notch, omega, peaking,
};
use proptest::prelude::*;

/// Biquad designers indexed 0..5 (LP, HP, BP, Notch, Peak).
fn configure_biquad(variant: usize, freq: f32, q: f32) -> Biquad {
    let sr = 48000.0;
    let coefficients = match variant % 5 {
        0 => lowpass(freq, q, sr),
        1 => highpass(freq, q, sr),
        2 => bandpass(freq, q, sr),
        3 => notch(freq, q, sr),
        4 => peaking(freq, q, 4.0, sr),
        _ => unreachable!(),
    };
    Biquad::with_coefficients(coefficients)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any designed section stays finite for random bounded input.
    #[test]
    fn biquad_stability(
        freq in 20.0f32..20000.0f32,
        q in 0.1f32..10.0f32,
        variant in 0usize..5,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut biquad = configure_biquad(variant, freq, q);
        for _ in 0..32 {
            for &sample in &input {
                let out = biquad.process(sample);
                prop_assert!(out.is_finite(), "variant {} f={} q={} -> {}", variant, freq, q, out);
            }
        }
    }

    /// The residual `w·e^w - e^x` stays within 1e-3 relative over the
    /// documented accuracy domain.
    #[test]
    fn omega_residual(x in -30.0f32..=40.0f32) {
        let w = f64::from(omega(x));
        let residual = (w * (w - f64::from(x)).exp() - 1.0).abs();
        prop_assert!(residual < 1e-3, "x = {}, residual = {}", x, residual);
    }

    /// A ramp never overshoots and lands exactly on target.
    #[test]
    fn smoother_reaches_target_without_overshoot(
        start in -10.0f32..10.0f32,
        target in -10.0f32..10.0f32,
        sample_rate in 8000.0f32..192000.0f32,
    ) {
        let mut p = LinearSmoothedParam::new(start, sample_rate, 0.05);
        p.set_target(target);
        let (lo, hi) = if start < target { (start, target) } else { (target, start) };
        let steps = p.ramp_samples();
        for _ in 0..steps {
            let v = p.advance();
            prop_assert!(v >= lo - 1e-3 && v <= hi + 1e-3, "{} outside [{}, {}]", v, lo, hi);
        }
        prop_assert_eq!(p.current(), target);
    }

    /// Retargeting mid-ramp continues from the current value.
    #[test]
    fn smoother_retarget_is_continuous(
        first in -1.0f32..1.0f32,
        second in -1.0f32..1.0f32,
        split in 1usize..2000,
    ) {
        let mut p = LinearSmoothedParam::new(0.0, 48000.0, 0.05);
        p.set_target(first);
        let before = p.skip(split);
        p.set_target(second);
        let after = p.advance();
        let ramp = p.ramp_samples() as f32;
        let max_step = first.abs().max((second - before).abs()) / ramp;
        prop_assert!((after - before).abs() <= max_step + 1e-6);
    }

    /// Up/down round trips of bounded signals stay bounded.
    #[test]
    fn oversampler_bounded(
        input in prop::collection::vec(-1.0f32..=1.0f32, 1..256),
        factor in prop_oneof![
            Just(OversamplingFactor::X2),
            Just(OversamplingFactor::X4),
            Just(OversamplingFactor::X8),
        ],
    ) {
        let mut os = Oversampler::new(factor);
        os.prepare(256);
        let mut block = input.clone();
        for _ in 0..4 {
            block.copy_from_slice(&input);
            for s in os.process_up(&block).iter() {
                prop_assert!(s.abs() < 8.0);
            }
            os.process_down(&mut block);
            for s in &block {
                prop_assert!(s.is_finite() && s.abs() < 8.0);
            }
        }
    }
}
