//! Integration tests for ember-core primitives.
//!
//! Signal-level measurements across modules: oversampler round trips,
//! filter responses measured with sine waves, smoother timing, and the
//! omega solver feeding a diode-style equation.

use ember_core::{
    Biquad, LinearSmoothedParam, Oversampler, OversamplingFactor, PipelineConfig, db_to_linear,
    drive_filter, high_shelf, highpass, lowpass, omega, peaking,
};

const TAU: f32 = core::f32::consts::TAU;

/// Generate a sine wave buffer at the given frequency and sample rate.
fn generate_sine(freq_hz: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| libm::sinf(TAU * freq_hz * n as f32 / sample_rate))
        .collect()
}

/// Measure RMS amplitude of a signal buffer.
fn rms(signal: &[f32]) -> f32 {
    let sum_sq: f32 = signal.iter().map(|&s| s * s).sum();
    libm::sqrtf(sum_sq / signal.len() as f32)
}

/// Convert linear amplitude to dB.
fn to_db(linear: f32) -> f32 {
    20.0 * libm::log10f(linear.max(1e-10))
}

/// Runs `input` through `process_up` then `process_down` in blocks.
fn round_trip(os: &mut Oversampler, input: &[f32], block: usize) -> Vec<f32> {
    let mut output = vec![0.0_f32; input.len()];
    for (src, dst) in input.chunks(block).zip(output.chunks_mut(block)) {
        os.process_up(src);
        os.process_down(dst);
    }
    output
}

// ============================================================================
// 1. Oversampler
// ============================================================================

#[test]
fn oversampler_round_trip_100hz_at_44k1() {
    let sample_rate = 44100.0;
    let input = generate_sine(100.0, sample_rate, 44100);

    for factor in [OversamplingFactor::X2, OversamplingFactor::X4, OversamplingFactor::X8] {
        let mut os = Oversampler::new(factor);
        os.prepare(512);
        let output = round_trip(&mut os, &input, 512);

        // Skip the filter transient
        let settle = 4410;
        let error_db = to_db(rms(&output[settle..]) / rms(&input[settle..]));
        assert!(
            error_db.abs() < 0.5,
            "{factor:?}: round trip level error {error_db:.3} dB"
        );
    }
}

#[test]
fn oversampler_round_trip_is_a_short_delay() {
    let sample_rate = 44100.0;
    let input = generate_sine(100.0, sample_rate, 8820);
    let mut os = Oversampler::new(OversamplingFactor::X2);
    os.prepare(256);
    let output = round_trip(&mut os, &input, 256);

    // The best-aligned lag must be small and leave only a small residual.
    let settle = 2000;
    let (best_lag, best_err) = (0..16)
        .map(|lag| {
            let err: f32 = (settle..input.len())
                .map(|n| (output[n] - input[n - lag]).powi(2))
                .sum::<f32>()
                / (input.len() - settle) as f32;
            (lag, err.sqrt())
        })
        .fold((0, f32::MAX), |best, cur| if cur.1 < best.1 { cur } else { best });

    assert!(best_lag < 10, "group delay too long: {best_lag}");
    assert!(best_err < 0.02, "residual after alignment: {best_err}");
}

#[test]
fn oversampler_attenuates_near_nyquist_content_on_the_way_down() {
    // A tone at 0.9 of the oversampled Nyquist must not fold back at full level.
    let base_rate = 48000.0;
    let mut os = Oversampler::new(OversamplingFactor::X2);
    os.prepare(256);

    let high = generate_sine(0.45 * 2.0 * base_rate, 2.0 * base_rate, 512 * 2 * 8);
    let mut out = vec![0.0_f32; 256];
    let mut collected = Vec::new();
    for chunk in high.chunks(512) {
        let up = os.process_up(&[0.0; 256]);
        up.copy_from_slice(chunk);
        os.process_down(&mut out);
        collected.extend_from_slice(&out);
    }
    let level = rms(&collected[512..]);
    assert!(to_db(level / core::f32::consts::FRAC_1_SQRT_2) < -30.0, "leak {level}");
}

#[test]
fn oversampler_block_sizes_follow_config() {
    let config = PipelineConfig::new(48000.0, 128, 2, OversamplingFactor::X4).unwrap();
    let mut os = Oversampler::new(config.oversampling());
    os.prepare(config.max_block_size());
    assert_eq!(os.max_block_size(), 128);
    assert_eq!(os.process_up(&[0.0; 128]).len(), config.oversampled_block_size());
    assert_eq!(os.process_up(&[0.0; 100]).len(), 400);
}

// ============================================================================
// 2. Filter frequency responses
// ============================================================================

/// Feed a sine through a filter and return the settled gain in dB.
fn measure_biquad_response(biquad: &mut Biquad, freq_hz: f32, sample_rate: f32) -> f32 {
    let num_samples = (sample_rate * 0.2) as usize;
    let settle = num_samples / 2;
    let input = generate_sine(freq_hz, sample_rate, num_samples);
    let mut output = input.clone();
    biquad.clear();
    biquad.process_block(&mut output);
    to_db(rms(&output[settle..]) / rms(&input[settle..]))
}

#[test]
fn lowpass_and_highpass_split_the_band() {
    let sr = 48000.0;
    let mut lp = Biquad::with_coefficients(lowpass(1000.0, 0.707, sr));
    let mut hp = Biquad::with_coefficients(highpass(1000.0, 0.707, sr));

    assert!(measure_biquad_response(&mut lp, 100.0, sr).abs() < 0.5);
    assert!(measure_biquad_response(&mut lp, 8000.0, sr) < -30.0);
    assert!(measure_biquad_response(&mut hp, 8000.0, sr).abs() < 0.5);
    assert!(measure_biquad_response(&mut hp, 100.0, sr) < -30.0);

    let at_cutoff = measure_biquad_response(&mut lp, 1000.0, sr);
    assert!((at_cutoff + 3.0).abs() < 0.5, "lowpass at cutoff: {at_cutoff:.2} dB");
}

#[test]
fn peaking_and_shelf_hit_their_gains() {
    let sr = 96000.0;
    let mut peak = Biquad::with_coefficients(peaking(800.0, 0.707, db_to_linear(-12.0), sr));
    let measured = measure_biquad_response(&mut peak, 800.0, sr);
    assert!((measured + 12.0).abs() < 0.5, "peak: {measured:.2} dB");

    let mut shelf = Biquad::with_coefficients(high_shelf(500.0, 0.7, db_to_linear(-18.0), sr));
    let top = measure_biquad_response(&mut shelf, 15000.0, sr);
    assert!((top + 18.0).abs() < 1.0, "shelf top: {top:.2} dB");
    let bottom = measure_biquad_response(&mut shelf, 40.0, sr);
    assert!(bottom.abs() < 0.5, "shelf bottom: {bottom:.2} dB");
}

#[test]
fn drive_filter_boosts_the_mid_band_only() {
    let sr = 192000.0;
    let gain = db_to_linear(20.0);
    let mut drive = Biquad::with_coefficients(drive_filter(sr, 25.0, 3000.0, gain));

    let mid = measure_biquad_response(&mut drive, 275.0, sr);
    assert!(mid > 15.0, "mid band boost: {mid:.2} dB");
    let top = measure_biquad_response(&mut drive, 40000.0, sr);
    assert!(top < mid - 15.0, "top not reduced: {top:.2} dB");
}

// ============================================================================
// 3. Smoother timing
// ============================================================================

#[test]
fn smoother_lands_exactly_after_ceil_ramp_samples() {
    for sample_rate in [44100.0_f32, 48000.0, 44123.0, 96000.0] {
        let ramp = 0.05;
        let mut p = LinearSmoothedParam::new(0.0, sample_rate, ramp);
        p.set_target(0.731);
        let n = libm::ceilf(ramp * sample_rate) as usize;
        for _ in 0..n {
            p.advance();
        }
        assert_eq!(p.current(), 0.731, "sample rate {sample_rate}");
        assert!(!p.is_smoothing());
    }
}

#[test]
fn smoother_skip_matches_advance() {
    let mut a = LinearSmoothedParam::new(1.0, 48000.0, 0.05);
    let mut b = a.clone();
    a.set_target(-1.0);
    b.set_target(-1.0);

    for _ in 0..512 {
        a.advance();
    }
    b.skip(512);
    assert!((a.current() - b.current()).abs() < 1e-4);
}

// ============================================================================
// 4. Omega inside a diode equation
// ============================================================================

#[test]
fn omega_solves_a_shockley_resistor_loop() {
    // i·R + Vt·ln(i/Is + 1) = V, solved through W(e^x); check KVL on the result.
    let is = 1e-9_f64;
    let vt = 0.02585_f64;
    let r = 1000.0_f64;
    for v in [0.2_f64, 0.5, 1.0, 2.0] {
        let x = (is * r / vt).ln() + (v + is * r) / vt;
        let w = f64::from(omega(x as f32));
        let i = vt / r * w - is;
        let residual = i * r + vt * (i / is + 1.0).ln() - v;
        assert!(residual.abs() < 2e-3 * v.max(1.0), "V = {v}: residual {residual}");
    }
}
