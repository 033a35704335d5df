//! Integration tests for ember-voices.
//!
//! Full pipelines driven the way a host drives them: prepared once, fed
//! fixed-size blocks, controls changed from a handle between blocks.

use ember_circuits::CircuitKind;
use ember_core::{OversamplingFactor, PipelineConfig, Stage};
use ember_voices::{
    AmpEq, CircuitStage, Compressor, CompressorKind, Engine, Fuzz, Voice, VoiceKind, compressor,
    engine, find_param, fuzz,
};

const TAU: f32 = core::f32::consts::TAU;

fn generate_sine(freq_hz: f32, amplitude: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| amplitude * libm::sinf(TAU * freq_hz * n as f32 / sample_rate))
        .collect()
}

fn rms(signal: &[f32]) -> f32 {
    let sum_sq: f32 = signal.iter().map(|&s| s * s).sum();
    libm::sqrtf(sum_sq / signal.len() as f32)
}

fn peak(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
}

fn run_blocks(stage: &mut (impl Stage + ?Sized), signal: &mut [f32], block: usize) {
    for chunk in signal.chunks_mut(block) {
        stage.process_mono(chunk);
    }
}

#[test]
fn fuzz_end_to_end_stays_in_range() {
    let config = PipelineConfig::new(48000.0, 512, 1, OversamplingFactor::X1).unwrap();
    let mut pedal = Fuzz::new(&config);
    pedal.controls().set(fuzz::TONE, 5.0);
    pedal.controls().set(fuzz::SUSTAIN, 5.0);
    pedal.controls().set(fuzz::MIX, 1.0);
    pedal.controls().set(fuzz::LEVEL, 1.0);
    pedal.reset();

    let input = generate_sine(1000.0, 1.0, 48000.0, 48000);
    let mut output = input.clone();
    run_blocks(&mut pedal, &mut output, 512);

    assert!(output.iter().all(|s| s.is_finite()));
    assert!(peak(&output) <= 1.0, "peak {}", peak(&output));
    let out_rms = rms(&output[4800..]);
    assert!(out_rms < rms(&input), "rms {out_rms}");
    assert!(out_rms > 0.005, "rms {out_rms}");
}

#[test]
fn bypass_leaves_buffers_untouched() {
    let config = PipelineConfig::default();
    let input = generate_sine(220.0, 0.8, 48000.0, 2048);

    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(Fuzz::new(&config)),
        Box::new(Voice::new(VoiceKind::Borealis, &config)),
        Box::new(Voice::new(VoiceKind::Helios, &config)),
        Box::new(Voice::new(VoiceKind::Nebula, &config)),
        Box::new(Compressor::new(&config)),
        Box::new(AmpEq::new(&config)),
        Box::new(CircuitStage::new(CircuitKind::Triode, &config)),
        Box::new(Engine::new(&config)),
    ];
    for stage in &mut stages {
        stage.set_bypassed(true);
        let mut block = input.clone();
        run_blocks(stage.as_mut(), &mut block, 512);
        assert_eq!(block, input);
    }
}

fn stage_set(config: &PipelineConfig) -> Vec<(&'static str, Box<dyn Stage>)> {
    let fuzz: Box<dyn Stage> = Box::new(Fuzz::new(config));
    let compressor: Box<dyn Stage> = Box::new(Compressor::new(config));
    let amp_eq: Box<dyn Stage> = Box::new(AmpEq::new(config));
    let mut stages = vec![("fuzz", fuzz), ("compressor", compressor), ("amp_eq", amp_eq)];
    for kind in VoiceKind::ALL {
        let voice: Box<dyn Stage> = Box::new(Voice::new(kind, config));
        stages.push((kind.name(), voice));
    }
    stages
}

#[test]
fn bypass_freezes_stage_state() {
    let config = PipelineConfig::default();
    let first = generate_sine(220.0, 0.8, 48000.0, 2048);
    let skipped = generate_sine(1750.0, 0.9, 48000.0, 2048);
    let resumed = generate_sine(440.0, 0.6, 48000.0, 2048);

    for ((name, mut paused), (_, mut reference)) in
        stage_set(&config).into_iter().zip(stage_set(&config))
    {
        let mut a = first.clone();
        let mut b = first.clone();
        run_blocks(paused.as_mut(), &mut a, 512);
        run_blocks(reference.as_mut(), &mut b, 512);

        paused.set_bypassed(true);
        let mut ignored = skipped.clone();
        run_blocks(paused.as_mut(), &mut ignored, 512);
        assert_eq!(ignored, skipped, "{name}");
        paused.set_bypassed(false);

        let mut a = resumed.clone();
        let mut b = resumed.clone();
        run_blocks(paused.as_mut(), &mut a, 512);
        run_blocks(reference.as_mut(), &mut b, 512);
        assert_eq!(a, b, "{name} did not resume where it stopped");
    }
}

#[test]
fn dry_mix_keeps_the_input_level() {
    let config = PipelineConfig::default();
    for kind in VoiceKind::ALL {
        let mut voice = Voice::new(kind, &config);
        let mix = find_param(voice.controls().specs(), "mix").unwrap();
        voice.controls().set(mix, 0.0);
        voice.reset();

        let input = generate_sine(440.0, 0.5, 48000.0, 9600);
        let mut output = input.clone();
        run_blocks(&mut voice, &mut output, 256);
        let ratio_db = 20.0 * libm::log10f(rms(&output[4800..]) / rms(&input[4800..]));
        assert!(ratio_db.abs() < 0.5, "{kind}: {ratio_db} dB");
    }
}

#[test]
fn engine_switches_voices_between_blocks() {
    let config = PipelineConfig::default();
    let mut chain = Engine::new(&config);
    let handle = chain.handle();

    let control = std::thread::spawn({
        let handle = handle.clone();
        move || {
            handle.select_voice(VoiceKind::Nebula);
            assert!(handle.set("nebula.drive", 8.0));
        }
    });
    control.join().unwrap();

    let mut block = generate_sine(330.0, 0.5, 48000.0, 512);
    chain.process_mono(&mut block);
    assert_eq!(chain.active_voice(), VoiceKind::Nebula);
    assert!(block.iter().all(|s| s.is_finite()));

    handle.select_voice(VoiceKind::Helios);
    for _ in 0..4 {
        let mut block = generate_sine(330.0, 0.5, 48000.0, 512);
        chain.process_mono(&mut block);
        assert!(block.iter().all(|s| s.is_finite()));
    }
    assert_eq!(chain.active_voice(), VoiceKind::Helios);
    assert_eq!(handle.voice(), VoiceKind::Helios);
}

#[test]
fn engine_compressor_meters_through_the_handle() {
    let config = PipelineConfig::default();
    let mut chain = Engine::new(&config);
    let handle = chain.handle();
    assert!(handle.set_bypassed("compressor", false));
    handle.select_compressor(CompressorKind::Vca);
    handle.compressor().set(compressor::THRESHOLD, -30.0);
    handle.compressor().set(compressor::RATIO, 10.0);
    chain.reset();

    let mut signal = generate_sine(200.0, 0.9, 48000.0, 9600);
    run_blocks(&mut chain, &mut signal, 512);
    assert!(handle.gain_reduction_db() < -3.0, "{}", handle.gain_reduction_db());
}

#[test]
fn engine_output_mute() {
    let config = PipelineConfig::default();
    let mut chain = Engine::new(&config);
    let handle = chain.handle();
    handle.engine().set(engine::OUTPUT, -60.0);
    chain.reset();

    let mut signal = generate_sine(440.0, 0.5, 48000.0, 4800);
    run_blocks(&mut chain, &mut signal, 480);
    assert!(peak(&signal[2400..]) < 0.01, "{}", peak(&signal[2400..]));
}

#[test]
fn stereo_channels_are_independent() {
    let config = PipelineConfig::new(48000.0, 256, 2, OversamplingFactor::X1).unwrap();
    let mut voice = Voice::new(VoiceKind::Borealis, &config);

    let mut right = vec![0.0_f32; 256];
    let mut left_peak = 0.0_f32;
    let mut right_peak = 0.0_f32;
    for _ in 0..8 {
        let mut left = generate_sine(440.0, 0.5, 48000.0, 256);
        right.fill(0.0);
        let mut channels: [&mut [f32]; 2] = [left.as_mut_slice(), right.as_mut_slice()];
        voice.process(&mut channels);
        left_peak = left_peak.max(peak(&left));
        right_peak = right_peak.max(peak(&right));
    }
    assert!(left_peak > 1e-3);
    assert!(right_peak < 1e-3, "{right_peak}");
}
