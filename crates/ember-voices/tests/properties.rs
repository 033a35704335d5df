//! Property-based tests for the voice pipelines.
//!
//! Arbitrary control settings and bounded input never produce NaN or
//! infinity, control writes always land inside their declared range, and
//! the compressor meter never reports gain.

use ember_core::{PipelineConfig, Stage};
use ember_voices::{Compressor, CompressorKind, Controls, Fuzz, Voice, VoiceKind, voice};
use proptest::prelude::*;

fn voice_strategy() -> impl Strategy<Value = VoiceKind> {
    (0..VoiceKind::ALL.len()).prop_map(|i| VoiceKind::ALL[i])
}

fn compressor_strategy() -> impl Strategy<Value = CompressorKind> {
    (0..CompressorKind::ALL.len()).prop_map(|i| CompressorKind::ALL[i])
}

/// Writes `fractions[i]` of each control's range.
fn set_fractions(controls: &Controls, fractions: &[f32]) {
    for (index, (spec, &t)) in controls.specs().iter().zip(fractions).enumerate() {
        controls.set(index, spec.min + t * (spec.max - spec.min));
    }
}

fn small_config() -> PipelineConfig {
    PipelineConfig::new(48000.0, 128, 1, ember_core::OversamplingFactor::X1)
        .unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every overdrive voice stays finite for any control setting.
    #[test]
    fn voices_are_finite(
        kind in voice_strategy(),
        fractions in prop::collection::vec(0.0f32..=1.0f32, 5),
        input in prop::collection::vec(-2.0f32..=2.0f32, 128..1024),
    ) {
        let mut voice = Voice::new(kind, &small_config());
        set_fractions(voice.controls(), &fractions);
        voice.reset();
        let mut block = input.clone();
        for chunk in block.chunks_mut(128) {
            voice.process_mono(chunk);
        }
        prop_assert!(block.iter().all(|s| s.is_finite()), "{}", kind);
    }

    /// The fuzz stays finite for any control setting, including while
    /// every control ramps.
    #[test]
    fn fuzz_is_finite_while_ramping(
        fractions in prop::collection::vec(0.0f32..=1.0f32, 4),
        input in prop::collection::vec(-2.0f32..=2.0f32, 128..1024),
    ) {
        let mut fuzz = Fuzz::new(&small_config());
        set_fractions(fuzz.controls(), &fractions);
        let mut block = input.clone();
        for chunk in block.chunks_mut(128) {
            fuzz.process_mono(chunk);
        }
        prop_assert!(block.iter().all(|s| s.is_finite()));
    }

    /// Compressors stay finite and the meter never reads above 0 dB.
    #[test]
    fn compressor_meter_reads_reduction(
        kind in compressor_strategy(),
        fractions in prop::collection::vec(0.0f32..=1.0f32, 4),
        input in prop::collection::vec(-2.0f32..=2.0f32, 128..1024),
    ) {
        let mut compressor = Compressor::new(&small_config());
        compressor.link().select(kind);
        set_fractions(compressor.controls(), &fractions);
        compressor.reset();
        let mut block = input.clone();
        for chunk in block.chunks_mut(128) {
            compressor.process_mono(chunk);
            prop_assert!(compressor.link().gain_reduction_db() <= 0.0);
        }
        prop_assert!(block.iter().all(|s| s.is_finite()), "{}", kind);
    }

    /// Writes outside a control's range land on the nearest bound.
    #[test]
    fn control_writes_are_clamped(
        kind in voice_strategy(),
        value in -1.0e4f32..=1.0e4f32,
    ) {
        let controls = Controls::new(kind.params());
        for (index, spec) in kind.params().iter().enumerate() {
            controls.set(index, value);
            let stored = controls.get(index);
            prop_assert!(stored >= spec.min && stored <= spec.max);
            if spec.contains(value) {
                prop_assert_eq!(stored, value);
            }
        }
    }

    /// Voice names round-trip through parsing regardless of case.
    #[test]
    fn voice_names_parse(kind in voice_strategy(), upper in any::<bool>()) {
        let name = if upper { kind.name().to_uppercase() } else { kind.name().to_string() };
        let parsed: VoiceKind = name.parse().map_err(|e: voice::ParseVoiceKindError| {
            TestCaseError::fail(e.to_string())
        })?;
        prop_assert_eq!(parsed, kind);
    }
}
