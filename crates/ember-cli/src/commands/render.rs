//! Render a synthetic tone and report levels.

use super::common::{Levels, load_settings, parse_key_val, tone};
use anyhow::Context;
use clap::Args;
use ember_config::{EngineSettings, StageSettings, circuit_kind};
use ember_core::{OversamplingFactor, PipelineConfig, Stage};
use ember_voices::{AmpEq, CircuitStage, Compressor, Controls, Engine, Fuzz, Voice, VoiceKind};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct RenderArgs {
    /// Engine settings file (TOML)
    #[arg(short, long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Render one stage instead of the whole engine
    /// (fuzz, borealis, helios, nebula, compressor, amp_eq)
    #[arg(long, conflicts_with = "circuit")]
    stage: Option<String>,

    /// Render a single circuit model (see `ember info circuits`)
    #[arg(long)]
    circuit: Option<String>,

    /// Oversampling ratio for --circuit (1, 2, 4 or 8)
    #[arg(long, requires = "circuit")]
    oversampling: Option<usize>,

    /// Select the overdrive voice (engine only)
    #[arg(long, conflicts_with_all = ["stage", "circuit"])]
    voice: Option<String>,

    /// Set a control (`name=value` for a stage or circuit, `stage.name=value` for the engine)
    #[arg(short, long = "param", value_parser = parse_key_val)]
    params: Vec<(String, f32)>,

    /// Tone frequency in Hz
    #[arg(long, default_value = "1000.0")]
    freq: f32,

    /// Tone amplitude in dBFS
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    amplitude: f32,

    /// Duration in seconds
    #[arg(long, default_value = "1.0")]
    duration: f32,

    /// Seconds excluded from the output measurement while the stage settles
    #[arg(long, default_value = "0.1")]
    settle: f32,
}

/// Something to render, plus a name for the report.
struct Target {
    name: String,
    stage: Box<dyn Stage>,
    engine: Option<ember_voices::EngineHandle>,
}

/// Run the render command.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !(args.duration > 0.0 && args.duration.is_finite()) {
        anyhow::bail!("duration must be positive, got {}", args.duration);
    }
    let settings = load_settings(args.settings.as_deref())?;
    let config = settings.pipeline()?;

    let mut target = if let Some(name) = &args.circuit {
        circuit_target(name, args.oversampling, &config, &args.params)?
    } else if let Some(name) = &args.stage {
        stage_target(name, &settings, &config, &args.params)?
    } else {
        engine_target(&settings, &config, args.voice.as_deref(), &args.params)?
    };
    target.stage.reset();

    let sample_rate = config.sample_rate();
    let num_samples = (args.duration * sample_rate).round() as usize;
    let input = tone(args.freq, args.amplitude, sample_rate, num_samples);
    let mut channels = vec![input.clone(); config.channels()];

    tracing::info!(
        stage = %target.name,
        sample_rate,
        block = config.max_block_size(),
        channels = config.channels(),
        samples = num_samples,
        "render"
    );
    render(target.stage.as_mut(), &mut channels, config.max_block_size());

    let skip = ((args.settle.max(0.0) * sample_rate) as usize).min(num_samples.saturating_sub(1));
    let input_levels = Levels::measure(&input[skip..]);
    let output_levels = Levels::measure(&channels[0][skip..]);
    if channels.iter().flatten().any(|s| !s.is_finite()) {
        anyhow::bail!("{} produced non-finite output", target.name);
    }

    println!("Target:      {}", target.name);
    println!(
        "Pipeline:    {} Hz, block {}, {} channel(s)",
        sample_rate,
        config.max_block_size(),
        config.channels()
    );
    println!("Tone:        {} Hz at {:.1} dBFS for {}s", args.freq, args.amplitude, args.duration);
    println!(
        "Input:       peak {:7.2} dBFS  rms {:7.2} dBFS",
        input_levels.peak_db(),
        input_levels.rms_db()
    );
    println!(
        "Output:      peak {:7.2} dBFS  rms {:7.2} dBFS  crest {:5.2} dB",
        output_levels.peak_db(),
        output_levels.rms_db(),
        output_levels.crest_db()
    );
    println!(
        "Gain:        {:+.2} dB",
        output_levels.rms_db() - input_levels.rms_db()
    );
    if let Some(handle) = &target.engine {
        println!("Reduction:   {:.2} dB", handle.gain_reduction_db());
    }
    Ok(())
}

/// Feeds every channel through `stage` in blocks of at most `block`.
fn render(stage: &mut dyn Stage, channels: &mut [Vec<f32>], block: usize) {
    let len = channels.first().map_or(0, Vec::len);
    let mut start = 0;
    while start < len {
        let end = (start + block).min(len);
        let mut views: Vec<&mut [f32]> = channels.iter_mut().map(|c| &mut c[start..end]).collect();
        stage.process(&mut views);
        start = end;
    }
}

fn set_named(controls: &Controls, stage: &str, params: &[(String, f32)]) -> anyhow::Result<()> {
    for (name, value) in params {
        let name = match name.split_once('.') {
            Some((prefix, rest)) if prefix.eq_ignore_ascii_case(stage) => rest,
            _ => name.as_str(),
        };
        if !controls.set_by_name(name, *value) {
            let known: Vec<&str> = controls.specs().iter().map(|spec| spec.name).collect();
            anyhow::bail!(
                "unknown control '{}' for {} (expected one of: {})",
                name,
                stage,
                known.join(", ")
            );
        }
    }
    Ok(())
}

fn engine_target(
    settings: &EngineSettings,
    config: &PipelineConfig,
    voice: Option<&str>,
    params: &[(String, f32)],
) -> anyhow::Result<Target> {
    let engine = Engine::new(config);
    let handle = engine.handle();
    settings.apply(&handle)?;
    if let Some(voice) = voice {
        let kind: VoiceKind = voice.parse().with_context(|| "invalid --voice".to_string())?;
        handle.select_voice(kind);
    }
    for (path, value) in params {
        if !handle.set(path, *value) {
            anyhow::bail!(
                "unknown control '{}' (expected stage.name, stages: {})",
                path,
                ember_voices::engine::STAGE_NAMES.join(", ")
            );
        }
    }
    Ok(Target {
        name: format!("engine ({})", handle.voice()),
        stage: Box::new(engine),
        engine: Some(handle),
    })
}

fn stage_target(
    name: &str,
    settings: &EngineSettings,
    config: &PipelineConfig,
    params: &[(String, f32)],
) -> anyhow::Result<Target> {
    let key = name.trim().to_ascii_lowercase().replace('-', "_");
    let (stage, controls): (Box<dyn Stage>, Arc<Controls>) = match key.as_str() {
        "fuzz" => {
            let stage = Fuzz::new(config);
            settings.fuzz.write_values(stage.controls());
            let controls = Arc::clone(stage.controls());
            (Box::new(stage), controls)
        }
        "compressor" => {
            let stage = Compressor::new(config);
            stage.link().select(settings.compressor_kind()?);
            settings.compressor.write_values(stage.controls());
            let controls = Arc::clone(stage.controls());
            (Box::new(stage), controls)
        }
        "amp_eq" => {
            let stage = AmpEq::new(config);
            settings.amp_eq.write_values(stage.controls());
            let controls = Arc::clone(stage.controls());
            (Box::new(stage), controls)
        }
        other => {
            let kind: VoiceKind = other.parse().with_context(|| {
                format!(
                    "unknown stage '{name}' \
                     (expected fuzz, borealis, helios, nebula, compressor or amp_eq)"
                )
            })?;
            let stage = Voice::new(kind, config);
            match kind {
                VoiceKind::Borealis => settings.borealis.write_values(stage.controls()),
                VoiceKind::Helios => settings.helios.write_values(stage.controls()),
                VoiceKind::Nebula => settings.nebula.write_values(stage.controls()),
            }
            let controls = Arc::clone(stage.controls());
            (Box::new(stage), controls)
        }
    };
    set_named(&controls, &key, params)?;
    Ok(Target {
        name: key,
        stage,
        engine: None,
    })
}

fn circuit_target(
    name: &str,
    oversampling: Option<usize>,
    config: &PipelineConfig,
    params: &[(String, f32)],
) -> anyhow::Result<Target> {
    let kind = circuit_kind(name)?;
    let factor = match oversampling {
        Some(ratio) => OversamplingFactor::from_ratio(ratio).with_context(|| {
            format!("unsupported oversampling factor {ratio} (expected 1, 2, 4 or 8)")
        })?,
        None => config.oversampling(),
    };
    let stage = CircuitStage::new(kind, &config.with_oversampling(factor));
    set_named(stage.controls(), kind.name(), params)?;
    Ok(Target {
        name: format!("{} circuit x{}", kind, factor.ratio()),
        stage: Box::new(stage),
        engine: None,
    })
}
