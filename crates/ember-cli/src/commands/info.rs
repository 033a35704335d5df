//! Voice, stage and circuit listing.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use ember_circuits::CircuitKind;
use ember_config::EngineSettings;
use ember_voices::{CompressorKind, ParamSpec, VoiceKind, amp_eq, compressor, engine, fuzz};

#[derive(Args)]
pub struct InfoArgs {
    /// What to show: voices, stages, circuits, or one stage by name
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,

    /// Print a settings file with every default value
    #[arg(long, conflicts_with = "topic")]
    settings_template: bool,
}

/// Control table of a stage by name.
pub fn stage_params(name: &str) -> Option<&'static [ParamSpec]> {
    match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "engine" => Some(&engine::PARAMS),
        "fuzz" => Some(&fuzz::PARAMS),
        "compressor" => Some(&compressor::PARAMS),
        "amp_eq" => Some(&amp_eq::PARAMS),
        other => other.parse::<VoiceKind>().ok().map(VoiceKind::params),
    }
}

fn print_params(specs: &[ParamSpec]) {
    println!("  {:10}  {:>9}  {:>9}  {:>9}", "Name", "Min", "Max", "Default");
    println!("  {:10}  {:>9}  {:>9}  {:>9}", "----", "---", "---", "-------");
    for spec in specs {
        let unit = spec.unit.suffix();
        println!(
            "  {:10}  {:>9}  {:>9}  {:>9}",
            spec.name,
            format!("{}{unit}", spec.min),
            format!("{}{unit}", spec.max),
            format!("{}{unit}", spec.default)
        );
    }
}

fn print_voices() {
    println!("Overdrive voices");
    println!("================");
    for kind in VoiceKind::ALL {
        println!();
        println!("{kind}");
        print_params(kind.params());
    }
}

fn print_stages() {
    println!("Engine chain: input -> compressor -> fuzz -> voice -> amp_eq -> master -> output");
    for name in ember_voices::engine::STAGE_NAMES {
        if let Some(specs) = stage_params(name) {
            println!();
            println!("{name}");
            print_params(specs);
        }
    }
    println!();
    let kinds: Vec<&str> = CompressorKind::ALL.iter().map(|k| k.name()).collect();
    println!("Compressor laws: {}", kinds.join(", "));
}

fn print_circuits() {
    println!("Circuit models");
    println!("==============");
    println!();
    println!("  {:12}  {:8}  {}", "Name", "Memory", "Description");
    println!("  {:12}  {:8}  {}", "----", "------", "-----------");
    for kind in CircuitKind::ALL {
        let memory = if kind.is_stateful() { "yes" } else { "no" };
        println!("  {:12}  {:8}  {}", kind.name(), memory, kind.description());
    }
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    if args.settings_template {
        print!("{}", EngineSettings::default().to_toml()?);
        return Ok(());
    }

    match args.topic.as_deref().map(str::trim) {
        None => {
            print_voices();
            println!();
            print_circuits();
        }
        Some(t) if t.eq_ignore_ascii_case("voices") => print_voices(),
        Some(t) if t.eq_ignore_ascii_case("stages") => print_stages(),
        Some(t) if t.eq_ignore_ascii_case("circuits") => print_circuits(),
        Some(name) => {
            if let Some(specs) = stage_params(name) {
                println!("{name}");
                print_params(specs);
            } else if let Ok(kind) = name.parse::<CircuitKind>() {
                println!("{kind}: {}", kind.description());
                println!("  Controls when rendered with --circuit:");
                print_params(&ember_voices::circuit_stage::PARAMS);
            } else {
                anyhow::bail!(
                    "unknown topic '{name}' \
                     (expected voices, stages, circuits, a stage or a circuit)"
                );
            }
        }
    }
    Ok(())
}
