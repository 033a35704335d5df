//! Ember CLI - render tones through voices, sweep circuit curves, list what exists.

mod commands;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ember")]
#[command(author, version, about = "Ember analog circuit emulation CLI", long_about = None)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace). `RUST_LOG` applies when absent.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a synthetic tone through the engine, a stage or a circuit and print levels
    Render(commands::render::RenderArgs),

    /// Print the transfer curve of a circuit model as CSV
    Curve(commands::curve::CurveArgs),

    /// List voices, stages, circuits and their controls
    Info(commands::info::InfoArgs),
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Curve(args) => commands::curve::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
