//! Phasetrack CLI - track sinusoidal partials in WAV files.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phasetrack")]
#[command(author, version, about = "Phase-coherent sinusoidal partial tracker", long_about = None)]
struct Cli {
    /// Log library diagnostics at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a test tone with optional noise and impulse
    Generate(commands::generate::GenerateArgs),

    /// Track one partial through a WAV file
    Track(commands::track::TrackArgs),

    /// Analyze a WAV file and resynthesize it by overlap-add
    Resynth(commands::resynth::ResynthArgs),

    /// Print, write or check the analysis configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Track(args) => commands::track::run(args),
        Commands::Resynth(args) => commands::resynth::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
