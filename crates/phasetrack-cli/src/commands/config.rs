//! Configuration inspection command.

use anyhow::Context;
use clap::Args;
use phasetrack_analysis::AnalysisConfig;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default configuration to a file instead of stdout
    #[arg(short, long, conflicts_with = "check")]
    output: Option<PathBuf>,

    /// Load and validate a configuration file
    #[arg(long, value_name = "FILE")]
    check: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.check {
        let config = AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("{} is not a valid configuration", path.display()))?;
        let grid = config.stft.grid()?;
        println!("{}: ok", path.display());
        println!(
            "  window {} / fft {} / hop {}",
            grid.window_len(),
            grid.fft_size(),
            grid.frame_inc()
        );
        return Ok(());
    }

    let toml = AnalysisConfig::default().to_toml()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &toml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}
