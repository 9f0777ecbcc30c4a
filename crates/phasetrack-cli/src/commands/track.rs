//! Partial tracking command.

use anyhow::Context;
use clap::Args;
use phasetrack_analysis::{CsvSink, PartialTracker, SinkItem, SpectrumSink, window};
use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::common::{AnalysisArgs, CliStrategy};
use crate::wav::read_wav;

#[derive(Args)]
pub struct TrackArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Partial frequency in Hz
    #[arg(long, conflicts_with = "bin", required_unless_present = "bin")]
    freq: Option<f64>,

    /// Track a raw bin instead of a frequency
    #[arg(long)]
    bin: Option<usize>,

    /// With --bin, track the interpolated magnitude peak nearest that bin
    #[arg(long, requires = "bin")]
    peak: bool,

    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Transition strategy
    #[arg(long, value_enum)]
    strategy: Option<CliStrategy>,

    /// Known variance of the input noise; sets the measurement uncertainty
    /// to this times the window's sum of squares
    #[arg(long)]
    noise_variance: Option<f64>,

    /// Skip sub-bin refinement of observations
    #[arg(long)]
    no_refine: bool,

    /// Frames excluded from the SNR summary while the tracker settles
    #[arg(long, default_value = "100")]
    skip: usize,

    /// Write per-frame results to a CSV file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: TrackArgs) -> anyhow::Result<()> {
    let mut config = args.analysis.resolve()?;
    if let Some(strategy) = args.strategy {
        config.tracker.strategy = strategy.into();
    }
    if args.no_refine {
        config.refiner.enabled = false;
    }
    if let Some(variance) = args.noise_variance {
        let energy = window::sum_of_squares(&config.stft.window_coefficients());
        config.tracker.measurement_uncertainty = variance * energy;
    }

    let (samples, sample_rate) = read_wav(&args.input)?;
    let tracker = PartialTracker::new(&config).context("building tracker")?;

    let result = match (args.freq, args.bin) {
        (Some(hz), _) => {
            let omega = 2.0 * PI * hz / sample_rate as f64;
            tracker.track_frequency(&samples, omega)?
        }
        (None, Some(bin)) if args.peak => tracker.track_peak(&samples, bin)?,
        (None, Some(bin)) => tracker.track_bin(&samples, bin)?,
        (None, None) => anyhow::bail!("either --freq or --bin is required"),
    };

    eprintln!(
        "Tracked bin {} ({:.2} Hz) over {} frames",
        result.bin,
        result.frequency * sample_rate as f64 / (2.0 * PI),
        result.len()
    );
    match (
        result.input_snr_db(args.skip),
        result.output_snr_db(args.skip),
    ) {
        (Some(input), Some(output)) => {
            eprintln!("  Input SNR:  {input:.2} dB");
            eprintln!("  Output SNR: {output:.2} dB");
        }
        _ => eprintln!("  Too few frames after skipping {} for SNR", args.skip),
    }

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut sink = CsvSink::new(writer);
    sink.consume(SinkItem::Track(&result))?;
    sink.into_inner()?;

    if let Some(path) = &args.output {
        eprintln!("Wrote track to {}", path.display());
    }

    Ok(())
}
