//! Analysis/resynthesis command.

use anyhow::Context;
use clap::Args;
use phasetrack_analysis::{
    CsvSink, MagnitudeScale, SinkItem, SpectrumSink, StftAnalyzer, window,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use super::common::AnalysisArgs;
use crate::wav::{read_wav, write_wav};

#[derive(Args)]
pub struct ResynthArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Also write the magnitude spectrogram as CSV
    #[arg(long, value_name = "FILE")]
    spectrogram_csv: Option<PathBuf>,

    /// Dynamic range of the spectrogram CSV in dB
    #[arg(long, default_value = "120.0")]
    db_range: f64,

    /// Output bits per sample (32 writes float)
    #[arg(long, default_value = "32")]
    bits: u16,
}

pub fn run(args: ResynthArgs) -> anyhow::Result<()> {
    let config = args.analysis.resolve()?;
    let analyzer = StftAnalyzer::from_config(&config.stft)?;
    let (samples, sample_rate) = read_wav(&args.input)?;

    println!("Analyzing {}...", args.input.display());
    let spectrogram = analyzer.analyze(&samples)?;
    println!(
        "  {} frames x {} bins, hop {}",
        spectrogram.num_frames(),
        spectrogram.num_bins(),
        spectrogram.frame_inc()
    );

    let mut output = analyzer.synthesize(&spectrogram)?;
    match window::cola_gain(analyzer.window(), analyzer.frame_inc(), 1e-6) {
        Some(gain) if gain > 0.0 => {
            output.iter_mut().for_each(|x| *x /= gain);
        }
        _ => println!("  Window/hop pair is not COLA; output is left unnormalized"),
    }

    write_wav(&args.output, &output, sample_rate, args.bits)?;
    println!("Wrote {} samples to {}", output.len(), args.output.display());

    if let Some(path) = &args.spectrogram_csv {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut sink = CsvSink::new(BufWriter::new(file)).with_scale(MagnitudeScale::Decibels {
            dynamic_range: args.db_range,
        });
        sink.consume(SinkItem::Spectrogram(&spectrogram))?;
        sink.into_inner()?;
        println!("Wrote spectrogram to {}", path.display());
    }

    Ok(())
}
