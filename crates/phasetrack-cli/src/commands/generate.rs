//! Test signal generation command.

use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::path::PathBuf;

use crate::wav::write_wav;

#[derive(Args)]
pub struct GenerateArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Tone frequency in Hz
    #[arg(long, default_value = "440.0")]
    freq: f64,

    /// Tone amplitude
    #[arg(long, default_value = "1.0")]
    amplitude: f64,

    /// Duration in seconds
    #[arg(long, default_value = "3.0")]
    duration: f64,

    /// Sample rate
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Variance of added white Gaussian noise
    #[arg(long, default_value = "0.0")]
    noise_variance: f64,

    /// Seed for the noise generator
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Sample index of a single impulse
    #[arg(long, value_name = "SAMPLE")]
    impulse_at: Option<usize>,

    /// Value written at the impulse sample
    #[arg(long, default_value = "500.0")]
    impulse_amplitude: f64,

    /// Bits per sample (32 writes float)
    #[arg(long, default_value = "32")]
    bits: u16,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    if !(args.noise_variance >= 0.0 && args.noise_variance.is_finite()) {
        anyhow::bail!("noise variance must be finite and non-negative");
    }

    let num_samples = (args.duration * args.sample_rate as f64) as usize;
    let omega = 2.0 * PI * args.freq / args.sample_rate as f64;

    println!("Generating tone...");
    println!(
        "  {} Hz, amplitude {}, {:.2}s at {} Hz",
        args.freq, args.amplitude, args.duration, args.sample_rate
    );

    let mut samples: Vec<f64> = (0..num_samples)
        .map(|n| args.amplitude * (omega * n as f64).cos())
        .collect();

    if args.noise_variance > 0.0 {
        let mut rng = StdRng::seed_from_u64(args.seed);
        let normal = Normal::new(0.0, args.noise_variance.sqrt())?;
        for x in &mut samples {
            *x += normal.sample(&mut rng);
        }
        println!("  + white noise, variance {}", args.noise_variance);
    }

    if let Some(at) = args.impulse_at {
        let Some(slot) = samples.get_mut(at) else {
            anyhow::bail!("impulse sample {at} is past the end ({num_samples} samples)");
        };
        *slot = args.impulse_amplitude;
        println!("  + impulse of {} at sample {at}", args.impulse_amplitude);
    }

    write_wav(&args.output, &samples, args.sample_rate, args.bits)?;
    println!("Wrote {} samples to {}", samples.len(), args.output.display());

    Ok(())
}
