//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use clap::{Args, ValueEnum};
use phasetrack_analysis::{AnalysisConfig, TransitionStrategy, WindowKind};
use std::path::PathBuf;

/// Window types for CLI
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliWindow {
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
}

impl From<CliWindow> for WindowKind {
    fn from(w: CliWindow) -> Self {
        match w {
            CliWindow::Rectangular => WindowKind::Rectangular,
            CliWindow::Hann => WindowKind::Hann,
            CliWindow::Hamming => WindowKind::Hamming,
            CliWindow::Blackman => WindowKind::Blackman,
            CliWindow::BlackmanHarris => WindowKind::BlackmanHarris,
        }
    }
}

/// Transition strategies for CLI
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliStrategy {
    Fixed,
    Adaptive,
}

impl From<CliStrategy> for TransitionStrategy {
    fn from(s: CliStrategy) -> Self {
        match s {
            CliStrategy::Fixed => TransitionStrategy::Fixed,
            CliStrategy::Adaptive => TransitionStrategy::AdaptiveFromHistory,
        }
    }
}

/// Analysis settings: an optional TOML file plus per-flag overrides.
#[derive(Args, Debug)]
pub struct AnalysisArgs {
    /// Configuration file (TOML); flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Analysis window
    #[arg(long, value_enum)]
    pub window: Option<CliWindow>,

    /// Window length in samples
    #[arg(long)]
    pub window_len: Option<usize>,

    /// FFT size
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Overlap fraction between frames, in [0, 1)
    #[arg(long)]
    pub overlap: Option<f64>,
}

impl AnalysisArgs {
    /// Load the configuration file (or defaults) and apply flag overrides.
    pub fn resolve(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(window) = self.window {
            config.stft.window = window.into();
        }
        if let Some(window_len) = self.window_len {
            config.stft.window_len = window_len;
        }
        if let Some(fft_size) = self.fft_size {
            config.stft.fft_size = fft_size;
        }
        if let Some(overlap) = self.overlap {
            config.stft.overlap = overlap;
        }

        config.validate().context("invalid analysis configuration")?;
        Ok(config)
    }
}
