//! Phasetrack Analysis - phase-coherent tracking of sinusoidal partials
//!
//! This crate turns a buffered audio signal into a smoothed, phase-coherent
//! trajectory for one sinusoidal partial:
//!
//! - [`stft`] - Windowed STFT analysis and overlap-add synthesis
//! - [`spectrogram`] - Complex `[bin, frame]` container with slicing and arithmetic
//! - [`subbin`] - Window-kernel lookup that refines bin values to a fractional offset
//! - [`tracker`] - Kalman filter with an autoregressive, phase-locked transition
//! - [`yule_walker`] - AR coefficient estimation for the adaptive transition
//! - [`partial`] - Analyze, refine and track one partial in a single call
//! - [`config`] - TOML configuration for the whole pipeline
//! - [`sink`] - Output sinks (CSV) for spectrograms, signals and tracks
//! - [`window`] - Analysis window generation
//! - [`fft`] - Cached FFT plans
//!
//! ## Example Workflow
//!
//! ```rust
//! use phasetrack_analysis::{AnalysisConfig, PartialTracker};
//! use std::f64::consts::PI;
//!
//! let config = AnalysisConfig::default();
//! let tracker = PartialTracker::new(&config).unwrap();
//!
//! // One second of a tone between bins 100 and 101.
//! let frequency = 2.0 * PI * 100.25 / 2048.0;
//! let signal: Vec<f64> = (0..44100).map(|n| (frequency * n as f64).cos()).collect();
//!
//! let track = tracker.track_frequency(&signal, frequency).unwrap();
//! assert_eq!(track.bin, 100);
//! assert!(track.output_snr_db(20).unwrap() > 40.0);
//! ```
//!
//! ## Analysis and Resynthesis
//!
//! ```rust
//! use phasetrack_analysis::{StftAnalyzer, WindowKind};
//!
//! let analyzer = StftAnalyzer::new(WindowKind::Hann.periodic(512), 1024, 0.5).unwrap();
//! let signal = vec![0.25; 8192];
//! let spectrogram = analyzer.analyze(&signal).unwrap();
//!
//! // Keep only the first 8 frames.
//! let head = spectrogram.frames(0..8).unwrap();
//! let out = analyzer.synthesize(&head).unwrap();
//! assert_eq!(out.len(), 8 * 256 + 512);
//! ```

pub mod config;
pub mod error;
pub mod fft;
pub mod partial;
pub mod sink;
pub mod spectrogram;
pub mod stft;
pub mod subbin;
pub mod tracker;
pub mod window;
pub mod yule_walker;

// Re-export main types
pub use config::{AnalysisConfig, RefinerConfig, StftConfig, TrackerConfig};
pub use error::{Error, Result};
pub use fft::{Fft, wrap_phase};
pub use partial::{PartialTracker, TrackResult, magnitude_snr_db};
pub use rustfft::num_complex::Complex64;
pub use sink::{CsvSink, MagnitudeScale, SinkItem, SpectrumSink};
pub use spectrogram::{FrameSource, Spectrogram};
pub use stft::{FrameGrid, StftAnalyzer, expected_phase};
pub use subbin::{SubBinRefiner, parabolic_offset};
pub use tracker::{ArKalmanTracker, TransitionStrategy};
pub use window::WindowKind;
pub use yule_walker::{ArModel, autocorrelation, yule_walker};
