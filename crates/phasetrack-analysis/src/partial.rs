//! Single-partial tracking over a whole signal.
//!
//! Wires the engine, the optional refiner and a fresh tracker together:
//! analyze, read one bin per frame, refine it to the partial's true offset,
//! and push it through the tracker.

use rustfft::num_complex::Complex64;

use crate::config::{AnalysisConfig, TrackerConfig};
use crate::error::{Error, Result};
use crate::spectrogram::Spectrogram;
use crate::stft::StftAnalyzer;
use crate::subbin::{SubBinRefiner, parabolic_offset};
use crate::tracker::ArKalmanTracker;

/// Floor for magnitudes before taking logs during peak search.
const LEVEL_FLOOR: f64 = 1e-12;

/// Per-frame observations and tracker estimates for one partial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackResult {
    /// Bin the observations were read from.
    pub bin: usize,
    /// Tracked frequency in radians per sample.
    pub frequency: f64,
    /// Hop between frames in samples.
    pub frame_inc: usize,
    /// Observation pushed for each frame.
    pub observations: Vec<Complex64>,
    /// Tracker output for each frame.
    pub estimates: Vec<Complex64>,
}

impl TrackResult {
    /// Number of frames tracked.
    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    /// Whether no frames were tracked.
    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Magnitude steadiness of the estimates in dB: squared mean magnitude
    /// over magnitude variance, ignoring the first `skip_frames`.
    ///
    /// `None` if fewer than two frames remain.
    pub fn output_snr_db(&self, skip_frames: usize) -> Option<f64> {
        magnitude_snr_db(self.estimates.get(skip_frames..)?)
    }

    /// Same measure over the raw observations, for comparison.
    pub fn input_snr_db(&self, skip_frames: usize) -> Option<f64> {
        magnitude_snr_db(self.observations.get(skip_frames..)?)
    }
}

/// `10·log10(mean(|x|)² / var(|x|))` with the population variance.
pub fn magnitude_snr_db(values: &[Complex64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mags: Vec<f64> = values.iter().map(|c| c.norm()).collect();
    let mean = mags.iter().sum::<f64>() / n;
    let variance = mags.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
    Some(10.0 * (mean * mean / variance).log10())
}

/// Analysis front-end plus tracker settings for single-partial tracking.
#[derive(Debug, Clone)]
pub struct PartialTracker {
    analyzer: StftAnalyzer,
    refiner: Option<SubBinRefiner>,
    tracker: TrackerConfig,
}

impl PartialTracker {
    /// Build the engine, refiner and tracker settings from one configuration.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = StftAnalyzer::from_config(&config.stft)?;
        let refiner = if config.refiner.enabled {
            Some(SubBinRefiner::new(
                analyzer.window(),
                analyzer.fft_size(),
                config.refiner.resolution,
            )?)
        } else {
            None
        };

        Ok(Self {
            analyzer,
            refiner,
            tracker: config.tracker.clone(),
        })
    }

    /// The analysis engine.
    pub fn analyzer(&self) -> &StftAnalyzer {
        &self.analyzer
    }

    /// The sub-bin refiner, if enabled.
    pub fn refiner(&self) -> Option<&SubBinRefiner> {
        self.refiner.as_ref()
    }

    /// Track the raw content of `bin` at the bin's centre frequency.
    pub fn track_bin(&self, signal: &[f64], bin: usize) -> Result<TrackResult> {
        let spectrogram = self.analyzer.analyze(signal)?;
        let frequency = self.analyzer.grid().bin_frequency(bin as f64);
        self.run(&spectrogram, bin, frequency, Ok)
    }

    /// Track a partial at `frequency` (radians per sample).
    ///
    /// Observations come from the nearest bin and, when the refiner is
    /// enabled, are corrected for the partial's offset from that bin.
    pub fn track_frequency(&self, signal: &[f64], frequency: f64) -> Result<TrackResult> {
        if !frequency.is_finite() || frequency < 0.0 {
            return Err(Error::invalid_config(
                "frequency",
                format!("{frequency} must be finite and non-negative"),
            ));
        }
        let spectrogram = self.analyzer.analyze(signal)?;
        self.track_at(&spectrogram, frequency)
    }

    /// Track the magnitude peak nearest to `bin`.
    ///
    /// Climbs from `bin` to the local maximum of the frame-averaged log
    /// magnitude, places the partial between bins by parabolic interpolation,
    /// then tracks it as [`track_frequency`](Self::track_frequency) would.
    pub fn track_peak(&self, signal: &[f64], bin: usize) -> Result<TrackResult> {
        let spectrogram = self.analyzer.analyze(signal)?;
        let frequency = self.peak_frequency(&spectrogram, bin)?;
        self.track_at(&spectrogram, frequency)
    }

    /// Interpolated frequency (radians per sample) of the peak nearest `bin`.
    pub fn peak_frequency(&self, spectrogram: &Spectrogram, bin: usize) -> Result<f64> {
        let num_bins = spectrogram.num_bins();
        let nyquist = num_bins / 2;
        if bin == 0 || bin >= nyquist {
            return Err(Error::BinOutOfRange { bin, num_bins });
        }

        let level = |k: usize| -> f64 {
            spectrogram.bin(k).map_or(f64::NEG_INFINITY, |series| {
                let total: f64 = series.iter().map(|c| c.norm().max(LEVEL_FLOOR).ln()).sum();
                total / series.len().max(1) as f64
            })
        };

        let mut peak = bin;
        loop {
            let centre = level(peak);
            if peak > 1 && level(peak - 1) > centre {
                peak -= 1;
            } else if peak + 1 < nyquist && level(peak + 1) > centre {
                peak += 1;
            } else {
                break;
            }
        }

        let offset = parabolic_offset(level(peak - 1), level(peak), level(peak + 1)).clamp(-0.5, 0.5);
        let frequency = self.analyzer.grid().bin_frequency(peak as f64 + offset);

        tracing::debug!(start_bin = bin, peak, offset, frequency, "peak located");
        Ok(frequency)
    }

    fn track_at(&self, spectrogram: &Spectrogram, frequency: f64) -> Result<TrackResult> {
        let (bin, offset) = self.analyzer.grid().nearest_bin(frequency);

        match &self.refiner {
            Some(refiner) => self.run(spectrogram, bin, frequency, |value| {
                refiner.refine(value, offset)
            }),
            None => self.run(spectrogram, bin, frequency, Ok),
        }
    }

    fn run(
        &self,
        spectrogram: &Spectrogram,
        bin: usize,
        frequency: f64,
        observe: impl Fn(Complex64) -> Result<Complex64>,
    ) -> Result<TrackResult> {
        let series = spectrogram.bin(bin).ok_or(Error::BinOutOfRange {
            bin,
            num_bins: spectrogram.num_bins(),
        })?;

        let frame_inc = spectrogram.frame_inc();
        let mut tracker = ArKalmanTracker::new(frame_inc, frequency, &self.tracker)?;

        let mut observations = Vec::with_capacity(series.len());
        let mut estimates = Vec::with_capacity(series.len());
        for &value in series {
            let observation = observe(value)?;
            estimates.push(tracker.push(observation, frequency)?);
            observations.push(observation);
        }

        tracing::debug!(
            bin,
            frequency,
            frames = estimates.len(),
            adapting = tracker.is_adapting(),
            "partial tracked"
        );

        Ok(TrackResult {
            bin,
            frequency,
            frame_inc,
            observations,
            estimates,
        })
    }
}
