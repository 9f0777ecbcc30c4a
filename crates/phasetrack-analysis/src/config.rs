//! Pipeline configuration.
//!
//! A single TOML document configures the analysis engine, the sub-bin
//! refiner and the tracker. Every field has a default, so a partial file only
//! overrides what it names.
//!
//! # TOML Format
//!
//! ```toml
//! [stft]
//! window = "hamming"
//! symmetric_window = true
//! window_len = 1024
//! fft_size = 2048
//! overlap = 0.5
//!
//! [refiner]
//! enabled = true
//! resolution = 100
//!
//! [tracker]
//! observation_dim = 1
//! transition_uncertainty = 10.0
//! measurement_uncertainty = 1.0
//! num_ar_coeffs = 3
//! history_size = 50
//! strategy = "fixed"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::stft::FrameGrid;
use crate::tracker::TransitionStrategy;
use crate::window::WindowKind;

/// Analysis window and framing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StftConfig {
    /// Window shape.
    pub window: WindowKind,
    /// Use the symmetric (filter design) form instead of the periodic one.
    pub symmetric_window: bool,
    /// Window length in samples.
    pub window_len: usize,
    /// DFT size; at least `window_len` avoids time aliasing.
    pub fft_size: usize,
    /// Overlap fraction between consecutive frames, in `[0, 1)`.
    pub overlap: f64,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            window: WindowKind::Hamming,
            symmetric_window: true,
            window_len: 1024,
            fft_size: 2048,
            overlap: 0.5,
        }
    }
}

impl StftConfig {
    /// Generate the configured window.
    pub fn window_coefficients(&self) -> Vec<f64> {
        self.window
            .coefficients(self.window_len, self.symmetric_window)
    }

    /// Derive the frame grid, validating the framing parameters.
    pub fn grid(&self) -> Result<FrameGrid> {
        FrameGrid::new(self.window_len, self.fft_size, self.overlap)
    }
}

/// Sub-bin refinement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefinerConfig {
    /// Refine observations to their sub-bin offset before tracking.
    pub enabled: bool,
    /// Lookup subdivisions per bin.
    pub resolution: usize,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: 100,
        }
    }
}

/// Autoregressive Kalman tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of trailing state components observed per frame.
    pub observation_dim: usize,
    /// Diagonal process noise added to the predictive covariance each frame.
    pub transition_uncertainty: f64,
    /// Diagonal measurement noise.
    pub measurement_uncertainty: f64,
    /// AR order, which is also the state dimension.
    pub num_ar_coeffs: usize,
    /// Observations kept for AR re-estimation.
    pub history_size: usize,
    /// How the transition's predictor row is built.
    pub strategy: TransitionStrategy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            observation_dim: 1,
            transition_uncertainty: 10.0,
            measurement_uncertainty: 1.0,
            num_ar_coeffs: 3,
            history_size: 50,
            strategy: TransitionStrategy::Fixed,
        }
    }
}

impl TrackerConfig {
    /// Check that a tracker can be built from this configuration.
    pub fn validate(&self) -> Result<()> {
        let p = self.num_ar_coeffs;
        if p == 0 {
            return Err(Error::invalid_config("num_ar_coeffs", "must be > 0"));
        }
        if self.observation_dim == 0 {
            return Err(Error::invalid_config("observation_dim", "must be > 0"));
        }
        if self.observation_dim > p {
            return Err(Error::invalid_config(
                "observation_dim",
                format!(
                    "{} exceeds the state dimension {p}",
                    self.observation_dim
                ),
            ));
        }
        check_uncertainty("transition_uncertainty", self.transition_uncertainty)?;
        check_uncertainty("measurement_uncertainty", self.measurement_uncertainty)?;
        if self.transition_uncertainty == 0.0 && self.measurement_uncertainty == 0.0 {
            return Err(Error::invalid_config(
                "measurement_uncertainty",
                "process and measurement noise cannot both be zero",
            ));
        }
        if self.strategy == TransitionStrategy::AdaptiveFromHistory && self.history_size <= p {
            return Err(Error::invalid_config(
                "history_size",
                format!(
                    "{} cannot fit {p} AR coefficients; need more than {p}",
                    self.history_size
                ),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_uncertainty(param: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid_config(
            param,
            format!("{value} must be finite and non-negative"),
        ));
    }
    Ok(())
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis window and framing.
    pub stft: StftConfig,
    /// Sub-bin refinement.
    pub refiner: RefinerConfig,
    /// Partial tracker.
    pub tracker: TrackerConfig,
}

impl AnalysisConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::read_config(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section without building anything.
    pub fn validate(&self) -> Result<()> {
        self.stft.grid()?;
        if self.refiner.enabled && self.refiner.resolution < 2 {
            return Err(Error::invalid_config(
                "resolution",
                format!("{} leaves an empty refinement domain", self.refiner.resolution),
            ));
        }
        self.tracker.validate()
    }
}
