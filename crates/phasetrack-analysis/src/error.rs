//! Error types for spectral analysis and partial tracking.

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the analysis engine, the sub-bin refiner, and the tracker.
///
/// Every failure is reported synchronously; nothing in this crate retries or
/// silently clamps an out-of-range input.
#[derive(Debug, Error)]
pub enum Error {
    /// A component was constructed with parameters that cannot work.
    #[error("invalid configuration for '{param}': {reason}")]
    InvalidConfig {
        /// Name of the offending parameter.
        param: &'static str,
        /// Description of why the value is rejected.
        reason: String,
    },

    /// The signal does not cover a single analysis window.
    #[error("insufficient signal length: {len} samples, analysis window needs {window_len}")]
    InsufficientSignal {
        /// Length of the rejected signal.
        len: usize,
        /// Analysis window length.
        window_len: usize,
    },

    /// A sub-bin offset fell outside the lookup kernel.
    #[error("sub-bin offset {offset} outside refinement domain (|offset| < {limit})")]
    RefinementDomain {
        /// The rejected offset in bins.
        offset: f64,
        /// Exclusive bound on `|offset|`.
        limit: f64,
    },

    /// A frame range does not fit the spectrogram.
    #[error("frame range {start}..{end} out of bounds for {num_frames} frames")]
    FrameRange {
        /// Start frame (inclusive).
        start: usize,
        /// End frame (exclusive).
        end: usize,
        /// Number of frames available.
        num_frames: usize,
    },

    /// A frequency bin index does not exist.
    #[error("bin {bin} out of range for {num_bins} bins")]
    BinOutOfRange {
        /// The requested bin.
        bin: usize,
        /// Number of bins available.
        num_bins: usize,
    },

    /// Two operands, or an operand and a configuration, disagree in shape.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// What was being compared.
        what: &'static str,
        /// Expected shape, rendered.
        expected: String,
        /// Actual shape, rendered.
        actual: String,
    },

    /// The Kalman innovation covariance could not be inverted.
    #[error("innovation covariance is singular (process and measurement noise vanish)")]
    SingularInnovation,

    /// Autoregressive coefficients could not be fit.
    #[error("AR estimation failed: {0}")]
    ArEstimation(String),

    /// Writing to a sink failed.
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a configuration file.
    #[error("failed to read config '{path}': {source}")]
    ReadConfig {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// Failed to serialize configuration to TOML.
    #[error("failed to serialize config: {0}")]
    SerializeConfig(#[from] toml::ser::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid configuration error.
    pub fn invalid_config(param: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            param,
            reason: reason.into(),
        }
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(what: &'static str, expected: impl Display, actual: impl Display) -> Self {
        Error::ShapeMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a config read error.
    pub fn read_config(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ReadConfig {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from rejected construction parameters.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig { .. } | Error::ReadConfig { .. } | Error::ParseConfig(_)
        )
    }

    /// Whether this error came from an input outside a component's domain.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::InsufficientSignal { .. }
                | Error::RefinementDomain { .. }
                | Error::FrameRange { .. }
                | Error::BinOutOfRange { .. }
                | Error::ShapeMismatch { .. }
        )
    }

    /// Whether this error is a numerical failure during estimation.
    pub fn is_numerical(&self) -> bool {
        matches!(self, Error::SingularInnovation | Error::ArEstimation(_))
    }
}
