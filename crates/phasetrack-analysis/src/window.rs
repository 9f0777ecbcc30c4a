//! Analysis window generation.
//!
//! Windows are plain `Vec<f64>` coefficient sequences once generated; every
//! component that needs one owns its own copy.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    Hann,
    /// Hamming window
    #[default]
    Hamming,
    /// Blackman window
    Blackman,
    /// Blackman-Harris window (better sidelobe suppression)
    BlackmanHarris,
}

impl WindowKind {
    /// Periodic window of `size` samples (DFT-even).
    ///
    /// Periodic Hann at 50% overlap sums to exactly 1, which makes it the
    /// natural choice for analysis/synthesis round trips.
    pub fn periodic(&self, size: usize) -> Vec<f64> {
        self.generate(size, size as f64)
    }

    /// Symmetric window of `size` samples (first and last sample equal).
    pub fn symmetric(&self, size: usize) -> Vec<f64> {
        if size == 1 {
            return vec![1.0];
        }
        self.generate(size, size.saturating_sub(1) as f64)
    }

    /// Window of `size` samples in the requested symmetry.
    pub fn coefficients(&self, size: usize, symmetric: bool) -> Vec<f64> {
        if symmetric {
            self.symmetric(size)
        } else {
            self.periodic(size)
        }
    }

    /// Multiply `buffer` in place by the periodic window of its length.
    pub fn apply(&self, buffer: &mut [f64]) {
        let coeffs = self.periodic(buffer.len());
        for (sample, w) in buffer.iter_mut().zip(coeffs) {
            *sample *= w;
        }
    }

    fn generate(&self, size: usize, denom: f64) -> Vec<f64> {
        (0..size)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / denom;
                match self {
                    WindowKind::Rectangular => 1.0,
                    WindowKind::Hann => 0.5 * (1.0 - x.cos()),
                    WindowKind::Hamming => 0.54 - 0.46 * x.cos(),
                    WindowKind::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    WindowKind::BlackmanHarris => {
                        0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                            - 0.01168 * (3.0 * x).cos()
                    }
                }
            })
            .collect()
    }
}

/// Raw sample sum of a window, its DC gain.
///
/// A sinusoid of amplitude `A` at an exact bin shows up with magnitude
/// `A * sum / 2` in that bin.
pub fn sum(window: &[f64]) -> f64 {
    window.iter().sum()
}

/// Sum of squared window samples.
///
/// White noise of variance `σ²` produces per-bin variance `σ² * sum_of_squares`,
/// which is the measurement uncertainty a tracker should be given.
pub fn sum_of_squares(window: &[f64]) -> f64 {
    window.iter().map(|w| w * w).sum()
}

/// Constant overlap-add gain of `window` at hop `frame_inc`.
///
/// Returns the constant value the shifted windows sum to, or `None` if the sum
/// varies by more than `tolerance` (relative) across one hop.
pub fn cola_gain(window: &[f64], frame_inc: usize, tolerance: f64) -> Option<f64> {
    if window.is_empty() || frame_inc == 0 {
        return None;
    }

    let sums: Vec<f64> = (0..frame_inc)
        .map(|phase| window.iter().skip(phase).step_by(frame_inc).sum())
        .collect();

    let max = sums.iter().copied().fold(f64::MIN, f64::max);
    let min = sums.iter().copied().fold(f64::MAX, f64::min);

    if max <= 0.0 || (max - min) > tolerance * max {
        None
    } else {
        Some(sums.iter().sum::<f64>() / sums.len() as f64)
    }
}
