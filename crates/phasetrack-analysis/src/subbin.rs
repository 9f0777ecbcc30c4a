//! Sub-bin magnitude and phase refinement.
//!
//! When a sinusoid falls between DFT bins, the nearest integer bin sees it
//! through the analysis window's own spectrum evaluated at the fractional
//! offset: its magnitude is attenuated and its phase is rotated. The refiner
//! precomputes that window response once, on an oversampled grid, and undoes
//! it with a table lookup instead of re-running a DFT per correction.
//!
//! # Algorithm
//!
//! ```text
//! K[j]   = DFT_{N·r}(window)[j]                  oversampled window spectrum
//! table  = K[0 .. r] ++ K[N·r - r .. N·r]        offsets [0, 1) then [-1, 0)
//! idx    = round_half_even(offset · r)           negative idx wraps into the tail
//! mag'   = mag / |table[idx]| · Σ window
//! phase' = phase + arg(table[idx])
//! ```
//!
//! Offsets must satisfy `|offset| < (r - 1) / r`; anything else is a
//! [`Error::RefinementDomain`], never a clamped value.

use crate::error::{Error, Result};
use crate::fft::Fft;
use rustfft::num_complex::Complex64;

/// Precomputed window-kernel lookup for sub-bin refinement.
#[derive(Debug, Clone)]
pub struct SubBinRefiner {
    magnitude: Vec<f64>,
    phase: Vec<f64>,
    resolution: usize,
    window_energy: f64,
}

impl SubBinRefiner {
    /// Build the lookup kernel for `window` analyzed at `fft_size` points.
    ///
    /// # Arguments
    /// * `window` - The STFT analysis window the refined values came from
    /// * `fft_size` - The STFT DFT size
    /// * `resolution` - Lookup subdivisions per bin; at least 2
    pub fn new(window: &[f64], fft_size: usize, resolution: usize) -> Result<Self> {
        if window.is_empty() {
            return Err(Error::invalid_config("window", "window must not be empty"));
        }
        if fft_size == 0 {
            return Err(Error::invalid_config("fft_size", "must be > 0"));
        }
        if resolution < 2 {
            return Err(Error::invalid_config(
                "resolution",
                format!("{resolution} leaves an empty refinement domain; need at least 2"),
            ));
        }

        let oversampled = Fft::new(fft_size * resolution).forward_real(window);
        let tail = oversampled.len() - resolution;
        let kernel: Vec<Complex64> = oversampled[..resolution]
            .iter()
            .chain(&oversampled[tail..])
            .copied()
            .collect();

        let window_energy = crate::window::sum(window);

        tracing::debug!(
            fft_size,
            resolution,
            window_energy,
            "sub-bin kernel built"
        );

        Ok(Self {
            magnitude: kernel.iter().map(|c| c.norm()).collect(),
            phase: kernel.iter().map(|c| c.arg()).collect(),
            resolution,
            window_energy,
        })
    }

    /// Lookup subdivisions per bin.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Raw sample sum of the analysis window.
    pub fn window_energy(&self) -> f64 {
        self.window_energy
    }

    /// Exclusive bound on `|offset|`: `(resolution - 1) / resolution`.
    pub fn max_offset(&self) -> f64 {
        (self.resolution - 1) as f64 / self.resolution as f64
    }

    fn lookup_index(&self, offset: f64) -> Result<usize> {
        let limit = self.max_offset();
        if offset.is_nan() || offset.abs() >= limit {
            return Err(Error::RefinementDomain { offset, limit });
        }

        let idx = (offset * self.resolution as f64).round_ties_even() as isize;
        Ok(if idx < 0 {
            (2 * self.resolution as isize + idx) as usize
        } else {
            idx as usize
        })
    }

    fn lookup_all(&self, observed: usize, offsets: &[f64]) -> Result<Vec<usize>> {
        if observed != offsets.len() {
            return Err(Error::shape_mismatch("offsets", observed, offsets.len()));
        }
        offsets.iter().map(|&o| self.lookup_index(o)).collect()
    }

    /// Re-estimate magnitudes observed at integer bins for peaks lying at
    /// `offsets` bins from those bins.
    ///
    /// All offsets are checked before any value is produced.
    pub fn get_mag(&self, magnitudes: &[f64], offsets: &[f64]) -> Result<Vec<f64>> {
        let indices = self.lookup_all(magnitudes.len(), offsets)?;
        Ok(magnitudes
            .iter()
            .zip(indices)
            .map(|(&m, idx)| m / self.magnitude[idx] * self.window_energy)
            .collect())
    }

    /// Re-estimate phases observed at integer bins for peaks lying at
    /// `offsets` bins from those bins.
    ///
    /// Results are not wrapped.
    pub fn get_phase(&self, phases: &[f64], offsets: &[f64]) -> Result<Vec<f64>> {
        let indices = self.lookup_all(phases.len(), offsets)?;
        Ok(phases
            .iter()
            .zip(indices)
            .map(|(&p, idx)| p + self.phase[idx])
            .collect())
    }

    /// Scalar form of [`get_mag`](Self::get_mag).
    pub fn refine_magnitude(&self, magnitude: f64, offset: f64) -> Result<f64> {
        let idx = self.lookup_index(offset)?;
        Ok(magnitude / self.magnitude[idx] * self.window_energy)
    }

    /// Scalar form of [`get_phase`](Self::get_phase).
    pub fn refine_phase(&self, phase: f64, offset: f64) -> Result<f64> {
        let idx = self.lookup_index(offset)?;
        Ok(phase + self.phase[idx])
    }

    /// Refine a complex bin value: magnitude and phase together.
    pub fn refine(&self, value: Complex64, offset: f64) -> Result<Complex64> {
        let idx = self.lookup_index(offset)?;
        Ok(Complex64::from_polar(
            value.norm() / self.magnitude[idx] * self.window_energy,
            value.arg() + self.phase[idx],
        ))
    }
}

/// Fractional bin offset of a magnitude peak by parabolic interpolation.
///
/// `left`, `centre` and `right` are magnitudes at bins `k - 1`, `k`, `k + 1`
/// with `centre` the local maximum. Returns the offset from `k`, in bins.
/// A flat neighbourhood yields 0.
pub fn parabolic_offset(left: f64, centre: f64, right: f64) -> f64 {
    let denom = left - 2.0 * centre + right;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    0.5 * (left - right) / denom
}
