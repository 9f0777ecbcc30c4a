//! FFT wrapper over cached `rustfft` plans.
//!
//! Everything here is the full complex DFT: no half-spectrum truncation, since
//! the overlap-add path inverts all `size` bins and takes the real part.

use rustfft::num_complex::Complex64;
use rustfft::{FftPlanner, num_complex::Complex};
use std::fmt;
use std::sync::Arc;

/// FFT processor with cached forward and inverse plans.
#[derive(Clone)]
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward DFT of a real sequence.
    ///
    /// The input is zero-padded or truncated to the FFT size, like an
    /// `n`-point DFT of a shorter or longer sequence.
    pub fn forward_real(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);
        buffer
    }

    /// Forward DFT in place. `buffer.len()` must equal the FFT size.
    pub fn forward(&self, buffer: &mut [Complex64]) {
        self.fft.process(buffer);
    }

    /// Inverse DFT in place, normalized by `1 / size`.
    pub fn inverse(&self, buffer: &mut [Complex64]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

impl fmt::Debug for Fft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish()
    }
}

/// Wrap a phase to the principal interval `(-π, π]`.
pub fn wrap_phase(phase: f64) -> f64 {
    use std::f64::consts::PI;
    let wrapped = (phase + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_roundtrip() {
        let fft = Fft::new(256);

        let input: Vec<f64> = (0..256)
            .map(|i| (2.0 * PI * 10.0 * i as f64 / 256.0).sin())
            .collect();

        let mut spectrum = fft.forward_real(&input);
        fft.inverse(&mut spectrum);

        for (a, b) in input.iter().zip(spectrum.iter()) {
            assert!((a - b.re).abs() < 1e-12, "Mismatch: {} vs {}", a, b.re);
            assert!(b.im.abs() < 1e-12);
        }
    }

    #[test]
    fn test_dc_detection() {
        let fft = Fft::new(256);

        let spectrum = fft.forward_real(&[1.0; 256]);

        let dc_mag = spectrum[0].norm();
        let other_mag: f64 = spectrum[1..].iter().map(|c| c.norm()).sum();

        assert!((dc_mag - 256.0).abs() < 1e-9);
        assert!(other_mag < 1e-6);
    }

    #[test]
    fn forward_real_zero_pads_and_truncates() {
        let fft = Fft::new(8);

        // Short input: DC bin is the plain sum.
        let short = fft.forward_real(&[1.0, 2.0, 3.0]);
        assert_eq!(short.len(), 8);
        assert!((short[0].re - 6.0).abs() < 1e-12);

        // Long input: samples past the FFT size are dropped.
        let long = fft.forward_real(&[1.0; 20]);
        assert!((long[0].re - 8.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_phase_principal_interval() {
        assert!((wrap_phase(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(-PI) - PI).abs() < 1e-12);
        assert!((wrap_phase(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_phase(-2.0 * PI - 0.25) + 0.25).abs() < 1e-12);
    }
}
