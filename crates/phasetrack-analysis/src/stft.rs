//! Short-time Fourier analysis and overlap-add synthesis.
//!
//! The engine slides a fixed window over a fully buffered signal. Frame `k`
//! covers `signal[k * H .. k * H + W]`, where `H` is the frame increment and
//! `W` the window length, so frame 0 starts on the first input sample and the
//! last frame is the last one that fits completely inside the signal.
//!
//! Synthesis applies no synthesis window: each frame is inverse transformed,
//! truncated to `W` samples and summed at `k * H`. The result reproduces the
//! input only when the analysis window satisfies constant overlap-add at the
//! configured hop (see [`crate::window::cola_gain`]).
//!
//! # Example
//!
//! ```rust
//! use phasetrack_analysis::stft::StftAnalyzer;
//! use phasetrack_analysis::window::WindowKind;
//!
//! let window = WindowKind::Hann.periodic(1024);
//! let analyzer = StftAnalyzer::new(window, 2048, 0.5).unwrap();
//! assert_eq!(analyzer.frame_inc(), 512);
//!
//! let signal = vec![0.0; 4096];
//! let spectrogram = analyzer.analyze(&signal).unwrap();
//! assert_eq!(spectrogram.num_frames(), 7);
//!
//! let resynth = analyzer.synthesize(&spectrogram).unwrap();
//! assert_eq!(resynth.len(), 7 * 512 + 1024);
//! ```

use crate::config::StftConfig;
use crate::error::{Error, Result};
use crate::fft::Fft;
use crate::spectrogram::Spectrogram;
use ndarray::{Array2, Axis};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Derived framing parameters shared by the engine and the tracker.
///
/// The frame increment is the single source of truth for the hop: the
/// tracker derives its expected phase advance per frame from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGrid {
    window_len: usize,
    fft_size: usize,
    overlap: f64,
    frame_inc: usize,
}

impl FrameGrid {
    /// Build a grid from window length, FFT size and overlap fraction.
    ///
    /// The frame increment is `floor((1 - overlap) * window_len)` and must be
    /// at least one sample.
    pub fn new(window_len: usize, fft_size: usize, overlap: f64) -> Result<Self> {
        if window_len == 0 {
            return Err(Error::invalid_config("window_len", "window must not be empty"));
        }
        if fft_size == 0 {
            return Err(Error::invalid_config("fft_size", "must be > 0"));
        }
        if !overlap.is_finite() || !(0.0..1.0).contains(&overlap) {
            return Err(Error::invalid_config(
                "overlap",
                format!("{overlap} is outside [0, 1)"),
            ));
        }

        let frame_inc = ((1.0 - overlap) * window_len as f64).floor() as usize;
        if frame_inc == 0 {
            return Err(Error::invalid_config(
                "overlap",
                format!("overlap {overlap} on a {window_len}-sample window leaves a zero frame increment"),
            ));
        }

        Ok(Self {
            window_len,
            fft_size,
            overlap,
            frame_inc,
        })
    }

    /// Analysis window length in samples.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Number of DFT bins per frame.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Overlap fraction between successive frames.
    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    /// Samples elapsed between the starts of consecutive frames.
    pub fn frame_inc(&self) -> usize {
        self.frame_inc
    }

    /// First sample of frame `frame`.
    pub fn frame_start(&self, frame: usize) -> usize {
        frame * self.frame_inc
    }

    /// Number of complete frames in a signal of `signal_len` samples.
    pub fn num_frames(&self, signal_len: usize) -> Result<usize> {
        if signal_len < self.window_len {
            return Err(Error::InsufficientSignal {
                len: signal_len,
                window_len: self.window_len,
            });
        }
        Ok((signal_len - self.window_len) / self.frame_inc + 1)
    }

    /// Length of the overlap-add output for `num_frames` frames.
    pub fn output_len(&self, num_frames: usize) -> usize {
        num_frames * self.frame_inc + self.window_len
    }

    /// Centre frequency of a (possibly fractional) bin in radians per sample.
    pub fn bin_frequency(&self, bin: f64) -> f64 {
        2.0 * PI * bin / self.fft_size as f64
    }

    /// Nearest integer bin to `frequency` (radians per sample) and the
    /// fractional offset of `frequency` from that bin.
    pub fn nearest_bin(&self, frequency: f64) -> (usize, f64) {
        let exact = frequency * self.fft_size as f64 / (2.0 * PI);
        let bin = exact.round().max(0.0);
        (bin as usize, exact - bin)
    }

    /// Unit rotor by which a sinusoid at `frequency` (radians per sample)
    /// advances over one frame increment.
    pub fn expected_phase(&self, frequency: f64) -> Complex64 {
        expected_phase(self.frame_inc, frequency)
    }
}

/// Unit rotor `exp(i * frame_inc * frequency)`.
pub fn expected_phase(frame_inc: usize, frequency: f64) -> Complex64 {
    Complex64::from_polar(1.0, frame_inc as f64 * frequency)
}

/// STFT (Short-Time Fourier Transform) analyzer and overlap-add synthesizer.
#[derive(Debug, Clone)]
pub struct StftAnalyzer {
    window: Vec<f64>,
    grid: FrameGrid,
    fft: Fft,
}

impl StftAnalyzer {
    /// Create a new STFT analyzer
    ///
    /// # Arguments
    /// * `window` - Analysis window; its length is the frame length
    /// * `fft_size` - DFT size; frames are zero-padded or truncated to it
    /// * `overlap` - Overlap fraction between frames, in `[0, 1)`
    pub fn new(window: Vec<f64>, fft_size: usize, overlap: f64) -> Result<Self> {
        let grid = FrameGrid::new(window.len(), fft_size, overlap)?;

        tracing::debug!(
            window_len = grid.window_len(),
            fft_size,
            overlap,
            frame_inc = grid.frame_inc(),
            "stft analyzer configured"
        );

        Ok(Self {
            window,
            grid,
            fft: Fft::new(fft_size),
        })
    }

    /// Create an analyzer from a configuration section.
    pub fn from_config(config: &StftConfig) -> Result<Self> {
        Self::new(config.window_coefficients(), config.fft_size, config.overlap)
    }

    /// Analyze a signal from start to finish.
    ///
    /// Produces `floor((len - W) / H) + 1` frames of `fft_size` complex bins.
    /// Fails with [`Error::InsufficientSignal`] if the signal is shorter than
    /// one window.
    pub fn analyze(&self, signal: &[f64]) -> Result<Spectrogram> {
        let num_frames = self.grid.num_frames(signal.len())?;
        let fft_size = self.grid.fft_size();
        let window_len = self.grid.window_len();

        let mut data = Array2::<Complex64>::zeros((fft_size, num_frames));
        let mut buffer = vec![Complex64::new(0.0, 0.0); fft_size];

        for (frame_idx, mut column) in data.axis_iter_mut(Axis(1)).enumerate() {
            let start = self.grid.frame_start(frame_idx);
            let frame = &signal[start..start + window_len];

            buffer.fill(Complex64::new(0.0, 0.0));
            for (slot, (&x, &w)) in buffer.iter_mut().zip(frame.iter().zip(&self.window)) {
                slot.re = x * w;
            }

            self.fft.forward(&mut buffer);

            for (dst, &src) in column.iter_mut().zip(&buffer) {
                *dst = src;
            }
        }

        tracing::trace!(num_frames, signal_len = signal.len(), "analyzed signal");

        Spectrogram::new(data, self.grid)
    }

    /// Resynthesize a spectrogram with overlap-add and no synthesis window.
    ///
    /// Output length is `num_frames * H + W`. The spectrogram must have been
    /// produced on the same frame grid.
    pub fn synthesize(&self, spectrogram: &Spectrogram) -> Result<Vec<f64>> {
        if *spectrogram.grid() != self.grid {
            return Err(Error::shape_mismatch(
                "spectrogram grid",
                format_args!("{:?}", self.grid),
                format_args!("{:?}", spectrogram.grid()),
            ));
        }

        let fft_size = self.grid.fft_size();
        let taps = self.grid.window_len().min(fft_size);
        let mut output = vec![0.0; self.grid.output_len(spectrogram.num_frames())];
        let mut buffer = vec![Complex64::new(0.0, 0.0); fft_size];

        for (frame_idx, column) in spectrogram.spec().axis_iter(Axis(1)).enumerate() {
            for (dst, &src) in buffer.iter_mut().zip(column.iter()) {
                *dst = src;
            }

            self.fft.inverse(&mut buffer);

            let start = self.grid.frame_start(frame_idx);
            for (out, sample) in output[start..start + taps].iter_mut().zip(&buffer) {
                *out += sample.re;
            }
        }

        Ok(output)
    }

    /// Analysis window coefficients.
    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Frame grid derived from the configuration.
    pub fn grid(&self) -> &FrameGrid {
        &self.grid
    }

    /// Samples elapsed between the starts of consecutive frames.
    pub fn frame_inc(&self) -> usize {
        self.grid.frame_inc()
    }

    /// DFT size.
    pub fn fft_size(&self) -> usize {
        self.grid.fft_size()
    }

    /// Window length.
    pub fn window_len(&self) -> usize {
        self.grid.window_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowKind;

    fn cosine(freq: f64, len: usize) -> Vec<f64> {
        (0..len).map(|n| (freq * n as f64).cos()).collect()
    }

    #[test]
    fn frame_increment_floors() {
        let grid = FrameGrid::new(882, 3528, 1.0 - 1.0 / 16.0).unwrap();
        assert_eq!(grid.frame_inc(), 55);

        let grid = FrameGrid::new(1024, 2048, 0.5).unwrap();
        assert_eq!(grid.frame_inc(), 512);
    }

    #[test]
    fn zero_frame_increment_rejected() {
        let err = FrameGrid::new(4, 8, 0.9).unwrap_err();
        assert!(err.is_config(), "got {err}");
    }

    #[test]
    fn overlap_outside_unit_interval_rejected() {
        assert!(FrameGrid::new(1024, 2048, 1.0).is_err());
        assert!(FrameGrid::new(1024, 2048, -0.1).is_err());
        assert!(FrameGrid::new(1024, 2048, f64::NAN).is_err());
        assert!(FrameGrid::new(0, 2048, 0.5).is_err());
        assert!(FrameGrid::new(1024, 0, 0.5).is_err());
    }

    #[test]
    fn frame_count_formula() {
        let grid = FrameGrid::new(1024, 2048, 0.5).unwrap();
        assert_eq!(grid.num_frames(1024).unwrap(), 1);
        assert_eq!(grid.num_frames(1535).unwrap(), 1);
        assert_eq!(grid.num_frames(1536).unwrap(), 2);
        assert_eq!(grid.num_frames(132300).unwrap(), 257);
        assert!(matches!(
            grid.num_frames(1023),
            Err(Error::InsufficientSignal { len: 1023, window_len: 1024 })
        ));
    }

    #[test]
    fn nearest_bin_and_offset() {
        let grid = FrameGrid::new(1024, 2048, 0.5).unwrap();
        let (bin, offset) = grid.nearest_bin(grid.bin_frequency(100.25));
        assert_eq!(bin, 100);
        assert!((offset - 0.25).abs() < 1e-9);

        let (bin, offset) = grid.nearest_bin(grid.bin_frequency(99.75));
        assert_eq!(bin, 100);
        assert!((offset + 0.25).abs() < 1e-9);
    }

    #[test]
    fn expected_phase_is_unit_rotor() {
        let grid = FrameGrid::new(1024, 2048, 0.5).unwrap();
        let rotor = grid.expected_phase(0.1);
        assert!((rotor.norm() - 1.0).abs() < 1e-12);
        assert!((rotor.arg() - crate::fft::wrap_phase(51.2)).abs() < 1e-9);
    }

    #[test]
    fn frame_zero_aligned_to_first_sample() {
        // An impulse at sample 0 must appear only in frame 0, as a flat spectrum
        // scaled by the first window sample.
        let window = WindowKind::Rectangular.periodic(64);
        let analyzer = StftAnalyzer::new(window, 64, 0.5).unwrap();

        let mut signal = vec![0.0; 256];
        signal[0] = 1.0;
        let spec = analyzer.analyze(&signal).unwrap();

        for c in spec.frame(0).unwrap() {
            assert!((c.re - 1.0).abs() < 1e-12 && c.im.abs() < 1e-12);
        }
        for c in spec.frame(1).unwrap() {
            assert!(c.norm() < 1e-12);
        }
    }

    #[test]
    fn bin_aligned_tone_peaks_at_its_bin() {
        let window = WindowKind::Hamming.symmetric(1024);
        let win_sum = crate::window::sum(&window);
        let analyzer = StftAnalyzer::new(window, 2048, 0.5).unwrap();
        let grid = *analyzer.grid();

        let bin = 300;
        let signal = cosine(grid.bin_frequency(bin as f64), 8192);
        let spec = analyzer.analyze(&signal).unwrap();

        for frame in 0..spec.num_frames() {
            let column = spec.frame(frame).unwrap();
            let mag = column[bin].norm();
            assert!((mag - win_sum / 2.0).abs() < 1e-6 * win_sum, "frame {frame}: {mag}");
        }
    }

    #[test]
    fn fft_shorter_than_window_truncates_frames() {
        let window = WindowKind::Rectangular.periodic(128);
        let analyzer = StftAnalyzer::new(window, 64, 0.5).unwrap();
        let spec = analyzer.analyze(&[1.0; 256]).unwrap();
        assert_eq!(spec.num_bins(), 64);
        // DC bin sums only the first 64 samples of each frame.
        assert!((spec.spec()[(0, 0)].re - 64.0).abs() < 1e-9);

        let out = analyzer.synthesize(&spec).unwrap();
        assert_eq!(out.len(), analyzer.grid().output_len(spec.num_frames()));
    }

    #[test]
    fn synthesize_rejects_foreign_grid() {
        let a = StftAnalyzer::new(WindowKind::Hann.periodic(256), 512, 0.5).unwrap();
        let b = StftAnalyzer::new(WindowKind::Hann.periodic(256), 512, 0.75).unwrap();
        let spec = b.analyze(&[0.0; 1024]).unwrap();
        assert!(a.synthesize(&spec).unwrap_err().is_domain());
    }

    #[test]
    fn roundtrip_with_cola_window() {
        let window = WindowKind::Hann.periodic(512);
        let analyzer = StftAnalyzer::new(window, 1024, 0.5).unwrap();
        let hop = analyzer.frame_inc();

        let signal: Vec<f64> = (0..10_000)
            .map(|n| (0.013 * n as f64).sin() + 0.3 * (0.31 * n as f64).cos())
            .collect();

        let spec = analyzer.analyze(&signal).unwrap();
        let out = analyzer.synthesize(&spec).unwrap();

        let covered_end = (spec.num_frames() - 1) * hop + analyzer.window_len() - hop;
        for n in hop..covered_end {
            assert!(
                (out[n] - signal[n]).abs() < 1e-9,
                "sample {n}: {} vs {}",
                out[n],
                signal[n]
            );
        }
    }
}
