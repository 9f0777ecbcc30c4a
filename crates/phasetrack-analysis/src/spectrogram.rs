//! Complex spectrogram container.
//!
//! A [`Spectrogram`] is a `[bin, frame]` matrix of complex DFT values together
//! with the [`FrameGrid`] it was analyzed on. It is a plain value: cloning
//! copies the data, and frame slices are copies rather than views.
//!
//! Frame assignment and add/subtract accept either another spectrogram or a
//! raw complex matrix through [`FrameSource`].

use crate::error::{Error, Result};
use crate::fft::wrap_phase;
use crate::stft::FrameGrid;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;
use std::ops::{Add, Range, Sub};

/// Floor applied to linear magnitudes before taking logarithms.
const MAGNITUDE_FLOOR: f64 = 1e-5;

/// Complex STFT data addressed `[bin, frame]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    data: Array2<Complex64>,
    grid: FrameGrid,
}

/// Operand accepted by frame assignment and spectrogram arithmetic.
#[derive(Debug, Clone, Copy)]
pub enum FrameSource<'a> {
    /// A raw `[bin, frame]` complex matrix.
    Raw(ArrayView2<'a, Complex64>),
    /// Another spectrogram; only its data is used.
    Spectrogram(&'a Spectrogram),
}

impl<'a> FrameSource<'a> {
    /// The operand's `[bin, frame]` data.
    pub fn view(&self) -> ArrayView2<'a, Complex64> {
        match *self {
            FrameSource::Raw(view) => view,
            FrameSource::Spectrogram(spec) => spec.data.view(),
        }
    }

    /// Number of frames (columns) in the operand.
    pub fn num_frames(&self) -> usize {
        self.view().ncols()
    }
}

impl<'a> From<&'a Spectrogram> for FrameSource<'a> {
    fn from(spec: &'a Spectrogram) -> Self {
        FrameSource::Spectrogram(spec)
    }
}

impl<'a> From<ArrayView2<'a, Complex64>> for FrameSource<'a> {
    fn from(view: ArrayView2<'a, Complex64>) -> Self {
        FrameSource::Raw(view)
    }
}

impl<'a> From<&'a Array2<Complex64>> for FrameSource<'a> {
    fn from(array: &'a Array2<Complex64>) -> Self {
        FrameSource::Raw(array.view())
    }
}

fn shape_str(rows: usize, cols: usize) -> String {
    format!("{rows}x{cols}")
}

impl Spectrogram {
    /// Wrap `[bin, frame]` data analyzed on `grid`.
    ///
    /// The number of rows must equal the grid's FFT size.
    pub fn new(data: Array2<Complex64>, grid: FrameGrid) -> Result<Self> {
        if data.nrows() != grid.fft_size() {
            return Err(Error::shape_mismatch(
                "spectrogram bins",
                grid.fft_size(),
                data.nrows(),
            ));
        }
        Ok(Self { data, grid })
    }

    /// An all-zero spectrogram of `num_frames` frames on `grid`.
    pub fn zeros(grid: FrameGrid, num_frames: usize) -> Self {
        Self {
            data: Array2::zeros((grid.fft_size(), num_frames)),
            grid,
        }
    }

    /// The complex `[bin, frame]` matrix.
    pub fn spec(&self) -> &Array2<Complex64> {
        &self.data
    }

    /// Mutable access to the matrix values; the shape cannot change.
    pub fn spec_mut(&mut self) -> ndarray::ArrayViewMut2<'_, Complex64> {
        self.data.view_mut()
    }

    /// Consume the spectrogram and return its matrix.
    pub fn into_spec(self) -> Array2<Complex64> {
        self.data
    }

    /// Frame grid this spectrogram was analyzed on.
    pub fn grid(&self) -> &FrameGrid {
        &self.grid
    }

    /// Samples elapsed between the starts of consecutive frames.
    pub fn frame_inc(&self) -> usize {
        self.grid.frame_inc()
    }

    /// Number of frames.
    pub fn num_frames(&self) -> usize {
        self.data.ncols()
    }

    /// Number of bins per frame (the FFT size).
    pub fn num_bins(&self) -> usize {
        self.data.nrows()
    }

    /// Whether the spectrogram holds no frames.
    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    /// One bin across all frames.
    pub fn bin(&self, bin: usize) -> Option<ArrayView1<'_, Complex64>> {
        (bin < self.num_bins()).then(|| self.data.index_axis(Axis(0), bin))
    }

    /// All bins of one frame.
    pub fn frame(&self, frame: usize) -> Option<ArrayView1<'_, Complex64>> {
        (frame < self.num_frames()).then(|| self.data.index_axis(Axis(1), frame))
    }

    fn check_range(&self, range: &Range<usize>) -> Result<()> {
        if range.start > range.end || range.end > self.num_frames() {
            return Err(Error::FrameRange {
                start: range.start,
                end: range.end,
                num_frames: self.num_frames(),
            });
        }
        Ok(())
    }

    /// Copy of the frames in `range`, on the same grid.
    pub fn frames(&self, range: Range<usize>) -> Result<Spectrogram> {
        self.check_range(&range)?;
        Ok(Spectrogram {
            data: self.data.slice(s![.., range]).to_owned(),
            grid: self.grid,
        })
    }

    /// Overwrite the frames in `range` with `source`.
    ///
    /// `source` must have the same number of bins and exactly `range.len()`
    /// frames.
    pub fn set_frames<'a>(
        &mut self,
        range: Range<usize>,
        source: impl Into<FrameSource<'a>>,
    ) -> Result<()> {
        self.check_range(&range)?;
        let source = source.into().view();
        let expected = (self.num_bins(), range.len());
        if source.dim() != expected {
            return Err(Error::shape_mismatch(
                "frame assignment",
                shape_str(expected.0, expected.1),
                shape_str(source.nrows(), source.ncols()),
            ));
        }

        self.data.slice_mut(s![.., range]).assign(&source);
        Ok(())
    }

    fn zip_with<'a>(
        &self,
        other: impl Into<FrameSource<'a>>,
        op: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> Result<Spectrogram> {
        let other = other.into().view();
        if other.dim() != self.data.dim() {
            return Err(Error::shape_mismatch(
                "spectrogram arithmetic",
                shape_str(self.num_bins(), self.num_frames()),
                shape_str(other.nrows(), other.ncols()),
            ));
        }

        let mut data = self.data.clone();
        data.zip_mut_with(&other, |a, &b| *a = op(*a, b));
        Ok(Spectrogram {
            data,
            grid: self.grid,
        })
    }

    /// Elementwise complex sum with an equally shaped operand.
    pub fn checked_add<'a>(&self, other: impl Into<FrameSource<'a>>) -> Result<Spectrogram> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Elementwise complex difference with an equally shaped operand.
    pub fn checked_sub<'a>(&self, other: impl Into<FrameSource<'a>>) -> Result<Spectrogram> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Magnitudes in dB, clipped `dynamic_range` dB below the maximum.
    ///
    /// Linear magnitudes below `1e-5` are floored first; any NaN maps to the
    /// clip floor.
    pub fn magnitude_db(&self, dynamic_range: f64) -> Array2<f64> {
        let mut db = self
            .data
            .mapv(|c| 20.0 * c.norm().max(MAGNITUDE_FLOOR).log10());

        let max_val = db
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);
        let min_val = max_val - dynamic_range;

        db.mapv_inplace(|v| if v.is_nan() || v < min_val { min_val } else { v });
        db
    }

    /// Per-bin frequency deviation from the bin centre, in fractional bins.
    ///
    /// For every bin and each pair of consecutive frames, the measured phase
    /// advance is compared with the advance `2π * bin * H / N` a sinusoid
    /// exactly at the bin centre would show. The wrapped difference is
    /// converted to a frequency offset in bins. The result has shape
    /// `[bins, frames - 1]`.
    ///
    /// Offsets are only unambiguous while `|offset| < N / (2H)`.
    pub fn phase_deviation(&self) -> Array2<f64> {
        let num_frames = self.num_frames();
        if num_frames < 2 {
            return Array2::zeros((self.num_bins(), 0));
        }

        let fft_size = self.grid.fft_size() as f64;
        let hop = self.grid.frame_inc() as f64;
        let to_bins = fft_size / (2.0 * PI * hop);

        Array2::from_shape_fn((self.num_bins(), num_frames - 1), |(bin, frame)| {
            let advance = self.data[(bin, frame + 1)].arg() - self.data[(bin, frame)].arg();
            let expected = 2.0 * PI * bin as f64 * hop / fft_size;
            wrap_phase(advance - expected) * to_bins
        })
    }
}

impl Add<&Spectrogram> for &Spectrogram {
    type Output = Spectrogram;

    /// # Panics
    ///
    /// Panics if the shapes differ. Use [`Spectrogram::checked_add`] to get
    /// an error instead.
    fn add(self, rhs: &Spectrogram) -> Spectrogram {
        self.checked_add(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Sub<&Spectrogram> for &Spectrogram {
    type Output = Spectrogram;

    /// # Panics
    ///
    /// Panics if the shapes differ. Use [`Spectrogram::checked_sub`] to get
    /// an error instead.
    fn sub(self, rhs: &Spectrogram) -> Spectrogram {
        self.checked_sub(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stft::StftAnalyzer;
    use crate::window::WindowKind;

    fn grid() -> FrameGrid {
        FrameGrid::new(8, 8, 0.5).unwrap()
    }

    fn ramp(frames: usize) -> Spectrogram {
        let data = Array2::from_shape_fn((8, frames), |(b, f)| {
            Complex64::new(b as f64, f as f64)
        });
        Spectrogram::new(data, grid()).unwrap()
    }

    #[test]
    fn new_rejects_wrong_bin_count() {
        let data = Array2::<Complex64>::zeros((4, 3));
        assert!(Spectrogram::new(data, grid()).unwrap_err().is_domain());
    }

    #[test]
    fn zeros_has_requested_shape() {
        let spec = Spectrogram::zeros(grid(), 5);
        assert_eq!(spec.num_bins(), 8);
        assert_eq!(spec.num_frames(), 5);
        assert_eq!(spec.frame_inc(), 4);
        assert!(!spec.is_empty());
        assert!(Spectrogram::zeros(grid(), 0).is_empty());
    }

    #[test]
    fn frames_slice_copies_selected_columns() {
        let spec = ramp(6);
        let slice = spec.frames(2..5).unwrap();
        assert_eq!(slice.num_frames(), 3);
        assert_eq!(slice.spec()[(3, 0)], Complex64::new(3.0, 2.0));
        assert_eq!(slice.grid(), spec.grid());
    }

    #[test]
    fn frames_out_of_range() {
        let spec = ramp(4);
        assert!(matches!(
            spec.frames(2..7),
            Err(Error::FrameRange { start: 2, end: 7, num_frames: 4 })
        ));
    }

    #[test]
    fn set_frames_from_spectrogram_and_raw() {
        let mut spec = Spectrogram::zeros(grid(), 6);
        let src = ramp(2);
        spec.set_frames(1..3, &src).unwrap();
        assert_eq!(spec.spec()[(5, 2)], Complex64::new(5.0, 1.0));

        let raw = Array2::from_elem((8, 1), Complex64::new(-1.0, 0.5));
        spec.set_frames(5..6, &raw).unwrap();
        assert_eq!(spec.spec()[(0, 5)], Complex64::new(-1.0, 0.5));
        assert_eq!(spec.spec()[(0, 4)], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn set_frames_width_must_match() {
        let mut spec = Spectrogram::zeros(grid(), 6);
        let src = ramp(3);
        let err = spec.set_frames(0..2, &src).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }), "got {err}");

        let raw = Array2::<Complex64>::zeros((4, 2));
        assert!(spec.set_frames(0..2, raw.view()).is_err());
    }

    #[test]
    fn add_and_subtract() {
        let a = ramp(3);
        let b = ramp(3);
        let sum = &a + &b;
        assert_eq!(sum.spec()[(2, 1)], Complex64::new(4.0, 2.0));

        let diff = &sum - &b;
        assert_eq!(diff, a);

        let raw = Array2::from_elem((8, 3), Complex64::new(1.0, 1.0));
        let shifted = a.checked_add(&raw).unwrap();
        assert_eq!(shifted.spec()[(0, 0)], Complex64::new(1.0, 1.0));
    }

    #[test]
    fn checked_arithmetic_rejects_mismatched_shapes() {
        let a = ramp(3);
        let b = ramp(4);
        assert!(a.checked_add(&b).is_err());
        assert!(a.checked_sub(&b).is_err());
    }

    #[test]
    #[should_panic]
    fn operator_panics_on_mismatch() {
        let _ = &ramp(3) + &ramp(2);
    }

    #[test]
    fn magnitude_db_clips_to_dynamic_range() {
        let mut spec = Spectrogram::zeros(grid(), 2);
        spec.spec_mut()[(1, 0)] = Complex64::new(10.0, 0.0);
        spec.spec_mut()[(2, 0)] = Complex64::new(0.1, 0.0);

        let db = spec.magnitude_db(50.0);
        assert!((db[(1, 0)] - 20.0).abs() < 1e-12);
        assert!((db[(2, 0)] - (-20.0)).abs() < 1e-12);
        // Zero magnitude is floored to -100 dB, then clipped to max - range.
        assert!((db[(0, 1)] - (-30.0)).abs() < 1e-12);

        let narrow = spec.magnitude_db(30.0);
        assert!((narrow[(2, 0)] - (-10.0)).abs() < 1e-12);
    }

    #[test]
    fn phase_deviation_recovers_fractional_bin() {
        let window = WindowKind::Hann.periodic(1024);
        let analyzer = StftAnalyzer::new(window, 2048, 0.5).unwrap();
        let grid = *analyzer.grid();

        let freq = grid.bin_frequency(100.25);
        let signal: Vec<f64> = (0..8192).map(|n| (freq * n as f64).cos()).collect();
        let spec = analyzer.analyze(&signal).unwrap();

        let deviation = spec.phase_deviation();
        assert_eq!(deviation.dim(), (2048, spec.num_frames() - 1));
        for frame in 0..deviation.ncols() {
            let d = deviation[(100, frame)];
            assert!((d - 0.25).abs() < 1e-3, "frame {frame}: {d}");
        }
    }

    #[test]
    fn phase_deviation_of_single_frame_is_empty() {
        let spec = Spectrogram::zeros(grid(), 1);
        assert_eq!(spec.phase_deviation().dim(), (8, 0));
    }

    #[test]
    fn bin_and_frame_views() {
        let spec = ramp(3);
        assert_eq!(spec.bin(4).unwrap()[2], Complex64::new(4.0, 2.0));
        assert_eq!(spec.frame(1).unwrap()[7], Complex64::new(7.0, 1.0));
        assert!(spec.bin(8).is_none());
        assert!(spec.frame(3).is_none());
    }
}
