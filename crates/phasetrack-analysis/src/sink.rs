//! Output sinks for analysis results.
//!
//! Plotting, playback and file export all sit behind [`SpectrumSink`]; the
//! engine and the tracker never call a sink themselves.

use std::io::Write;

use crate::error::Result;
use crate::partial::TrackResult;
use crate::spectrogram::Spectrogram;

/// Something a sink can consume.
#[derive(Debug, Clone, Copy)]
pub enum SinkItem<'a> {
    /// A complex spectrogram.
    Spectrogram(&'a Spectrogram),
    /// A time-domain signal, such as a resynthesis buffer.
    Signal(&'a [f64]),
    /// Per-frame tracking output.
    Track(&'a TrackResult),
}

/// Read-only consumer of analysis output.
pub trait SpectrumSink {
    /// Consume one item.
    fn consume(&mut self, item: SinkItem<'_>) -> Result<()>;
}

/// How spectrogram magnitudes are written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MagnitudeScale {
    /// Raw magnitude.
    Linear,
    /// Log magnitude clipped `dynamic_range` dB below the maximum.
    Decibels {
        /// Range kept below the loudest bin.
        dynamic_range: f64,
    },
}

impl Default for MagnitudeScale {
    fn default() -> Self {
        MagnitudeScale::Decibels {
            dynamic_range: 120.0,
        }
    }
}

/// Writes each consumed item as a CSV table.
///
/// - spectrograms: one row per frame, `start_sample` then the magnitude of
///   every non-negative frequency bin
/// - signals: `sample,value`
/// - tracks: one row per frame with observation and estimate in rectangular
///   and polar form
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
    scale: MagnitudeScale,
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer, using the default magnitude scale.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            scale: MagnitudeScale::default(),
        }
    }

    /// Set the magnitude scale for spectrogram tables.
    pub fn with_scale(mut self, scale: MagnitudeScale) -> Self {
        self.scale = scale;
        self
    }

    /// Flush and return the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_spectrogram(&mut self, spectrogram: &Spectrogram) -> Result<()> {
        let bins = spectrogram.num_bins() / 2 + 1;
        let magnitudes = match self.scale {
            MagnitudeScale::Linear => spectrogram.spec().mapv(|c| c.norm()),
            MagnitudeScale::Decibels { dynamic_range } => spectrogram.magnitude_db(dynamic_range),
        };

        write!(self.writer, "start_sample")?;
        for bin in 0..bins {
            write!(self.writer, ",bin_{bin}")?;
        }
        writeln!(self.writer)?;

        for frame in 0..spectrogram.num_frames() {
            write!(self.writer, "{}", spectrogram.grid().frame_start(frame))?;
            for bin in 0..bins {
                write!(self.writer, ",{:.6}", magnitudes[[bin, frame]])?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_signal(&mut self, signal: &[f64]) -> Result<()> {
        writeln!(self.writer, "sample,value")?;
        for (i, x) in signal.iter().enumerate() {
            writeln!(self.writer, "{i},{x:.9}")?;
        }
        Ok(())
    }

    fn write_track(&mut self, track: &TrackResult) -> Result<()> {
        writeln!(
            self.writer,
            "frame,start_sample,obs_re,obs_im,est_re,est_im,est_mag,est_phase"
        )?;
        for (frame, (obs, est)) in track.observations.iter().zip(&track.estimates).enumerate() {
            writeln!(
                self.writer,
                "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                frame,
                frame * track.frame_inc,
                obs.re,
                obs.im,
                est.re,
                est.im,
                est.norm(),
                est.arg()
            )?;
        }
        Ok(())
    }
}

impl<W: Write> SpectrumSink for CsvSink<W> {
    fn consume(&mut self, item: SinkItem<'_>) -> Result<()> {
        match item {
            SinkItem::Spectrogram(s) => self.write_spectrogram(s),
            SinkItem::Signal(x) => self.write_signal(x),
            SinkItem::Track(t) => self.write_track(t),
        }
    }
}
