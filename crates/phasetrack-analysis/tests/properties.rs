//! Property-based tests for phasetrack-analysis.
//!
//! Frame bookkeeping, analysis/synthesis round trips, the refiner's offset
//! domain and tracker determinism, over randomized parameters.

use phasetrack_analysis::{
    ArKalmanTracker, Complex64, Error, FrameGrid, StftAnalyzer, SubBinRefiner, TrackerConfig,
    WindowKind, window,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Frame count and synthesis length follow from window length, hop and
    /// signal length alone.
    #[test]
    fn frame_count_matches_grid(
        window_len in 1usize..128,
        fft_factor in 1usize..4,
        overlap in 0.0f64..0.9,
        extra in 0usize..512,
    ) {
        let analyzer = StftAnalyzer::new(
            WindowKind::Hann.periodic(window_len),
            window_len * fft_factor,
            overlap,
        );
        let hop = ((1.0 - overlap) * window_len as f64).floor() as usize;
        prop_assume!(hop >= 1);
        let analyzer = analyzer.unwrap();
        prop_assert_eq!(analyzer.frame_inc(), hop);

        let signal = vec![0.0; window_len + extra];
        let spectrogram = analyzer.analyze(&signal).unwrap();
        let expected = extra / hop + 1;
        prop_assert_eq!(spectrogram.num_frames(), expected);
        prop_assert_eq!(spectrogram.num_bins(), window_len * fft_factor);

        let out = analyzer.synthesize(&spectrogram).unwrap();
        prop_assert_eq!(out.len(), expected * hop + window_len);
    }

    /// Signals shorter than one window are rejected, never padded.
    #[test]
    fn short_signal_rejected(window_len in 2usize..256, short_by in 1usize..64) {
        let grid = FrameGrid::new(window_len, window_len, 0.5).unwrap();
        let len = window_len.saturating_sub(short_by);
        let is_insufficient = matches!(
            grid.num_frames(len),
            Err(Error::InsufficientSignal { .. })
        );
        prop_assert!(is_insufficient);
    }

    /// A COLA window reproduces any signal over the region covered by a full
    /// set of overlapping frames.
    #[test]
    fn cola_round_trip(
        samples in prop::collection::vec(-1.0f64..=1.0, 1024..2048),
        log2_window in 4u32..8,
    ) {
        let window_len = 1usize << log2_window;
        let analyzer = StftAnalyzer::new(
            WindowKind::Hann.periodic(window_len),
            window_len,
            0.5,
        ).unwrap();
        let hop = analyzer.frame_inc();
        let gain = window::cola_gain(analyzer.window(), hop, 1e-9).unwrap();

        let spectrogram = analyzer.analyze(&samples).unwrap();
        let out = analyzer.synthesize(&spectrogram).unwrap();
        let covered_end = spectrogram.num_frames() * hop;

        for n in hop..covered_end {
            prop_assert!(
                (out[n] / gain - samples[n]).abs() < 1e-9,
                "sample {}: {} vs {}", n, out[n] / gain, samples[n]
            );
        }
    }

    /// Offsets on or beyond (resolution - 1) / resolution are always domain
    /// errors; offsets inside are always accepted.
    #[test]
    fn refiner_offset_domain(
        resolution in 2usize..200,
        offset in -2.0f64..2.0,
    ) {
        let refiner = SubBinRefiner::new(&WindowKind::Hamming.symmetric(64), 128, resolution).unwrap();
        let limit = (resolution - 1) as f64 / resolution as f64;

        let mag = refiner.get_mag(&[1.0], &[offset]);
        let phase = refiner.get_phase(&[0.0], &[offset]);
        if offset.abs() >= limit {
            let rejected = matches!(mag, Err(Error::RefinementDomain { .. }));
            prop_assert!(rejected);
            prop_assert!(phase.is_err());
        } else {
            prop_assert!(mag.unwrap()[0].is_finite());
            prop_assert!(phase.unwrap()[0].is_finite());
        }
    }

    /// Two trackers fed the same observations agree exactly, and reading
    /// accessors never changes the outcome.
    #[test]
    fn tracker_is_deterministic(
        observations in prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 1..64),
        frequency in 0.0f64..std::f64::consts::PI,
    ) {
        let config = TrackerConfig::default();
        let mut a = ArKalmanTracker::new(256, frequency, &config).unwrap();
        let mut b = ArKalmanTracker::new(256, frequency, &config).unwrap();

        for &(re, im) in &observations {
            let y = Complex64::new(re, im);
            let _ = (a.state().clone(), a.transition().clone(), a.obs_uncertainty());
            let ea = a.push(y, frequency).unwrap();
            let eb = b.push(y, frequency).unwrap();
            prop_assert_eq!(ea, eb);
            prop_assert!(ea.re.is_finite() && ea.im.is_finite());
        }
        prop_assert_eq!(a.frames_pushed(), observations.len());
    }
}
