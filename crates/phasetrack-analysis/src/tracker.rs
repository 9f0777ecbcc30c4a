//! Autoregressive Kalman tracking of a single sinusoidal partial.
//!
//! The state holds the last `p` complex values of the partial, each rotated
//! forward to the current frame. The transition shifts that register one slot
//! while advancing it by the expected phase rotor, and predicts the newest
//! slot from a weighted sum of the whole register:
//!
//! ```text
//!     ┌                         ┐
//!     │ 0   ρ   0   …   0       │
//!     │ 0   0   ρ   …   0       │
//! A = │ ⋮               ⋮       │     ρ = exp(i · frame_inc · ω)
//!     │ 0   0   0   …   ρ       │
//!     │ c₀  c₁  c₂  …   c_{p-1} │
//!     └                         ┘
//! ```
//!
//! With [`TransitionStrategy::Fixed`] the predictor row is `ρ / p` in every
//! slot, an average of the aligned history advanced one frame. With
//! [`TransitionStrategy::AdaptiveFromHistory`] it comes from a Yule-Walker fit
//! to the phase-aligned observation history once that history is full.
//!
//! Each push runs one predict/correct cycle:
//!
//! ```text
//! x ← A·x            P ← P + Q
//! K = P·Hᵀ·(H·P·Hᵀ + R)⁻¹
//! x ← x + K·(y − H·x)
//! P ← (I − K·H)·P
//! ```
//!
//! The covariance is propagated without `A·P·Aᴴ`; `Q` alone sets how quickly
//! the filter forgets.

use nalgebra::{DMatrix, DVector};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{TrackerConfig, check_uncertainty};
use crate::error::{Error, Result};
use crate::stft::expected_phase;
use crate::yule_walker::yule_walker;

/// How the transition's predictor row is produced on each push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStrategy {
    /// Frequency-locked average of the aligned register.
    #[default]
    Fixed,
    /// AR coefficients fit to the aligned observation history, once it is full.
    AdaptiveFromHistory,
}

/// Fixed-length window of recent observations, kept phase-aligned to the
/// newest frame.
#[derive(Debug, Clone)]
struct HistoryRing {
    samples: VecDeque<Complex64>,
}

impl HistoryRing {
    fn new(size: usize) -> Self {
        Self {
            samples: std::iter::repeat_n(Complex64::new(0.0, 0.0), size).collect(),
        }
    }

    /// Advance every stored value by `rotor`, drop the oldest and append
    /// `observation`.
    fn rotate_in(&mut self, observation: Complex64, rotor: Complex64) {
        if self.samples.is_empty() {
            return;
        }
        for sample in &mut self.samples {
            *sample *= rotor;
        }
        self.samples.pop_front();
        self.samples.push_back(observation);
    }

    fn as_slice(&mut self) -> &[Complex64] {
        self.samples.make_contiguous()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Kalman filter with an autoregressive, phase-locked transition model.
///
/// One instance tracks one partial. The only mutator of filter state is
/// [`push`](Self::push) (or [`push_vector`](Self::push_vector)); start over by
/// constructing a new tracker.
#[derive(Debug, Clone)]
pub struct ArKalmanTracker {
    frame_inc: usize,
    order: usize,
    observation_dim: usize,
    transition_uncertainty: f64,
    measurement_uncertainty: f64,
    strategy: TransitionStrategy,
    history: HistoryRing,
    state: DVector<Complex64>,
    transition: DMatrix<Complex64>,
    covariance: DMatrix<f64>,
    observation: DMatrix<f64>,
    frames_pushed: usize,
    adapting: bool,
}

impl ArKalmanTracker {
    /// Create a tracker for a partial near `start_frequency`.
    ///
    /// # Arguments
    /// * `frame_inc` - Hop between observations in samples
    /// * `start_frequency` - Initial frequency in radians per sample
    /// * `config` - Model order, noise levels and transition strategy
    pub fn new(frame_inc: usize, start_frequency: f64, config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        if frame_inc == 0 {
            return Err(Error::invalid_config("frame_inc", "must be > 0"));
        }
        if !start_frequency.is_finite() {
            return Err(Error::invalid_config(
                "start_frequency",
                format!("{start_frequency} is not finite"),
            ));
        }

        let p = config.num_ar_coeffs;
        let m = config.observation_dim;

        let mut observation = DMatrix::zeros(m, p);
        for i in 0..m {
            observation[(i, p - m + i)] = 1.0;
        }

        let mut tracker = Self {
            frame_inc,
            order: p,
            observation_dim: m,
            transition_uncertainty: config.transition_uncertainty,
            measurement_uncertainty: config.measurement_uncertainty,
            strategy: config.strategy,
            history: HistoryRing::new(config.history_size),
            state: DVector::zeros(p),
            transition: DMatrix::zeros(p, p),
            covariance: DMatrix::zeros(p, p),
            observation,
            frames_pushed: 0,
            adapting: false,
        };
        tracker.rebuild_transition(expected_phase(frame_inc, start_frequency));

        tracing::debug!(
            frame_inc,
            start_frequency,
            order = p,
            observation_dim = m,
            strategy = ?config.strategy,
            "ar kalman tracker configured"
        );

        Ok(tracker)
    }

    /// Fuse one scalar observation made at `frequency` (radians per sample)
    /// and return the smoothed estimate for this frame.
    ///
    /// Only valid when the observation dimension is 1.
    pub fn push(&mut self, observation: Complex64, frequency: f64) -> Result<Complex64> {
        if self.observation_dim != 1 {
            return Err(Error::shape_mismatch("observation", self.observation_dim, 1));
        }
        let estimate = self.step(&[observation], frequency)?;
        Ok(estimate[0])
    }

    /// Fuse an observation of the last `observation_dim` state components.
    pub fn push_vector(&mut self, observation: &[Complex64], frequency: f64) -> Result<Vec<Complex64>> {
        if observation.len() != self.observation_dim {
            return Err(Error::shape_mismatch(
                "observation",
                self.observation_dim,
                observation.len(),
            ));
        }
        let estimate = self.step(observation, frequency)?;
        Ok(estimate.iter().copied().collect())
    }

    fn step(&mut self, y: &[Complex64], frequency: f64) -> Result<DVector<Complex64>> {
        let p = self.order;
        let m = self.observation_dim;

        // Everything fallible happens before the first mutation.
        let mut predicted_cov = self.covariance.clone();
        for i in 0..p {
            predicted_cov[(i, i)] += self.transition_uncertainty;
        }
        let h = &self.observation;
        let innovation = h * &predicted_cov * h.transpose()
            + DMatrix::<f64>::identity(m, m) * self.measurement_uncertainty;
        let innovation_inv = innovation
            .try_inverse()
            .ok_or(Error::SingularInnovation)?;
        let gain = &predicted_cov * h.transpose() * innovation_inv;

        self.frames_pushed += 1;
        let rotor = expected_phase(self.frame_inc, frequency);
        self.history.rotate_in(y[m - 1], rotor);
        self.rebuild_transition(rotor);

        let predicted = &self.transition * &self.state;
        let residual = DVector::from_column_slice(y) - predicted.rows(p - m, m);
        let complex_gain = gain.map(|k| Complex64::new(k, 0.0));
        self.state = predicted + complex_gain * residual;
        self.covariance = (DMatrix::<f64>::identity(p, p) - &gain * &self.observation) * predicted_cov;

        let estimate = self.state.rows(p - m, m).into_owned();

        tracing::trace!(
            frame = self.frames_pushed,
            re = estimate[m - 1].re,
            im = estimate[m - 1].im,
            adapting = self.adapting,
            "tracker push"
        );

        Ok(estimate)
    }

    fn rebuild_transition(&mut self, rotor: Complex64) {
        let p = self.order;
        let row = self.predictor_row(rotor);

        let mut transition = DMatrix::zeros(p, p);
        for i in 0..p - 1 {
            transition[(i, i + 1)] = rotor;
        }
        for (j, c) in row.into_iter().enumerate() {
            transition[(p - 1, j)] = c;
        }
        self.transition = transition;
    }

    fn predictor_row(&mut self, rotor: Complex64) -> Vec<Complex64> {
        let p = self.order;
        let locked = vec![rotor / p as f64; p];

        if self.strategy == TransitionStrategy::Fixed || self.frames_pushed <= self.history.len() {
            self.adapting = false;
            return locked;
        }

        match yule_walker(self.history.as_slice(), p) {
            Ok(model) => {
                if !self.adapting {
                    tracing::debug!(
                        frame = self.frames_pushed,
                        noise_variance = model.noise_variance,
                        "adaptive transition engaged"
                    );
                }
                self.adapting = true;
                (0..p).map(|j| -model.coeffs[p - 1 - j] * rotor).collect()
            }
            Err(e) => {
                tracing::debug!(frame = self.frames_pushed, error = %e, "AR fit failed, using locked predictor");
                self.adapting = false;
                locked
            }
        }
    }

    /// Measurement noise level.
    pub fn obs_uncertainty(&self) -> f64 {
        self.measurement_uncertainty
    }

    /// Replace the measurement noise level used by subsequent pushes.
    pub fn set_obs_uncertainty(&mut self, value: f64) -> Result<()> {
        check_uncertainty("measurement_uncertainty", value)?;
        self.measurement_uncertainty = value;
        Ok(())
    }

    /// Current state: the aligned register, newest value last.
    pub fn state(&self) -> &DVector<Complex64> {
        &self.state
    }

    /// Transition matrix used by the last push (or built at construction).
    pub fn transition(&self) -> &DMatrix<Complex64> {
        &self.transition
    }

    /// Predictive covariance after the last correction.
    pub fn predictive_covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Number of pushes so far.
    pub fn frames_pushed(&self) -> usize {
        self.frames_pushed
    }

    /// Hop between observations in samples.
    pub fn frame_inc(&self) -> usize {
        self.frame_inc
    }

    /// AR order (state dimension).
    pub fn order(&self) -> usize {
        self.order
    }

    /// Transition strategy.
    pub fn strategy(&self) -> TransitionStrategy {
        self.strategy
    }

    /// Whether the current transition came from a fitted AR model.
    pub fn is_adapting(&self) -> bool {
        self.adapting
    }
}
