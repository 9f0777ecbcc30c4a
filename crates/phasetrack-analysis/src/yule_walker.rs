//! Autoregressive model fitting by the Yule-Walker method.
//!
//! Coefficients follow the prediction-error convention
//!
//! ```text
//! x[n] + a[1]·x[n-1] + … + a[p]·x[n-p] = e[n]
//! ```
//!
//! so the one-step predictor is `x̂[n] = -Σ a[k]·x[n-k]`.

use crate::error::{Error, Result};
use rustfft::num_complex::Complex64;

/// A fitted AR model.
#[derive(Debug, Clone, PartialEq)]
pub struct ArModel {
    /// `a[1..=p]`, lag 1 first.
    pub coeffs: Vec<Complex64>,
    /// Variance of the driving prediction error.
    pub noise_variance: f64,
}

/// Biased autocorrelation `r[k] = (1/N) Σ x[n+k]·conj(x[n])` for lags
/// `0..=max_lag`.
pub fn autocorrelation(samples: &[Complex64], max_lag: usize) -> Vec<Complex64> {
    let n = samples.len();
    if n == 0 {
        return vec![Complex64::new(0.0, 0.0); max_lag + 1];
    }
    let scale = 1.0 / n as f64;
    (0..=max_lag)
        .map(|k| {
            if k >= n {
                return Complex64::new(0.0, 0.0);
            }
            samples[k..]
                .iter()
                .zip(samples)
                .map(|(lead, lag)| lead * lag.conj())
                .sum::<Complex64>()
                * scale
        })
        .collect()
}

/// Fit an AR model of `order` to `samples`.
///
/// Solves the Yule-Walker equations with the Levinson-Durbin recursion on the
/// biased autocorrelation, which keeps the fitted model stable.
pub fn yule_walker(samples: &[Complex64], order: usize) -> Result<ArModel> {
    if order == 0 {
        return Err(Error::ArEstimation("model order must be > 0".to_string()));
    }
    if order >= samples.len() {
        return Err(Error::ArEstimation(format!(
            "order {order} needs more than {} samples",
            samples.len()
        )));
    }

    let r = autocorrelation(samples, order);
    let r0 = r[0].re;
    if r0.is_nan() || r0 <= 0.0 {
        return Err(Error::ArEstimation("input has zero energy".to_string()));
    }

    let mut a: Vec<Complex64> = Vec::with_capacity(order);
    let mut error = r0;

    for m in 1..=order {
        let acc = r[m]
            + a.iter()
                .enumerate()
                .map(|(k, ak)| ak * r[m - 1 - k])
                .sum::<Complex64>();
        let reflection = -acc / error;

        let previous = a.clone();
        for (k, ak) in a.iter_mut().enumerate() {
            *ak += reflection * previous[m - 2 - k].conj();
        }
        a.push(reflection);

        error *= 1.0 - reflection.norm_sqr();
        if error.is_nan() || error <= 0.0 {
            return Err(Error::ArEstimation(format!(
                "prediction error vanished at order {m}"
            )));
        }
    }

    Ok(ArModel {
        coeffs: a,
        noise_variance: error,
    })
}
