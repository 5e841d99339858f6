/*
Kolmogorov-Smirnov test of a work distribution against a Gaussian fitted to
its own mean and (population) standard deviation.

The Crooks Gaussian intersection assumes both work distributions are
Gaussian. This test only flags when that assumption looks doubtful; it never
stops an estimate from being computed.

    Dmax   = sup |F_emp(x) - Phi(x)|
    lambda = (sqrt(n) + 0.12 + 0.11 / sqrt(n)) * Dmax      (Stephens)
    q      = Q_KS(lambda) = 2 sum_{k>=1} (-1)^(k-1) exp(-2 k^2 lambda^2)
*/

use crate::error::{EstimatorError, Result};
use crate::stat_mech::descriptive::{mean, stdev_population};

use serde::Serialize;
use std::f64::consts::{PI, SQRT_2};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalityResult {
    /// Asymptotic tail probability of `statistic`; near 1 for Gaussian data.
    pub quality: f64,
    pub statistic: f64,
    pub critical: f64,
    pub dmax: f64,
    pub samples: usize,
    pub ok: bool,
}

pub fn ks_norm_test(distribution: &[f64], alpha: f64) -> Result<NormalityResult> {
    let n = distribution.len();
    if n < 2 {
        return Err(EstimatorError::insufficient("normality test", 2, n));
    }
    let critical = critical_lambda(alpha)?;

    let mu = mean(distribution);
    let sigma = stdev_population(distribution);
    if sigma <= f64::EPSILON * mu.abs().max(1.0) {
        return Err(EstimatorError::DegenerateVariance {
            what: "normality test".to_string(),
        });
    }

    let mut sorted = distribution.to_vec();
    sorted.sort_by(f64::total_cmp);

    let nf = n as f64;
    let dmax = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let fitted = normal_cdf(x, mu, sigma);
            let above = (i + 1) as f64 / nf - fitted;
            let below = fitted - i as f64 / nf;
            above.abs().max(below.abs())
        })
        .fold(0.0, f64::max);

    let root_n = nf.sqrt();
    let statistic = (root_n + 0.12 + 0.11 / root_n) * dmax;
    let quality = kolmogorov_survival(statistic);
    let ok = statistic < critical;

    log::debug!(
        "KS test: n = {n}, Dmax = {dmax:.4}, lambda = {statistic:.4}, lambda0 = {critical:.4}, q = {quality:.3}"
    );

    Ok(NormalityResult {
        quality,
        statistic,
        critical,
        dmax,
        samples: n,
        ok,
    })
}

/// Q_KS(lambda) = 1 - K(lambda), the Kolmogorov tail probability.
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // Jacobi theta form of the CDF converges fast for small lambda
        let y = (-PI * PI / (8.0 * lambda * lambda)).exp();
        let cdf = (2.0 * PI).sqrt() / lambda * (y + y.powi(9) + y.powi(25) + y.powi(49));
        (1.0 - cdf).clamp(0.0, 1.0)
    } else {
        let x = (-2.0 * lambda * lambda).exp();
        (2.0 * (x - x.powi(4) + x.powi(9) - x.powi(16))).clamp(0.0, 1.0)
    }
}

/// lambda0 with Q_KS(lambda0) = alpha, found by bisection.
pub fn critical_lambda(alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(EstimatorError::InvalidConfig(format!(
            "significance level must lie in (0, 1), got {alpha}"
        )));
    }
    let (mut lo, mut hi) = (0.05_f64, 10.0_f64);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if kolmogorov_survival(mid) > alpha {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

pub fn normal_cdf(x: f64, mean: f64, std: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (std * SQRT_2)))
}

// Abramowitz & Stegun 7.1.26, |error| < 1.5e-7
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
