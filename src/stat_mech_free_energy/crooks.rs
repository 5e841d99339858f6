/*
Crooks Gaussian Intersection (CGI)

By the Crooks fluctuation theorem the forward work density P_f(W) and the
density of the negated reverse work P_r(-W) cross at W = dG. Fitting a
Gaussian to each direction turns the crossing into a quadratic:

    a x^2 + b x + c = 0
    a = 1/s_r^2 - 1/s_f^2
    b = 2 (m_f/s_f^2 - m_r/s_r^2)
    c = m_r^2/s_r^2 - m_f^2/s_f^2 - 2 ln(s_f/s_r)

and the root lying between the two means is the estimate. When the two
Gaussians do not cross between their means, the midpoint of the means is
reported instead and `intersects` is false.
*/

use crate::config::EstimatorConfig;
use crate::error::{EstimatorError, Result};
use crate::stat_mech::descriptive::{mean, stdev_population};
use crate::stat_mech::resampling::{block_estimates, spread, Resampler, RngStream};
use crate::stat_mech_free_energy::results::{CgiResult, ErrorEstimates, ErrorKind, GaussianFit};

use rand::rngs::StdRng;
use rand_distr::{ChiSquared, Distribution, Normal};
use std::f64::consts::PI;

// widths closer than this (relative) are treated as equal
const SIGMA_RTOL: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub dg: f64,
    pub intersects: bool,
}

pub fn fit_gaussian(values: &[f64], what: &str) -> Result<GaussianFit> {
    if values.len() < 2 {
        return Err(EstimatorError::insufficient(
            format!("{what} Gaussian fit"),
            2,
            values.len(),
        ));
    }
    let std = stdev_population(values);
    Ok(GaussianFit {
        mean: mean(values),
        std,
        amplitude: 1.0 / (std * (2.0 * PI).sqrt()),
        samples: values.len(),
    })
}

/// Crossing point of N(mf, sf) and N(mr, sr) between the two means.
pub fn gaussian_intersection(mf: f64, sf: f64, mr: f64, sr: f64) -> Intersection {
    let midpoint = Intersection {
        dg: 0.5 * (mf + mr),
        intersects: false,
    };
    let (lo, hi) = if mf <= mr { (mf, mr) } else { (mr, mf) };
    let between = |x: f64| x.is_finite() && x >= lo && x <= hi;
    let crossing = |x: f64| {
        if between(x) {
            Intersection {
                dg: x,
                intersects: true,
            }
        } else {
            midpoint
        }
    };

    let widest = sf.max(sr);
    if widest <= 0.0 {
        // two delta peaks only meet if they sit on top of each other
        return if mf == mr {
            Intersection {
                dg: mf,
                intersects: true,
            }
        } else {
            midpoint
        };
    }
    if sf <= 0.0 || sr <= 0.0 {
        return midpoint;
    }

    let (vf, vr) = (sf * sf, sr * sr);
    let b = 2.0 * (mf / vf - mr / vr);
    let c = mr * mr / vr - mf * mf / vf - 2.0 * (sf / sr).ln();

    if (sf - sr).abs() <= SIGMA_RTOL * widest {
        // equal widths: the quadratic term vanishes
        if (mf - mr).abs() <= SIGMA_RTOL * widest {
            return Intersection {
                dg: 0.5 * (mf + mr),
                intersects: true,
            };
        }
        return crossing(-c / b);
    }

    let a = 1.0 / vr - 1.0 / vf;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return midpoint;
    }
    // cancellation-free pair of roots
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let mut roots = vec![q / a];
    if q != 0.0 {
        roots.push(c / q);
    }
    roots
        .into_iter()
        .find(|&x| between(x))
        .map(crossing)
        .unwrap_or(midpoint)
}

/// CGI point estimate from raw work values.
pub fn cgi_point(forward: &[f64], reverse: &[f64]) -> Result<Intersection> {
    let f = fit_gaussian(forward, "forward")?;
    let r = fit_gaussian(reverse, "reverse")?;
    Ok(gaussian_intersection(f.mean, f.std, r.mean, r.std))
}

// Sampling distributions of the fitted mean and width of one direction:
// mean ~ N(m, s / sqrt(n)), n s'^2 / s^2 ~ chi^2(n - 1).
struct FitSampler {
    mean: Normal<f64>,
    chi_squared: ChiSquared<f64>,
    std: f64,
    n: f64,
}

impl FitSampler {
    fn new(fit: &GaussianFit) -> Result<Self> {
        let n = fit.samples as f64;
        let mean = Normal::new(fit.mean, fit.std / n.sqrt())
            .map_err(|e| EstimatorError::Sampling(e.to_string()))?;
        let chi_squared =
            ChiSquared::new(n - 1.0).map_err(|e| EstimatorError::Sampling(e.to_string()))?;
        Ok(Self {
            mean,
            chi_squared,
            std: fit.std,
            n,
        })
    }

    fn draw(&self, rng: &mut StdRng) -> (f64, f64) {
        let mean = self.mean.sample(rng);
        let std = self.std * (self.chi_squared.sample(rng) / self.n).sqrt();
        (mean, std)
    }
}

/// Parametric bootstrap of the intersection: redraw both fitted Gaussians
/// from their sampling distributions and take the spread of the crossings.
pub fn parametric_bootstrap_error(
    forward: &GaussianFit,
    reverse: &GaussianFit,
    draws: usize,
    seed: u64,
) -> Result<Option<f64>> {
    let forward_sampler = FitSampler::new(forward)?;
    let reverse_sampler = FitSampler::new(reverse)?;

    let crossings = Resampler::new(seed, RngStream::CgiParametric).replicate(
        "CGI parametric bootstrap",
        draws,
        |rng| {
            let (mf, sf) = forward_sampler.draw(rng);
            let (mr, sr) = reverse_sampler.draw(rng);
            Ok(gaussian_intersection(mf, sf, mr, sr).dg)
        },
    );
    Ok(spread(crossings))
}

pub fn cgi(forward: &[f64], reverse: &[f64], config: &EstimatorConfig) -> Result<CgiResult> {
    let forward_fit = fit_gaussian(forward, "forward")?;
    let reverse_fit = fit_gaussian(reverse, "reverse")?;
    let crossing = gaussian_intersection(
        forward_fit.mean,
        forward_fit.std,
        reverse_fit.mean,
        reverse_fit.std,
    );
    if !crossing.intersects {
        log::warn!(
            "CGI: Gaussians do not intersect between their means, taking the midpoint {:.4}",
            crossing.dg
        );
    }

    let mut errors = ErrorEstimates::new();
    errors.insert(
        ErrorKind::BootstrapParametric,
        parametric_bootstrap_error(&forward_fit, &reverse_fit, config.parametric_boots, config.seed)?,
    );

    let point = |f: &[f64], r: &[f64]| cgi_point(f, r).map(|x| x.dg);
    if config.nboots > 0 {
        let boots = Resampler::new(config.seed, RngStream::CgiBootstrap).bootstrap(
            forward,
            reverse,
            config.nboots,
            point,
        );
        errors.insert(ErrorKind::Bootstrap, spread(boots));
    }
    if config.nblocks > 1 {
        let blocks = block_estimates(forward, reverse, config.nblocks, point)?;
        errors.insert(ErrorKind::Block, spread(blocks));
    }

    Ok(CgiResult {
        dg: crossing.dg,
        forward: forward_fit,
        reverse: reverse_fit,
        intersects: crossing.intersects,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn density(x: f64, m: f64, s: f64) -> f64 {
        (-(x - m).powi(2) / (2.0 * s * s)).exp() / (s * (2.0 * PI).sqrt())
    }

    #[test]
    fn identical_distributions_meet_at_their_mean() {
        let w = [1.0, 2.0, 4.0, 7.0, 9.0];
        let config = EstimatorConfig::new(300.0).with_parametric_boots(50);
        let result = cgi(&w, &w, &config).unwrap();
        assert!(result.intersects);
        assert!((result.dg - mean(&w)).abs() < 1e-12);
    }

    #[test]
    fn equal_widths_cross_at_midpoint() {
        let x = gaussian_intersection(0.0, 1.0, 2.0, 1.0);
        assert!(x.intersects);
        assert!((x.dg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unequal_widths_cross_where_densities_match() {
        let x = gaussian_intersection(0.0, 1.0, 3.0, 2.0);
        assert!(x.intersects);
        assert!(x.dg > 0.0 && x.dg < 3.0);
        assert!((density(x.dg, 0.0, 1.0) - density(x.dg, 3.0, 2.0)).abs() < 1e-10);
        assert!((x.dg - 1.4183).abs() < 1e-3);

        // argument order does not matter
        let swapped = gaussian_intersection(3.0, 2.0, 0.0, 1.0);
        assert!((swapped.dg - x.dg).abs() < 1e-12);
    }

    #[test]
    fn narrow_peak_inside_wide_one_has_no_crossing() {
        let x = gaussian_intersection(0.0, 10.0, 0.1, 0.5);
        assert!(!x.intersects);
        assert!((x.dg - 0.05).abs() < 1e-12);
    }

    #[test]
    fn zero_widths() {
        let same = gaussian_intersection(1.5, 0.0, 1.5, 0.0);
        assert!(same.intersects);
        assert_eq!(same.dg, 1.5);

        let apart = gaussian_intersection(1.0, 0.0, 3.0, 0.0);
        assert!(!apart.intersects);
        assert_eq!(apart.dg, 2.0);

        let one_sided = gaussian_intersection(1.0, 0.0, 3.0, 1.0);
        assert!(!one_sided.intersects);
        assert_eq!(one_sided.dg, 2.0);
    }

    #[test]
    fn overlapping_scenario_lands_between_the_means() {
        let wf = [1.0, 2.0, 3.0, 4.0, 5.0];
        let wr = [1.2, 2.1, 3.3, 3.9, 5.1];
        let config = EstimatorConfig::new(298.15);
        let result = cgi(&wf, &wr, &config).unwrap();
        assert!(result.dg >= 2.5 && result.dg <= 3.5, "dG = {}", result.dg);
        // the fits cross at ~2.55 and ~6.82, both outside [3.0, 3.12]
        assert!(!result.intersects);
        assert!((result.dg - 3.06).abs() < 1e-12);
        assert!(result.errors.get(ErrorKind::BootstrapParametric).unwrap() > 0.0);
        assert!(!result.errors.contains(ErrorKind::Bootstrap));
        assert!(!result.errors.contains(ErrorKind::Block));
    }

    #[test]
    fn requested_errors_are_reproducible() {
        let wf: Vec<f64> = (0..40).map(|i| 10.0 + (i as f64 * 0.37).sin() * 2.0).collect();
        let wr: Vec<f64> = (0..40).map(|i| 9.0 + (i as f64 * 0.53).cos() * 2.5).collect();
        let config = EstimatorConfig::new(300.0)
            .with_nboots(64)
            .with_nblocks(4)
            .with_seed(99);

        let first = cgi(&wf, &wr, &config).unwrap();
        let second = cgi(&wf, &wr, &config).unwrap();
        assert_eq!(first, second);
        assert!(first.errors.contains(ErrorKind::Bootstrap));
        assert!(first.errors.contains(ErrorKind::Block));
    }

    #[test]
    fn too_few_samples() {
        let config = EstimatorConfig::new(300.0);
        assert!(matches!(
            cgi(&[1.0], &[1.0, 2.0], &config),
            Err(EstimatorError::InsufficientData { .. })
        ));
        assert!(matches!(
            cgi(&[1.0, 2.0], &[1.0, 2.0], &config.clone().with_nblocks(3)),
            Err(EstimatorError::InsufficientData { .. })
        ));
    }
}
