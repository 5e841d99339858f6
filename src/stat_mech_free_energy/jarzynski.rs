/*
Jarzynski equality

    exp(-beta dG) = < exp(-beta W_f) >_f
    exp(+beta dG) = < exp(+beta W_r) >_r   (W_r on the dG axis)

Each direction gives its own estimate; the exponential averages are taken in
log space so large work values (hundreds of kT) neither overflow nor
underflow. Both estimates are biased by dissipation: the forward one sits at
or below the mean forward work, the reverse one at or above the mean reverse
work.

The second-cumulant expansion dG ~ <W> -/+ beta var(W) / 2 is reported
alongside, since it is exact for Gaussian work and a quick check on how much
the exponential average is dominated by rare low-work realizations.
*/

use crate::config::EstimatorConfig;
use crate::error::{EstimatorError, Result};
use crate::stat_mech::descriptive::{log_sum_exp, mean, variance_sample};
use crate::stat_mech::resampling::{block_estimates, spread, Resampler, RngStream};
use crate::stat_mech_free_energy::results::{ErrorEstimates, ErrorKind, JarzynskiResult};

/// -kT ln < exp(-beta W) >
pub fn jarzynski_forward(forward: &[f64], beta: f64) -> Result<f64> {
    if forward.is_empty() {
        return Err(EstimatorError::insufficient("forward Jarzynski", 1, 0));
    }
    let n = forward.len() as f64;
    Ok(-(log_sum_exp(forward.iter().map(|w| -beta * w)) - n.ln()) / beta)
}

/// kT ln < exp(beta W) > over reverse work already on the dG axis.
pub fn jarzynski_reverse(reverse: &[f64], beta: f64) -> Result<f64> {
    if reverse.is_empty() {
        return Err(EstimatorError::insufficient("reverse Jarzynski", 1, 0));
    }
    let n = reverse.len() as f64;
    Ok((log_sum_exp(reverse.iter().map(|w| beta * w)) - n.ln()) / beta)
}

fn cumulant_forward(forward: &[f64], beta: f64) -> Option<f64> {
    variance_sample(forward).map(|var| mean(forward) - 0.5 * beta * var)
}

fn cumulant_reverse(reverse: &[f64], beta: f64) -> Option<f64> {
    variance_sample(reverse).map(|var| mean(reverse) + 0.5 * beta * var)
}

fn jarzynski_pair(forward: &[f64], reverse: &[f64], beta: f64) -> Result<(f64, f64)> {
    Ok((
        jarzynski_forward(forward, beta)?,
        jarzynski_reverse(reverse, beta)?,
    ))
}

pub fn jarzynski(forward: &[f64], reverse: &[f64], config: &EstimatorConfig) -> Result<JarzynskiResult> {
    let beta = config.beta();
    let (dg_forward, dg_reverse) = jarzynski_pair(forward, reverse, beta)?;

    let mut forward_errors = ErrorEstimates::new();
    let mut reverse_errors = ErrorEstimates::new();

    let point = |f: &[f64], r: &[f64]| jarzynski_pair(f, r, beta);
    if config.nboots > 0 {
        let boots = Resampler::new(config.seed, RngStream::JarzynskiBootstrap).bootstrap(
            forward,
            reverse,
            config.nboots,
            point,
        );
        forward_errors.insert(ErrorKind::Bootstrap, spread(boots.iter().map(|p| p.0)));
        reverse_errors.insert(ErrorKind::Bootstrap, spread(boots.iter().map(|p| p.1)));
    }
    if config.nblocks > 1 {
        let blocks = block_estimates(forward, reverse, config.nblocks, point)?;
        forward_errors.insert(ErrorKind::Block, spread(blocks.iter().map(|p| p.0)));
        reverse_errors.insert(ErrorKind::Block, spread(blocks.iter().map(|p| p.1)));
    }

    let dg_mean = 0.5 * (dg_forward + dg_reverse);
    log::debug!("Jarzynski: forward {dg_forward:.4}, reverse {dg_reverse:.4}, mean {dg_mean:.4}");

    Ok(JarzynskiResult {
        dg_forward,
        dg_reverse,
        dg_mean,
        forward_errors,
        reverse_errors,
        dg_forward_cumulant: cumulant_forward(forward, beta),
        dg_reverse_cumulant: cumulant_reverse(reverse, beta),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EstimatorConfig {
        EstimatorConfig::new(298.15)
    }

    #[test]
    fn constant_work_is_exact() {
        let result = jarzynski(&[3.5; 4], &[3.5; 7], &config()).unwrap();
        assert!((result.dg_forward - 3.5).abs() < 1e-12);
        assert!((result.dg_reverse - 3.5).abs() < 1e-12);
        assert!((result.dg_mean - 3.5).abs() < 1e-12);
        assert_eq!(result.dg_forward_cumulant, Some(3.5));
    }

    #[test]
    fn exponential_averages_are_bounded_by_the_mean_work() {
        let wf = [1.0, 2.0, 3.0, 4.0, 5.0];
        let wr = [1.2, 2.1, 3.3, 3.9, 5.1];
        let result = jarzynski(&wf, &wr, &config()).unwrap();
        assert!(result.dg_forward <= mean(&wf));
        assert!(result.dg_forward >= 1.0);
        assert!(result.dg_reverse >= mean(&wr));
        assert!(result.dg_reverse <= 5.1);
        assert!(result.dg_mean >= result.dg_forward && result.dg_mean <= result.dg_reverse);
    }

    #[test]
    fn matches_the_direct_average_for_small_work() {
        let beta = config().beta();
        let wf = [0.1, 0.4, 0.2];
        let direct = -(wf.iter().map(|w| (-beta * w).exp()).sum::<f64>() / 3.0).ln() / beta;
        assert!((jarzynski_forward(&wf, beta).unwrap() - direct).abs() < 1e-12);
    }

    #[test]
    fn huge_work_values_stay_finite() {
        let beta = config().beta();
        let wf = [1.0e5, 1.0e5 + 1.0, 1.0e5 + 2.0];
        let dg = jarzynski_forward(&wf, beta).unwrap();
        assert!(dg.is_finite());
        assert!(dg > 1.0e5 && dg < 1.0e5 + 1.0);

        let wr = [-1.0e5, -1.0e5 - 1.0];
        let dg = jarzynski_reverse(&wr, beta).unwrap();
        assert!(dg.is_finite());
        assert!(dg < -1.0e5 && dg > -1.0e5 - 1.0);
    }

    #[test]
    fn cumulant_needs_two_samples() {
        let result = jarzynski(&[2.0], &[1.0, 3.0], &config()).unwrap();
        assert_eq!(result.dg_forward_cumulant, None);
        let expected = 2.0 + 0.5 * config().beta() * 2.0;
        assert!((result.dg_reverse_cumulant.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn errors_are_kept_per_direction() {
        let wf: Vec<f64> = (0..24).map(|i| 6.0 + (i as f64 * 0.9).sin()).collect();
        let wr: Vec<f64> = (0..24).map(|i| 5.0 + (i as f64 * 0.6).cos()).collect();
        let config = config().with_nboots(30).with_nblocks(4).with_seed(17);
        let result = jarzynski(&wf, &wr, &config).unwrap();
        for errors in [&result.forward_errors, &result.reverse_errors] {
            assert!(errors.get(ErrorKind::Bootstrap).unwrap() > 0.0);
            assert!(errors.get(ErrorKind::Block).unwrap() > 0.0);
            assert!(!errors.contains(ErrorKind::Analytical));
        }
        assert_eq!(result, jarzynski(&wf, &wr, &config).unwrap());
    }

    #[test]
    fn empty_direction_is_rejected() {
        assert!(matches!(
            jarzynski(&[], &[1.0], &config()),
            Err(EstimatorError::InsufficientData { .. })
        ));
    }
}
