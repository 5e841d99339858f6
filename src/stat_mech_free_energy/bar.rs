/*
Bennett Acceptance Ratio (BAR)

dG is the root of

    g(x) = sum_i f(beta (M + Wf_i - x)) - sum_j f(beta (x - M - Wr_j))

with the Fermi function f(z) = 1 / (1 + e^z), the reverse work already
negated onto the dG axis, and M = kT ln(n_f / n_r) correcting for unequal
numbers of forward and reverse transitions. g increases monotonically in x, so
the root is bracketed and refined with Brent's method.

The slope of g at the root, g'(dG) = beta * sum f (1 - f), gives both the
asymptotic variance of the estimate and the overlap score `conv`.
*/

use crate::config::EstimatorConfig;
use crate::error::{EstimatorError, Result};
use crate::stat_mech::resampling::{block_estimates, spread, Resampler, RngStream};
use crate::stat_mech_free_energy::results::{BarResult, ErrorEstimates, ErrorKind};

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::brent::BrentRoot;
use itertools::{Itertools, MinMaxResult};

// half-width added around the work values so that f has saturated at both
// ends of the initial bracket (e^-50)
const BRACKET_PAD_KT: f64 = 50.0;
const BRACKET_EXPANSIONS: usize = 64;

fn fermi(z: f64) -> f64 {
    1.0 / (1.0 + z.exp())
}

/// kT ln(n_f / n_r)
pub fn sample_ratio_shift(nf: usize, nr: usize, beta: f64) -> f64 {
    (nf as f64 / nr as f64).ln() / beta
}

#[derive(Debug, Clone, Copy)]
pub struct BennettResidual<'a> {
    forward: &'a [f64],
    reverse: &'a [f64],
    beta: f64,
    shift: f64,
}

impl<'a> BennettResidual<'a> {
    pub fn new(forward: &'a [f64], reverse: &'a [f64], beta: f64) -> Self {
        Self {
            forward,
            reverse,
            beta,
            shift: sample_ratio_shift(forward.len(), reverse.len(), beta),
        }
    }

    /// g(x)
    pub fn value(&self, x: f64) -> f64 {
        let sf: f64 = self
            .forward
            .iter()
            .map(|w| fermi(self.beta * (self.shift + w - x)))
            .sum();
        let sr: f64 = self
            .reverse
            .iter()
            .map(|w| fermi(self.beta * (x - self.shift - w)))
            .sum();
        sf - sr
    }

    fn bracket(&self) -> Result<(f64, f64)> {
        let (min, max) = match self.forward.iter().chain(self.reverse).minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => {
                return Err(EstimatorError::insufficient("BAR bracket", 1, 0));
            }
            MinMaxResult::OneElement(w) => (*w, *w),
            MinMaxResult::MinMax(lo, hi) => (*lo, *hi),
        };
        let pad = BRACKET_PAD_KT / self.beta + self.shift.abs();
        let (mut lo, mut hi) = (min - pad, max + pad);
        for _ in 0..BRACKET_EXPANSIONS {
            if self.value(lo) < 0.0 && self.value(hi) > 0.0 {
                return Ok((lo, hi));
            }
            let width = hi - lo;
            lo -= width;
            hi += width;
        }
        Err(EstimatorError::NonConvergence {
            iterations: 0,
            residual: self.value(0.5 * (lo + hi)).abs(),
            estimate: 0.5 * (lo + hi),
        })
    }
}

impl CostFunction for BennettResidual<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok(self.value(*x))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRoot {
    pub dg: f64,
    pub residual: f64,
    pub iterations: u64,
}

/// Root of g with |g(dG)| < `tolerance`, or `NonConvergence` once
/// `max_iterations` Brent steps are spent.
pub fn solve_bar(
    forward: &[f64],
    reverse: &[f64],
    beta: f64,
    tolerance: f64,
    max_iterations: u64,
) -> Result<BarRoot> {
    if forward.is_empty() || reverse.is_empty() {
        return Err(EstimatorError::insufficient(
            "BAR",
            1,
            forward.len().min(reverse.len()),
        ));
    }
    let g = BennettResidual::new(forward, reverse, beta);
    let (lo, hi) = g.bracket()?;
    let x_tolerance = f64::EPSILON * lo.abs().max(hi.abs());

    let result = Executor::new(g, BrentRoot::new(lo, hi, x_tolerance))
        .configure(|state| state.max_iters(max_iterations))
        .run()
        .map_err(|e| EstimatorError::Solver(e.to_string()))?;

    let state = result.state();
    let iterations = state.get_iter();
    let dg = state
        .get_param()
        .copied()
        .ok_or_else(|| EstimatorError::Solver("Brent search returned no estimate".to_string()))?;
    let residual = g.value(dg).abs();
    log::debug!(
        "BAR root {dg:.6} after {iterations} iterations, |g| = {residual:e}, bracket [{lo:.3}, {hi:.3}]"
    );

    if residual < tolerance {
        Ok(BarRoot {
            dg,
            residual,
            iterations,
        })
    } else {
        Err(EstimatorError::NonConvergence {
            iterations,
            residual,
            estimate: dg,
        })
    }
}

/// Fermi-weighted overlap of both work sets at a given dG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    // mean of f(1 - f) = 1 / (2 + 2 cosh(beta (M + w - dG))) over all samples
    mean_weight: f64,
    nf: f64,
    nr: f64,
    beta: f64,
}

impl Overlap {
    pub fn at(forward: &[f64], reverse: &[f64], beta: f64, dg: f64) -> Self {
        let shift = sample_ratio_shift(forward.len(), reverse.len(), beta);
        let weight = |w: &f64| 1.0 / (2.0 + 2.0 * (beta * (shift + w - dg)).cosh());
        let total: f64 = forward.iter().chain(reverse).map(weight).sum();
        let n = (forward.len() + reverse.len()) as f64;
        Self {
            mean_weight: total / n,
            nf: forward.len() as f64,
            nr: reverse.len() as f64,
            beta,
        }
    }

    /// sigma^2 = (1 / (beta^2 N)) (1 / <f(1-f)> - N/n_f - N/n_r)
    pub fn analytical_error(&self) -> f64 {
        let n = self.nf + self.nr;
        if self.mean_weight <= 0.0 {
            log::warn!("BAR: forward and reverse work do not overlap, analytical error is unbounded");
            return f64::INFINITY;
        }
        let variance =
            (1.0 / self.mean_weight - n / self.nf - n / self.nr) / (self.beta * self.beta * n);
        if variance < 0.0 {
            log::warn!("BAR: negative analytical variance {variance:e} clamped to zero");
            return 0.0;
        }
        variance.sqrt()
    }

    /// <f(1-f)> N^2 / (n_f n_r), in [0, 1]; 1 for fully overlapping work.
    pub fn conv(&self) -> f64 {
        let n = self.nf + self.nr;
        (self.mean_weight * n * n / (self.nf * self.nr)).clamp(0.0, 1.0)
    }
}

/// dG and conv for one (re)sample.
fn bar_point(forward: &[f64], reverse: &[f64], config: &EstimatorConfig) -> Result<(f64, f64)> {
    let beta = config.beta();
    let root = solve_bar(
        forward,
        reverse,
        beta,
        config.bar_tolerance,
        config.bar_max_iterations,
    )?;
    Ok((root.dg, Overlap::at(forward, reverse, beta, root.dg).conv()))
}

pub fn bar(forward: &[f64], reverse: &[f64], config: &EstimatorConfig) -> Result<BarResult> {
    let beta = config.beta();
    let root = solve_bar(
        forward,
        reverse,
        beta,
        config.bar_tolerance,
        config.bar_max_iterations,
    )?;
    let overlap = Overlap::at(forward, reverse, beta, root.dg);

    let mut errors = ErrorEstimates::new();
    let mut conv_errors = ErrorEstimates::new();
    errors.insert(ErrorKind::Analytical, Some(overlap.analytical_error()));

    let point = |f: &[f64], r: &[f64]| bar_point(f, r, config);
    if config.nboots > 0 {
        let boots = Resampler::new(config.seed, RngStream::BarBootstrap).bootstrap(
            forward,
            reverse,
            config.nboots,
            point,
        );
        errors.insert(ErrorKind::Bootstrap, spread(boots.iter().map(|p| p.0)));
        conv_errors.insert(ErrorKind::Bootstrap, spread(boots.iter().map(|p| p.1)));
    }
    if config.nblocks > 1 {
        let blocks = block_estimates(forward, reverse, config.nblocks, point)?;
        errors.insert(ErrorKind::Block, spread(blocks.iter().map(|p| p.0)));
        conv_errors.insert(ErrorKind::Block, spread(blocks.iter().map(|p| p.1)));
    }

    Ok(BarResult {
        dg: root.dg,
        errors,
        conv: overlap.conv(),
        conv_errors,
        residual: root.residual,
        iterations: root.iterations,
        sample_ratio_shift: sample_ratio_shift(forward.len(), reverse.len(), beta),
    })
}
