// -- sample moments used by the estimators and the error machinery

use itertools::Itertools;
use itertools::MinMaxResult;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population (maximum-likelihood) standard deviation, normalised by n.
/// This is the width used when fitting a Gaussian to a work distribution.
pub fn stdev_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Unbiased sample variance, normalised by n - 1. `None` below two values.
pub fn variance_sample(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some(ss / (values.len() - 1) as f64)
}

pub fn stdev_sample(values: &[f64]) -> Option<f64> {
    variance_sample(values).map(f64::sqrt)
}

/// ln(sum_i exp(x_i)), shifted by the largest exponent so that large work
/// values do not overflow.
pub fn log_sum_exp<I>(exponents: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let exponents: Vec<f64> = exponents.into_iter().collect();
    let shift = match exponents.iter().copied().minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => return f64::NEG_INFINITY,
        MinMaxResult::OneElement(x) => x,
        MinMaxResult::MinMax(_, x) => x,
    };
    if !shift.is_finite() {
        return shift;
    }
    let sum = exponents.iter().map(|x| (x - shift).exp()).sum::<f64>();
    shift + sum.ln()
}
