/*
Error taxonomy shared by every estimator.

Errors are local: a failure inside one estimator (or inside one bootstrap
resample) never aborts the others. The analysis facade stores them next to
the successful results.
*/

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum EstimatorError {
    #[error("insufficient data for {what}: need at least {required}, got {available}")]
    InsufficientData {
        what: String,
        required: usize,
        available: usize,
    },

    #[error("degenerate (zero) variance in {what}")]
    DegenerateVariance { what: String },

    #[error(
        "root search did not converge after {iterations} iterations (|g| = {residual:e}, last estimate {estimate})"
    )]
    NonConvergence {
        iterations: u64,
        residual: f64,
        estimate: f64,
    },

    #[error("unknown estimator `{0}` (expected one of: cgi, bar, jarz)")]
    InvalidSelection(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("work value #{index} is not finite ({value})")]
    InvalidWork { index: usize, value: f64 },

    #[error("could not build sampling distribution: {0}")]
    Sampling(String),

    #[error("solver failure: {0}")]
    Solver(String),
}

impl EstimatorError {
    pub(crate) fn insufficient(what: impl Into<String>, required: usize, available: usize) -> Self {
        EstimatorError::InsufficientData {
            what: what.into(),
            required,
            available,
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_quantity() {
        let err = EstimatorError::insufficient("block partition", 4, 3);
        assert_eq!(
            err.to_string(),
            "insufficient data for block partition: need at least 4, got 3"
        );

        let err = EstimatorError::InvalidSelection("mbar".to_string());
        assert!(err.to_string().contains("`mbar`"));
    }
}
