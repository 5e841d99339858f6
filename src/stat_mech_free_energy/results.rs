use crate::error::EstimatorError;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Declaration order is the order the estimators run and report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Cgi,
    Bar,
    #[serde(rename = "jarz")]
    Jarzynski,
}

impl EstimatorKind {
    pub fn name(self) -> &'static str {
        match self {
            EstimatorKind::Cgi => "cgi",
            EstimatorKind::Bar => "bar",
            EstimatorKind::Jarzynski => "jarz",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EstimatorKind {
    type Err = EstimatorError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cgi" => Ok(EstimatorKind::Cgi),
            "bar" => Ok(EstimatorKind::Bar),
            "jarz" | "jarzynski" => Ok(EstimatorKind::Jarzynski),
            _ => Err(EstimatorError::InvalidSelection(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Analytical,
    BootstrapParametric,
    Bootstrap,
    Block,
}

/// Standard errors by kind. Kinds that were not requested (or could not be
/// computed) are absent, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorEstimates(BTreeMap<ErrorKind, f64>);

impl ErrorEstimates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ErrorKind, value: Option<f64>) {
        if let Some(value) = value {
            self.0.insert(kind, value);
        }
    }

    pub fn get(&self, kind: ErrorKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ErrorKind, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Gaussian fitted to one work distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaussianFit {
    pub mean: f64,
    pub std: f64,
    /// Peak height 1 / (std sqrt(2 pi)); infinite for a zero-width fit.
    pub amplitude: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CgiResult {
    pub dg: f64,
    pub forward: GaussianFit,
    pub reverse: GaussianFit,
    /// False when the two Gaussians have no crossing between their means and
    /// `dg` fell back to the midpoint of the means.
    pub intersects: bool,
    pub errors: ErrorEstimates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarResult {
    pub dg: f64,
    pub errors: ErrorEstimates,
    /// Forward/reverse overlap score in [0, 1].
    pub conv: f64,
    pub conv_errors: ErrorEstimates,
    pub residual: f64,
    pub iterations: u64,
    /// k_B T ln(n_f / n_r)
    pub sample_ratio_shift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JarzynskiResult {
    pub dg_forward: f64,
    pub dg_reverse: f64,
    pub dg_mean: f64,
    pub forward_errors: ErrorEstimates,
    pub reverse_errors: ErrorEstimates,
    /// Second-cumulant (fluctuation-dissipation) estimates, when n >= 2.
    pub dg_forward_cumulant: Option<f64>,
    pub dg_reverse_cumulant: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "estimator", rename_all = "lowercase")]
pub enum EstimatorResult {
    Cgi(CgiResult),
    Bar(BarResult),
    #[serde(rename = "jarz")]
    Jarzynski(JarzynskiResult),
}

impl EstimatorResult {
    pub fn kind(&self) -> EstimatorKind {
        match self {
            EstimatorResult::Cgi(_) => EstimatorKind::Cgi,
            EstimatorResult::Bar(_) => EstimatorKind::Bar,
            EstimatorResult::Jarzynski(_) => EstimatorKind::Jarzynski,
        }
    }

    /// Headline dG; the direction-averaged value for Jarzynski.
    pub fn dg(&self) -> f64 {
        match self {
            EstimatorResult::Cgi(r) => r.dg,
            EstimatorResult::Bar(r) => r.dg,
            EstimatorResult::Jarzynski(r) => r.dg_mean,
        }
    }

    pub fn as_cgi(&self) -> Option<&CgiResult> {
        match self {
            EstimatorResult::Cgi(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_bar(&self) -> Option<&BarResult> {
        match self {
            EstimatorResult::Bar(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_jarzynski(&self) -> Option<&JarzynskiResult> {
        match self {
            EstimatorResult::Jarzynski(r) => Some(r),
            _ => None,
        }
    }
}
