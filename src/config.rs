/*
Run options for one free energy analysis.

Energies are in whatever unit the work values carry; `boltzmann_constant`
must be given in that same unit per Kelvin. The default is kJ/(mol K), the
unit GROMACS writes dH/dl in.
*/

use crate::constants::{BOLTZMANN_KJ_MOL_K, DEFAULT_PARAMETRIC_BOOTS, DEFAULT_TEMPERATURE};
use crate::error::{EstimatorError, Result};
use crate::stat_mech_free_energy::results::EstimatorKind;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub temperature: f64,
    pub boltzmann_constant: f64,
    /// Nonparametric bootstrap resamples; 0 leaves the `bootstrap` error out.
    pub nboots: usize,
    /// Contiguous blocks (independent repeats); 1 leaves the `block` error out.
    pub nblocks: usize,
    /// Draws for the always-on CGI parametric bootstrap.
    pub parametric_boots: usize,
    pub seed: u64,
    pub estimators: Vec<String>,
    pub bar_tolerance: f64,
    pub bar_max_iterations: u64,
    pub ks_alpha: f64,
    pub normality_test: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            boltzmann_constant: BOLTZMANN_KJ_MOL_K,
            nboots: 0,
            nblocks: 1,
            parametric_boots: DEFAULT_PARAMETRIC_BOOTS,
            seed: 0,
            estimators: vec!["cgi".to_string(), "bar".to_string(), "jarz".to_string()],
            bar_tolerance: 1e-7,
            bar_max_iterations: 200,
            ks_alpha: 0.05,
            normality_test: true,
        }
    }
}

impl EstimatorConfig {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }

    pub fn with_boltzmann_constant(mut self, boltzmann_constant: f64) -> Self {
        self.boltzmann_constant = boltzmann_constant;
        self
    }

    pub fn with_nboots(mut self, nboots: usize) -> Self {
        self.nboots = nboots;
        self
    }

    pub fn with_nblocks(mut self, nblocks: usize) -> Self {
        self.nblocks = nblocks;
        self
    }

    pub fn with_parametric_boots(mut self, parametric_boots: usize) -> Self {
        self.parametric_boots = parametric_boots;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_estimators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.estimators = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bar_tolerance(mut self, tolerance: f64, max_iterations: u64) -> Self {
        self.bar_tolerance = tolerance;
        self.bar_max_iterations = max_iterations;
        self
    }

    pub fn with_normality_test(mut self, enabled: bool, alpha: f64) -> Self {
        self.normality_test = enabled;
        self.ks_alpha = alpha;
        self
    }

    /// Reads a JSON object; omitted fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| EstimatorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn kt(&self) -> f64 {
        self.boltzmann_constant * self.temperature
    }

    /// beta = 1 / (k_B T)
    pub fn beta(&self) -> f64 {
        1.0 / self.kt()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EstimatorError::InvalidConfig(msg));
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return invalid(format!("temperature must be positive, got {}", self.temperature));
        }
        if !(self.boltzmann_constant.is_finite() && self.boltzmann_constant > 0.0) {
            return invalid(format!(
                "boltzmann constant must be positive, got {}",
                self.boltzmann_constant
            ));
        }
        if self.nblocks == 0 {
            return invalid("nblocks must be at least 1".to_string());
        }
        if !(self.bar_tolerance > 0.0) {
            return invalid(format!("bar tolerance must be positive, got {}", self.bar_tolerance));
        }
        if self.bar_max_iterations == 0 {
            return invalid("bar_max_iterations must be at least 1".to_string());
        }
        if !(self.ks_alpha > 0.0 && self.ks_alpha < 1.0) {
            return invalid(format!("ks_alpha must lie in (0, 1), got {}", self.ks_alpha));
        }
        Ok(())
    }

    /// Requested estimators in canonical order (cgi, bar, jarz), duplicates
    /// removed.
    pub fn selected_estimators(&self) -> Result<Vec<EstimatorKind>> {
        let kinds = self
            .estimators
            .iter()
            .map(|name| name.parse::<EstimatorKind>())
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(kinds.into_iter().collect())
    }
}
