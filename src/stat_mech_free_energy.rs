// Free energy estimators for fast-growth work distributions

pub mod bar;
pub mod crooks;
pub mod jarzynski;
pub mod results;

use crate::config::EstimatorConfig;
use crate::error::Result;
use crate::work::WorkPair;
use results::{EstimatorKind, EstimatorResult};

/// One way of turning forward/reverse work into a dG estimate with errors.
pub trait FreeEnergyEstimator {
    fn kind(&self) -> EstimatorKind;

    fn estimate(&self, pair: &WorkPair, config: &EstimatorConfig) -> Result<EstimatorResult>;
}

/// Crooks Gaussian Intersection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crooks;

/// Bennett Acceptance Ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bennett;

/// Forward and reverse Jarzynski averages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jarzynski;

impl FreeEnergyEstimator for Crooks {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Cgi
    }

    fn estimate(&self, pair: &WorkPair, config: &EstimatorConfig) -> Result<EstimatorResult> {
        crooks::cgi(pair.forward().values(), pair.reverse().values(), config).map(EstimatorResult::Cgi)
    }
}

impl FreeEnergyEstimator for Bennett {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Bar
    }

    fn estimate(&self, pair: &WorkPair, config: &EstimatorConfig) -> Result<EstimatorResult> {
        bar::bar(pair.forward().values(), pair.reverse().values(), config).map(EstimatorResult::Bar)
    }
}

impl FreeEnergyEstimator for Jarzynski {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Jarzynski
    }

    fn estimate(&self, pair: &WorkPair, config: &EstimatorConfig) -> Result<EstimatorResult> {
        jarzynski::jarzynski(pair.forward().values(), pair.reverse().values(), config)
            .map(EstimatorResult::Jarzynski)
    }
}

/// The estimator behind an [`EstimatorKind`].
pub fn estimator_for(kind: EstimatorKind) -> Box<dyn FreeEnergyEstimator> {
    match kind {
        EstimatorKind::Cgi => Box::new(Crooks),
        EstimatorKind::Bar => Box::new(Bennett),
        EstimatorKind::Jarzynski => Box::new(Jarzynski),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_maps_to_its_estimator() {
        let pair = WorkPair::from_values(vec![1.0, 2.0, 3.0], vec![1.5, 2.5, 3.5]).unwrap();
        let config = EstimatorConfig::new(300.0).with_parametric_boots(20);
        for kind in [EstimatorKind::Cgi, EstimatorKind::Bar, EstimatorKind::Jarzynski] {
            let estimator = estimator_for(kind);
            assert_eq!(estimator.kind(), kind);
            let result = estimator.estimate(&pair, &config).unwrap();
            assert_eq!(result.kind(), kind);
            assert!(result.dg().is_finite());
        }
    }
}
