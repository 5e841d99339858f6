/*
Estimation facade: runs the requested estimators (and the normality check)
over one forward/reverse work pair.

A failing estimator does not take the others down; its error is kept in the
report next to the successful results. Only a bad configuration or an unknown
estimator name fails the whole call.
*/

use crate::config::EstimatorConfig;
use crate::error::{EstimatorError, Result};
use crate::stat_mech::normality::{ks_norm_test, NormalityResult};
use crate::stat_mech_free_energy::estimator_for;
use crate::stat_mech_free_energy::results::{EstimatorKind, EstimatorResult};
use crate::work::{WorkPair, WorkSelection};

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityReport {
    pub forward: std::result::Result<NormalityResult, EstimatorError>,
    pub reverse: std::result::Result<NormalityResult, EstimatorError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub estimates: BTreeMap<EstimatorKind, std::result::Result<EstimatorResult, EstimatorError>>,
    pub normality: Option<NormalityReport>,
}

impl AnalysisReport {
    pub fn get(&self, kind: EstimatorKind) -> Option<&std::result::Result<EstimatorResult, EstimatorError>> {
        self.estimates.get(&kind)
    }

    /// Successful estimates only, in canonical order.
    pub fn successes(&self) -> impl Iterator<Item = (EstimatorKind, &EstimatorResult)> + '_ {
        self.estimates
            .iter()
            .filter_map(|(kind, outcome)| outcome.as_ref().ok().map(|r| (*kind, r)))
    }
}

pub fn analyze(pair: &WorkPair, config: &EstimatorConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let kinds = config.selected_estimators()?;
    log::info!(
        "analyzing {} forward / {} reverse work values at T = {} K (kT = {:.5})",
        pair.forward().len(),
        pair.reverse().len(),
        config.temperature,
        config.kt()
    );

    let mut estimates = BTreeMap::new();
    for kind in kinds {
        let outcome = estimator_for(kind).estimate(pair, config);
        match &outcome {
            Ok(result) => log::info!("{kind}: dG = {:.4}", result.dg()),
            Err(err) => log::warn!("{kind} failed: {err}"),
        }
        estimates.insert(kind, outcome);
    }

    let normality = config.normality_test.then(|| {
        let report = NormalityReport {
            forward: ks_norm_test(pair.forward().values(), config.ks_alpha),
            reverse: ks_norm_test(pair.reverse().values(), config.ks_alpha),
        };
        for (direction, outcome) in [("forward", &report.forward), ("reverse", &report.reverse)] {
            match outcome {
                Ok(test) if !test.ok => log::warn!(
                    "{direction} work does not look Gaussian (lambda = {:.3} >= {:.3})",
                    test.statistic,
                    test.critical
                ),
                Ok(test) => log::info!("{direction} work normality q = {:.3}", test.quality),
                Err(err) => log::warn!("{direction} normality test skipped: {err}"),
            }
        }
        report
    });

    Ok(AnalysisReport {
        estimates,
        normality,
    })
}

/// Applies `selection` to both directions, then analyzes.
pub fn analyze_selection(
    pair: &WorkPair,
    selection: &WorkSelection,
    config: &EstimatorConfig,
) -> Result<AnalysisReport> {
    let selected = pair.select(selection)?;
    log::info!(
        "selection {selection:?} keeps {}/{} forward and {}/{} reverse values",
        selected.forward().len(),
        pair.forward().len(),
        selected.reverse().len(),
        pair.reverse().len()
    );
    analyze(&selected, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> WorkPair {
        WorkPair::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![1.2, 2.1, 3.3, 3.9, 5.1]).unwrap()
    }

    #[test]
    fn runs_every_estimator_by_default() {
        let report = analyze(&scenario(), &EstimatorConfig::new(298.15)).unwrap();
        let kinds: Vec<_> = report.estimates.keys().copied().collect();
        assert_eq!(
            kinds,
            vec![EstimatorKind::Cgi, EstimatorKind::Bar, EstimatorKind::Jarzynski]
        );
        assert_eq!(report.successes().count(), 3);
        assert!(report.normality.is_some());
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        // a single forward value is too few for a Gaussian fit but fine for BAR
        let pair = WorkPair::from_values(vec![2.0], vec![1.0, 2.0, 3.0]).unwrap();
        let report = analyze(&pair, &EstimatorConfig::new(298.15)).unwrap();
        assert!(matches!(
            report.get(EstimatorKind::Cgi),
            Some(Err(EstimatorError::InsufficientData { .. }))
        ));
        assert!(report.get(EstimatorKind::Bar).unwrap().is_ok());
        assert!(report.get(EstimatorKind::Jarzynski).unwrap().is_ok());
        assert!(report.normality.as_ref().unwrap().forward.is_err());
    }

    #[test]
    fn bad_names_and_configs_fail_the_call() {
        let config = EstimatorConfig::new(298.15).with_estimators(["bar", "tpi"]);
        assert_eq!(
            analyze(&scenario(), &config).unwrap_err(),
            EstimatorError::InvalidSelection("tpi".to_string())
        );
        assert!(matches!(
            analyze(&scenario(), &EstimatorConfig::new(0.0)),
            Err(EstimatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn selection_is_applied_before_estimation() {
        let config = EstimatorConfig::new(298.15)
            .with_estimators(["jarz"])
            .with_normality_test(false, 0.05);
        let report =
            analyze_selection(&scenario(), &WorkSelection::Slice { start: 0, end: 1 }, &config).unwrap();
        let jarz = report.get(EstimatorKind::Jarzynski).unwrap().as_ref().unwrap();
        let jarz = jarz.as_jarzynski().unwrap();
        assert!((jarz.dg_forward - 1.0).abs() < 1e-12);
        assert!((jarz.dg_reverse - 1.2).abs() < 1e-12);
        assert!(report.normality.is_none());
    }
}
