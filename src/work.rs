/*
Work values collected from fast-growth (nonequilibrium) transitions.

Every forward A->B and reverse B->A realization contributes one scalar work
value. The estimators take reverse values already placed on the dG axis
(negated B->A works), so a Gaussian fitted to the forward work and one fitted
to the reverse work cross near dG.
*/

use crate::error::{EstimatorError, Result};
use crate::stat_mech::resampling::{substream, RngStream};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkDistribution {
    values: Vec<f64>,
}

impl WorkDistribution {
    /// Non-empty, finite work values in the order they were collected.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(EstimatorError::insufficient("work distribution", 1, 0));
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(EstimatorError::InvalidWork { index, value });
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn negated(&self) -> Self {
        Self {
            values: self.values.iter().map(|w| -w).collect(),
        }
    }

    pub fn select(&self, selection: &WorkSelection) -> Result<Self> {
        self.select_lane(selection, 0)
    }

    fn select_lane(&self, selection: &WorkSelection, lane: usize) -> Result<Self> {
        let indices = selection.indices(self.len(), lane)?;
        Self::new(indices.into_iter().map(|i| self.values[i]).collect())
    }
}

impl AsRef<[f64]> for WorkDistribution {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl TryFrom<Vec<f64>> for WorkDistribution {
    type Error = EstimatorError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

/// Forward work and sign-adjusted reverse work for one transformation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkPair {
    forward: WorkDistribution,
    reverse: WorkDistribution,
}

impl WorkPair {
    pub fn new(forward: WorkDistribution, reverse: WorkDistribution) -> Self {
        Self { forward, reverse }
    }

    /// Both sequences already on the dG axis.
    pub fn from_values(forward: Vec<f64>, reverse: Vec<f64>) -> Result<Self> {
        Ok(Self::new(
            WorkDistribution::new(forward)?,
            WorkDistribution::new(reverse)?,
        ))
    }

    /// Reverse values as measured along B->A; they are negated here.
    pub fn from_raw_reverse(forward: Vec<f64>, raw_reverse: Vec<f64>) -> Result<Self> {
        Ok(Self::new(
            WorkDistribution::new(forward)?,
            WorkDistribution::new(raw_reverse)?.negated(),
        ))
    }

    pub fn forward(&self) -> &WorkDistribution {
        &self.forward
    }

    pub fn reverse(&self) -> &WorkDistribution {
        &self.reverse
    }

    /// Applies the same trajectory selection to both directions. Random
    /// subsets are drawn independently per direction.
    pub fn select(&self, selection: &WorkSelection) -> Result<Self> {
        Ok(Self::new(
            self.forward.select_lane(selection, 0)?,
            self.reverse.select_lane(selection, 1)?,
        ))
    }
}

/// Which trajectories enter the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkSelection {
    #[default]
    All,
    /// Every n-th value counted back from the last one, so the last value is
    /// always kept.
    Skip(usize),
    /// Half-open range `start..end`, clamped to the available values.
    Slice { start: usize, end: usize },
    /// Explicit zero-based positions; positions past the end are ignored.
    Index(Vec<usize>),
    /// `count` values drawn without replacement, kept in collection order.
    Random { count: usize, seed: u64 },
}

impl WorkSelection {
    fn indices(&self, len: usize, lane: usize) -> Result<Vec<usize>> {
        let picked: Vec<usize> = match self {
            WorkSelection::All => (0..len).collect(),
            WorkSelection::Skip(0) => {
                return Err(EstimatorError::InvalidConfig(
                    "skip stride must be at least 1".to_string(),
                ))
            }
            WorkSelection::Skip(stride) => {
                let mut picked: Vec<usize> = (0..len).rev().step_by(*stride).collect();
                picked.reverse();
                picked
            }
            WorkSelection::Slice { start, end } => {
                let end = (*end).min(len);
                let start = (*start).min(end);
                (start..end).collect()
            }
            WorkSelection::Index(positions) => {
                let dropped = positions.iter().filter(|&&i| i >= len).count();
                if dropped > 0 {
                    log::warn!("{dropped} selected indices lie past the {len} available work values");
                }
                positions.iter().copied().filter(|&i| i < len).collect()
            }
            WorkSelection::Random { count, seed } => {
                if *count > len {
                    return Err(EstimatorError::insufficient("random work selection", *count, len));
                }
                let mut rng = substream(*seed, RngStream::Selection, lane);
                let mut picked = rand::seq::index::sample(&mut rng, len, *count).into_vec();
                picked.sort_unstable();
                picked
            }
        };
        if picked.is_empty() {
            return Err(EstimatorError::insufficient("work selection", 1, 0));
        }
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> WorkDistribution {
        WorkDistribution::new((0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn rejects_empty_and_non_finite_work() {
        assert!(matches!(
            WorkDistribution::new(vec![]),
            Err(EstimatorError::InsufficientData { .. })
        ));
        assert_eq!(
            WorkDistribution::new(vec![1.0, f64::NAN]).unwrap_err().to_string(),
            "work value #1 is not finite (NaN)"
        );
    }

    #[test]
    fn raw_reverse_is_negated() {
        let pair = WorkPair::from_raw_reverse(vec![1.0, 2.0], vec![-1.5, -2.5]).unwrap();
        assert_eq!(pair.reverse().values(), &[1.5, 2.5]);
        assert_eq!(pair.forward().values(), &[1.0, 2.0]);
    }

    #[test]
    fn skip_keeps_the_last_value() {
        let w = ramp(10).select(&WorkSelection::Skip(3)).unwrap();
        assert_eq!(w.values(), &[0.0, 3.0, 6.0, 9.0]);

        let w = ramp(5).select(&WorkSelection::Skip(2)).unwrap();
        assert_eq!(w.values(), &[0.0, 2.0, 4.0]);

        assert!(ramp(5).select(&WorkSelection::Skip(0)).is_err());
    }

    #[test]
    fn slice_and_index_are_clamped() {
        let w = ramp(10).select(&WorkSelection::Slice { start: 7, end: 20 }).unwrap();
        assert_eq!(w.values(), &[7.0, 8.0, 9.0]);

        let w = ramp(4).select(&WorkSelection::Index(vec![3, 0, 9])).unwrap();
        assert_eq!(w.values(), &[3.0, 0.0]);

        assert!(ramp(4).select(&WorkSelection::Slice { start: 5, end: 8 }).is_err());
    }

    #[test]
    fn random_subset_is_reproducible_and_ordered() {
        let selection = WorkSelection::Random { count: 4, seed: 3 };
        let a = ramp(20).select(&selection).unwrap();
        let b = ramp(20).select(&selection).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert!(a.values().windows(2).all(|p| p[0] < p[1]));

        assert!(ramp(3)
            .select(&WorkSelection::Random { count: 5, seed: 0 })
            .is_err());
    }
}
