/*

=========================================================
 Fast-growth free energy estimators (Rust)
=========================================================

Given work values from many short nonequilibrium transitions A->B (forward)
and B->A (reverse), estimate the free energy difference dG between A and B.

Estimators
----------
- Crooks Gaussian Intersection (CGI): fit a Gaussian to each direction and
  take the point where the two densities cross.
- Bennett Acceptance Ratio (BAR): maximum-likelihood dG from both directions,
  found as the root of a monotone function with Brent's method.
- Jarzynski: exponential work average for each direction separately.

Errors
------
- analytical (BAR), parametric bootstrap (CGI, always on)
- nonparametric bootstrap (nboots > 0), block averages (nblocks > 1)

Conventions
-----------
- Reverse work is passed on the dG axis, i.e. already negated. Use
  `WorkPair::from_raw_reverse` for values as measured along B->A.
- Energies are in the unit of `EstimatorConfig::boltzmann_constant` * K
  (kJ/mol by default).
- All randomness derives from `EstimatorConfig::seed`; repeated runs are
  bit-identical, with or without the `parallel` feature.

=========================================================
*/

pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod stat_mech;
pub mod stat_mech_free_energy;
pub mod work;

pub use analysis::{analyze, analyze_selection, AnalysisReport, NormalityReport};
pub use config::EstimatorConfig;
pub use error::{EstimatorError, Result};
pub use stat_mech_free_energy::results::{
    BarResult, CgiResult, ErrorEstimates, ErrorKind, EstimatorKind, EstimatorResult, GaussianFit,
    JarzynskiResult,
};
pub use stat_mech_free_energy::{Bennett, Crooks, FreeEnergyEstimator, Jarzynski};
pub use work::{WorkDistribution, WorkPair, WorkSelection};
