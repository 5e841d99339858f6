pub const BOLTZMANN_KJ_MOL_K: f64 = 0.0083144626; // k_B in kJ/(mol K), the GROMACS dgdl unit
pub const BOLTZMANN_KCAL_MOL_K: f64 = 0.0019872041; // k_B in kcal/(mol K)

pub const DEFAULT_TEMPERATURE: f64 = 298.15; // Kelvin
pub const DEFAULT_PARAMETRIC_BOOTS: usize = 1000; // draws for the CGI parametric bootstrap
