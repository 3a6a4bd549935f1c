//! Mock population models for testing
//!
//! These models have known analytical behavior, making them ideal for
//! validating the discretization kernels and the solver surface.

use pspm_rs::model::{PopulationModel, SpeciesView};

// =================================================================================================
// UniformRates: spatially constant g, m, b
// =================================================================================================

/// Constant demographic rates with an exponential initial profile
///
/// With b = 0 the dynamics reduce to pure advection (g) and exponential
/// decay (m): every cohort's density or count decays by `exp(-m·t)` while
/// moving at speed g.
pub struct UniformRates {
    pub g: f64,
    pub m: f64,
    pub b: f64,
}

impl UniformRates {
    pub fn new(g: f64, m: f64, b: f64) -> Self {
        Self { g, m, b }
    }
}

impl PopulationModel for UniformRates {
    fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
        self.g
    }

    fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
        self.m
    }

    fn birth_rate(&self, _x: f64, _t: f64) -> f64 {
        self.b
    }

    fn init_density(&self, x: f64) -> f64 {
        (-x).exp()
    }

    fn name(&self) -> &str {
        "Uniform Rates"
    }
}

// =================================================================================================
// LinearBirth: fecundity proportional to size
// =================================================================================================

/// Constant growth and mortality with size-proportional fecundity
///
/// b(x) = b_slope · x. Used to exercise the renewal boundary: the birth
/// flux B = ∫ b·u dx feeds the boundary density u(xb) = B / g(xb).
pub struct LinearBirth {
    pub g: f64,
    pub m: f64,
    pub b_slope: f64,
}

impl LinearBirth {
    pub fn new(g: f64, m: f64, b_slope: f64) -> Self {
        Self { g, m, b_slope }
    }
}

impl PopulationModel for LinearBirth {
    fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
        self.g
    }

    fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
        self.m
    }

    fn birth_rate(&self, x: f64, _t: f64) -> f64 {
        self.b_slope * x
    }

    fn init_density(&self, x: f64) -> f64 {
        (-x).exp()
    }

    fn name(&self) -> &str {
        "Linear Birth"
    }
}

// =================================================================================================
// SelfLimitedRenewal: logistic-like model with a known steady state
// =================================================================================================

/// Renewal model whose fecundity saturates with total population
///
/// g = 1, m = m0, b(x) = b0 / (1 + E) with the environment E = ∫ u dx.
///
/// At equilibrium the profile is u(x) = u0·exp(-m0·x) on [0, xm], so
/// E = u0·c with c = (1 - exp(-m0·xm)) / m0, and the renewal condition
/// u0 = B = b0·E/(1 + E) pins the boundary density at
///
/// ```text
/// u0* = b0 - 1/c
/// ```
///
/// (positive whenever b0·c > 1).
pub struct SelfLimitedRenewal {
    pub b0: f64,
    pub m0: f64,
    population: f64,
}

impl SelfLimitedRenewal {
    pub fn new(b0: f64, m0: f64) -> Self {
        Self {
            b0,
            m0,
            population: 0.0,
        }
    }

    /// The analytical steady boundary density on a domain `[0, xm]`
    pub fn steady_u0(&self, xm: f64) -> f64 {
        let c = (1.0 - (-self.m0 * xm).exp()) / self.m0;
        self.b0 - 1.0 / c
    }
}

impl PopulationModel for SelfLimitedRenewal {
    fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
        1.0
    }

    fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
        self.m0
    }

    fn birth_rate(&self, _x: f64, _t: f64) -> f64 {
        self.b0 / (1.0 + self.population)
    }

    fn init_density(&self, x: f64) -> f64 {
        (-x).exp()
    }

    fn compute_env(&mut self, _t: f64, view: &SpeciesView) {
        self.population = view.integrate(|_x| 1.0, 1.0);
    }

    fn name(&self) -> &str {
        "Self-Limited Renewal"
    }
}
