//! The population-model contract
//!
//! A [`PopulationModel`] answers pointwise demographic rate queries and, if
//! the rates depend on the population itself, recomputes an internal
//! environment from a [`SpeciesView`] snapshot before each derivative
//! evaluation.

use crate::model::SpeciesView;

// =================================================================================================
// PopulationModel
// =================================================================================================

/// Trait for population models
///
/// # Responsibility
///
/// Provides the demographic rates of one species as functions of size `x`
/// and time `t`, the initial density profile, and — optionally — extra
/// per-cohort state variables and an environment feedback. The model never
/// integrates anything; the solver owns the numerics.
///
/// # Environment feedback
///
/// Rates may depend on the current distribution (competition for light,
/// food, space). Such models store the environment internally:
/// [`compute_env`](Self::compute_env) is called by the solver with a
/// snapshot of the distribution before *every* rate evaluation, and the
/// subsequent `growth_rate` / `mortality_rate` / `birth_rate` calls read
/// the stored value. `compute_env` must be idempotent in `(t, view)`: the
/// solver calls it several times per step at trial states.
///
/// # Extra per-cohort state
///
/// A model may declare `extra_count() > 0` additional state variables that
/// travel with each cohort (reserves, damage, cumulative reproduction).
/// The solver initializes them through
/// [`init_state_extra`](Self::init_state_extra) and integrates them with
/// the rates from [`extra_rates`](Self::extra_rates).
///
/// # Example Implementation
///
/// ```rust
/// use pspm_rs::model::{PopulationModel, SpeciesView};
///
/// /// Crowding-limited growth: the environment is total population size.
/// struct Crowded {
///     crowding: f64,
/// }
///
/// impl PopulationModel for Crowded {
///     fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
///         1.0 / (1.0 + self.crowding)
///     }
///
///     fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
///         0.1
///     }
///
///     fn birth_rate(&self, x: f64, _t: f64) -> f64 {
///         0.5 * x
///     }
///
///     fn init_density(&self, x: f64) -> f64 {
///         (-x).exp()
///     }
///
///     fn compute_env(&mut self, _t: f64, view: &SpeciesView) {
///         self.crowding = view.integrate(|_x| 1.0, 1.0);
///     }
///
///     fn name(&self) -> &str {
///         "Crowded"
///     }
/// }
/// ```
pub trait PopulationModel {
    /// Growth rate g(x, t) — speed of individuals along the size axis
    fn growth_rate(&self, x: f64, t: f64) -> f64;

    /// Mortality rate m(x, t) — per-capita death rate
    fn mortality_rate(&self, x: f64, t: f64) -> f64;

    /// Birth rate b(x, t) — per-capita fecundity of an individual of size x
    fn birth_rate(&self, x: f64, t: f64) -> f64;

    /// Initial density u₀(x), must be positive on `[xb, xm]`
    fn init_density(&self, x: f64) -> f64;

    /// Number of extra per-cohort state variables (default: none)
    fn extra_count(&self) -> usize {
        0
    }

    /// Initial values of the extra state for a cohort born at size `x`,
    /// time `t`
    ///
    /// `out.len()` equals [`extra_count`](Self::extra_count). The default
    /// implementation leaves the extras zeroed.
    #[allow(unused_variables)]
    fn init_state_extra(&self, x: f64, t: f64, out: &mut [f64]) {}

    /// Rates of change of the extra state for a cohort at size `x`
    ///
    /// `extras` holds the current values, `out` receives d(extras)/dt.
    /// The default implementation leaves the rates zeroed (constant extras).
    #[allow(unused_variables)]
    fn extra_rates(&self, x: f64, t: f64, extras: &[f64], out: &mut [f64]) {}

    /// Recompute the model-internal environment from the current
    /// distribution
    ///
    /// Called before every rate evaluation. Must be idempotent in
    /// `(t, view)`. The default implementation does nothing
    /// (environment-free model).
    #[allow(unused_variables)]
    fn compute_env(&mut self, t: f64, view: &SpeciesView) {}

    /// Name of the model (used for display and diagnostics)
    fn name(&self) -> &str;

    /// Description of the model (optional)
    fn description(&self) -> Option<&str> {
        None
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DistributionKind;

    /// Minimal model using every default
    struct Bare;

    impl PopulationModel for Bare {
        fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
            1.0
        }
        fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
            0.0
        }
        fn birth_rate(&self, _x: f64, _t: f64) -> f64 {
            0.0
        }
        fn init_density(&self, _x: f64) -> f64 {
            1.0
        }
        fn name(&self) -> &str {
            "Bare"
        }
    }

    #[test]
    fn test_defaults() {
        let mut model = Bare;
        assert_eq!(model.extra_count(), 0);
        assert!(model.description().is_none());

        // Default compute_env is a no-op
        let view = SpeciesView::new(
            0.0,
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            Vec::new(),
            0,
            DistributionKind::Density,
        );
        model.compute_env(0.0, &view);
        assert_eq!(model.growth_rate(0.5, 0.0), 1.0);
    }

    #[test]
    fn test_env_model_reads_view() {
        struct Feedback {
            total: f64,
        }

        impl PopulationModel for Feedback {
            fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
                1.0 / (1.0 + self.total)
            }
            fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
                0.0
            }
            fn birth_rate(&self, _x: f64, _t: f64) -> f64 {
                0.0
            }
            fn init_density(&self, _x: f64) -> f64 {
                1.0
            }
            fn compute_env(&mut self, _t: f64, view: &SpeciesView) {
                self.total = view.integrate(|_| 1.0, 1.0);
            }
            fn name(&self) -> &str {
                "Feedback"
            }
        }

        let mut model = Feedback { total: 0.0 };
        let view = SpeciesView::new(
            0.0,
            vec![0.0, 2.0],
            vec![1.0, 1.0],
            Vec::new(),
            0,
            DistributionKind::Density,
        );
        model.compute_env(0.0, &view);
        assert!((model.total - 2.0).abs() < 1e-12);
        assert!((model.growth_rate(0.0, 0.0) - 1.0 / 3.0).abs() < 1e-12);
    }
}
