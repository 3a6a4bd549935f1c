//! Size-structured plant stand with crowding feedback
//!
//! # Biological background
//!
//! A stand of plants structured by stem size $x$. Individuals grow along
//! the size axis, die at a background rate, and produce seedlings that
//! enter at the boundary size. Everyone competes for light: the more
//! standing biomass, the slower growth and reproduction — the classic
//! mechanism that takes a young stand from exponential expansion to a
//! crowded equilibrium.
//!
//! # Model equations
//!
//! ## Crowding index
//!
//! The environment is the total standing biomass
//!
//! $$E(t) = \int x \cdot u(x, t)\,dx$$
//!
//! recomputed from the current distribution before every rate evaluation.
//!
//! ## Shading factor
//!
//! $$s(E) = \frac{1}{1 + E / K}$$
//!
//! with $K$ the crowding scale: at $E = K$, rates are halved.
//!
//! ## Demographic rates
//!
//! $$g(x) = g_0 \left(1 - \frac{x}{x_{max}}\right) s(E), \qquad
//!   m(x) = m_0, \qquad
//!   b(x) = b_0 \cdot x \cdot s(E)$$
//!
//! Growth vanishes at the asymptotic size $x_{max}$, so no cohort ever
//! outruns the grid; fecundity is proportional to size (bigger plants
//! carry more seed).
//!
//! # Example
//!
//! ```rust,ignore
//! use pspm_rs::model::CohortGrid;
//! use pspm_rs::models::PlantCanopy;
//! use pspm_rs::solver::{PspmMethod, PspmSolver};
//!
//! let model = PlantCanopy::new(
//!     1.0,  // g0   [size/time]
//!     0.3,  // m0   [1/time]
//!     0.4,  // b0   [1/(size·time)]
//!     5.0,  // K    [size·density]
//!     10.0, // xmax [size]
//! );
//!
//! let mut solver = PspmSolver::new(PspmMethod::Fmu);
//! solver.add_species(
//!     CohortGrid::uniform(100, 0.0, 10.0)?,
//!     Box::new(model),
//!     Vec::new(),
//!     None,
//! )?;
//! solver.initialize();
//! let u0 = solver.step_to_equilibrium()?;
//! ```

use crate::model::{PopulationModel, SpeciesView};

// =================================================================================================
// PlantCanopy
// =================================================================================================

/// Size-structured plant model with biomass-crowding feedback
///
/// # Parameters
///
/// | Field  | Symbol    | Role                                     |
/// |--------|-----------|------------------------------------------|
/// | `g0`   | $g_0$     | Uncrowded growth rate at the boundary    |
/// | `m0`   | $m_0$     | Background mortality                     |
/// | `b0`   | $b_0$     | Fecundity per unit size, uncrowded       |
/// | `k`    | $K$       | Crowding scale (biomass halving rates)   |
/// | `xmax` | $x_{max}$ | Asymptotic size where growth vanishes    |
#[derive(Debug, Clone)]
pub struct PlantCanopy {
    /// Uncrowded growth rate $g_0$, must be $> 0$
    g0: f64,

    /// Background mortality $m_0$, must be $\geq 0$
    m0: f64,

    /// Uncrowded per-size fecundity $b_0$, must be $\geq 0$
    b0: f64,

    /// Crowding scale $K$, must be $> 0$
    k: f64,

    /// Asymptotic size $x_{max}$, must be $> 0$
    xmax: f64,

    /// Standing biomass $E$ from the latest environment computation
    crowding: f64,
}

impl PlantCanopy {
    /// Create a plant-canopy model
    ///
    /// # Panics
    ///
    /// Panics if `g0`, `k` or `xmax` is not positive, or if `m0` or `b0`
    /// is negative.
    pub fn new(g0: f64, m0: f64, b0: f64, k: f64, xmax: f64) -> Self {
        assert!(g0 > 0.0, "Growth rate must be positive, got {}", g0);
        assert!(m0 >= 0.0, "Mortality must be non-negative, got {}", m0);
        assert!(b0 >= 0.0, "Fecundity must be non-negative, got {}", b0);
        assert!(k > 0.0, "Crowding scale must be positive, got {}", k);
        assert!(xmax > 0.0, "Asymptotic size must be positive, got {}", xmax);

        Self {
            g0,
            m0,
            b0,
            k,
            xmax,
            crowding: 0.0,
        }
    }

    /// Standing biomass from the latest environment computation
    pub fn crowding(&self) -> f64 {
        self.crowding
    }

    /// Shading factor $s(E) = 1 / (1 + E/K)$
    #[inline]
    fn shading(&self) -> f64 {
        1.0 / (1.0 + self.crowding / self.k)
    }
}

impl Default for PlantCanopy {
    /// A moderately crowded stand on a size axis up to 10
    fn default() -> Self {
        Self::new(1.0, 0.3, 0.4, 5.0, 10.0)
    }
}

// =================================================================================================
// PopulationModel implementation
// =================================================================================================

impl PopulationModel for PlantCanopy {
    /// $g(x) = g_0 (1 - x/x_{max}) \cdot s(E)$, floored at 0 beyond $x_{max}$
    fn growth_rate(&self, x: f64, _t: f64) -> f64 {
        let open = (1.0 - x / self.xmax).max(0.0);
        self.g0 * open * self.shading()
    }

    /// Constant background mortality $m_0$
    fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
        self.m0
    }

    /// $b(x) = b_0 \cdot x \cdot s(E)$
    fn birth_rate(&self, x: f64, _t: f64) -> f64 {
        self.b0 * x * self.shading()
    }

    /// A sparse pioneer stand concentrated at small sizes
    fn init_density(&self, x: f64) -> f64 {
        0.5 * (-x).exp()
    }

    /// $E = \int x \cdot u\,dx$ over the current distribution
    fn compute_env(&mut self, _t: f64, view: &SpeciesView) {
        self.crowding = view.integrate(|x| x, 1.0);
    }

    fn name(&self) -> &str {
        "Plant canopy with crowding feedback"
    }

    fn description(&self) -> Option<&str> {
        Some("Size-structured stand; total biomass shades growth and fecundity")
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DistributionKind;

    fn create_canopy() -> PlantCanopy {
        PlantCanopy::new(1.0, 0.3, 0.4, 5.0, 10.0)
    }

    fn view_with_biomass(e: f64) -> SpeciesView {
        // Two cohorts one size unit apart carrying E = e in total
        SpeciesView::new(
            0.0,
            vec![0.5, 1.5],
            vec![e, e],
            Vec::new(),
            0,
            DistributionKind::Density,
        )
    }

    #[test]
    fn test_uncrowded_rates() {
        let model = create_canopy();
        assert!((model.growth_rate(0.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((model.growth_rate(5.0, 0.0) - 0.5).abs() < 1e-12);
        assert_eq!(model.growth_rate(10.0, 0.0), 0.0);
        assert_eq!(model.growth_rate(12.0, 0.0), 0.0);
        assert_eq!(model.mortality_rate(3.0, 0.0), 0.3);
        assert!((model.birth_rate(2.0, 0.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_crowding_halves_rates_at_k() {
        let mut model = create_canopy();
        // E = ∫ x·u dx = (0.5·5 + 1.5·5)/2 · 1 = 5 = K
        model.compute_env(0.0, &view_with_biomass(5.0));
        assert!((model.crowding() - 5.0).abs() < 1e-12);
        assert!((model.growth_rate(0.0, 0.0) - 0.5).abs() < 1e-12);
        assert!((model.birth_rate(2.0, 0.0) - 0.4).abs() < 1e-12);
        // Mortality is crowding-independent
        assert_eq!(model.mortality_rate(0.0, 0.0), 0.3);
    }

    #[test]
    fn test_env_is_idempotent() {
        let mut model = create_canopy();
        let view = view_with_biomass(2.0);
        model.compute_env(0.0, &view);
        let g1 = model.growth_rate(1.0, 0.0);
        model.compute_env(0.0, &view);
        let g2 = model.growth_rate(1.0, 0.0);
        assert_eq!(g1, g2);
    }

    #[test]
    #[should_panic(expected = "Crowding scale must be positive")]
    fn test_invalid_crowding_scale() {
        PlantCanopy::new(1.0, 0.3, 0.4, 0.0, 10.0);
    }
}
