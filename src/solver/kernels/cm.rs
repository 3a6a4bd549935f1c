//! Characteristic-method kernel (CM)
//!
//! # Scheme
//!
//! Cohorts ride the characteristics of the transport equation: each cohort
//! carries its own position x_i and density u_i, with
//!
//! ```text
//! dx_i/dt = g(x_i, t)
//! du_i/dt = -( m(x_i, t) + g'(x_i, t) ) · u_i
//! ```
//!
//! The g′ term accounts for the stretching of the characteristic tube; it
//! is evaluated as a one-sided numerical derivative with step
//! [`GRAD_DX`](crate::solver::kernels::GRAD_DX).
//!
//! # Boundary cohort
//!
//! Cohort 0 sits at the boundary: x_0 ≡ xb never moves (dx_0/dt = 0), and
//! its density is pinned to the renewal condition
//! u(xb)·g(xb) = ∫ b·u dx by the between-step fixed-point iteration in the
//! cohort manager. Between renewals u_0 decays like any other cohort.

use nalgebra::DVector;

use crate::solver::kernels::growth_gradient;
use crate::solver::species::SpeciesState;

/// Fill dx/dt and du/dt for one CM species
pub(crate) fn rates(sp: &SpeciesState, t: f64, s: &DVector<f64>, dsdt: &mut DVector<f64>) {
    let x = sp.slot("x");
    let u = sp.slot("u");
    let local = sp.local(s);

    // Boundary cohort is pinned at xb
    dsdt[sp.at(x, 0)] = 0.0;
    for i in 1..sp.j {
        let xi = local[sp.layout.position(x, i)];
        dsdt[sp.at(x, i)] = sp.model.growth_rate(xi, t);
    }

    for i in 0..sp.j {
        let xi = local[sp.layout.position(x, i)];
        let ui = local[sp.layout.position(u, i)];
        let m = sp.model.mortality_rate(xi, t);
        let gdash = growth_gradient(&*sp.model, xi, t);
        dsdt[sp.at(u, i)] = -(m + gdash) * ui;
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CohortGrid, PopulationModel};
    use crate::solver::PspmMethod;

    struct Uniform {
        g: f64,
        m: f64,
    }

    impl PopulationModel for Uniform {
        fn growth_rate(&self, _x: f64, _t: f64) -> f64 {
            self.g
        }
        fn mortality_rate(&self, _x: f64, _t: f64) -> f64 {
            self.m
        }
        fn birth_rate(&self, _x: f64, _t: f64) -> f64 {
            0.0
        }
        fn init_density(&self, x: f64) -> f64 {
            (-x).exp()
        }
        fn name(&self) -> &str {
            "Uniform"
        }
    }

    fn cm_species(g: f64, m: f64) -> (SpeciesState, DVector<f64>) {
        let grid = CohortGrid::uniform(4, 0.0, 4.0).unwrap();
        let sp = SpeciesState::new(
            PspmMethod::Cm,
            grid,
            Box::new(Uniform { g, m }),
            Vec::new(),
            None,
        )
        .unwrap();
        let mut block = vec![0.0; sp.size()];
        sp.initialize_block(&mut block);
        let s = DVector::from_vec(block);
        (sp, s)
    }

    #[test]
    fn test_boundary_cohort_never_moves() {
        let (sp, s) = cm_species(2.0, 0.1);
        let mut dsdt = DVector::zeros(s.len());
        rates(&sp, 0.0, &s, &mut dsdt);

        let x = sp.slot("x");
        assert_eq!(dsdt[sp.at(x, 0)], 0.0);
        for i in 1..sp.j {
            assert_eq!(dsdt[sp.at(x, i)], 2.0);
        }
    }

    #[test]
    fn test_density_decays_with_mortality() {
        // Spatially constant g: g' = 0, so du/dt = -m·u exactly
        let (sp, s) = cm_species(1.0, 0.5);
        let mut dsdt = DVector::zeros(s.len());
        rates(&sp, 0.0, &s, &mut dsdt);

        let u = sp.slot("u");
        for i in 0..sp.j {
            let ui = s[sp.at(u, i)];
            assert!((dsdt[sp.at(u, i)] + 0.5 * ui).abs() < 1e-12);
        }
    }

    #[test]
    fn test_stretching_term_uses_growth_gradient() {
        // g(x) = x: g' = 1, so du/dt = -(m + 1)·u
        struct Linear;
        impl PopulationModel for Linear {
            fn growth_rate(&self, x: f64, _t: f64) -> f64 {
                x
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
                "Linear"
            }
        }

        let grid = CohortGrid::uniform(2, 1.0, 3.0).unwrap();
        let sp =
            SpeciesState::new(PspmMethod::Cm, grid, Box::new(Linear), Vec::new(), None).unwrap();
        let mut block = vec![0.0; sp.size()];
        sp.initialize_block(&mut block);
        let s = DVector::from_vec(block);
        let mut dsdt = DVector::zeros(s.len());
        rates(&sp, 0.0, &s, &mut dsdt);

        let u = sp.slot("u");
        for i in 0..sp.j {
            let ui = s[sp.at(u, i)];
            assert!(
                (dsdt[sp.at(u, i)] + ui).abs() < 1e-9,
                "du/dt should be -u for g(x) = x"
            );
        }
    }
}
