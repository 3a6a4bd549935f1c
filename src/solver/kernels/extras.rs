//! Extra-variable kernel
//!
//! User models may declare extra per-cohort state variables (reserves,
//! damage, cumulative reproduction). They are stored interleaved after the
//! core variables and integrated alongside them: for each cohort column the
//! model maps the current extra values to their rates, and the kernel
//! writes the rates through the resolved interleaved slots.

use nalgebra::DVector;

use crate::model::SpeciesView;
use crate::solver::species::SpeciesState;
use crate::state::VarSlot;

/// Fill the extra-variable rates for one species
pub(crate) fn rates(
    sp: &SpeciesState,
    view: &SpeciesView,
    t: f64,
    s: &DVector<f64>,
    dsdt: &mut DVector<f64>,
) {
    let m = sp.model.extra_count();
    if m == 0 {
        return;
    }

    let slots: Vec<VarSlot> = sp.extra_names.iter().map(|n| sp.slot(n)).collect();
    let local = sp.local(s);
    let mut values = vec![0.0; m];
    let mut out = vec![0.0; m];

    for k in 0..sp.j {
        let x = view.position(k);
        for (e, slot) in slots.iter().enumerate() {
            values[e] = local[sp.layout.position(*slot, k)];
        }
        out.fill(0.0);
        sp.model.extra_rates(x, t, &values, &mut out);
        for (e, slot) in slots.iter().enumerate() {
            dsdt[sp.at(*slot, k)] = out[e];
        }
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

    /// One extra variable that relaxes toward the cohort size
    struct Tracker;

    impl PopulationModel for Tracker {
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
        fn extra_count(&self) -> usize {
            1
        }
        fn init_state_extra(&self, x: f64, _t: f64, out: &mut [f64]) {
            out[0] = 0.5 * x;
        }
        fn extra_rates(&self, x: f64, _t: f64, extras: &[f64], out: &mut [f64]) {
            out[0] = x - extras[0];
        }
        fn name(&self) -> &str {
            "Tracker"
        }
    }

    #[test]
    fn test_extra_rates_written_interleaved() {
        let grid = CohortGrid::uniform(3, 0.0, 3.0).unwrap();
        let sp = SpeciesState::new(
            PspmMethod::Cm,
            grid,
            Box::new(Tracker),
            vec!["tracked_size".to_string()],
            None,
        )
        .unwrap();

        let mut block = vec![0.0; sp.size()];
        sp.initialize_block(&mut block);
        let s = DVector::from_vec(block);
        let mut dsdt = DVector::zeros(s.len());
        let view = sp.view(&s);

        rates(&sp, &view, 0.0, &s, &mut dsdt);

        // Cohorts sit at x = 0, 1, 2, 3 with extra initialized to x/2,
        // so d(extra)/dt = x - x/2 = x/2
        let slot = sp.slot("tracked_size");
        let x = sp.slot("x");
        for k in 0..sp.j {
            let xk = s[sp.at(x, k)];
            assert!(
                (dsdt[sp.at(slot, k)] - 0.5 * xk).abs() < 1e-12,
                "cohort {} extra rate",
                k
            );
        }
    }

    #[test]
    fn test_no_extras_is_a_no_op() {
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

        let grid = CohortGrid::uniform(3, 0.0, 3.0).unwrap();
        let sp =
            SpeciesState::new(PspmMethod::Cm, grid, Box::new(Bare), Vec::new(), None).unwrap();
        let mut block = vec![0.0; sp.size()];
        sp.initialize_block(&mut block);
        let s = DVector::from_vec(block);
        let mut dsdt = DVector::zeros(s.len());
        let view = sp.view(&s);

        rates(&sp, &view, 0.0, &s, &mut dsdt);
        assert!(dsdt.iter().all(|&v| v == 0.0));
    }
}
