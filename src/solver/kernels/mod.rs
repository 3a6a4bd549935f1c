//! Method-specific derivative kernels
//!
//! Each kernel fills the rates buffer dS/dt for its species' range of the
//! flat state buffer, given the current time and trial state. The
//! environment of every model is recomputed immediately before its kernel
//! runs, so the rates are always consistent with the trial state the
//! integrator is probing.
//!
//! Kernels read from the state buffer and write only to their species'
//! range of the rates buffer; the buffer length is constant across any
//! single integrator step (cohort bookkeeping runs strictly between steps).

use nalgebra::DVector;

use crate::model::{PopulationModel, SpeciesView};
use crate::solver::species::SpeciesState;
use crate::solver::{PspmMethod, SolverControl};

pub(crate) mod cm;
pub(crate) mod ebt;
pub(crate) mod extras;
pub(crate) mod fmu;

/// Step used for the one-sided numerical derivative of the growth rate
pub(crate) const GRAD_DX: f64 = 1e-3;

/// Fill dS/dt for all species at the trial state `(t, y)`
pub(crate) fn derivatives(
    method: PspmMethod,
    control: &SolverControl,
    species: &mut [SpeciesState],
    t: f64,
    y: &DVector<f64>,
    dydt: &mut DVector<f64>,
) {
    dydt.fill(0.0);
    for sp in species.iter_mut() {
        let view = sp.view(y);
        sp.model.compute_env(t, &view);
        match method {
            PspmMethod::Fmu => fmu::rates(sp, control, &view, t, y, dydt),
            PspmMethod::Cm => cm::rates(sp, t, y, dydt),
            PspmMethod::Ebt => ebt::rates(sp, &view, t, y, dydt),
            // MMU has no rate kernel; step_to rejects the method upfront
            PspmMethod::Mmu => unreachable!("MMU is rejected before integration"),
        }
        extras::rates(sp, &view, t, y, dydt);
    }
}

/// Birth flux B of one species at the current trial state
///
/// Either the externally pinned input flux, or ∫ b(x,t)·u(x) dx over the
/// snapshot (a plain sum of b·N over cohorts for EBT).
pub(crate) fn birth_flux(sp: &SpeciesState, view: &SpeciesView, t: f64) -> f64 {
    match sp.input_birth_flux {
        Some(b) => b,
        None => view.integrate(|x| sp.model.birth_rate(x, t), 1.0),
    }
}

/// One-sided numerical derivative g′(x, t) of the growth rate
#[inline]
pub(crate) fn growth_gradient(model: &dyn PopulationModel, x: f64, t: f64) -> f64 {
    (model.growth_rate(x + GRAD_DX, t) - model.growth_rate(x, t)) / GRAD_DX
}

// =================================================================================================
// Tests
// =================================================================================================
