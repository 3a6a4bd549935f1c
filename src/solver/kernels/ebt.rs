//! Escalator-boxcar-train kernel (EBT)
//!
//! # Scheme
//!
//! Interior cohorts carry a mean size X_k and a count N_k:
//!
//! ```text
//! dX_k/dt = g(X_k, t)
//! dN_k/dt = -m(X_k, t) · N_k
//! ```
//!
//! The boundary cell collects newborns. Its slots hold deviation variables
//! — π₀ (first moment of size above xb) and N₀ (count) — with linearized
//! dynamics around xb:
//!
//! ```text
//! dπ₀/dt = g(xb, t)·N₀ + g'(xb, t)·π₀ - m(xb, t)·π₀
//! dN₀/dt = B - m(xb, t)·N₀
//! ```
//!
//! where B is the total birth flux Σ_k b(X_k, t)·N_k. Between steps the
//! cohort manager promotes a populated boundary cell to an interior cohort
//! at X = xb + π₀/N₀ and resets the deviation pair.

use nalgebra::DVector;

use crate::model::SpeciesView;
use crate::solver::kernels::{birth_flux, growth_gradient};
use crate::solver::species::SpeciesState;

/// Fill dX/dt and dN/dt for one EBT species
pub(crate) fn rates(
    sp: &SpeciesState,
    view: &SpeciesView,
    t: f64,
    s: &DVector<f64>,
    dsdt: &mut DVector<f64>,
) {
    let xs = sp.slot("X");
    let ns = sp.slot("N");
    let local = sp.local(s);
    let xb = sp.grid.xb();

    let b_total = birth_flux(sp, view, t);

    // Boundary cell: deviation dynamics around xb
    let pi0 = local[sp.layout.position(xs, 0)];
    let n0 = local[sp.layout.position(ns, 0)];
    let gb = sp.model.growth_rate(xb, t);
    let mb = sp.model.mortality_rate(xb, t);
    let gdash = growth_gradient(&*sp.model, xb, t);
    dsdt[sp.at(xs, 0)] = gb * n0 + gdash * pi0 - mb * pi0;
    dsdt[sp.at(ns, 0)] = b_total - mb * n0;

    // Interior cohorts ride the characteristics
    for k in 1..sp.j {
        let xk = local[sp.layout.position(xs, k)];
        let nk = local[sp.layout.position(ns, k)];
        dsdt[sp.at(xs, k)] = sp.model.growth_rate(xk, t);
        dsdt[sp.at(ns, k)] = -sp.model.mortality_rate(xk, t) * nk;
    }
}

// =================================================================================================
// Tests
// =================================================================================================
