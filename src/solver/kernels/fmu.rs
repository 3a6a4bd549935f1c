//! Fixed-mesh upwind finite-volume kernel (FMU)
//!
//! # Scheme
//!
//! The size axis is divided into J fixed cells with centers X_i and widths
//! h_i. The state carries one density per cell; the semi-discrete transport
//! equation is the finite-volume balance
//!
//! ```text
//! du_i/dt = -( g(x_{i+1}) · u*_{i+1} - g(x_i) · u*_i ) / h_i - m(X_i) · u_i
//! ```
//!
//! where `u*_i` is the upwind reconstruction of the density at face `x_i`:
//! for rightward transport (g > 0) the value of the cell below the face,
//! for leftward transport the cell above it.
//!
//! # Boundary faces
//!
//! The lower face carries the renewal inflow directly: the flux at `xb` is
//! the birth flux B = ∫ b·u dx, equivalent to the upwind value
//! `u*_0 = B / g(xb)`. At the top face material leaves by upwind copy of
//! the last cell; nothing enters from above.

use nalgebra::DVector;

use crate::model::SpeciesView;
use crate::solver::kernels::birth_flux;
use crate::solver::species::SpeciesState;
use crate::solver::{Reconstruction, SolverControl};

/// Fill du/dt for one FMU species
pub(crate) fn rates(
    sp: &SpeciesState,
    control: &SolverControl,
    view: &SpeciesView,
    t: f64,
    s: &DVector<f64>,
    dsdt: &mut DVector<f64>,
) {
    let u = sp.slot("u");
    let j = sp.j;
    let local = sp.local(s);
    let faces = sp.grid.breakpoints();
    let centers = sp.grid.centers();
    let widths = sp.grid.widths();

    // Only first-order upwind is implemented.
    match control.reconstruction {
        Reconstruction::FirstOrderUpwind => {}
    }

    let b_total = birth_flux(sp, view, t);

    // Face fluxes g·u*, faces 0..=J
    let mut flux = vec![0.0; j + 1];

    // Lower face: renewal inflow, g(xb)·u*_0 with u*_0 = B / g(xb)
    flux[0] = b_total;

    for i in 1..j {
        let g = sp.model.growth_rate(faces[i], t);
        let ustar = if g >= 0.0 {
            local[sp.layout.position(u, i - 1)]
        } else {
            local[sp.layout.position(u, i)]
        };
        flux[i] = g * ustar;
    }

    // Top face: outflow only
    let g_top = sp.model.growth_rate(faces[j], t);
    flux[j] = if g_top >= 0.0 {
        g_top * local[sp.layout.position(u, j - 1)]
    } else {
        0.0
    };

    for i in 0..j {
        let m = sp.model.mortality_rate(centers[i], t);
        let ui = local[sp.layout.position(u, i)];
        dsdt[sp.at(u, i)] = -(flux[i + 1] - flux[i]) / widths[i] - m * ui;
    }
}

// =================================================================================================
// Tests
// =================================================================================================
