//! Between-step cohort bookkeeping
//!
//! Structural updates run strictly between integrator steps, once per
//! `step_to` call, so the state length is constant across any single
//! Runge–Kutta step:
//!
//! - **EBT** (remove-before-add): interior cohorts whose count fell below
//!   the merge threshold are dropped, then a populated boundary cell is
//!   promoted to a fresh interior cohort and the deviation pair reset.
//! - **CM** (add-before-remove): a new boundary cohort is inserted at xb
//!   with its density set by the renewal fixed point, then interior
//!   cohorts are merged away while the cohort count exceeds its cap.
//!
//! Updates are transactional: each builds a fresh species block and swaps
//! it in, so a species is never observed with an inconsistent cohort count
//! or state length.

use crate::solver::species::SpeciesState;
use crate::solver::SolverControl;
use crate::state::VarSlot;

// =================================================================================================
// Shared block plumbing
// =================================================================================================

/// Read the two core variables and the extras out of a species block
fn gather(
    sp: &SpeciesState,
    block: &[f64],
    a_name: &str,
    b_name: &str,
) -> (Vec<f64>, Vec<f64>, Vec<Vec<f64>>) {
    let sa = sp.slot(a_name);
    let sb = sp.slot(b_name);
    let slots: Vec<VarSlot> = sp.extra_names.iter().map(|n| sp.slot(n)).collect();

    let mut a = Vec::with_capacity(sp.j);
    let mut b = Vec::with_capacity(sp.j);
    let mut extras = Vec::with_capacity(sp.j);
    for k in 0..sp.j {
        a.push(block[sp.layout.position(sa, k)]);
        b.push(block[sp.layout.position(sb, k)]);
        extras.push(
            slots
                .iter()
                .map(|s| block[sp.layout.position(*s, k)])
                .collect(),
        );
    }
    (a, b, extras)
}

/// Write cohort rows back into a fresh block under the current layout
fn serialize(
    sp: &SpeciesState,
    a_name: &str,
    a: &[f64],
    b_name: &str,
    b: &[f64],
    extras: &[Vec<f64>],
) -> Vec<f64> {
    debug_assert_eq!(a.len(), sp.j);
    debug_assert_eq!(b.len(), sp.j);

    let mut block = vec![0.0; sp.size()];
    let sa = sp.slot(a_name);
    let sb = sp.slot(b_name);
    let slots: Vec<VarSlot> = sp.extra_names.iter().map(|n| sp.slot(n)).collect();

    for k in 0..sp.j {
        block[sp.layout.position(sa, k)] = a[k];
        block[sp.layout.position(sb, k)] = b[k];
        for (e, slot) in slots.iter().enumerate() {
            block[sp.layout.position(*slot, k)] = extras[k][e];
        }
    }
    block
}

// =================================================================================================
// EBT: dead-cohort removal and boundary promotion
// =================================================================================================

/// EBT structural update: remove dead cohorts, then promote the boundary
/// cell
///
/// Returns the rebuilt species block; `sp` carries the new cohort count
/// and layout on return.
pub(crate) fn ebt_update(
    sp: &mut SpeciesState,
    block: Vec<f64>,
    control: &SolverControl,
    t: f64,
) -> Vec<f64> {
    let (xs, ns, extras) = gather(sp, &block, "X", "N");

    // Removal first: a dead boundary cell must not be re-spawned onto
    // stale interior data.
    let mut keep_x = vec![xs[0]];
    let mut keep_n = vec![ns[0]];
    let mut keep_e = vec![extras[0].clone()];
    for k in 1..sp.j {
        if ns[k] >= control.ebt_merge_threshold {
            keep_x.push(xs[k]);
            keep_n.push(ns[k]);
            keep_e.push(extras[k].clone());
        }
    }

    // Promotion: a populated boundary cell becomes an interior cohort at
    // its mean size, and the deviation pair resets to (0, 0).
    let pi0 = keep_x[0];
    let n0 = keep_n[0];
    if n0 > 0.0 {
        let x_new = sp.grid.xb() + pi0 / n0;
        keep_x.insert(1, x_new);
        keep_n.insert(1, n0);
        keep_e.insert(1, keep_e[0].clone());

        keep_x[0] = 0.0;
        keep_n[0] = 0.0;
        let mut fresh = vec![0.0; sp.model.extra_count()];
        sp.model.init_state_extra(sp.grid.xb(), t, &mut fresh);
        keep_e[0] = fresh;
    }

    sp.set_cohorts(keep_x.len());
    serialize(sp, "X", &keep_x, "N", &keep_n, &keep_e)
}

// =================================================================================================
// CM: boundary insertion, renewal fixed point, interior merging
// =================================================================================================

/// CM structural update: insert a boundary cohort, solve the renewal fixed
/// point, merge interior cohorts while over the cap
pub(crate) fn cm_update(
    sp: &mut SpeciesState,
    block: Vec<f64>,
    control: &SolverControl,
    t: f64,
) -> Vec<f64> {
    let (mut xs, mut us, mut extras) = gather(sp, &block, "x", "u");

    // Insert the new boundary cohort, seeded from the previous boundary
    // density as the fixed-point starting guess.
    let xb = sp.grid.xb();
    let guess = us[0];
    xs.insert(0, xb);
    us.insert(0, guess);
    let mut fresh = vec![0.0; sp.model.extra_count()];
    sp.model.init_state_extra(xb, t, &mut fresh);
    extras.insert(0, fresh);

    sp.set_cohorts(xs.len());
    let mut block = serialize(sp, "x", &xs, "u", &us, &extras);

    calc_birth_flux_cm(sp, &mut block, t, control);

    // Merge: drop the interior cohort with the tightest spacing until the
    // count is back under the cap.
    if sp.j > control.cm_max_cohorts {
        let (mut xs, mut us, mut extras) = gather(sp, &block, "x", "u");
        while xs.len() > control.cm_max_cohorts && xs.len() >= 3 {
            let mut kmin = 1;
            let mut dmin = f64::INFINITY;
            for k in 1..xs.len() - 1 {
                let d = xs[k + 1] - xs[k - 1];
                if d < dmin {
                    dmin = d;
                    kmin = k;
                }
            }
            us.remove(kmin);
            xs.remove(kmin);
            extras.remove(kmin);
        }
        sp.set_cohorts(xs.len());
        block = serialize(sp, "x", &xs, "u", &us, &extras);
    }

    block
}

/// Fixed-point iteration for the CM renewal condition
///
/// Iterates `u_next = B(u_try) / g(xb, t)` — recomputing the environment
/// and the birth flux at every trial boundary density — until successive
/// iterates agree to `cm_fixed_point_tol`. The converged density is
/// committed to the block and the final birth flux cached on the species.
/// Non-convergence within `cm_fixed_point_max_iter` iterations is reported
/// on stderr and the last iterate committed.
pub(crate) fn calc_birth_flux_cm(
    sp: &mut SpeciesState,
    block: &mut [f64],
    t: f64,
    control: &SolverControl,
) -> f64 {
    let u_slot = sp.slot("u");
    let u0_idx = sp.layout.position(u_slot, 0);
    let xb = sp.grid.xb();

    let mut u_try = block[u0_idx];
    let mut b_flux = 0.0;
    let mut converged = false;

    for _ in 0..control.cm_fixed_point_max_iter {
        block[u0_idx] = u_try;
        let view = sp.view_local(block);
        sp.model.compute_env(t, &view);

        b_flux = match sp.input_birth_flux {
            Some(b) => b,
            None => view.integrate(|x| sp.model.birth_rate(x, t), 1.0),
        };

        let g0 = sp.model.growth_rate(xb, t);
        if g0 <= 0.0 {
            // No inflow is possible through a non-growing boundary.
            if b_flux > 0.0 {
                eprintln!(
                    "pspm-rs: renewal boundary has g(xb) <= 0 with positive birth flux at t = {}",
                    t
                );
            }
            u_try = 0.0;
            converged = true;
            break;
        }

        let u_next = b_flux / g0;
        if (u_next - u_try).abs() < control.cm_fixed_point_tol {
            u_try = u_next;
            converged = true;
            break;
        }
        u_try = u_next;
    }

    if !converged {
        eprintln!(
            "pspm-rs: boundary density iteration did not converge within {} iterations at t = {}",
            control.cm_fixed_point_max_iter, t
        );
    }

    block[u0_idx] = u_try;
    sp.birth_flux = b_flux;
    u_try
}

// =================================================================================================
// Tests
// =================================================================================================
