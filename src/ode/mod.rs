//! Runge–Kutta time integrators
//!
//! This module provides the time integration machinery shared by all PSPM
//! discretizations:
//!
//! - [`CashKarp45`]: embedded Cash–Karp 5(4) pair with per-component
//!   error-scaled adaptive step control — the production integrator
//! - [`euler_step`] / [`rk4_step`]: fixed-step reference integrators over
//!   the same derivative-closure shape, used for validation and comparison
//!
//! # The derivative closure
//!
//! All integrators advance a flat `DVector<f64>` state buffer and call a
//! user closure `f(t, y, dydt)` that fills `dydt` with the derivative at
//! `(t, y)`. The PSPM solver builds this closure from its discretization
//! kernels; tests build it directly from analytical right-hand sides.
//!
//! # Example
//!
//! ```rust
//! use nalgebra::DVector;
//! use pspm_rs::ode::CashKarp45;
//!
//! // dy/dt = -y, y(0) = 1  →  y(1) = 1/e
//! let mut stepper = CashKarp45::new(0.0, 1e-8, 0.1);
//! let mut y = DVector::from_vec(vec![1.0]);
//! stepper.step_to(1.0, &mut y, &mut |_t, y, dydt| {
//!     dydt[0] = -y[0];
//! });
//!
//! assert!((y[0] - (-1.0f64).exp()).abs() < 1e-6);
//! assert_eq!(stepper.time(), 1.0);
//! ```

mod cash_karp;
mod fixed;

pub use cash_karp::{CashKarp45, Stats};
pub use fixed::{euler_step, rk4_step};
