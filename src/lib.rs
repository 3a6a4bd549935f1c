//! pspm-rs: Structured Population Simulation Framework
//!
//! A flexible and extensible framework for simulating physiologically
//! structured population models (PSPMs) using numerical methods. A PSPM
//! describes the evolution of a density distribution u(x, t) over a
//! one-dimensional "size" axis x, coupled to an environment computed from
//! the current distribution through a renewal boundary condition at the
//! lower size bound.
//!
//! # Architecture
//!
//! pspm-rs is built on two core principles:
//!
//! 1. **Separation of Biology and Numerics**
//!    - Population models define demographic rates (what to solve)
//!    - The solver provides discretizations and time integration (how to solve)
//!
//! 2. **Multi-method discretization over one flat state buffer**
//!    - Four cohort discretizations (FMU, MMU, CM, EBT) share a single
//!      adaptive Cash–Karp 5(4) integrator
//!    - A state-layout abstraction maps logically named variables
//!      (positions, densities, extra per-cohort state) onto offsets and
//!      strides of the flat buffer
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pspm_rs::model::{CohortGrid, PopulationModel};
//! use pspm_rs::solver::{PspmMethod, PspmSolver};
//!
//! // 1. Define a population model: constant growth, light mortality,
//! //    size-proportional fecundity.
//! struct Annual;
//!
//! impl PopulationModel for Annual {
//!     fn growth_rate(&self, _x: f64, _t: f64) -> f64 { 1.0 }
//!     fn mortality_rate(&self, _x: f64, _t: f64) -> f64 { 0.2 }
//!     fn birth_rate(&self, x: f64, _t: f64) -> f64 { 0.1 * x }
//!     fn init_density(&self, x: f64) -> f64 { (-x).exp() }
//!     fn name(&self) -> &str { "Annual" }
//! }
//!
//! fn main() -> Result<(), String> {
//!     // 2. Configure the solver: fixed-mesh upwind over x in [0, 10]
//!     let mut solver = PspmSolver::new(PspmMethod::Fmu);
//!     let grid = CohortGrid::uniform(100, 0.0, 10.0)?;
//!     solver.add_species(grid, Box::new(Annual), Vec::new(), None)?;
//!
//!     // 3. Run
//!     solver.initialize();
//!     solver.step_to(10.0)?;
//!
//!     // 4. Inspect the boundary renewal
//!     println!("birth flux B = {}", solver.newborns_out());
//!     println!("boundary density u0 = {}", solver.u0_out());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`model`]: the population-model contract and grid geometry
//! - [`state`]: state layout and strided iteration over the flat buffer
//! - [`ode`]: adaptive and fixed-step Runge–Kutta integrators
//! - [`solver`]: the PSPM engine (derivative kernels, cohort management,
//!   library surface)
//! - [`models`]: ready-made population models

// Core modules
pub mod model;
pub mod models;
pub mod ode;
pub mod solver;
pub mod state;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use pspm_rs::prelude::*;
    //! ```
    pub use crate::model::{CohortGrid, PopulationModel, SpeciesView};
    pub use crate::ode::CashKarp45;
    pub use crate::solver::{PspmMethod, PspmSolver, SolverControl};
}
