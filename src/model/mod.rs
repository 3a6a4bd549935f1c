//! Population model traits and grid geometry
//!
//! This module defines the core API a user model exposes to the solver:
//! - [`PopulationModel`]: trait for demographic rates and environment
//!   computation
//! - [`SpeciesView`]: read-only snapshot of one species' distribution,
//!   handed to the model when it recomputes its environment
//! - [`CohortGrid`]: per-species grid description (boundary, breakpoints,
//!   cell centers and widths)
//!
//! # Design Philosophy
//!
//! The separation of concerns:
//! - **PopulationModel**: biology (growth, mortality, fecundity, environment)
//! - **CohortGrid**: geometry (where cohorts and cells live on the size axis)
//! - **Solver**: numerics (discretization kernels, time integration,
//!   cohort bookkeeping)
//!
//! The model never sees the flat state buffer. It reads the distribution
//! through a [`SpeciesView`] and answers pointwise rate queries.

mod grid;
mod traits;
mod view;

pub use grid::CohortGrid;
pub use traits::PopulationModel;
pub use view::{DistributionKind, SpeciesView};
