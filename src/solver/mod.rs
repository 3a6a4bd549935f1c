//! The PSPM engine
//!
//! This module wires the pieces together: species bookkeeping, derivative
//! kernels, cohort management and the adaptive integrator, behind the
//! library surface of [`PspmSolver`].
//!
//! # Core Concepts
//!
//! - **Method**: one of four discretizations of the size axis
//!   ([`PspmMethod`]), chosen at construction and shared by all species
//! - **Control**: numeric knobs ([`SolverControl`]) — integrator accuracy,
//!   equilibrium tolerance, cohort-management thresholds
//! - **State buffer**: one flat `DVector<f64>` holding every species'
//!   variables back to back; kernels address it through each species'
//!   layout
//!
//! # Control flow
//!
//! `step_to(t)` drives the adaptive integrator. At every derivative
//! evaluation the environment of each model is recomputed from the trial
//! state, then the method kernel fills the rates for its species' range.
//! When the integrator lands on `t`, the cohort manager applies any
//! structural update (CM boundary insertion and merging, EBT dead-cohort
//! removal and boundary promotion) — never inside a step.
//!
//! # Example
//!
//! ```rust,no_run
//! use pspm_rs::model::CohortGrid;
//! use pspm_rs::models::PlantCanopy;
//! use pspm_rs::solver::{PspmMethod, PspmSolver};
//!
//! fn main() -> Result<(), String> {
//!     let mut solver = PspmSolver::new(PspmMethod::Fmu);
//!     let grid = CohortGrid::uniform(100, 0.0, 10.0)?;
//!     solver.add_species(grid, Box::new(PlantCanopy::default()), Vec::new(), None)?;
//!
//!     solver.initialize();
//!     let u0 = solver.step_to_equilibrium()?;
//!     println!("steady boundary density: {}", u0);
//!     Ok(())
//! }
//! ```

use std::fmt;

use nalgebra::DVector;

use crate::model::{CohortGrid, PopulationModel};
use crate::ode::{CashKarp45, Stats};

pub(crate) mod cohorts;
pub(crate) mod kernels;
pub mod quadrature;
pub(crate) mod species;

use species::SpeciesState;

// =================================================================================================
// PspmMethod
// =================================================================================================

/// Discretization of the size axis
///
/// All methods integrate the same underlying transport equation with a
/// renewal boundary; they differ in what the state buffer carries:
///
/// | Method | State per species            | Grid        |
/// |--------|------------------------------|-------------|
/// | `Fmu`  | cell densities u             | fixed       |
/// | `Mmu`  | mesh nodes x + densities u   | moving      |
/// | `Cm`   | cohort positions x + u       | Lagrangian  |
/// | `Ebt`  | cohort sizes X + counts N    | Lagrangian  |
///
/// The MMU rate kernel is not implemented; constructing an MMU solver
/// succeeds (layout and initialization are fully defined) but `step_to`
/// reports the method as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PspmMethod {
    /// Fixed-mesh upwind finite volume
    Fmu,
    /// Moving-mesh upwind variant (rate kernel unavailable)
    Mmu,
    /// Characteristic method — cohorts follow dx/dt = g
    Cm,
    /// Escalator boxcar train — boundary cell tracked as (π₀, N₀)
    Ebt,
}

impl fmt::Display for PspmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PspmMethod::Fmu => write!(f, "FMU"),
            PspmMethod::Mmu => write!(f, "MMU"),
            PspmMethod::Cm => write!(f, "CM"),
            PspmMethod::Ebt => write!(f, "EBT"),
        }
    }
}

// =================================================================================================
// Reconstruction policy
// =================================================================================================

/// Face reconstruction used by the FMU kernel
///
/// First-order upwind is the shipped default; the enum is the seam for a
/// limited higher-order scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reconstruction {
    /// Piecewise-constant upwind values at cell faces
    #[default]
    FirstOrderUpwind,
}

// =================================================================================================
// SolverControl
// =================================================================================================

/// Numeric control settings
///
/// Plain data with per-field defaults; changes take effect at the next
/// [`PspmSolver::initialize`] or [`PspmSolver::reset_state`] call (the
/// integrator is rebuilt from `ode_eps` and `ode_initial_step_size` there).
#[derive(Debug, Clone)]
pub struct SolverControl {
    /// Scaled-error tolerance of the adaptive integrator
    pub ode_eps: f64,

    /// Trial size of the first integrator step
    pub ode_initial_step_size: f64,

    /// Equilibrium detection: maximum spread of the rolling 5-sample
    /// window of `u0_out`
    pub convergence_eps: f64,

    /// Hard cap on `step_to_equilibrium` increments before giving up
    pub equilibrium_max_steps: usize,

    /// EBT: interior cohorts with a count below this are removed
    pub ebt_merge_threshold: f64,

    /// CM: interior cohorts are merged while the count exceeds this cap
    pub cm_max_cohorts: usize,

    /// CM renewal fixed point: convergence tolerance on the boundary
    /// density
    pub cm_fixed_point_tol: f64,

    /// CM renewal fixed point: iteration cap
    pub cm_fixed_point_max_iter: usize,

    /// FMU face reconstruction policy
    pub reconstruction: Reconstruction,
}

impl Default for SolverControl {
    fn default() -> Self {
        Self {
            ode_eps: 1e-6,
            ode_initial_step_size: 0.1,
            convergence_eps: 1e-6,
            equilibrium_max_steps: 200_000,
            ebt_merge_threshold: 1e-10,
            cm_max_cohorts: 500,
            cm_fixed_point_tol: 1e-6,
            cm_fixed_point_max_iter: 100,
            reconstruction: Reconstruction::FirstOrderUpwind,
        }
    }
}

impl SolverControl {
    /// Validate that the settings are numerically meaningful
    pub fn validate(&self) -> Result<(), String> {
        if !(self.ode_eps > 0.0) {
            return Err("ODE tolerance must be positive".to_string());
        }
        if !(self.ode_initial_step_size > 0.0) {
            return Err("Initial step size must be positive".to_string());
        }
        if !(self.convergence_eps > 0.0) {
            return Err("Convergence tolerance must be positive".to_string());
        }
        if self.cm_max_cohorts < 2 {
            return Err("The CM cohort cap must allow at least 2 cohorts".to_string());
        }
        if self.cm_fixed_point_max_iter == 0 {
            return Err("The fixed-point iteration cap must be positive".to_string());
        }
        if !(self.ebt_merge_threshold >= 0.0) {
            return Err("The EBT merge threshold must be non-negative".to_string());
        }
        Ok(())
    }
}

// =================================================================================================
// PspmSolver
// =================================================================================================

/// The PSPM solver
///
/// Owns the species list, the flat state buffer and the adaptive
/// integrator. Species are added first, then `initialize()` seeds the
/// state and `step_to` advances the coupled system.
pub struct PspmSolver {
    method: PspmMethod,
    control: SolverControl,
    species: Vec<SpeciesState>,
    state: DVector<f64>,
    stepper: CashKarp45,
    initialized: bool,
    /// Rolling window of the last 5 `u0_out` samples
    u0_history: Vec<f64>,
}

impl PspmSolver {
    /// Create a solver for the given discretization method
    pub fn new(method: PspmMethod) -> Self {
        let control = SolverControl::default();
        let stepper = CashKarp45::new(0.0, control.ode_eps, control.ode_initial_step_size);
        Self {
            method,
            control,
            species: Vec::new(),
            state: DVector::zeros(0),
            stepper,
            initialized: false,
            u0_history: Vec::new(),
        }
    }

    // ========================================= Queries ==========================================

    /// Discretization method of this solver
    pub fn method(&self) -> PspmMethod {
        self.method
    }

    /// Current control settings
    pub fn control(&self) -> &SolverControl {
        &self.control
    }

    /// Mutable access to the control settings
    ///
    /// Integrator-related fields take effect at the next `initialize` /
    /// `reset_state`; cohort-management fields immediately.
    pub fn control_mut(&mut self) -> &mut SolverControl {
        &mut self.control
    }

    /// Replace the control settings, validating them first
    pub fn set_control(&mut self, control: SolverControl) -> Result<(), String> {
        control.validate()?;
        self.control = control;
        Ok(())
    }

    /// Current simulation time
    pub fn time(&self) -> f64 {
        self.stepper.time()
    }

    /// The flat state buffer
    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    /// Integrator statistics
    pub fn stats(&self) -> &Stats {
        &self.stepper.stats
    }

    /// Number of registered species
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Current cohort (or cell) count of species `i`
    pub fn cohort_count(&self, i: usize) -> usize {
        self.species[i].j
    }

    /// Representative position of every cohort of species `i`
    ///
    /// Cell centers for FMU/MMU, cohort positions for CM, mean cohort
    /// sizes for EBT (boundary cell at xb + π₀/N₀).
    pub fn cohort_positions(&self, i: usize) -> Vec<f64> {
        let sp = &self.species[i];
        sp.distribution(sp.local(&self.state)).0
    }

    /// Density (FMU/MMU/CM) or count (EBT) of every cohort of species `i`
    pub fn cohort_weights(&self, i: usize) -> Vec<f64> {
        let sp = &self.species[i];
        sp.distribution(sp.local(&self.state)).1
    }

    /// The (π₀, N₀) deviation pair of species `i` — EBT only
    pub fn boundary_cohort(&self, i: usize) -> Option<(f64, f64)> {
        if self.method != PspmMethod::Ebt {
            return None;
        }
        let sp = &self.species[i];
        let xs = sp.slot("X");
        let ns = sp.slot("N");
        Some((self.state[sp.at(xs, 0)], self.state[sp.at(ns, 0)]))
    }

    /// Birth flux of species `i` from the most recent output query
    pub fn species_birth_flux(&self, i: usize) -> f64 {
        self.species[i].birth_flux
    }

    // ====================================== Species setup =======================================

    /// Register a species
    ///
    /// # Arguments
    ///
    /// * `grid` — initial grid geometry
    /// * `model` — the population model
    /// * `extra_names` — names for the model's extra per-cohort variables,
    ///   one per declared extra
    /// * `input_birth_flux` — `Some(b)` pins the boundary birth flux to a
    ///   constant; `None` computes it from the model's birth rate
    ///
    /// The state buffer grows by the species' size. All species must be
    /// registered before `initialize`.
    ///
    /// # Errors
    ///
    /// - the solver has already been initialized
    /// - the number of extra names does not match the model's declared
    ///   extra count
    pub fn add_species(
        &mut self,
        grid: CohortGrid,
        model: Box<dyn PopulationModel>,
        extra_names: Vec<String>,
        input_birth_flux: Option<f64>,
    ) -> Result<(), String> {
        if self.initialized {
            return Err(
                "Species cannot be added after initialize(); call reset_state() first"
                    .to_string(),
            );
        }
        let mut sp = SpeciesState::new(self.method, grid, model, extra_names, input_birth_flux)?;
        sp.start = self.state.len();

        let mut data = self.state.as_slice().to_vec();
        data.resize(sp.start + sp.size(), 0.0);
        self.state = DVector::from_vec(data);

        self.species.push(sp);
        Ok(())
    }

    /// Register a species on a uniformly or logarithmically spaced grid
    ///
    /// Convenience wrapper building the grid from `intervals` cells on
    /// `[xb, xm]`.
    pub fn add_species_uniform(
        &mut self,
        intervals: usize,
        xb: f64,
        xm: f64,
        log_spacing: bool,
        model: Box<dyn PopulationModel>,
        extra_names: Vec<String>,
        input_birth_flux: Option<f64>,
    ) -> Result<(), String> {
        let grid = if log_spacing {
            CohortGrid::logarithmic(intervals, xb, xm)?
        } else {
            CohortGrid::uniform(intervals, xb, xm)?
        };
        self.add_species(grid, model, extra_names, input_birth_flux)
    }

    // ========================================= Lifecycle ========================================

    /// Zero the state, re-seed the grid portions, and reset the integrator
    ///
    /// Every species returns to its initial cohort count; densities are
    /// left at zero ([`initialize`](Self::initialize) fills them). The
    /// integrator is rebuilt from the current control settings and the
    /// equilibrium history cleared.
    pub fn reset_state(&mut self) {
        self.stepper = CashKarp45::new(
            0.0,
            self.control.ode_eps,
            self.control.ode_initial_step_size,
        );
        self.u0_history.clear();
        self.initialized = false;

        let mut data = Vec::new();
        for sp in self.species.iter_mut() {
            sp.reset();
            sp.start = data.len();
            let mut block = vec![0.0; sp.size()];
            sp.seed_grid(&mut block);
            data.extend(block);
        }
        self.state = DVector::from_vec(data);
    }

    /// Write the initial densities and extra state of every species
    ///
    /// Resets first, so a solver can be re-initialized at any point.
    pub fn initialize(&mut self) {
        self.reset_state();
        for i in 0..self.species.len() {
            let range = self.species[i].range();
            let block = &mut self.state.as_mut_slice()[range];
            self.species[i].initialize_block(block);
        }
        self.initialized = true;
    }

    // ========================================= Stepping =========================================

    /// Advance the coupled system to `t_target`
    ///
    /// Runs the adaptive integrator (clamping the final sub-step so the
    /// simulation time lands on `t_target` exactly), then applies the
    /// method's structural cohort update.
    ///
    /// # Errors
    ///
    /// - the solver has not been initialized
    /// - the method is MMU (no rate kernel)
    /// - `t_target` lies before the current time
    pub fn step_to(&mut self, t_target: f64) -> Result<(), String> {
        if !self.initialized {
            return Err("Solver is not initialized; call initialize() first".to_string());
        }
        if self.method == PspmMethod::Mmu {
            return Err(
                "The MMU rate kernel is not implemented; use FMU, CM or EBT".to_string()
            );
        }
        let t_now = self.stepper.time();
        if t_target < t_now {
            return Err(format!(
                "Target time {} lies before current time {}",
                t_target, t_now
            ));
        }
        if t_target == t_now {
            return Ok(());
        }

        {
            let stepper = &mut self.stepper;
            let state = &mut self.state;
            let species = &mut self.species;
            let control = &self.control;
            let method = self.method;

            stepper.step_to(t_target, state, &mut |t, y, dydt| {
                kernels::derivatives(method, control, species, t, y, dydt);
            });
        }

        self.apply_structural_updates(t_target);
        Ok(())
    }

    /// Between-step cohort bookkeeping for the cohort-based methods
    fn apply_structural_updates(&mut self, t: f64) {
        if !matches!(self.method, PspmMethod::Cm | PspmMethod::Ebt) {
            return;
        }

        let mut blocks: Vec<Vec<f64>> = Vec::with_capacity(self.species.len());
        for sp in self.species.iter_mut() {
            let local = sp.local(&self.state).to_vec();
            let block = match self.method {
                PspmMethod::Ebt => cohorts::ebt_update(sp, local, &self.control, t),
                PspmMethod::Cm => cohorts::cm_update(sp, local, &self.control, t),
                _ => unreachable!(),
            };
            blocks.push(block);
        }

        let total: usize = blocks.iter().map(|b| b.len()).sum();
        let mut data = Vec::with_capacity(total);
        for (sp, block) in self.species.iter_mut().zip(blocks) {
            sp.start = data.len();
            data.extend(block);
        }
        self.state = DVector::from_vec(data);
    }

    // ========================================== Output ==========================================

    /// Current boundary birth flux, summed over species
    ///
    /// Recomputes each model's environment at the current state, so the
    /// result is consistent with the latest step.
    pub fn newborns_out(&mut self) -> f64 {
        let t = self.stepper.time();
        let mut total = 0.0;
        for sp in self.species.iter_mut() {
            let view = sp.view(&self.state);
            sp.model.compute_env(t, &view);
            let b = kernels::birth_flux(sp, &view, t);
            sp.birth_flux = b;
            total += b;
        }
        total
    }

    /// Current boundary density u(xb) = B / g(xb, t), summed over species
    ///
    /// Meaningful only while every species grows at its boundary
    /// (g(xb, t) > 0).
    pub fn u0_out(&mut self) -> f64 {
        let t = self.stepper.time();
        let mut total = 0.0;
        for sp in self.species.iter_mut() {
            let view = sp.view(&self.state);
            sp.model.compute_env(t, &view);
            let b = kernels::birth_flux(sp, &view, t);
            sp.birth_flux = b;
            total += b / sp.model.growth_rate(sp.grid.xb(), t);
        }
        total
    }

    /// Advance in Δt = 0.05 increments until the boundary density settles
    ///
    /// Termination: the spread of the rolling 5-sample window of
    /// [`u0_out`](Self::u0_out) falls below `convergence_eps`. Returns the
    /// equilibrium boundary density.
    ///
    /// # Errors
    ///
    /// Propagates `step_to` errors, and reports non-convergence once
    /// `equilibrium_max_steps` increments have been taken.
    pub fn step_to_equilibrium(&mut self) -> Result<f64, String> {
        const DT: f64 = 0.05;

        for _ in 0..self.control.equilibrium_max_steps {
            let target = self.stepper.time() + DT;
            self.step_to(target)?;

            let u0 = self.u0_out();
            if self.u0_history.len() == 5 {
                self.u0_history.remove(0);
            }
            self.u0_history.push(u0);

            if self.u0_history.len() == 5 {
                let max = self.u0_history.iter().cloned().fold(f64::MIN, f64::max);
                let min = self.u0_history.iter().cloned().fold(f64::MAX, f64::min);
                if max - min < self.control.convergence_eps {
                    return Ok(u0);
                }
            }
        }

        Err(format!(
            "No equilibrium within {} increments (u0 window: {:?})",
            self.control.equilibrium_max_steps, self.u0_history
        ))
    }
}

// =================================================================================================
// Tests
// =================================================================================================
