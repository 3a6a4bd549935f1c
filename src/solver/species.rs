//! Per-species state bookkeeping
//!
//! A [`SpeciesState`] bundles everything the solver tracks for one species:
//! the grid geometry, the layout of its variables inside the global state
//! buffer, the boxed population model, and the buffer range
//! `[start, start + size)` the species occupies.

use nalgebra::DVector;

use crate::model::{CohortGrid, DistributionKind, PopulationModel, SpeciesView};
use crate::solver::PspmMethod;
use crate::state::{StateLayout, VarSlot};

// =================================================================================================
// SpeciesState
// =================================================================================================

/// One species registered with the solver
pub(crate) struct SpeciesState {
    /// Discretization method (copied from the solver)
    pub(crate) method: PspmMethod,

    /// Initial grid geometry; retains the meaning of xb/xm once cohorts move
    pub(crate) grid: CohortGrid,

    /// Layout of this species' variables, relative to `start`
    pub(crate) layout: StateLayout,

    /// The user model
    pub(crate) model: Box<dyn PopulationModel>,

    /// Names of the extra per-cohort variables, in declaration order
    pub(crate) extra_names: Vec<String>,

    /// First index of this species inside the global state buffer
    pub(crate) start: usize,

    /// Current cohort count (cells for FMU/MMU, cohorts for CM/EBT)
    pub(crate) j: usize,

    /// Externally pinned birth flux; `None` computes B from the model
    pub(crate) input_birth_flux: Option<f64>,

    /// Birth flux from the most recent output query
    pub(crate) birth_flux: f64,
}

impl std::fmt::Debug for SpeciesState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeciesState")
            .field("method", &self.method)
            .field("grid", &self.grid)
            .field("layout", &self.layout)
            .field("model", &self.model.name())
            .field("extra_names", &self.extra_names)
            .field("start", &self.start)
            .field("j", &self.j)
            .field("input_birth_flux", &self.input_birth_flux)
            .field("birth_flux", &self.birth_flux)
            .finish()
    }
}

impl SpeciesState {
    /// Create species bookkeeping for `method` on `grid`
    ///
    /// # Errors
    ///
    /// Returns `Err` if the number of extra names does not match the
    /// model's declared extra count.
    pub(crate) fn new(
        method: PspmMethod,
        grid: CohortGrid,
        model: Box<dyn PopulationModel>,
        extra_names: Vec<String>,
        input_birth_flux: Option<f64>,
    ) -> Result<Self, String> {
        if extra_names.len() != model.extra_count() {
            return Err(format!(
                "Model '{}' declares {} extra variables but {} names were given",
                model.name(),
                model.extra_count(),
                extra_names.len()
            ));
        }

        let j = Self::initial_cohorts(method, &grid);
        let layout = Self::build_layout(method, j, &extra_names);

        Ok(Self {
            method,
            grid,
            layout,
            model,
            extra_names,
            start: 0,
            j,
            input_birth_flux,
            birth_flux: 0.0,
        })
    }

    /// Cohort count the method starts with on a fresh grid
    fn initial_cohorts(method: PspmMethod, grid: &CohortGrid) -> usize {
        match method {
            // Cell-based methods carry one density per cell
            PspmMethod::Fmu | PspmMethod::Mmu => grid.intervals(),
            // Cohort-based methods carry one cohort per breakpoint
            PspmMethod::Cm | PspmMethod::Ebt => grid.points(),
        }
    }

    /// Build the layout for `j` cohorts under `method`
    ///
    /// Packed core variables first, then the extras interleaved:
    ///
    /// - FMU: `u` (J)
    /// - MMU: `x` (J+1), `u` (J)
    /// - CM:  `x` (J), `u` (J)
    /// - EBT: `X` (J), `N` (J) — slot 0 holds (π₀, N₀)
    pub(crate) fn build_layout(method: PspmMethod, j: usize, extras: &[String]) -> StateLayout {
        let mut layout = StateLayout::new();
        match method {
            PspmMethod::Fmu => {
                layout.push_packed("u", j);
            }
            PspmMethod::Mmu => {
                layout.push_packed("x", j + 1);
                layout.push_packed("u", j);
            }
            PspmMethod::Cm => {
                layout.push_packed("x", j);
                layout.push_packed("u", j);
            }
            PspmMethod::Ebt => {
                layout.push_packed("X", j);
                layout.push_packed("N", j);
            }
        }
        if !extras.is_empty() {
            layout.push_interleaved(extras, j);
        }
        layout
    }

    /// Rebuild the layout after a cohort-count change
    pub(crate) fn set_cohorts(&mut self, j: usize) {
        self.j = j;
        self.layout = Self::build_layout(self.method, j, &self.extra_names);
    }

    /// Reset to the initial cohort count of the grid
    pub(crate) fn reset(&mut self) {
        let j = Self::initial_cohorts(self.method, &self.grid);
        self.set_cohorts(j);
        self.birth_flux = 0.0;
    }

    // ========================================= Queries ==========================================

    /// Number of buffer elements this species occupies
    pub(crate) fn size(&self) -> usize {
        self.layout.len()
    }

    /// Range of this species inside the global state buffer
    pub(crate) fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.size()
    }

    /// This species' slice of the global state buffer
    pub(crate) fn local<'a>(&self, state: &'a DVector<f64>) -> &'a [f64] {
        &state.as_slice()[self.range()]
    }

    /// Absolute buffer index of element `i` of a resolved variable
    #[inline]
    pub(crate) fn at(&self, slot: VarSlot, i: usize) -> usize {
        self.start + self.layout.position(slot, i)
    }

    /// Resolve a core variable, which the layout is guaranteed to carry
    pub(crate) fn slot(&self, name: &str) -> VarSlot {
        self.layout
            .slot(name)
            .unwrap_or_else(|| panic!("{} layout is missing variable '{}'", self.method, name))
    }

    // ===================================== Grid seeding =========================================

    /// Write the grid portions of a zeroed species block
    ///
    /// CM and MMU carry the breakpoints as state; EBT seeds its cohort
    /// positions from the breakpoints with slot 0 as the (π₀, N₀)
    /// deviation pair. FMU keeps the grid outside the state entirely.
    pub(crate) fn seed_grid(&self, block: &mut [f64]) {
        let breaks = self.grid.breakpoints();
        match self.method {
            PspmMethod::Fmu => {}
            PspmMethod::Mmu | PspmMethod::Cm => {
                let x = self.slot("x");
                for (i, &xi) in breaks.iter().take(x.count).enumerate() {
                    block[self.layout.position(x, i)] = xi;
                }
            }
            PspmMethod::Ebt => {
                let xs = self.slot("X");
                block[self.layout.position(xs, 0)] = 0.0; // π₀
                for i in 1..self.j {
                    block[self.layout.position(xs, i)] = breaks[i];
                }
            }
        }
    }

    /// Write initial densities and extras into a grid-seeded species block
    pub(crate) fn initialize_block(&self, block: &mut [f64]) {
        self.seed_grid(block);
        match self.method {
            PspmMethod::Fmu | PspmMethod::Mmu => {
                let u = self.slot("u");
                for (i, &xc) in self.grid.centers().iter().enumerate() {
                    block[self.layout.position(u, i)] = self.model.init_density(xc);
                    self.init_extras_at(block, i, xc);
                }
            }
            PspmMethod::Cm => {
                let x = self.slot("x");
                let u = self.slot("u");
                for i in 0..self.j {
                    let xi = block[self.layout.position(x, i)];
                    block[self.layout.position(u, i)] = self.model.init_density(xi);
                    self.init_extras_at(block, i, xi);
                }
            }
            PspmMethod::Ebt => {
                let xs = self.slot("X");
                let ns = self.slot("N");
                let breaks = self.grid.breakpoints();
                // Boundary cell starts empty: (π₀, N₀) = (0, 0)
                block[self.layout.position(xs, 0)] = 0.0;
                block[self.layout.position(ns, 0)] = 0.0;
                self.init_extras_at(block, 0, self.grid.xb());
                // Interior cohorts: counts from the density times the
                // cell width attributed to each breakpoint
                for k in 1..self.j {
                    let xk = breaks[k];
                    let w = if k + 1 < breaks.len() {
                        0.5 * (breaks[k + 1] - breaks[k - 1])
                    } else {
                        0.5 * (breaks[k] - breaks[k - 1])
                    };
                    block[self.layout.position(ns, k)] = self.model.init_density(xk) * w;
                    self.init_extras_at(block, k, xk);
                }
            }
        }
    }

    /// Initialize the extras of cohort `k` born at size `x`, time 0
    fn init_extras_at(&self, block: &mut [f64], k: usize, x: f64) {
        let m = self.model.extra_count();
        if m == 0 {
            return;
        }
        let mut values = vec![0.0; m];
        self.model.init_state_extra(x, 0.0, &mut values);
        for (e, name) in self.extra_names.iter().enumerate() {
            let slot = self.slot(name);
            block[self.layout.position(slot, k)] = values[e];
        }
    }

    // ====================================== Distribution ========================================

    /// Representative position and weight of every cohort in a local block
    pub(crate) fn distribution(&self, local: &[f64]) -> (Vec<f64>, Vec<f64>) {
        match self.method {
            PspmMethod::Fmu => {
                let u = self.slot("u");
                let weights: Vec<f64> =
                    (0..self.j).map(|i| local[self.layout.position(u, i)]).collect();
                (self.grid.centers().to_vec(), weights)
            }
            PspmMethod::Mmu => {
                let x = self.slot("x");
                let u = self.slot("u");
                let positions: Vec<f64> = (0..self.j)
                    .map(|i| {
                        0.5 * (local[self.layout.position(x, i)]
                            + local[self.layout.position(x, i + 1)])
                    })
                    .collect();
                let weights: Vec<f64> =
                    (0..self.j).map(|i| local[self.layout.position(u, i)]).collect();
                (positions, weights)
            }
            PspmMethod::Cm => {
                let x = self.slot("x");
                let u = self.slot("u");
                let positions: Vec<f64> =
                    (0..self.j).map(|i| local[self.layout.position(x, i)]).collect();
                let weights: Vec<f64> =
                    (0..self.j).map(|i| local[self.layout.position(u, i)]).collect();
                (positions, weights)
            }
            PspmMethod::Ebt => {
                let xs = self.slot("X");
                let ns = self.slot("N");
                let xb = self.grid.xb();
                let mut positions = Vec::with_capacity(self.j);
                let mut weights = Vec::with_capacity(self.j);
                for k in 0..self.j {
                    let x = local[self.layout.position(xs, k)];
                    let n = local[self.layout.position(ns, k)];
                    if k == 0 {
                        // Boundary cell: X slot holds π₀; the representative
                        // size is xb + π₀/N₀ for a populated cell
                        positions.push(if n > 0.0 { xb + x / n } else { xb });
                    } else {
                        positions.push(x);
                    }
                    weights.push(n);
                }
                (positions, weights)
            }
        }
    }

    /// Build a distribution snapshot from a species-local slice
    pub(crate) fn view_local(&self, local: &[f64]) -> SpeciesView {
        let (positions, weights) = self.distribution(local);

        let m = self.model.extra_count();
        let mut extras = Vec::with_capacity(self.j * m);
        if m > 0 {
            let slots: Vec<VarSlot> = self.extra_names.iter().map(|n| self.slot(n)).collect();
            for k in 0..self.j {
                for slot in &slots {
                    extras.push(local[self.layout.position(*slot, k)]);
                }
            }
        }

        let kind = match self.method {
            PspmMethod::Ebt => DistributionKind::CohortCounts,
            _ => DistributionKind::Density,
        };

        SpeciesView::new(self.grid.xb(), positions, weights, extras, m, kind)
    }

    /// Build a distribution snapshot from the global state buffer
    pub(crate) fn view(&self, state: &DVector<f64>) -> SpeciesView {
        self.view_local(self.local(state))
    }
}

// =================================================================================================
// Tests
// =================================================================================================
