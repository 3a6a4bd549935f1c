//! Read-only distribution snapshot for environment computation
//!
//! The solver recomputes the model environment at every derivative
//! evaluation. The model must not see the flat state buffer (its layout is
//! method-specific), so the solver hands it a [`SpeciesView`]: a snapshot of
//! the current distribution in method-neutral terms — one representative
//! size and one weight per cohort, plus any extra per-cohort state.

// =================================================================================================
// Distribution kind
// =================================================================================================

/// How the per-cohort weights of a [`SpeciesView`] are to be integrated
///
/// - `Density`: weights are densities u(x); integrals use the trapezoidal
///   rule over the cohort positions (FMU, MMU, CM).
/// - `CohortCounts`: weights are cohort counts N; integrals are plain sums
///   over cohorts (EBT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Density,
    CohortCounts,
}

// =================================================================================================
// SpeciesView
// =================================================================================================

/// Snapshot of one species' distribution
///
/// Owned data, detached from the state buffer: the solver copies the
/// current cohort positions and weights out of the buffer before each
/// environment computation, so the model can hold the view while the
/// solver retains mutable access to its own structures.
///
/// # Example
///
/// ```rust
/// use pspm_rs::model::{DistributionKind, SpeciesView};
///
/// // A three-cohort density snapshot on x in [0, 2]
/// let view = SpeciesView::new(
///     0.0,
///     vec![0.0, 1.0, 2.0],
///     vec![1.0, 0.5, 0.25],
///     Vec::new(),
///     0,
///     DistributionKind::Density,
/// );
///
/// assert_eq!(view.cohorts(), 3);
///
/// // Total population ∫ u dx by the trapezoidal rule
/// let total = view.integrate(|_x| 1.0, 1.0);
/// assert!((total - 1.125).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SpeciesView {
    /// Boundary size of the species
    xb: f64,

    /// Representative size per cohort (cell center, cohort position, or
    /// boundary-cell mean size for EBT)
    positions: Vec<f64>,

    /// Density u(x) or cohort count N per cohort, depending on `kind`
    weights: Vec<f64>,

    /// Extra per-cohort state, flattened cohort-major:
    /// `[e_0(k=0), …, e_{m-1}(k=0), e_0(k=1), …]`
    extras: Vec<f64>,

    /// Number of extra variables per cohort
    extra_count: usize,

    /// Integration semantics of `weights`
    kind: DistributionKind,
}

impl SpeciesView {
    /// Assemble a view from raw parts
    ///
    /// # Panics
    ///
    /// Panics if `positions` and `weights` differ in length, or if
    /// `extras.len() != cohorts * extra_count`.
    pub fn new(
        xb: f64,
        positions: Vec<f64>,
        weights: Vec<f64>,
        extras: Vec<f64>,
        extra_count: usize,
        kind: DistributionKind,
    ) -> Self {
        assert_eq!(
            positions.len(),
            weights.len(),
            "Positions and weights must pair up"
        );
        assert_eq!(
            extras.len(),
            positions.len() * extra_count,
            "Extras must hold extra_count values per cohort"
        );
        Self {
            xb,
            positions,
            weights,
            extras,
            extra_count,
            kind,
        }
    }

    // ========================================= Queries ==========================================

    /// Boundary size of the species
    pub fn xb(&self) -> f64 {
        self.xb
    }

    /// Number of cohorts in the snapshot
    pub fn cohorts(&self) -> usize {
        self.positions.len()
    }

    /// Representative size of cohort `k`
    pub fn position(&self, k: usize) -> f64 {
        self.positions[k]
    }

    /// Weight of cohort `k` — density u(x_k) or count N_k per [`Self::kind`]
    pub fn weight(&self, k: usize) -> f64 {
        self.weights[k]
    }

    /// All cohort positions
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// All cohort weights
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Extra state of cohort `k`
    pub fn extras(&self, k: usize) -> &[f64] {
        let m = self.extra_count;
        &self.extras[k * m..(k + 1) * m]
    }

    /// Number of extra variables per cohort
    pub fn extra_count(&self) -> usize {
        self.extra_count
    }

    /// Integration semantics of the weights
    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    // ======================================== Integration ========================================

    /// Integrate `f(x) · u(x)^p` over the current distribution
    ///
    /// For `Density` weights this is the trapezoidal rule over the cohort
    /// positions; for `CohortCounts` it is `Σ_k f(x_k) · N_k^p`. Only
    /// `p = 1` is needed by the solver core (birth flux); the power is kept
    /// as a parameter for model-side functionals such as biomass (`f = x`)
    /// or crowding measures.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, p: f64) -> f64 {
        match self.kind {
            DistributionKind::Density => {
                crate::solver::quadrature::trapezoid(&self.positions, &self.weights, f, p)
            }
            DistributionKind::CohortCounts => self
                .positions
                .iter()
                .zip(self.weights.iter())
                .map(|(&x, &n)| f(x) * pow_weight(n, p))
                .sum(),
        }
    }
}

#[inline]
fn pow_weight(u: f64, p: f64) -> f64 {
    if p == 1.0 {
        u
    } else {
        u.powf(p)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
