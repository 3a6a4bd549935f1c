//! Per-species grid description
//!
//! A [`CohortGrid`] fixes the geometry of the size axis for one species:
//! the boundary size `xb` where newborns enter, the upper size `xm`, the
//! breakpoints in between, and — for cell-based discretizations — the cell
//! centers and widths derived from the breakpoints.
//!
//! The grid describes the *initial* geometry. Cohort-based methods (CM, EBT)
//! move their cohorts and insert/remove them as the simulation runs; the
//! grid then only retains the meaning of `xb` and `xm`.

// =================================================================================================
// CohortGrid
// =================================================================================================

/// Grid geometry for one species
///
/// # Fields derived at construction
///
/// For `n` breakpoints `x[0] = xb < x[1] < … < x[n-1] = xm` the grid
/// precomputes, for the cell-based methods:
///
/// - cell centers `X[i] = (x[i] + x[i+1]) / 2`
/// - cell widths `h[i] = x[i+1] - x[i] > 0`
///
/// # Example
///
/// ```rust
/// use pspm_rs::model::CohortGrid;
///
/// let grid = CohortGrid::uniform(100, 0.0, 10.0).unwrap();
/// assert_eq!(grid.intervals(), 100);
/// assert_eq!(grid.points(), 101);
/// assert_eq!(grid.xb(), 0.0);
/// assert_eq!(grid.xm(), 10.0);
/// assert!((grid.widths()[0] - 0.1).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct CohortGrid {
    /// Boundary size where newborns enter
    xb: f64,

    /// Upper end of the size axis
    xm: f64,

    /// Breakpoints, strictly increasing, `breaks[0] = xb`, last = `xm`
    breaks: Vec<f64>,

    /// Cell centers `X[i] = (x[i] + x[i+1]) / 2` — precomputed
    centers: Vec<f64>,

    /// Cell widths `h[i] = x[i+1] - x[i]` — precomputed
    widths: Vec<f64>,
}

impl CohortGrid {
    /// Create a grid from explicit breakpoints
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than 2 breakpoints are given, if any
    /// breakpoint is non-finite, or if the sequence is not strictly
    /// increasing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pspm_rs::model::CohortGrid;
    ///
    /// let grid = CohortGrid::from_breakpoints(vec![0.0, 1.0, 2.5, 5.0]).unwrap();
    /// assert_eq!(grid.intervals(), 3);
    ///
    /// let bad = CohortGrid::from_breakpoints(vec![0.0, 2.0, 1.0]);
    /// assert!(bad.is_err());
    /// ```
    pub fn from_breakpoints(breaks: Vec<f64>) -> Result<Self, String> {
        if breaks.len() < 2 {
            return Err(format!(
                "A grid needs at least 2 breakpoints, got {}",
                breaks.len()
            ));
        }
        for (i, &x) in breaks.iter().enumerate() {
            if !x.is_finite() {
                return Err(format!("Breakpoint {} is not finite", i));
            }
        }
        for i in 1..breaks.len() {
            if breaks[i] <= breaks[i - 1] {
                return Err(format!(
                    "Breakpoints must be strictly increasing, but x[{}] = {} <= x[{}] = {}",
                    i,
                    breaks[i],
                    i - 1,
                    breaks[i - 1]
                ));
            }
        }

        let centers: Vec<f64> = breaks
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect();
        let widths: Vec<f64> = breaks.windows(2).map(|w| w[1] - w[0]).collect();

        Ok(Self {
            xb: breaks[0],
            xm: *breaks.last().unwrap(),
            breaks,
            centers,
            widths,
        })
    }

    /// Create a uniformly spaced grid with `intervals` cells on `[xb, xm]`
    ///
    /// Produces `intervals + 1` breakpoints.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `intervals` is zero or `xm <= xb`.
    pub fn uniform(intervals: usize, xb: f64, xm: f64) -> Result<Self, String> {
        if intervals == 0 {
            return Err("A grid needs at least 1 interval".to_string());
        }
        if !(xm > xb) {
            return Err(format!("Upper size {} must exceed boundary size {}", xm, xb));
        }

        let dx = (xm - xb) / (intervals as f64);
        let mut breaks: Vec<f64> = (0..=intervals).map(|i| xb + (i as f64) * dx).collect();
        // Land the last breakpoint on xm exactly, not on xb + n*dx.
        *breaks.last_mut().unwrap() = xm;
        Self::from_breakpoints(breaks)
    }

    /// Create a logarithmically spaced grid with `intervals` cells on `[xb, xm]`
    ///
    /// Breakpoints are uniform in log size, concentrating resolution near
    /// the boundary. Requires `0 < xb < xm`.
    pub fn logarithmic(intervals: usize, xb: f64, xm: f64) -> Result<Self, String> {
        if intervals == 0 {
            return Err("A grid needs at least 1 interval".to_string());
        }
        if !(xb > 0.0) {
            return Err(format!(
                "Logarithmic spacing needs a positive boundary size, got {}",
                xb
            ));
        }
        if !(xm > xb) {
            return Err(format!("Upper size {} must exceed boundary size {}", xm, xb));
        }

        let lb = xb.ln();
        let lm = xm.ln();
        let dl = (lm - lb) / (intervals as f64);
        let mut breaks: Vec<f64> = (0..=intervals)
            .map(|i| (lb + (i as f64) * dl).exp())
            .collect();
        breaks[0] = xb;
        *breaks.last_mut().unwrap() = xm;
        Self::from_breakpoints(breaks)
    }

    // ========================================= Queries ==========================================

    /// Boundary size `xb` (entry point of newborns)
    pub fn xb(&self) -> f64 {
        self.xb
    }

    /// Upper end `xm` of the size axis
    pub fn xm(&self) -> f64 {
        self.xm
    }

    /// Breakpoints `x[0..n]`
    pub fn breakpoints(&self) -> &[f64] {
        &self.breaks
    }

    /// Number of breakpoints
    pub fn points(&self) -> usize {
        self.breaks.len()
    }

    /// Number of cells (breakpoints minus one)
    pub fn intervals(&self) -> usize {
        self.breaks.len() - 1
    }

    /// Cell centers `X[i] = (x[i] + x[i+1]) / 2`
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Cell widths `h[i] = x[i+1] - x[i]`
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_grid() {
        let grid = CohortGrid::uniform(10, 0.0, 1.0).unwrap();

        assert_eq!(grid.points(), 11);
        assert_eq!(grid.intervals(), 10);
        assert_eq!(grid.xb(), 0.0);
        assert_eq!(grid.xm(), 1.0);

        for (i, &w) in grid.widths().iter().enumerate() {
            assert!((w - 0.1).abs() < 1e-12, "width {} is {}", i, w);
        }
        assert!((grid.centers()[0] - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_logarithmic_grid() {
        let grid = CohortGrid::logarithmic(10, 0.1, 100.0).unwrap();

        assert_eq!(grid.points(), 11);
        assert_eq!(grid.breakpoints()[0], 0.1);
        assert_eq!(*grid.breakpoints().last().unwrap(), 100.0);

        // Widths grow monotonically under log spacing
        let w = grid.widths();
        for i in 1..w.len() {
            assert!(w[i] > w[i - 1]);
        }
    }

    #[test]
    fn test_explicit_breakpoints() {
        let grid = CohortGrid::from_breakpoints(vec![1.0, 2.0, 4.0, 8.0]).unwrap();

        assert_eq!(grid.intervals(), 3);
        assert_eq!(grid.centers(), &[1.5, 3.0, 6.0]);
        assert_eq!(grid.widths(), &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_rejects_short_grid() {
        let result = CohortGrid::from_breakpoints(vec![1.0]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("at least 2 breakpoints"));
    }

    #[test]
    fn test_rejects_non_monotone() {
        let result = CohortGrid::from_breakpoints(vec![0.0, 2.0, 2.0, 3.0]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("strictly increasing"));
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = CohortGrid::from_breakpoints(vec![0.0, f64::NAN, 2.0]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not finite"));
    }

    #[test]
    fn test_rejects_empty_uniform() {
        assert!(CohortGrid::uniform(0, 0.0, 1.0).is_err());
        assert!(CohortGrid::uniform(10, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_log_grid_needs_positive_boundary() {
        let result = CohortGrid::logarithmic(10, 0.0, 1.0);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("positive boundary"));
    }
}
