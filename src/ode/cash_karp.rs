//! Cash–Karp 5(4) adaptive-step integrator
//!
//! # Mathematical Background
//!
//! The Cash–Karp pair is a six-stage explicit Runge–Kutta method producing
//! a fifth-order solution together with an embedded fourth-order solution.
//! The difference between the two is a per-component estimate of the local
//! truncation error, used to accept or reject each trial step and to pick
//! the next step size:
//!
//! ```text
//! err_max = max_i | yerr_i / yscal_i | / eps
//! yscal_i = |y_i| + |h · dy_i| + 1e-3
//! ```
//!
//! A step is accepted when `err_max <= 1`. Rejected steps shrink by
//! `SAFETY · err_max^PSHRNK` (never more than a factor of 10); accepted
//! steps grow by `SAFETY · err_max^PGROW` (never more than a factor of 5).
//!
//! # Characteristics
//!
//! - **Order**: fifth-order solution, fourth-order error estimate
//! - **Cost**: 6 function evaluations per trial step
//! - **Step control**: per-component scaled error, mixed
//!   absolute/relative through the `yscal` formula
//! - **Memory**: per-instance scratch (`k1..k5`, `yt`, `ytemp`, `yerr`,
//!   `yscal`, `dydx`), resized lazily when the system size changes —
//!   cohort insertion and removal between steps changes the buffer length
//!   without reallocating the stepper

use nalgebra::DVector;

/// Safety factor applied to every step-size change
const SAFETY: f64 = 0.9;
/// Growth exponent for accepted steps
const PGROW: f64 = -0.2;
/// Shrink exponent for rejected steps
const PSHRNK: f64 = -0.25;
/// Below this scaled error the next step grows by the full factor of 5
const ERRCON: f64 = 1.89e-4;

// =================================================================================================
// Stats
// =================================================================================================

/// Integration statistics for diagnostics
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Total number of derivative evaluations
    pub ode_evals: u64,
    /// Number of accepted steps
    pub accepted_steps: u64,
    /// Number of rejected trial steps
    pub rejected_steps: u64,
}

// =================================================================================================
// CashKarp45
// =================================================================================================

/// Cash–Karp 5(4) integrator with adaptive step control
///
/// The stepper owns the current simulation time and the trial step size;
/// the state buffer stays with the caller and is advanced in place. One
/// stepper drives one system — the scratch vectors must never be shared
/// across instances.
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use pspm_rs::ode::CashKarp45;
///
/// // Harmonic oscillator: y1' = y2, y2' = -y1
/// let mut stepper = CashKarp45::new(0.0, 1e-8, 0.1);
/// let mut y = DVector::from_vec(vec![1.0, 0.0]);
///
/// stepper.step_to(std::f64::consts::TAU, &mut y, &mut |_t, y, dydt| {
///     dydt[0] = y[1];
///     dydt[1] = -y[0];
/// });
///
/// assert!((y[0] - 1.0).abs() < 1e-5);
/// assert!(y[1].abs() < 1e-5);
/// ```
#[derive(Debug, Clone)]
pub struct CashKarp45 {
    /// Current simulation time
    t: f64,
    /// Trial step size for the next step
    h: f64,
    /// Accuracy checked at each step
    eps: f64,
    /// Size the scratch vectors are currently allocated for
    sys_size: usize,

    /// Integration statistics
    pub stats: Stats,

    // Per-instance scratch, resized lazily
    yscal: DVector<f64>,
    dydx: DVector<f64>,
    k1: DVector<f64>,
    k2: DVector<f64>,
    k3: DVector<f64>,
    k4: DVector<f64>,
    k5: DVector<f64>,
    yt: DVector<f64>,
    ytemp: DVector<f64>,
    yerr: DVector<f64>,
}

impl CashKarp45 {
    /// Create a stepper
    ///
    /// # Arguments
    ///
    /// * `t_start` — initial simulation time
    /// * `accuracy` — desired scaled-error tolerance `eps`
    /// * `h1` — trial size of the first step (must be positive)
    ///
    /// # Panics
    ///
    /// Panics if `accuracy` or `h1` is not positive.
    pub fn new(t_start: f64, accuracy: f64, h1: f64) -> Self {
        assert!(accuracy > 0.0, "Accuracy must be positive, got {}", accuracy);
        assert!(h1 > 0.0, "Initial step size must be positive, got {}", h1);

        Self {
            t: t_start,
            h: h1,
            eps: accuracy,
            sys_size: 0,
            stats: Stats::default(),
            yscal: DVector::zeros(0),
            dydx: DVector::zeros(0),
            k1: DVector::zeros(0),
            k2: DVector::zeros(0),
            k3: DVector::zeros(0),
            k4: DVector::zeros(0),
            k5: DVector::zeros(0),
            yt: DVector::zeros(0),
            ytemp: DVector::zeros(0),
            yerr: DVector::zeros(0),
        }
    }

    // ========================================= Queries ==========================================

    /// Current simulation time
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Current trial step size
    pub fn h(&self) -> f64 {
        self.h
    }

    /// System size the scratch is allocated for
    pub fn size(&self) -> usize {
        self.sys_size
    }

    /// Resize the scratch vectors for a new system size
    fn resize(&mut self, n: usize) {
        self.sys_size = n;
        self.yscal = DVector::zeros(n);
        self.dydx = DVector::zeros(n);
        self.k1 = DVector::zeros(n);
        self.k2 = DVector::zeros(n);
        self.k3 = DVector::zeros(n);
        self.k4 = DVector::zeros(n);
        self.k5 = DVector::zeros(n);
        self.yt = DVector::zeros(n);
        self.ytemp = DVector::zeros(n);
        self.yerr = DVector::zeros(n);
    }

    // ========================================= Stepping =========================================

    /// Take one adaptive step from the current time
    ///
    /// Evaluates the derivative at `(t, y)`, forms the error scale
    /// `yscal_i = |y_i| + |dy_i · h| + 1e-3`, then retries the Cash–Karp
    /// step until the scaled error passes. On return `y` holds the new
    /// state and [`time`](Self::time) the new time; the trial step size
    /// has been updated for the next call. Returns the new time.
    pub fn step<F>(&mut self, y: &mut DVector<f64>, derivs: &mut F) -> f64
    where
        F: FnMut(f64, &DVector<f64>, &mut DVector<f64>),
    {
        if y.len() != self.sys_size {
            self.resize(y.len());
        }

        derivs(self.t, y, &mut self.dydx);
        self.stats.ode_evals += 1;

        for i in 0..y.len() {
            self.yscal[i] = y[i].abs() + (self.dydx[i] * self.h).abs() + 1e-3;
        }

        let (_hdid, hnext) = self.rk_step(y, derivs);
        self.h = hnext;
        self.t
    }

    /// Advance to `t_target` with adaptive steps
    ///
    /// The last sub-step is clamped so the stepper lands on `t_target`
    /// exactly; the pre-clamp trial step is restored afterwards so a
    /// sequence of short `step_to` calls keeps the adapted step size.
    pub fn step_to<F>(&mut self, t_target: f64, y: &mut DVector<f64>, derivs: &mut F)
    where
        F: FnMut(f64, &DVector<f64>, &mut DVector<f64>),
    {
        while self.t < t_target {
            let h_keep = self.h;
            let clamped = self.t + self.h > t_target;
            if clamped {
                self.h = t_target - self.t;
            }

            self.step(y, derivs);

            if clamped && t_target - self.t < 1e-12 * t_target.abs().max(1.0) {
                // Landed (up to roundoff): pin the time and restore the
                // adapted step for the next call.
                self.t = t_target;
                self.h = h_keep;
            }
        }
    }

    /// One error-controlled Cash–Karp step
    ///
    /// Retries with shrinking `h` until the per-component scaled error is
    /// within `eps`, then advances `t` and `y` and returns
    /// `(h_did, h_next)`.
    fn rk_step<F>(&mut self, y: &mut DVector<f64>, derivs: &mut F) -> (f64, f64)
    where
        F: FnMut(f64, &DVector<f64>, &mut DVector<f64>),
    {
        let n = y.len();
        let mut h = self.h;
        let errmax;

        loop {
            self.rk_try(y, self.t, h, derivs);

            let mut e: f64 = 0.0;
            for i in 0..n {
                e = e.max((self.yerr[i] / self.yscal[i]).abs());
            }
            let e = e / self.eps;

            if e <= 1.0 {
                errmax = e;
                break;
            }

            let htemp = SAFETY * h * e.powf(PSHRNK);
            let hnew = if h >= 0.0 {
                htemp.max(0.1 * h) // no more than a factor of 10 reduction
            } else {
                htemp.min(0.1 * h)
            };

            if self.t + hnew == self.t {
                eprintln!(
                    "pspm-rs: step size underflow at t = {}, accepting clamped step",
                    self.t
                );
                errmax = e;
                break;
            }

            h = hnew;
            self.stats.rejected_steps += 1;
        }

        let hnext = if errmax > ERRCON {
            SAFETY * h * errmax.powf(PGROW)
        } else {
            5.0 * h // no more than a factor of 5 increase
        };

        self.t += h;
        y.copy_from(&self.ytemp);
        self.stats.accepted_steps += 1;
        (h, hnext)
    }

    /// One raw Cash–Karp trial step of size `h` from `(x, y)`
    ///
    /// Requires `self.dydx` to hold the derivative at `(x, y)`. Writes the
    /// fifth-order solution into `self.ytemp` and the difference to the
    /// embedded fourth-order solution into `self.yerr`.
    fn rk_try<F>(&mut self, y: &DVector<f64>, x: f64, h: f64, derivs: &mut F)
    where
        F: FnMut(f64, &DVector<f64>, &mut DVector<f64>),
    {
        let n = y.len();

        // Stage 2
        for i in 0..n {
            self.yt[i] = y[i] + h * B21 * self.dydx[i];
        }
        derivs(x + A2 * h, &self.yt, &mut self.k1);

        // Stage 3
        for i in 0..n {
            self.yt[i] = y[i] + h * (B31 * self.dydx[i] + B32 * self.k1[i]);
        }
        derivs(x + A3 * h, &self.yt, &mut self.k2);

        // Stage 4
        for i in 0..n {
            self.yt[i] = y[i] + h * (B41 * self.dydx[i] + B42 * self.k1[i] + B43 * self.k2[i]);
        }
        derivs(x + A4 * h, &self.yt, &mut self.k3);

        // Stage 5
        for i in 0..n {
            self.yt[i] = y[i]
                + h * (B51 * self.dydx[i]
                    + B52 * self.k1[i]
                    + B53 * self.k2[i]
                    + B54 * self.k3[i]);
        }
        derivs(x + A5 * h, &self.yt, &mut self.k4);

        // Stage 6
        for i in 0..n {
            self.yt[i] = y[i]
                + h * (B61 * self.dydx[i]
                    + B62 * self.k1[i]
                    + B63 * self.k2[i]
                    + B64 * self.k3[i]
                    + B65 * self.k4[i]);
        }
        derivs(x + A6 * h, &self.yt, &mut self.k5);

        // Fifth-order solution with proper weights
        for i in 0..n {
            self.ytemp[i] = y[i]
                + h * (C1 * self.dydx[i] + C3 * self.k2[i] + C4 * self.k3[i] + C6 * self.k5[i]);
        }

        // Error as the difference between the fifth- and fourth-order solutions
        for i in 0..n {
            self.yerr[i] = h
                * (DC1 * self.dydx[i]
                    + DC3 * self.k2[i]
                    + DC4 * self.k3[i]
                    + DC5 * self.k4[i]
                    + DC6 * self.k5[i]);
        }

        self.stats.ode_evals += 5;
    }
}

// Cash–Karp tableau: stage abscissae
const A2: f64 = 0.2;
const A3: f64 = 0.3;
const A4: f64 = 0.6;
const A5: f64 = 1.0;
const A6: f64 = 0.875;

// Stage coupling coefficients
const B21: f64 = 0.2;
const B31: f64 = 3.0 / 40.0;
const B32: f64 = 9.0 / 40.0;
const B41: f64 = 0.3;
const B42: f64 = -0.9;
const B43: f64 = 1.2;
const B51: f64 = -11.0 / 54.0;
const B52: f64 = 2.5;
const B53: f64 = -70.0 / 27.0;
const B54: f64 = 35.0 / 27.0;
const B61: f64 = 1631.0 / 55296.0;
const B62: f64 = 175.0 / 512.0;
const B63: f64 = 575.0 / 13824.0;
const B64: f64 = 44275.0 / 110592.0;
const B65: f64 = 253.0 / 4096.0;

// Fifth-order solution weights
const C1: f64 = 37.0 / 378.0;
const C3: f64 = 250.0 / 621.0;
const C4: f64 = 125.0 / 594.0;
const C6: f64 = 512.0 / 1771.0;

// Difference to the embedded fourth-order weights
const DC1: f64 = C1 - 2825.0 / 27648.0;
const DC3: f64 = C3 - 18575.0 / 48384.0;
const DC4: f64 = C4 - 13525.0 / 55296.0;
const DC5: f64 = -277.0 / 14336.0;
const DC6: f64 = C6 - 0.25;

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_decay() {
        // y' = -y, y(0) = 1  →  y(1) = 1/e
        let mut stepper = CashKarp45::new(0.0, 1e-8, 0.1);
        let mut y = DVector::from_vec(vec![1.0]);

        stepper.step_to(1.0, &mut y, &mut |_t, y, dydt| {
            dydt[0] = -y[0];
        });

        let exact = (-1.0f64).exp();
        assert!(
            (y[0] - exact).abs() < 1e-6,
            "y(1) = {}, expected {}",
            y[0],
            exact
        );
        assert_eq!(stepper.time(), 1.0);
    }

    #[test]
    fn test_harmonic_oscillator_round_trip() {
        // y1' = y2, y2' = -y1, from (1, 0) over one period
        let mut stepper = CashKarp45::new(0.0, 1e-8, 0.1);
        let mut y = DVector::from_vec(vec![1.0, 0.0]);
        let period = 2.0 * std::f64::consts::PI;

        stepper.step_to(period, &mut y, &mut |_t, y, dydt| {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        });

        assert!((y[0] - 1.0).abs() < 1e-5, "y1(2π) = {}", y[0]);
        assert!(y[1].abs() < 1e-5, "y2(2π) = {}", y[1]);
        assert!(stepper.stats.accepted_steps > 0);
    }

    #[test]
    fn test_growth_capped_at_factor_five() {
        // y' = 0 gives zero error, so every step grows by exactly 5x
        let h0 = 0.01;
        let mut stepper = CashKarp45::new(0.0, 1e-6, h0);
        let mut y = DVector::from_vec(vec![1.0]);

        stepper.step(&mut y, &mut |_t, _y, dydt| {
            dydt[0] = 0.0;
        });

        assert!((stepper.h() - 5.0 * h0).abs() < 1e-15);
    }

    #[test]
    fn test_scaled_error_within_tolerance_after_step() {
        let eps = 1e-6;
        let mut stepper = CashKarp45::new(0.0, eps, 0.1);
        let mut y = DVector::from_vec(vec![1.0, 0.0]);

        stepper.step(&mut y, &mut |_t, y, dydt| {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        });

        let mut errmax: f64 = 0.0;
        for i in 0..2 {
            errmax = errmax.max((stepper.yerr[i] / stepper.yscal[i]).abs());
        }
        assert!(
            errmax <= eps,
            "scaled error {} exceeds tolerance {}",
            errmax,
            eps
        );
    }

    #[test]
    fn test_step_to_lands_exactly() {
        let mut stepper = CashKarp45::new(0.0, 1e-6, 0.3);
        let mut y = DVector::from_vec(vec![0.0]);

        // y' = 1 over an interval not representable as a sum of trial steps
        stepper.step_to(0.05, &mut y, &mut |_t, _y, dydt| {
            dydt[0] = 1.0;
        });
        assert_eq!(stepper.time(), 0.05);
        assert!((y[0] - 0.05).abs() < 1e-12);

        // The adapted step survives the clamp
        assert!(stepper.h() >= 0.3);
    }

    #[test]
    fn test_tableau_embedded_fourth_order() {
        // For y' = t the stage derivatives are k_i = a_i * h (with t0 = 0,
        // h = 1), so the embedded fourth-order solution can be formed
        // directly from the published c* weights and compared against
        // ytemp - yerr.
        let mut stepper = CashKarp45::new(0.0, 1e-6, 1.0);
        stepper.resize(1);
        let y = DVector::from_vec(vec![0.0]);
        stepper.dydx[0] = 0.0; // f(0, y) = 0

        stepper.rk_try(&y, 0.0, 1.0, &mut |t, _y, dydt| {
            dydt[0] = t;
        });

        let cstar = [
            2825.0 / 27648.0,
            0.0,
            18575.0 / 48384.0,
            13525.0 / 55296.0,
            277.0 / 14336.0,
            0.25,
        ];
        let stages = [0.0, A2, A3, A4, A5, A6];
        let y4_expected: f64 = cstar.iter().zip(stages.iter()).map(|(c, k)| c * k).sum();

        let y4 = stepper.ytemp[0] - stepper.yerr[0];
        assert!(
            (y4 - y4_expected).abs() < 1e-14,
            "embedded solution {} vs expected {}",
            y4,
            y4_expected
        );

        // Both solutions integrate t exactly; the fifth-order result is 1/2
        assert!((stepper.ytemp[0] - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_resize_follows_system_size() {
        let mut stepper = CashKarp45::new(0.0, 1e-6, 0.1);
        let mut y = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        stepper.step(&mut y, &mut |_t, _y, dydt| {
            dydt.fill(0.0);
        });
        assert_eq!(stepper.size(), 3);

        // Shrinking the system (cohort removal) re-sizes the scratch
        let mut y = DVector::from_vec(vec![1.0]);
        stepper.step(&mut y, &mut |_t, _y, dydt| {
            dydt.fill(0.0);
        });
        assert_eq!(stepper.size(), 1);
    }
}
