//! Fixed-step reference integrators
//!
//! Forward Euler and classical RK4 over the same derivative-closure shape
//! as [`CashKarp45`](crate::ode::CashKarp45). These have no error control
//! and are not used by the PSPM engine itself; they serve as reference
//! integrators in validation tests and for quick method comparisons.

use nalgebra::DVector;

/// One forward Euler step: `y ← y + h · f(x, y)`
///
/// First-order accurate, one derivative evaluation.
pub fn euler_step<F>(x: f64, h: f64, y: &mut DVector<f64>, derivs: &mut F)
where
    F: FnMut(f64, &DVector<f64>, &mut DVector<f64>),
{
    let mut k = DVector::zeros(y.len());
    derivs(x, y, &mut k);
    for i in 0..y.len() {
        y[i] += h * k[i];
    }
}

/// One classical fourth-order Runge–Kutta step
///
/// ```text
/// k1 = f(x, y)
/// k2 = f(x + h/2, y + h/2·k1)
/// k3 = f(x + h/2, y + h/2·k2)
/// k4 = f(x + h,   y + h·k3)
/// y ← y + h/6 · (k1 + 2·k2 + 2·k3 + k4)
/// ```
pub fn rk4_step<F>(x: f64, h: f64, y: &mut DVector<f64>, derivs: &mut F)
where
    F: FnMut(f64, &DVector<f64>, &mut DVector<f64>),
{
    let n = y.len();
    let mut k1 = DVector::zeros(n);
    let mut k2 = DVector::zeros(n);
    let mut k3 = DVector::zeros(n);
    let mut k4 = DVector::zeros(n);
    let mut yt = DVector::zeros(n);

    let h2 = 0.5 * h;
    let xh = x + h2;

    derivs(x, y, &mut k1);
    for i in 0..n {
        yt[i] = y[i] + h2 * k1[i];
    }
    derivs(xh, &yt, &mut k2);
    for i in 0..n {
        yt[i] = y[i] + h2 * k2[i];
    }
    derivs(xh, &yt, &mut k3);
    for i in 0..n {
        yt[i] = y[i] + h * k3[i];
    }
    derivs(x + h, &yt, &mut k4);

    for i in 0..n {
        y[i] += h / 6.0 * (k1[i] + 2.0 * (k2[i] + k3[i]) + k4[i]);
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decay(_t: f64, y: &DVector<f64>, dydt: &mut DVector<f64>) {
        dydt[0] = -y[0];
    }

    #[test]
    fn test_euler_is_first_order() {
        // One unit of time with n steps; error should halve with n doubled
        let mut errors = Vec::new();
        for &n in &[100usize, 200, 400] {
            let h = 1.0 / n as f64;
            let mut y = DVector::from_vec(vec![1.0]);
            let mut t = 0.0;
            for _ in 0..n {
                euler_step(t, h, &mut y, &mut decay);
                t += h;
            }
            errors.push((y[0] - (-1.0f64).exp()).abs());
        }

        for w in errors.windows(2) {
            let ratio = w[0] / w[1];
            assert!(ratio > 1.8 && ratio < 2.2, "ratio {} not first-order", ratio);
        }
    }

    #[test]
    fn test_rk4_is_fourth_order() {
        let mut errors = Vec::new();
        for &n in &[10usize, 20, 40] {
            let h = 1.0 / n as f64;
            let mut y = DVector::from_vec(vec![1.0]);
            let mut t = 0.0;
            for _ in 0..n {
                rk4_step(t, h, &mut y, &mut decay);
                t += h;
            }
            errors.push((y[0] - (-1.0f64).exp()).abs());
        }

        for w in errors.windows(2) {
            let ratio = w[0] / w[1];
            assert!(
                ratio > 12.0 && ratio < 20.0,
                "ratio {} not fourth-order",
                ratio
            );
        }
    }

    #[test]
    fn test_rk4_exact_for_constant_rate() {
        // dy/dt = c integrates exactly
        let mut y = DVector::from_vec(vec![0.0]);
        rk4_step(0.0, 2.0, &mut y, &mut |_t, _y, dydt| {
            dydt[0] = 3.0;
        });
        assert!((y[0] - 6.0).abs() < 1e-12);
    }
}
