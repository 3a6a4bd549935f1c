//! Trapezoidal quadrature over the current grid
//!
//! The solver core needs exactly one integral: the birth flux
//! B = ∫ b(x,t)·u(x) dx over the current distribution. The trapezoidal
//! rule over the cohort positions (or cell centers) is taken as primitive;
//! a scalar power `p` on the density is kept for model-side functionals
//! (biomass, crowding), with `p = 1` the only value the core itself uses.

/// Trapezoidal integral of `f(x) · u(x)^p` over the points `(xs, us)`
///
/// `xs` must be non-decreasing; zero-width intervals contribute nothing.
/// Returns 0 for fewer than two points.
///
/// # Example
///
/// ```rust
/// use pspm_rs::solver::quadrature::trapezoid;
///
/// let xs = [0.0, 1.0, 2.0];
/// let us = [1.0, 1.0, 1.0];
/// // ∫ x · u dx over [0, 2] = 2
/// let m1 = trapezoid(&xs, &us, |x| x, 1.0);
/// assert!((m1 - 2.0).abs() < 1e-12);
/// ```
pub fn trapezoid<F: Fn(f64) -> f64>(xs: &[f64], us: &[f64], f: F, p: f64) -> f64 {
    debug_assert_eq!(xs.len(), us.len(), "positions and densities must pair up");
    if xs.len() < 2 {
        return 0.0;
    }

    let weight = |i: usize| -> f64 {
        let u = if p == 1.0 { us[i] } else { us[i].powf(p) };
        f(xs[i]) * u
    };

    let mut sum = 0.0;
    let mut prev = weight(0);
    for i in 1..xs.len() {
        let w = weight(i);
        sum += 0.5 * (prev + w) * (xs[i] - xs[i - 1]);
        prev = w;
    }
    sum
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_density() {
        let xs: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let us = vec![2.0; 11];
        // ∫ 1 · u dx = 2 · 10
        assert!((trapezoid(&xs, &us, |_| 1.0, 1.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_weight_exact() {
        // Trapezoid is exact for piecewise-linear integrands
        let xs = [0.0, 0.5, 2.0];
        let us = [1.0, 1.0, 1.0];
        assert!((trapezoid(&xs, &us, |x| x, 1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_density_power() {
        let xs = [0.0, 1.0];
        let us = [2.0, 2.0];
        // ∫ u² dx = 4
        assert!((trapezoid(&xs, &us, |_| 1.0, 2.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_grids() {
        assert_eq!(trapezoid(&[], &[], |_| 1.0, 1.0), 0.0);
        assert_eq!(trapezoid(&[1.0], &[1.0], |_| 1.0, 1.0), 0.0);
        // A zero-width interval contributes nothing
        let v = trapezoid(&[0.0, 0.0, 1.0], &[1.0, 1.0, 1.0], |_| 1.0, 1.0);
        assert!((v - 1.0).abs() < 1e-12);
    }
}
