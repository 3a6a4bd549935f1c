//! Small numeric helpers shared by the integration suites

/// Relative error |a - b| / |b|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    (actual - expected).abs() / expected.abs()
}

/// Density-weighted mean position Σ x·u / Σ u
pub fn mean_position(positions: &[f64], weights: &[f64]) -> f64 {
    let m0: f64 = weights.iter().sum();
    let m1: f64 = positions
        .iter()
        .zip(weights.iter())
        .map(|(&x, &u)| x * u)
        .sum();
    m1 / m0
}
