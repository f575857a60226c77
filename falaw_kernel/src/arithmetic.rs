//! FaLaw Kernel: Arithmetic Primitives
//!
//! Small numeric helpers shared by the evaluators. All statistics are
//! population statistics (divide by n, not n - 1).

/// Absolute tolerance for row sums and other float comparisons.
pub const EPSILON: f64 = 1e-6;

/// Clamp `value` into `[lo, hi]`.
pub fn clip(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Clamp into the unit interval.
pub fn clip_unit(value: f64) -> f64 {
    clip(value, 0.0, 1.0)
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Coefficient of variation (std / mean); 0 when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(values) / m
}

/// Logistic curve `1 / (1 + e^(-steepness * (x - midpoint)))`.
pub fn sigmoid(x: f64, steepness: f64, midpoint: f64) -> f64 {
    1.0 / (1.0 + (-steepness * (x - midpoint)).exp())
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}
