//! Population statistics over a column.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`, like `numpy.std`).
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Absolute z-scores. A column with zero spread has no outliers, so every
/// score is 0 there.
pub fn abs_zscores(values: &[f64]) -> Vec<f64> {
    let mu = mean(values);
    let sigma = std_dev(values, mu);
    if sigma == 0.0 || !sigma.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| ((v - mu) / sigma).abs()).collect()
}
