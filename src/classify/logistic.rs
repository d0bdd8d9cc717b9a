//! Multinomial (softmax) logistic regression trained by batch gradient
//! descent with an L2 penalty on the weights.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::config::ClassifierConfig;

#[derive(Debug, Clone)]
pub struct SoftmaxRegression {
    /// `classes x features`
    weights: Array2<f64>,
    bias: Array1<f64>,
    /// Per-feature standardization learned from the training data.
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl SoftmaxRegression {
    /// Fit against one-hot `targets` (`rows x classes`).
    pub fn fit(
        features: ArrayView2<f64>,
        targets: ArrayView2<f64>,
        config: &ClassifierConfig,
    ) -> Self {
        let (n, d) = features.dim();
        let k = targets.ncols();
        let means = features.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
        let scales = features
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        let x = (&features - &means) / &scales;

        let mut weights = Array2::<f64>::zeros((k, d));
        let mut bias = Array1::<f64>::zeros(k);
        let inv_n = 1.0 / n as f64;

        let mut iterations = 0;
        for _ in 0..config.max_iterations {
            iterations += 1;
            let probs = softmax_rows(x.dot(&weights.t()) + &bias);
            let error = probs - &targets;

            let grad_w = error.t().dot(&x) * inv_n + &weights * config.l2_penalty;
            let grad_b = error.sum_axis(Axis(0)) * inv_n;

            let largest = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0f64, |acc, g| acc.max(g.abs()));

            weights.scaled_add(-config.learning_rate, &grad_w);
            bias.scaled_add(-config.learning_rate, &grad_b);

            if largest < config.tolerance {
                break;
            }
        }
        log::debug!(
            "softmax regression stopped after {iterations} iterations ({n} rows, {d} features)"
        );

        Self {
            weights,
            bias,
            means,
            scales,
        }
    }

    pub fn num_features(&self) -> usize {
        self.weights.ncols()
    }

    /// Class probabilities, one row per input row.
    pub fn predict_proba(&self, features: ArrayView2<f64>) -> Array2<f64> {
        let x = (&features - &self.means) / &self.scales;
        softmax_rows(x.dot(&self.weights.t()) + &self.bias)
    }
}

/// Row-wise softmax, shifted by each row's maximum for stability.
fn softmax_rows(mut logits: Array2<f64>) -> Array2<f64> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    logits
}

/// Index of the largest entry in each row.
pub fn argmax_rows(probs: &Array2<f64>) -> Vec<usize> {
    probs
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &p)| {
                    if p > best.1 { (i, p) } else { best }
                })
                .0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn softmax_rows_sum_to_one() {
        let probs = softmax_rows(array![[1.0, 2.0, 3.0], [1000.0, 1000.0, 1000.0]]);
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((probs[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn separates_two_clusters() {
        let x = array![[0.0], [0.2], [0.1], [5.0], [5.2], [4.9]];
        let y = array![
            [1.0, 0.0],
            [1.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [0.0, 1.0],
            [0.0, 1.0]
        ];
        let model = SoftmaxRegression::fit(x.view(), y.view(), &ClassifierConfig::default());
        let predicted = argmax_rows(&model.predict_proba(array![[0.05], [5.1]].view()));
        assert_eq!(predicted, vec![0, 1]);
    }

    #[test]
    fn constant_feature_does_not_break_scaling() {
        let x = array![[1.0, 0.0], [1.0, 4.0]];
        let y = array![[1.0, 0.0], [0.0, 1.0]];
        let model = SoftmaxRegression::fit(x.view(), y.view(), &ClassifierConfig::default());
        let probs = model.predict_proba(x.view());
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_eq!(model.num_features(), 2);
    }

    #[test]
    fn argmax_picks_largest_column() {
        assert_eq!(argmax_rows(&array![[0.1, 0.7, 0.2], [0.5, 0.2, 0.3]]), vec![1, 0]);
    }
}
