//! Utility functions shared by the models and classifiers

use crate::core::{ClassifierError, Label, Matrix, Result, NEGATIVE, POSITIVE};

/// Feature scaling utilities
pub mod scaling {
    use super::*;
    use serde::{Deserialize, Serialize};

    /// Feature scaling methods
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub enum ScalingMethod {
        /// Min-Max scaling to [min_val, max_val] range
        MinMax { min_val: f64, max_val: f64 },
        /// Standard (Z-score) normalization: (x - mean) / std
        StandardScore,
        /// Unit scaling: x / max(|x|)
        UnitScale,
    }

    impl Default for ScalingMethod {
        fn default() -> Self {
            Self::StandardScore
        }
    }

    /// Statistics for a single feature column
    #[derive(Debug, Clone, PartialEq)]
    pub struct FeatureStats {
        pub min: f64,
        pub max: f64,
        pub mean: f64,
        pub std: f64,
    }

    /// Per-column scaling parameters learned from training data
    #[derive(Debug, Clone)]
    pub struct ScalingParams {
        pub method: ScalingMethod,
        pub feature_stats: Vec<FeatureStats>,
    }

    impl ScalingParams {
        /// Compute scaling parameters from training data
        pub fn fit(x: &Matrix, method: ScalingMethod) -> Self {
            let n = x.n_rows();
            let feature_stats = (0..x.n_cols())
                .map(|j| {
                    let column = x.rows().map(|row| row[j]);
                    let (min, max, sum) = column.fold(
                        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
                        |(lo, hi, s), v| (lo.min(v), hi.max(v), s + v),
                    );
                    let mean = if n > 0 { sum / n as f64 } else { 0.0 };
                    let variance = if n > 1 {
                        x.rows().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / (n - 1) as f64
                    } else {
                        0.0
                    };
                    FeatureStats {
                        min,
                        max,
                        mean,
                        std: variance.sqrt(),
                    }
                })
                .collect();

            Self {
                method,
                feature_stats,
            }
        }

        /// Transform a matrix using fitted parameters
        pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
            if x.n_cols() != self.feature_stats.len() {
                return Err(ClassifierError::DimensionMismatch {
                    expected: self.feature_stats.len(),
                    actual: x.n_cols(),
                });
            }
            let mut out = x.clone();
            for i in 0..out.n_rows() {
                for (value, stats) in out.row_mut(i).iter_mut().zip(&self.feature_stats) {
                    *value = self.scale_value(*value, stats);
                }
            }
            Ok(out)
        }

        fn scale_value(&self, value: f64, stats: &FeatureStats) -> f64 {
            match self.method {
                ScalingMethod::MinMax { min_val, max_val } => {
                    if (stats.max - stats.min).abs() < 1e-12 {
                        // Constant feature
                        (min_val + max_val) / 2.0
                    } else {
                        let normalized = (value - stats.min) / (stats.max - stats.min);
                        min_val + normalized * (max_val - min_val)
                    }
                }
                ScalingMethod::StandardScore => {
                    if stats.std < 1e-12 {
                        0.0
                    } else {
                        (value - stats.mean) / stats.std
                    }
                }
                ScalingMethod::UnitScale => {
                    let max_abs = stats.max.abs().max(stats.min.abs());
                    if max_abs < 1e-12 {
                        0.0
                    } else {
                        value / max_abs
                    }
                }
            }
        }
    }

    /// Convenience function: fit and transform in one step
    pub fn fit_transform(x: &Matrix, method: ScalingMethod) -> Result<(Matrix, ScalingParams)> {
        let params = ScalingParams::fit(x, method);
        let transformed = params.transform(x)?;
        Ok((transformed, params))
    }
}

/// Input validation performed before any model is fitted or queried
pub mod validation {
    use super::*;

    /// Check a labeled training set: non-empty, finite, matching lengths, 0/1 labels
    pub fn validate_training_set(x: &Matrix, y: &[Label]) -> Result<()> {
        if x.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        if x.n_rows() != y.len() {
            return Err(ClassifierError::LengthMismatch {
                features: x.n_rows(),
                labels: y.len(),
            });
        }
        if let Some(&bad) = y.iter().find(|&&l| l != NEGATIVE && l != POSITIVE) {
            return Err(ClassifierError::InvalidLabel(f64::from(bad)));
        }
        if !x.is_finite() {
            return Err(ClassifierError::InvalidDataset(
                "features contain NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Check rows presented for prediction against the fitted dimensionality
    pub fn validate_features(x: &Matrix, n_features: usize) -> Result<()> {
        if !x.is_empty() && x.n_cols() != n_features {
            return Err(ClassifierError::DimensionMismatch {
                expected: n_features,
                actual: x.n_cols(),
            });
        }
        if !x.is_finite() {
            return Err(ClassifierError::InvalidDataset(
                "features contain NaN or infinite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Row indices of each class: `[label 0 rows, label 1 rows]`
    pub fn partition_by_label(y: &[Label]) -> [Vec<usize>; 2] {
        let mut parts = [Vec::new(), Vec::new()];
        for (i, &label) in y.iter().enumerate() {
            parts[usize::from(label == POSITIVE)].push(i);
        }
        parts
    }

    /// Sorted distinct labels present in `y`
    pub fn unique_labels(y: &[Label]) -> Vec<Label> {
        let mut labels = y.to_vec();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// (positives, negatives, positives / negatives)
    pub fn check_label_balance(y: &[Label]) -> (usize, usize, f64) {
        let positive_count = y.iter().filter(|&&l| l == POSITIVE).count();
        let negative_count = y.len() - positive_count;
        let balance_ratio = if negative_count == 0 {
            f64::INFINITY
        } else {
            positive_count as f64 / negative_count as f64
        };
        (positive_count, negative_count, balance_ratio)
    }
}

/// Small dense linear algebra helpers
pub mod linalg {
    /// Squared Euclidean distance between two equally sized slices
    pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    /// Numerically stable log(Σ exp(v))
    pub fn log_sum_exp(values: &[f64]) -> f64 {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return max;
        }
        max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
    }

    /// Lower Cholesky factor of a symmetric positive definite `d × d` matrix
    ///
    /// Returns `None` if the matrix is not positive definite.
    pub fn cholesky(a: &[f64], d: usize) -> Option<Vec<f64>> {
        let mut l = vec![0.0; d * d];
        for i in 0..d {
            for j in 0..=i {
                let mut sum = a[i * d + j];
                for k in 0..j {
                    sum -= l[i * d + k] * l[j * d + k];
                }
                if i == j {
                    if sum <= 0.0 || !sum.is_finite() {
                        return None;
                    }
                    l[i * d + i] = sum.sqrt();
                } else {
                    l[i * d + j] = sum / l[j * d + j];
                }
            }
        }
        Some(l)
    }

    /// Solve `L z = b` for lower triangular `L`
    pub fn solve_lower(l: &[f64], d: usize, b: &[f64]) -> Vec<f64> {
        let mut z = vec![0.0; d];
        for i in 0..d {
            let mut sum = b[i];
            for k in 0..i {
                sum -= l[i * d + k] * z[k];
            }
            z[i] = sum / l[i * d + i];
        }
        z
    }

    /// log|A| from its Cholesky factor
    pub fn log_det_cholesky(l: &[f64], d: usize) -> f64 {
        2.0 * (0..d).map(|i| l[i * d + i].ln()).sum::<f64>()
    }
}
