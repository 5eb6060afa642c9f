//! Core traits: the public classifier contract and the collaborator seams

use crate::core::{ClusterId, Label, Matrix, Result};

/// Binary classifier fitted on labeled rows and predicting hard 0/1 labels
pub trait BinaryClassifier {
    /// Fit on `x` (N × D) and `y` (N labels in {0, 1}), replacing any prior fit
    fn fit(&mut self, x: &Matrix, y: &[Label]) -> Result<&mut Self>;

    /// Predict one label per row of `x`
    ///
    /// Fails with `NotFitted` when called before a successful `fit`.
    fn predict(&self, x: &Matrix) -> Result<Vec<Label>>;

    /// Whether a successful `fit` has happened
    fn is_fitted(&self) -> bool;

    /// Human readable strategy name
    fn name(&self) -> &str {
        "classifier"
    }
}

/// A fitted density model scoring rows in log space
pub trait DensityModel: Send + Sync {
    /// Log-likelihood of a single row
    fn log_likelihood(&self, row: &[f64]) -> f64;

    /// Log-likelihood of every row of `x`
    fn score_samples(&self, x: &Matrix) -> Vec<f64> {
        x.rows().map(|row| self.log_likelihood(row)).collect()
    }

    /// Dimensionality the model was fitted on
    fn n_features(&self) -> usize;
}

/// Fits a [`DensityModel`] to a set of rows
pub trait DensityEstimator {
    type Model: DensityModel;

    fn fit(&self, x: &Matrix) -> Result<Self::Model>;

    /// Smallest number of rows this estimator can be fitted on
    fn min_samples(&self) -> usize {
        1
    }
}

/// A fitted cluster map owning its topology
pub trait ClusterMap: Send + Sync {
    /// Cluster of every training row, in training order
    fn assignments(&self) -> &[ClusterId];

    /// Nearest cluster of every row of `x`, without retraining
    fn assign(&self, x: &Matrix) -> Vec<ClusterId>;

    /// Number of clusters in the map (populated or not)
    fn n_clusters(&self) -> usize;
}

/// Fits a [`ClusterMap`] to unlabeled rows
pub trait ClusterMapper {
    type Map: ClusterMap;

    fn fit(&self, x: &Matrix) -> Result<Self::Map>;
}
