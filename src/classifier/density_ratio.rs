//! Binary classification by comparing per-class mixture likelihoods
//!
//! One density model is fitted to the rows of each class. A row is labeled 1
//! exactly when the class-1 model scores it strictly higher than the class-0
//! model; equal scores resolve to 0.

use crate::core::{
    BinaryClassifier, ClassifierError, DensityEstimator, DensityModel, FitState, Label, Matrix,
    Result, NEGATIVE, POSITIVE,
};
use crate::mixture::{CovarianceType, GaussianMixture, GmmConfig};
use crate::utils::validation::{
    partition_by_label, unique_labels, validate_features, validate_training_set,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`DensityRatioClassifier`] with Gaussian mixtures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRatioConfig {
    /// Mixture components for the class-0 model
    pub n_components_class0: usize,
    /// Mixture components for the class-1 model
    pub n_components_class1: usize,
    /// Covariance family shared by both models
    pub covariance_type: CovarianceType,
    /// Maximum EM iterations per model
    pub max_iter: usize,
    /// EM convergence tolerance
    pub tol: f64,
    /// Covariance regularization
    pub reg_covar: f64,
    /// Seed shared by both models
    pub random_state: Option<u64>,
}

impl Default for DensityRatioConfig {
    fn default() -> Self {
        let gmm = GmmConfig::default();
        Self {
            n_components_class0: 1,
            n_components_class1: 1,
            covariance_type: CovarianceType::Full,
            max_iter: gmm.max_iter,
            tol: gmm.tol,
            reg_covar: gmm.reg_covar,
            random_state: None,
        }
    }
}

impl DensityRatioConfig {
    pub fn with_components(mut self, class0: usize, class1: usize) -> Self {
        self.n_components_class0 = class0;
        self.n_components_class1 = class1;
        self
    }

    pub fn with_covariance_type(mut self, covariance_type: CovarianceType) -> Self {
        self.covariance_type = covariance_type;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// The class-0 and class-1 estimators this configuration describes
    pub fn estimators(&self) -> [GaussianMixture; 2] {
        [self.n_components_class0, self.n_components_class1].map(|n_components| {
            GaussianMixture::with_config(GmmConfig {
                n_components,
                covariance_type: self.covariance_type,
                max_iter: self.max_iter,
                tol: self.tol,
                reg_covar: self.reg_covar,
                random_state: self.random_state,
            })
        })
    }
}

/// Fitted state: one model per class
#[derive(Debug, Clone)]
pub struct FittedDensityRatio<M> {
    model0: M,
    model1: M,
    classes: Vec<Label>,
    n_features: usize,
}

impl<M: DensityModel> FittedDensityRatio<M> {
    pub fn model0(&self) -> &M {
        &self.model0
    }

    pub fn model1(&self) -> &M {
        &self.model1
    }

    /// Sorted labels observed during fit
    ///
    /// Informational only. Fitting requires rows of both classes, so this is
    /// always `[0, 1]`.
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// `log p₁(row) - log p₀(row)`
    pub fn log_likelihood_ratio(&self, row: &[f64]) -> f64 {
        self.model1.log_likelihood(row) - self.model0.log_likelihood(row)
    }

    fn classify(&self, row: &[f64]) -> Label {
        if self.model1.log_likelihood(row) > self.model0.log_likelihood(row) {
            POSITIVE
        } else {
            NEGATIVE
        }
    }
}

/// Classifier comparing the log-likelihood of two per-class density models
///
/// # Examples
///
/// ```
/// use unsupclass::classifier::{DensityRatioClassifier, DensityRatioConfig};
/// use unsupclass::core::{BinaryClassifier, Matrix};
///
/// let x = Matrix::from_rows(&[
///     vec![0.0, 0.1], vec![0.2, -0.1], vec![-0.1, 0.0],
///     vec![5.0, 5.1], vec![5.2, 4.9], vec![4.9, 5.0],
/// ]).unwrap();
/// let y = [0, 0, 0, 1, 1, 1];
///
/// let mut clf = DensityRatioClassifier::with_config(
///     DensityRatioConfig::default().with_random_state(0),
/// );
/// clf.fit(&x, &y).unwrap();
/// assert_eq!(clf.predict(&x).unwrap(), y.to_vec());
/// ```
pub struct DensityRatioClassifier<E: DensityEstimator = GaussianMixture> {
    estimators: [E; 2],
    state: FitState<FittedDensityRatio<E::Model>>,
}

impl DensityRatioClassifier<GaussianMixture> {
    /// Gaussian mixtures with one full-covariance component per class
    pub fn new() -> Self {
        Self::with_config(DensityRatioConfig::default())
    }

    pub fn with_config(config: DensityRatioConfig) -> Self {
        Self::with_estimators_array(config.estimators())
    }
}

impl Default for DensityRatioClassifier<GaussianMixture> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DensityEstimator> DensityRatioClassifier<E> {
    /// Use custom density estimators for class 0 and class 1
    pub fn with_estimators(estimator0: E, estimator1: E) -> Self {
        Self::with_estimators_array([estimator0, estimator1])
    }

    fn with_estimators_array(estimators: [E; 2]) -> Self {
        Self {
            estimators,
            state: FitState::Unfitted,
        }
    }

    pub fn estimators(&self) -> &[E; 2] {
        &self.estimators
    }

    /// Borrow the fitted models, or fail with `NotFitted`
    pub fn fitted(&self) -> Result<&FittedDensityRatio<E::Model>> {
        self.state.fitted()
    }

    /// Per-row `score1 - score0`; positive values predict label 1
    pub fn decision_function(&self, x: &Matrix) -> Result<Vec<f64>> {
        let fitted = self.state.fitted()?;
        validate_features(x, fitted.n_features)?;
        Ok(x.rows().map(|row| fitted.log_likelihood_ratio(row)).collect())
    }
}

impl<E: DensityEstimator> BinaryClassifier for DensityRatioClassifier<E> {
    fn fit(&mut self, x: &Matrix, y: &[Label]) -> Result<&mut Self> {
        validate_training_set(x, y)?;

        let partitions = partition_by_label(y);
        for (label, (rows, estimator)) in partitions.iter().zip(&self.estimators).enumerate() {
            let required = estimator.min_samples().max(1);
            if rows.len() < required {
                return Err(ClassifierError::InsufficientData {
                    label: label as Label,
                    required,
                    actual: rows.len(),
                });
            }
        }
        debug!(
            "Partitioned {} rows into {} negative and {} positive",
            x.n_rows(),
            partitions[0].len(),
            partitions[1].len()
        );

        let model0 = self.estimators[0].fit(&x.select_rows(&partitions[0]))?;
        let model1 = self.estimators[1].fit(&x.select_rows(&partitions[1]))?;

        self.state = FitState::Fitted(FittedDensityRatio {
            model0,
            model1,
            classes: unique_labels(y),
            n_features: x.n_cols(),
        });
        info!(
            "Fitted density-ratio classifier on {} rows with {} features",
            x.n_rows(),
            x.n_cols()
        );
        Ok(self)
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<Label>> {
        let fitted = self.state.fitted()?;
        validate_features(x, fitted.n_features)?;
        Ok(x.rows().map(|row| fitted.classify(row)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn name(&self) -> &str {
        "density-ratio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::{Covariances, GaussianMixtureModel};
    use std::sync::Arc;
    use std::thread;

    /// Estimator returning a fixed model regardless of the rows it is given
    struct Preset(GaussianMixtureModel);

    impl DensityEstimator for Preset {
        type Model = GaussianMixtureModel;

        fn fit(&self, _x: &Matrix) -> Result<GaussianMixtureModel> {
            Ok(self.0.clone())
        }
    }

    fn unit_gaussian(mean: f64) -> GaussianMixtureModel {
        GaussianMixtureModel::from_parts(
            vec![1.0],
            vec![vec![mean]],
            Covariances::Spherical(vec![1.0]),
        )
        .unwrap()
    }

    fn column(values: &[f64]) -> Matrix {
        Matrix::new(values.len(), 1, values.to_vec()).unwrap()
    }

    #[test]
    fn test_predict_before_fit() {
        let clf = DensityRatioClassifier::new();
        assert!(!clf.is_fitted());
        assert!(matches!(
            clf.predict(&column(&[0.0])),
            Err(ClassifierError::NotFitted)
        ));
        assert!(matches!(
            clf.decision_function(&column(&[0.0])),
            Err(ClassifierError::NotFitted)
        ));
    }

    #[test]
    fn test_equal_likelihood_resolves_to_zero() {
        let mut clf = DensityRatioClassifier::with_estimators(
            Preset(unit_gaussian(-1.0)),
            Preset(unit_gaussian(1.0)),
        );
        clf.fit(&column(&[-1.0, 1.0]), &[0, 1]).expect("fit succeeds");

        let x = column(&[0.0, 0.1, -0.1]);
        let scores = clf.decision_function(&x).unwrap();
        assert_eq!(scores[0], 0.0);
        assert_eq!(clf.predict(&x).unwrap(), vec![0, 1, 0]);
    }

    #[test]
    fn test_fit_partitions_by_label() {
        let x = column(&[-2.1, -1.9, -2.0, 3.0, 3.2, 2.8]);
        let mut clf = DensityRatioClassifier::with_config(
            DensityRatioConfig::default().with_random_state(3),
        );
        clf.fit(&x, &[0, 0, 0, 1, 1, 1]).expect("fit succeeds");

        let fitted = clf.fitted().unwrap();
        assert!((fitted.model0().means()[0][0] + 2.0).abs() < 1e-6);
        assert!((fitted.model1().means()[0][0] - 3.0).abs() < 1e-6);
        assert_eq!(fitted.classes(), &[0, 1]);
        assert_eq!(fitted.n_features(), 1);
    }

    #[test]
    fn test_insufficient_data() {
        let x = column(&[0.0, 1.0, 2.0, 3.0]);
        let mut clf = DensityRatioClassifier::new();
        assert!(matches!(
            clf.fit(&x, &[0, 0, 0, 0]),
            Err(ClassifierError::InsufficientData {
                label: 1,
                required: 1,
                actual: 0
            })
        ));

        let mut clf = DensityRatioClassifier::with_config(
            DensityRatioConfig::default().with_components(1, 3),
        );
        assert!(matches!(
            clf.fit(&x, &[0, 0, 1, 1]),
            Err(ClassifierError::InsufficientData {
                label: 1,
                required: 3,
                actual: 2
            })
        ));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn test_failed_refit_keeps_previous_models() {
        let x = column(&[0.0, 0.2, 4.0, 4.2]);
        let mut clf = DensityRatioClassifier::with_config(
            DensityRatioConfig::default().with_random_state(1),
        );
        clf.fit(&x, &[0, 0, 1, 1]).unwrap();
        assert!(clf.fit(&x, &[0, 0, 0, 0]).is_err());
        assert!(clf.is_fitted());
        assert_eq!(clf.predict(&column(&[0.1, 4.1])).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_fitted_classifier_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DensityRatioClassifier>();

        let x = column(&[0.0, 0.2, 0.4, 4.0, 4.2, 4.4]);
        let mut clf = DensityRatioClassifier::with_config(
            DensityRatioConfig::default().with_random_state(2),
        );
        clf.fit(&x, &[0, 0, 0, 1, 1, 1]).unwrap();
        let expected = clf.predict(&x).unwrap();

        let clf = Arc::new(clf);
        let x = Arc::new(x);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clf = Arc::clone(&clf);
                let x = Arc::clone(&x);
                thread::spawn(move || clf.predict(&x).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let x = column(&[0.0, 0.2, 4.0, 4.2]);
        let mut clf = DensityRatioClassifier::new();
        clf.fit(&x, &[0, 0, 1, 1]).unwrap();
        let wide = Matrix::zeros(1, 2);
        assert!(matches!(
            clf.predict(&wide),
            Err(ClassifierError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_config_estimators() {
        let config = DensityRatioConfig::default()
            .with_components(2, 4)
            .with_covariance_type(CovarianceType::Tied)
            .with_random_state(8);
        let [e0, e1] = config.estimators();
        assert_eq!(e0.config().n_components, 2);
        assert_eq!(e1.config().n_components, 4);
        assert_eq!(e1.config().covariance_type, CovarianceType::Tied);
        assert_eq!(e0.config().random_state, Some(8));
    }
}
