//! Integration tests for the unsupclass library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::io::Write;
use tempfile::NamedTempFile;
use unsupclass::api::evaluate;
use unsupclass::core::{BinaryClassifier, ClassifierError, DensityEstimator, Label, Matrix, Result};
use unsupclass::mixture::{Covariances, GaussianMixtureModel};
use unsupclass::utils::scaling::{ScalingMethod, ScalingParams};
use unsupclass::{
    CSVDataset, ClusterRatioClassifier, ClusterRatioConfig, ContingencyTable, CovarianceType,
    DensityRatioClassifier, DensityRatioConfig,
};

/// Class 0 scattered around (0, 0), class 1 around (5, 5)
fn two_blobs(n_per_class: usize, seed: u64) -> (Matrix, Vec<Label>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(2 * n_per_class);
    let mut labels = Vec::with_capacity(2 * n_per_class);
    for (label, center) in [(0, 0.0), (1, 5.0)] {
        for _ in 0..n_per_class {
            rows.push(vec![
                center + rng.gen_range(-1.0..1.0),
                center + rng.gen_range(-1.0..1.0),
            ]);
            labels.push(label);
        }
    }
    (Matrix::from_rows(&rows).unwrap(), labels)
}

#[test]
fn test_density_ratio_separates_blobs() {
    let (x, y) = two_blobs(50, 7);
    let mut clf = DensityRatioClassifier::with_config(
        DensityRatioConfig::default().with_random_state(0),
    );
    clf.fit(&x, &y).expect("Training should succeed");

    let metrics = evaluate(&clf, &x, &y).unwrap();
    assert_eq!(metrics.total(), 100);
    assert!(
        metrics.accuracy() >= 0.95,
        "Accuracy should be at least 95% on separated blobs, got: {}",
        metrics.accuracy()
    );

    let (test_x, test_y) = two_blobs(20, 99);
    let test_metrics = evaluate(&clf, &test_x, &test_y).unwrap();
    assert!(test_metrics.accuracy() >= 0.95);
}

#[test]
fn test_cluster_ratio_separates_blobs() {
    let (x, y) = two_blobs(50, 11);
    let mut clf = ClusterRatioClassifier::with_config(
        ClusterRatioConfig::default().with_random_state(3),
    );
    clf.fit(&x, &y).expect("Training should succeed");

    let metrics = evaluate(&clf, &x, &y).unwrap();
    assert!(
        metrics.accuracy() >= 0.95,
        "Accuracy should be at least 95% on separated blobs, got: {}",
        metrics.accuracy()
    );

    let fitted = clf.fitted().unwrap();
    assert_eq!(fitted.training_assignments().len(), 100);
    assert!(fitted.contingency().n_clusters() >= 2);
    assert!(!fitted.flagged_clusters().is_empty());
    assert_eq!(fitted.contingency().class_totals(), [50, 50]);
}

#[test]
fn test_every_classifier_requires_fit() {
    let x = Matrix::from_rows(&[vec![0.0, 0.0]]).unwrap();

    let density = DensityRatioClassifier::new();
    assert!(!density.is_fitted());
    assert!(matches!(density.predict(&x), Err(ClassifierError::NotFitted)));

    let cluster = ClusterRatioClassifier::new();
    assert!(!cluster.is_fitted());
    assert!(matches!(cluster.predict(&x), Err(ClassifierError::NotFitted)));
}

#[test]
fn test_density_ratio_insufficient_class_rows() {
    // Class 1 has one row, class-1 mixture asks for two components
    let x = Matrix::from_rows(&[vec![0.0], vec![0.5], vec![1.0], vec![9.0]]).unwrap();
    let y = [0, 0, 0, 1];
    let mut clf = DensityRatioClassifier::with_config(
        DensityRatioConfig::default().with_components(1, 2),
    );
    assert!(matches!(
        clf.fit(&x, &y),
        Err(ClassifierError::InsufficientData {
            label: 1,
            required: 2,
            actual: 1
        })
    ));
    assert!(!clf.is_fitted());
}

/// Estimator returning a fixed model
struct Fixed(GaussianMixtureModel);

impl DensityEstimator for Fixed {
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

#[test]
fn test_density_tie_predicts_zero() {
    let mut clf = DensityRatioClassifier::with_estimators(
        Fixed(unit_gaussian(-1.0)),
        Fixed(unit_gaussian(1.0)),
    );
    let train = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
    clf.fit(&train, &[0, 1]).unwrap();

    // Equidistant from both means
    let x = Matrix::from_rows(&[vec![0.0], vec![0.5], vec![-0.5]]).unwrap();
    assert_eq!(clf.predict(&x).unwrap(), vec![0, 1, 0]);
    assert_eq!(clf.decision_function(&x).unwrap()[0], 0.0);
}

#[test]
fn test_contingency_percentages_and_threshold() {
    // 50 class-1 rows, 10 of them in cluster 0
    let table = ContingencyTable::from_counts([(0, [40, 10]), (1, [0, 25]), (2, [10, 15])]);
    let pct = table.percentages();
    assert_eq!(pct[&0].positive, 20.0);
    assert_eq!(pct[&0].negative, 80.0);

    // Cluster 1 holds 50% of class 1 and none of class 0
    assert!((table.ratio(1) - 50.0 / 1e-6).abs() / (50.0 / 1e-6) < 1e-12);

    // Cluster 2: 30% vs 20% gives ratio just below 1.5
    assert_eq!(table.flagged_clusters(1.0), BTreeSet::from([1, 2]));
    assert_eq!(table.flagged_clusters(1.5), BTreeSet::from([1]));
}

#[test]
fn test_workflow_from_csv_with_scaling() {
    let (x, y) = two_blobs(30, 5);
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(temp_file, "x1,x2,label").expect("Failed to write");
    for (row, label) in x.rows().zip(&y) {
        // Spread the second feature over a much larger range
        writeln!(temp_file, "{},{},{}", row[0], row[1] * 1000.0, label).expect("Failed to write");
    }
    temp_file.flush().expect("Failed to flush");

    let dataset = CSVDataset::from_file(temp_file.path()).expect("Failed to load dataset");
    assert_eq!(dataset.len(), 60);
    assert_eq!(dataset.dim(), 2);
    assert!(dataset.header().is_some());

    let params = ScalingParams::fit(dataset.features(), ScalingMethod::StandardScore);
    let scaled = params.transform(dataset.features()).unwrap();

    let mut clf = DensityRatioClassifier::with_config(
        DensityRatioConfig::default()
            .with_covariance_type(CovarianceType::Diagonal)
            .with_random_state(1),
    );
    clf.fit(&scaled, dataset.labels()).unwrap();
    let metrics = evaluate(&clf, &scaled, dataset.labels()).unwrap();
    assert!(metrics.accuracy() >= 0.95);
}

#[test]
fn test_fit_rejects_invalid_input() {
    let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
    let mut clf = ClusterRatioClassifier::new();

    assert!(matches!(
        clf.fit(&x, &[0, 1]),
        Err(ClassifierError::LengthMismatch { .. })
    ));
    assert!(matches!(
        clf.fit(&x, &[0, 1, 2]),
        Err(ClassifierError::InvalidLabel(_))
    ));

    let nan = Matrix::from_rows(&[vec![f64::NAN], vec![1.0]]).unwrap();
    assert!(clf.fit(&nan, &[0, 1]).is_err());
    assert!(!clf.is_fitted());
}

#[test]
fn test_seeded_fits_are_reproducible() {
    let (x, y) = two_blobs(25, 21);
    let config = ClusterRatioConfig::default()
        .with_grid(4, 4)
        .with_random_state(8);

    let mut a = ClusterRatioClassifier::with_config(config.clone());
    let mut b = ClusterRatioClassifier::with_config(config);
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();

    assert_eq!(
        a.fitted().unwrap().training_assignments(),
        b.fitted().unwrap().training_assignments()
    );
    assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
}
