//! Binary classification by class enrichment of unsupervised clusters
//!
//! A cluster map is fitted on the features alone. A cluster is flagged when
//! the share of class-1 rows it captures, relative to the share of class-0
//! rows it captures, exceeds `ratio_threshold`. New rows are labeled 1 iff
//! their nearest cluster is flagged.

use super::contingency::ContingencyTable;
use crate::core::{
    BinaryClassifier, ClassifierError, ClusterId, ClusterMap, ClusterMapper, FitState, Label,
    Matrix, Result, NEGATIVE, POSITIVE,
};
use crate::som::{SelfOrganizingMap, SomConfig};
use crate::utils::validation::{partition_by_label, validate_features, validate_training_set};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Hyperparameters for [`ClusterRatioClassifier`] with a self-organizing map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRatioConfig {
    /// Grid width
    pub xdim: usize,
    /// Grid height
    pub ydim: usize,
    /// Flag clusters whose enrichment ratio is strictly above this value
    pub ratio_threshold: f64,
    /// Passes over the training rows during map training
    pub rlen: usize,
    /// Seed for map training
    pub random_state: Option<u64>,
}

impl Default for ClusterRatioConfig {
    fn default() -> Self {
        Self {
            xdim: 10,
            ydim: 10,
            ratio_threshold: 2.0,
            rlen: SomConfig::default().rlen,
            random_state: None,
        }
    }
}

impl ClusterRatioConfig {
    pub fn with_grid(mut self, xdim: usize, ydim: usize) -> Self {
        self.xdim = xdim;
        self.ydim = ydim;
        self
    }

    pub fn with_ratio_threshold(mut self, ratio_threshold: f64) -> Self {
        self.ratio_threshold = ratio_threshold;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// The map estimator this configuration describes
    pub fn mapper(&self) -> SelfOrganizingMap {
        SelfOrganizingMap::with_config(SomConfig {
            xdim: self.xdim,
            ydim: self.ydim,
            rlen: self.rlen,
            random_state: self.random_state,
            ..SomConfig::default()
        })
    }
}

/// Fitted state: the map, its training contingency table and the flagged set
#[derive(Debug, Clone)]
pub struct FittedClusterRatio<C> {
    map: C,
    contingency: ContingencyTable,
    flagged: BTreeSet<ClusterId>,
    n_features: usize,
}

impl<C: ClusterMap> FittedClusterRatio<C> {
    pub fn map(&self) -> &C {
        &self.map
    }

    /// Cluster of every training row
    pub fn training_assignments(&self) -> &[ClusterId] {
        self.map.assignments()
    }

    pub fn contingency(&self) -> &ContingencyTable {
        &self.contingency
    }

    pub fn flagged_clusters(&self) -> &BTreeSet<ClusterId> {
        &self.flagged
    }

    pub fn cluster_ratios(&self) -> BTreeMap<ClusterId, f64> {
        self.contingency.ratios()
    }

    /// Clusters unknown at fit time are never flagged
    pub fn is_flagged(&self, cluster: ClusterId) -> bool {
        self.flagged.contains(&cluster)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Classifier labeling rows by the enrichment of their cluster
///
/// # Examples
///
/// ```
/// use unsupclass::classifier::{ClusterRatioClassifier, ClusterRatioConfig};
/// use unsupclass::core::{BinaryClassifier, Matrix};
///
/// let x = Matrix::from_rows(&[
///     vec![0.0, 0.1], vec![0.2, -0.1], vec![-0.1, 0.0],
///     vec![5.0, 5.1], vec![5.2, 4.9], vec![4.9, 5.0],
/// ]).unwrap();
/// let y = [0, 0, 0, 1, 1, 1];
///
/// let mut clf = ClusterRatioClassifier::with_config(
///     ClusterRatioConfig::default().with_grid(2, 2).with_random_state(4),
/// );
/// clf.fit(&x, &y).unwrap();
/// assert_eq!(clf.predict(&x).unwrap().len(), 6);
/// ```
pub struct ClusterRatioClassifier<M: ClusterMapper = SelfOrganizingMap> {
    mapper: M,
    ratio_threshold: f64,
    state: FitState<FittedClusterRatio<M::Map>>,
}

impl ClusterRatioClassifier<SelfOrganizingMap> {
    /// 10×10 map with ratio threshold 2
    pub fn new() -> Self {
        Self::with_config(ClusterRatioConfig::default())
    }

    pub fn with_config(config: ClusterRatioConfig) -> Self {
        Self::with_mapper(config.mapper(), config.ratio_threshold)
    }
}

impl Default for ClusterRatioClassifier<SelfOrganizingMap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ClusterMapper> ClusterRatioClassifier<M> {
    /// Use a custom cluster-map estimator
    pub fn with_mapper(mapper: M, ratio_threshold: f64) -> Self {
        Self {
            mapper,
            ratio_threshold,
            state: FitState::Unfitted,
        }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn ratio_threshold(&self) -> f64 {
        self.ratio_threshold
    }

    /// Borrow the fitted state, or fail with `NotFitted`
    pub fn fitted(&self) -> Result<&FittedClusterRatio<M::Map>> {
        self.state.fitted()
    }
}

impl<M: ClusterMapper> BinaryClassifier for ClusterRatioClassifier<M> {
    fn fit(&mut self, x: &Matrix, y: &[Label]) -> Result<&mut Self> {
        validate_training_set(x, y)?;
        if self.ratio_threshold.is_nan() {
            return Err(ClassifierError::InvalidParameter(
                "ratio_threshold must not be NaN".to_string(),
            ));
        }
        for (label, rows) in partition_by_label(y).iter().enumerate() {
            if rows.is_empty() {
                return Err(ClassifierError::InsufficientData {
                    label: label as Label,
                    required: 1,
                    actual: 0,
                });
            }
        }

        let map = self.mapper.fit(x)?;
        let assignments = map.assignments();
        if assignments.len() != x.n_rows() {
            return Err(ClassifierError::Clustering(format!(
                "cluster map returned {} assignments for {} rows",
                assignments.len(),
                x.n_rows()
            )));
        }

        let contingency = ContingencyTable::from_assignments(assignments, y)?;
        if contingency.n_clusters() < 2 {
            return Err(ClassifierError::Clustering(format!(
                "cluster map populated {} cluster(s); at least 2 are required",
                contingency.n_clusters()
            )));
        }
        let flagged = contingency.flagged_clusters(self.ratio_threshold);
        debug!("Cluster ratios: {:?}", contingency.ratios());
        info!(
            "Flagged {} of {} populated clusters (ratio > {})",
            flagged.len(),
            contingency.n_clusters(),
            self.ratio_threshold
        );

        self.state = FitState::Fitted(FittedClusterRatio {
            map,
            contingency,
            flagged,
            n_features: x.n_cols(),
        });
        Ok(self)
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<Label>> {
        let fitted = self.state.fitted()?;
        validate_features(x, fitted.n_features)?;
        Ok(fitted
            .map
            .assign(x)
            .into_iter()
            .map(|cluster| {
                if fitted.is_flagged(cluster) {
                    POSITIVE
                } else {
                    NEGATIVE
                }
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    fn name(&self) -> &str {
        "cluster-ratio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// Map with fixed training assignments; new rows go to `round(x[0])`
    struct FixedMap {
        assignments: Vec<ClusterId>,
    }

    impl ClusterMap for FixedMap {
        fn assignments(&self) -> &[ClusterId] {
            &self.assignments
        }

        fn assign(&self, x: &Matrix) -> Vec<ClusterId> {
            x.rows().map(|row| row[0].round() as ClusterId).collect()
        }

        fn n_clusters(&self) -> usize {
            4
        }
    }

    struct FixedMapper(Vec<ClusterId>);

    impl ClusterMapper for FixedMapper {
        type Map = FixedMap;

        fn fit(&self, _x: &Matrix) -> Result<FixedMap> {
            Ok(FixedMap {
                assignments: self.0.clone(),
            })
        }
    }

    fn column(values: &[f64]) -> Matrix {
        Matrix::new(values.len(), 1, values.to_vec()).unwrap()
    }

    #[test]
    fn test_predict_before_fit() {
        let clf = ClusterRatioClassifier::new();
        assert!(!clf.is_fitted());
        assert!(matches!(
            clf.predict(&column(&[1.0])),
            Err(ClassifierError::NotFitted)
        ));
        assert!(clf.fitted().is_err());
    }

    #[test]
    fn test_flags_enriched_clusters() {
        // Cluster 0: 4 neg, 0 pos. Cluster 1: 1 neg, 3 pos. Cluster 2: 0 neg, 1 pos
        let assignments = vec![0, 0, 0, 0, 1, 1, 1, 1, 2];
        let y = [0, 0, 0, 0, 0, 1, 1, 1, 1];
        let x = column(&[0.0; 9]);
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(assignments.clone()), 2.0);
        clf.fit(&x, &y).expect("fit succeeds");

        let fitted = clf.fitted().unwrap();
        assert_eq!(fitted.flagged_clusters(), &BTreeSet::from([1, 2]));
        assert_eq!(fitted.training_assignments(), assignments.as_slice());
        assert_eq!(fitted.contingency().class_totals(), [5, 4]);
        assert!(fitted.cluster_ratios()[&2] > 1e6);

        let queries = column(&[0.0, 1.0, 2.0]);
        assert_eq!(clf.predict(&queries).unwrap(), vec![0, 1, 1]);
    }

    #[test]
    fn test_unknown_cluster_predicts_zero() {
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![0, 1, 1]), 0.5);
        clf.fit(&column(&[0.0; 3]), &[0, 1, 1]).unwrap();
        assert!(clf.fitted().unwrap().is_flagged(1));
        assert_eq!(clf.predict(&column(&[3.0, 99.0, 1.0])).unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn test_single_populated_cluster_is_error() {
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![2, 2, 2, 2]), 2.0);
        assert!(matches!(
            clf.fit(&column(&[0.0; 4]), &[0, 1, 0, 1]),
            Err(ClassifierError::Clustering(_))
        ));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn test_assignment_length_mismatch_is_error() {
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![0, 1]), 2.0);
        assert!(matches!(
            clf.fit(&column(&[0.0; 3]), &[0, 1, 1]),
            Err(ClassifierError::Clustering(_))
        ));
    }

    #[test]
    fn test_requires_both_classes() {
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![0, 1, 1]), 2.0);
        assert!(matches!(
            clf.fit(&column(&[0.0; 3]), &[1, 1, 1]),
            Err(ClassifierError::InsufficientData { label: 0, .. })
        ));
    }

    #[test]
    fn test_refit_replaces_flagged_set() {
        let x = column(&[0.0; 4]);
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![0, 0, 1, 1]), 2.0);
        clf.fit(&x, &[0, 0, 1, 1]).unwrap();
        assert_eq!(clf.fitted().unwrap().flagged_clusters(), &BTreeSet::from([1]));

        clf.fit(&x, &[1, 1, 0, 0]).unwrap();
        assert_eq!(clf.fitted().unwrap().flagged_clusters(), &BTreeSet::from([0]));
    }

    #[test]
    fn test_threshold_equal_to_ratio_is_not_flagged() {
        // Cluster 1 holds 100% of class 1 and 50% of class 0
        let x = column(&[0.0; 4]);
        let y = [0, 0, 1, 1];
        let table = ContingencyTable::from_assignments(&[0, 1, 1, 1], &y).unwrap();
        let ratio = table.ratio(1);

        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![0, 1, 1, 1]), ratio);
        clf.fit(&x, &y).unwrap();
        assert!(!clf.fitted().unwrap().is_flagged(1));
    }

    #[test]
    fn test_failed_refit_keeps_previous_state() {
        let x = column(&[0.0; 4]);
        let y = [0, 0, 1, 1];
        let mut clf = ClusterRatioClassifier::with_mapper(FixedMapper(vec![0, 0, 1, 1]), 2.0);
        clf.fit(&x, &y).unwrap();
        let queries = column(&[0.0, 1.0]);
        let before = clf.predict(&queries).unwrap();

        clf.mapper = FixedMapper(vec![3, 3, 3, 3]);
        assert!(matches!(clf.fit(&x, &y), Err(ClassifierError::Clustering(_))));
        assert!(clf.is_fitted());
        assert_eq!(clf.fitted().unwrap().flagged_clusters(), &BTreeSet::from([1]));
        assert_eq!(clf.predict(&queries).unwrap(), before);
    }

    #[test]
    fn test_diverged_map_is_reported() {
        let x = column(&[1e308, -1e308, 1e308, -1e308]);
        let mut clf = ClusterRatioClassifier::with_config(
            ClusterRatioConfig::default()
                .with_grid(2, 1)
                .with_random_state(0),
        );
        assert!(matches!(
            clf.fit(&x, &[0, 1, 0, 1]),
            Err(ClassifierError::Clustering(_))
        ));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn test_fitted_classifier_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClusterRatioClassifier>();

        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| {
                let offset = f64::from(i % 5) * 0.1;
                if i < 5 {
                    vec![offset, -offset]
                } else {
                    vec![8.0 + offset, 8.0 - offset]
                }
            })
            .collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let y = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let mut clf = ClusterRatioClassifier::with_config(
            ClusterRatioConfig::default()
                .with_grid(3, 3)
                .with_random_state(6),
        );
        clf.fit(&x, &y).unwrap();
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
    fn test_config_mapper() {
        let config = ClusterRatioConfig::default()
            .with_grid(3, 4)
            .with_ratio_threshold(1.5)
            .with_random_state(2);
        let clf = ClusterRatioClassifier::with_config(config);
        assert_eq!(clf.ratio_threshold(), 1.5);
        assert_eq!(clf.mapper().config().xdim, 3);
        assert_eq!(clf.mapper().config().ydim, 4);
        assert_eq!(clf.mapper().config().random_state, Some(2));
    }
}
