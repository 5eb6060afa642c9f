//! Cluster × class contingency table and the ratio rule derived from it
//!
//! Pass 1 counts training rows per (cluster, label). Pass 2 normalizes each
//! class column to percentages and compares the positive share of a cluster
//! with its negative share.

use crate::core::{ClassifierError, ClusterId, Label, Result, NEGATIVE, POSITIVE};
use std::collections::{BTreeMap, BTreeSet};

/// Added to the negative percentage so class-1-only clusters get a finite ratio
pub const RATIO_EPSILON: f64 = 1e-6;

/// Share of each class (in percent of that class's rows) landing in one cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPercentages {
    pub negative: f64,
    pub positive: f64,
}

impl ClassPercentages {
    /// `positive / (negative + RATIO_EPSILON)`
    pub fn ratio(&self) -> f64 {
        self.positive / (self.negative + RATIO_EPSILON)
    }
}

/// Per-cluster counts of training rows by label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContingencyTable {
    counts: BTreeMap<ClusterId, [usize; 2]>,
}

impl ContingencyTable {
    /// Count rows per (cluster, label); only populated clusters appear
    pub fn from_assignments(assignments: &[ClusterId], labels: &[Label]) -> Result<Self> {
        if assignments.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                features: assignments.len(),
                labels: labels.len(),
            });
        }
        let mut counts: BTreeMap<ClusterId, [usize; 2]> = BTreeMap::new();
        for (&cluster, &label) in assignments.iter().zip(labels) {
            if label != NEGATIVE && label != POSITIVE {
                return Err(ClassifierError::InvalidLabel(f64::from(label)));
            }
            counts.entry(cluster).or_default()[usize::from(label)] += 1;
        }
        Ok(Self { counts })
    }

    /// Build a table from explicit `(cluster, [negative, positive])` counts
    pub fn from_counts<I: IntoIterator<Item = (ClusterId, [usize; 2])>>(counts: I) -> Self {
        Self {
            counts: counts.into_iter().collect(),
        }
    }

    pub fn count(&self, cluster: ClusterId, label: Label) -> usize {
        self.counts
            .get(&cluster)
            .map_or(0, |c| c[usize::from(label == POSITIVE)])
    }

    /// Total rows of each class across all clusters: `[negative, positive]`
    pub fn class_totals(&self) -> [usize; 2] {
        self.counts
            .values()
            .fold([0, 0], |acc, c| [acc[0] + c[0], acc[1] + c[1]])
    }

    pub fn clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.counts.keys().copied()
    }

    /// Number of populated clusters
    pub fn n_clusters(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Per-class-column percentages of every populated cluster
    ///
    /// A class with no rows contributes 0% to every cluster.
    pub fn percentages(&self) -> BTreeMap<ClusterId, ClassPercentages> {
        let [total_neg, total_pos] = self.class_totals();
        let percent = |count: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            }
        };
        self.counts
            .iter()
            .map(|(&cluster, c)| {
                (
                    cluster,
                    ClassPercentages {
                        negative: percent(c[0], total_neg),
                        positive: percent(c[1], total_pos),
                    },
                )
            })
            .collect()
    }

    /// Enrichment ratio of every populated cluster
    pub fn ratios(&self) -> BTreeMap<ClusterId, f64> {
        self.percentages()
            .into_iter()
            .map(|(cluster, p)| (cluster, p.ratio()))
            .collect()
    }

    /// Ratio of one cluster; clusters absent from the table have ratio 0
    pub fn ratio(&self, cluster: ClusterId) -> f64 {
        self.ratios().get(&cluster).copied().unwrap_or(0.0)
    }

    /// Clusters whose ratio is strictly greater than `threshold`
    pub fn flagged_clusters(&self, threshold: f64) -> BTreeSet<ClusterId> {
        self.ratios()
            .into_iter()
            .filter(|&(_, ratio)| ratio > threshold)
            .map(|(cluster, _)| cluster)
            .collect()
    }
}
