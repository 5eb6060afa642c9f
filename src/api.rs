//! High-level helpers for fitting and evaluating the classifiers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use unsupclass::api::evaluate;
//! use unsupclass::classifier::ClusterRatioClassifier;
//! use unsupclass::core::BinaryClassifier;
//! use unsupclass::data::CSVDataset;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let train = CSVDataset::from_file("train.csv")?;
//! let mut clf = ClusterRatioClassifier::new();
//! clf.fit(train.features(), train.labels())?;
//!
//! let test = CSVDataset::from_file("test.csv")?;
//! let metrics = evaluate(&clf, test.features(), test.labels())?;
//! println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{BinaryClassifier, ClassifierError, Label, Matrix, Result, POSITIVE};
use serde::Serialize;

/// Predict `x` and compare against `y`
pub fn evaluate<C: BinaryClassifier>(
    classifier: &C,
    x: &Matrix,
    y: &[Label],
) -> Result<EvaluationMetrics> {
    if x.n_rows() != y.len() {
        return Err(ClassifierError::LengthMismatch {
            features: x.n_rows(),
            labels: y.len(),
        });
    }
    let predictions = classifier.predict(x)?;
    Ok(EvaluationMetrics::from_predictions(&predictions, y))
}

/// Fraction of matching labels
pub fn accuracy(predictions: &[Label], labels: &[Label]) -> f64 {
    EvaluationMetrics::from_predictions(predictions, labels).accuracy()
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Confusion counts of paired predictions and labels
    pub fn from_predictions(predictions: &[Label], labels: &[Label]) -> Self {
        let mut tp = 0;
        let mut tn = 0;
        let mut fp = 0;
        let mut fn_ = 0;

        for (&pred, &actual) in predictions.iter().zip(labels) {
            match (pred == POSITIVE, actual == POSITIVE) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        Self::new(tp, tn, fp, fn_)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        let denominator = self.true_negatives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_negatives as f64 / denominator as f64
        }
    }
}
