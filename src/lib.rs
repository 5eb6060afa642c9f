//! Binary classifiers built on unsupervised models
//!
//! Two strategies are provided:
//! - [`DensityRatioClassifier`] fits one Gaussian mixture per class and
//!   predicts the class whose density explains a row best
//! - [`ClusterRatioClassifier`] clusters all training rows with a
//!   self-organizing map and flags clusters enriched in positive rows

pub mod api;
pub mod classifier;
pub mod core;
pub mod data;
pub mod mixture;
pub mod som;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{evaluate, EvaluationMetrics};
pub use crate::classifier::{
    ClusterRatioClassifier, ClusterRatioConfig, ContingencyTable, DensityRatioClassifier,
    DensityRatioConfig,
};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::CSVDataset;
pub use crate::mixture::{CovarianceType, GaussianMixture, GaussianMixtureModel, GmmConfig};
pub use crate::som::{SelfOrganizingMap, SomConfig, SomMap};
pub use crate::utils::scaling::{ScalingMethod, ScalingParams};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
