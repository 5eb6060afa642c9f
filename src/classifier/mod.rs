//! Binary classifiers derived from unsupervised structure
//!
//! - [`DensityRatioClassifier`]: one density model per class, compared by
//!   log-likelihood.
//! - [`ClusterRatioClassifier`]: one cluster map for all rows, clusters
//!   flagged by class enrichment.

pub mod cluster_ratio;
pub mod contingency;
pub mod density_ratio;

pub use self::cluster_ratio::*;
pub use self::contingency::*;
pub use self::density_ratio::*;
