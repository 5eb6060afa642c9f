//! Density-mixture collaborator
//!
//! Gaussian mixtures fitted by EM, exposed through the
//! [`DensityEstimator`](crate::core::DensityEstimator) seam.

pub mod gmm;
mod kmeans;

pub use self::gmm::*;
