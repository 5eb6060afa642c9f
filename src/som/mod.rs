//! Cluster-map collaborator
//!
//! Self-organizing maps exposed through the
//! [`ClusterMapper`](crate::core::ClusterMapper) seam.

pub mod map;

pub use self::map::*;
