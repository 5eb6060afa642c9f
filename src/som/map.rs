//! Self-organizing map on a rectangular grid
//!
//! Training follows the online Kohonen scheme used by FlowSOM: the codebook
//! is seeded from random training rows, then for `rlen` passes over the data
//! a random row pulls its best matching node, and every node within the
//! current grid radius, towards itself. Both the learning rate and the radius
//! decay linearly over training.

use crate::core::{ClassifierError, ClusterId, ClusterMap, ClusterMapper, Matrix, Result};
use crate::utils::linalg::squared_euclidean;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Quantile of pairwise grid distances used as the default start radius
const DEFAULT_RADIUS_QUANTILE: f64 = 0.67;

/// Hyperparameters for [`SelfOrganizingMap`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SomConfig {
    /// Grid width
    pub xdim: usize,
    /// Grid height
    pub ydim: usize,
    /// Number of passes over the training rows
    pub rlen: usize,
    /// Learning rate at the start and end of training
    pub alpha: (f64, f64),
    /// Neighbourhood radius at the start and end of training; `None` uses
    /// the 0.67 quantile of grid distances decaying to 0
    pub radius: Option<(f64, f64)>,
    /// Seed for codebook initialization and row sampling
    pub random_state: Option<u64>,
}

impl Default for SomConfig {
    fn default() -> Self {
        Self {
            xdim: 10,
            ydim: 10,
            rlen: 10,
            alpha: (0.05, 0.01),
            radius: None,
            random_state: None,
        }
    }
}

/// Self-organizing map estimator holding its configuration
#[derive(Debug, Clone, Default)]
pub struct SelfOrganizingMap {
    config: SomConfig,
}

impl SelfOrganizingMap {
    pub fn new(xdim: usize, ydim: usize) -> Self {
        Self {
            config: SomConfig {
                xdim,
                ydim,
                ..SomConfig::default()
            },
        }
    }

    pub fn with_config(config: SomConfig) -> Self {
        Self { config }
    }

    pub fn with_rlen(mut self, rlen: usize) -> Self {
        self.config.rlen = rlen;
        self
    }

    pub fn with_alpha(mut self, start: f64, end: f64) -> Self {
        self.config.alpha = (start, end);
        self
    }

    pub fn with_radius(mut self, start: f64, end: f64) -> Self {
        self.config.radius = Some((start, end));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    pub fn config(&self) -> &SomConfig {
        &self.config
    }

    fn validate(&self) -> Result<()> {
        let config = &self.config;
        if config.xdim == 0 || config.ydim == 0 {
            return Err(ClassifierError::InvalidParameter(format!(
                "grid dimensions must be positive, got {}x{}",
                config.xdim, config.ydim
            )));
        }
        if config.rlen == 0 {
            return Err(ClassifierError::InvalidParameter(
                "rlen must be at least 1".to_string(),
            ));
        }
        let (a0, a1) = config.alpha;
        if !(a0 > 0.0 && a0 <= 1.0 && a1 > 0.0 && a1 <= 1.0) {
            return Err(ClassifierError::InvalidParameter(format!(
                "learning rates must lie in (0, 1], got ({a0}, {a1})"
            )));
        }
        if let Some((r0, r1)) = config.radius {
            if r0 < 0.0 || r1 < 0.0 || r1 > r0 {
                return Err(ClassifierError::InvalidParameter(format!(
                    "radius must satisfy start >= end >= 0, got ({r0}, {r1})"
                )));
            }
        }
        Ok(())
    }
}

/// Type-7 quantile of `values`
fn quantile(values: &mut [f64], p: f64) -> f64 {
    values.sort_by(f64::total_cmp);
    let h = (values.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    values[lo] + (h - lo as f64) * (values[hi] - values[lo])
}

impl ClusterMapper for SelfOrganizingMap {
    type Map = SomMap;

    fn fit(&self, x: &Matrix) -> Result<SomMap> {
        self.validate()?;
        if x.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        let config = &self.config;
        let (n, d) = x.shape();
        let n_nodes = config.xdim * config.ydim;

        let mut rng = match config.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut map = SomMap {
            xdim: config.xdim,
            ydim: config.ydim,
            codes: Matrix::zeros(n_nodes, d),
            assignments: Vec::new(),
        };
        for node in 0..n_nodes {
            let seed_row = rng.gen_range(0..n);
            map.codes.row_mut(node).copy_from_slice(x.row(seed_row));
        }

        let (radius_start, radius_end) = config.radius.unwrap_or_else(|| {
            let mut distances: Vec<f64> = (0..n_nodes)
                .flat_map(|a| (0..n_nodes).map(move |b| (a, b)))
                .map(|(a, b)| map.grid_distance(a, b))
                .collect();
            (quantile(&mut distances, DEFAULT_RADIUS_QUANTILE), 0.0)
        });
        let (alpha_start, alpha_end) = config.alpha;

        let n_steps = n * config.rlen;
        debug!(
            "SOM {}x{}: {n} rows, {n_steps} steps, radius {radius_start:.2}->{radius_end:.2}",
            config.xdim, config.ydim
        );

        for step in 0..n_steps {
            let progress = step as f64 / n_steps as f64;
            let alpha = alpha_start - (alpha_start - alpha_end) * progress;
            let radius = radius_start - (radius_start - radius_end) * progress;

            let row = x.row(rng.gen_range(0..n));
            let winner = map.nearest_node(row);
            for node in 0..n_nodes {
                if map.grid_distance(winner, node) <= radius {
                    for (code, v) in map.codes.row_mut(node).iter_mut().zip(row) {
                        *code += alpha * (v - *code);
                    }
                }
            }
        }

        if !map.codes.is_finite() {
            return Err(ClassifierError::Clustering(
                "codebook diverged to non-finite values".to_string(),
            ));
        }

        map.assignments = map.assign(x);
        debug!(
            "SOM populated {} of {n_nodes} nodes",
            map.populated_clusters()
        );
        Ok(map)
    }
}

/// A trained self-organizing map
///
/// Node `id` sits at grid position `(id % xdim, id / xdim)`.
#[derive(Debug, Clone)]
pub struct SomMap {
    xdim: usize,
    ydim: usize,
    codes: Matrix,
    assignments: Vec<ClusterId>,
}

impl SomMap {
    pub fn xdim(&self) -> usize {
        self.xdim
    }

    pub fn ydim(&self) -> usize {
        self.ydim
    }

    /// Codebook vectors, one row per node
    pub fn codes(&self) -> &Matrix {
        &self.codes
    }

    pub fn grid_position(&self, node: ClusterId) -> (usize, usize) {
        (node % self.xdim, node / self.xdim)
    }

    /// Chebyshev distance between two nodes on the grid
    pub fn grid_distance(&self, a: ClusterId, b: ClusterId) -> f64 {
        let (ax, ay) = self.grid_position(a);
        let (bx, by) = self.grid_position(b);
        ax.abs_diff(bx).max(ay.abs_diff(by)) as f64
    }

    /// Best matching node of a row (lowest id wins ties)
    pub fn nearest_node(&self, row: &[f64]) -> ClusterId {
        self.codes
            .rows()
            .map(|code| squared_euclidean(row, code))
            .enumerate()
            .fold((0, f64::INFINITY), |best, (node, dist)| {
                if dist < best.1 {
                    (node, dist)
                } else {
                    best
                }
            })
            .0
    }

    /// Number of distinct nodes with at least one training row
    pub fn populated_clusters(&self) -> usize {
        let mut populated = vec![false; self.n_clusters()];
        for &node in &self.assignments {
            populated[node] = true;
        }
        populated.into_iter().filter(|&p| p).count()
    }
}

impl ClusterMap for SomMap {
    fn assignments(&self) -> &[ClusterId] {
        &self.assignments
    }

    fn assign(&self, x: &Matrix) -> Vec<ClusterId> {
        x.rows().map(|row| self.nearest_node(row)).collect()
    }

    fn n_clusters(&self) -> usize {
        self.xdim * self.ydim
    }
}
