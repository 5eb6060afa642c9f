//! Gaussian Mixture Model fitted by Expectation-Maximization
//!
//! All densities are evaluated in log space. Each component stores the
//! Cholesky factor (or diagonal) of its covariance so that scoring a row is
//! a triangular solve plus a precomputed log-determinant.

use super::kmeans::kmeans;
use crate::core::{ClassifierError, DensityEstimator, DensityModel, Matrix, Result};
use crate::utils::linalg::{cholesky, log_det_cholesky, log_sum_exp, solve_lower};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const KMEANS_MAX_ITER: usize = 100;

/// Covariance parameterization of the mixture components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    /// One scalar variance per component
    Spherical,
    /// Per-feature variances per component
    Diagonal,
    /// One full covariance matrix shared by all components
    Tied,
    /// One full covariance matrix per component
    #[default]
    Full,
}

/// Hyperparameters for [`GaussianMixture`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmmConfig {
    /// Number of mixture components
    pub n_components: usize,
    /// Covariance family
    pub covariance_type: CovarianceType,
    /// Maximum number of EM iterations
    pub max_iter: usize,
    /// Convergence tolerance on the mean log-likelihood
    pub tol: f64,
    /// Non-negative regularization added to covariance diagonals
    pub reg_covar: f64,
    /// Seed for k-means++ initialization; `None` draws from entropy
    pub random_state: Option<u64>,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            n_components: 1,
            covariance_type: CovarianceType::Full,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            random_state: None,
        }
    }
}

/// Component covariances, shaped by covariance family
///
/// Dense matrices are `d × d` row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum Covariances {
    Spherical(Vec<f64>),
    Diagonal(Vec<Vec<f64>>),
    Tied(Vec<f64>),
    Full(Vec<Vec<f64>>),
}

impl Covariances {
    pub fn covariance_type(&self) -> CovarianceType {
        match self {
            Self::Spherical(_) => CovarianceType::Spherical,
            Self::Diagonal(_) => CovarianceType::Diagonal,
            Self::Tied(_) => CovarianceType::Tied,
            Self::Full(_) => CovarianceType::Full,
        }
    }
}

#[derive(Debug, Clone)]
enum Factor {
    Dense { lower: Vec<f64>, log_det: f64 },
    Diagonal { variances: Vec<f64>, log_det: f64 },
}

impl Factor {
    fn dense(cov: &[f64], d: usize) -> Result<Self> {
        let lower = cholesky(cov, d).ok_or_else(|| {
            ClassifierError::InvalidDataset(
                "component covariance is not positive definite; increase reg_covar".to_string(),
            )
        })?;
        let log_det = log_det_cholesky(&lower, d);
        Ok(Self::Dense { lower, log_det })
    }

    fn diagonal(variances: Vec<f64>) -> Result<Self> {
        if variances.iter().any(|&v| v <= 0.0 || !v.is_finite()) {
            return Err(ClassifierError::InvalidDataset(
                "component variance must be positive; increase reg_covar".to_string(),
            ));
        }
        let log_det = variances.iter().map(|v| v.ln()).sum();
        Ok(Self::Diagonal { variances, log_det })
    }

    fn log_det(&self) -> f64 {
        match self {
            Self::Dense { log_det, .. } | Self::Diagonal { log_det, .. } => *log_det,
        }
    }

    fn mahalanobis(&self, diff: &[f64]) -> f64 {
        match self {
            Self::Dense { lower, .. } => solve_lower(lower, diff.len(), diff)
                .iter()
                .map(|z| z * z)
                .sum(),
            Self::Diagonal { variances, .. } => {
                diff.iter().zip(variances).map(|(x, v)| x * x / v).sum()
            }
        }
    }
}

fn build_factors(covariances: &Covariances, k: usize, d: usize) -> Result<Vec<Factor>> {
    let shape_error =
        || ClassifierError::InvalidParameter("covariance shape does not match components".into());
    match covariances {
        Covariances::Spherical(vars) => {
            if vars.len() != k {
                return Err(shape_error());
            }
            vars.iter().map(|&v| Factor::diagonal(vec![v; d])).collect()
        }
        Covariances::Diagonal(vars) => {
            if vars.len() != k || vars.iter().any(|v| v.len() != d) {
                return Err(shape_error());
            }
            vars.iter().map(|v| Factor::diagonal(v.clone())).collect()
        }
        Covariances::Tied(cov) => {
            if cov.len() != d * d {
                return Err(shape_error());
            }
            let factor = Factor::dense(cov, d)?;
            Ok(vec![factor; k])
        }
        Covariances::Full(covs) => {
            if covs.len() != k || covs.iter().any(|c| c.len() != d * d) {
                return Err(shape_error());
            }
            covs.iter().map(|c| Factor::dense(c, d)).collect()
        }
    }
}

/// A fitted Gaussian mixture
#[derive(Debug, Clone)]
pub struct GaussianMixtureModel {
    weights: Vec<f64>,
    means: Vec<Vec<f64>>,
    covariances: Covariances,
    factors: Vec<Factor>,
    converged: bool,
    n_iter: usize,
    lower_bound: f64,
}

impl GaussianMixtureModel {
    /// Build a model directly from its parameters
    ///
    /// `weights` must be non-negative and sum to 1; every mean must have the
    /// same length.
    pub fn from_parts(
        weights: Vec<f64>,
        means: Vec<Vec<f64>>,
        covariances: Covariances,
    ) -> Result<Self> {
        let k = weights.len();
        if k == 0 || means.len() != k {
            return Err(ClassifierError::InvalidParameter(format!(
                "expected {k} means for {k} weights, got {}",
                means.len()
            )));
        }
        let d = means[0].len();
        if let Some(bad) = means.iter().find(|m| m.len() != d) {
            return Err(ClassifierError::DimensionMismatch {
                expected: d,
                actual: bad.len(),
            });
        }
        let total: f64 = weights.iter().sum();
        if weights.iter().any(|&w| w < 0.0 || !w.is_finite()) || (total - 1.0).abs() > 1e-6 {
            return Err(ClassifierError::InvalidParameter(
                "mixture weights must be non-negative and sum to 1".to_string(),
            ));
        }
        let factors = build_factors(&covariances, k, d)?;

        Ok(Self {
            weights,
            means,
            covariances,
            factors,
            converged: true,
            n_iter: 0,
            lower_bound: f64::NAN,
        })
    }

    pub fn n_components(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    pub fn covariances(&self) -> &Covariances {
        &self.covariances
    }

    pub fn covariance_type(&self) -> CovarianceType {
        self.covariances.covariance_type()
    }

    /// Whether EM reached the tolerance before `max_iter`
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Number of EM iterations run
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Mean log-likelihood of the training rows at the last EM step
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// `ln w_k + ln N(row | μ_k, Σ_k)` for every component
    pub fn weighted_log_prob(&self, row: &[f64]) -> Vec<f64> {
        let d = row.len() as f64;
        let mut diff = vec![0.0; row.len()];
        self.weights
            .iter()
            .zip(&self.means)
            .zip(&self.factors)
            .map(|((&w, mean), factor)| {
                for ((slot, x), m) in diff.iter_mut().zip(row).zip(mean) {
                    *slot = x - m;
                }
                let log_gauss =
                    -0.5 * (d * (2.0 * PI).ln() + factor.log_det() + factor.mahalanobis(&diff));
                w.ln() + log_gauss
            })
            .collect()
    }

    /// Mean log-likelihood over the rows of `x`
    pub fn score(&self, x: &Matrix) -> f64 {
        if x.is_empty() {
            return f64::NAN;
        }
        self.score_samples(x).iter().sum::<f64>() / x.n_rows() as f64
    }

    /// Posterior component probabilities (N × k)
    pub fn predict_proba(&self, x: &Matrix) -> Matrix {
        let k = self.n_components();
        let mut proba = Matrix::zeros(x.n_rows(), k);
        for (i, row) in x.rows().enumerate() {
            let weighted = self.weighted_log_prob(row);
            let norm = log_sum_exp(&weighted);
            for (c, w) in weighted.iter().enumerate() {
                proba.set(i, c, (w - norm).exp());
            }
        }
        proba
    }

    /// Most likely component of every row
    pub fn predict(&self, x: &Matrix) -> Vec<usize> {
        x.rows()
            .map(|row| {
                self.weighted_log_prob(row)
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (c, &w)| {
                        if w > best.1 {
                            (c, w)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }

    /// E-step: mean log-likelihood and responsibilities
    fn e_step(&self, x: &Matrix) -> (f64, Matrix) {
        let mut resp = Matrix::zeros(x.n_rows(), self.n_components());
        let mut total = 0.0;
        for (i, row) in x.rows().enumerate() {
            let weighted = self.weighted_log_prob(row);
            let norm = log_sum_exp(&weighted);
            total += norm;
            for (c, w) in weighted.iter().enumerate() {
                resp.set(i, c, (w - norm).exp());
            }
        }
        (total / x.n_rows() as f64, resp)
    }
}

impl DensityModel for GaussianMixtureModel {
    fn log_likelihood(&self, row: &[f64]) -> f64 {
        log_sum_exp(&self.weighted_log_prob(row))
    }

    fn n_features(&self) -> usize {
        self.means[0].len()
    }
}

/// Gaussian mixture estimator holding its configuration
///
/// # Examples
///
/// ```
/// use unsupclass::core::{DensityEstimator, DensityModel, Matrix};
/// use unsupclass::mixture::{CovarianceType, GaussianMixture};
///
/// let x = Matrix::from_rows(&[
///     vec![0.0, 0.1], vec![0.2, 0.0], vec![-0.1, -0.2], vec![0.1, 0.2],
/// ]).unwrap();
/// let model = GaussianMixture::new(1, CovarianceType::Diagonal)
///     .with_random_state(7)
///     .fit(&x)
///     .unwrap();
/// assert!(model.log_likelihood(&[0.0, 0.0]) > model.log_likelihood(&[5.0, 5.0]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GaussianMixture {
    config: GmmConfig,
}

impl GaussianMixture {
    pub fn new(n_components: usize, covariance_type: CovarianceType) -> Self {
        Self {
            config: GmmConfig {
                n_components,
                covariance_type,
                ..GmmConfig::default()
            },
        }
    }

    pub fn with_config(config: GmmConfig) -> Self {
        Self { config }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.config.reg_covar = reg_covar;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    pub fn config(&self) -> &GmmConfig {
        &self.config
    }

    /// M-step: parameters maximizing the expected log-likelihood under `resp`
    fn m_step(&self, x: &Matrix, resp: &Matrix) -> Result<GaussianMixtureModel> {
        let (n, d) = x.shape();
        let k = resp.n_cols();
        let reg = self.config.reg_covar;

        let nk: Vec<f64> = (0..k)
            .map(|c| (0..n).map(|i| resp.get(i, c)).sum::<f64>() + 10.0 * f64::EPSILON)
            .collect();
        let total: f64 = nk.iter().sum();
        let weights: Vec<f64> = nk.iter().map(|v| v / total).collect();

        let means: Vec<Vec<f64>> = (0..k)
            .map(|c| {
                let mut mean = vec![0.0; d];
                for (i, row) in x.rows().enumerate() {
                    let r = resp.get(i, c);
                    for (m, v) in mean.iter_mut().zip(row) {
                        *m += r * v;
                    }
                }
                mean.iter_mut().for_each(|m| *m /= nk[c]);
                mean
            })
            .collect();

        let covariances = match self.config.covariance_type {
            CovarianceType::Full => Covariances::Full(
                (0..k)
                    .map(|c| {
                        let mut cov = scatter(x, resp, c, &means[c]);
                        cov.iter_mut().for_each(|v| *v /= nk[c]);
                        add_diagonal(&mut cov, d, reg);
                        cov
                    })
                    .collect(),
            ),
            CovarianceType::Tied => {
                let mut cov = vec![0.0; d * d];
                for (c, mean) in means.iter().enumerate() {
                    for (t, s) in cov.iter_mut().zip(scatter(x, resp, c, mean)) {
                        *t += s;
                    }
                }
                cov.iter_mut().for_each(|v| *v /= total);
                add_diagonal(&mut cov, d, reg);
                Covariances::Tied(cov)
            }
            CovarianceType::Diagonal => {
                Covariances::Diagonal(diagonal_variances(x, resp, &means, &nk, reg))
            }
            CovarianceType::Spherical => Covariances::Spherical(
                diagonal_variances(x, resp, &means, &nk, reg)
                    .iter()
                    .map(|v| v.iter().sum::<f64>() / d as f64)
                    .collect(),
            ),
        };

        GaussianMixtureModel::from_parts(weights, means, covariances)
    }
}

/// Σ_i r_ic (x_i - μ)(x_i - μ)ᵀ, row-major `d × d`
fn scatter(x: &Matrix, resp: &Matrix, c: usize, mean: &[f64]) -> Vec<f64> {
    let d = x.n_cols();
    let mut out = vec![0.0; d * d];
    let mut diff = vec![0.0; d];
    for (i, row) in x.rows().enumerate() {
        let r = resp.get(i, c);
        if r == 0.0 {
            continue;
        }
        for ((slot, v), m) in diff.iter_mut().zip(row).zip(mean) {
            *slot = v - m;
        }
        for a in 0..d {
            for b in 0..d {
                out[a * d + b] += r * diff[a] * diff[b];
            }
        }
    }
    out
}

fn add_diagonal(cov: &mut [f64], d: usize, value: f64) {
    for i in 0..d {
        cov[i * d + i] += value;
    }
}

fn diagonal_variances(
    x: &Matrix,
    resp: &Matrix,
    means: &[Vec<f64>],
    nk: &[f64],
    reg: f64,
) -> Vec<Vec<f64>> {
    means
        .iter()
        .enumerate()
        .map(|(c, mean)| {
            let mut var = vec![0.0; x.n_cols()];
            for (i, row) in x.rows().enumerate() {
                let r = resp.get(i, c);
                for ((v, xv), m) in var.iter_mut().zip(row).zip(mean) {
                    *v += r * (xv - m) * (xv - m);
                }
            }
            var.iter_mut().for_each(|v| *v = *v / nk[c] + reg);
            var
        })
        .collect()
}

impl DensityEstimator for GaussianMixture {
    type Model = GaussianMixtureModel;

    fn min_samples(&self) -> usize {
        self.config.n_components.max(1)
    }

    fn fit(&self, x: &Matrix) -> Result<GaussianMixtureModel> {
        let config = &self.config;
        let k = config.n_components;
        if k == 0 {
            return Err(ClassifierError::InvalidParameter(
                "n_components must be at least 1".to_string(),
            ));
        }
        if config.reg_covar < 0.0 {
            return Err(ClassifierError::InvalidParameter(format!(
                "reg_covar must be non-negative, got {}",
                config.reg_covar
            )));
        }
        let (n, d) = x.shape();
        if d == 0 {
            return Err(ClassifierError::InvalidDataset(
                "no feature columns".to_string(),
            ));
        }
        if n < k {
            return Err(ClassifierError::InvalidDataset(format!(
                "{n} rows cannot support {k} mixture components"
            )));
        }

        let mut rng = match config.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let labels = kmeans(x, k, KMEANS_MAX_ITER, &mut rng);
        let mut resp = Matrix::zeros(n, k);
        for (i, &label) in labels.iter().enumerate() {
            resp.set(i, label, 1.0);
        }
        let mut model = self.m_step(x, &resp)?;

        let mut previous = f64::NEG_INFINITY;
        let mut lower_bound = f64::NEG_INFINITY;
        let mut converged = false;
        let mut n_iter = 0;

        for iteration in 1..=config.max_iter {
            let (bound, resp) = model.e_step(x);
            model = self.m_step(x, &resp)?;
            lower_bound = bound;
            n_iter = iteration;
            debug!("EM iteration {iteration}: mean log-likelihood {bound:.6}");

            if (bound - previous).abs() < config.tol {
                converged = true;
                break;
            }
            previous = bound;
        }

        if !converged {
            warn!(
                "Gaussian mixture did not converge within {} iterations (tol={})",
                config.max_iter, config.tol
            );
        }
        debug!(
            "Fitted {k}-component {:?} mixture on {n} rows in {n_iter} iterations",
            config.covariance_type
        );

        model.converged = converged;
        model.n_iter = n_iter;
        model.lower_bound = lower_bound;
        Ok(model)
    }
}
