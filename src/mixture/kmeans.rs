//! K-Means (Lloyd's algorithm with k-means++ seeding) used to initialize EM

use crate::core::Matrix;
use crate::utils::linalg::squared_euclidean;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Hard cluster labels for every row of `x`
///
/// Requires `1 <= k <= x.n_rows()`.
pub(crate) fn kmeans<R: Rng>(x: &Matrix, k: usize, max_iter: usize, rng: &mut R) -> Vec<usize> {
    let mut centroids = plus_plus_init(x, k, rng);
    let mut labels: Vec<usize> = x.rows().map(|row| nearest(&centroids, row)).collect();

    for _ in 0..max_iter {
        update_centroids(x, &labels, &mut centroids);
        let next: Vec<usize> = x.rows().map(|row| nearest(&centroids, row)).collect();
        if next == labels {
            break;
        }
        labels = next;
    }
    labels
}

fn plus_plus_init<R: Rng>(x: &Matrix, k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = x.n_rows();
    let mut centroids = vec![x.row(rng.gen_range(0..n)).to_vec()];
    let mut dist: Vec<f64> = x
        .rows()
        .map(|row| squared_euclidean(row, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let next = match WeightedIndex::new(&dist) {
            Ok(weights) => weights.sample(rng),
            // All remaining rows coincide with a centroid
            Err(_) => rng.gen_range(0..n),
        };
        let centroid = x.row(next).to_vec();
        for (d, row) in dist.iter_mut().zip(x.rows()) {
            *d = d.min(squared_euclidean(row, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn nearest(centroids: &[Vec<f64>], row: &[f64]) -> usize {
    centroids
        .iter()
        .map(|c| squared_euclidean(row, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
        .0
}

fn update_centroids(x: &Matrix, labels: &[usize], centroids: &mut [Vec<f64>]) {
    let d = x.n_cols();
    let mut sums = vec![vec![0.0; d]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];
    for (row, &label) in x.rows().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(row) {
            *s += v;
        }
    }
    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        // Empty clusters keep their previous centroid
        if count > 0 {
            *centroid = sum.into_iter().map(|s| s / count as f64).collect();
        }
    }
}
