//! Masking, normalization, PCA whitening and symmetric FastICA on in-mask voxels.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rayon::prelude::*;

/// Fraction of the largest temporal mean a voxel needs to be inside the automatic mask.
pub(crate) const AUTO_MASK_FRACTION: f32 = 0.1;
/// Explicit mask voxels above this value are inside the mask.
pub(crate) const MASK_THRESHOLD: f32 = 0.5;

/// Write a 0/1 mask of voxels whose temporal mean exceeds 10% of the largest temporal mean.
pub(crate) fn estimate_mask(volumes: &[f32], nvox: usize, timepoints: usize, mask: &mut [f32]) {
    let t = timepoints.max(1);
    let means: Vec<f32> = (0..nvox)
        .into_par_iter()
        .map(|v| (0..t).map(|i| volumes[i * nvox + v]).sum::<f32>() / t as f32)
        .collect();
    let max = means.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let threshold = AUTO_MASK_FRACTION * max;
    for (m, mean) in mask.iter_mut().zip(&means) {
        *m = if max > 0.0 && *mean > threshold { 1.0 } else { 0.0 };
    }
}

/// Indices of in-mask voxels.
pub(crate) fn masked_indices(mask: &[f32]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, m)| **m > MASK_THRESHOLD)
        .map(|(i, _)| i)
        .collect()
}

/// Observation matrix `T x M` of the in-mask voxels.
///
/// Every voxel time series is demeaned (and scaled to unit variance with `z_score`), then every
/// row is centered so the spatial sources have zero mean.
pub(crate) fn observation_matrix(
    volumes: &[f32],
    nvox: usize,
    timepoints: usize,
    voxels: &[usize],
    z_score: bool,
) -> DMatrix<f64> {
    let t = timepoints;
    let columns: Vec<Vec<f64>> = voxels
        .par_iter()
        .map(|&v| {
            let mut series: Vec<f64> = (0..t).map(|i| f64::from(volumes[i * nvox + v])).collect();
            let mean = series.iter().sum::<f64>() / t as f64;
            series.iter_mut().for_each(|s| *s -= mean);
            if z_score {
                let var = series.iter().map(|s| s * s).sum::<f64>() / t as f64;
                if var > 0.0 {
                    let sd = var.sqrt();
                    series.iter_mut().for_each(|s| *s /= sd);
                }
            }
            series
        })
        .collect();

    let mut x = DMatrix::from_fn(t, voxels.len(), |i, j| columns[j][i]);
    if !voxels.is_empty() {
        for mut row in x.row_iter_mut() {
            let mean = row.mean();
            row.add_scalar_mut(-mean);
        }
    }
    x
}

/// Whitened data plus the number of retained components.
#[derive(Clone, Debug)]
pub(crate) struct Whitened {
    /// `k x M`, rows with unit variance and no mutual correlation.
    pub(crate) data: DMatrix<f64>,
    pub(crate) components: usize,
    /// Variance explained by the retained components, in percent.
    pub(crate) explained_percent: f64,
}

/// Number of leading eigenvalues needed to reach `percent` of the total, capped at `max`.
pub(crate) fn components_to_keep(eigenvalues: &[f64], percent: f64, max: usize) -> usize {
    let positive: Vec<f64> = eigenvalues.iter().copied().filter(|&l| l > 1e-12).collect();
    let total: f64 = positive.iter().sum();
    if positive.is_empty() || total <= 0.0 {
        return 0;
    }
    let target = total * percent / 100.0;
    let mut acc = 0.0;
    let mut k = 0;
    for l in &positive {
        acc += l;
        k += 1;
        if acc >= target {
            break;
        }
    }
    k.clamp(1, max.max(1))
}

/// Eigenpairs of a symmetric matrix, largest eigenvalue first.
fn sorted_eigen(matrix: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let eigen = SymmetricEigen::new(matrix);
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let vectors = eigen.eigenvectors.select_columns(&order);
    (values, vectors)
}

/// PCA-reduce and whiten the `T x M` observation matrix.
pub(crate) fn whiten(x: &DMatrix<f64>, percent: f64, max_components: usize) -> Whitened {
    let cov = (x * x.transpose()) / x.ncols().max(1) as f64;
    let (values, vectors) = sorted_eigen(cov);

    let k = components_to_keep(&values, percent, max_components);
    let total: f64 = values.iter().filter(|&&l| l > 0.0).sum();
    let explained_percent = if total > 0.0 {
        100.0 * values[..k].iter().sum::<f64>() / total
    } else {
        0.0
    };

    // Rows of the projection are e_c^T / sqrt(lambda_c).
    let projection = DMatrix::from_fn(k, x.nrows(), |c, i| vectors[(i, c)] / values[c].sqrt());
    Whitened {
        data: projection * x,
        components: k,
        explained_percent,
    }
}

/// Outcome of [`fast_ica`].
#[derive(Clone, Debug)]
pub(crate) struct Separation {
    /// `k x M` independent sources.
    pub(crate) sources: DMatrix<f64>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

pub(crate) const FAST_ICA_TOLERANCE: f64 = 1e-4;
pub(crate) const FAST_ICA_MAX_ITERATIONS: usize = 200;

/// Deterministic uniform values in `[-1, 1)`.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

/// `(W W^T)^(-1/2) W`, making the rows of `w` orthonormal.
pub(crate) fn symmetric_decorrelation(w: &DMatrix<f64>) -> DMatrix<f64> {
    let eigen = SymmetricEigen::new(w * w.transpose());
    let inv_sqrt = eigen.eigenvalues.map(|l| 1.0 / l.max(f64::EPSILON).sqrt());
    &eigen.eigenvectors * DMatrix::from_diagonal(&inv_sqrt) * eigen.eigenvectors.transpose() * w
}

/// Symmetric FastICA with the `tanh` contrast on whitened `k x M` data.
pub(crate) fn fast_ica(z: &DMatrix<f64>) -> Separation {
    let (k, m) = z.shape();
    if k == 0 || m == 0 {
        return Separation {
            sources: DMatrix::zeros(k, m),
            iterations: 0,
            converged: true,
        };
    }

    let mut rng = Lcg(0x5eed_1ca0);
    let mut w = symmetric_decorrelation(&DMatrix::from_fn(k, k, |_, _| rng.next()));
    let zt = z.transpose();
    let samples = m as f64;

    let mut iterations = 0;
    let mut converged = false;
    while iterations < FAST_ICA_MAX_ITERATIONS {
        iterations += 1;
        let g = (&w * z).map(f64::tanh);
        let mean_dg = DVector::from_iterator(
            k,
            g.row_iter()
                .map(|row| row.iter().map(|t| 1.0 - t * t).sum::<f64>() / samples),
        );

        let next = (&g * &zt) / samples - DMatrix::from_diagonal(&mean_dg) * &w;
        let next = symmetric_decorrelation(&next);

        let delta = next
            .row_iter()
            .zip(w.row_iter())
            .map(|(a, b)| (1.0 - a.dot(&b).abs()).abs())
            .fold(0.0, f64::max);
        w = next;
        if delta < FAST_ICA_TOLERANCE {
            converged = true;
            break;
        }
    }

    Separation {
        sources: &w * z,
        iterations,
        converged,
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/engine/cpu/ica.rs"]
mod tests;
