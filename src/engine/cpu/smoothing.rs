use rayon::prelude::*;

use crate::foundation::core::{Dims3, Geometry};

const FWHM_TO_SIGMA: f32 = 2.354_82;

/// Normalized 1-D Gaussian taps for `fwhm_mm` at a voxel spacing of `spacing_mm`.
pub(crate) fn gaussian_kernel(fwhm_mm: f32, spacing_mm: f32) -> Vec<f32> {
    let sigma = fwhm_mm / FWHM_TO_SIGMA / spacing_mm;
    if !sigma.is_finite() || sigma < 1e-3 {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as i64;
    let mut taps: Vec<f32> = (-radius..=radius)
        .map(|i| {
            let x = i as f32;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.iter_mut().for_each(|w| *w /= sum);
    taps
}

/// Convolve every line along `axis` (0 = x, 1 = y, 2 = z) with `taps`.
///
/// Taps falling outside the volume are dropped and the remaining weights renormalized.
fn convolve_axis(src: &[f32], dst: &mut [f32], dims: Dims3, axis: usize, taps: &[f32]) {
    let (extent, stride) = match axis {
        0 => (dims.width, 1),
        1 => (dims.height, dims.width),
        _ => (dims.depth, dims.width * dims.height),
    };
    let radius = (taps.len() / 2) as i64;

    for (i, out) in dst.iter_mut().enumerate() {
        let coord = ((i / stride) % extent) as i64;
        let mut acc = 0.0f32;
        let mut weight = 0.0f32;
        for (k, &w) in taps.iter().enumerate() {
            let offset = k as i64 - radius;
            let c = coord + offset;
            if c < 0 || c >= extent as i64 {
                continue;
            }
            let j = (i as i64 + offset * stride as i64) as usize;
            acc += w * src[j];
            weight += w;
        }
        *out = if weight > 0.0 { acc / weight } else { src[i] };
    }
}

/// Separable Gaussian smoothing of one volume in place.
pub(crate) fn smooth_volume(volume: &mut [f32], dims: Dims3, kernels: &[Vec<f32>; 3]) {
    let mut scratch = vec![0.0f32; volume.len()];
    for (axis, taps) in kernels.iter().enumerate() {
        if taps.len() <= 1 {
            continue;
        }
        convolve_axis(volume, &mut scratch, dims, axis, taps);
        volume.copy_from_slice(&scratch);
    }
}

/// Smooth every volume with a Gaussian of `fwhm_mm`, converted per axis through voxel spacing.
pub(crate) fn smooth_volumes(volumes: &mut [f32], geometry: &Geometry, fwhm_mm: f32) {
    let nvox = geometry.spatial_voxels();
    if nvox == 0 {
        return;
    }
    let spacing = geometry.voxel_size.sanitized();
    let kernels = spacing.map(|s| gaussian_kernel(fwhm_mm, s));
    let dims = geometry.dims;
    volumes
        .par_chunks_mut(nvox)
        .for_each(|volume| smooth_volume(volume, dims, &kernels));
}

#[cfg(test)]
#[path = "../../../tests/unit/engine/cpu/smoothing.rs"]
mod tests;
