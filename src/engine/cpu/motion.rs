//! Translation-only phase-based registration of every volume to the first one.

use num_complex::Complex32;
use rayon::prelude::*;

use crate::engine::MotionCorrectionJob;
use crate::foundation::core::{Dims3, Geometry};

const MIN_UPDATE_VOXELS: f32 = 1e-3;

/// Complex response of `volume` to one quadrature filter (zero outside the volume).
pub(crate) fn filter_response(
    volume: &[f32],
    dims: Dims3,
    size: usize,
    real: &[f32],
    imag: &[f32],
) -> Vec<Complex32> {
    let half = (size / 2) as i64;
    let (w, h, d) = (dims.width as i64, dims.height as i64, dims.depth as i64);
    let mut out = vec![Complex32::new(0.0, 0.0); volume.len()];

    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let mut acc = Complex32::new(0.0, 0.0);
                for kz in 0..size as i64 {
                    let zz = z + kz - half;
                    if zz < 0 || zz >= d {
                        continue;
                    }
                    for ky in 0..size as i64 {
                        let yy = y + ky - half;
                        if yy < 0 || yy >= h {
                            continue;
                        }
                        for kx in 0..size as i64 {
                            let xx = x + kx - half;
                            if xx < 0 || xx >= w {
                                continue;
                            }
                            let f = (kx + size as i64 * (ky + size as i64 * kz)) as usize;
                            let v = volume[(xx + w * (yy + h * zz)) as usize];
                            acc += Complex32::new(real[f] * v, imag[f] * v);
                        }
                    }
                }
                out[(x + w * (y + h * z)) as usize] = acc;
            }
        }
    }
    out
}

/// Trilinear sample at a fractional position, clamped to the volume.
pub(crate) fn sample_trilinear(volume: &[f32], dims: Dims3, p: [f32; 3]) -> f32 {
    let extents = [dims.width, dims.height, dims.depth];
    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    let mut frac = [0.0f32; 3];
    for axis in 0..3 {
        let max = (extents[axis] - 1) as f32;
        let c = p[axis].clamp(0.0, max);
        let f = c.floor();
        lo[axis] = f as usize;
        hi[axis] = (lo[axis] + 1).min(extents[axis] - 1);
        frac[axis] = c - f;
    }

    let at = |x: usize, y: usize, z: usize| volume[dims.index(x, y, z)];
    let [fx, fy, fz] = frac;
    let c00 = at(lo[0], lo[1], lo[2]) * (1.0 - fx) + at(hi[0], lo[1], lo[2]) * fx;
    let c10 = at(lo[0], hi[1], lo[2]) * (1.0 - fx) + at(hi[0], hi[1], lo[2]) * fx;
    let c01 = at(lo[0], lo[1], hi[2]) * (1.0 - fx) + at(hi[0], lo[1], hi[2]) * fx;
    let c11 = at(lo[0], hi[1], hi[2]) * (1.0 - fx) + at(hi[0], hi[1], hi[2]) * fx;
    let c0 = c00 * (1.0 - fy) + c10 * fy;
    let c1 = c01 * (1.0 - fy) + c11 * fy;
    c0 * (1.0 - fz) + c1 * fz
}

/// `out(x) = volume(x + shift)`.
pub(crate) fn translate(volume: &[f32], dims: Dims3, shift: [f32; 3], out: &mut [f32]) {
    for z in 0..dims.depth {
        for y in 0..dims.height {
            for x in 0..dims.width {
                let p = [
                    x as f32 + shift[0],
                    y as f32 + shift[1],
                    z as f32 + shift[2],
                ];
                out[dims.index(x, y, z)] = sample_trilinear(volume, dims, p);
            }
        }
    }
}

/// Displacement along one axis from the phase difference of two filter responses.
fn axis_shift(reference: &[Complex32], moving: &[Complex32], dims: Dims3, axis: usize) -> f32 {
    let (extent, stride) = match axis {
        0 => (dims.width, 1),
        1 => (dims.height, dims.width),
        _ => (dims.depth, dims.width * dims.height),
    };
    if extent < 3 {
        return 0.0;
    }

    let mut num = 0.0f64;
    let mut den = 0.0f64;
    for i in 0..reference.len() {
        let coord = (i / stride) % extent;
        if coord == 0 || coord + 1 == extent {
            continue;
        }
        let (r, m) = (reference[i], moving[i]);
        let dphi = (r * m.conj()).arg();
        let gradient = (reference[i + stride] * reference[i - stride].conj()
            + moving[i + stride] * moving[i - stride].conj())
        .arg()
            / 2.0;
        let half = (dphi / 2.0).cos();
        let certainty = (r.norm() * m.norm()).sqrt() * half * half;
        num += f64::from(certainty * gradient * dphi);
        den += f64::from(certainty * gradient * gradient);
    }
    if den > 0.0 { (num / den) as f32 } else { 0.0 }
}

/// Estimate the translation aligning `moving` to the reference responses and resample it in place.
///
/// Returns the translation in voxels.
pub(crate) fn register_volume(
    reference: &[Vec<Complex32>; 3],
    moving: &mut [f32],
    dims: Dims3,
    job: &MotionCorrectionJob<'_>,
) -> [f32; 3] {
    let original = moving.to_vec();
    let f = &job.filters;
    let mut shift = [0.0f32; 3];

    for _ in 0..job.iterations {
        let mut update = [0.0f32; 3];
        for axis in 0..3 {
            let response = filter_response(moving, dims, f.size, f.real[axis], f.imag[axis]);
            update[axis] = axis_shift(&reference[axis], &response, dims, axis);
        }
        for axis in 0..3 {
            shift[axis] += update[axis];
        }
        translate(&original, dims, shift, moving);
        if update.iter().all(|u| u.abs() < MIN_UPDATE_VOXELS) {
            break;
        }
    }
    shift
}

/// Register volumes `1..T` to volume 0 and write six parameters per volume.
///
/// Parameters are three translations in millimetres followed by three (zero) rotations.
pub(crate) fn correct_motion(
    volumes: &mut [f32],
    motion_parameters: &mut [f32],
    geometry: &Geometry,
    job: &MotionCorrectionJob<'_>,
) {
    let nvox = geometry.spatial_voxels();
    motion_parameters.fill(0.0);
    if nvox == 0
        || geometry.timepoints < 2
        || volumes.len() < nvox * geometry.timepoints
        || motion_parameters.len() < 6 * geometry.timepoints
    {
        return;
    }
    let dims = geometry.dims;
    let spacing = geometry.voxel_size.sanitized();
    let f = &job.filters;

    let (first, rest) = volumes.split_at_mut(nvox);
    let reference: [Vec<Complex32>; 3] = std::array::from_fn(|axis| {
        filter_response(first, dims, f.size, f.real[axis], f.imag[axis])
    });

    let rest = &mut rest[..nvox * (geometry.timepoints - 1)];
    let params = &mut motion_parameters[6..6 * geometry.timepoints];
    rest.par_chunks_mut(nvox)
        .zip(params.par_chunks_mut(6))
        .for_each(|(volume, out)| {
            let shift = register_volume(&reference, volume, dims, job);
            for axis in 0..3 {
                out[axis] = shift[axis] * spacing[axis];
            }
        });
}

#[cfg(test)]
#[path = "../../../tests/unit/engine/cpu/motion.rs"]
mod tests;
