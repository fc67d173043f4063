use super::*;
use crate::engine::QuadratureFilters;
use crate::foundation::core::VoxelSize;

const SIZE: usize = 7;

/// Gabor filters oriented along x, y and z.
fn gabor_bank() -> ([Vec<f32>; 3], [Vec<f32>; 3]) {
    let c = (SIZE / 2) as f32;
    let s = 1.5f32;
    let omega = std::f32::consts::PI / 3.0;
    let make = |axis: usize| {
        let mut re = vec![0.0; SIZE * SIZE * SIZE];
        let mut im = vec![0.0; SIZE * SIZE * SIZE];
        for kz in 0..SIZE {
            for ky in 0..SIZE {
                for kx in 0..SIZE {
                    let d = [kx as f32 - c, ky as f32 - c, kz as f32 - c];
                    let r2 = d.iter().map(|v| v * v).sum::<f32>();
                    let env = (-r2 / (2.0 * s * s)).exp();
                    let i = kx + SIZE * (ky + SIZE * kz);
                    re[i] = env * (omega * d[axis]).cos();
                    im[i] = env * (omega * d[axis]).sin();
                }
            }
        }
        (re, im)
    };
    let (r0, i0) = make(0);
    let (r1, i1) = make(1);
    let (r2, i2) = make(2);
    ([r0, r1, r2], [i0, i1, i2])
}

fn blob(dims: Dims3, center: [f32; 3], sigma: f32) -> Vec<f32> {
    let mut v = vec![0.0; dims.voxel_count()];
    for z in 0..dims.depth {
        for y in 0..dims.height {
            for x in 0..dims.width {
                let d = [
                    x as f32 - center[0],
                    y as f32 - center[1],
                    z as f32 - center[2],
                ];
                let r2 = d.iter().map(|a| a * a).sum::<f32>();
                v[dims.index(x, y, z)] = 100.0 * (-r2 / (2.0 * sigma * sigma)).exp();
            }
        }
    }
    v
}

fn geometry(dims: Dims3, t: usize) -> Geometry {
    Geometry {
        dims,
        timepoints: t,
        voxel_size: VoxelSize {
            x: 3.0,
            y: 3.0,
            z: 3.0,
        },
    }
}

#[test]
fn trilinear_sampling_is_exact_on_the_grid_and_linear_between() {
    let dims = Dims3::new(2, 1, 1);
    let v = [0.0, 10.0];
    assert_eq!(sample_trilinear(&v, dims, [0.0, 0.0, 0.0]), 0.0);
    assert_eq!(sample_trilinear(&v, dims, [1.0, 0.0, 0.0]), 10.0);
    assert_eq!(sample_trilinear(&v, dims, [0.25, 0.0, 0.0]), 2.5);
    assert_eq!(sample_trilinear(&v, dims, [5.0, 0.0, 0.0]), 10.0);
}

#[test]
fn identical_volumes_need_no_correction() {
    let dims = Dims3::new(12, 12, 12);
    let (re, im) = gabor_bank();
    let job = MotionCorrectionJob {
        filters: QuadratureFilters {
            size: SIZE,
            real: [&re[0], &re[1], &re[2]],
            imag: [&im[0], &im[1], &im[2]],
        },
        iterations: 3,
    };
    let one = blob(dims, [6.0, 6.0, 6.0], 2.0);
    let mut volumes = [one.clone(), one.clone(), one.clone()].concat();
    let mut params = vec![9.0; 18];

    correct_motion(&mut volumes, &mut params, &geometry(dims, 3), &job);

    assert!(params.iter().all(|&p| p == 0.0));
    assert_eq!(&volumes[dims.voxel_count()..2 * dims.voxel_count()], one.as_slice());
}

#[test]
fn translation_along_x_is_recovered() {
    let dims = Dims3::new(16, 16, 16);
    let (re, im) = gabor_bank();
    let job = MotionCorrectionJob {
        filters: QuadratureFilters {
            size: SIZE,
            real: [&re[0], &re[1], &re[2]],
            imag: [&im[0], &im[1], &im[2]],
        },
        iterations: 5,
    };
    let reference = blob(dims, [8.0, 8.0, 8.0], 2.0);
    let moved = blob(dims, [9.0, 8.0, 8.0], 2.0);
    let mut volumes = [reference.clone(), moved].concat();
    let mut params = vec![0.0; 12];

    correct_motion(&mut volumes, &mut params, &geometry(dims, 2), &job);

    // One voxel at 3 mm spacing.
    assert!((params[6] - 3.0).abs() < 0.9, "tx = {}", params[6]);
    assert!(params[7].abs() < 0.3, "ty = {}", params[7]);
    assert!(params[8].abs() < 0.3, "tz = {}", params[8]);
    assert_eq!(&params[9..12], &[0.0, 0.0, 0.0]);
    assert_eq!(&params[..6], &[0.0; 6]);

    // The corrected volume peaks where the reference does.
    let corrected = &volumes[dims.voxel_count()..];
    let peak = corrected
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(peak, dims.index(8, 8, 8));
}
