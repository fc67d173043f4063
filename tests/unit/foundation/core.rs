use super::*;

#[test]
fn dims_display_and_counts() {
    let d = Dims3::new(64, 64, 30);
    assert_eq!(d.to_string(), "64 x 64 x 30");
    assert_eq!(d.voxel_count(), 64 * 64 * 30);
    assert_eq!(d.index(1, 0, 0), 1);
    assert_eq!(d.index(0, 1, 0), 64);
    assert_eq!(d.index(0, 0, 1), 64 * 64);
}

#[test]
fn geometry_sample_counts() {
    let g = Geometry {
        dims: Dims3::new(4, 4, 4),
        timepoints: 10,
        voxel_size: VoxelSize::default(),
    };
    assert_eq!(g.spatial_voxels(), 64);
    assert_eq!(g.total_samples(), 640);
    assert_eq!(g.with_timepoints(3).total_samples(), 192);
}

#[test]
fn voxel_size_sanitizes_degenerate_spacing() {
    let v = VoxelSize {
        x: 2.0,
        y: 0.0,
        z: f32::NAN,
    };
    assert_eq!(v.sanitized(), [2.0, 1.0, 1.0]);
}
