use serde::Serialize;

/// Spatial extent of a volume in voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Dims3 {
    /// Voxels along x.
    pub width: usize,
    /// Voxels along y.
    pub height: usize,
    /// Voxels along z.
    pub depth: usize,
}

impl Dims3 {
    /// Construct from explicit extents.
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Number of voxels in one volume.
    pub fn voxel_count(self) -> usize {
        self.width * self.height * self.depth
    }

    /// Flat NIfTI-order index (x fastest).
    #[inline]
    pub fn index(self, x: usize, y: usize, z: usize) -> usize {
        x + self.width * (y + self.height * z)
    }
}

impl std::fmt::Display for Dims3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {} x {}", self.width, self.height, self.depth)
    }
}

/// Physical voxel spacing in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VoxelSize {
    /// Spacing along x.
    pub x: f32,
    /// Spacing along y.
    pub y: f32,
    /// Spacing along z.
    pub z: f32,
}

impl VoxelSize {
    /// Spacing as an array, with non-positive or non-finite entries replaced by 1 mm.
    pub fn sanitized(self) -> [f32; 3] {
        [self.x, self.y, self.z].map(|v| if v.is_finite() && v > 0.0 { v } else { 1.0 })
    }
}

impl Default for VoxelSize {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

/// Width, height, depth, timepoints and voxel spacing of a 4-D volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Geometry {
    /// Spatial extent.
    pub dims: Dims3,
    /// Number of volumes along the time axis.
    pub timepoints: usize,
    /// Physical spacing.
    pub voxel_size: VoxelSize,
}

impl Geometry {
    /// Voxels in one volume.
    pub fn spatial_voxels(&self) -> usize {
        self.dims.voxel_count()
    }

    /// Samples across all timepoints.
    pub fn total_samples(&self) -> usize {
        self.spatial_voxels() * self.timepoints
    }

    /// Same spatial geometry with a different time extent.
    pub fn with_timepoints(self, timepoints: usize) -> Self {
        Self { timepoints, ..self }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
