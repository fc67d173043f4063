use crate::codec::VolumeCodec;
use crate::codec::voxel::{VoxelData, VoxelType};
use crate::foundation::core::Geometry;
use crate::foundation::error::{IcaError, IcaResult};
use crate::pipeline::settings::{Settings, SingleVolumePolicy};
use crate::resources::tracker::{BufferId, ImageId, ResourceTracker};

/// Handles produced by [`ingest`]. Everything they name is owned by the tracker.
#[derive(Clone, Copy, Debug)]
pub struct IngestedInputs {
    /// Primary image (header kept for the output, voxel data detached).
    pub volume_image: ImageId,
    /// Mask image, when one was given.
    pub mask_image: Option<ImageId>,
    /// Geometry of the primary volume.
    pub geometry: Geometry,
    /// Encoding of the primary volume on disk.
    pub source_type: VoxelType,
    /// Canonical `f32` samples of the primary volume (`"INPUT_DATA"`).
    pub volumes: BufferId,
    /// Canonical mask (`"EPI_MASK"`); zeroed for the engine to fill when `auto_mask`.
    pub mask: BufferId,
    /// Six motion parameters per timepoint (`"MOTION_PARAMETERS"`).
    pub motion_parameters: BufferId,
    /// Whether the engine estimates the mask.
    pub auto_mask: bool,
}

/// First `count` samples of `data` converted to `f32`.
///
/// Integer encodings widen exactly; returns `None` for encodings without a conversion or when
/// `data` holds fewer than `count` samples.
pub fn widen_to_f32(data: &VoxelData, count: usize) -> Option<Vec<f32>> {
    if data.len() < count {
        return None;
    }
    match data {
        VoxelData::Uint8(v) => Some(v[..count].iter().map(|&s| f32::from(s)).collect()),
        VoxelData::Int16(v) => Some(v[..count].iter().map(|&s| f32::from(s)).collect()),
        VoxelData::Uint16(v) => Some(v[..count].iter().map(|&s| f32::from(s)).collect()),
        VoxelData::Float32(v) => Some(v[..count].to_vec()),
        VoxelData::Raw { .. } => None,
    }
}

/// Open the input (and mask), validate geometry and register canonical `f32` buffers.
///
/// Every image and buffer is registered as soon as it exists, so an error at any point leaves
/// nothing outside the tracker.
#[tracing::instrument(skip_all, fields(input = %settings.input.display()))]
pub fn ingest(
    settings: &Settings,
    codec: &dyn VolumeCodec,
    tracker: &mut ResourceTracker,
) -> IcaResult<IngestedInputs> {
    let image = codec.read(&settings.input)?;
    let volume_image = tracker.register_image("fMRI", image)?;
    let geometry = tracker.image(volume_image)?.geometry();

    if geometry.timepoints <= 1 {
        match settings.single_volume_policy {
            SingleVolumePolicy::Warn => {
                tracing::warn!("input data has only one volume, cannot do ICA");
            }
            SingleVolumePolicy::Abort => {
                return Err(IcaError::degenerate(format!(
                    "'{}' has only one volume, cannot do ICA",
                    settings.input.display()
                )));
            }
        }
    }

    let mask_image = match &settings.mask {
        Some(path) => {
            let image = codec.read(path)?;
            let id = tracker.register_image("mask", image)?;
            let mask_dims = tracker.image(id)?.geometry().dims;
            if mask_dims != geometry.dims {
                return Err(IcaError::GeometryMismatch {
                    volume: geometry.dims,
                    mask: mask_dims,
                });
            }
            Some(id)
        }
        None => None,
    };

    let v = geometry.voxel_size;
    tracing::info!(
        "data size: {} x {} timepoints, voxel size: {} x {} x {} mm",
        geometry.dims,
        geometry.timepoints,
        v.x,
        v.y,
        v.z
    );

    let (volumes, source_type) = canonicalize_volume(tracker, volume_image, &geometry)?;

    let mask = match mask_image {
        Some(id) => canonicalize_mask(tracker, id, &geometry)?,
        None => tracker.register_buffer("EPI_MASK", vec![0.0; geometry.spatial_voxels()])?,
    };

    let motion_parameters =
        tracker.register_buffer("MOTION_PARAMETERS", vec![0.0; 6 * geometry.timepoints])?;

    tracing::debug!(
        %source_type,
        allocated_bytes = tracker.allocated_bytes(),
        "input canonicalized"
    );

    Ok(IngestedInputs {
        volume_image,
        mask_image,
        geometry,
        source_type,
        volumes,
        mask,
        motion_parameters,
        auto_mask: settings.auto_mask(),
    })
}

fn checked_voxel_type(tracker: &ResourceTracker, id: ImageId) -> IcaResult<VoxelType> {
    let image = tracker.image(id)?;
    let declared = image.header().datatype;
    match image.voxel_type() {
        Some(t) if t.is_canonicalizable() => Ok(t),
        Some(t) => Err(IcaError::UnsupportedVoxelType {
            path: image.path().to_path_buf(),
            datatype: t,
        }),
        None => Err(IcaError::unreadable(
            image.path(),
            format!("unknown datatype code {declared}"),
        )),
    }
}

fn canonicalize_volume(
    tracker: &mut ResourceTracker,
    id: ImageId,
    geometry: &Geometry,
) -> IcaResult<(BufferId, VoxelType)> {
    let source_type = checked_voxel_type(tracker, id)?;
    let image = tracker.image_mut(id)?;
    let path = image.path().to_path_buf();
    let expected = image.header().voxel_count().ok_or_else(|| {
        IcaError::unreadable(&path, "header describes more voxels than can be addressed")
    })?;
    let data = image
        .take_data()
        .ok_or_else(|| IcaError::resource(format!("{id} has no voxel data attached")))?;
    if data.len() != expected {
        return Err(IcaError::unreadable(
            &path,
            format!(
                "decoded {} samples but the header describes {expected}",
                data.len()
            ),
        ));
    }

    let count = geometry.total_samples();
    let canonical = match data {
        VoxelData::Float32(mut samples) => {
            samples.truncate(count);
            samples
        }
        other => {
            let widened = widen_to_f32(&other, count).ok_or_else(|| {
                IcaError::UnsupportedVoxelType {
                    path: path.clone(),
                    datatype: other.voxel_type(),
                }
            })?;
            drop(other);
            widened
        }
    };

    let volumes = tracker.register_buffer("INPUT_DATA", canonical)?;
    Ok((volumes, source_type))
}

fn canonicalize_mask(
    tracker: &mut ResourceTracker,
    id: ImageId,
    geometry: &Geometry,
) -> IcaResult<BufferId> {
    checked_voxel_type(tracker, id)?;
    let image = tracker.image(id)?;
    let count = geometry.spatial_voxels();
    let data = image
        .data()
        .ok_or_else(|| IcaError::resource(format!("{id} has no voxel data attached")))?;
    let mask = widen_to_f32(data, count).ok_or_else(|| {
        IcaError::unreadable(
            image.path(),
            format!("mask holds {} samples, need {count}", data.len()),
        )
    })?;
    tracker.register_buffer("EPI_MASK", mask)
}

#[cfg(test)]
#[path = "../../tests/unit/ingest/canonical.rs"]
mod tests;
