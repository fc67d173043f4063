use std::path::{Path, PathBuf};

use crate::codec::VolumeCodec;
use crate::codec::nifti::{DEFAULT_VOX_OFFSET, NiftiHeader};
use crate::codec::voxel::VoxelType;
use crate::foundation::error::{IcaError, IcaResult};
use crate::pipeline::settings::{DEFAULT_OUTPUT_SUFFIX, OutputNaming, Settings};

#[derive(Clone, Debug, PartialEq)]
/// Where and what the output volume will be.
pub struct OutputDescriptor {
    /// Destination file.
    pub path: PathBuf,
    /// Header written in front of the maps.
    pub header: NiftiHeader,
    /// Samples the header describes (`w * h * d * k`).
    pub voxel_count: usize,
}

/// Header for `component_count` float maps on the input grid.
///
/// Spatial metadata (voxel size, orientation, description) is copied from `input`; the encoding,
/// scaling and data offset are reset for a plain little-endian float image without extensions.
pub fn output_header(input: &NiftiHeader, component_count: usize) -> IcaResult<NiftiHeader> {
    let time = i16::try_from(component_count).map_err(|_| {
        IcaError::engine_contract(format!(
            "{component_count} components do not fit the NIfTI-1 time extent"
        ))
    })?;

    let mut hdr = input.clone();
    hdr.dim[0] = 4;
    hdr.dim[4] = time;
    for d in &mut hdr.dim[5..] {
        *d = 1;
    }
    hdr.set_voxel_type(VoxelType::Float32);
    hdr.scl_slope = 1.0;
    hdr.scl_inter = 0.0;
    hdr.cal_max = 0.0;
    hdr.cal_min = 0.0;
    hdr.vox_offset = DEFAULT_VOX_OFFSET as f32;
    Ok(hdr)
}

/// `<stem>_ica.nii` next to `input`, with a `.nii` or `.nii.gz` extension removed first.
pub fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lower = name.to_ascii_lowercase();
    let stem = if lower.ends_with(".nii.gz") {
        &name[..name.len() - ".nii.gz".len()]
    } else if lower.ends_with(".nii") {
        &name[..name.len() - ".nii".len()]
    } else {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name.as_str())
    };
    input.with_file_name(format!("{stem}{suffix}.nii"))
}

fn ensure_parent_dir(path: &Path) -> IcaResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn resolve_path(settings: &Settings) -> IcaResult<PathBuf> {
    match &settings.output {
        OutputNaming::Explicit(path) => Ok(path.clone()),
        OutputNaming::Derived => {
            let path = derive_output_path(&settings.input, DEFAULT_OUTPUT_SUFFIX);
            if !settings.allow_overwrite && path.exists() {
                return Err(IcaError::OutputWrite {
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "output file already exists (pass -overwrite to replace it)",
                    ),
                    path,
                });
            }
            Ok(path)
        }
    }
}

/// Write the first `component_count` maps of `volumes` next to (or instead of) the input.
#[tracing::instrument(skip(settings, codec, input_header, volumes))]
pub fn materialize_output(
    settings: &Settings,
    codec: &dyn VolumeCodec,
    input_header: &NiftiHeader,
    component_count: usize,
    volumes: &[f32],
) -> IcaResult<OutputDescriptor> {
    let header = output_header(input_header, component_count)?;
    let voxel_count = header.voxel_count().ok_or_else(|| {
        IcaError::engine_contract(format!(
            "{component_count} components exceed the addressable output size"
        ))
    })?;
    if volumes.len() < voxel_count {
        return Err(IcaError::engine_contract(format!(
            "{component_count} components need {voxel_count} samples, the volume buffer holds {}",
            volumes.len()
        )));
    }

    let path = resolve_path(settings)?;
    ensure_parent_dir(&path)?;
    codec.write(&path, &header, &volumes[..voxel_count])?;
    tracing::info!(
        "wrote {component_count} component maps to {}",
        path.display()
    );

    Ok(OutputDescriptor {
        path,
        header,
        voxel_count,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/output/materialize.rs"]
mod tests;
