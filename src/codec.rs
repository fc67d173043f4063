//! Volumetric image IO.
//!
//! The pipeline talks to images through [`VolumeCodec`]; [`Nifti1Codec`] is the NIfTI
//! implementation used by the command-line tool.

pub(crate) mod nifti;
pub(crate) mod voxel;

use std::path::{Path, PathBuf};

use crate::codec::nifti::{
    NiftiExtension, NiftiHeader, decode_pair, decode_single_file, encode_nifti1, gzip, inflate,
    read_stream,
};
use crate::codec::voxel::{VoxelData, VoxelType, VoxelView};
use crate::foundation::core::Geometry;
use crate::foundation::error::{IcaError, IcaResult};

/// Reads images with their voxel data attached and writes `f32` images.
pub trait VolumeCodec {
    /// Open `path` and decode its header, extensions and voxel data.
    fn read(&self, path: &Path) -> IcaResult<VolumeImage>;

    /// Write `samples` as a FLOAT32 image described by `header`.
    fn write(&self, path: &Path, header: &NiftiHeader, samples: &[f32]) -> IcaResult<()>;
}

/// Header, extensions and (optionally) voxel data of one opened image.
///
/// Voxel data can be moved out with [`VolumeImage::take_data`], leaving the header available.
#[derive(Clone, Debug)]
pub struct VolumeImage {
    path: PathBuf,
    header: NiftiHeader,
    extensions: Vec<NiftiExtension>,
    data: Option<VoxelData>,
}

impl VolumeImage {
    /// Assemble an image from already-decoded parts.
    pub fn from_parts(
        path: impl Into<PathBuf>,
        header: NiftiHeader,
        extensions: Vec<NiftiExtension>,
        data: Option<VoxelData>,
    ) -> Self {
        Self {
            path: path.into(),
            header,
            extensions,
            data,
        }
    }

    /// File the image was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Header extension blocks.
    pub fn extensions(&self) -> &[NiftiExtension] {
        &self.extensions
    }

    /// Attached voxel data, if it has not been taken.
    pub fn data(&self) -> Option<&VoxelData> {
        self.data.as_ref()
    }

    /// Whether voxel data is still attached.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Detach the voxel data, transferring ownership to the caller.
    pub fn take_data(&mut self) -> Option<VoxelData> {
        self.data.take()
    }

    /// Drop all extension blocks.
    pub fn free_extensions(&mut self) {
        self.extensions.clear();
    }

    /// Geometry declared by the header.
    pub fn geometry(&self) -> Geometry {
        self.header.geometry()
    }

    /// Encoding declared by the header, if known.
    pub fn voxel_type(&self) -> Option<VoxelType> {
        self.header.voxel_type()
    }
}

/// NIfTI-1 codec for single files (`.nii`) and header/image pairs (`.hdr` + `.img`).
///
/// NIfTI-2 input is read as well. Either stream may be gzip-compressed and either byte order is
/// read. Output is little-endian
/// with no extensions, gzip-compressed when the destination ends in `.gz`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Nifti1Codec;

impl Nifti1Codec {
    /// Decode a single-file image from an in-memory file, compressed or not.
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> IcaResult<VolumeImage> {
        let bytes = inflate(bytes.to_vec())
            .map_err(|e| IcaError::unreadable(path, format!("gzip stream: {e}")))?;
        let image =
            decode_single_file(&bytes).map_err(|reason| IcaError::unreadable(path, reason))?;

        tracing::debug!(
            path = %path.display(),
            datatype = image.header.datatype,
            big_endian = image.big_endian,
            extensions = image.extensions.len(),
            "decoded NIfTI image"
        );
        Ok(VolumeImage::from_parts(
            path,
            image.header,
            image.extensions,
            Some(image.data),
        ))
    }

    fn read_pair(
        &self,
        path: &Path,
        header_path: &Path,
        image_path: &Path,
    ) -> IcaResult<VolumeImage> {
        let header_bytes = read_stream(header_path)?;
        let image_bytes = read_stream(image_path)?;
        let image = decode_pair(&header_bytes, &image_bytes)
            .map_err(|reason| IcaError::unreadable(path, reason))?;

        tracing::debug!(
            header = %header_path.display(),
            image = %image_path.display(),
            datatype = image.header.datatype,
            big_endian = image.big_endian,
            "decoded NIfTI header/image pair"
        );
        Ok(VolumeImage::from_parts(
            path,
            image.header,
            image.extensions,
            Some(image.data),
        ))
    }
}

/// Header and image files of a `.hdr`/`.img` pair, when `path` names either half.
fn pair_paths(path: &Path) -> Option<(PathBuf, PathBuf)> {
    let name = path.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    let (stem_len, gz) = [".hdr.gz", ".img.gz", ".hdr", ".img"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| (name.len() - ext.len(), ext.ends_with(".gz")))?;
    let stem = &name[..stem_len];
    let suffix = if gz { ".gz" } else { "" };
    Some((
        path.with_file_name(format!("{stem}.hdr{suffix}")),
        path.with_file_name(format!("{stem}.img{suffix}")),
    ))
}

impl VolumeCodec for Nifti1Codec {
    fn read(&self, path: &Path) -> IcaResult<VolumeImage> {
        if let Some((header_path, image_path)) = pair_paths(path) {
            return self.read_pair(path, &header_path, &image_path);
        }
        let bytes = read_stream(path)?;
        self.decode(path, &bytes)
    }

    fn write(&self, path: &Path, header: &NiftiHeader, samples: &[f32]) -> IcaResult<()> {
        let expected = header.voxel_count().ok_or_else(|| {
            IcaError::invalid_argument("header describes more voxels than can be addressed")
        })?;
        if samples.len() != expected {
            return Err(IcaError::invalid_argument(format!(
                "header describes {expected} voxels but {} samples were supplied",
                samples.len()
            )));
        }
        let output_error = |source| IcaError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut bytes = encode_nifti1(header, VoxelView::Float32(samples));
        let compressed = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        if compressed {
            bytes = gzip(&bytes).map_err(output_error)?;
        }
        std::fs::write(path, bytes).map_err(output_error)
    }
}

#[cfg(test)]
#[path = "../tests/unit/codec/codec.rs"]
mod tests;
