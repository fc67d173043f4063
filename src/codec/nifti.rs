use std::io::{Cursor, Read as _, Write as _};
use std::ops::Range;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use nifti::{InMemNiftiObject, InMemNiftiVolume, NiftiObject};

use crate::codec::voxel::{VoxelData, VoxelType, VoxelView};
use crate::foundation::core::{Dims3, Geometry, VoxelSize};
use crate::foundation::error::{IcaError, IcaResult};

/// Size of a NIfTI-1 header in bytes.
pub const NIFTI1_HEADER_SIZE: usize = 348;

/// Size of a NIfTI-2 header in bytes.
pub const NIFTI2_HEADER_SIZE: usize = 540;

/// Offset of the voxel data in a single-file image without extensions.
pub(crate) const DEFAULT_VOX_OFFSET: usize = 352;

const MAGIC_SINGLE_FILE: [u8; 4] = *b"n+1\0";

/// NIfTI-1 header fields, in file order.
///
/// Field names follow `nifti1.h`. Values are decoded by the `nifti` crate and copied here so the
/// rest of the pipeline does not depend on its representation.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct NiftiHeader {
    pub sizeof_hdr: i32,
    pub data_type: [u8; 10],
    pub db_name: [u8; 18],
    pub extents: i32,
    pub session_error: i16,
    pub regular: u8,
    pub dim_info: u8,
    pub dim: [i16; 8],
    pub intent_p1: f32,
    pub intent_p2: f32,
    pub intent_p3: f32,
    pub intent_code: i16,
    pub datatype: i16,
    pub bitpix: i16,
    pub slice_start: i16,
    pub pixdim: [f32; 8],
    pub vox_offset: f32,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub slice_end: i16,
    pub slice_code: u8,
    pub xyzt_units: u8,
    pub cal_max: f32,
    pub cal_min: f32,
    pub slice_duration: f32,
    pub toffset: f32,
    pub glmax: i32,
    pub glmin: i32,
    pub descrip: [u8; 80],
    pub aux_file: [u8; 24],
    pub qform_code: i16,
    pub sform_code: i16,
    pub quatern_b: f32,
    pub quatern_c: f32,
    pub quatern_d: f32,
    pub qoffset_x: f32,
    pub qoffset_y: f32,
    pub qoffset_z: f32,
    pub srow_x: [f32; 4],
    pub srow_y: [f32; 4],
    pub srow_z: [f32; 4],
    pub intent_name: [u8; 16],
    pub magic: [u8; 4],
}

impl Default for NiftiHeader {
    fn default() -> Self {
        Self {
            sizeof_hdr: NIFTI1_HEADER_SIZE as i32,
            data_type: [0; 10],
            db_name: [0; 18],
            extents: 0,
            session_error: 0,
            regular: b'r',
            dim_info: 0,
            dim: [0, 1, 1, 1, 1, 1, 1, 1],
            intent_p1: 0.0,
            intent_p2: 0.0,
            intent_p3: 0.0,
            intent_code: 0,
            datatype: 0,
            bitpix: 0,
            slice_start: 0,
            pixdim: [1.0; 8],
            vox_offset: DEFAULT_VOX_OFFSET as f32,
            scl_slope: 0.0,
            scl_inter: 0.0,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: 0,
            cal_max: 0.0,
            cal_min: 0.0,
            slice_duration: 0.0,
            toffset: 0.0,
            glmax: 0,
            glmin: 0,
            descrip: [0; 80],
            aux_file: [0; 24],
            qform_code: 0,
            sform_code: 0,
            quatern_b: 0.0,
            quatern_c: 0.0,
            quatern_d: 0.0,
            qoffset_x: 0.0,
            qoffset_y: 0.0,
            qoffset_z: 0.0,
            srow_x: [0.0; 4],
            srow_y: [0.0; 4],
            srow_z: [0.0; 4],
            intent_name: [0; 16],
            magic: MAGIC_SINGLE_FILE,
        }
    }
}

fn fixed<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = src.len().min(N);
    out[..n].copy_from_slice(&src[..n]);
    out
}

impl From<&nifti::NiftiHeader> for NiftiHeader {
    fn from(h: &nifti::NiftiHeader) -> Self {
        Self {
            sizeof_hdr: h.sizeof_hdr,
            data_type: fixed(&h.data_type),
            db_name: fixed(&h.db_name),
            extents: h.extents,
            session_error: h.session_error,
            regular: h.regular,
            dim_info: h.dim_info,
            dim: std::array::from_fn(|i| h.dim[i] as i16),
            intent_p1: h.intent_p1,
            intent_p2: h.intent_p2,
            intent_p3: h.intent_p3,
            intent_code: h.intent_code,
            datatype: h.datatype,
            bitpix: h.bitpix,
            slice_start: h.slice_start,
            pixdim: h.pixdim,
            vox_offset: h.vox_offset,
            scl_slope: h.scl_slope,
            scl_inter: h.scl_inter,
            slice_end: h.slice_end,
            slice_code: h.slice_code,
            xyzt_units: h.xyzt_units,
            cal_max: h.cal_max,
            cal_min: h.cal_min,
            slice_duration: h.slice_duration,
            toffset: h.toffset,
            glmax: h.glmax,
            glmin: h.glmin,
            descrip: fixed(&h.descrip),
            aux_file: fixed(&h.aux_file),
            qform_code: h.qform_code,
            sform_code: h.sform_code,
            quatern_b: h.quatern_b,
            quatern_c: h.quatern_c,
            quatern_d: h.quatern_d,
            qoffset_x: h.quatern_x,
            qoffset_y: h.quatern_y,
            qoffset_z: h.quatern_z,
            srow_x: h.srow_x,
            srow_y: h.srow_y,
            srow_z: h.srow_z,
            intent_name: fixed(&h.intent_name),
            magic: fixed(&h.magic),
        }
    }
}

impl NiftiHeader {
    /// Header for a volume with the given geometry and encoding.
    ///
    /// `dim[0]` is 4 when there is more than one timepoint, 3 otherwise.
    pub fn for_geometry(geometry: &Geometry, voxel_type: VoxelType) -> IcaResult<Self> {
        let mut hdr = Self::default();
        let to_dim = |v: usize, what: &str| {
            i16::try_from(v).map_err(|_| {
                IcaError::invalid_argument(format!("{what} {v} exceeds the NIfTI-1 limit"))
            })
        };
        hdr.dim[0] = if geometry.timepoints > 1 { 4 } else { 3 };
        hdr.dim[1] = to_dim(geometry.dims.width, "width")?;
        hdr.dim[2] = to_dim(geometry.dims.height, "height")?;
        hdr.dim[3] = to_dim(geometry.dims.depth, "depth")?;
        hdr.dim[4] = to_dim(geometry.timepoints.max(1), "timepoints")?;
        hdr.pixdim[1] = geometry.voxel_size.x;
        hdr.pixdim[2] = geometry.voxel_size.y;
        hdr.pixdim[3] = geometry.voxel_size.z;
        hdr.set_voxel_type(voxel_type);
        Ok(hdr)
    }

    /// Encoding declared by `datatype`, if it is a known code.
    pub fn voxel_type(&self) -> Option<VoxelType> {
        VoxelType::from_code(self.datatype)
    }

    /// Set `datatype` and the matching `bitpix`.
    pub fn set_voxel_type(&mut self, voxel_type: VoxelType) {
        self.datatype = voxel_type.code();
        self.bitpix = (voxel_type.bytes_per_voxel() * 8) as i16;
    }

    /// Number of used dimensions (`dim[0]`, clamped to 1..=7).
    pub fn ndim(&self) -> usize {
        self.dim[0].clamp(1, 7) as usize
    }

    /// Extent of dimension `axis` (1-based), treating unused or non-positive extents as 1.
    pub fn extent(&self, axis: usize) -> usize {
        if axis == 0 || axis > self.ndim() {
            return 1;
        }
        self.dim[axis].max(1) as usize
    }

    /// Spatial extent.
    pub fn dims3(&self) -> Dims3 {
        Dims3::new(self.extent(1), self.extent(2), self.extent(3))
    }

    /// Total number of voxels over every used dimension, `None` when it does not fit a `usize`.
    pub fn voxel_count(&self) -> Option<usize> {
        (1..=self.ndim()).try_fold(1usize, |acc, axis| acc.checked_mul(self.extent(axis)))
    }

    /// Geometry view of the header (time extent is `dim[4]`).
    pub fn geometry(&self) -> Geometry {
        Geometry {
            dims: self.dims3(),
            timepoints: self.extent(4),
            voxel_size: VoxelSize {
                x: self.pixdim[1],
                y: self.pixdim[2],
                z: self.pixdim[3],
            },
        }
    }

    /// Byte range of the voxel data inside a data stream of `stream_len` bytes.
    ///
    /// Offsets below `min_offset` are raised to it. Every product and sum is checked, so a
    /// header describing more data than the stream holds is an error rather than a panic.
    pub(crate) fn data_range(
        &self,
        min_offset: usize,
        stream_len: usize,
    ) -> Result<Range<usize>, String> {
        let datatype = self
            .voxel_type()
            .ok_or_else(|| format!("unknown datatype code {}", self.datatype))?;
        let count = self.voxel_count().ok_or_else(|| {
            format!(
                "dimensions {:?} describe more voxels than can be addressed",
                &self.dim[1..=self.ndim()]
            )
        })?;
        let len = count
            .checked_mul(datatype.bytes_per_voxel())
            .ok_or_else(|| format!("{count} voxels of {datatype} exceed the addressable size"))?;

        if !self.vox_offset.is_finite() || self.vox_offset < 0.0 {
            return Err(format!("vox_offset {} is not a valid offset", self.vox_offset));
        }
        if f64::from(self.vox_offset) > stream_len as f64 {
            return Err(format!(
                "vox_offset {} lies past the end of the data ({stream_len} bytes)",
                self.vox_offset
            ));
        }
        let start = (self.vox_offset as usize).max(min_offset);
        start
            .checked_add(len)
            .filter(|&end| end <= stream_len)
            .map(|end| start..end)
            .ok_or_else(|| {
                format!(
                    "voxel data truncated: need {len} bytes at offset {start}, have {stream_len}"
                )
            })
    }

    /// Encode as a little-endian NIfTI-1 header.
    pub(crate) fn to_le_bytes(&self) -> [u8; NIFTI1_HEADER_SIZE] {
        let mut w = FieldWriter {
            out: [0u8; NIFTI1_HEADER_SIZE],
            pos: 0,
        };
        w.i32(NIFTI1_HEADER_SIZE as i32);
        w.bytes(&self.data_type);
        w.bytes(&self.db_name);
        w.i32(self.extents);
        w.i16(self.session_error);
        w.bytes(&[self.regular, self.dim_info]);
        self.dim.iter().for_each(|&v| w.i16(v));
        w.f32(self.intent_p1);
        w.f32(self.intent_p2);
        w.f32(self.intent_p3);
        w.i16(self.intent_code);
        w.i16(self.datatype);
        w.i16(self.bitpix);
        w.i16(self.slice_start);
        self.pixdim.iter().for_each(|&v| w.f32(v));
        w.f32(self.vox_offset);
        w.f32(self.scl_slope);
        w.f32(self.scl_inter);
        w.i16(self.slice_end);
        w.bytes(&[self.slice_code, self.xyzt_units]);
        w.f32(self.cal_max);
        w.f32(self.cal_min);
        w.f32(self.slice_duration);
        w.f32(self.toffset);
        w.i32(self.glmax);
        w.i32(self.glmin);
        w.bytes(&self.descrip);
        w.bytes(&self.aux_file);
        w.i16(self.qform_code);
        w.i16(self.sform_code);
        w.f32(self.quatern_b);
        w.f32(self.quatern_c);
        w.f32(self.quatern_d);
        w.f32(self.qoffset_x);
        w.f32(self.qoffset_y);
        w.f32(self.qoffset_z);
        self.srow_x.iter().for_each(|&v| w.f32(v));
        self.srow_y.iter().for_each(|&v| w.f32(v));
        self.srow_z.iter().for_each(|&v| w.f32(v));
        w.bytes(&self.intent_name);
        w.bytes(&MAGIC_SINGLE_FILE);
        debug_assert_eq!(w.pos, NIFTI1_HEADER_SIZE);
        w.out
    }
}

/// Fixed-size little-endian field writer over the 348-byte header.
struct FieldWriter {
    out: [u8; NIFTI1_HEADER_SIZE],
    pos: usize,
}

impl FieldWriter {
    fn bytes(&mut self, b: &[u8]) {
        self.out[self.pos..self.pos + b.len()].copy_from_slice(b);
        self.pos += b.len();
    }

    fn i16(&mut self, v: i16) {
        LittleEndian::write_i16(&mut self.out[self.pos..self.pos + 2], v);
        self.pos += 2;
    }

    fn i32(&mut self, v: i32) {
        LittleEndian::write_i32(&mut self.out[self.pos..self.pos + 4], v);
        self.pos += 4;
    }

    fn f32(&mut self, v: f32) {
        LittleEndian::write_f32(&mut self.out[self.pos..self.pos + 4], v);
        self.pos += 4;
    }
}

/// One NIfTI-1 header extension block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NiftiExtension {
    /// `ecode` of the block.
    pub code: i32,
    /// Payload (block size minus the 8-byte block header).
    pub data: Vec<u8>,
}

pub(crate) fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Gunzip `bytes` when they carry the gzip magic, otherwise return them unchanged.
pub(crate) fn inflate(bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
    if !is_gzip(&bytes) {
        return Ok(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(Cursor::new(bytes)).read_to_end(&mut out)?;
    Ok(out)
}

pub(crate) fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// On-disk header layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layout {
    Nifti1,
    Nifti2,
}

impl Layout {
    fn header_size(self) -> usize {
        match self {
            Self::Nifti1 => NIFTI1_HEADER_SIZE,
            Self::Nifti2 => NIFTI2_HEADER_SIZE,
        }
    }

    /// Smallest data offset of a single-file image (header plus extension flag).
    fn single_file_offset(self) -> usize {
        self.header_size() + 4
    }
}

/// Layout and byte order of a header, from the value of its leading `sizeof_hdr` field.
pub(crate) fn detect_layout(header_bytes: &[u8]) -> Result<(Layout, bool), String> {
    let too_small = |need: usize| {
        format!("file too small ({} bytes, need at least {need})", header_bytes.len())
    };
    if header_bytes.len() < NIFTI1_HEADER_SIZE {
        return Err(too_small(NIFTI1_HEADER_SIZE));
    }
    let le = LittleEndian::read_i32(&header_bytes[..4]);
    let be = BigEndian::read_i32(&header_bytes[..4]);
    let (layout, big_endian) = match (le, be) {
        (348, _) => (Layout::Nifti1, false),
        (_, 348) => (Layout::Nifti1, true),
        (540, _) => (Layout::Nifti2, false),
        (_, 540) => (Layout::Nifti2, true),
        _ => {
            return Err(format!("sizeof_hdr is {le}, expected 348 (NIfTI-1) or 540 (NIfTI-2)"));
        }
    };
    if header_bytes.len() < layout.header_size() {
        return Err(too_small(layout.header_size()));
    }
    Ok((layout, big_endian))
}

/// NIfTI-1 header through the `nifti` crate.
fn read_header(header_bytes: &[u8]) -> Result<nifti::NiftiHeader, String> {
    nifti::NiftiHeader::from_reader(Cursor::new(header_bytes)).map_err(|e| e.to_string())
}

/// Narrow a 540-byte NIfTI-2 header onto the NIfTI-1 fields the pipeline works with.
///
/// Extents must fit the NIfTI-1 range, since the output is always written as NIfTI-1.
fn nifti2_header<E: ByteOrder>(b: &[u8]) -> Result<NiftiHeader, String> {
    let magic = &b[4..12];
    if magic != b"n+2\0\r\n\x1a\n" && magic != b"ni2\0\r\n\x1a\n" {
        return Err(format!("bad NIfTI-2 magic {:?}", &magic[..4]));
    }
    let i16_at = |at: usize| E::read_i16(&b[at..at + 2]);
    let i32_at = |at: usize| E::read_i32(&b[at..at + 4]);
    let i64_at = |at: usize| E::read_i64(&b[at..at + 8]);
    let f32_at = |at: usize| E::read_f64(&b[at..at + 8]) as f32;

    let ndim = i64_at(16);
    if !(1..=7).contains(&ndim) {
        return Err(format!("dim[0] is {ndim}, expected 1..=7"));
    }
    let mut dim = [1i16; 8];
    dim[0] = ndim as i16;
    for axis in 1..=ndim as usize {
        let extent = i64_at(16 + axis * 8);
        dim[axis] = i16::try_from(extent)
            .map_err(|_| format!("dim[{axis}] = {extent} exceeds the NIfTI-1 range"))?;
    }
    let vox_offset = i64_at(168);
    if !(0..=1 << 24).contains(&vox_offset) {
        return Err(format!("vox_offset {vox_offset} is not a valid offset"));
    }

    Ok(NiftiHeader {
        sizeof_hdr: NIFTI2_HEADER_SIZE as i32,
        dim_info: b[524],
        dim,
        intent_p1: f32_at(80),
        intent_p2: f32_at(88),
        intent_p3: f32_at(96),
        intent_code: i32_at(504) as i16,
        datatype: i16_at(12),
        bitpix: i16_at(14),
        slice_start: i64_at(224) as i16,
        pixdim: std::array::from_fn(|i| f32_at(104 + i * 8)),
        vox_offset: vox_offset as f32,
        scl_slope: f32_at(176),
        scl_inter: f32_at(184),
        slice_end: i64_at(232) as i16,
        slice_code: i32_at(496) as u8,
        xyzt_units: i32_at(500) as u8,
        cal_max: f32_at(192),
        cal_min: f32_at(200),
        slice_duration: f32_at(208),
        toffset: f32_at(216),
        descrip: fixed(&b[240..320]),
        aux_file: fixed(&b[320..344]),
        qform_code: i32_at(344) as i16,
        sform_code: i32_at(348) as i16,
        quatern_b: f32_at(352),
        quatern_c: f32_at(360),
        quatern_d: f32_at(368),
        qoffset_x: f32_at(376),
        qoffset_y: f32_at(384),
        qoffset_z: f32_at(392),
        srow_x: std::array::from_fn(|i| f32_at(400 + i * 8)),
        srow_y: std::array::from_fn(|i| f32_at(432 + i * 8)),
        srow_z: std::array::from_fn(|i| f32_at(464 + i * 8)),
        intent_name: fixed(&b[508..524]),
        magic: fixed(&b[4..8]),
        ..NiftiHeader::default()
    })
}

fn read_nifti2_header(header_bytes: &[u8], big_endian: bool) -> Result<NiftiHeader, String> {
    if big_endian {
        nifti2_header::<BigEndian>(header_bytes)
    } else {
        nifti2_header::<LittleEndian>(header_bytes)
    }
}

/// Parts of one decoded image.
#[derive(Debug)]
pub(crate) struct DecodedImage {
    pub(crate) header: NiftiHeader,
    pub(crate) extensions: Vec<NiftiExtension>,
    pub(crate) data: VoxelData,
    pub(crate) big_endian: bool,
}

/// Decode a single-file image (`n+1` or `n+2`) held in memory, already decompressed.
///
/// NIfTI-2 extensions are not kept.
pub(crate) fn decode_single_file(bytes: &[u8]) -> Result<DecodedImage, String> {
    let (layout, big_endian) = detect_layout(bytes)?;
    let min_offset = layout.single_file_offset();

    if layout == Layout::Nifti2 {
        let header = read_nifti2_header(bytes, big_endian)?;
        let range = header.data_range(min_offset, bytes.len())?;
        let data = decode_payload(&bytes[range.clone()], &header, range.len(), big_endian)?;
        return Ok(DecodedImage {
            header,
            extensions: Vec::new(),
            data,
            big_endian,
        });
    }

    let raw = read_header(bytes)?;
    let header = NiftiHeader::from(&raw);
    let range = header.data_range(min_offset, bytes.len())?;

    let object = InMemNiftiObject::from_reader(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let extensions = object
        .extensions()
        .iter()
        .map(|ext| NiftiExtension {
            code: ext.code(),
            data: ext.data().to_vec(),
        })
        .collect();
    let payload = object.into_volume().into_raw_data();
    let data = decode_payload(&payload, &header, range.len(), big_endian)?;
    Ok(DecodedImage {
        header,
        extensions,
        data,
        big_endian,
    })
}

/// Decode a header/image pair (`ni1` or `ni2`); both streams already decompressed.
pub(crate) fn decode_pair(header_bytes: &[u8], image_bytes: &[u8]) -> Result<DecodedImage, String> {
    let (layout, big_endian) = detect_layout(header_bytes)?;
    let (header, payload) = match layout {
        Layout::Nifti1 => {
            let raw = read_header(header_bytes)?;
            let header = NiftiHeader::from(&raw);
            let range = header.data_range(0, image_bytes.len())?;
            let volume = InMemNiftiVolume::from_reader(Cursor::new(&image_bytes[range]), &raw)
                .map_err(|e| e.to_string())?;
            (header, volume.into_raw_data())
        }
        Layout::Nifti2 => {
            let header = read_nifti2_header(header_bytes, big_endian)?;
            let range = header.data_range(0, image_bytes.len())?;
            (header, image_bytes[range].to_vec())
        }
    };
    let len = payload.len();
    let data = decode_payload(&payload, &header, len, big_endian)?;
    Ok(DecodedImage {
        header,
        extensions: Vec::new(),
        data,
        big_endian,
    })
}

fn decode_payload(
    payload: &[u8],
    header: &NiftiHeader,
    len: usize,
    big_endian: bool,
) -> Result<VoxelData, String> {
    let datatype = header
        .voxel_type()
        .ok_or_else(|| format!("unknown datatype code {}", header.datatype))?;
    let payload = payload.get(..len).ok_or_else(|| {
        format!(
            "voxel data truncated: need {len} bytes, decoded {}",
            payload.len()
        )
    })?;
    Ok(if big_endian {
        decode_voxels::<BigEndian>(payload, datatype)
    } else {
        decode_voxels::<LittleEndian>(payload, datatype)
    })
}

/// Decode a voxel payload whose length matches `datatype`.
pub(crate) fn decode_voxels<E: ByteOrder>(payload: &[u8], datatype: VoxelType) -> VoxelData {
    match datatype {
        VoxelType::Uint8 => VoxelData::Uint8(payload.to_vec()),
        VoxelType::Int16 => {
            let mut out = vec![0i16; payload.len() / 2];
            E::read_i16_into(payload, &mut out);
            VoxelData::Int16(out)
        }
        VoxelType::Uint16 => {
            let mut out = vec![0u16; payload.len() / 2];
            E::read_u16_into(payload, &mut out);
            VoxelData::Uint16(out)
        }
        VoxelType::Float32 => {
            let mut out = vec![0f32; payload.len() / 4];
            E::read_f32_into(payload, &mut out);
            VoxelData::Float32(out)
        }
        other => VoxelData::Raw {
            datatype: other,
            bytes: payload.to_vec(),
        },
    }
}

/// Encode a single-file NIfTI-1 image without extensions.
///
/// `datatype`/`bitpix` are taken from `data`; `vox_offset` is forced to 352.
pub fn encode_nifti1(header: &NiftiHeader, data: VoxelView<'_>) -> Vec<u8> {
    let mut hdr = header.clone();
    hdr.set_voxel_type(data.voxel_type());
    hdr.vox_offset = DEFAULT_VOX_OFFSET as f32;

    let mut out = Vec::with_capacity(DEFAULT_VOX_OFFSET);
    out.extend_from_slice(&hdr.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    data.append_le_bytes(&mut out);
    out
}

/// Read a file, gunzipping it when it is compressed.
pub(crate) fn read_stream(path: &Path) -> IcaResult<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| IcaError::InputIo {
        path: path.to_path_buf(),
        source,
    })?;
    inflate(bytes).map_err(|e| IcaError::unreadable(path, format!("gzip stream: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/codec/nifti.rs"]
mod tests;
