/// NIfTI-1 voxel encodings (`datatype` header field).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoxelType {
    /// `DT_UINT8` (2).
    Uint8,
    /// `DT_INT16` (4).
    Int16,
    /// `DT_INT32` (8).
    Int32,
    /// `DT_FLOAT32` (16).
    Float32,
    /// `DT_COMPLEX64` (32).
    Complex64,
    /// `DT_FLOAT64` (64).
    Float64,
    /// `DT_RGB24` (128).
    Rgb24,
    /// `DT_INT8` (256).
    Int8,
    /// `DT_UINT16` (512).
    Uint16,
    /// `DT_UINT32` (768).
    Uint32,
    /// `DT_INT64` (1024).
    Int64,
    /// `DT_UINT64` (1280).
    Uint64,
    /// `DT_FLOAT128` (1536).
    Float128,
    /// `DT_COMPLEX128` (1792).
    Complex128,
    /// `DT_COMPLEX256` (2048).
    Complex256,
    /// `DT_RGBA32` (2304).
    Rgba32,
}

impl VoxelType {
    /// Map a header `datatype` code to an encoding.
    pub fn from_code(code: i16) -> Option<Self> {
        Some(match code {
            2 => Self::Uint8,
            4 => Self::Int16,
            8 => Self::Int32,
            16 => Self::Float32,
            32 => Self::Complex64,
            64 => Self::Float64,
            128 => Self::Rgb24,
            256 => Self::Int8,
            512 => Self::Uint16,
            768 => Self::Uint32,
            1024 => Self::Int64,
            1280 => Self::Uint64,
            1536 => Self::Float128,
            1792 => Self::Complex128,
            2048 => Self::Complex256,
            2304 => Self::Rgba32,
            _ => return None,
        })
    }

    /// Header `datatype` code.
    pub fn code(self) -> i16 {
        match self {
            Self::Uint8 => 2,
            Self::Int16 => 4,
            Self::Int32 => 8,
            Self::Float32 => 16,
            Self::Complex64 => 32,
            Self::Float64 => 64,
            Self::Rgb24 => 128,
            Self::Int8 => 256,
            Self::Uint16 => 512,
            Self::Uint32 => 768,
            Self::Int64 => 1024,
            Self::Uint64 => 1280,
            Self::Float128 => 1536,
            Self::Complex128 => 1792,
            Self::Complex256 => 2048,
            Self::Rgba32 => 2304,
        }
    }

    /// Bytes per voxel (`bitpix / 8`).
    pub fn bytes_per_voxel(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Rgb24 => 3,
            Self::Int32 | Self::Uint32 | Self::Float32 | Self::Rgba32 => 4,
            Self::Complex64 | Self::Float64 | Self::Int64 | Self::Uint64 => 8,
            Self::Float128 | Self::Complex128 => 16,
            Self::Complex256 => 32,
        }
    }

    /// Whether ingestion has a conversion to the canonical `f32` buffer.
    pub fn is_canonicalizable(self) -> bool {
        matches!(
            self,
            Self::Uint8 | Self::Uint16 | Self::Int16 | Self::Float32
        )
    }
}

impl std::fmt::Display for VoxelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uint8 => "UINT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Float32 => "FLOAT32",
            Self::Complex64 => "COMPLEX64",
            Self::Float64 => "FLOAT64",
            Self::Rgb24 => "RGB24",
            Self::Int8 => "INT8",
            Self::Uint16 => "UINT16",
            Self::Uint32 => "UINT32",
            Self::Int64 => "INT64",
            Self::Uint64 => "UINT64",
            Self::Float128 => "FLOAT128",
            Self::Complex128 => "COMPLEX128",
            Self::Complex256 => "COMPLEX256",
            Self::Rgba32 => "RGBA32",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Decoded voxel samples attached to an image.
///
/// The four canonicalizable encodings are decoded into typed vectors; every other encoding is kept
/// as raw bytes in file order.
#[derive(Clone, Debug, PartialEq)]
pub enum VoxelData {
    /// 8-bit unsigned samples.
    Uint8(Vec<u8>),
    /// 16-bit signed samples.
    Int16(Vec<i16>),
    /// 16-bit unsigned samples.
    Uint16(Vec<u16>),
    /// 32-bit float samples.
    Float32(Vec<f32>),
    /// Any other encoding, undecoded.
    Raw {
        /// Encoding of `bytes`.
        datatype: VoxelType,
        /// Sample bytes in the byte order of the source file.
        bytes: Vec<u8>,
    },
}

impl VoxelData {
    /// Encoding of the samples.
    pub fn voxel_type(&self) -> VoxelType {
        match self {
            Self::Uint8(_) => VoxelType::Uint8,
            Self::Int16(_) => VoxelType::Int16,
            Self::Uint16(_) => VoxelType::Uint16,
            Self::Float32(_) => VoxelType::Float32,
            Self::Raw { datatype, .. } => *datatype,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Uint8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Raw { datatype, bytes } => bytes.len() / datatype.bytes_per_voxel(),
        }
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the samples in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Raw { bytes, .. } => bytes.len(),
            other => other.len() * other.voxel_type().bytes_per_voxel(),
        }
    }

    /// Borrow the samples.
    pub fn view(&self) -> VoxelView<'_> {
        match self {
            Self::Uint8(v) => VoxelView::Uint8(v),
            Self::Int16(v) => VoxelView::Int16(v),
            Self::Uint16(v) => VoxelView::Uint16(v),
            Self::Float32(v) => VoxelView::Float32(v),
            Self::Raw { datatype, bytes } => VoxelView::Raw {
                datatype: *datatype,
                bytes,
            },
        }
    }
}

/// Borrowed samples, used by the encoder so callers never copy into a [`VoxelData`] to write.
#[derive(Clone, Copy, Debug)]
pub enum VoxelView<'a> {
    /// 8-bit unsigned samples.
    Uint8(&'a [u8]),
    /// 16-bit signed samples.
    Int16(&'a [i16]),
    /// 16-bit unsigned samples.
    Uint16(&'a [u16]),
    /// 32-bit float samples.
    Float32(&'a [f32]),
    /// Any other encoding, undecoded bytes.
    Raw {
        /// Encoding of `bytes`.
        datatype: VoxelType,
        /// Sample bytes in the byte order of the source file.
        bytes: &'a [u8],
    },
}

impl VoxelView<'_> {
    /// Encoding of the samples.
    pub fn voxel_type(&self) -> VoxelType {
        match self {
            Self::Uint8(_) => VoxelType::Uint8,
            Self::Int16(_) => VoxelType::Int16,
            Self::Uint16(_) => VoxelType::Uint16,
            Self::Float32(_) => VoxelType::Float32,
            Self::Raw { datatype, .. } => *datatype,
        }
    }

    pub(crate) fn append_le_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Uint8(v) => out.extend_from_slice(v),
            Self::Int16(v) => v.iter().for_each(|s| out.extend_from_slice(&s.to_le_bytes())),
            Self::Uint16(v) => v.iter().for_each(|s| out.extend_from_slice(&s.to_le_bytes())),
            Self::Float32(v) => v.iter().for_each(|s| out.extend_from_slice(&s.to_le_bytes())),
            Self::Raw { bytes, .. } => out.extend_from_slice(bytes),
        }
    }
}
