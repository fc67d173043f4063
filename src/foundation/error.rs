use std::path::PathBuf;

use crate::codec::voxel::VoxelType;
use crate::foundation::core::Dims3;

/// Convenience result type used across the pipeline.
pub type IcaResult<T> = Result<T, IcaError>;

/// Which registry a [`IcaError::CapacityExceeded`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// Raw `f32` buffers.
    Buffer,
    /// Loaded volumetric images.
    Image,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer => f.write_str("buffer"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// Top-level error taxonomy. Every variant is terminal for the current run.
#[derive(thiserror::Error, Debug)]
pub enum IcaError {
    /// A file could not be opened or read.
    #[error("input error: could not open '{}': {source}", .path.display())]
    InputIo {
        /// Offending file.
        path: PathBuf,
        /// Underlying IO failure.
        source: std::io::Error,
    },

    /// The codec could not parse the file.
    #[error("unreadable image '{}': {reason}", .path.display())]
    UnreadableImage {
        /// Offending file.
        path: PathBuf,
        /// What the codec rejected.
        reason: String,
    },

    /// Input data that cannot support the analysis (e.g. a single timepoint).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Mask spatial dimensions differ from the volume's.
    #[error(
        "geometry mismatch: input data has the dimensions {volume}, while the mask volume has the dimensions {mask}"
    )]
    GeometryMismatch {
        /// Spatial dimensions of the primary volume.
        volume: Dims3,
        /// Spatial dimensions of the mask.
        mask: Dims3,
    },

    /// The voxel encoding has no canonical conversion.
    #[error("unsupported voxel type {datatype} in '{}'", .path.display())]
    UnsupportedVoxelType {
        /// Offending file.
        path: PathBuf,
        /// Encoding found in the header.
        datatype: VoxelType,
    },

    /// A quadrature filter file could not be opened.
    #[error("filter file missing: could not open '{}': {source}", .path.display())]
    FilterFileMissing {
        /// Expected filter location.
        path: PathBuf,
        /// Underlying IO failure.
        source: std::io::Error,
    },

    /// A quadrature filter file does not hold exactly the expected number of floats.
    #[error(
        "filter size mismatch: '{}' holds {actual_bytes} bytes, expected {expected} floats",
        .path.display()
    )]
    FilterSizeMismatch {
        /// Offending file.
        path: PathBuf,
        /// Expected element count (`filter_size^3`).
        expected: usize,
        /// File length in bytes.
        actual_bytes: u64,
    },

    /// A bounded registry is full.
    #[error("capacity exceeded: the {kind} registry holds at most {capacity} entries")]
    CapacityExceeded {
        /// Registry that overflowed.
        kind: ResourceKind,
        /// Configured bound.
        capacity: usize,
    },

    /// The compute engine could not be started.
    #[error("engine initialization failed: {message} (native error {code})")]
    EngineInitialization {
        /// Human-readable initialization error.
        message: String,
        /// Native error code reported by the engine.
        code: i32,
    },

    /// The engine returned results that break its contract.
    #[error("engine contract violation: {0}")]
    EngineContract(String),

    /// The output file could not be written.
    #[error("output write failed for '{}': {source}", .path.display())]
    OutputWrite {
        /// Output location.
        path: PathBuf,
        /// Underlying IO failure.
        source: std::io::Error,
    },

    /// Invalid settings or command-line input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Misuse of a resource handle (stale id, double checkout).
    #[error("resource error: {0}")]
    Resource(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IcaError {
    /// Build a [`IcaError::UnreadableImage`] value.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableImage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`IcaError::DegenerateInput`] value.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateInput(msg.into())
    }

    /// Build a [`IcaError::EngineContract`] value.
    pub fn engine_contract(msg: impl Into<String>) -> Self {
        Self::EngineContract(msg.into())
    }

    /// Build a [`IcaError::InvalidArgument`] value.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build a [`IcaError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Stable process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputIo { .. } => 2,
            Self::UnreadableImage { .. } => 3,
            Self::DegenerateInput(_) => 4,
            Self::GeometryMismatch { .. } => 5,
            Self::UnsupportedVoxelType { .. } => 6,
            Self::FilterFileMissing { .. } => 7,
            Self::FilterSizeMismatch { .. } => 8,
            Self::CapacityExceeded { .. } => 9,
            Self::EngineInitialization { .. } => 10,
            Self::EngineContract(_) => 11,
            Self::OutputWrite { .. } => 12,
            Self::InvalidArgument(_) => 13,
            Self::Resource(_) => 14,
            Self::Other(_) => 1,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
