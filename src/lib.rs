//! fmri-ica prepares a 4-D fMRI volume for Independent Component Analysis, runs a compute engine
//! over it, and writes the component maps back as a NIfTI-1 volume.
//!
//! # Pipeline overview
//!
//! 1. **Ingest**: read the volume (and optional mask) through a [`VolumeCodec`] and canonicalize
//!    every supported voxel encoding to `f32`.
//! 2. **Filters**: when motion correction is requested, load the six quadrature filters.
//! 3. **Engine**: start an [`IcaEngine`] on the selected platform/device, hand it one [`IcaJob`]
//!    and read back the number of produced components plus per-kernel diagnostics.
//! 4. **Output**: derive the output header from the input header and write the maps.
//!
//! Every buffer and image loaded along the way is owned by a [`ResourceTracker`]. The tracker is
//! drained on every exit path, so a failure in any stage still releases each resource exactly
//! once.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod engine;
mod filters;
mod foundation;
mod ingest;
mod output;
mod pipeline;
mod resources;

pub use codec::nifti::{NIFTI1_HEADER_SIZE, NiftiExtension, NiftiHeader, encode_nifti1};
pub use codec::voxel::{VoxelData, VoxelType, VoxelView};
pub use codec::{Nifti1Codec, VolumeCodec, VolumeImage};
pub use engine::cpu::CpuEngineFactory;
pub use engine::native::{ENGINE_EMPTY_MASK, ENGINE_NON_CONVERGENCE, describe_native_error};
pub use engine::{
    BuildLog, DiagnosticEntry, DiagnosticPhase, EngineFactory, EngineInitError, EngineRun,
    EngineStartup, IcaConfig, IcaEngine, IcaJob, KernelDiagnostics, MotionCorrectionJob,
    QuadratureFilters,
};
pub use filters::bank::{FILTER_FILE_NAMES, FilterBank, load_filter_bank};
pub use foundation::core::{Dims3, Geometry, VoxelSize};
pub use foundation::error::{IcaError, IcaResult, ResourceKind};
pub use ingest::canonical::{IngestedInputs, ingest, widen_to_f32};
pub use output::materialize::{
    OutputDescriptor, derive_output_path, materialize_output, output_header,
};
pub use pipeline::environment::{BASE_DIR_VAR, EngineEnvironment, write_build_logs};
pub use pipeline::orchestrator::{RunSummary, run_ica, run_ica_with_ledger};
pub use pipeline::settings::{
    DEFAULT_OUTPUT_SUFFIX, DeviceSelection, OutputNaming, Settings, SingleVolumePolicy, Verbosity,
};
pub use resources::tracker::{
    BufferCheckout, BufferId, ImageId, LedgerSnapshot, ResourceLedger, ResourceTracker,
};
