use std::path::PathBuf;

use serde::Serialize;

use crate::foundation::error::{IcaError, IcaResult};

/// Suffix appended to the input stem when the output name is derived.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_ica";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
/// Compute platform and device indices handed to the engine factory.
pub struct DeviceSelection {
    /// Platform index.
    pub platform: u32,
    /// Device index within the platform.
    pub device: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
/// Where the component maps are written.
pub enum OutputNaming {
    /// `<input stem>_ica.nii` next to the input.
    #[default]
    Derived,
    /// The given path, verbatim.
    Explicit(PathBuf),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
/// What to do with an input that has a single timepoint.
pub enum SingleVolumePolicy {
    /// Log a warning and continue.
    #[default]
    Warn,
    /// Fail with [`IcaError::DegenerateInput`].
    Abort,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
/// How much the run reports.
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Stage summaries.
    #[default]
    Normal,
    /// Stage summaries plus timings and engine build output.
    Verbose,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Run configuration. Built once, then borrowed read-only by every stage.
pub struct Settings {
    /// 4-D input volume.
    pub input: PathBuf,
    /// Compute platform index.
    pub platform: u32,
    /// Compute device index.
    pub device: u32,
    /// Smoothing kernel FWHM in millimetres; `None` disables smoothing.
    pub smoothing_fwhm_mm: Option<f32>,
    /// Register every volume to the first before ICA.
    pub motion_correction: bool,
    /// Percentage of variance kept by the whitening step, in `(0, 100)`.
    pub variance_to_keep_percent: f64,
    /// Explicit brain mask; `None` lets the engine estimate one.
    pub mask: Option<PathBuf>,
    /// Normalize every voxel time series before ICA.
    pub z_score: bool,
    /// Upper bound on the number of independent components.
    pub requested_components: usize,
    /// Edge length of the quadrature filters.
    pub filter_size: usize,
    /// Motion correction iterations per volume.
    pub motion_iterations: usize,
    /// Output location.
    pub output: OutputNaming,
    /// Allow replacing an existing derived output file.
    pub allow_overwrite: bool,
    /// Handling of inputs with a single timepoint.
    pub single_volume_policy: SingleVolumePolicy,
    /// Reporting level.
    pub verbosity: Verbosity,
    /// Extra engine diagnostics.
    pub debug: bool,
    /// Bound on live buffers and on live images; `None` is unbounded.
    pub resource_capacity: Option<usize>,
}

impl Settings {
    /// Default smoothing amount when smoothing is requested without a value.
    pub const DEFAULT_SMOOTHING_FWHM_MM: f32 = 6.0;

    /// Defaults for `input`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            platform: 0,
            device: 0,
            smoothing_fwhm_mm: None,
            motion_correction: false,
            variance_to_keep_percent: 80.0,
            mask: None,
            z_score: false,
            requested_components: 55,
            filter_size: 7,
            motion_iterations: 5,
            output: OutputNaming::Derived,
            allow_overwrite: false,
            single_volume_policy: SingleVolumePolicy::Warn,
            verbosity: Verbosity::Normal,
            debug: false,
            resource_capacity: None,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> IcaResult<()> {
        if let Some(fwhm) = self
            .smoothing_fwhm_mm
            .filter(|f| !(f.is_finite() && *f > 0.0))
        {
            return Err(IcaError::invalid_argument(format!(
                "smoothing must be a positive number of millimetres, got {fwhm}"
            )));
        }
        if !(self.variance_to_keep_percent > 0.0 && self.variance_to_keep_percent < 100.0) {
            return Err(IcaError::invalid_argument(format!(
                "variance to keep must be in (0, 100), got {}",
                self.variance_to_keep_percent
            )));
        }
        if self.requested_components == 0 {
            return Err(IcaError::invalid_argument("number of components must be at least 1"));
        }
        if self.filter_size < 3 || self.filter_size.is_multiple_of(2) {
            return Err(IcaError::invalid_argument(format!(
                "filter size must be odd and at least 3, got {}",
                self.filter_size
            )));
        }
        if self.motion_correction && self.motion_iterations == 0 {
            return Err(IcaError::invalid_argument(
                "motion correction needs at least one iteration",
            ));
        }
        if self.resource_capacity == Some(0) {
            return Err(IcaError::invalid_argument("resource capacity must be at least 1 when set"));
        }
        Ok(())
    }

    /// Whether the engine estimates the mask itself.
    pub fn auto_mask(&self) -> bool {
        self.mask.is_none()
    }

    /// Platform/device pair for the engine factory.
    pub fn device_selection(&self) -> DeviceSelection {
        DeviceSelection {
            platform: self.platform,
            device: self.device,
        }
    }

    /// Whether stage timings and build output are reported.
    pub fn verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose || self.debug
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/settings.rs"]
mod tests;
