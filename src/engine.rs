//! Compute engine contract.
//!
//! The orchestrator starts an engine through an [`EngineFactory`], hands it one [`IcaJob`]
//! borrowing tracked buffers, and reads back an [`EngineRun`]. The engine writes component maps
//! into the prefix of the volume buffer, fills the mask when asked to estimate it, and writes six
//! motion parameters per timepoint.

pub(crate) mod cpu;
pub(crate) mod native;

use serde::Serialize;

use crate::engine::native::describe_native_error;
use crate::foundation::core::Geometry;
use crate::pipeline::settings::DeviceSelection;

#[derive(Clone, Copy, Debug)]
/// Borrowed quadrature filters, one complex filter per axis.
pub struct QuadratureFilters<'a> {
    /// Edge length of every filter.
    pub size: usize,
    /// Real parts (x, y, z).
    pub real: [&'a [f32]; 3],
    /// Imaginary parts (x, y, z).
    pub imag: [&'a [f32]; 3],
}

#[derive(Clone, Copy, Debug)]
/// Motion correction inputs.
pub struct MotionCorrectionJob<'a> {
    /// Filters the registration is estimated with.
    pub filters: QuadratureFilters<'a>,
    /// Iterations per volume.
    pub iterations: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Scalar configuration of one engine run.
pub struct IcaConfig {
    /// Geometry of the volume buffer.
    pub geometry: Geometry,
    /// Whether the engine estimates the mask (and writes it into the mask buffer).
    pub auto_mask: bool,
    /// Smoothing FWHM in millimetres, if smoothing is applied.
    pub smoothing_fwhm_mm: Option<f32>,
    /// Normalize every voxel time series.
    pub z_score: bool,
    /// Percentage of variance kept by whitening.
    pub variance_to_keep_percent: f64,
    /// Upper bound on produced components.
    pub requested_components: usize,
    /// Host memory held by the pipeline when the job was built.
    pub allocated_host_bytes: usize,
}

/// One engine invocation: configuration plus borrowed buffers.
///
/// `volumes` is input and output: on return its first `w*h*d*k` samples hold `k` component maps.
#[derive(Debug)]
pub struct IcaJob<'a> {
    /// Scalar settings.
    pub config: IcaConfig,
    /// Canonical samples, `timepoints` volumes of `w*h*d` voxels.
    pub volumes: &'a mut [f32],
    /// Mask, `w*h*d` voxels; filled by the engine when `config.auto_mask`.
    pub mask: &'a mut [f32],
    /// Six motion parameters per timepoint, written by the engine.
    pub motion_parameters: &'a mut [f32],
    /// Present when motion correction is requested.
    pub motion_correction: Option<MotionCorrectionJob<'a>>,
}

/// Result of [`IcaEngine::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineRun {
    /// Number of component maps written into the volume buffer.
    pub component_count: usize,
    /// Per-kernel status codes.
    pub diagnostics: KernelDiagnostics,
}

/// A started compute engine.
pub trait IcaEngine {
    /// Execute the whole analysis. Blocks until every output is written.
    fn run(&mut self, job: IcaJob<'_>) -> EngineRun;
}

/// Starts engines on a platform/device pair.
pub trait EngineFactory {
    /// Build the engine kernels and report what happened, including on failure.
    fn start(&self, selection: DeviceSelection, verbose: bool) -> EngineStartup;
}

/// Build output of one engine kernel file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildLog {
    /// Kernel source file name, e.g. `kernelMotionCorrection.cpp`.
    pub kernel_file: String,
    /// Compiler output.
    pub text: String,
}

impl BuildLog {
    /// Kernel file name without the `kernel` prefix and the extension.
    pub fn short_name(&self) -> &str {
        let name = self.kernel_file.as_str();
        let name = name.strip_prefix("kernel").unwrap_or(name);
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }
}

/// Why an engine could not be started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineInitError {
    /// Human-readable description.
    pub message: String,
    /// Native error code.
    pub native_code: i32,
    /// Kernel creation status at the time of failure.
    pub diagnostics: KernelDiagnostics,
}

/// Everything an [`EngineFactory::start`] call reports.
pub struct EngineStartup {
    /// Platform the engine selected.
    pub platform_name: String,
    /// Device the engine selected.
    pub device_name: String,
    /// One log per kernel file, written whether or not startup succeeded.
    pub build_logs: Vec<BuildLog>,
    /// The engine, or why it could not be started.
    pub engine: Result<Box<dyn IcaEngine>, EngineInitError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
/// Stage a diagnostic code was recorded in.
pub enum DiagnosticPhase {
    /// Device buffer allocation.
    CreateBuffer,
    /// Kernel construction.
    CreateKernel,
    /// Kernel execution.
    RunKernel,
}

impl std::fmt::Display for DiagnosticPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateBuffer => f.write_str("create buffer"),
            Self::CreateKernel => f.write_str("create kernel"),
            Self::RunKernel => f.write_str("run kernel"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// One non-zero status code.
pub struct DiagnosticEntry {
    /// Where it was recorded.
    pub phase: DiagnosticPhase,
    /// Kernel name, or `buffer #i` for buffer allocations.
    pub kernel: String,
    /// Native code.
    pub code: i32,
    /// Decoded code.
    pub message: String,
}

/// Per-kernel status codes reported by an engine. Zero means success.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KernelDiagnostics {
    /// Kernel names, parallel to `create_kernel_errors` and `run_kernel_errors`.
    pub kernel_names: Vec<String>,
    /// One code per device buffer.
    pub create_buffer_errors: Vec<i32>,
    /// One code per kernel.
    pub create_kernel_errors: Vec<i32>,
    /// One code per kernel.
    pub run_kernel_errors: Vec<i32>,
}

impl KernelDiagnostics {
    /// All-zero diagnostics for `names`.
    pub fn clean<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let kernel_names: Vec<String> = names.into_iter().map(Into::into).collect();
        let n = kernel_names.len();
        Self {
            kernel_names,
            create_buffer_errors: Vec::new(),
            create_kernel_errors: vec![0; n],
            run_kernel_errors: vec![0; n],
        }
    }

    /// Set the run code of `kernel`, if it is known.
    pub fn record_run_error(&mut self, kernel: &str, code: i32) {
        let slot = self
            .kernel_names
            .iter()
            .position(|k| k == kernel)
            .and_then(|i| self.run_kernel_errors.get_mut(i));
        if let Some(slot) = slot {
            *slot = code;
        }
    }

    fn kernel_name(&self, i: usize) -> String {
        self.kernel_names
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("kernel #{i}"))
    }

    /// Every non-zero code, buffers first, then kernel creation, then kernel runs.
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        let buffers = self
            .create_buffer_errors
            .iter()
            .enumerate()
            .map(|(i, &code)| (DiagnosticPhase::CreateBuffer, format!("buffer #{i}"), code));
        let creates = self
            .create_kernel_errors
            .iter()
            .enumerate()
            .map(|(i, &code)| (DiagnosticPhase::CreateKernel, self.kernel_name(i), code));
        let runs = self
            .run_kernel_errors
            .iter()
            .enumerate()
            .map(|(i, &code)| (DiagnosticPhase::RunKernel, self.kernel_name(i), code));

        buffers
            .chain(creates)
            .chain(runs)
            .filter(|(_, _, code)| *code != 0)
            .map(|(phase, kernel, code)| DiagnosticEntry {
                phase,
                kernel,
                code,
                message: describe_native_error(code).to_string(),
            })
            .collect()
    }

    /// Log every non-zero code. Returns how many were logged.
    pub fn report(&self) -> usize {
        let entries = self.entries();
        for e in &entries {
            tracing::error!(
                "{} error for {}: {} ({})",
                e.phase,
                e.kernel,
                e.message,
                e.code
            );
        }
        entries.len()
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine/engine.rs"]
mod tests;
