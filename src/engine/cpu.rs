//! Reference engine running every stage on the host.

mod ica;
mod motion;
mod smoothing;

use std::time::Instant;

use crate::engine::native::{ENGINE_EMPTY_MASK, ENGINE_NON_CONVERGENCE};
use crate::engine::{
    BuildLog, EngineFactory, EngineInitError, EngineRun, EngineStartup, IcaEngine, IcaJob,
    KernelDiagnostics,
};
use crate::pipeline::settings::DeviceSelection;

const PLATFORM_NAME: &str = "CPU";
const DEVICE_NAME: &str = "reference";

const CL_INVALID_PLATFORM: i32 = -32;
const CL_INVALID_DEVICE: i32 = -33;

/// Stage kernels in execution order.
const KERNELS: [&str; 6] = [
    "MotionCorrection",
    "Smoothing",
    "Masking",
    "ZScore",
    "Whitening",
    "FastICA",
];

/// Starts [`CpuEngine`]s. Only platform 0, device 0 exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuEngineFactory;

impl EngineFactory for CpuEngineFactory {
    fn start(&self, selection: DeviceSelection, verbose: bool) -> EngineStartup {
        let failure = if selection.platform != 0 {
            Some((
                format!(
                    "platform {} does not exist, the only platform is 0 ({PLATFORM_NAME})",
                    selection.platform
                ),
                CL_INVALID_PLATFORM,
            ))
        } else if selection.device != 0 {
            Some((
                format!(
                    "device {} does not exist on platform 0, the only device is 0 ({DEVICE_NAME})",
                    selection.device
                ),
                CL_INVALID_DEVICE,
            ))
        } else {
            None
        };

        let build_logs = KERNELS
            .iter()
            .map(|k| BuildLog {
                kernel_file: format!("kernel{k}.cpp"),
                text: match &failure {
                    Some((message, _)) => format!("{k}: not built: {message}\n"),
                    None if verbose => format!(
                        "{k}: built for {PLATFORM_NAME}/{DEVICE_NAME} with {} worker threads\n",
                        rayon::current_num_threads()
                    ),
                    None => format!("{k}: built\n"),
                },
            })
            .collect();

        let engine: Result<Box<dyn IcaEngine>, EngineInitError> = match failure {
            Some((message, native_code)) => Err(EngineInitError {
                message,
                native_code,
                diagnostics: KernelDiagnostics {
                    create_kernel_errors: vec![native_code; KERNELS.len()],
                    ..KernelDiagnostics::clean(KERNELS)
                },
            }),
            None => Ok(Box::new(CpuEngine { verbose })),
        };

        EngineStartup {
            platform_name: PLATFORM_NAME.to_string(),
            device_name: DEVICE_NAME.to_string(),
            build_logs,
            engine,
        }
    }
}

/// Host implementation of the ICA engine contract.
#[derive(Debug)]
pub(crate) struct CpuEngine {
    verbose: bool,
}

impl CpuEngine {
    fn timed<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        if self.verbose {
            tracing::debug!(
                "It took {:.3} seconds to run {stage}",
                start.elapsed().as_secs_f64()
            );
        }
        out
    }
}

impl IcaEngine for CpuEngine {
    fn run(&mut self, job: IcaJob<'_>) -> EngineRun {
        let IcaJob {
            config,
            volumes,
            mask,
            motion_parameters,
            motion_correction,
        } = job;
        let geometry = config.geometry;
        let nvox = geometry.spatial_voxels();
        let t = geometry.timepoints;

        let mut diagnostics = KernelDiagnostics::clean(KERNELS);
        // volumes, mask, motion parameters, plus six filter arrays when correcting motion
        let buffers = if motion_correction.is_some() { 9 } else { 3 };
        diagnostics.create_buffer_errors = vec![0; buffers];

        let too_small =
            volumes.len() < nvox * t || mask.len() < nvox || motion_parameters.len() < 6 * t;
        if nvox == 0 || t == 0 || too_small {
            diagnostics.record_run_error("Masking", ENGINE_EMPTY_MASK);
            return EngineRun {
                component_count: 0,
                diagnostics,
            };
        }

        match &motion_correction {
            Some(mc) => self.timed("motion correction", || {
                motion::correct_motion(&mut volumes[..], &mut motion_parameters[..], &geometry, mc)
            }),
            None => motion_parameters.fill(0.0),
        }

        if let Some(fwhm) = config.smoothing_fwhm_mm {
            self.timed("smoothing", || {
                smoothing::smooth_volumes(&mut volumes[..nvox * t], &geometry, fwhm)
            });
        }

        if config.auto_mask {
            ica::estimate_mask(volumes, nvox, t, &mut mask[..nvox]);
        }
        let voxels = ica::masked_indices(&mask[..nvox]);
        tracing::debug!(in_mask = voxels.len(), of = nvox, "mask ready");
        if voxels.is_empty() {
            diagnostics.record_run_error("Masking", ENGINE_EMPTY_MASK);
            return EngineRun {
                component_count: 0,
                diagnostics,
            };
        }

        let x = ica::observation_matrix(volumes, nvox, t, &voxels, config.z_score);
        let whitened = self.timed("whitening", || {
            ica::whiten(
                &x,
                config.variance_to_keep_percent,
                config.requested_components,
            )
        });
        drop(x);
        let k = whitened.components;
        tracing::debug!(
            components = k,
            explained_percent = whitened.explained_percent,
            "whitening done"
        );

        let separation = self.timed("FastICA", || ica::fast_ica(&whitened.data));
        if !separation.converged {
            diagnostics.record_run_error("FastICA", ENGINE_NON_CONVERGENCE);
        }
        tracing::debug!(
            iterations = separation.iterations,
            converged = separation.converged,
            "FastICA done"
        );

        for c in 0..k {
            let map = &mut volumes[c * nvox..(c + 1) * nvox];
            map.fill(0.0);
            for (j, &v) in voxels.iter().enumerate() {
                map[v] = separation.sources[(c, j)] as f32;
            }
        }

        EngineRun {
            component_count: k,
            diagnostics,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/cpu/engine.rs"]
mod tests;
