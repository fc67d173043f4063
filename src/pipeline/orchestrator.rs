use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::codec::VolumeCodec;
use crate::engine::native::describe_native_error;
use crate::engine::{
    EngineFactory, EngineStartup, IcaConfig, IcaJob, MotionCorrectionJob, QuadratureFilters,
};
use crate::filters::bank::{FilterBank, load_filter_bank};
use crate::foundation::core::Geometry;
use crate::foundation::error::{IcaError, IcaResult};
use crate::ingest::canonical::ingest;
use crate::output::materialize::materialize_output;
use crate::pipeline::environment::{EngineEnvironment, write_build_logs};
use crate::pipeline::settings::Settings;
use crate::resources::tracker::{BufferCheckout, ResourceLedger, ResourceTracker};

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Outcome of a successful [`run_ica`].
pub struct RunSummary {
    /// File the component maps were written to.
    pub output_path: PathBuf,
    /// Geometry of the input volume.
    pub geometry: Geometry,
    /// Number of component maps written.
    pub component_count: usize,
    /// Buffers released at teardown.
    pub buffers_released: usize,
    /// Images released at teardown.
    pub images_released: usize,
    /// Non-zero engine status codes reported.
    pub diagnostics: usize,
}

struct Completed {
    output_path: PathBuf,
    geometry: Geometry,
    component_count: usize,
    diagnostics: usize,
}

struct StageClock {
    verbose: bool,
    last: Instant,
}

impl StageClock {
    fn new(verbose: bool) -> Self {
        Self {
            verbose,
            last: Instant::now(),
        }
    }

    fn lap(&mut self, what: &str) {
        let now = Instant::now();
        if self.verbose {
            tracing::debug!(
                "It took {:.3} seconds to {what}",
                now.duration_since(self.last).as_secs_f64()
            );
        }
        self.last = now;
    }
}

/// Run the whole pipeline once.
///
/// Equivalent to [`run_ica_with_ledger`] with a private ledger.
pub fn run_ica(
    settings: &Settings,
    env: &EngineEnvironment,
    codec: &dyn VolumeCodec,
    engines: &dyn EngineFactory,
) -> IcaResult<RunSummary> {
    run_ica_with_ledger(
        settings,
        env,
        codec,
        engines,
        Arc::new(ResourceLedger::default()),
    )
}

/// Run the whole pipeline once, counting registrations and releases in `ledger`.
///
/// Every resource is released before this returns, whether the run succeeded or not.
#[tracing::instrument(skip_all, fields(input = %settings.input.display()))]
pub fn run_ica_with_ledger(
    settings: &Settings,
    env: &EngineEnvironment,
    codec: &dyn VolumeCodec,
    engines: &dyn EngineFactory,
    ledger: Arc<ResourceLedger>,
) -> IcaResult<RunSummary> {
    settings.validate()?;

    let mut tracker = ResourceTracker::with_ledger(settings.resource_capacity, ledger);
    let outcome = execute(settings, env, codec, engines, &mut tracker);

    let buffers_released = tracker.release_all_buffers();
    let images_released = tracker.release_all_images();
    tracing::debug!(buffers_released, images_released, "pipeline resources released");

    let done = outcome?;
    let summary = RunSummary {
        output_path: done.output_path,
        geometry: done.geometry,
        component_count: done.component_count,
        buffers_released,
        images_released,
        diagnostics: done.diagnostics,
    };
    match serde_json::to_string(&summary) {
        Ok(json) => tracing::debug!(summary = %json, "run complete"),
        Err(e) => tracing::debug!("run complete (summary not serializable: {e})"),
    }
    Ok(summary)
}

fn quadrature_filters<'a>(
    checkout: &mut BufferCheckout<'a>,
    bank: &FilterBank,
) -> IcaResult<QuadratureFilters<'a>> {
    let [rx, ry, rz] = bank.real;
    let [ix, iy, iz] = bank.imag;
    Ok(QuadratureFilters {
        size: bank.size,
        real: [
            checkout.shared(rx)?,
            checkout.shared(ry)?,
            checkout.shared(rz)?,
        ],
        imag: [
            checkout.shared(ix)?,
            checkout.shared(iy)?,
            checkout.shared(iz)?,
        ],
    })
}

fn execute(
    settings: &Settings,
    env: &EngineEnvironment,
    codec: &dyn VolumeCodec,
    engines: &dyn EngineFactory,
    tracker: &mut ResourceTracker,
) -> IcaResult<Completed> {
    let mut clock = StageClock::new(settings.verbose());

    let inputs = ingest(settings, codec, tracker)?;
    tracker.image_mut(inputs.volume_image)?.free_extensions();
    clock.lap("read the data");

    let filters = if settings.motion_correction {
        let bank = load_filter_bank(&env.filters_dir(), settings.filter_size, tracker)?;
        clock.lap("load the quadrature filters");
        Some(bank)
    } else {
        None
    };

    let startup = engines.start(settings.device_selection(), settings.verbose());
    write_build_logs(env, &startup);
    let EngineStartup {
        platform_name,
        device_name,
        engine,
        ..
    } = startup;
    let mut engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Initialization error is \"{}\"", e.message);
            tracing::error!(
                "native error {}: {}",
                e.native_code,
                describe_native_error(e.native_code)
            );
            e.diagnostics.report();
            return Err(IcaError::EngineInitialization {
                message: e.message,
                code: e.native_code,
            });
        }
    };
    tracing::info!(platform = %platform_name, device = %device_name, "engine started");
    clock.lap("start the engine");

    let config = IcaConfig {
        geometry: inputs.geometry,
        auto_mask: inputs.auto_mask,
        smoothing_fwhm_mm: settings.smoothing_fwhm_mm,
        z_score: settings.z_score,
        variance_to_keep_percent: settings.variance_to_keep_percent,
        requested_components: settings.requested_components,
        allocated_host_bytes: tracker.allocated_bytes(),
    };
    tracing::debug!(
        allocated_host_bytes = config.allocated_host_bytes,
        "engine job configured"
    );

    let run = {
        let mut checkout = tracker.checkout();
        let volumes = checkout.exclusive(inputs.volumes)?;
        let mask = checkout.exclusive(inputs.mask)?;
        let motion_parameters = checkout.exclusive(inputs.motion_parameters)?;
        let motion_correction = match &filters {
            Some(bank) => Some(MotionCorrectionJob {
                filters: quadrature_filters(&mut checkout, bank)?,
                iterations: settings.motion_iterations,
            }),
            None => None,
        };
        engine.run(IcaJob {
            config,
            volumes,
            mask,
            motion_parameters,
            motion_correction,
        })
    };
    drop(engine);
    clock.lap("run the engine");

    let diagnostics = run.diagnostics.report();
    let component_count = run.component_count;
    if component_count == 0 {
        return Err(IcaError::engine_contract("the engine produced no components"));
    }
    if component_count > settings.requested_components {
        return Err(IcaError::engine_contract(format!(
            "the engine produced {component_count} components, {} were requested",
            settings.requested_components
        )));
    }
    if component_count < settings.requested_components {
        tracing::info!(
            "the engine produced {component_count} of {} requested components",
            settings.requested_components
        );
    }

    let header = tracker.image(inputs.volume_image)?.header();
    let volumes = tracker.buffer(inputs.volumes)?;
    let output = materialize_output(settings, codec, header, component_count, volumes)?;
    clock.lap("write the results");

    Ok(Completed {
        output_path: output.path,
        geometry: inputs.geometry,
        component_count,
        diagnostics,
    })
}
