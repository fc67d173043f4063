use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ica",
    version,
    about = "Independent component analysis of a 4-D fMRI volume",
    after_help = "Options may also be written with a single dash, e.g. -mask brain.nii"
)]
struct Cli {
    /// Input fMRI volume (NIfTI: .nii, .nii.gz or .hdr/.img).
    input: PathBuf,

    /// OpenCL-style platform index.
    #[arg(long, default_value_t = 0)]
    platform: u32,

    /// Device index on the selected platform.
    #[arg(long, default_value_t = 0)]
    device: u32,

    /// Smooth with a Gaussian of this FWHM in millimetres.
    #[arg(long, value_name = "MM", value_parser = parse_smoothing)]
    smoothing: Option<f32>,

    /// Apply motion correction before the analysis.
    #[arg(long = "motioncorrection")]
    motion_correction: bool,

    /// Percentage of variance kept by whitening.
    #[arg(
        long = "var",
        value_name = "PERCENT",
        default_value_t = 80.0,
        value_parser = parse_percent
    )]
    variance: f64,

    /// Brain mask with the same spatial size as the input (estimated when omitted).
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Z-score every voxel time series.
    #[arg(long)]
    zscore: bool,

    /// Maximum number of components.
    #[arg(long, value_parser = parse_components)]
    components: Option<usize>,

    /// Output file (default: `<input>_ica.nii` next to the input).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Replace an existing default output file.
    #[arg(long)]
    overwrite: bool,

    /// Fail instead of warning when the input holds a single volume.
    #[arg(long = "abortsinglevolume")]
    abort_single_volume: bool,

    /// Print everything, including the settings as JSON.
    #[arg(long)]
    debug: bool,

    /// Only print errors.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print stage timings and engine details.
    #[arg(long)]
    verbose: bool,
}

fn parse_smoothing(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(format!("smoothing must be positive, got {v}"))
    }
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if v > 0.0 && v < 100.0 {
        Ok(v)
    } else {
        Err(format!("variance to keep must be between 0 and 100, got {v}"))
    }
}

fn parse_components(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(v) if v >= 1 => Ok(v),
        Ok(_) => Err("at least one component is required".to_string()),
        Err(_) => Err(format!("'{s}' is not a positive integer")),
    }
}

/// Accept the historical `-option` spelling by rewriting it to `--option`.
///
/// Single-letter flags and negative numbers are left alone.
fn normalize_legacy_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 {
                return arg;
            }
            match arg.to_str() {
                Some(s)
                    if s.starts_with('-')
                        && !s.starts_with("--")
                        && s.len() > 2
                        && s[1..].starts_with(|c: char| c.is_ascii_alphabetic()) =>
                {
                    OsString::from(format!("-{s}"))
                }
                _ => arg,
            }
        })
        .collect()
}

fn init_tracing(cli: &Cli) {
    let level = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn settings_from(cli: Cli) -> fmri_ica::Settings {
    let mut settings = fmri_ica::Settings::new(cli.input);
    settings.platform = cli.platform;
    settings.device = cli.device;
    settings.smoothing_fwhm_mm = cli.smoothing;
    settings.motion_correction = cli.motion_correction;
    settings.variance_to_keep_percent = cli.variance;
    settings.mask = cli.mask;
    settings.z_score = cli.zscore;
    if let Some(k) = cli.components {
        settings.requested_components = k;
    }
    if let Some(path) = cli.output {
        settings.output = fmri_ica::OutputNaming::Explicit(path);
    }
    settings.allow_overwrite = cli.overwrite;
    if cli.abort_single_volume {
        settings.single_volume_policy = fmri_ica::SingleVolumePolicy::Abort;
    }
    settings.verbosity = if cli.quiet {
        fmri_ica::Verbosity::Quiet
    } else if cli.verbose {
        fmri_ica::Verbosity::Verbose
    } else {
        fmri_ica::Verbosity::Normal
    };
    settings.debug = cli.debug;
    settings
}

fn run(cli: Cli) -> anyhow::Result<fmri_ica::RunSummary> {
    std::fs::File::open(&cli.input)
        .map_err(|source| fmri_ica::IcaError::InputIo {
            path: cli.input.clone(),
            source,
        })
        .with_context(|| format!("Could not open file {} !", cli.input.display()))?;

    let settings = settings_from(cli);
    if settings.debug {
        let json = serde_json::to_string_pretty(&settings).context("serialize settings")?;
        tracing::debug!("settings:\n{json}");
    }

    let env = fmri_ica::EngineEnvironment::from_env()?;
    let summary = fmri_ica::run_ica(
        &settings,
        &env,
        &fmri_ica::Nifti1Codec,
        &fmri_ica::CpuEngineFactory,
    )?;
    tracing::info!(
        "{} components written to {}",
        summary.component_count,
        summary.output_path.display()
    );
    Ok(summary)
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let code = err
        .downcast_ref::<fmri_ica::IcaError>()
        .map_or(1, fmri_ica::IcaError::exit_code);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    let args = normalize_legacy_args(std::env::args_os());
    if args.len() <= 1 {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let text = e.to_string();
            let first = text.lines().next().unwrap_or("invalid arguments");
            println!("{first}");
            return exit_code_for(&fmri_ica::IcaError::invalid_argument(first).into());
        }
    };

    init_tracing(&cli);
    match run(cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{e:#}");
            exit_code_for(&e)
        }
    }
}
