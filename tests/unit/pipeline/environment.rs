use super::*;
use crate::engine::{BuildLog, EngineInitError, KernelDiagnostics};

fn scratch(name: &str) -> PathBuf {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("unit-environment")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn failed_startup(logs: &[(&str, &str)]) -> EngineStartup {
    EngineStartup {
        platform_name: "CPU".to_string(),
        device_name: "reference".to_string(),
        build_logs: logs
            .iter()
            .map(|(f, t)| BuildLog {
                kernel_file: f.to_string(),
                text: t.to_string(),
            })
            .collect(),
        engine: Err(EngineInitError {
            message: "nope".to_string(),
            native_code: -32,
            diagnostics: KernelDiagnostics::default(),
        }),
    }
}

#[test]
fn layout_under_the_base_directory() {
    let env = EngineEnvironment::new("/opt/broccoli");
    assert_eq!(env.filters_dir(), PathBuf::from("/opt/broccoli/filters"));
    assert_eq!(
        env.build_log_path("CPU", "reference", "FastICA"),
        PathBuf::from("/opt/broccoli/compiled/Kernels/buildInfo_CPU_reference_FastICA.txt")
    );
}

#[test]
fn build_logs_are_written_even_when_startup_failed() {
    let base = scratch("logs");
    let env = EngineEnvironment::new(&base);
    let startup = failed_startup(&[
        ("kernelSmoothing.cpp", "smoothing log"),
        ("kernelFastICA.cpp", "ica log"),
    ]);

    assert_eq!(write_build_logs(&env, &startup), 2);
    let text = std::fs::read_to_string(
        base.join("compiled/Kernels/buildInfo_CPU_reference_Smoothing.txt"),
    )
    .unwrap();
    assert_eq!(text, "smoothing log");
}

#[test]
fn unwritable_log_directory_is_not_fatal() {
    let base = scratch("blocked");
    std::fs::create_dir_all(&base).unwrap();
    // A file where the directory should be.
    std::fs::write(base.join("compiled"), b"").unwrap();
    let env = EngineEnvironment::new(&base);
    let startup = failed_startup(&[("kernelSmoothing.cpp", "x")]);
    assert_eq!(write_build_logs(&env, &startup), 0);
}
