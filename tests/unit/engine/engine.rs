use super::*;
use crate::engine::native::ENGINE_NON_CONVERGENCE;

#[test]
fn build_log_short_name_strips_prefix_and_extension() {
    let log = |f: &str| BuildLog {
        kernel_file: f.to_string(),
        text: String::new(),
    };
    assert_eq!(log("kernelMotionCorrection.cpp").short_name(), "MotionCorrection");
    assert_eq!(log("kernelFastICA.cl").short_name(), "FastICA");
    assert_eq!(log("Whitening.cpp").short_name(), "Whitening");
    assert_eq!(log("kernelNoExt").short_name(), "NoExt");
}

#[test]
fn clean_diagnostics_have_no_entries() {
    let d = KernelDiagnostics::clean(["A", "B"]);
    assert_eq!(d.create_kernel_errors, vec![0, 0]);
    assert_eq!(d.run_kernel_errors, vec![0, 0]);
    assert!(d.entries().is_empty());
    assert_eq!(d.report(), 0);
}

#[test]
fn entries_list_non_zero_codes_with_names() {
    let mut d = KernelDiagnostics::clean(["Smoothing", "FastICA"]);
    d.create_buffer_errors = vec![0, -4];
    d.create_kernel_errors[0] = -46;
    d.record_run_error("FastICA", ENGINE_NON_CONVERGENCE);
    d.record_run_error("Unknown", -5);

    let entries = d.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].phase, DiagnosticPhase::CreateBuffer);
    assert_eq!(entries[0].kernel, "buffer #1");
    assert_eq!(entries[0].message, "CL_MEM_OBJECT_ALLOCATION_FAILURE");
    assert_eq!(entries[1].kernel, "Smoothing");
    assert_eq!(entries[1].message, "CL_INVALID_KERNEL_NAME");
    assert_eq!(entries[2].phase, DiagnosticPhase::RunKernel);
    assert_eq!(entries[2].kernel, "FastICA");
    assert_eq!(entries[2].message, "ENGINE_NON_CONVERGENCE");
    assert_eq!(d.report(), 3);
}

#[test]
fn native_codes_decode() {
    use crate::engine::native::describe_native_error;
    assert_eq!(describe_native_error(0), "CL_SUCCESS");
    assert_eq!(describe_native_error(-32), "CL_INVALID_PLATFORM");
    assert_eq!(describe_native_error(-33), "CL_INVALID_DEVICE");
    assert_eq!(describe_native_error(-20), "Unrecognized error code");
}
