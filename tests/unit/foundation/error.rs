use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        IcaError::unreadable("a.nii", "x")
            .to_string()
            .contains("unreadable image 'a.nii':")
    );
    assert!(
        IcaError::degenerate("x")
            .to_string()
            .contains("degenerate input:")
    );
    assert!(
        IcaError::engine_contract("x")
            .to_string()
            .contains("engine contract violation:")
    );
    assert!(
        IcaError::invalid_argument("x")
            .to_string()
            .contains("invalid argument:")
    );
}

#[test]
fn geometry_mismatch_reports_both_triples() {
    let err = IcaError::GeometryMismatch {
        volume: Dims3::new(64, 64, 30),
        mask: Dims3::new(64, 64, 31),
    };
    let msg = err.to_string();
    assert!(msg.contains("64 x 64 x 30"));
    assert!(msg.contains("64 x 64 x 31"));
}

#[test]
fn exit_codes_are_non_zero_and_distinct() {
    let errs = [
        IcaError::unreadable("a", "b"),
        IcaError::degenerate("x"),
        IcaError::GeometryMismatch {
            volume: Dims3::new(1, 1, 1),
            mask: Dims3::new(2, 2, 2),
        },
        IcaError::CapacityExceeded {
            kind: ResourceKind::Buffer,
            capacity: 4,
        },
        IcaError::EngineInitialization {
            message: "m".to_string(),
            code: -33,
        },
        IcaError::engine_contract("x"),
        IcaError::invalid_argument("x"),
        IcaError::resource("x"),
    ];
    let mut codes: Vec<i32> = errs.iter().map(IcaError::exit_code).collect();
    assert!(codes.iter().all(|&c| c != 0));
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), errs.len());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = IcaError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.exit_code(), 1);
}
