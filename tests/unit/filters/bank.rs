use std::path::PathBuf;

use super::*;

fn filters_dir(name: &str, size: usize, sizes_override: &[(usize, usize)]) -> PathBuf {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("unit-filters")
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    for (i, file) in FILTER_FILE_NAMES.iter().enumerate() {
        let count = sizes_override
            .iter()
            .find(|(idx, _)| *idx == i)
            .map(|(_, n)| *n)
            .unwrap_or(size * size * size);
        let bytes: Vec<u8> = (0..count)
            .flat_map(|k| (i as f32 * 1000.0 + k as f32).to_le_bytes())
            .collect();
        std::fs::write(dir.join(file), bytes).unwrap();
    }
    dir
}

#[test]
fn loads_six_filters_in_order() {
    let dir = filters_dir("ok", 3, &[]);
    let mut tracker = ResourceTracker::new(None);
    let bank = load_filter_bank(&dir, 3, &mut tracker).unwrap();

    assert_eq!(bank.size, 3);
    assert_eq!(tracker.live_buffers(), 6);
    assert_eq!(tracker.buffer(bank.real[0]).unwrap()[0], 0.0);
    assert_eq!(tracker.buffer(bank.imag[0]).unwrap()[0], 1000.0);
    assert_eq!(tracker.buffer(bank.real[2]).unwrap()[26], 4026.0);
    assert_eq!(tracker.buffer(bank.imag[2]).unwrap().len(), 27);
}

#[test]
fn short_or_long_file_is_a_size_mismatch() {
    for (label, count) in [("short", 342), ("long", 344)] {
        let dir = filters_dir(label, 7, &[(2, count)]);
        let mut tracker = ResourceTracker::new(None);
        let err = load_filter_bank(&dir, 7, &mut tracker).unwrap_err();
        match err {
            IcaError::FilterSizeMismatch {
                path,
                expected,
                actual_bytes,
            } => {
                assert!(path.ends_with(FILTER_FILE_NAMES[2]));
                assert_eq!(expected, 343);
                assert_eq!(actual_bytes, count as u64 * 4);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Filters read before the bad one are tracked.
        assert_eq!(tracker.live_buffers(), 2);
    }
}

#[test]
fn missing_file_names_the_path() {
    let dir = filters_dir("missing", 3, &[]);
    std::fs::remove_file(dir.join(FILTER_FILE_NAMES[5])).unwrap();
    let mut tracker = ResourceTracker::new(None);
    let err = load_filter_bank(&dir, 3, &mut tracker).unwrap_err();
    assert!(matches!(err, IcaError::FilterFileMissing { .. }));
    assert!(err.to_string().contains(FILTER_FILE_NAMES[5]));
    assert_eq!(tracker.live_buffers(), 5);
}

#[test]
fn even_filter_size_is_rejected() {
    let mut tracker = ResourceTracker::new(None);
    let err = load_filter_bank(Path::new("unused"), 6, &mut tracker).unwrap_err();
    assert!(matches!(err, IcaError::InvalidArgument(_)));
}
