use std::path::Path;

use crate::foundation::error::{IcaError, IcaResult};
use crate::resources::tracker::{BufferId, ResourceTracker};

/// Filter files under `<base>/filters/`, in load order (real then imaginary, per axis).
pub const FILTER_FILE_NAMES: [&str; 6] = [
    "filter1_real_linear_registration.bin",
    "filter1_imag_linear_registration.bin",
    "filter2_real_linear_registration.bin",
    "filter2_imag_linear_registration.bin",
    "filter3_real_linear_registration.bin",
    "filter3_imag_linear_registration.bin",
];

const BUFFER_LABELS: [&str; 6] = [
    "QUADRATURE_FILTER_1_REAL",
    "QUADRATURE_FILTER_1_IMAG",
    "QUADRATURE_FILTER_2_REAL",
    "QUADRATURE_FILTER_2_IMAG",
    "QUADRATURE_FILTER_3_REAL",
    "QUADRATURE_FILTER_3_IMAG",
];

#[derive(Clone, Copy, Debug)]
/// Tracked buffers of the three complex quadrature filters used for motion correction.
pub struct FilterBank {
    /// Edge length of every filter.
    pub size: usize,
    /// Real parts, one per axis.
    pub real: [BufferId; 3],
    /// Imaginary parts, one per axis.
    pub imag: [BufferId; 3],
}

/// Load the six filter arrays, registering each one before reading the next.
///
/// Every file must hold exactly `filter_size^3` little-endian `f32` values.
#[tracing::instrument(skip(tracker))]
pub fn load_filter_bank(
    filters_dir: &Path,
    filter_size: usize,
    tracker: &mut ResourceTracker,
) -> IcaResult<FilterBank> {
    if filter_size < 3 || filter_size.is_multiple_of(2) {
        return Err(IcaError::invalid_argument(format!(
            "filter size must be odd and at least 3, got {filter_size}"
        )));
    }
    let expected = filter_size * filter_size * filter_size;

    let mut ids = Vec::with_capacity(FILTER_FILE_NAMES.len());
    for (name, label) in FILTER_FILE_NAMES.iter().zip(BUFFER_LABELS) {
        let path = filters_dir.join(name);
        let bytes = std::fs::read(&path).map_err(|source| IcaError::FilterFileMissing {
            path: path.clone(),
            source,
        })?;
        if bytes.len() != expected * 4 {
            return Err(IcaError::FilterSizeMismatch {
                path,
                expected,
                actual_bytes: bytes.len() as u64,
            });
        }
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        ids.push(tracker.register_buffer(label, values)?);
    }

    let bank = FilterBank {
        size: filter_size,
        real: [ids[0], ids[2], ids[4]],
        imag: [ids[1], ids[3], ids[5]],
    };
    tracing::debug!(size = filter_size, "quadrature filters loaded");
    Ok(bank)
}

#[cfg(test)]
#[path = "../../tests/unit/filters/bank.rs"]
mod tests;
