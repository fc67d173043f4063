use std::path::{Path, PathBuf};

use crate::engine::EngineStartup;
use crate::foundation::error::{IcaError, IcaResult};

/// Environment variable naming the engine installation directory.
pub const BASE_DIR_VAR: &str = "BROCCOLI_DIR";

/// Locations under the engine installation directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineEnvironment {
    base_dir: PathBuf,
}

impl EngineEnvironment {
    /// Environment rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Read the base directory from [`BASE_DIR_VAR`].
    pub fn from_env() -> IcaResult<Self> {
        match std::env::var_os(BASE_DIR_VAR) {
            Some(dir) if !dir.is_empty() => Ok(Self::new(dir)),
            _ => Err(IcaError::invalid_argument(format!(
                "The environment variable {BASE_DIR_VAR} is not set"
            ))),
        }
    }

    /// Installation directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the quadrature filter files.
    pub fn filters_dir(&self) -> PathBuf {
        self.base_dir.join("filters")
    }

    /// Directory build logs are written to.
    pub fn kernel_build_dir(&self) -> PathBuf {
        self.base_dir.join("compiled").join("Kernels")
    }

    /// `buildInfo_<platform>_<device>_<kernel>.txt` under [`Self::kernel_build_dir`].
    pub fn build_log_path(&self, platform: &str, device: &str, kernel: &str) -> PathBuf {
        self.kernel_build_dir()
            .join(format!("buildInfo_{platform}_{device}_{kernel}.txt"))
    }
}

/// Write one build log file per kernel file. Returns how many were written.
///
/// Failures are logged and otherwise ignored.
pub fn write_build_logs(env: &EngineEnvironment, startup: &EngineStartup) -> usize {
    let dir = env.kernel_build_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("could not create {}: {e}", dir.display());
    }

    let mut written = 0;
    for log in &startup.build_logs {
        let path =
            env.build_log_path(&startup.platform_name, &startup.device_name, log.short_name());
        match std::fs::write(&path, &log.text) {
            Ok(()) => written += 1,
            Err(e) => tracing::warn!("could not open {} for writing: {e}", path.display()),
        }
    }
    written
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/environment.rs"]
mod tests;
