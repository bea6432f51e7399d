// ── Backend configuration ─────────────────────────────────────────────────────
//
// Optional JSON file, located through `WINVFS_CONFIG`.  Every field has a
// default so older or partial files parse.  No `unsafe`.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    capability::Capability,
    error::{BackendError, Result},
};

// ── Format version ────────────────────────────────────────────────────────────

const CONFIG_VERSION: u32 = 1;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "WINVFS_CONFIG";

/// Maximum path length in `WCHAR`s, including the null terminator.
/// 32 768 is the documented maximum for `\\?\` extended paths.
const PATH_BUF_LEN: usize = 32_768;

/// Tunables for one backend instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub version: u32,
    /// First buffer size, in `WCHAR`s, for module-path and search-path queries.
    pub module_path_initial_capacity: usize,
    /// Doubling stops here.
    pub module_path_max_capacity: usize,
    /// Buffer size, in `WCHAR`s, for `FormatMessageW`.
    pub error_message_capacity: usize,
    /// Entry points treated as absent even when the OS exports them.
    pub disabled_capabilities: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            module_path_initial_capacity: 64,
            module_path_max_capacity: PATH_BUF_LEN,
            error_message_capacity: 255,
            disabled_capabilities: Vec::new(),
        }
    }
}

impl BackendConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse the file at `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Load the file named by `WINVFS_CONFIG`, or the defaults when the
    /// variable is not set.
    pub fn from_env() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the backend cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(BackendError::InvalidArgument);
        }
        if self.module_path_initial_capacity == 0
            || self.module_path_max_capacity < self.module_path_initial_capacity
            || self.error_message_capacity == 0
        {
            return Err(BackendError::InvalidArgument);
        }
        for name in &self.disabled_capabilities {
            if Capability::from_name(name).is_none() {
                warn!(capability = %name, "ignoring unknown capability in configuration");
            }
        }
        Ok(())
    }

    /// Whether `cap` has been switched off.
    pub fn is_disabled(&self, cap: Capability) -> bool {
        self.disabled_capabilities.iter().any(|n| n == cap.name())
    }

    /// Builder-style helper used by hosts and tests.
    pub fn with_disabled(mut self, cap: Capability) -> Self {
        if !self.is_disabled(cap) {
            self.disabled_capabilities.push(cap.name().to_owned());
        }
        self
    }
}

/// The configuration file path, if `WINVFS_CONFIG` is set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
