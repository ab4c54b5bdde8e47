//! Runtime configuration from the environment (and an optional `.env` file).
//!
//! CLI flags win over anything set here; see `app::run`.

use std::path::PathBuf;

use crate::io::assumptions::DEFAULT_ASSUMPTIONS_FILE;

pub const ENV_DATA_DIR: &str = "ACPH_DATA_DIR";
pub const ENV_ASSUMPTIONS: &str = "ACPH_ASSUMPTIONS";
pub const ENV_LOG_FILE: &str = "ACPH_LOG_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the CSV datasets; `None` means search the defaults.
    pub data_dir: Option<PathBuf>,
    pub assumptions: PathBuf,
    /// TUI log destination; the TUI is silent without it.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            assumptions: PathBuf::from(DEFAULT_ASSUMPTIONS_FILE),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the `ACPH_*` variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let defaults = Self::default();
        Self {
            data_dir: get(ENV_DATA_DIR),
            assumptions: get(ENV_ASSUMPTIONS).unwrap_or(defaults.assumptions),
            log_file: get(ENV_LOG_FILE),
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, assumptions: Option<PathBuf>) -> Self {
        if data_dir.is_some() {
            self.data_dir = data_dir;
        }
        if let Some(path) = assumptions {
            self.assumptions = path;
        }
        self
    }
}
