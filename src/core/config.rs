//! Run configuration loaded from `volumapper.toml`.
//!
//! The file is optional; every field has a default. CLI flags are layered on
//! top by the caller.

use crate::core::error::VolumapperError;
use crate::core::freshness::DEFAULT_BUDGET;
use crate::core::store::DataSourceKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "volumapper.toml";
pub const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub results_dir: PathBuf,
    /// Regions polled when none are given on the command line. Empty means
    /// the built-in default set.
    pub regions: Vec<String>,
    pub parallel: bool,
    pub endpoint_url: Option<String>,
    /// Freshness budget in seconds, keyed by data source name.
    pub freshness: BTreeMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            regions: Vec::new(),
            parallel: true,
            endpoint_url: None,
            freshness: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn budget_for(&self, kind: DataSourceKind) -> Duration {
        self.freshness
            .get(kind.name())
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or(DEFAULT_BUDGET)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, VolumapperError> {
        toml::from_str(content).map_err(|e| VolumapperError::ConfigError(e.to_string()))
    }
}

/// Load configuration from an explicit path, or from `./volumapper.toml` when
/// present. An explicit path that does not exist is an error; a missing
/// default file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, VolumapperError> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(VolumapperError::ConfigError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => {
            let default = PathBuf::from(CONFIG_FILE_NAME);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content = fs::read_to_string(&path).map_err(VolumapperError::IoError)?;
    Config::from_toml_str(&content).map_err(|e| match e {
        VolumapperError::ConfigError(msg) => {
            VolumapperError::ConfigError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}
