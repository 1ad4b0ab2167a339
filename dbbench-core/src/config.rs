// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration files with strict validation.
//!
//! Two kinds of files are read:
//! - harness configuration under `<root>/config/` (`Version.yml`, required,
//!   and `harness.yml`, optional);
//! - plugin manifests found by the registry under the ports directory.
//!
//! Raw structs mirror the YAML; validated structs are what the rest of the
//! crate sees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, HarnessResult, PluginError};
use crate::types::PluginName;

const VERSION_FILE: &str = "Version.yml";
const HARNESS_FILE: &str = "harness.yml";

/// Upper bound for the service probe interval (10 minutes).
const MAX_PROBE_INTERVAL_MS: u64 = 600_000;

#[derive(Debug, Deserialize)]
struct RawVersionFile {
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHarnessConfig {
    #[serde(default = "default_probe_interval_ms")]
    probe_interval_ms: u64,
    #[serde(default = "default_query_client")]
    query_client: String,
    #[serde(default)]
    ports_dir: Option<String>,
}

fn default_probe_interval_ms() -> u64 {
    1000
}

fn default_query_client() -> String {
    "psql".to_string()
}

impl Default for RawHarnessConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
            query_client: default_query_client(),
            ports_dir: None,
        }
    }
}

/// Validated harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Installation root holding `config/` and `ports/`.
    pub root_dir: PathBuf,
    /// Directory scanned for platform and OS plugins.
    pub ports_dir: PathBuf,
    /// Version of the analytics library under test.
    pub library_version: String,
    /// Interval between service probes while a platform starts.
    pub probe_interval: Duration,
    /// Query client executable.
    pub query_client: String,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the harness configuration below `root_dir`.
    pub fn load_dir(root_dir: impl AsRef<Path>) -> Result<HarnessConfig, ConfigError> {
        let root_dir = root_dir.as_ref().to_path_buf();
        let config_dir = root_dir.join("config");

        let version_path = config_dir.join(VERSION_FILE);
        if !version_path.is_file() {
            return Err(ConfigError::ConfigNotFound { path: version_path });
        }
        let version: RawVersionFile = read_yaml(&version_path)?;

        let harness_path = config_dir.join(HARNESS_FILE);
        let raw = if harness_path.is_file() {
            read_yaml(&harness_path)?
        } else {
            RawHarnessConfig::default()
        };

        Self::validate(root_dir, version, raw)
    }

    fn validate(
        root_dir: PathBuf,
        version: RawVersionFile,
        raw: RawHarnessConfig,
    ) -> Result<HarnessConfig, ConfigError> {
        if version.version.trim().is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "version",
                value: version.version,
                reason: "Version must not be empty".to_string(),
            });
        }

        if raw.probe_interval_ms == 0 || raw.probe_interval_ms > MAX_PROBE_INTERVAL_MS {
            return Err(ConfigError::InvalidFieldValue {
                field: "probe_interval_ms",
                value: raw.probe_interval_ms.to_string(),
                reason: format!("Must be between 1 and {}", MAX_PROBE_INTERVAL_MS),
            });
        }

        if raw.query_client.trim().is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "query_client",
                value: raw.query_client,
                reason: "Query client must not be empty".to_string(),
            });
        }

        let ports_dir = match raw.ports_dir {
            Some(dir) if Path::new(&dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => root_dir.join(dir),
            None => root_dir.join("ports"),
        };

        Ok(HarnessConfig {
            root_dir,
            ports_dir,
            library_version: version.version.trim().to_string(),
            probe_interval: Duration::from_millis(raw.probe_interval_ms),
            query_client: raw.query_client,
        })
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::ConfigParse {
        path: path.to_path_buf(),
        message: format!("YAML parse error: {}", e),
    })
}

// =============================================================================
// Plugin manifests
// =============================================================================

/// Built-in platform controller implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformVariant {
    /// Single-node server.
    Postgres,
    /// Multi-node, segment-parallel server.
    Greenplum,
}

impl PlatformVariant {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Greenplum => "greenplum",
        }
    }
}

/// Built-in workload definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadVariant {
    LinearRegressionRandom,
    LogisticRegressionRandom,
    KmeansFloatRandom,
}

impl WorkloadVariant {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LinearRegressionRandom => "linear_regression_random",
            Self::LogisticRegressionRandom => "logistic_regression_random",
            Self::KmeansFloatRandom => "kmeans_float_random",
        }
    }
}

/// Shell command templates for managing the platform's service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceCommands {
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
}

/// `benchmark/controller.yaml` of a platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformManifest {
    pub variant: PlatformVariant,
    #[serde(default)]
    pub description: Option<String>,
    /// Platform whose generators this platform runs (defaults to itself).
    #[serde(default)]
    pub generator_platform: Option<PluginName>,
    #[serde(default)]
    pub probe_interval_ms: Option<u64>,
    #[serde(default)]
    pub service: ServiceCommands,
}

/// `benchmark/executors/<Workload>.yaml` of a platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadManifest {
    pub variant: WorkloadVariant,
    #[serde(default)]
    pub description: Option<String>,
}

/// `benchmark/tools.yaml` of an operating-system port.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsManifest {
    #[serde(default)]
    pub flush_buffer_cache: Option<String>,
}

impl PlatformManifest {
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let manifest: Self = read_manifest(path)?;
        if let Some(ms) = manifest.probe_interval_ms {
            if ms == 0 || ms > MAX_PROBE_INTERVAL_MS {
                return Err(PluginError::InvalidManifest {
                    path: path.to_path_buf(),
                    message: format!(
                        "probe_interval_ms must be between 1 and {}, got {}",
                        MAX_PROBE_INTERVAL_MS, ms
                    ),
                }
                .into());
            }
        }
        Ok(manifest)
    }
}

impl WorkloadManifest {
    pub fn load(path: &Path) -> HarnessResult<Self> {
        Ok(read_manifest(path)?)
    }
}

impl ToolsManifest {
    pub fn load(path: &Path) -> HarnessResult<Self> {
        Ok(read_manifest(path)?)
    }
}

fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, PluginError> {
    let invalid = |message: String| PluginError::InvalidManifest {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    serde_yaml::from_str(&content).map_err(|e| invalid(format!("YAML parse error: {}", e)))
}
