// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Plugin registry backed by the ports directory layout.
//!
//! ```text
//! ports/<platform>/benchmark/controller.yaml             platform marker
//! ports/<platform>/benchmark/executors/<Workload>.yaml   workload marker
//! ports/<platform>/benchmark/generators/<Workload>       generator program
//! ```
//!
//! Nothing is cached: every listing re-reads the directory, so plugins added
//! or removed between calls are seen immediately.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::{PlatformManifest, WorkloadManifest};
use crate::error::{HarnessError, HarnessResult, PluginError};
use crate::platform::PlatformHandle;
use crate::types::{PluginKind, PluginName};
use crate::workload::WorkloadHandle;

const BENCHMARK_DIR: &str = "benchmark";
const CONTROLLER_MARKER: &str = "controller.yaml";
const EXECUTORS_DIR: &str = "executors";
const GENERATORS_DIR: &str = "generators";
const MANIFEST_EXTENSION: &str = "yaml";

/// A discovered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub kind: PluginKind,
    pub name: PluginName,
    /// Marker file that made the plugin discoverable.
    pub manifest_path: PathBuf,
}

/// Registry resolving platform and workload names against the ports directory.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    ports_dir: PathBuf,
}

impl PluginRegistry {
    /// Create a registry over a ports directory.
    pub fn new(ports_dir: impl Into<PathBuf>) -> Self {
        Self {
            ports_dir: ports_dir.into(),
        }
    }

    /// Directory scanned for workloads of `platform`.
    pub fn workload_root(&self, platform: &PluginName) -> PathBuf {
        self.ports_dir
            .join(platform.as_str())
            .join(BENCHMARK_DIR)
            .join(EXECUTORS_DIR)
    }

    /// Enumerate plugins of `kind` under `search_root`.
    ///
    /// A missing search root yields an empty set.
    pub fn list_available(kind: PluginKind, search_root: &Path) -> HarnessResult<BTreeSet<PluginName>> {
        Ok(Self::scan(kind, search_root)?
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect())
    }

    /// Resolve `name` against the plugins of `kind` under `search_root`.
    pub fn resolve(kind: PluginKind, name: &str, search_root: &Path) -> HarnessResult<PluginDescriptor> {
        let available = Self::scan(kind, search_root)?;

        available
            .iter()
            .find(|descriptor| descriptor.name.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                PluginError::UnknownPlugin {
                    kind,
                    name: name.to_string(),
                    available: available.iter().map(|d| d.name.to_string()).collect(),
                }
                .into()
            })
    }

    /// All platforms currently discoverable.
    pub fn platforms(&self) -> HarnessResult<BTreeSet<PluginName>> {
        Self::list_available(PluginKind::Platform, &self.ports_dir)
    }

    /// All workloads currently discoverable for `platform`.
    pub fn workloads(&self, platform: &PluginName) -> HarnessResult<BTreeSet<PluginName>> {
        Self::list_available(PluginKind::Workload, &self.workload_root(platform))
    }

    /// Resolve a platform and load its manifest.
    pub fn resolve_platform(&self, name: &str) -> HarnessResult<PlatformHandle> {
        let descriptor = Self::resolve(PluginKind::Platform, name, &self.ports_dir)?;
        let manifest = PlatformManifest::load(&descriptor.manifest_path)?;

        let generator_platform = match &manifest.generator_platform {
            Some(other) => {
                Self::resolve(PluginKind::Platform, other.as_str(), &self.ports_dir)?.name
            }
            None => descriptor.name.clone(),
        };

        tracing::debug!(
            platform = %descriptor.name,
            variant = manifest.variant.name(),
            generator_platform = %generator_platform,
            "Resolved platform"
        );

        Ok(PlatformHandle {
            generators_dir: self
                .ports_dir
                .join(generator_platform.as_str())
                .join(BENCHMARK_DIR)
                .join(GENERATORS_DIR),
            descriptor,
            manifest,
            generator_platform,
        })
    }

    /// Resolve a workload of `platform` and load its manifest.
    pub fn resolve_workload(
        &self,
        platform: &PlatformHandle,
        name: &str,
    ) -> HarnessResult<WorkloadHandle> {
        let root = self.workload_root(&platform.descriptor.name);
        let descriptor = Self::resolve(PluginKind::Workload, name, &root)?;
        let manifest = WorkloadManifest::load(&descriptor.manifest_path)?;

        tracing::debug!(
            platform = %platform.descriptor.name,
            workload = %descriptor.name,
            variant = manifest.variant.name(),
            "Resolved workload"
        );

        Ok(WorkloadHandle {
            descriptor,
            manifest,
        })
    }

    fn scan(kind: PluginKind, search_root: &Path) -> HarnessResult<Vec<PluginDescriptor>> {
        let entries = match std::fs::read_dir(search_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HarnessError::Io {
                    context: "reading plugin directory",
                    source: e,
                })
            }
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HarnessError::Io {
                context: "reading plugin directory entry",
                source: e,
            })?;
            let path = entry.path();

            let Some((raw_name, manifest_path)) = Self::marker(kind, &path) else {
                continue;
            };

            match PluginName::new(raw_name) {
                Ok(name) => found.push(PluginDescriptor {
                    kind,
                    name,
                    manifest_path,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping plugin with invalid name");
                }
            }
        }

        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    /// Structural test for a directory entry; returns the plugin name and
    /// its manifest path when the entry qualifies.
    fn marker(kind: PluginKind, path: &Path) -> Option<(String, PathBuf)> {
        match kind {
            PluginKind::Platform => {
                let manifest = path.join(BENCHMARK_DIR).join(CONTROLLER_MARKER);
                if !manifest.is_file() {
                    return None;
                }
                let name = path.file_name()?.to_str()?.to_string();
                Some((name, manifest))
            }
            PluginKind::Workload => {
                if !path.is_file() || path.extension()? != MANIFEST_EXTENSION {
                    return None;
                }
                let name = path.file_stem()?.to_str()?.to_string();
                Some((name, path.to_path_buf()))
            }
        }
    }
}
