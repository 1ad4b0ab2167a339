// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Data platform controllers.
//!
//! A controller owns the platform scope and the query channel for one run
//! and tracks the run's [`RunState`]. Variants share a [`PlatformCore`] and
//! only supply what differs: worker count, load strategy, setup facts and
//! default service commands.

mod args;
mod greenplum;
mod postgres;

pub use args::PlatformArgs;
pub use greenplum::GreenplumController;
pub use postgres::PostgresController;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::channel::{Query, QueryChannel};
use crate::config::{PlatformManifest, PlatformVariant, ServiceCommands};
use crate::error::{HarnessError, HarnessResult, QueryError};
use crate::os_tools::run_shell;
use crate::registry::PluginDescriptor;
use crate::scope::{ScopedConfig, Value};
use crate::state::{RunState, RunStateMachine};
use crate::template::render_scope;
use crate::types::PluginName;

/// Default pause between service probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(1000);

const VERSION_QUERY: &str = "SELECT version();";
const PROBE_QUERY: &str = "SELECT 1;";

/// Facts gathered by [`PlatformController::setup`].
pub type Facts = BTreeMap<String, Value>;

/// How benchmark data reaches the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Generator output is piped into the query client's stdin.
    Pipe,
    /// The platform runs the generator itself on every worker.
    ExternalSource,
}

/// A resolved platform plugin, ready to be instantiated.
#[derive(Debug, Clone)]
pub struct PlatformHandle {
    pub descriptor: PluginDescriptor,
    pub manifest: PlatformManifest,
    /// Platform whose generators this platform uses.
    pub generator_platform: PluginName,
    pub generators_dir: PathBuf,
}

impl PlatformHandle {
    pub fn name(&self) -> &PluginName {
        &self.descriptor.name
    }

    /// Build the controller for this platform over its scope and channel.
    pub fn instantiate(
        &self,
        scope: Arc<ScopedConfig>,
        channel: Box<dyn QueryChannel>,
    ) -> HarnessResult<Box<dyn PlatformController>> {
        let controller: Box<dyn PlatformController> = match self.manifest.variant {
            PlatformVariant::Postgres => Box::new(PostgresController::new(self, scope, channel)?),
            PlatformVariant::Greenplum => Box::new(GreenplumController::new(self, scope, channel)?),
        };

        tracing::info!(
            platform = %self.descriptor.name,
            variant = self.manifest.variant.name(),
            "Platform controller ready"
        );
        Ok(controller)
    }
}

/// State and plumbing shared by every platform variant.
pub struct PlatformCore {
    name: PluginName,
    scope: Arc<ScopedConfig>,
    channel: Box<dyn QueryChannel>,
    state: RunStateMachine,
    service: ServiceCommands,
    probe_interval: Duration,
    generators_dir: PathBuf,
}

impl PlatformCore {
    /// `defaults` fills in service commands the manifest leaves out.
    pub fn new(
        handle: &PlatformHandle,
        scope: Arc<ScopedConfig>,
        channel: Box<dyn QueryChannel>,
        defaults: ServiceCommands,
    ) -> HarnessResult<Self> {
        let probe_interval = match handle.manifest.probe_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None if scope.has("probe_interval_ms", false) => {
                let ms = scope.get_int("probe_interval_ms")?;
                Duration::from_millis(u64::try_from(ms).unwrap_or(0))
            }
            None => DEFAULT_PROBE_INTERVAL,
        };

        let service = ServiceCommands {
            stop: handle.manifest.service.stop.clone().or(defaults.stop),
            start: handle.manifest.service.start.clone().or(defaults.start),
        };

        Ok(Self {
            name: handle.descriptor.name.clone(),
            state: RunStateMachine::new(handle.descriptor.name.as_str()),
            scope,
            channel,
            service,
            probe_interval,
            generators_dir: handle.generators_dir.clone(),
        })
    }

    pub fn name(&self) -> &PluginName {
        &self.name
    }

    pub fn scope(&self) -> &Arc<ScopedConfig> {
        &self.scope
    }

    pub fn query(&self, query: &Query) -> Result<String, QueryError> {
        self.channel.execute(query)
    }

    /// Introspect the server version.
    pub fn version_facts(&self) -> HarnessResult<Facts> {
        let output = self.query(&Query::new(VERSION_QUERY).tuples_only())?;
        let mut facts = Facts::new();
        facts.insert("version".to_string(), Value::from(output.trim()));
        Ok(facts)
    }

    /// Add facts to the platform scope; fails once a workload scope exists.
    pub fn merge_facts(&mut self, facts: &Facts) -> HarnessResult<()> {
        ScopedConfig::merge_into(&mut self.scope, facts.clone())?;
        Ok(())
    }

    fn run_service_command(&self, action: &'static str, template: Option<&String>) -> HarnessResult<()> {
        let Some(template) = template else {
            tracing::info!(platform = %self.name, action, "No service command configured, skipping");
            return Ok(());
        };

        let command = render_scope(template, &self.scope)?;
        tracing::info!(platform = %self.name, action, command = %command, "Running service command");
        run_shell(&command).map(|_| ())
    }

    /// Block until the probe query succeeds. Returns the number of probes.
    pub fn wait_until_available(&self) -> HarnessResult<u32> {
        let probe = Query::new(PROBE_QUERY).tuples_only();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.query(&probe) {
                Ok(_) => {
                    tracing::info!(platform = %self.name, attempts, "Service available");
                    return Ok(attempts);
                }
                Err(e @ QueryError::ExecutionFailed { .. }) => {
                    tracing::warn!(
                        platform = %self.name,
                        attempt = attempts,
                        error = %e,
                        retry_in_ms = self.probe_interval.as_millis() as u64,
                        "Service unavailable, retrying"
                    );
                    std::thread::sleep(self.probe_interval);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Controller for one data platform during one run.
pub trait PlatformController {
    fn core(&self) -> &PlatformCore;

    fn core_mut(&mut self) -> &mut PlatformCore;

    /// Number of parallel workers holding data.
    fn worker_count(&self) -> HarnessResult<u64>;

    fn load_strategy(&self) -> LoadStrategy;

    /// Introspect the platform and merge the facts into the platform scope.
    fn setup(&mut self) -> HarnessResult<Facts> {
        let facts = self.core().version_facts()?;
        self.core_mut().merge_facts(&facts)?;
        Ok(facts)
    }

    fn name(&self) -> &str {
        self.core().name().as_str()
    }

    fn scope(&self) -> &Arc<ScopedConfig> {
        self.core().scope()
    }

    fn stop_service(&self) -> HarnessResult<()> {
        let core = self.core();
        core.run_service_command("stop", core.service.stop.as_ref())
    }

    /// Start the service and wait for it to answer. Returns the number of
    /// probes it took.
    fn start_service(&self) -> HarnessResult<u32> {
        let core = self.core();
        core.run_service_command("start", core.service.start.as_ref())?;
        core.wait_until_available()
    }

    fn run_query(&self, query: &Query) -> Result<String, QueryError> {
        self.core().query(query)
    }

    /// Path of the data generator for `workload`.
    fn generator_path(&self, workload: &PluginName) -> PathBuf {
        self.core().generators_dir.join(workload.as_str())
    }

    fn state(&self) -> RunState {
        self.core().state.state()
    }

    fn advance(&mut self, target: RunState) -> HarnessResult<()> {
        self.core_mut()
            .state
            .transition_to(target)
            .map_err(HarnessError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{platform_handle, ScriptedChannel};

    fn scope() -> Arc<ScopedConfig> {
        let mut root = ScopedConfig::root();
        root.set("probe_interval_ms", 1_i64);
        Arc::new(root)
    }

    #[test]
    fn test_probe_retries_only_execution_failures() {
        let channel = ScriptedChannel::default()
            .fail_once("SELECT 1;", 2)
            .fail_once("SELECT 1;", 2);
        let handle = platform_handle("postgres", PlatformVariant::Postgres);
        let controller = handle.instantiate(scope(), Box::new(channel.clone())).unwrap();

        assert_eq!(controller.start_service().unwrap(), 3);
        assert_eq!(channel.count("SELECT 1;"), 3);
    }

    #[test]
    fn test_probe_propagates_other_faults() {
        let channel = ScriptedChannel::default().terminate("SELECT 1;");
        let handle = platform_handle("postgres", PlatformVariant::Postgres);
        let controller = handle.instantiate(scope(), Box::new(channel.clone())).unwrap();

        assert!(matches!(
            controller.start_service(),
            Err(HarnessError::Query(QueryError::Terminated { .. }))
        ));
        assert_eq!(channel.count("SELECT 1;"), 1);
    }

    #[test]
    fn test_service_command_failure() {
        let mut handle = platform_handle("postgres", PlatformVariant::Postgres);
        handle.manifest.service = ServiceCommands {
            stop: Some("exit 5".to_string()),
            start: None,
        };
        let channel = ScriptedChannel::default();
        let controller = handle.instantiate(scope(), Box::new(channel.clone())).unwrap();

        assert!(matches!(
            controller.stop_service(),
            Err(HarnessError::CommandFailed { .. })
        ));
        assert!(channel.executed().is_empty());
    }

    #[test]
    fn test_manifest_command_is_rendered_against_scope() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("stopped");

        let mut root = ScopedConfig::root();
        root.set("probe_interval_ms", 1_i64);
        root.set("marker", marker.display().to_string());

        let mut handle = platform_handle("postgres", PlatformVariant::Postgres);
        handle.manifest.service.stop = Some("touch {marker}".to_string());
        let controller = handle
            .instantiate(Arc::new(root), Box::new(ScriptedChannel::default()))
            .unwrap();

        controller.stop_service().unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_setup_merges_version() {
        let channel = ScriptedChannel::default().output("SELECT version();", " PostgreSQL 16.2\n");
        let handle = platform_handle("postgres", PlatformVariant::Postgres);
        let mut controller = handle.instantiate(scope(), Box::new(channel)).unwrap();

        let facts = controller.setup().unwrap();
        assert_eq!(facts["version"], Value::from("PostgreSQL 16.2"));
        assert_eq!(controller.scope().get_str("version").unwrap(), "PostgreSQL 16.2");
    }

    #[test]
    fn test_setup_after_child_scope_is_refused() {
        let handle = platform_handle("postgres", PlatformVariant::Postgres);
        let mut controller = handle
            .instantiate(scope(), Box::new(ScriptedChannel::default()))
            .unwrap();
        let _workload_scope = controller.scope().child();

        assert!(matches!(
            controller.setup(),
            Err(HarnessError::Config(crate::error::ConfigError::ScopeShared))
        ));
    }

    #[test]
    fn test_generator_path() {
        let handle = platform_handle("greenplum", PlatformVariant::Greenplum);
        let controller = handle
            .instantiate(scope(), Box::new(ScriptedChannel::default()))
            .unwrap();
        let workload = PluginName::new("KMeansFloatRandom").unwrap();
        assert_eq!(
            controller.generator_path(&workload),
            handle.generators_dir.join("KMeansFloatRandom")
        );
    }

    #[test]
    fn test_state_tracking() {
        let handle = platform_handle("postgres", PlatformVariant::Postgres);
        let mut controller = handle
            .instantiate(scope(), Box::new(ScriptedChannel::default()))
            .unwrap();
        assert_eq!(controller.state(), RunState::Idle);
        controller.advance(RunState::Loaded).unwrap();
        assert!(matches!(
            controller.advance(RunState::Done),
            Err(HarnessError::InvalidTransition(_))
        ));
        assert_eq!(controller.state(), RunState::Loaded);
    }
}
