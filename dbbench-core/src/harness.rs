// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Run orchestration: from command-line arguments to a finished run.
//!
//! Every plugin and argument is resolved and validated before the first
//! external process is spawned.

use std::sync::Arc;

use uuid::Uuid;

use crate::args::parse_known;
use crate::channel::{PsqlChannel, QueryChannel};
use crate::config::HarnessConfig;
use crate::connection::ConnectionInfo;
use crate::error::HarnessResult;
use crate::lifecycle::{BenchmarkRun, Lifecycle};
use crate::logger::{BenchmarkLogger, LoggerKind};
use crate::os_tools::{host_os_id, resolve_flusher};
use crate::platform::PlatformArgs;
use crate::registry::PluginRegistry;
use crate::scope::ScopedConfig;
use crate::state::RunState;

/// Builds the query channel for a parsed connection.
pub type ChannelFactory = Box<dyn Fn(&ConnectionInfo, &HarnessConfig) -> Box<dyn QueryChannel>>;

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Program name used in diagnostics.
    pub prog: String,
    pub platform: String,
    pub logger: LoggerKind,
    pub verbose: bool,
    /// Arguments for the platform and workload layers.
    pub args: Vec<String>,
}

/// The benchmark harness.
pub struct Harness {
    config: HarnessConfig,
    registry: PluginRegistry,
    channel_factory: ChannelFactory,
    os_id: String,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            registry: PluginRegistry::new(&config.ports_dir),
            channel_factory: Box::new(
                |connection: &ConnectionInfo, config: &HarnessConfig| -> Box<dyn QueryChannel> {
                    Box::new(PsqlChannel::new(config.query_client.clone(), connection.clone()))
                },
            ),
            os_id: host_os_id().to_string(),
            config,
        }
    }

    /// Replace the query channel, e.g. with a scripted one.
    pub fn with_channel_factory(mut self, factory: ChannelFactory) -> Self {
        self.channel_factory = factory;
        self
    }

    /// Override the host OS identifier used to find OS tools.
    pub fn with_os_id(mut self, os_id: impl Into<String>) -> Self {
        self.os_id = os_id.into();
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Root scope for a run.
    pub fn root_scope(&self, options: &RunOptions) -> ScopedConfig {
        let mut root = ScopedConfig::root();
        root.set("prog", options.prog.as_str());
        root.set("platform", options.platform.as_str());
        root.set("logger", options.logger.name());
        root.set("verbose", options.verbose);
        root.set("root_dir", self.config.root_dir.display().to_string());
        root.set("ports_dir", self.config.ports_dir.display().to_string());
        root.set("library_version", self.config.library_version.as_str());
        root.set(
            "probe_interval_ms",
            i64::try_from(self.config.probe_interval.as_millis()).unwrap_or(i64::MAX),
        );
        root.set("query_client", self.config.query_client.as_str());
        root.set("os", self.os_id.as_str());
        root.set("_args", options.args.clone());
        root
    }

    /// Resolve everything, then run the lifecycle.
    pub fn run(&self, options: &RunOptions, logger: &mut dyn BenchmarkLogger) -> HarnessResult<BenchmarkRun> {
        let root = Arc::new(self.root_scope(options));

        let platform = self.registry.resolve_platform(&options.platform)?;
        let (platform_args, rest) = parse_known::<PlatformArgs>(&root.get_str_list("_args")?)?;

        let mut platform_scope = root.child();
        let connection = platform_args.apply(&mut platform_scope, rest)?;

        let workload = self
            .registry
            .resolve_workload(&platform, &platform_args.benchmark)?;
        let prepared = workload.prepare(&platform_scope.get_str_list("_args")?)?;
        let flusher = resolve_flusher(&self.config.ports_dir, &self.os_id)?;

        tracing::info!(
            platform = %platform.name(),
            workload = %workload.name(),
            library_version = %self.config.library_version,
            "Resolved benchmark"
        );

        // Nothing external has run before this point.
        let channel = (self.channel_factory)(&connection, &self.config);
        let mut controller = platform.instantiate(Arc::new(platform_scope), channel)?;

        if let Err(e) = controller.setup() {
            let _ = controller.advance(RunState::Failed);
            return Err(e);
        }

        let mut executor = prepared.instantiate(controller.scope())?;

        Lifecycle::new(
            Uuid::new_v4(),
            controller.as_mut(),
            executor.as_mut(),
            flusher.as_ref(),
            logger,
        )
        .execute()
    }
}
