// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! dbbench Core Library
//!
//! Benchmark orchestration for in-database analytics workloads. Provides
//! chained configuration scopes, a directory-backed plugin registry, the
//! query channel to the platform's SQL client, platform controllers with a
//! typed run state machine, workload executors and result loggers.

pub mod args;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod harness;
pub mod lifecycle;
pub mod logger;
pub mod os_tools;
pub mod platform;
pub mod registry;
pub mod scope;
pub mod state;
pub mod template;
pub mod timer;
pub mod types;
pub mod workload;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use channel::{PsqlChannel, Query, QueryChannel, TransportOptions};
pub use config::{ConfigLoader, HarnessConfig};
pub use connection::ConnectionInfo;
pub use error::{ConfigError, HarnessError, HarnessResult, PluginError, QueryError};
pub use harness::{Harness, RunOptions};
pub use lifecycle::BenchmarkRun;
pub use logger::{BenchmarkLogger, JsonLogger, LoggerKind, PhaseRecord, StdOutLogger};
pub use platform::{LoadStrategy, PlatformController, PlatformHandle};
pub use registry::PluginRegistry;
pub use scope::{Lookup, ScopedConfig, Value};
pub use state::{RunState, RunStateMachine};
pub use types::{PluginKind, PluginName, Port};
pub use workload::{WorkloadExecutor, WorkloadHandle};
