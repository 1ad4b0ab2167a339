// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Options understood by every platform.

use std::path::PathBuf;

use clap::Parser;

use crate::connection::ConnectionInfo;
use crate::error::ConfigError;
use crate::scope::{ScopedConfig, Value};

/// Platform options; everything else is forwarded to the workload.
#[derive(Debug, Clone, Parser)]
#[command(name = "platform", about = "Data platform options")]
pub struct PlatformArgs {
    /// Connection string: [user[/password]@][host][:port][/database]
    #[arg(short = 'c', long = "conn", value_name = "CONNSTR", default_value = "")]
    pub connection_string: String,

    /// Schema the analytics library is installed in
    #[arg(long = "madlib_schema", default_value = "madlib")]
    pub madlib_schema: String,

    /// Schema holding benchmark tables
    #[arg(long = "target_schema", default_value = "madlib_benchmark")]
    pub target_schema: String,

    /// Table name prefix [default: <target_schema>.<benchmark in lower case>]
    #[arg(long = "target_base_name")]
    pub target_base_name: Option<String>,

    /// Workload to run
    #[arg(short = 'b', long = "benchmark", value_name = "BENCHMARK")]
    pub benchmark: String,

    /// Server data directory, enables pg_ctl service control
    #[arg(long = "pgdata", value_name = "DIR")]
    pub data_directory: Option<PathBuf>,
}

impl PlatformArgs {
    /// Write the options into the platform scope, forwarding `rest` as the
    /// private argument list. Returns the parsed connection.
    pub fn apply(
        &self,
        scope: &mut ScopedConfig,
        rest: Vec<String>,
    ) -> Result<ConnectionInfo, ConfigError> {
        let connection = ConnectionInfo::parse(&self.connection_string)?;

        scope.extend(connection.scope_entries());
        scope.set("_connection_string", self.connection_string.as_str());
        scope.set("madlib_schema", self.madlib_schema.as_str());
        scope.set("target_schema", self.target_schema.as_str());
        scope.set("target_base_name", self.target_base_name.clone());
        scope.set("benchmark", self.benchmark.as_str());
        scope.set(
            "data_directory",
            self.data_directory
                .as_ref()
                .map(|dir| Value::from(dir.display().to_string()))
                .unwrap_or(Value::Null),
        );
        scope.set("_args", rest);

        Ok(connection)
    }
}
