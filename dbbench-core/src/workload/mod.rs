// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Workload executors.
//!
//! Built-in workloads are declarative: a [`WorkloadDefinition`] names the
//! tables to generate and the benchmark query to time. The executor turns a
//! definition into SQL for whatever load strategy the platform uses, so
//! workloads never see platform mechanics.

mod kmeans;
mod regression;

pub use kmeans::KmeansParams;
pub use regression::{LinearRegressionParams, LogisticRegressionParams};

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use crate::args::parse_all;
use crate::channel::Query;
use crate::config::{WorkloadManifest, WorkloadVariant};
use crate::error::{ConfigError, HarnessResult, QueryError};
use crate::platform::{LoadStrategy, PlatformController};
use crate::registry::PluginDescriptor;
use crate::scope::ScopedConfig;
use crate::template::render_scope;
use crate::types::PluginName;

const CREATE_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS {target_schema};";

/// A generated table.
#[derive(Debug, Clone, Copy)]
pub struct DataSet {
    /// Appended to `target_base_name` to form the table name.
    pub suffix: &'static str,
    /// Generated columns, in generator output order.
    pub columns: &'static [(&'static str, &'static str)],
    /// Generator invocation template, rendered against the workload scope.
    pub generator: &'static str,
    /// Prepend a sequential `pid` column.
    pub row_id: bool,
    /// Generated on every worker with a per-worker seed.
    pub per_worker: bool,
}

impl DataSet {
    fn column_names(&self) -> String {
        self.columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_definitions(&self) -> String {
        self.columns
            .iter()
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Drop and recreate the table, then COPY generator output from stdin.
    fn pipe_sql(&self, table: &str) -> String {
        let id = if self.row_id { "pid BIGSERIAL, " } else { "" };
        format!(
            "DROP TABLE IF EXISTS {table} CASCADE;\n\
             CREATE TABLE {table} ({id}{columns});\n\
             COPY {table} ({names}) FROM STDIN;\n",
            table = table,
            id = id,
            columns = self.column_definitions(),
            names = self.column_names(),
        )
    }

    /// Let the platform run the generator through an external web table.
    fn external_sql(&self, table: &str, generator: &str) -> String {
        let source = format!("pg_temp.{}_source", self.suffix);
        let (seed, location) = if self.per_worker {
            (" --table-seed $GP_SEGMENT_ID", "ALL")
        } else {
            ("", "MASTER")
        };
        let id = if self.row_id { "row_number() OVER () AS pid, " } else { "" };

        format!(
            "CREATE READABLE EXTERNAL WEB TABLE {source} ({columns})\n\
             EXECUTE '{command}{seed}' ON {location} FORMAT 'TEXT';\n\
             DROP TABLE IF EXISTS {table} CASCADE;\n\
             CREATE TABLE {table} AS SELECT {id}{names} FROM {source} DISTRIBUTED RANDOMLY;\n\
             DROP EXTERNAL TABLE {source};\n",
            source = source,
            columns = self.column_definitions(),
            command = generator.replace('\'', "''"),
            seed = seed,
            location = location,
            table = table,
            id = id,
            names = self.column_names(),
        )
    }
}

/// Everything a built-in workload declares.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadDefinition {
    pub data: DataSet,
    pub model: Option<DataSet>,
    /// Selects the benchmark query template for the workload scope.
    pub run_query: fn(&ScopedConfig) -> Result<&'static str, ConfigError>,
}

impl WorkloadDefinition {
    fn data_sets(&self) -> impl Iterator<Item = &DataSet> {
        std::iter::once(&self.data).chain(self.model.as_ref())
    }
}

/// A resolved workload plugin.
#[derive(Debug, Clone)]
pub struct WorkloadHandle {
    pub descriptor: PluginDescriptor,
    pub manifest: WorkloadManifest,
}

impl WorkloadHandle {
    pub fn name(&self) -> &PluginName {
        &self.descriptor.name
    }

    /// Parse the workload's parameters from the forwarded arguments.
    ///
    /// Pure: nothing is executed, so argument errors surface before any
    /// process is spawned.
    pub fn prepare(&self, args: &[String]) -> HarnessResult<PreparedWorkload> {
        let (definition, parameters) = match self.manifest.variant {
            WorkloadVariant::LinearRegressionRandom => (
                regression::linear_definition(),
                parse_parameters::<LinearRegressionParams>(args)?,
            ),
            WorkloadVariant::LogisticRegressionRandom => (
                regression::logistic_definition(),
                parse_parameters::<LogisticRegressionParams>(args)?,
            ),
            WorkloadVariant::KmeansFloatRandom => (
                kmeans::definition(),
                parse_parameters::<KmeansParams>(args)?,
            ),
        };

        Ok(PreparedWorkload {
            name: self.descriptor.name.clone(),
            definition,
            parameters,
        })
    }
}

fn parse_parameters<P: Parser + Serialize>(args: &[String]) -> Result<ScopedConfig, ConfigError> {
    let parsed: P = parse_all(args)?;
    let mut parameters = ScopedConfig::root();
    parameters.extend_serialized(&parsed)?;
    Ok(parameters)
}

/// A workload with validated parameters, waiting for its platform scope.
#[derive(Debug)]
pub struct PreparedWorkload {
    name: PluginName,
    definition: WorkloadDefinition,
    parameters: ScopedConfig,
}

impl PreparedWorkload {
    pub fn name(&self) -> &PluginName {
        &self.name
    }

    pub fn parameters(&self) -> &ScopedConfig {
        &self.parameters
    }

    /// Create the workload scope under `platform_scope` and build the executor.
    pub fn instantiate(
        self,
        platform_scope: &Arc<ScopedConfig>,
    ) -> HarnessResult<Box<dyn WorkloadExecutor>> {
        let mut scope = platform_scope.child();
        scope.extend(self.parameters.snapshot(false));

        if !scope.has("target_base_name", false) {
            let base_name = format!(
                "{}.{}",
                scope.get_str("target_schema")?,
                self.name.as_str().to_lowercase()
            );
            scope.set("target_base_name", base_name);
        }
        // every remaining argument was consumed by the parameter parser
        scope.set("_args", Vec::<String>::new());

        tracing::debug!(workload = %self.name, depth = scope.depth(), "Workload scope created");

        Ok(Box::new(BenchmarkExecutor {
            name: self.name,
            definition: self.definition,
            scope,
        }))
    }
}

/// Loads and runs one workload against a platform.
pub trait WorkloadExecutor {
    fn name(&self) -> &PluginName;

    /// The workload scope.
    fn scope(&self) -> &ScopedConfig;

    /// Create the benchmark tables. Every failure propagates.
    fn load(&mut self, platform: &dyn PlatformController) -> HarnessResult<String>;

    /// Run the benchmark query. A failing query becomes the returned payload.
    fn run(&mut self, platform: &dyn PlatformController) -> HarnessResult<String>;
}

/// Executor for declarative workload definitions.
#[derive(Debug)]
pub struct BenchmarkExecutor {
    name: PluginName,
    definition: WorkloadDefinition,
    scope: ScopedConfig,
}

impl BenchmarkExecutor {
    fn table_query(&self, set: &DataSet, strategy: LoadStrategy) -> HarnessResult<Query> {
        let table = format!("{}_{}", self.scope.get_str("target_base_name")?, set.suffix);
        let generator = render_scope(set.generator, &self.scope)?;

        Ok(match strategy {
            LoadStrategy::Pipe => {
                let command = if set.per_worker {
                    format!("{} --table-seed 0", generator)
                } else {
                    generator
                };
                Query::new(set.pipe_sql(&table)).with_stdin_command(command)
            }
            LoadStrategy::ExternalSource => Query::new(set.external_sql(&table, &generator)),
        })
    }
}

impl WorkloadExecutor for BenchmarkExecutor {
    fn name(&self) -> &PluginName {
        &self.name
    }

    fn scope(&self) -> &ScopedConfig {
        &self.scope
    }

    fn load(&mut self, platform: &dyn PlatformController) -> HarnessResult<String> {
        let workers = platform.worker_count()?;
        let requested = self.scope.get_int("rows")?;
        let per_worker = (requested / i64::try_from(workers).unwrap_or(i64::MAX)).max(1);

        self.scope.set(
            "generator",
            platform.generator_path(&self.name).display().to_string(),
        );
        self.scope.set("rows_total", requested);
        self.scope.set("rows", per_worker);

        tracing::info!(
            workload = %self.name,
            workers,
            rows_total = requested,
            rows_per_worker = per_worker,
            strategy = ?platform.load_strategy(),
            "Loading benchmark data"
        );

        let mut output = platform.run_query(&Query::new(render_scope(CREATE_SCHEMA, &self.scope)?))?;
        for set in self.definition.data_sets() {
            let query = self.table_query(set, platform.load_strategy())?;
            output.push_str(&platform.run_query(&query)?);
        }

        Ok(output)
    }

    fn run(&mut self, platform: &dyn PlatformController) -> HarnessResult<String> {
        let template = (self.definition.run_query)(&self.scope)?;
        let sql = render_scope(template, &self.scope)?;

        match platform.run_query(&Query::new(sql).expanded()) {
            Ok(output) => Ok(output),
            Err(e @ QueryError::ExecutionFailed { .. }) => {
                tracing::warn!(workload = %self.name, error = %e, "Benchmark query failed");
                Ok(e.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }
}
