// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Linear and logistic regression on random data.

use clap::Parser;
use serde::Serialize;

use crate::error::ConfigError;
use crate::scope::ScopedConfig;

use super::{DataSet, WorkloadDefinition};

const LINEAR_RUN: &str = "SELECT (linregr).* FROM (\n    \
    SELECT {madlib_schema}.linregr(y, x) FROM {target_base_name}_data\n) AS q;";

const LOGISTIC_RUN: &str = "SELECT * FROM {madlib_schema}.logregr(\n    \
    '{target_base_name}_data', 'y', 'x', {iterations}, '{iterative_algorithm}', 0.001\n) AS q;";

const MODEL: DataSet = DataSet {
    suffix: "model",
    columns: &[("coef", "FLOAT8[]")],
    generator: "{generator} --ivariables {ivariables} --coef",
    row_id: false,
    per_worker: false,
};

/// Parameters of `linear_regression_random`.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "LinearRegressionRandom", about = "Linear regression on random data")]
pub struct LinearRegressionParams {
    /// Number of independent variables
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub ivariables: u64,

    /// Number of rows to generate
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub rows: u64,
}

/// Parameters of `logistic_regression_random`.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "LogisticRegressionRandom", about = "Logistic regression on random data")]
pub struct LogisticRegressionParams {
    /// Number of independent variables
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub ivariables: u64,

    /// Number of rows to generate
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub rows: u64,

    /// Maximum number of solver iterations
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub iterations: u64,

    /// Solver, e.g. irls, cg or igd
    #[arg(long = "iterative_algorithm")]
    pub iterative_algorithm: String,
}

pub(super) fn linear_definition() -> WorkloadDefinition {
    WorkloadDefinition {
        data: DataSet {
            suffix: "data",
            columns: &[("x", "FLOAT8[]"), ("y", "FLOAT8")],
            generator: "{generator} --ivariables {ivariables} --rows {rows} --table",
            row_id: false,
            per_worker: true,
        },
        model: Some(MODEL),
        run_query: linear_run,
    }
}

pub(super) fn logistic_definition() -> WorkloadDefinition {
    WorkloadDefinition {
        data: DataSet {
            suffix: "data",
            columns: &[("x", "FLOAT8[]"), ("y", "BOOLEAN")],
            generator: "{generator} --ivariables {ivariables} --rows {rows} --table",
            row_id: false,
            per_worker: true,
        },
        model: Some(MODEL),
        run_query: logistic_run,
    }
}

fn linear_run(_scope: &ScopedConfig) -> Result<&'static str, ConfigError> {
    Ok(LINEAR_RUN)
}

fn logistic_run(_scope: &ScopedConfig) -> Result<&'static str, ConfigError> {
    Ok(LOGISTIC_RUN)
}
