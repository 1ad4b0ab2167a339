// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! k-means clustering on random float data.
//!
//! The benchmark query depends on the initialization method: `canopy` seeds
//! from canopy clustering, `random` and `kmeans++` sample initial centroids,
//! and anything else seeds from the generated model table.

use clap::Parser;
use serde::Serialize;

use crate::error::ConfigError;
use crate::scope::ScopedConfig;

use super::{DataSet, WorkloadDefinition};

const CANOPY_RUN: &str = "SELECT {madlib_schema}.kmeans(\n    \
    '{target_base_name}_data', 'position', 'pid',\n    \
    'canopy', {init_sample_pct},\n    \
    {t1}, {t2}, '{distance}',\n    \
    {max_iteration}, {convergence_threshold}, True,\n    \
    '{target_base_name}_km_points', '{target_base_name}_km_centroids', True,\n    \
    True\n);";

const SAMPLED_RUN: &str = "SELECT {madlib_schema}.kmeans(\n    \
    '{target_base_name}_data', 'position', 'pid',\n    \
    '{init_method}', {init_sample_pct},\n    \
    {centroids}, '{distance}',\n    \
    {max_iteration}, {convergence_threshold}, True,\n    \
    '{target_base_name}_km_points', '{target_base_name}_km_centroids', True,\n    \
    True\n);";

const SEEDED_RUN: &str = "SELECT {madlib_schema}.kmeans(\n    \
    '{target_base_name}_data', 'position', 'pid',\n    \
    '{target_base_name}_model', 'centroid',\n    \
    '{distance}',\n    \
    {max_iteration}, {convergence_threshold}, True,\n    \
    '{target_base_name}_km_points', '{target_base_name}_km_centroids', True,\n    \
    True\n);";

/// Parameters of `kmeans_float_random`.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "KMeansFloatRandom", about = "k-means on random float data")]
pub struct KmeansParams {
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub dimensions: u64,

    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub rows: u64,

    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub centroids: u64,

    #[arg(long = "max_iteration", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_iteration: u64,

    #[arg(long = "convergence_threshold")]
    pub convergence_threshold: f64,

    /// canopy, random, kmeans++ or anything else to seed from the model table
    #[arg(long = "init_method")]
    pub init_method: String,

    #[arg(long, default_value = "l2norm")]
    pub distance: String,

    /// Canopy radius thresholds
    #[arg(long)]
    pub t1: Option<f64>,

    #[arg(long)]
    pub t2: Option<f64>,

    #[arg(long = "init_sample_pct", default_value_t = 1.0)]
    pub init_sample_pct: f64,
}

pub(super) fn definition() -> WorkloadDefinition {
    WorkloadDefinition {
        data: DataSet {
            suffix: "data",
            columns: &[("position", "FLOAT8[]")],
            generator: "{generator} --dimensions {dimensions} --rows {rows} --centroids {centroids} --stddev 0.01 -s 10 --table",
            row_id: true,
            per_worker: true,
        },
        model: Some(DataSet {
            suffix: "model",
            columns: &[("centroid", "FLOAT8[]")],
            generator: "{generator} --dimensions {dimensions} --centroids {centroids} --centroid",
            row_id: false,
            per_worker: false,
        }),
        run_query,
    }
}

fn run_query(scope: &ScopedConfig) -> Result<&'static str, ConfigError> {
    Ok(match scope.get_str("init_method")? {
        "canopy" => CANOPY_RUN,
        "random" | "kmeans++" => SAMPLED_RUN,
        _ => SEEDED_RUN,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::render_scope;

    fn scope(init_method: &str) -> ScopedConfig {
        let mut scope = ScopedConfig::root();
        scope
            .extend_serialized(&KmeansParams {
                dimensions: 3,
                rows: 100,
                centroids: 5,
                max_iteration: 20,
                convergence_threshold: 0.001,
                init_method: init_method.to_string(),
                distance: "l2norm".to_string(),
                t1: None,
                t2: Some(0.5),
                init_sample_pct: 1.0,
            })
            .unwrap();
        scope.set("madlib_schema", "madlib");
        scope.set("target_base_name", "bench.km");
        scope
    }

    fn render(init_method: &str) -> String {
        let scope = scope(init_method);
        render_scope(run_query(&scope).unwrap(), &scope).unwrap()
    }

    #[test]
    fn test_canopy_query() {
        let sql = render("canopy");
        assert!(sql.contains("'canopy', 1,"));
        assert!(sql.contains("NULL, 0.5, 'l2norm',"));
        assert!(sql.contains("20, 0.001, True,"));
    }

    #[test]
    fn test_sampled_query() {
        let sql = render("kmeans++");
        assert!(sql.contains("'kmeans++', 1,"));
        assert!(sql.contains("5, 'l2norm',"));
        assert!(render("random").contains("'random', 1,"));
    }

    #[test]
    fn test_model_seeded_query() {
        let sql = render("model");
        assert!(sql.contains("'bench.km_model', 'centroid',"));
        assert!(!sql.contains("public."));
    }

    #[test]
    fn test_data_table_has_row_id() {
        let definition = definition();
        assert!(definition.data.row_id);
        assert!(definition
            .data
            .pipe_sql("bench.km_data")
            .contains("(pid BIGSERIAL, position FLOAT8[])"));
    }
}
