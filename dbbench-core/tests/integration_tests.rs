// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end integration tests for dbbench.
//!
//! These tests drive complete runs through a real client process: `psql` is
//! replaced by a shell script that records every invocation and answers
//! according to the SQL it receives.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dbbench_core::error::LoggerError;
use dbbench_core::logger::Phase;
use dbbench_core::{
    BenchmarkLogger, ConfigError, ConfigLoader, ConnectionInfo, Harness, HarnessError, JsonLogger,
    LoggerKind, PhaseRecord, PluginError, PluginRegistry, QueryError, RunOptions,
};
use tempfile::TempDir;

/// Collects records in memory.
#[derive(Default)]
struct Records(Vec<PhaseRecord>);

impl BenchmarkLogger for Records {
    fn log(&mut self, record: &PhaseRecord) -> Result<(), LoggerError> {
        self.0.push(record.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Vec<u8>>>);

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn executable(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// An installation root with a fake client and one benchmark per platform.
struct Install {
    dir: TempDir,
}

impl Install {
    /// `replies` is a list of `case` arms matched against the client's stdin.
    fn new(replies: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let log = root.join("client.log");
        let probes = root.join("probes");

        executable(
            &root.join("bin/psql"),
            &format!(
                r#"input=$(cat)
printf '%s\n-- args: %s\n==\n' "$input" "$*" >> '{log}'
case "$input" in
  *"SELECT 1;"*)
    count=$(cat '{probes}' 2>/dev/null || echo 0)
    count=$((count + 1))
    echo "$count" > '{probes}'
    [ "$count" -lt 3 ] && exit 2
    echo 1 ;;
  *"SELECT version();"*) echo "PostgreSQL 16.2" ;;
  *gp_segment_configuration*) echo 4 ;;
{replies}
esac
exit 0
"#,
                log = log.display(),
                probes = probes.display(),
                replies = replies,
            ),
        );

        std::fs::create_dir_all(root.join("config")).unwrap();
        std::fs::write(root.join("config/Version.yml"), "version: \"1.21.0\"\n").unwrap();
        std::fs::write(
            root.join("config/harness.yml"),
            format!(
                "probe_interval_ms: 1\nquery_client: \"{}\"\n",
                root.join("bin/psql").display()
            ),
        )
        .unwrap();

        let postgres = root.join("ports/postgres/benchmark");
        std::fs::create_dir_all(postgres.join("executors")).unwrap();
        std::fs::write(postgres.join("controller.yaml"), "variant: postgres\n").unwrap();
        std::fs::write(
            postgres.join("executors/LinearRegressionRandom.yaml"),
            "variant: linear_regression_random\n",
        )
        .unwrap();
        executable(
            &postgres.join("generators/LinearRegressionRandom"),
            "echo \"gen $*\"\n",
        );

        let greenplum = root.join("ports/greenplum/benchmark");
        std::fs::create_dir_all(greenplum.join("executors")).unwrap();
        std::fs::write(
            greenplum.join("controller.yaml"),
            "variant: greenplum\n\
             generator_platform: postgres\n\
             service:\n  stop: \"true\"\n  start: \"true\"\n",
        )
        .unwrap();
        std::fs::write(
            greenplum.join("executors/LinearRegressionRandom.yaml"),
            "variant: linear_regression_random\n",
        )
        .unwrap();

        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn harness(&self) -> Harness {
        let config = ConfigLoader::load_dir(self.root()).unwrap();
        Harness::new(config).with_os_id("plan9")
    }

    fn log(&self) -> String {
        std::fs::read_to_string(self.root().join("client.log")).unwrap_or_default()
    }

    fn generator(&self) -> PathBuf {
        self.root()
            .join("ports/postgres/benchmark/generators/LinearRegressionRandom")
    }
}

fn options(platform: &str, args: &[&str]) -> RunOptions {
    RunOptions {
        prog: "dbbench".to_string(),
        platform: platform.to_string(),
        logger: LoggerKind::Stdout,
        verbose: false,
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

const LINREGR: &[&str] = &[
    "-b",
    "LinearRegressionRandom",
    "--ivariables",
    "2",
    "--rows",
    "100",
];

#[test]
fn test_postgres_run_end_to_end() {
    let install = Install::new(r#"  *linregr*) echo "coef | {1,2}" ;;"#);
    let mut records = Records::default();

    let run = install
        .harness()
        .run(&options("postgres", LINREGR), &mut records)
        .unwrap();

    assert_eq!(run.probe_attempts, 3);
    assert_eq!(run.result, "coef | {1,2}\n");
    assert_eq!(run.snapshot["version"].to_string(), "PostgreSQL 16.2");
    assert_eq!(run.snapshot["library_version"].to_string(), "1.21.0");

    let phases: Vec<Phase> = records.0.iter().map(|r| r.phase).collect();
    assert_eq!(phases, vec![Phase::Load, Phase::Run]);
    assert_eq!(records.0[1].operation(), "LinearRegressionRandom.run");

    // generator output followed the COPY statement on the client's stdin
    let log = install.log();
    assert!(log.contains("gen --ivariables 2 --rows 100 --table --table-seed 0"));
    assert!(log.contains("gen --ivariables 2 --coef"));
    assert!(log.contains("-- args: -X -q -v ON_ERROR_STOP=1 --expanded"));
    assert_eq!(log.matches("SELECT 1;").count(), 3);

    let benchmark = log.find("linregr").unwrap();
    let last_probe = log.rfind("SELECT 1;").unwrap();
    assert!(last_probe < benchmark);
}

#[test]
fn test_greenplum_divides_rows_across_segments() {
    let install = Install::new("");
    let mut records = Records::default();

    let args = [
        "-b",
        "LinearRegressionRandom",
        "--ivariables",
        "2",
        "--rows",
        "1000",
    ];
    let run = install
        .harness()
        .run(&options("greenplum", &args), &mut records)
        .unwrap();

    assert_eq!(run.snapshot["segments"].to_string(), "4");
    assert_eq!(run.snapshot["rows"].to_string(), "250");
    assert_eq!(run.snapshot["rows_total"].to_string(), "1000");

    let log = install.log();
    let generator = install.generator().display().to_string();
    assert!(log.contains(&format!(
        "EXECUTE '{} --ivariables 2 --rows 250 --table --table-seed $GP_SEGMENT_ID' ON ALL",
        generator
    )));
    assert!(log.contains("--coef' ON MASTER"));
    // the generator runs on the segments, never locally
    assert!(!log.contains("gen --ivariables"));
}

#[test]
fn test_failed_benchmark_query_is_reported_as_result() {
    let install = Install::new("  *linregr*) exit 3 ;;");
    let mut records = Records::default();

    let run = install
        .harness()
        .run(&options("postgres", LINREGR), &mut records)
        .unwrap();

    assert_eq!(run.result, "Query client failed with error 3.");
    assert_eq!(records.0.len(), 2);
    assert_eq!(records.0[1].result, "Query client failed with error 3.");
}

#[test]
fn test_load_failure_aborts_before_service_restart() {
    let install = Install::new("  *COPY*) exit 1 ;;");
    let mut records = Records::default();

    let err = install
        .harness()
        .run(&options("postgres", LINREGR), &mut records)
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Query(QueryError::ExecutionFailed { status: 1 })
    ));
    assert!(records.0.is_empty());
    let log = install.log();
    assert!(!log.contains("SELECT 1;"));
    assert!(!log.contains("linregr"));
}

#[test]
fn test_failing_generator_fails_load() {
    let install = Install::new("");
    executable(&install.generator(), "exit 7\n");

    let err = install
        .harness()
        .run(&options("postgres", LINREGR), &mut Records::default())
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Query(QueryError::SourceCommandFailed { .. })
    ));
}

#[test]
fn test_unknown_platform_runs_nothing() {
    let install = Install::new("");

    let err = install
        .harness()
        .run(&options("oracle", LINREGR), &mut Records::default())
        .unwrap_err();

    match err {
        HarnessError::Plugin(PluginError::UnknownPlugin { name, available, .. }) => {
            assert_eq!(name, "oracle");
            assert_eq!(available, vec!["greenplum".to_string(), "postgres".to_string()]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(install.log().is_empty());
}

#[test]
fn test_unknown_workload_runs_nothing() {
    let install = Install::new("");

    let err = install
        .harness()
        .run(&options("postgres", &["-b", "NaiveBayes"]), &mut Records::default())
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Plugin(PluginError::UnknownPlugin { .. })
    ));
    assert!(install.log().is_empty());
}

#[test]
fn test_connection_string_reaches_client() {
    let install = Install::new("");
    let mut args = vec!["-c", "bench@localhost:5433/madlib"];
    args.extend_from_slice(LINREGR);

    let run = install
        .harness()
        .run(&options("postgres", &args), &mut Records::default())
        .unwrap();

    assert_eq!(run.snapshot["username"].to_string(), "bench");
    assert!(!run.snapshot.contains_key("_args"));
    assert!(install
        .log()
        .contains("-- args: -X -q -v ON_ERROR_STOP=1 -h localhost -p 5433 -d madlib -U bench"));
}

#[test]
fn test_invalid_connection_string_runs_nothing() {
    let install = Install::new("");
    let mut args = vec!["-c", "host:port"];
    args.extend_from_slice(LINREGR);

    let err = install
        .harness()
        .run(&options("postgres", &args), &mut Records::default())
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Config(ConfigError::InvalidConnectionString { .. })
    ));
    assert!(install.log().is_empty());
}

#[test]
fn test_connection_string_parsing() {
    let info = ConnectionInfo::parse(r"gp\@admin/s3cret@mdw:5432/analytics").unwrap();
    assert_eq!(info.user.as_deref(), Some("gp@admin"));
    assert_eq!(info.password.as_deref(), Some("s3cret"));
    assert_eq!(info.host.as_deref(), Some("mdw"));
    assert_eq!(info.database.as_deref(), Some("analytics"));
}

#[test]
fn test_json_logger_writes_one_line_per_phase() {
    let install = Install::new(r#"  *linregr*) echo "coef | {1,2}" ;;"#);
    let sink = Shared::default();
    let mut logger = JsonLogger::new(Box::new(sink.clone()));

    install
        .harness()
        .run(&options("postgres", LINREGR), &mut logger)
        .unwrap();

    let bytes = sink.0.lock().unwrap().clone();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["operation"], "LinearRegressionRandom.load");
    assert_eq!(lines[1]["operation"], "LinearRegressionRandom.run");
    assert_eq!(lines[1]["result"], "coef | {1,2}\n");
}

#[test]
fn test_json_records_omit_password() {
    let install = Install::new("");
    let sink = Shared::default();
    let mut logger = JsonLogger::new(Box::new(sink.clone()));
    let mut args = vec!["-c", "bench/s3cret@localhost:5433/madlib"];
    args.extend_from_slice(LINREGR);

    install
        .harness()
        .run(&options("postgres", &args), &mut logger)
        .unwrap();

    let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("\"username\":\"bench\""));
    assert!(!text.contains("s3cret"));
    assert!(!text.contains("password"));
}

#[test]
fn test_missing_version_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        ConfigLoader::load_dir(dir.path()),
        Err(ConfigError::ConfigNotFound { .. })
    ));
}

#[test]
fn test_shipped_ports_tree_resolves() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();
    let config = ConfigLoader::load_dir(root).unwrap();
    let registry = PluginRegistry::new(&config.ports_dir);

    let platforms: Vec<String> = registry
        .platforms()
        .unwrap()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(platforms, vec!["greenplum", "postgres"]);

    for name in &platforms {
        let platform = registry.resolve_platform(name).unwrap();
        let workloads = registry.workloads(&platform.descriptor.name).unwrap();
        assert!(!workloads.is_empty());
        for workload in &workloads {
            registry.resolve_workload(&platform, workload.as_str()).unwrap();
        }
    }

    let greenplum = registry.resolve_platform("greenplum").unwrap();
    assert!(greenplum.generators_dir.ends_with("postgres/benchmark/generators"));

    let tools = dbbench_core::os_tools::find_tools_manifest(&config.ports_dir, "darwin").unwrap();
    assert!(tools.is_some());
}
