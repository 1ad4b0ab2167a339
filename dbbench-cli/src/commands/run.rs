// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `dbbench run` command - Run one benchmark.
//!
//! Results go to the selected logger; diagnostics go to stderr.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use dbbench_core::{ConfigError, Harness, HarnessError, LoggerKind, RunOptions};

pub struct RunArgs {
    pub platform: String,
    pub logger: LoggerKind,
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
    pub args: Vec<String>,
}

pub fn execute(root: &Path, run: RunArgs) -> anyhow::Result<()> {
    let config = super::load_config(root)?;

    let sink: Box<dyn Write> = match &run.log_file {
        Some(path) => Box::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut logger = run.logger.create(sink);

    let options = RunOptions {
        prog: "dbbench".to_string(),
        platform: run.platform,
        logger: run.logger,
        verbose: run.verbose,
        args: run.args,
    };

    match Harness::new(config).run(&options, logger.as_mut()) {
        Ok(result) => {
            tracing::info!(
                run_id = %result.run_id,
                platform = %result.platform,
                workload = %result.workload,
                probe_attempts = result.probe_attempts,
                "Benchmark finished"
            );
            Ok(())
        }
        // usage errors (including --help) print like the top-level parser's
        Err(HarnessError::Config(ConfigError::Arguments(e))) => e.exit(),
        Err(e) => Err(e).context(format!("Benchmark run on '{}' failed", options.platform)),
    }
}
