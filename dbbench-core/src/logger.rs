// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Result logger sinks.
//!
//! A logger receives one [`PhaseRecord`] per timed phase, after the phase's
//! timer has stopped.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::Local;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use uuid::Uuid;

use crate::error::LoggerError;
use crate::scope::Value;
use crate::timer::PhaseTiming;

const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// Timed phases of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Run,
}

impl Phase {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Run => "run",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a logger sees for one phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    pub run_id: Uuid,
    pub platform: String,
    pub workload: String,
    pub phase: Phase,
    pub timing: PhaseTiming,
    /// Phase output, or the failure text for a failed benchmark query.
    pub result: String,
    /// Public workload scope at the time the phase finished.
    pub snapshot: BTreeMap<String, Value>,
}

impl PhaseRecord {
    /// `<workload>.<phase>`
    pub fn operation(&self) -> String {
        format!("{}.{}", self.workload, self.phase)
    }
}

/// Sink for phase records.
pub trait BenchmarkLogger {
    fn log(&mut self, record: &PhaseRecord) -> Result<(), LoggerError>;
}

/// Available logger implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LoggerKind {
    #[default]
    Stdout,
    Json,
}

impl LoggerKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Json => "json",
        }
    }

    /// Build the logger writing to `sink`.
    pub fn create(self, sink: Box<dyn Write>) -> Box<dyn BenchmarkLogger> {
        match self {
            Self::Stdout => Box::new(StdOutLogger::new(sink)),
            Self::Json => Box::new(JsonLogger::new(sink)),
        }
    }
}

/// Human-readable logger.
pub struct StdOutLogger {
    out: Box<dyn Write>,
}

impl StdOutLogger {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }
}

impl BenchmarkLogger for StdOutLogger {
    fn log(&mut self, record: &PhaseRecord) -> Result<(), LoggerError> {
        let timestamp = record
            .timing
            .finished_at
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT);

        writeln!(
            self.out,
            "{}: {} completed after {:.3} seconds with the following result:\n{}",
            timestamp,
            record.operation(),
            record.timing.elapsed_secs(),
            record.result.trim_end_matches('\n'),
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Host the benchmark ran on, attached to every JSON record.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// Operating system name and version, e.g. `Ubuntu 22.04`
    pub os: String,
    pub kernel_version: Option<String>,
    pub cpu_model: String,
    /// Logical CPUs
    pub cpu_cores: usize,
    /// Total memory in bytes
    pub memory_bytes: u64,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let os = match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{} {}", name, version),
            (Some(name), None) => name,
            _ => std::env::consts::OS.to_string(),
        };

        Self {
            os,
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .unwrap_or_default(),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
        }
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    operation: String,
    elapsed_secs: f64,
    #[serde(flatten)]
    record: &'a PhaseRecord,
    system: &'a SystemInfo,
}

/// One JSON object per line and phase.
pub struct JsonLogger {
    out: Box<dyn Write>,
    system: SystemInfo,
}

impl JsonLogger {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            out,
            system: SystemInfo::collect(),
        }
    }
}

impl BenchmarkLogger for JsonLogger {
    fn log(&mut self, record: &PhaseRecord) -> Result<(), LoggerError> {
        let line = JsonRecord {
            operation: record.operation(),
            elapsed_secs: record.timing.elapsed_secs(),
            record,
            system: &self.system,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
