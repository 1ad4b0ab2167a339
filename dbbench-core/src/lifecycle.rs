// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark lifecycle.
//!
//! ```text
//! load (timed, logged) → stop service → flush cache → start service
//!      → run (timed, logged) → done
//! ```
//!
//! Any error moves the run to `Failed` and propagates; only a failing
//! benchmark query is absorbed, by the executor, into the run payload.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::HarnessResult;
use crate::logger::{BenchmarkLogger, Phase, PhaseRecord};
use crate::os_tools::CacheFlusher;
use crate::platform::PlatformController;
use crate::scope::Value;
use crate::state::RunState;
use crate::timer::{measure, PhaseTiming};
use crate::workload::WorkloadExecutor;

/// Record of one completed benchmark run. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRun {
    pub run_id: Uuid,
    pub platform: String,
    pub workload: String,
    /// Public workload scope after the run.
    pub snapshot: BTreeMap<String, Value>,
    pub load: PhaseTiming,
    pub run: PhaseTiming,
    /// Benchmark output, or the failure text of the benchmark query.
    pub result: String,
    /// Probe queries needed before the service answered.
    pub probe_attempts: u32,
}

/// Drives one workload through the lifecycle on one platform.
pub struct Lifecycle<'a> {
    run_id: Uuid,
    platform: &'a mut dyn PlatformController,
    workload: &'a mut dyn WorkloadExecutor,
    flusher: &'a dyn CacheFlusher,
    logger: &'a mut dyn BenchmarkLogger,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        run_id: Uuid,
        platform: &'a mut dyn PlatformController,
        workload: &'a mut dyn WorkloadExecutor,
        flusher: &'a dyn CacheFlusher,
        logger: &'a mut dyn BenchmarkLogger,
    ) -> Self {
        Self {
            run_id,
            platform,
            workload,
            flusher,
            logger,
        }
    }

    /// Execute every phase in order.
    pub fn execute(mut self) -> HarnessResult<BenchmarkRun> {
        tracing::info!(
            run_id = %self.run_id,
            platform = self.platform.name(),
            workload = %self.workload.name(),
            "Starting benchmark run"
        );

        match self.drive() {
            Ok(run) => {
                tracing::info!(
                    run_id = %self.run_id,
                    load_secs = run.load.elapsed_secs(),
                    run_secs = run.run.elapsed_secs(),
                    "Benchmark run complete"
                );
                Ok(run)
            }
            Err(e) => {
                let state = self.platform.state();
                if !state.is_terminal() {
                    // the original error is what gets reported
                    let _ = self.platform.advance(RunState::Failed);
                }
                tracing::error!(run_id = %self.run_id, state = state.name(), error = %e, "Benchmark run failed");
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> HarnessResult<BenchmarkRun> {
        let (loaded, load) = measure(|| self.workload.load(&*self.platform));
        let load_output = loaded?;
        self.platform.advance(RunState::Loaded)?;
        self.log(Phase::Load, load, &load_output)?;

        self.platform.stop_service()?;
        self.platform.advance(RunState::ServiceStopped)?;

        self.flusher.flush()?;
        self.platform.advance(RunState::CacheFlushed)?;

        let probe_attempts = self.platform.start_service()?;
        self.platform.advance(RunState::ServiceStarted)?;

        let (ran, run) = measure(|| self.workload.run(&*self.platform));
        let result = ran?;
        self.platform.advance(RunState::Ran)?;
        self.log(Phase::Run, run, &result)?;

        self.platform.advance(RunState::Done)?;

        Ok(BenchmarkRun {
            run_id: self.run_id,
            platform: self.platform.name().to_string(),
            workload: self.workload.name().to_string(),
            snapshot: self.workload.scope().snapshot(true),
            load,
            run,
            result,
            probe_attempts,
        })
    }

    fn log(&mut self, phase: Phase, timing: PhaseTiming, result: &str) -> HarnessResult<()> {
        let record = PhaseRecord {
            run_id: self.run_id,
            platform: self.platform.name().to_string(),
            workload: self.workload.name().to_string(),
            phase,
            timing,
            result: result.to_string(),
            snapshot: self.workload.scope().snapshot(true),
        };
        self.logger.log(&record)?;
        Ok(())
    }
}
