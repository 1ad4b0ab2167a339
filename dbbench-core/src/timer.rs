// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Phase timing.
//!
//! Elapsed time comes from the monotonic clock; the wall-clock timestamps
//! are only recorded for reporting.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timer for measuring a single phase.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    started_at: DateTime<Utc>,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Stop the timer and return the phase timing.
    pub fn stop(self) -> PhaseTiming {
        let elapsed = self.start.elapsed();
        PhaseTiming {
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed,
        }
    }
}

/// Start/stop timestamps and elapsed time of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl PhaseTiming {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Measure the execution time of a closure.
pub fn measure<F, T>(f: F) -> (T, PhaseTiming)
where
    F: FnOnce() -> T,
{
    let timer = Timer::start();
    let result = f();
    (result, timer.stop())
}
