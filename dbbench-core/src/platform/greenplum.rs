// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Greenplum: a coordinator plus primary segments.
//!
//! Data is generated on the segments themselves through external web tables,
//! so each segment runs the generator with its own `$GP_SEGMENT_ID` seed.

use std::cell::OnceCell;
use std::sync::Arc;

use crate::channel::{Query, QueryChannel};
use crate::config::ServiceCommands;
use crate::error::{HarnessError, HarnessResult};
use crate::scope::{ScopedConfig, Value};

use super::{Facts, LoadStrategy, PlatformController, PlatformCore, PlatformHandle};

const SEGMENT_COUNT_QUERY: &str =
    "SELECT count(*) FROM gp_segment_configuration WHERE content >= 0 AND role = 'p';";
const GPSTOP: &str = "gpstop -a -M fast";
const GPSTART: &str = "gpstart -a";

pub struct GreenplumController {
    core: PlatformCore,
    segments: OnceCell<u64>,
}

impl GreenplumController {
    pub fn new(
        handle: &PlatformHandle,
        scope: Arc<ScopedConfig>,
        channel: Box<dyn QueryChannel>,
    ) -> HarnessResult<Self> {
        let defaults = ServiceCommands {
            stop: Some(GPSTOP.to_string()),
            start: Some(GPSTART.to_string()),
        };

        Ok(Self {
            core: PlatformCore::new(handle, scope, channel, defaults)?,
            segments: OnceCell::new(),
        })
    }

    fn count_segments(&self) -> HarnessResult<u64> {
        let output = self
            .core
            .query(&Query::new(SEGMENT_COUNT_QUERY).tuples_only())?;

        match output.trim().parse::<u64>() {
            Ok(count) if count > 0 => {
                tracing::debug!(platform = %self.core.name(), segments = count, "Counted primary segments");
                Ok(count)
            }
            _ => Err(HarnessError::Introspection {
                what: "primary segment count",
                output,
            }),
        }
    }
}

impl PlatformController for GreenplumController {
    fn core(&self) -> &PlatformCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlatformCore {
        &mut self.core
    }

    fn worker_count(&self) -> HarnessResult<u64> {
        if let Some(count) = self.segments.get() {
            return Ok(*count);
        }
        let count = self.count_segments()?;
        let _ = self.segments.set(count);
        Ok(count)
    }

    fn load_strategy(&self) -> LoadStrategy {
        LoadStrategy::ExternalSource
    }

    fn setup(&mut self) -> HarnessResult<Facts> {
        let mut facts = self.core.version_facts()?;
        facts.insert("segments".to_string(), Value::from(self.worker_count()?));
        self.core.merge_facts(&facts)?;
        Ok(facts)
    }
}
