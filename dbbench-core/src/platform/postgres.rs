// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Single-node PostgreSQL.

use std::sync::Arc;

use crate::channel::QueryChannel;
use crate::config::ServiceCommands;
use crate::error::HarnessResult;
use crate::scope::ScopedConfig;

use super::{LoadStrategy, PlatformController, PlatformCore, PlatformHandle};

const PG_CTL_STOP: &str = "pg_ctl -D {data_directory} -m fast -w stop";
const PG_CTL_START: &str = "pg_ctl -D {data_directory} -l {data_directory}/dbbench-server.log -w start";

pub struct PostgresController {
    core: PlatformCore,
}

impl PostgresController {
    pub fn new(
        handle: &PlatformHandle,
        scope: Arc<ScopedConfig>,
        channel: Box<dyn QueryChannel>,
    ) -> HarnessResult<Self> {
        // pg_ctl needs the data directory; without one, service control is skipped
        let defaults = if scope.has("data_directory", false) {
            ServiceCommands {
                stop: Some(PG_CTL_STOP.to_string()),
                start: Some(PG_CTL_START.to_string()),
            }
        } else {
            ServiceCommands::default()
        };

        Ok(Self {
            core: PlatformCore::new(handle, scope, channel, defaults)?,
        })
    }
}

impl PlatformController for PostgresController {
    fn core(&self) -> &PlatformCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlatformCore {
        &mut self.core
    }

    fn worker_count(&self) -> HarnessResult<u64> {
        Ok(1)
    }

    fn load_strategy(&self) -> LoadStrategy {
        LoadStrategy::Pipe
    }
}
