// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod list;
pub mod run;

use std::path::Path;

use anyhow::Context;
use dbbench_core::{ConfigLoader, HarnessConfig};

/// Load the harness configuration below `root`.
pub(crate) fn load_config(root: &Path) -> anyhow::Result<HarnessConfig> {
    ConfigLoader::load_dir(root)
        .with_context(|| format!("Failed to load harness configuration from {}", root.display()))
}
