// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `dbbench list` command - List discoverable platforms and workloads.

use std::path::Path;

use dbbench_core::PluginRegistry;

pub fn execute(root: &Path, platform: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let registry = PluginRegistry::new(&config.ports_dir);

    let platforms = match platform {
        Some(name) => vec![registry.resolve_platform(name)?.descriptor.name],
        None => registry.platforms()?.into_iter().collect(),
    };

    if platforms.is_empty() {
        println!("No platforms found in {}.", config.ports_dir.display());
        return Ok(());
    }

    for platform in &platforms {
        println!("{}", platform);
        let workloads = registry.workloads(platform)?;
        if workloads.is_empty() {
            println!("  (no workloads)");
        }
        for workload in &workloads {
            println!("  - {}", workload);
        }
    }

    println!();
    println!("Total: {} platform(s)", platforms.len());

    Ok(())
}
