// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Host OS tooling: buffer cache flushing and shell command execution.
//!
//! OS tools live in the ports tree next to the platforms, as
//! `ports/<os>/benchmark/tools.yaml`. The entry whose name is the longest
//! prefix of the host OS identifier wins.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::channel::describe_status;
use crate::config::ToolsManifest;
use crate::error::{HarnessError, HarnessResult};

const TOOLS_MANIFEST: &str = "tools.yaml";

/// Identifier matched against ports entries.
pub fn host_os_id() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Drops the host's file-system buffer cache between load and run.
pub trait CacheFlusher {
    fn flush(&self) -> HarnessResult<()>;
}

/// Used when the host has no cache-flush tool.
#[derive(Debug, Default)]
pub struct NoopFlusher;

impl CacheFlusher for NoopFlusher {
    fn flush(&self) -> HarnessResult<()> {
        tracing::info!("No buffer cache flush tool for this host, skipping");
        Ok(())
    }
}

/// Runs a shell command to flush the cache.
#[derive(Debug, Clone)]
pub struct CommandFlusher {
    command: String,
}

impl CommandFlusher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl CacheFlusher for CommandFlusher {
    fn flush(&self) -> HarnessResult<()> {
        tracing::info!(command = %self.command, "Flushing buffer cache");
        run_shell(&self.command).map(|_| ())
    }
}

/// Find the tools manifest for `os_id` under `ports_dir`.
pub fn find_tools_manifest(ports_dir: &Path, os_id: &str) -> HarnessResult<Option<PathBuf>> {
    let entries = match std::fs::read_dir(ports_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(HarnessError::Io {
                context: "reading ports directory",
                source: e,
            })
        }
    };

    let mut best: Option<(usize, PathBuf)> = None;
    for entry in entries.flatten() {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.is_empty() || !os_id.starts_with(&name) {
            continue;
        }

        let manifest = entry.path().join("benchmark").join(TOOLS_MANIFEST);
        if !manifest.is_file() {
            continue;
        }
        if best.as_ref().map_or(true, |(len, _)| name.len() > *len) {
            best = Some((name.len(), manifest));
        }
    }

    Ok(best.map(|(_, path)| path))
}

/// Build the cache flusher for `os_id`.
pub fn resolve_flusher(ports_dir: &Path, os_id: &str) -> HarnessResult<Box<dyn CacheFlusher>> {
    let Some(path) = find_tools_manifest(ports_dir, os_id)? else {
        return Ok(Box::new(NoopFlusher));
    };

    let tools = ToolsManifest::load(&path)?;
    tracing::debug!(os = os_id, manifest = %path.display(), "Resolved OS tools");

    Ok(match tools.flush_buffer_cache {
        Some(command) => Box::new(CommandFlusher::new(command)),
        None => Box::new(NoopFlusher),
    })
}

/// Run `command` through `sh -c` and return what it printed.
///
/// The command's stdout is captured and logged, never passed through: the
/// harness's own stdout carries only result records. Stderr is inherited.
pub fn run_shell(command: &str) -> HarnessResult<String> {
    tracing::debug!(command = %command, "Running shell command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| HarnessError::Io {
            context: "running shell command",
            source: e,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        tracing::info!(command = %command, "{}", line);
    }

    if !output.status.success() {
        return Err(HarnessError::CommandFailed {
            command: command.to_string(),
            status: describe_status(output.status),
        });
    }
    Ok(stdout)
}
