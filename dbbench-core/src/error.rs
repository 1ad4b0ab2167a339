// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for dbbench.
//!
//! Every failure is an explicit enum variant. No `Box<dyn Error>`, no
//! `anyhow::Result` in the library.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PluginKind;

/// Top-level error type for the benchmark harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    // =========================================================================
    // Configuration Errors - abort before any external process is spawned
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    // =========================================================================
    // Query Execution Errors
    // =========================================================================
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Unexpected introspection output for '{what}': {output:?}")]
    Introspection { what: &'static str, output: String },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error("Invalid state transition: {0}")]
    InvalidTransition(#[from] StateTransitionError),

    #[error("Command `{command}` failed with status {status}")]
    CommandFailed { command: String, status: String },

    #[error("Result logger failed: {0}")]
    Logger(#[from] LoggerError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// The typed query failure carried by this error, if any.
    pub fn as_query_failure(&self) -> Option<&QueryError> {
        match self {
            Self::Query(e @ QueryError::ExecutionFailed { .. }) => Some(e),
            _ => None,
        }
    }
}

/// Configuration errors: scope lookups, templates, arguments and files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Key not found in any configuration scope: {key}")]
    KeyNotFound { key: String },

    #[error("Configuration key '{key}' has type {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Cannot modify a configuration scope that already has children")]
    ScopeShared,

    #[error("Malformed template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: &'static str },

    #[error("Invalid connection string '{input}': {reason}")]
    InvalidConnectionString { input: String, reason: String },

    #[error("{0}")]
    Arguments(#[from] clap::Error),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error in {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Plugin discovery and manifest errors.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Unknown {kind} '{name}' (available: {})", .available.join(", "))]
    UnknownPlugin {
        kind: PluginKind,
        name: String,
        available: Vec<String>,
    },

    #[error("Invalid manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },
}

/// Failures of the external query client.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The client process exited with a non-zero status.
    #[error("Query client failed with error {status}.")]
    ExecutionFailed { status: i32 },

    #[error("Query client terminated by signal {signal}")]
    Terminated { signal: String },

    #[error("Data source command `{command}` failed with status {status}")]
    SourceCommandFailed { command: String, status: String },

    #[error("Query client IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// State transition errors for the run state machine.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition from {from} to {to} on platform {platform}")]
    InvalidTransition {
        platform: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Run on platform {platform} is in terminal state: {state}")]
    TerminalState {
        platform: String,
        state: &'static str,
    },
}

/// Errors raised by result logger sinks.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to write log record: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize log record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using HarnessError.
pub type HarnessResult<T> = Result<T, HarnessError>;
