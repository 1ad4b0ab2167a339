// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! dbbench CLI
//!
//! Command-line interface for the dbbench benchmark harness.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dbbench_core::LoggerKind;
use tracing_subscriber::EnvFilter;

mod commands;

/// dbbench - Benchmark harness for in-database analytics
#[derive(Parser)]
#[command(name = "dbbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Installation root holding `config/` and `ports/`
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a workload, restart the platform and time the benchmark query
    Run {
        /// Platform to benchmark on
        #[arg(short, long)]
        platform: String,

        /// Result logger
        #[arg(short, long, value_enum, default_value_t = LoggerKind::Stdout)]
        logger: LoggerKind,

        /// Write results to a file instead of stdout
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Platform and workload arguments, e.g. `-b LinearRegressionRandom --rows 1000`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List available platforms and workloads
    List {
        /// Only list the workloads of this platform
        #[arg(short, long)]
        platform: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; stdout belongs to the result logger
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    let result = match cli.command {
        Commands::Run {
            platform,
            logger,
            log_file,
            args,
        } => commands::run::execute(
            &cli.root,
            commands::run::RunArgs {
                platform,
                logger,
                log_file,
                verbose: cli.verbose,
                args,
            },
        ),
        Commands::List { platform } => commands::list::execute(&cli.root, platform.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
