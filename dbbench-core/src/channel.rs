// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Query execution through an external SQL client process.
//!
//! Each [`Query`] spawns one client process. The SQL is written to the
//! client's stdin; when the query carries a source command, that command's
//! stdout is streamed in right after the SQL so a trailing
//! `COPY ... FROM STDIN` consumes it. A helper thread drains the client's
//! stdout while stdin is fed.

use std::io::{Read, Write};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;

use nix::sys::signal::Signal;

use crate::connection::ConnectionInfo;
use crate::error::QueryError;

/// Client output formatting flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Print rows only, no headers or footers.
    pub tuples_only: bool,
    /// One `column | value` line per field.
    pub expanded: bool,
    /// Additional client flags appended after the built-in ones.
    pub extra_args: Vec<String>,
}

/// A single request to the query channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub sql: String,
    pub options: TransportOptions,
    /// Shell command whose stdout follows the SQL on the client's stdin.
    pub stdin_command: Option<String>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn tuples_only(mut self) -> Self {
        self.options.tuples_only = true;
        self
    }

    pub fn expanded(mut self) -> Self {
        self.options.expanded = true;
        self
    }

    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.options.extra_args.push(arg.into());
        self
    }

    pub fn with_stdin_command(mut self, command: impl Into<String>) -> Self {
        self.stdin_command = Some(command.into());
        self
    }
}

/// Request/response channel to a data platform.
pub trait QueryChannel {
    /// Execute `query`, returning the client's textual output.
    fn execute(&self, query: &Query) -> Result<String, QueryError>;
}

/// [`QueryChannel`] backed by `psql` (or any client taking the same flags).
#[derive(Debug, Clone)]
pub struct PsqlChannel {
    client: String,
    connection: ConnectionInfo,
}

impl PsqlChannel {
    pub fn new(client: impl Into<String>, connection: ConnectionInfo) -> Self {
        Self {
            client: client.into(),
            connection,
        }
    }

    /// Build the client invocation for `query` without spawning it.
    pub fn build_command(&self, query: &Query) -> Command {
        let mut command = Command::new(&self.client);
        command.args(["-X", "-q", "-v", "ON_ERROR_STOP=1"]);

        if let Some(host) = &self.connection.host {
            command.arg("-h").arg(host);
        }
        if let Some(port) = self.connection.port {
            command.arg("-p").arg(port.to_string());
        }
        if let Some(database) = &self.connection.database {
            command.arg("-d").arg(database);
        }
        if let Some(user) = &self.connection.user {
            command.arg("-U").arg(user);
        }
        if query.options.tuples_only {
            command.arg("-t");
        }
        if query.options.expanded {
            command.arg("--expanded");
        }
        command.args(&query.options.extra_args);

        command.env("PGOPTIONS", "--client-min-messages=warning");
        if let Some(password) = &self.connection.password {
            command.env("PGPASSWORD", password);
        }

        command
    }

    fn feed(stdin: &mut ChildStdin, query: &Query) -> Result<(), QueryError> {
        stdin
            .write_all(query.sql.as_bytes())
            .map_err(io_error("writing query to client"))?;
        if !query.sql.ends_with('\n') {
            stdin
                .write_all(b"\n")
                .map_err(io_error("writing query to client"))?;
        }

        let Some(source) = &query.stdin_command else {
            return Ok(());
        };

        tracing::debug!(command = %source, "Streaming source command into query client");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(io_error("spawning source command"))?;

        let copied = match child.stdout.take() {
            Some(mut stdout) => std::io::copy(&mut stdout, stdin).map(|_| ()),
            None => Ok(()),
        };

        if let Err(e) = copied {
            let _ = child.kill();
            let _ = child.wait();
            return Err(QueryError::Io {
                context: "streaming source command output",
                source: e,
            });
        }

        let status = child.wait().map_err(io_error("waiting for source command"))?;
        if !status.success() {
            return Err(QueryError::SourceCommandFailed {
                command: source.clone(),
                status: describe_status(status),
            });
        }

        Ok(())
    }
}

impl QueryChannel for PsqlChannel {
    fn execute(&self, query: &Query) -> Result<String, QueryError> {
        let mut child = self
            .build_command(query)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(io_error("spawning query client"))?;

        tracing::debug!(
            client = %self.client,
            pid = child.id(),
            streaming = query.stdin_command.is_some(),
            "Spawned query client"
        );

        let reader = spawn_reader(&mut child)?;

        let fed = match child.stdin.take() {
            // stdin is closed when `stdin` drops at the end of this arm
            Some(mut stdin) => Self::feed(&mut stdin, query),
            None => Ok(()),
        };

        let status = child.wait().map_err(io_error("waiting for query client"))?;
        let output = reader
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("output reader panicked")))
            .map_err(io_error("reading query client output"))?;

        // A client that exits early breaks the pipe; its status is the real cause.
        check_status(status)?;
        fed?;

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

fn spawn_reader(child: &mut Child) -> Result<thread::JoinHandle<std::io::Result<Vec<u8>>>, QueryError> {
    let mut stdout = child.stdout.take().ok_or_else(|| QueryError::Io {
        context: "capturing query client output",
        source: std::io::Error::other("stdout not piped"),
    })?;

    Ok(thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf)?;
        Ok(buf)
    }))
}

fn check_status(status: ExitStatus) -> Result<(), QueryError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(QueryError::ExecutionFailed { status: code }),
        None => Err(QueryError::Terminated {
            signal: signal_name(status),
        }),
    }
}

/// Exit code or signal name, for diagnostics.
pub(crate) fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => signal_name(status),
    }
}

fn signal_name(status: ExitStatus) -> String {
    match status.signal() {
        Some(raw) => Signal::try_from(raw)
            .map(|signal| signal.as_str().to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "unknown".to_string(),
    }
}

fn io_error(context: &'static str) -> impl Fn(std::io::Error) -> QueryError {
    move |source| QueryError::Io { context, source }
}
