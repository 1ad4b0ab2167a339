// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::channel::{Query, QueryChannel};
use crate::config::{PlatformManifest, PlatformVariant, ServiceCommands, WorkloadManifest, WorkloadVariant};
use crate::error::{LoggerError, QueryError};
use crate::logger::{BenchmarkLogger, PhaseRecord};
use crate::platform::PlatformHandle;
use crate::registry::PluginDescriptor;
use crate::types::{PluginKind, PluginName};
use crate::workload::WorkloadHandle;

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Fail(i32),
    Terminate,
}

impl Reply {
    fn into_result(self) -> Result<String, QueryError> {
        match self {
            Self::Output(text) => Ok(text),
            Self::Fail(status) => Err(QueryError::ExecutionFailed { status }),
            Self::Terminate => Err(QueryError::Terminated {
                signal: "SIGKILL".to_string(),
            }),
        }
    }
}

#[derive(Debug)]
struct Rule {
    needle: String,
    once: VecDeque<Reply>,
    always: Option<Reply>,
}

#[derive(Debug, Default)]
struct Script {
    rules: Vec<Rule>,
    executed: Vec<Query>,
}

/// Channel answering queries by substring match. One-shot replies are used
/// before the persistent one; unmatched queries return empty output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    script: Rc<RefCell<Script>>,
}

impl ScriptedChannel {
    fn rule(self, needle: &str, reply: Reply, once: bool) -> Self {
        {
            let mut script = self.script.borrow_mut();
            let index = match script.rules.iter().position(|r| r.needle == needle) {
                Some(index) => index,
                None => {
                    script.rules.push(Rule {
                        needle: needle.to_string(),
                        once: VecDeque::new(),
                        always: None,
                    });
                    script.rules.len() - 1
                }
            };
            let rule = &mut script.rules[index];
            if once {
                rule.once.push_back(reply);
            } else {
                rule.always = Some(reply);
            }
        }
        self
    }

    pub fn output(self, needle: &str, text: &str) -> Self {
        self.rule(needle, Reply::Output(text.to_string()), false)
    }

    pub fn fail(self, needle: &str, status: i32) -> Self {
        self.rule(needle, Reply::Fail(status), false)
    }

    pub fn fail_once(self, needle: &str, status: i32) -> Self {
        self.rule(needle, Reply::Fail(status), true)
    }

    pub fn terminate(self, needle: &str) -> Self {
        self.rule(needle, Reply::Terminate, false)
    }

    pub fn executed(&self) -> Vec<Query> {
        self.script.borrow().executed.clone()
    }

    /// Number of executed queries containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.script
            .borrow()
            .executed
            .iter()
            .filter(|q| q.sql.contains(needle))
            .count()
    }
}

impl QueryChannel for ScriptedChannel {
    fn execute(&self, query: &Query) -> Result<String, QueryError> {
        let mut script = self.script.borrow_mut();
        script.executed.push(query.clone());

        let reply = script
            .rules
            .iter_mut()
            .find(|rule| query.sql.contains(&rule.needle))
            .and_then(|rule| rule.once.pop_front().or_else(|| rule.always.clone()));

        reply.map_or_else(|| Ok(String::new()), Reply::into_result)
    }
}

/// Write sink whose contents stay readable after the writer is boxed away.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Logger keeping every record.
#[derive(Debug, Default)]
pub struct CaptureLogger {
    pub records: Vec<PhaseRecord>,
}

impl BenchmarkLogger for CaptureLogger {
    fn log(&mut self, record: &PhaseRecord) -> Result<(), LoggerError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Write an executable shell script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn platform_handle(name: &str, variant: PlatformVariant) -> PlatformHandle {
    let name = PluginName::new(name).unwrap();
    let dir = PathBuf::from("/ports").join(name.as_str()).join("benchmark");
    PlatformHandle {
        descriptor: PluginDescriptor {
            kind: PluginKind::Platform,
            manifest_path: dir.join("controller.yaml"),
            name: name.clone(),
        },
        manifest: PlatformManifest {
            variant,
            description: None,
            generator_platform: None,
            probe_interval_ms: None,
            service: ServiceCommands::default(),
        },
        generator_platform: name,
        generators_dir: dir.join("generators"),
    }
}

pub fn workload_handle(name: &str, variant: WorkloadVariant) -> WorkloadHandle {
    let name = PluginName::new(name).unwrap();
    WorkloadHandle {
        descriptor: PluginDescriptor {
            kind: PluginKind::Workload,
            manifest_path: PathBuf::from("/ports/executors").join(format!("{}.yaml", name)),
            name,
        },
        manifest: WorkloadManifest {
            variant,
            description: None,
        },
    }
}
