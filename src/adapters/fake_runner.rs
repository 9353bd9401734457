//! Scripted CommandRunner for adapter tests.
//! Replays captured tool output keyed by the full command line and records
//! every command it was asked to run.

use crate::ports::{CommandRunner, ProcessOutput};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fresh directory under the system temp dir. Callers remove it when done.
pub fn make_temp_dir(prefix: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be after UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("rbscm-{}-{}-{}", prefix, std::process::id(), ts));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<String, ProcessOutput>,
    calls: RefCell<Vec<String>>,
    envs: RefCell<Vec<Vec<(String, String)>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `command` with a successful exit and `stdout`.
    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.respond(
            command,
            ProcessOutput {
                status: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Respond to `command` with exit `status` and `stderr`.
    pub fn fail(self, command: &str, status: i32, stderr: &str) -> Self {
        self.respond(
            command,
            ProcessOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    pub fn respond(mut self, command: &str, output: ProcessOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    /// Every command line run so far, space-joined.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Environment of the first call to `command`.
    pub fn env_of(&self, command: &str) -> Option<Vec<(String, String)>> {
        let calls = self.calls.borrow();
        let index = calls.iter().position(|c| c == command)?;
        self.envs.borrow().get(index).cloned()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == command)
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &[String], env: &[(String, String)]) -> Result<ProcessOutput> {
        let line = command.join(" ");
        self.calls.borrow_mut().push(line.clone());
        self.envs.borrow_mut().push(env.to_vec());

        self.responses
            .get(&line)
            .cloned()
            .ok_or_else(|| anyhow!("unexpected command: {}", line))
    }
}
