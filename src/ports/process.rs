//! Process execution port (trait).
//! Adapters describe the command and how failures are treated; the runner
//! only spawns the process and captures what it printed.

use crate::domain::ScmError;
use anyhow::Result;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// How a command's exit status and output are treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Return the output even when the command fails.
    pub ignore_errors: bool,
    /// Append stderr to the returned output.
    pub with_errors: bool,
    /// With `ignore_errors`, return `None` instead of the output on failure.
    pub none_on_ignored_error: bool,
    /// Exit codes treated as success.
    pub extra_ignore_errors: Vec<i32>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            with_errors: true,
            none_on_ignored_error: false,
            extra_ignore_errors: Vec::new(),
            env: Vec::new(),
        }
    }
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn without_stderr(mut self) -> Self {
        self.with_errors = false;
        self
    }

    pub fn none_on_ignored_error(mut self) -> Self {
        self.ignore_errors = true;
        self.none_on_ignored_error = true;
        self
    }

    pub fn tolerate_exit(mut self, code: i32) -> Self {
        self.extra_ignore_errors.push(code);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }
}

/// Apply `options` to a finished process.
pub fn interpret(command: &[String], output: ProcessOutput, options: &ExecOptions) -> Result<Option<String>> {
    let tolerated = output
        .status
        .is_some_and(|code| options.extra_ignore_errors.contains(&code));
    let ok = output.success() || tolerated;

    let mut text = output.stdout;
    if options.with_errors {
        text.push_str(&output.stderr);
    }

    if ok {
        return Ok(Some(text));
    }

    if options.ignore_errors {
        if options.none_on_ignored_error {
            return Ok(None);
        }
        return Ok(Some(text));
    }

    Err(ScmError::CommandFailed {
        command: command.join(" "),
        status: output.status,
        output: if options.with_errors {
            text.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        },
    }
    .into())
}

/// Port for running external tools.
/// Implementations may spawn real processes or replay captured output.
pub trait CommandRunner {
    /// Run `command` to completion. Errors only when it could not be started.
    fn run(&self, command: &[String], env: &[(String, String)]) -> Result<ProcessOutput>;

    /// Run `command` and interpret its result according to `options`.
    fn execute(&self, command: &[String], options: &ExecOptions) -> Result<Option<String>> {
        let output = self.run(command, &options.env)?;
        interpret(command, output, options)
    }

    /// Like [`CommandRunner::execute`], returning an empty string for an
    /// ignored failure.
    fn execute_text(&self, command: &[String], options: &ExecOptions) -> Result<String> {
        Ok(self.execute(command, options)?.unwrap_or_default())
    }

    /// Run `command` and split its output into lines.
    fn execute_lines(&self, command: &[String], options: &ExecOptions) -> Result<Vec<String>> {
        Ok(self
            .execute_text(command, options)?
            .lines()
            .map(String::from)
            .collect())
    }

    /// Whether the binary behind `command` can be started at all.
    fn check_install(&self, command: &[String]) -> bool {
        self.run(command, &[]).is_ok()
    }
}

/// Build an owned command line.
pub fn command_line(program: &str, args: &[&str]) -> Vec<String> {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(String::from)
        .collect()
}
