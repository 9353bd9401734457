//! `std::process` implementation of the CommandRunner port.

use crate::ports::{CommandRunner, ProcessOutput};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct ProcessRunner {
    cwd: PathBuf,
}

impl ProcessRunner {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &[String], env: &[(String, String)]) -> Result<ProcessOutput> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("Cannot run an empty command"))?;

        log::debug!("Running: {}", command.join(" "));

        let output = Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.cwd)
            .output()
            .with_context(|| format!("Failed to execute {}", program))?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessRunner;
    use crate::ports::{command_line, CommandRunner, ExecOptions};
    use std::path::Path;
    use std::process::Command;

    fn has_sh() -> bool {
        Command::new("sh").arg("-c").arg("true").output().is_ok()
    }

    #[test]
    fn captures_stdout_stderr_and_status() {
        if !has_sh() {
            return;
        }

        let runner = ProcessRunner::new(Path::new("."));
        let output = runner
            .run(
                &command_line("sh", &["-c", "echo out; echo err >&2; exit 3"]),
                &[],
            )
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn passes_environment() {
        if !has_sh() {
            return;
        }

        let runner = ProcessRunner::new(Path::new("."));
        let options = ExecOptions::new().env("HGPLAIN", "1");
        let text = runner
            .execute_text(&command_line("sh", &["-c", "printf %s \"$HGPLAIN\""]), &options)
            .unwrap();
        assert_eq!(text, "1");
    }

    #[test]
    fn missing_binary_is_not_installed() {
        let runner = ProcessRunner::new(Path::new("."));
        assert!(!runner.check_install(&command_line("rbscm-no-such-binary", &["--help"])));
    }
}
