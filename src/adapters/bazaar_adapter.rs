//! Bazaar (bzr) implementation of the VcsAdapter port.

use crate::config::ScmConfig;
use crate::domain::revisions::{encode_revno, split_bazaar_range, summary_from_log_line};
use crate::domain::{non_empty, DiffResult, RepositoryInfo, ReviewOptions, RevisionSpec, ScmError};
use crate::ports::{command_line, interpret, CommandRunner, ExecOptions, VcsAdapter};
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Printed by `bzr info` outside a branch.
const NOT_A_BRANCH: &str = "ERROR: Not a branch:";

// Shared repositories report "repository branch: /foo", standalone branches
// "branch root: /foo" and checkouts one of the checkout forms.
static BRANCH_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)\w*(repository branch|branch root|checkout root|checkout of branch): (?P<branch_path>.+)$",
    )
    .unwrap()
});

pub struct BazaarAdapter {
    runner: Rc<dyn CommandRunner>,
    config: ScmConfig,
    options: ReviewOptions,
    cwd: PathBuf,
}

impl BazaarAdapter {
    pub fn new(
        runner: Rc<dyn CommandRunner>,
        config: ScmConfig,
        options: ReviewOptions,
        cwd: &Path,
    ) -> Self {
        Self {
            runner,
            config,
            options,
            cwd: cwd.to_path_buf(),
        }
    }

    fn bzr(&self, args: &[&str]) -> Vec<String> {
        command_line(&self.config.bzr_binary, args)
    }

    /// Resolve `revision_spec` (or the branch head) to a `revno:` specifier.
    fn revno(&self, revision_spec: Option<&str>) -> Result<String> {
        let command = match revision_spec {
            Some(spec) => self.bzr(&["revno", "-r", spec]),
            None => self.bzr(&["revno"]),
        };

        // The parent branch note goes to stderr, the number to stdout.
        let output = self.runner.run(&command, &[])?;
        let stderr = output.stderr.clone();
        let stdout = interpret(&command, output, &ExecOptions::new().without_stderr())?
            .unwrap_or_default();

        encode_revno(&stdout, &stderr).ok_or_else(|| {
            log::warn!("Unexpected `bzr revno` output: {:?} {:?}", stdout, stderr);
            ScmError::invalid_revision(revision_spec.unwrap_or("-1")).into()
        })
    }

    /// Diff of `(base, tip]`, `None` when nothing changed.
    fn range_diff(&self, base: &str, tip: &str, files: &[String]) -> Result<Option<String>> {
        let range = format!("{}..{}", base, tip);
        let mut command = self.bzr(&["diff", "-q", "-r", &range]);
        command.extend(files.iter().cloned());

        // `bzr diff` exits 1 when there are differences.
        let diff = self
            .runner
            .execute(&command, &ExecOptions::new().ignore_errors())?;
        Ok(non_empty(diff))
    }

    fn get_diff(&self, revisions: &RevisionSpec, files: &[String]) -> Result<DiffResult> {
        let diff = self.range_diff(&revisions.base, &revisions.tip, files)?;

        let parent_diff = match &revisions.parent_base {
            Some(parent_base) => self.range_diff(parent_base, &revisions.base, files)?,
            None => None,
        };

        Ok(DiffResult {
            diff,
            parent_diff,
            base_commit_id: None,
        })
    }

    fn set_summary(&mut self, revision_range: &str) -> Result<()> {
        if self.options.wants_summary() {
            self.options.summary = Some(self.extract_summary(Some(revision_range))?);
        }
        Ok(())
    }

    fn set_description(&mut self, revision_range: &str) -> Result<()> {
        if self.options.wants_description() {
            self.options.description = Some(self.extract_description(Some(revision_range))?);
        }
        Ok(())
    }

    fn diff_for(&mut self, revisions: RevisionSpec, files: &[String]) -> Result<DiffResult> {
        let rev_log = revisions.range_label();
        self.set_summary(&rev_log)?;
        self.set_description(&rev_log)?;
        self.get_diff(&revisions, files)
    }
}

impl VcsAdapter for BazaarAdapter {
    fn name(&self) -> &'static str {
        "Bazaar"
    }

    fn config(&self) -> &ScmConfig {
        &self.config
    }

    fn options(&self) -> &ReviewOptions {
        &self.options
    }

    fn discover_repository(&self) -> Result<Option<RepositoryInfo>> {
        if !self.runner.check_install(&self.bzr(&["help"])) {
            log::debug!("{} is not installed", self.config.bzr_binary);
            return Ok(None);
        }

        let info = self
            .runner
            .execute_text(&self.bzr(&["info"]), &ExecOptions::new().ignore_errors())?;

        if info.contains(NOT_A_BRANCH) {
            return Ok(None);
        }

        let Some(path) = branch_path_from_info(&info) else {
            log::warn!("Could not find the branch path in `bzr info` output");
            return Ok(None);
        };

        let path = if path == "." {
            self.cwd.display().to_string()
        } else {
            path
        };

        // Diffs are always relative to the root.
        Ok(Some(RepositoryInfo::new(path, "/")))
    }

    fn parse_revision_spec(&self, revisions: &[String]) -> Result<RevisionSpec> {
        let revisions = match revisions {
            [single] => split_bazaar_range(single),
            _ => revisions.to_vec(),
        };

        let mut result = match revisions.as_slice() {
            [] => {
                // HEAD against the submit branch.
                let tip = self.revno(None)?;
                let base = self.revno(Some("ancestor:"))?;
                RevisionSpec::new(base, tip)
            }
            [revision] => {
                let base = self.revno(Some(&format!("before:{}", revision)))?;
                let tip = self.revno(Some(revision.as_str()))?;
                RevisionSpec::new(base, tip)
            }
            [base, tip] => RevisionSpec::new(
                self.revno(Some(base.as_str()))?,
                self.revno(Some(tip.as_str()))?,
            ),
            _ => return Err(ScmError::TooManyRevisions.into()),
        };

        if let Some(parent_branch) = &self.options.parent_branch {
            let base = self.revno(Some(&format!("ancestor:{}", parent_branch)))?;
            result.parent_base = Some(std::mem::replace(&mut result.base, base));
        }

        Ok(result)
    }

    fn diff(&mut self, files: &[String]) -> Result<DiffResult> {
        let revisions = self.parse_revision_spec(&[])?;
        self.diff_for(revisions, files)
    }

    fn diff_between_revisions(
        &mut self,
        revision_range: &str,
        files: &[String],
        _repository_info: &RepositoryInfo,
    ) -> Result<DiffResult> {
        let revisions = self.parse_revision_spec(&[revision_range.to_string()])?;
        self.diff_for(revisions, files)
    }

    fn extract_summary(&self, revision_range: Option<&str>) -> Result<String> {
        let revision = revision_range
            .map(|range| range.split("..").nth(1).unwrap_or(range))
            .unwrap_or("-1");

        let log_line = self.runner.execute_text(
            &self.bzr(&["log", "-r", revision, "--line"]),
            &ExecOptions::new(),
        )?;
        Ok(summary_from_log_line(&log_line))
    }

    fn extract_description(&self, revision_range: Option<&str>) -> Result<String> {
        let range = revision_range.unwrap_or("-1");
        let log = self.runner.execute_text(
            &self.bzr(&["log", "-r", range, "--short"]),
            &ExecOptions::new().ignore_errors(),
        )?;
        Ok(log.trim_end().to_string())
    }
}

fn branch_path_from_info(info: &str) -> Option<String> {
    BRANCH_PATH
        .captures(info)
        .and_then(|caps| caps.name("branch_path"))
        .map(|m| m.as_str().trim_end().to_string())
}
