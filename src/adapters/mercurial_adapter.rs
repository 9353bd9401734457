//! Mercurial (hg) implementation of the VcsAdapter port.
//!
//! A working copy is either a plain Mercurial clone or, when the hgsubversion
//! extension answers `hg svn info`, a client of a Subversion repository. The
//! mode is detected once per adapter together with the rest of the session
//! state (repository root and `hg showconfig` dump).

use crate::adapters::svn_property::SvnPropertyLookup;
use crate::config::ScmConfig;
use crate::domain::revisions::{
    self, parse_outgoing, parse_parents, split_hg_range, split_log_range, OutgoingBounds,
};
use crate::domain::svn_info::repository_info_from_svn_info;
use crate::domain::{
    non_empty, DiffResult, HgRc, RemotePath, RepositoryInfo, ReviewOptions, RevisionSpec, ScmError,
};
use crate::ports::{command_line, CommandRunner, ExecOptions, VcsAdapter};
use anyhow::Result;
use once_cell::unsync::OnceCell;
use std::path::Path;
use std::rc::Rc;

const HIDDEN_FLAG: &str = "--hidden";

/// `hg outgoing` template: one `b:`/`r:` pair per changeset, blank-line separated.
const OUTGOING_TEMPLATE: &str = "b:{branches}\nr:{rev}\n\n";

/// `hg outgoing` exits 1 when there is nothing to push.
const NO_OUTGOING_STATUS: i32 = 1;

/// Prefixes of `hg svn info` output when the bridge is not usable.
const BRIDGE_INACTIVE_PREFIXES: &[&str] = &["abort:", "hg: unknown command"];
const NOT_A_CHILD_PREFIX: &str = "not a child of";

enum HgMode {
    Plain { remote_path: Option<RemotePath> },
    Bridged { svn_info: String },
}

struct HgSession {
    root: String,
    hgrc: HgRc,
    mode: HgMode,
}

pub struct MercurialAdapter {
    runner: Rc<dyn CommandRunner>,
    svn: SvnPropertyLookup,
    config: ScmConfig,
    options: ReviewOptions,
    session: OnceCell<Option<HgSession>>,
    hidden_supported: OnceCell<bool>,
}

/// Options for commands whose output must not depend on user settings.
fn plain() -> ExecOptions {
    ExecOptions::new().env("HGPLAIN", "1")
}

fn is_bridge_active(svn_info: &str) -> bool {
    !(BRIDGE_INACTIVE_PREFIXES
        .iter()
        .any(|prefix| svn_info.starts_with(prefix))
        || svn_info.to_lowercase().starts_with(NOT_A_CHILD_PREFIX))
}

impl MercurialAdapter {
    pub fn new(
        runner: Rc<dyn CommandRunner>,
        config: ScmConfig,
        options: ReviewOptions,
        cwd: &Path,
    ) -> Self {
        let svn = SvnPropertyLookup::new(runner.clone(), &config.svn_binary, cwd);
        Self {
            runner,
            svn,
            config,
            options,
            session: OnceCell::new(),
            hidden_supported: OnceCell::new(),
        }
    }

    fn hg(&self, args: &[&str]) -> Vec<String> {
        command_line(&self.config.hg_binary, args)
    }

    /// Session state, initialised on first use. `None` outside a repository.
    fn session(&self) -> Result<Option<&HgSession>> {
        self.session
            .get_or_try_init(|| self.init_session())
            .map(Option::as_ref)
    }

    fn require_session(&self) -> Result<&HgSession> {
        self.session()?.ok_or_else(|| ScmError::NoRepository.into())
    }

    fn init_session(&self) -> Result<Option<HgSession>> {
        let root = self
            .runner
            .execute_text(&self.hg(&["root"]), &plain().ignore_errors())?;
        if root.starts_with("abort:") {
            log::debug!("Not inside a Mercurial repository");
            return Ok(None);
        }
        let root = root.trim().to_string();

        let lines = self
            .runner
            .execute_lines(&self.hg(&["showconfig"]), &ExecOptions::new())?;
        let hgrc = HgRc::from_lines(lines.iter().map(String::as_str));

        let svn_info = self
            .runner
            .execute_text(&self.hg(&["svn", "info"]), &ExecOptions::new().ignore_errors())?;

        let mode = if is_bridge_active(&svn_info) {
            log::debug!("Working copy is bridged to Subversion");
            HgMode::Bridged { svn_info }
        } else {
            let remote_path = hgrc.remote_path();
            if let Some(path) = &remote_path {
                log::debug!("Using candidate path {:?}: {:?}", path.name, path.url);
            }
            HgMode::Plain { remote_path }
        };

        Ok(Some(HgSession { root, hgrc, mode }))
    }

    fn is_bridged(&self) -> Result<bool> {
        Ok(matches!(self.require_session()?.mode, HgMode::Bridged { .. }))
    }

    /// Whether this Mercurial understands `--hidden`. Probed once.
    fn hidden_changesets_supported(&self) -> bool {
        *self.hidden_supported.get_or_init(|| {
            // parents of the initial revision is cheap
            let probe = self.runner.execute(
                &self.hg(&["parents", HIDDEN_FLAG, "-r", "0"]),
                &ExecOptions::new().without_stderr().none_on_ignored_error(),
            );
            let supported = matches!(probe, Ok(Some(_)));
            log::debug!("Hidden changesets supported: {}", supported);
            supported
        })
    }

    /// Run a command that may carry `--hidden`, dropping the flag on
    /// versions without it and appending configured `--config` values.
    fn execute_hidden_aware(
        &self,
        mut command: Vec<String>,
        options: &ExecOptions,
    ) -> Result<Option<String>> {
        if command.iter().any(|arg| arg == HIDDEN_FLAG) && !self.hidden_changesets_supported() {
            command.retain(|arg| arg != HIDDEN_FLAG);
        }

        for value in &self.config.hg_config {
            command.push("--config".to_string());
            command.push(value.clone());
        }

        self.runner.execute(&command, options)
    }

    fn execute_hidden_aware_text(
        &self,
        command: Vec<String>,
        options: &ExecOptions,
    ) -> Result<String> {
        Ok(self.execute_hidden_aware(command, options)?.unwrap_or_default())
    }

    /// Resolve a revision to its short changeset hash.
    fn identify_revision(&self, revision: &str) -> Result<String> {
        let output = self.execute_hidden_aware(
            self.hg(&["identify", "-i", HIDDEN_FLAG, "-r", revision]),
            &ExecOptions::new().none_on_ignored_error(),
        )?;

        output
            .as_deref()
            .and_then(|o| o.split_whitespace().next())
            .map(String::from)
            .ok_or_else(|| ScmError::invalid_revision(revision).into())
    }

    /// First parent of `revision`, rendered with `template`.
    fn first_parent(&self, revision: &str, template: &str) -> Result<String> {
        let output = self.execute_hidden_aware_text(
            self.hg(&["parents", HIDDEN_FLAG, "-r", revision, "--template", template]),
            &ExecOptions::new(),
        )?;

        output
            .split_whitespace()
            .next()
            .map(String::from)
            .ok_or_else(|| {
                ScmError::InvalidRevisionSpec(format!(
                    "\"{}\" does not appear to be a valid revision spec",
                    revision
                ))
                .into()
            })
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self
            .runner
            .execute_text(&self.hg(&["branch"]), &plain())?
            .trim()
            .to_string())
    }

    /// Remote to compare against: the selected candidate path, else `--parent`.
    fn remote_branch(&self, session: &HgSession) -> Option<String> {
        match &session.mode {
            HgMode::Plain {
                remote_path: Some(path),
            } => Some(path.name.clone()),
            _ => self.options.parent_branch.clone(),
        }
    }

    fn outgoing_changesets(&self, current_branch: &str, remote: Option<&str>) -> Result<Vec<i64>> {
        let mut command = self.hg(&["-q", "outgoing", "--template", OUTGOING_TEMPLATE]);
        command.extend(remote.map(String::from));

        let raw = self
            .runner
            .execute_text(&command, &plain().tolerate_exit(NO_OUTGOING_STATUS))?;
        Ok(parse_outgoing(&raw, current_branch))
    }

    fn parents_of(&self, revision: i64) -> Result<Vec<i64>> {
        let output = self.runner.execute_text(
            &self.hg(&["log", "-r", &revision.to_string(), "--template", "{parents}"]),
            &plain(),
        )?;
        Ok(parse_parents(&output))
    }

    /// Bottom and top revisions of the changesets not yet on the remote.
    fn outgoing_bounds(&self) -> Result<Option<OutgoingBounds>> {
        let session = self.require_session()?;
        let remote = self.remote_branch(session);
        let current_branch = self.current_branch()?;
        let outgoing = self.outgoing_changesets(&current_branch, remote.as_deref())?;

        revisions::outgoing_bounds(&outgoing, |rev| self.parents_of(rev))
    }

    fn require_outgoing_bounds(&self) -> Result<OutgoingBounds> {
        self.outgoing_bounds()?.ok_or_else(|| {
            ScmError::InvalidRevisionSpec("There are no outgoing changes".to_string()).into()
        })
    }

    /// Parent Subversion revision: `--parent` if given, else the bridge's.
    fn svn_parent(&self) -> Result<String> {
        if let Some(parent) = &self.options.parent_branch {
            return Ok(parent.clone());
        }
        Ok(self
            .runner
            .execute_text(
                &self.hg(&["parent", "--svn", "--template", "{node}\n"]),
                &ExecOptions::new(),
            )?
            .trim()
            .to_string())
    }

    /// Endpoints of an explicit range. A single revision pairs with its parent.
    fn extract_revisions(&self, revision_range: &str) -> Result<(String, String)> {
        if let Some(pair) = split_log_range(revision_range) {
            return Ok(pair);
        }
        let parent = self.first_parent(revision_range, "{rev}\n")?;
        Ok((parent, revision_range.to_string()))
    }

    fn set_summary(&mut self, revision_range: Option<&str>) -> Result<()> {
        if self.options.wants_summary() {
            self.options.summary = Some(self.extract_summary(revision_range)?);
        }
        Ok(())
    }

    fn set_description(&mut self, revision_range: Option<&str>) -> Result<()> {
        if self.options.wants_description() {
            self.options.description = Some(self.extract_description(revision_range)?);
        }
        Ok(())
    }

    fn hgsubversion_diff(&mut self, files: &[String]) -> Result<DiffResult> {
        self.set_summary(None)?;
        self.set_description(None)?;

        let parent = self.svn_parent()?;
        let range = match files {
            [file] => format!("-r{}:{}", parent, file),
            _ => ".".to_string(),
        };

        let diff = self.execute_hidden_aware(
            self.hg(&["diff", HIDDEN_FLAG, "--svn", &range]),
            &ExecOptions::new(),
        )?;

        Ok(DiffResult {
            diff: non_empty(diff),
            ..Default::default()
        })
    }

    /// Diff the outgoing changesets on the current branch against the remote.
    ///
    /// `hg outgoing --patch` would mix in changesets from other branches and
    /// headers the review server cannot parse, so the range is worked out
    /// from the outgoing revision numbers and diffed with `hg diff -r -r`.
    fn outgoing_diff(&mut self, files: &[String]) -> Result<DiffResult> {
        self.set_summary(None)?;
        self.set_description(None)?;

        let revisions = self.parse_revision_spec(&[])?;
        self.two_revision_diff(&revisions, files)
    }

    fn two_revision_diff(&self, revisions: &RevisionSpec, files: &[String]) -> Result<DiffResult> {
        if self.is_bridged()? {
            return Err(ScmError::NotImplemented(
                "diffing arbitrary revisions of a Subversion-bridged repository".to_string(),
            )
            .into());
        }

        let range_diff = |base: &str, tip: &str| -> Result<Option<String>> {
            let mut command = self.hg(&["diff", HIDDEN_FLAG]);
            command.extend(files.iter().cloned());
            command.extend(["-r", base, "-r", tip].map(String::from));
            Ok(non_empty(self.execute_hidden_aware(command, &plain())?))
        };

        let diff = range_diff(&revisions.base, &revisions.tip)?;

        // TODO: work out when a parent diff is needed instead of relying on
        // the caller to supply parent_base.
        let (parent_diff, base_commit_id) = match &revisions.parent_base {
            Some(parent_base) => (range_diff(parent_base, &revisions.base)?, parent_base.clone()),
            None => (None, revisions.base.clone()),
        };

        Ok(DiffResult {
            diff,
            parent_diff,
            base_commit_id: Some(base_commit_id),
        })
    }
}

impl VcsAdapter for MercurialAdapter {
    fn name(&self) -> &'static str {
        "Mercurial"
    }

    fn config(&self) -> &ScmConfig {
        &self.config
    }

    fn options(&self) -> &ReviewOptions {
        &self.options
    }

    fn discover_repository(&self) -> Result<Option<RepositoryInfo>> {
        if !self.runner.check_install(&self.hg(&["--help"])) {
            log::debug!("{} is not installed", self.config.hg_binary);
            return Ok(None);
        }

        let Some(session) = self.session()? else {
            return Ok(None);
        };

        Ok(match &session.mode {
            HgMode::Bridged { svn_info } => repository_info_from_svn_info(svn_info),
            HgMode::Plain {
                remote_path: Some(path),
            } => Some(RepositoryInfo::new(path.url.clone(), "")),
            HgMode::Plain { remote_path: None } => Some(RepositoryInfo::new(session.root.clone(), "/")),
        })
    }

    fn parse_revision_spec(&self, revisions: &[String]) -> Result<RevisionSpec> {
        let revisions = match revisions {
            [single] => split_hg_range(single),
            _ => revisions.to_vec(),
        };

        match revisions.as_slice() {
            [] => {
                let bounds = self.require_outgoing_bounds()?;
                Ok(RevisionSpec::new(
                    self.identify_revision(&bounds.bottom.to_string())?,
                    self.identify_revision(&bounds.top.to_string())?,
                ))
            }
            [revision] => {
                let tip = self.identify_revision(revision)?;
                let base = self.first_parent(&tip, "{node|short}")?;
                Ok(RevisionSpec::new(base, tip))
            }
            [base, tip] => Ok(RevisionSpec::new(
                self.identify_revision(base)?,
                self.identify_revision(tip)?,
            )),
            _ => Err(ScmError::TooManyRevisions.into()),
        }
    }

    fn diff(&mut self, files: &[String]) -> Result<DiffResult> {
        if self.is_bridged()? {
            self.hgsubversion_diff(files)
        } else {
            self.outgoing_diff(files)
        }
    }

    fn diff_between_revisions(
        &mut self,
        revision_range: &str,
        files: &[String],
        _repository_info: &RepositoryInfo,
    ) -> Result<DiffResult> {
        self.set_summary(Some(revision_range))?;
        self.set_description(Some(revision_range))?;

        let revisions = self.parse_revision_spec(&[revision_range.to_string()])?;
        self.two_revision_diff(&revisions, files)
    }

    fn extract_summary(&self, revision_range: Option<&str>) -> Result<String> {
        let revision = match revision_range {
            Some(range) => self.extract_revisions(range)?.1,
            None if self.is_bridged()? => ".".to_string(),
            None => self.require_outgoing_bounds()?.top.to_string(),
        };

        let summary = self.execute_hidden_aware_text(
            self.hg(&[
                "log",
                HIDDEN_FLAG,
                &format!("-r{}", revision),
                "--template",
                "{desc|firstline}",
            ]),
            &plain(),
        )?;
        Ok(summary.replace('\n', " "))
    }

    fn extract_description(&self, revision_range: Option<&str>) -> Result<String> {
        let (base, tip) = match revision_range {
            Some(range) => self.extract_revisions(range)?,
            None if self.is_bridged()? => (self.svn_parent()?, ".".to_string()),
            None => {
                let bounds = self.require_outgoing_bounds()?;
                (bounds.bottom.to_string(), bounds.top.to_string())
            }
        };
        let range = format!("-r{}:{}", tip, base);

        let revs = self.execute_hidden_aware_text(
            self.hg(&["log", HIDDEN_FLAG, &range, "--follow", "--template", r"{rev}\n"]),
            &plain(),
        )?;
        let count = revs.trim().split('\n').count();

        // The oldest revision is the base itself; its message is not part of the change.
        if count <= 1 {
            return Ok(String::new());
        }

        let limit = (count - 1).to_string();
        let descriptions = self.execute_hidden_aware_text(
            self.hg(&[
                "log",
                HIDDEN_FLAG,
                &range,
                "--follow",
                "--template",
                r"{desc}\n\n",
                "--limit",
                &limit,
            ]),
            &plain(),
        )?;
        Ok(descriptions.trim().to_string())
    }

    fn scan_for_server(&self, repository_info: &RepositoryInfo) -> Result<Option<String>> {
        if let Some(url) = &self.config.server_url {
            return Ok(Some(url.clone()));
        }

        let Some(session) = self.session()? else {
            return Ok(None);
        };

        if let Some(url) = session.hgrc.server_url() {
            return Ok(Some(url));
        }

        match session.mode {
            HgMode::Bridged { .. } => self.svn.scan_for_server_property(repository_info),
            HgMode::Plain { .. } => Ok(None),
        }
    }
}
