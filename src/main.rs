//! rbscm - review request diffs from Bazaar and Mercurial working copies
//!
//! Detects the repository in the working directory, works out which
//! changesets to review and prints the diff the review server expects.

mod adapters;
mod config;
mod domain;
mod ports;

use adapters::{BazaarAdapter, MercurialAdapter, ProcessRunner};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::ScmConfig;
use domain::{non_empty, RepositoryInfo, ReviewOptions, ScmError};
use ports::{CommandRunner, VcsAdapter};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(name = "rbscm")]
#[command(about = "Build review request diffs from Bazaar and Mercurial repositories")]
#[command(version)]
struct Args {
    /// Working copy to inspect (default: current directory)
    #[arg(short, long, global = true)]
    path: Option<String>,

    /// Version control system to use
    #[arg(long, value_enum, default_value_t = Vcs::Auto, global = true)]
    vcs: Vcs,

    /// Parent branch (Bazaar) or remote/parent revision (Mercurial)
    #[arg(long, global = true)]
    parent: Option<String>,

    /// Guess the summary from the commit log
    #[arg(long, global = true)]
    guess_summary: bool,

    /// Guess the description from the commit log
    #[arg(long, global = true)]
    guess_description: bool,

    #[arg(long, global = true)]
    summary: Option<String>,

    #[arg(long, global = true)]
    description: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the detected repository and review server
    Info,

    /// Resolve revisions into a diff range
    Parse {
        revisions: Vec<String>,
    },

    /// Print the diff for review
    Diff {
        /// Explicit revision range, e.g. `3..7`
        #[arg(short, long)]
        revision_range: Option<String>,

        /// Print JSON including parent diff, summary and description
        #[arg(long)]
        json: bool,

        files: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Vcs {
    Auto,
    Bazaar,
    Mercurial,
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "warn,rbscm=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Command line values win over configured defaults.
fn review_options(args: &Args, config: &ScmConfig) -> ReviewOptions {
    ReviewOptions {
        summary: non_empty(args.summary.clone()),
        description: non_empty(args.description.clone()),
        guess_summary: args.guess_summary || config.guess_summary,
        guess_description: args.guess_description || config.guess_description,
        parent_branch: args.parent.clone().or_else(|| config.parent_branch.clone()),
    }
}

fn adapters_for(
    vcs: Vcs,
    runner: Rc<dyn CommandRunner>,
    config: &ScmConfig,
    options: &ReviewOptions,
    cwd: &Path,
) -> Vec<Box<dyn VcsAdapter>> {
    let bazaar = || -> Box<dyn VcsAdapter> {
        Box::new(BazaarAdapter::new(runner.clone(), config.clone(), options.clone(), cwd))
    };
    let mercurial = || -> Box<dyn VcsAdapter> {
        Box::new(MercurialAdapter::new(runner.clone(), config.clone(), options.clone(), cwd))
    };

    match vcs {
        Vcs::Auto => vec![bazaar(), mercurial()],
        Vcs::Bazaar => vec![bazaar()],
        Vcs::Mercurial => vec![mercurial()],
    }
}

/// First adapter that recognises the working copy.
fn detect(adapters: Vec<Box<dyn VcsAdapter>>) -> Result<(Box<dyn VcsAdapter>, RepositoryInfo)> {
    for adapter in adapters {
        if let Some(info) = adapter.discover_repository()? {
            log::debug!("Detected {} repository at {}", adapter.name(), info.path);
            return Ok((adapter, info));
        }
    }
    Err(ScmError::NoRepository.into())
}

fn working_dir(path: Option<&str>) -> Result<PathBuf> {
    match path {
        Some(path) => std::fs::canonicalize(path)
            .with_context(|| format!("Failed to open working copy {}", path)),
        None => std::env::current_dir().context("Failed to read the current directory"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let cwd = working_dir(args.path.as_deref())?;
    let config = ScmConfig::load(&cwd);
    let options = review_options(&args, &config);
    let runner: Rc<dyn CommandRunner> = Rc::new(ProcessRunner::new(&cwd));

    let (mut adapter, info) = detect(adapters_for(args.vcs, runner, &config, &options, &cwd))?;

    match args.command {
        Command::Info => {
            let server_url = adapter.scan_for_server(&info)?;
            let report = json!({
                "vcs": adapter.name(),
                "repository": info,
                "server_url": server_url,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Parse { revisions } => {
            let spec = adapter.parse_revision_spec(&revisions)?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
        }
        Command::Diff {
            revision_range,
            json,
            files,
        } => {
            let result = match &revision_range {
                Some(range) => adapter.diff_between_revisions(range, &files, &info)?,
                None => adapter.diff(&files)?,
            };

            if json {
                let report = json!({
                    "diff": result.diff,
                    "parent_diff": result.parent_diff,
                    "base_commit_id": result.base_commit_id,
                    "summary": adapter.options().summary,
                    "description": adapter.options().description,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match &result.diff {
                    Some(diff) => print!("{}", diff),
                    None => log::warn!("There don't seem to be any diffs"),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config() {
        let args = Args::parse_from([
            "rbscm",
            "--parent",
            "trunk",
            "--summary",
            "",
            "--guess-summary",
            "diff",
        ]);
        let config = ScmConfig {
            parent_branch: Some("configured".to_string()),
            guess_description: true,
            ..Default::default()
        };

        let options = review_options(&args, &config);
        assert_eq!(options.parent_branch.as_deref(), Some("trunk"));
        assert_eq!(options.summary, None);
        assert!(options.guess_summary);
        assert!(options.guess_description);
    }

    #[test]
    fn config_parent_used_without_flag() {
        let args = Args::parse_from(["rbscm", "info"]);
        let config = ScmConfig {
            parent_branch: Some("configured".to_string()),
            ..Default::default()
        };
        assert_eq!(
            review_options(&args, &config).parent_branch.as_deref(),
            Some("configured")
        );
    }

    #[test]
    fn global_options_after_subcommand() {
        let args = Args::parse_from(["rbscm", "diff", "-r", "3..7", "--vcs", "bazaar", "a.c"]);
        assert_eq!(args.vcs, Vcs::Bazaar);
        match args.command {
            Command::Diff {
                revision_range,
                json,
                files,
            } => {
                assert_eq!(revision_range.as_deref(), Some("3..7"));
                assert!(!json);
                assert_eq!(files, vec!["a.c".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn no_supported_repository() {
        let runner: Rc<dyn CommandRunner> = Rc::new(adapters::fake_runner::FakeRunner::new());
        let adapters = adapters_for(
            Vcs::Auto,
            runner,
            &ScmConfig::default(),
            &ReviewOptions::default(),
            Path::new("/nonexistent/rbscm-test"),
        );

        let err = detect(adapters).err().expect("detection should fail");
        assert_eq!(err.downcast_ref::<ScmError>(), Some(&ScmError::NoRepository));
        assert_eq!(err.to_string(), "Could not find a supported repository");
    }
}
