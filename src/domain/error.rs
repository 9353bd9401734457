//! Error kinds surfaced by the adapters.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScmError {
    /// More than two revisions were given.
    #[error("Too many revisions specified")]
    TooManyRevisions,

    #[error("{0}")]
    InvalidRevisionSpec(String),

    /// The operation is not available in the adapter's current mode.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Command `{command}` failed ({}): {output}", status_label(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("Could not find a supported repository")]
    NoRepository,
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "killed by signal".to_string(),
    }
}

impl ScmError {
    pub fn invalid_revision(revision: &str) -> Self {
        ScmError::InvalidRevisionSpec(format!(
            "\"{}\" does not appear to be a valid revision",
            revision
        ))
    }
}
