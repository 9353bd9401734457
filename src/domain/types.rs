//! Pure data types shared by the VCS adapters.
//! No I/O, only plain values handed to and from the review pipeline.

use serde::Serialize;

/// Where the working copy lives, as the review server knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    pub path: String,
    pub base_path: String,
    pub supports_parent_diffs: bool,
}

impl RepositoryInfo {
    pub fn new(path: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_path: base_path.into(),
            supports_parent_diffs: true,
        }
    }
}

/// A resolved revision range.
///
/// The diff for review covers `(base, tip]`; the parent diff, when present,
/// covers `(parent_base, base]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionSpec {
    pub base: String,
    pub tip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_base: Option<String>,
}

impl RevisionSpec {
    pub fn new(base: impl Into<String>, tip: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            tip: tip.into(),
            parent_base: None,
        }
    }

    /// Human readable `base..tip` label, used to scope log lookups.
    pub fn range_label(&self) -> String {
        format!("{}..{}", self.base, self.tip)
    }
}

/// Output of a diff operation. `diff` is `None` when the range has no changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiffResult {
    pub diff: Option<String>,
    pub parent_diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_commit_id: Option<String>,
}

/// A named remote path from the Mercurial configuration (`paths.<name>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub name: String,
    pub url: String,
}

/// Review request fields the adapters read and fill in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewOptions {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub guess_summary: bool,
    pub guess_description: bool,
    pub parent_branch: Option<String>,
}

impl ReviewOptions {
    /// True when the summary should be guessed from the log.
    pub fn wants_summary(&self) -> bool {
        self.guess_summary && self.summary.as_deref().map_or(true, str::is_empty)
    }

    /// True when the description should be guessed from the log.
    pub fn wants_description(&self) -> bool {
        self.guess_description && self.description.as_deref().map_or(true, str::is_empty)
    }
}

/// Returns `None` for empty tool output, which means "no changes".
pub fn non_empty(output: Option<String>) -> Option<String> {
    output.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_label_joins_endpoints() {
        let spec = RevisionSpec::new("revno:3", "revno:5");
        assert_eq!(spec.range_label(), "revno:3..revno:5");
    }

    #[test]
    fn wants_summary_only_when_guessing_and_unset() {
        let mut options = ReviewOptions::default();
        assert!(!options.wants_summary());

        options.guess_summary = true;
        assert!(options.wants_summary());

        options.summary = Some(String::new());
        assert!(options.wants_summary());

        options.summary = Some("Fix the frobnicator".to_string());
        assert!(!options.wants_summary());
    }

    #[test]
    fn wants_description_respects_existing_value() {
        let options = ReviewOptions {
            guess_description: true,
            description: Some("Already written".to_string()),
            ..Default::default()
        };
        assert!(!options.wants_description());
    }

    #[test]
    fn non_empty_drops_empty_output() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("+x\n".to_string())), Some("+x\n".to_string()));
    }

    #[test]
    fn revision_spec_json_omits_missing_parent_base() {
        let json = serde_json::to_value(RevisionSpec::new("a", "b")).unwrap();
        assert_eq!(json, serde_json::json!({ "base": "a", "tip": "b" }));
    }
}
