//! VCS adapter port (trait).
//! The contract the review front end drives, independent of the backend.

use crate::config::ScmConfig;
use crate::domain::{DiffResult, RepositoryInfo, ReviewOptions, RevisionSpec};
use anyhow::Result;

/// Port for a version-control backend.
/// Implementations shell out to the backend's command line tool.
pub trait VcsAdapter {
    /// Display name of the backend.
    fn name(&self) -> &'static str;

    /// Settings the adapter was created with.
    fn config(&self) -> &ScmConfig;

    /// Review request fields, including any guessed summary/description.
    fn options(&self) -> &ReviewOptions;

    /// Information about the repository in the working directory.
    /// `None` when the tool is missing or this is not one of its repositories.
    fn discover_repository(&self) -> Result<Option<RepositoryInfo>>;

    /// Resolve up to two user-supplied revisions into a diff range.
    fn parse_revision_spec(&self, revisions: &[String]) -> Result<RevisionSpec>;

    /// Diff for the default range, filling in summary/description if asked.
    fn diff(&mut self, files: &[String]) -> Result<DiffResult>;

    /// Diff for an explicit revision range.
    fn diff_between_revisions(
        &mut self,
        revision_range: &str,
        files: &[String],
        repository_info: &RepositoryInfo,
    ) -> Result<DiffResult>;

    /// First-line summary for a range (or the default range).
    fn extract_summary(&self, revision_range: Option<&str>) -> Result<String>;

    /// Full description for a range (or the default range).
    fn extract_description(&self, revision_range: Option<&str>) -> Result<String>;

    /// Review server URL for this repository.
    fn scan_for_server(&self, _repository_info: &RepositoryInfo) -> Result<Option<String>> {
        Ok(self.config().server_url.clone())
    }
}
