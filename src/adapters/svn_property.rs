//! Review server lookup through the Subversion `reviewboard:url` property.

use crate::domain::RepositoryInfo;
use crate::ports::{command_line, CommandRunner, ExecOptions};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const SERVER_URL_PROPERTY: &str = "reviewboard:url";

pub struct SvnPropertyLookup {
    runner: Rc<dyn CommandRunner>,
    svn_binary: String,
    cwd: PathBuf,
}

impl SvnPropertyLookup {
    pub fn new(runner: Rc<dyn CommandRunner>, svn_binary: &str, cwd: &Path) -> Self {
        Self {
            runner,
            svn_binary: svn_binary.to_string(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Look for the property on each enclosing Subversion working copy
    /// directory, then on the repository itself.
    pub fn scan_for_server_property(&self, repository_info: &RepositoryInfo) -> Result<Option<String>> {
        for dir in self.cwd.ancestors() {
            if !dir.join(".svn").exists() {
                break;
            }
            if let Some(url) = self.url_property(&dir.display().to_string())? {
                return Ok(Some(url));
            }
        }

        self.url_property(&repository_info.path)
    }

    fn url_property(&self, target: &str) -> Result<Option<String>> {
        let command = command_line(&self.svn_binary, &["propget", SERVER_URL_PROPERTY, target]);
        let value = self.runner.execute_text(
            &command,
            &ExecOptions::new().without_stderr().none_on_ignored_error(),
        )?;
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fake_runner::{make_temp_dir, FakeRunner};
    use std::fs;

    #[test]
    fn falls_back_to_repository_path() {
        let dir = make_temp_dir("no-svn");
        let runner = Rc::new(FakeRunner::new().ok(
            "svn propget reviewboard:url https://svn.example.com/repos/proj",
            "https://reviews.example.com/\n",
        ));
        let lookup = SvnPropertyLookup::new(runner.clone(), "svn", &dir);

        let info = RepositoryInfo::new("https://svn.example.com/repos/proj", "/trunk");
        assert_eq!(
            lookup.scan_for_server_property(&info).unwrap().as_deref(),
            Some("https://reviews.example.com/")
        );
        assert_eq!(runner.calls().len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn checks_working_copy_directories_first() {
        let dir = make_temp_dir("svn-wc");
        fs::create_dir_all(dir.join(".svn")).expect("failed to create .svn");
        let target = dir.display().to_string();
        let runner = Rc::new(FakeRunner::new().ok(
            &format!("svn propget reviewboard:url {}", target),
            "https://wc.example.com/\n",
        ));
        let lookup = SvnPropertyLookup::new(runner, "svn", &dir);

        let info = RepositoryInfo::new("https://svn.example.com/repos/proj", "/trunk");
        assert_eq!(
            lookup.scan_for_server_property(&info).unwrap().as_deref(),
            Some("https://wc.example.com/")
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_property() {
        let dir = make_temp_dir("no-prop");
        let runner = Rc::new(FakeRunner::new().fail(
            "svn propget reviewboard:url https://svn.example.com/repos/proj",
            1,
            "svn: warning: W200017: Property 'reviewboard:url' not found\n",
        ));
        let lookup = SvnPropertyLookup::new(runner, "svn", &dir);

        let info = RepositoryInfo::new("https://svn.example.com/repos/proj", "/trunk");
        assert_eq!(lookup.scan_for_server_property(&info).unwrap(), None);

        let _ = fs::remove_dir_all(&dir);
    }
}
