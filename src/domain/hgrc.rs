//! Mercurial configuration mapping, as dumped by `hg showconfig`.

use super::types::RemotePath;
use std::collections::HashMap;

/// Remote path names checked, in order, when no parent branch is given.
pub const REMOTE_PATH_CANDIDATES: &[&str] = &["reviewboard", "origin", "parent", "default"];

/// Configuration key holding the review server URL.
pub const SERVER_URL_KEY: &str = "reviewboard.url";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HgRc {
    values: HashMap<String, String>,
}

impl HgRc {
    /// Build the mapping from `section.key=value` lines.
    /// Lines without `=` (wrapped multi-line values) are skipped.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let values = lines
            .into_iter()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.to_string(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The review server URL configured for this repository, if any.
    pub fn server_url(&self) -> Option<String> {
        self.get(SERVER_URL_KEY)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(String::from)
    }

    /// First configured remote path among [`REMOTE_PATH_CANDIDATES`].
    pub fn remote_path(&self) -> Option<RemotePath> {
        REMOTE_PATH_CANDIDATES.iter().find_map(|candidate| {
            self.get(&format!("paths.{}", candidate)).map(|url| RemotePath {
                name: candidate.to_string(),
                url: url.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHOWCONFIG: &str = "\
bundle.mainreporoot=/home/u/proj
paths.default=https://hg.example.com/proj
paths.origin=http://x
ui.username=Jane Doe <jane@example.com>
reviewboard.url= https://reviews.example.com/
";

    #[test]
    fn parses_showconfig_lines() {
        let hgrc = HgRc::from_lines(SHOWCONFIG.lines());
        assert_eq!(hgrc.get("ui.username"), Some("Jane Doe <jane@example.com>"));
        assert_eq!(hgrc.get("missing.key"), None);
    }

    #[test]
    fn skips_lines_without_separator() {
        let hgrc = HgRc::from_lines(["ui.editor=vim", "  continuation line"]);
        assert_eq!(hgrc.get("ui.editor"), Some("vim"));
        assert_eq!(hgrc.get("  continuation line"), None);
    }

    #[test]
    fn origin_beats_default() {
        let hgrc = HgRc::from_lines(SHOWCONFIG.lines());
        assert_eq!(
            hgrc.remote_path(),
            Some(RemotePath {
                name: "origin".to_string(),
                url: "http://x".to_string(),
            })
        );
    }

    #[test]
    fn reviewboard_path_wins() {
        let hgrc = HgRc::from_lines([
            "paths.default=https://a",
            "paths.parent=https://b",
            "paths.reviewboard=https://c",
        ]);
        assert_eq!(hgrc.remote_path().map(|p| p.name), Some("reviewboard".to_string()));
    }

    #[test]
    fn no_candidate_paths() {
        let hgrc = HgRc::from_lines(["paths.upstream=https://a"]);
        assert_eq!(hgrc.remote_path(), None);
    }

    #[test]
    fn server_url_is_trimmed() {
        let hgrc = HgRc::from_lines(SHOWCONFIG.lines());
        assert_eq!(
            hgrc.server_url(),
            Some("https://reviews.example.com/".to_string())
        );
    }
}
