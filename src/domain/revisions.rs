//! Pure helpers for revision ranges and revision-related tool output.
//! No I/O - callers feed in captured stdout and get values back.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix `bzr revno` prints when it resolved the revision in a parent branch.
pub const USING_PARENT_PREFIX: &str = "Using parent branch ";

/// Prefix of transport warnings `hg outgoing` mixes into its output.
pub const HG_WARNING_PREFIX: &str = "warning: ";

static HG_RANGE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\.|::").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
static HG_PARENT_NODE: Lazy<Regex> = Lazy::new(|| Regex::new(r":\S+\s*").unwrap());

/// Split a Bazaar revision argument on `..`.
///
/// A `..` directly followed by a path separator is part of a path-like
/// revision specifier and does not split.
pub fn split_bazaar_range(token: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let bytes = token.as_bytes();

    while i + 1 < bytes.len() {
        if bytes[i] == b'.' && bytes[i + 1] == b'.' {
            let next = bytes.get(i + 2).copied();
            if next != Some(b'/') && next != Some(b'\\') {
                parts.push(token[start..i].to_string());
                i += 2;
                start = i;
                continue;
            }
        }
        i += 1;
    }

    parts.push(token[start..].to_string());
    parts
}

/// Split a Mercurial revision argument on `..` or `::`.
pub fn split_hg_range(token: &str) -> Vec<String> {
    HG_RANGE_SEPARATOR.split(token).map(String::from).collect()
}

/// Split an explicit range used for log lookups into its two endpoints.
/// Returns `None` for a single revision.
pub fn split_log_range(range: &str) -> Option<(String, String)> {
    let parts = split_hg_range(range);
    if parts.len() == 2 {
        return Some((parts[0].clone(), parts[1].clone()));
    }
    range
        .split_once(':')
        .map(|(a, b)| (a.to_string(), b.to_string()))
}

/// Encode `bzr revno` output as a revision specifier later commands accept.
///
/// Stdout carries the revision number. When Bazaar had to use a parent branch
/// to resolve the revision it notes so on stderr; the branch is kept so later
/// diffs resolve the same way.
pub fn encode_revno(stdout: &str, stderr: &str) -> Option<String> {
    let parent_branch = stderr
        .lines()
        .chain(stdout.lines())
        .find_map(|line| line.trim_end().strip_prefix(USING_PARENT_PREFIX));

    let numbers: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(USING_PARENT_PREFIX))
        .collect();

    match (numbers.as_slice(), parent_branch) {
        ([revno], Some(branch)) => Some(format!("revno:{}:{}", revno, branch)),
        ([revno], None) => Some(format!("revno:{}", revno)),
        _ => None,
    }
}

/// Extract the commit message from a `bzr log --line` entry.
///
/// The format is `{revno}: {committer} {YYYY-MM-DD} {message}`, so everything
/// up to the date and the following space is dropped.
pub fn summary_from_log_line(line: &str) -> String {
    let line = line.trim_end();
    match ISO_DATE.find(line) {
        Some(m) => line.get(m.end() + 1..).unwrap_or("").to_string(),
        None => line.to_string(),
    }
}

/// Parse `hg outgoing` output produced with the `b:{branches}\nr:{rev}\n\n`
/// template, keeping numeric revisions on `current_branch` in output order.
pub fn parse_outgoing(raw: &str, current_branch: &str) -> Vec<i64> {
    let mut revisions = Vec::new();

    for block in raw.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }

        let lines: Vec<&str> = block
            .trim()
            .lines()
            .filter(|l| !l.starts_with(HG_WARNING_PREFIX))
            .collect();

        let (branch, rev) = match lines.as_slice() {
            [] => continue,
            [branch, rev] => (*branch, *rev),
            _ => {
                log::warn!("Ignoring unexpected outgoing changeset block {:?}", block);
                continue;
            }
        };

        let branch_name = branch.strip_prefix("b:").unwrap_or(branch).trim();
        let branch_name = if branch_name.is_empty() {
            "default"
        } else {
            branch_name
        };
        let revno = rev.strip_prefix("r:").unwrap_or(rev);

        if branch_name == current_branch && is_revision_number(revno) {
            log::debug!(
                "Found outgoing changeset {} for branch {:?}",
                revno,
                branch_name
            );
            if let Ok(n) = revno.parse::<i64>() {
                revisions.push(n);
            }
        }
    }

    revisions
}

fn is_revision_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Parse the `{parents}` template (`rev:node rev:node`) into revision numbers.
pub fn parse_parents(output: &str) -> Vec<i64> {
    HG_PARENT_NODE
        .split(output)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<i64>().ok())
        .collect()
}

/// Bottom and top revisions of an outgoing changeset list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingBounds {
    pub bottom: i64,
    pub top: i64,
}

/// Work out the revision range covering the outgoing changesets.
///
/// `parents_of` returns the explicit parents of a revision; an empty list
/// means the only parent is the previous revision. Changesets are scanned
/// from most recent to least recent and the first one with a parent outside
/// the outgoing list fixes the bottom.
pub fn outgoing_bounds<F>(outgoing: &[i64], mut parents_of: F) -> Result<Option<OutgoingBounds>>
where
    F: FnMut(i64) -> Result<Vec<i64>>,
{
    let Some(&top) = outgoing.iter().max() else {
        return Ok(None);
    };

    let mut bottom = None;
    for &rev in outgoing.iter().rev() {
        let mut parents = parents_of(rev)?;
        if parents.is_empty() {
            parents.push(rev - 1);
        }

        if let Some(&external) = parents.iter().find(|p| !outgoing.contains(p)) {
            bottom = Some(external);
            break;
        }
    }

    let bottom = bottom.unwrap_or(top - 1).max(0);
    Ok(Some(OutgoingBounds { bottom, top }))
}
