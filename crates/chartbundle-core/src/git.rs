//! Git location of a chart directory
//!
//! The location is attached to the chart resource as a JSON label, in the
//! same shape that deployment tooling expects for a Git repository
//! reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::Command;

use crate::error::{CoreError, Result};

/// Where a directory from a checkout can be found on a Git server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLocation {
    #[serde(rename = "authored-at")]
    pub authored_at: Option<DateTime<Utc>>,
    #[serde(rename = "branch")]
    pub branch_name: String,
    #[serde(rename = "committed-at")]
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(rename = "commit-id")]
    pub commit_id: String,
    #[serde(rename = "remote-url")]
    pub repository_url: String,
    #[serde(rename = "subpath", default, skip_serializing_if = "String::is_empty")]
    pub directory_path: String,
}

/// Outcome of one `git` invocation
enum GitOutput {
    Stdout(String),
    NotARepository,
}

impl GitLocation {
    /// Find the Git location of `path`
    ///
    /// Returns `None` if `path` is not inside a Git work tree, or if `git` is
    /// not installed.
    pub fn find(path: &Path) -> Result<Option<GitLocation>> {
        let inside = match git(path, &["rev-parse", "--is-inside-work-tree"]) {
            Ok(GitOutput::Stdout(out)) => out,
            Ok(GitOutput::NotARepository) => return Ok(None),
            Err(GitError::NotInstalled) => {
                tracing::debug!("git is not installed, skipping Git location");
                return Ok(None);
            }
            Err(GitError::Failed(e)) => return Err(e),
        };
        if inside.trim() != "true" {
            return Ok(None);
        }

        let head = git_stdout(path, &["show", "-s", "--pretty=%H %at %ct", "HEAD"])?;
        let (commit_id, authored_at, committed_at) = parse_head_line(&head)?;

        // only branches with an upstream; this also drops the "detached HEAD" line
        let branches = git_stdout(
            path,
            &[
                "branch",
                "--contains",
                "HEAD",
                "--format=%(if)%(upstream)%(then)%(refname:short)%(end)",
                "--omit-empty",
            ],
        )?;
        let branch_name = branches.split_whitespace().next().unwrap_or_default().to_string();

        let prefix = git_stdout(path, &["rev-parse", "--show-prefix"])?;
        let directory_path = prefix.trim().trim_end_matches('/').to_string();

        let repository_url = git_stdout(path, &["remote", "get-url", "origin"])?
            .trim()
            .to_string();

        Ok(Some(GitLocation {
            authored_at,
            branch_name,
            committed_at,
            commit_id,
            repository_url,
            directory_path,
        }))
    }
}

type HeadLine = (String, Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// Parse the output of `git show -s --pretty='%H %at %ct' HEAD`
fn parse_head_line(out: &str) -> Result<HeadLine> {
    let malformed = |message: String| CoreError::Git {
        path: String::new(),
        args: "show -s --pretty='%H %at %ct' HEAD".to_string(),
        message,
    };

    let fields: Vec<&str> = out.split_whitespace().collect();
    let [commit_id, authored, committed] = fields.as_slice() else {
        return Err(malformed(format!("malformed output {:?}", out.trim())));
    };
    let timestamp = |field: &str| -> Result<Option<DateTime<Utc>>> {
        let secs: i64 = field
            .parse()
            .map_err(|e| malformed(format!("malformed timestamp {:?}: {}", field, e)))?;
        Ok(DateTime::from_timestamp(secs, 0))
    };

    Ok((commit_id.to_string(), timestamp(*authored)?, timestamp(*committed)?))
}

enum GitError {
    NotInstalled,
    Failed(CoreError),
}

fn git_stdout(path: &Path, args: &[&str]) -> Result<String> {
    match git(path, args) {
        Ok(GitOutput::Stdout(out)) => Ok(out),
        Ok(GitOutput::NotARepository) => Err(git_error(path, args, "not a git repository")),
        Err(GitError::NotInstalled) => Err(git_error(path, args, "git is not installed")),
        Err(GitError::Failed(e)) => Err(e),
    }
}

fn git(path: &Path, args: &[&str]) -> std::result::Result<GitOutput, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .args(args)
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => GitError::NotInstalled,
            _ => GitError::Failed(git_error(path, args, &e.to_string())),
        })?;

    if output.status.success() {
        return Ok(GitOutput::Stdout(String::from_utf8_lossy(&output.stdout).into_owned()));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("not a git repository") {
        return Ok(GitOutput::NotARepository);
    }

    // forward Git's own diagnostics
    let _ = std::io::stderr().write_all(&output.stderr);
    Err(GitError::Failed(git_error(
        path,
        args,
        &format!(
            "{} (stdout was {:?})",
            output.status,
            String::from_utf8_lossy(&output.stdout)
        ),
    )))
}

fn git_error(path: &Path, args: &[&str], message: &str) -> CoreError {
    CoreError::Git {
        path: path.display().to_string(),
        args: args.join(" "),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_head_line() {
        let (commit, authored, committed) =
            parse_head_line("0123456789abcdef 1735689600 1735693200\n").unwrap();
        assert_eq!(commit, "0123456789abcdef");
        assert_eq!(authored.unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(committed.unwrap().to_rfc3339(), "2025-01-01T01:00:00+00:00");
    }

    #[test]
    fn test_parse_head_line_malformed() {
        assert!(parse_head_line("abc 123").is_err());
        assert!(parse_head_line("abc def 123").is_err());
    }

    #[test]
    fn test_json_shape() {
        let location = GitLocation {
            authored_at: DateTime::from_timestamp(1735689600, 0),
            branch_name: "main".to_string(),
            committed_at: None,
            commit_id: "abc".to_string(),
            repository_url: "https://example.com/repo.git".to_string(),
            directory_path: String::new(),
        };
        let value = serde_json::to_value(&location).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "authored-at": "2025-01-01T00:00:00Z",
                "branch": "main",
                "committed-at": null,
                "commit-id": "abc",
                "remote-url": "https://example.com/repo.git"
            })
        );
    }

    #[test]
    fn test_outside_of_git_checkout() {
        let dir = TempDir::new().unwrap();
        assert_eq!(GitLocation::find(dir.path()).unwrap(), None);
    }
}
