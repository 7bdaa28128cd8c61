//! Local git collaborator.
//!
//! Everything azdo needs from the local repository goes through the
//! [`GitCommands`] trait so that resolution logic can be exercised without a
//! real checkout. [`GitCli`] is the production implementation and shells out
//! to the `git` binary.

mod url;

pub use self::url::{is_possible_protocol, is_supported_protocol, is_supported_url, parse_url};

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output};

/// Git config key suffix marking the canonical remote in a fork setup.
pub const RESOLVED_CONFIG_KEY: &str = "azdo-resolved";

/// Tracking configuration of a local branch (`branch.<name>.remote` / `.merge`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchConfig {
    /// Remote name when `branch.<name>.remote` names a configured remote.
    pub remote_name: Option<String>,
    /// Remote URL when `branch.<name>.remote` holds a URL instead of a name.
    pub remote_url: Option<::url::Url>,
    /// Value of `branch.<name>.merge`, e.g. `refs/heads/feature`.
    pub merge_ref: Option<String>,
}

/// A remote as listed by `git remote -v`, before Azure DevOps resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemote {
    pub name: String,
    pub fetch_url: Option<::url::Url>,
    pub push_url: Option<::url::Url>,
    /// Value of `remote.<name>.azdo-resolved`, empty when unset.
    pub resolved: String,
}

/// Operations azdo performs against the local git repository.
pub trait GitCommands: Send + Sync {
    /// Name of the checked out branch, without the `refs/heads/` prefix.
    fn current_branch(&self) -> Result<String>;

    /// Tracking configuration for `branch`.
    fn read_branch_config(&self, branch: &str) -> Result<BranchConfig>;

    /// Whether `refs/heads/<branch>` exists.
    fn has_local_branch(&self, branch: &str) -> bool;

    /// Whether `refs/remotes/<remote>/<branch>` exists.
    fn has_remote_branch(&self, remote: &str, branch: &str) -> bool;

    /// Configured remotes with their `azdo-resolved` markers.
    fn remotes(&self) -> Result<Vec<GitRemote>>;
}

/// [`GitCommands`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .current_dir(&self.repo_path)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute git {}", args.join(" ")))
    }

    /// `git config --get-regexp` exits with 1 when nothing matches.
    fn config_regexp(&self, pattern: &str) -> Result<String> {
        let output = self.run(&["config", "--get-regexp", pattern])?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).to_string()),
            Some(1) => Ok(String::new()),
            _ => anyhow::bail!(
                "git config --get-regexp {} failed: {}",
                pattern,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }

    fn verify_ref(&self, reference: &str) -> bool {
        self.run(&["rev-parse", "--verify", "--quiet", reference])
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl GitCommands for GitCli {
    fn current_branch(&self) -> Result<String> {
        let output = self.run(&["symbolic-ref", "--quiet", "HEAD"])?;
        if !output.status.success() {
            anyhow::bail!("not on any branch (detached HEAD?)");
        }

        let reference = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(reference
            .strip_prefix("refs/heads/")
            .unwrap_or(&reference)
            .to_string())
    }

    fn read_branch_config(&self, branch: &str) -> Result<BranchConfig> {
        let pattern = format!(r"^branch\.{}\.(remote|merge)$", regex::escape(branch));
        let output = self
            .config_regexp(&pattern)
            .with_context(|| format!("Failed to read git config for branch '{}'", branch))?;
        Ok(parse_branch_config(&output))
    }

    fn has_local_branch(&self, branch: &str) -> bool {
        self.verify_ref(&format!("refs/heads/{}", branch))
    }

    fn has_remote_branch(&self, remote: &str, branch: &str) -> bool {
        self.verify_ref(&format!("refs/remotes/{}/{}", remote, branch))
    }

    fn remotes(&self) -> Result<Vec<GitRemote>> {
        let output = self.run(&["remote", "-v"])?;
        if !output.status.success() {
            anyhow::bail!(
                "Failed to list git remotes: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let mut remotes = parse_remote_list(&String::from_utf8_lossy(&output.stdout));

        let resolved = self
            .config_regexp(&format!(r"^remote\..*\.{}$", RESOLVED_CONFIG_KEY))
            .context("Failed to read resolved remote markers")?;
        populate_resolved(&mut remotes, &resolved);

        Ok(remotes)
    }
}

/// Parse `git config --get-regexp '^branch\.<name>\.(remote|merge)$'` output.
pub fn parse_branch_config(output: &str) -> BranchConfig {
    let mut config = BranchConfig::default();

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once(' ') else {
            continue;
        };
        let value = value.trim();

        if key.ends_with(".remote") {
            if is_filesystem_path(value) {
                continue;
            }
            if value.contains(':') {
                config.remote_url = parse_url(value).ok();
            } else {
                config.remote_name = Some(value.to_string());
            }
        } else if key.ends_with(".merge") {
            config.merge_ref = Some(value.to_string());
        }
    }

    config
}

fn is_filesystem_path(value: &str) -> bool {
    let bytes = value.as_bytes();
    let windows_drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/');

    value == "."
        || value == ".."
        || value.starts_with("./")
        || value.starts_with("../")
        || value.starts_with('/')
        || value.contains('\\')
        || windows_drive
}

/// Parse `git remote -v` output, keeping the order git reports.
///
/// Lines whose URL cannot be parsed are skipped.
pub fn parse_remote_list(output: &str) -> Vec<GitRemote> {
    let mut remotes: Vec<GitRemote> = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let name = parts[0];
        let Ok(url) = parse_url(parts[1]) else {
            continue;
        };
        let is_push = parts[2] == "(push)";

        let index = match remotes.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                remotes.push(GitRemote {
                    name: name.to_string(),
                    fetch_url: None,
                    push_url: None,
                    resolved: String::new(),
                });
                remotes.len() - 1
            }
        };

        let remote = &mut remotes[index];
        if is_push {
            remote.push_url = Some(url);
        } else {
            remote.fetch_url = Some(url);
        }
    }

    remotes
}

/// Apply `remote.<name>.azdo-resolved <value>` lines to matching remotes.
pub fn populate_resolved(remotes: &mut [GitRemote], config_output: &str) {
    let suffix = format!(".{}", RESOLVED_CONFIG_KEY);

    for line in config_output.lines() {
        let Some((key, value)) = line.trim().split_once(' ') else {
            continue;
        };
        let Some(name) = key
            .strip_prefix("remote.")
            .and_then(|rest| rest.strip_suffix(suffix.as_str()))
        else {
            continue;
        };

        if let Some(remote) = remotes.iter_mut().find(|r| r.name == name) {
            remote.resolved = value.trim().to_string();
        }
    }
}
