use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexSet;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{AtlasError, Result};

/// Default upper bound on a single diff computation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// A path reported by `git diff --name-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Path after the change; for renames and copies, the destination.
    pub path: String,
    pub status: ChangeStatus,
}

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
}

impl ChangeStatus {
    pub fn from_git_status(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' => Some(ChangeStatus::Added),
            'M' => Some(ChangeStatus::Modified),
            'D' => Some(ChangeStatus::Deleted),
            'R' => Some(ChangeStatus::Renamed),
            'C' => Some(ChangeStatus::Copied),
            'T' => Some(ChangeStatus::TypeChanged),
            _ => Some(ChangeStatus::Modified),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Renamed => "renamed",
            ChangeStatus::Copied => "copied",
            ChangeStatus::TypeChanged => "type_changed",
        }
    }

    /// Whether the reported path exists in the head tree.
    pub fn exists_after(&self) -> bool {
        !matches!(self, ChangeStatus::Deleted)
    }
}

/// Parses one `--name-status` line: `M\tpath` or `R100\told\tnew`.
pub fn parse_diff_line(line: &str) -> Option<ChangedFile> {
    let mut fields = line.split('\t');
    let status = ChangeStatus::from_git_status(fields.next()?.trim())?;
    let path = fields.last()?.trim();
    if path.is_empty() {
        return None;
    }
    Some(ChangedFile {
        path: path.to_string(),
        status,
    })
}

pub fn parse_name_status(output: &str) -> Vec<ChangedFile> {
    output.lines().filter_map(parse_diff_line).collect()
}

/// Produces the raw file changes between two commits.
///
/// `base == None` means "the head commit against its first parent"; a root
/// commit reports every file it contains as added. Dropping the returned
/// future must abandon the work.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn diff(&self, base: Option<&str>, head: &str) -> Result<Vec<ChangedFile>>;
}

/// [`DiffSource`] backed by the `git` command line.
///
/// Each git process is killed when its future is dropped, so a caller-side
/// timeout also stops the child.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    pub fn new(repo_path: impl AsRef<Path>) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run git command, returning stdout on success.
    pub async fn run_command(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(["-c", "core.quotepath=false"])
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AtlasError::Git(format!("Failed to run git: {}", e)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            Err(AtlasError::Git(if message.is_empty() {
                format!("git {} exited with {}", args.join(" "), output.status)
            } else {
                message.to_string()
            }))
        }
    }

    /// Resolves `reference` to a commit id.
    async fn verify_commit(&self, reference: &str) -> Result<String> {
        let spec = format!("{}^{{commit}}", reference);
        self.run_command(&["rev-parse", "--verify", "--quiet", &spec])
            .await
            .map(|out| out.trim().to_string())
            .map_err(|_| AtlasError::Git(format!("unknown revision '{}'", reference)))
    }

    async fn is_shallow(&self) -> bool {
        self.run_command(&["rev-parse", "--is-shallow-repository"])
            .await
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }
}

#[async_trait]
impl DiffSource for GitCli {
    async fn diff(&self, base: Option<&str>, head: &str) -> Result<Vec<ChangedFile>> {
        let head = self.verify_commit(head).await?;

        let output = match base {
            Some(base) => {
                let base = self.verify_commit(base).await?;
                self.run_command(&["diff", "--name-status", "--find-renames", &base, &head])
                    .await?
            }
            None => match self.verify_commit(&format!("{}^1", head)).await {
                Ok(parent) => {
                    self.run_command(&["diff", "--name-status", "--find-renames", &parent, &head])
                        .await?
                }
                Err(_) => {
                    if self.is_shallow().await {
                        return Err(AtlasError::Git(format!(
                            "parent of {} is missing from a shallow clone",
                            head
                        )));
                    }
                    debug!("{} is a root commit; reporting its whole tree", head);
                    self.run_command(&["diff-tree", "-r", "--root", "--no-commit-id", "--name-status", &head])
                        .await?
                }
            },
        };

        Ok(parse_name_status(&output))
    }
}

/// Which two states of the repository to compare, fixed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiffRequest {
    /// `head` against `before`, or against its own parent when `before` is
    /// absent or the all-zero id a new branch push carries.
    Push { head: String, before: Option<String> },
    PullRequest { base: String, head: String },
}

impl DiffRequest {
    pub fn push(head: impl Into<String>, before: Option<String>) -> Self {
        DiffRequest::Push {
            head: head.into(),
            before,
        }
    }

    pub fn pull_request(base: impl Into<String>, head: impl Into<String>) -> Self {
        DiffRequest::PullRequest {
            base: base.into(),
            head: head.into(),
        }
    }

    /// Builds a request from a CI event name.
    pub fn from_event(event: &str, base: Option<String>, head: impl Into<String>) -> Result<Self> {
        match event {
            "push" => Ok(Self::push(head, base)),
            "pull_request" | "pull-request" | "pull_request_target" => match base {
                Some(base) => Ok(Self::pull_request(base, head)),
                None => Err(AtlasError::Config(format!("event '{}' requires a base ref", event))),
            },
            other => Err(AtlasError::Config(format!("unsupported event '{}'", other))),
        }
    }

    /// `(base, head)` for the diff source.
    pub fn refs(&self) -> (Option<&str>, &str) {
        match self {
            DiffRequest::Push { head, before } => {
                let before = before.as_deref().filter(|b| !is_null_ref(b));
                (before, head.as_str())
            }
            DiffRequest::PullRequest { base, head } => (Some(base.as_str()), head.as_str()),
        }
    }
}

impl fmt::Display for DiffRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.refs() {
            (Some(base), head) => write!(f, "{}..{}", base, head),
            (None, head) => write!(f, "{}^..{}", head, head),
        }
    }
}

fn is_null_ref(reference: &str) -> bool {
    reference.trim().chars().all(|c| c == '0')
}

/// Paths that exist after the change, in the order git reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    paths: IndexSet<String>,
}

impl ChangeSet {
    pub fn from_changes<I>(changes: I) -> Self
    where
        I: IntoIterator<Item = ChangedFile>,
    {
        changes
            .into_iter()
            .filter(|change| change.status.exists_after())
            .map(|change| change.path)
            .collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<String> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

/// Computes change sets with an upper bound on how long git may take.
pub struct ChangeDetector {
    source: Arc<dyn DiffSource>,
    timeout: Duration,
}

impl ChangeDetector {
    pub fn new(source: Arc<dyn DiffSource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Paths added or modified by `request`.
    ///
    /// Every failure, including a timeout, is [`AtlasError::DiffUnavailable`].
    /// On timeout the diff future is dropped, which stops any git process it
    /// started.
    pub async fn changed_files(&self, request: &DiffRequest) -> Result<ChangeSet> {
        let label = request.to_string();
        let (base, head) = request.refs();

        let changes = match tokio::time::timeout(self.timeout, self.source.diff(base, head)).await {
            Err(_) => {
                return Err(AtlasError::diff_unavailable(
                    label,
                    format!("git did not finish within {:?}", self.timeout),
                ));
            }
            Ok(Err(AtlasError::DiffUnavailable { reason, .. })) => {
                return Err(AtlasError::diff_unavailable(label, reason));
            }
            Ok(Err(e)) => return Err(AtlasError::diff_unavailable(label, e.to_string())),
            Ok(Ok(changes)) => changes,
        };

        let change_set = ChangeSet::from_changes(changes);
        info!("{} changed files in {}", change_set.len(), label);
        Ok(change_set)
    }
}
