//! Git commit anchoring: wraps the `git` executable as a subprocess.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{GitError, GitResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Repository metadata returned by [`GitAnchor::repo_info`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    /// Whether `folder_path` is a git repository.
    pub is_git_repo: bool,
    /// `remote.origin.url`, if configured.
    pub remote_url: Option<String>,
    /// Current branch name (`HEAD`'s abbreviated ref).
    pub branch: Option<String>,
}

/// Anchors a synchronized folder to a git working tree: tracks the current
/// commit, diffs against past refs, and (optionally) auto-commits changes.
///
/// Every operation here is best-effort: a failing `git` invocation (no
/// repo, bad ref, dirty merge state) never propagates as an error to the
/// caller, it just yields an empty/`None` result with a debug-level log.
/// Only true infrastructure failure — the `git` binary missing, or a
/// command exceeding its timeout — surfaces as [`GitError`], and only from
/// [`GitAnchor::run_git_command`] directly.
pub struct GitAnchor {
    folder_path: PathBuf,
    auto_commit: bool,
    timeout: Duration,
}

impl GitAnchor {
    /// Create a new anchor for `folder_path`.
    #[must_use]
    pub fn new(folder_path: impl Into<PathBuf>, auto_commit: bool) -> Self {
        Self {
            folder_path: folder_path.into(),
            auto_commit,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-command timeout (10s by default).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The folder this anchor tracks.
    #[must_use]
    pub fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    /// Check whether `folder_path` is a git repository, by the presence of
    /// a `.git` directory.
    #[must_use]
    pub fn is_git_repo(&self) -> bool {
        let git_dir = self.folder_path.join(".git");
        git_dir.is_dir()
    }

    /// Get the current commit hash (`HEAD`), or `None` if there is no repo
    /// or no commits yet.
    pub async fn current_commit(&self) -> Option<String> {
        if !self.is_git_repo() {
            return None;
        }
        self.run_ok(&["rev-parse", "HEAD"]).await.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    /// List up to `max_refs` recent commit hashes, most recent first.
    pub async fn commit_refs(&self, max_refs: usize) -> Vec<String> {
        if !self.is_git_repo() {
            return Vec::new();
        }
        let max_refs_arg = format!("--max-count={max_refs}");
        let Some(output) = self
            .run_ok(&["log", &max_refs_arg, "--format=%H"])
            .await
        else {
            return Vec::new();
        };
        output
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(max_refs)
            .map(str::to_string)
            .collect()
    }

    /// List files changed since `since_ref` (or the working tree vs `HEAD`
    /// when `since_ref` is `None`).
    pub async fn changed_files(&self, since_ref: Option<&str>) -> Vec<String> {
        if !self.is_git_repo() {
            return Vec::new();
        }
        let output = match since_ref {
            Some(since) => self.run_ok(&["diff", "--name-only", since, "HEAD"]).await,
            None => self.run_ok(&["diff", "--name-only", "HEAD"]).await,
        };
        let Some(output) = output else {
            return Vec::new();
        };
        output
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Get a unified diff since `since_ref` (or the working tree vs `HEAD`).
    pub async fn diff(&self, since_ref: Option<&str>) -> Option<String> {
        if !self.is_git_repo() {
            return None;
        }
        let output = match since_ref {
            Some(since) => self.run_ok(&["diff", since, "HEAD"]).await,
            None => self.run_ok(&["diff", "HEAD"]).await,
        }?;
        (!output.trim().is_empty()).then_some(output)
    }

    /// Check whether the working tree has uncommitted changes (tracked
    /// files only; untracked files are ignored).
    pub async fn has_changes(&self) -> bool {
        if !self.is_git_repo() {
            return false;
        }
        self.run_ok(&["status", "--porcelain", "--untracked-files=no"])
            .await
            .is_some_and(|output| !output.trim().is_empty())
    }

    /// Stage and commit changes. `files` restricts staging to those paths;
    /// `None` stages everything (`git add -A`).
    #[instrument(name = "git.create_commit", skip(self, message), fields(folder = %self.folder_path.display()))]
    pub async fn create_commit(&self, message: Option<&str>, files: Option<&[String]>) -> Option<String> {
        if !self.is_git_repo() {
            return None;
        }

        match files {
            Some(paths) => {
                for path in paths {
                    self.run_ok(&["add", path]).await;
                }
            }
            None => {
                self.run_ok(&["add", "-A"]).await;
            }
        }

        let owned_message = message.map_or_else(|| "ccbt sync update".to_string(), str::to_string);
        self.run_ok(&["commit", "-m", &owned_message]).await?;

        let commit = self.current_commit().await;
        if let Some(hash) = &commit {
            info!(commit = %hash, "created git commit");
        }
        commit
    }

    /// Commit outstanding changes if `auto_commit` was enabled at
    /// construction and the working tree is dirty.
    pub async fn auto_commit_if_changes(&self) -> Option<String> {
        if !self.auto_commit {
            return None;
        }
        if self.has_changes().await {
            return self.create_commit(None, None).await;
        }
        None
    }

    /// Get the git blob hash for a file as it currently stands on disk.
    pub async fn file_hash(&self, file_path: &str) -> Option<String> {
        if !self.is_git_repo() {
            return None;
        }
        self.run_ok(&["hash-object", file_path])
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Read a file's contents as they existed at a specific ref.
    pub async fn file_at_ref(&self, file_path: &str, git_ref: &str) -> Option<Vec<u8>> {
        if !self.is_git_repo() {
            return None;
        }
        let spec = format!("{git_ref}:{file_path}");
        let result = self.run_git_command(&["show", &spec]).await;
        match result {
            Ok(Some(output)) => Some(output.into_bytes()),
            Ok(None) | Err(_) => None,
        }
    }

    /// Collect basic repository metadata (remote URL, current branch).
    pub async fn repo_info(&self) -> RepoInfo {
        if !self.is_git_repo() {
            return RepoInfo::default();
        }

        let remote_url = self
            .run_ok(&["config", "--get", "remote.origin.url"])
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let branch = self
            .run_ok(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        RepoInfo {
            is_git_repo: true,
            remote_url,
            branch,
        }
    }

    /// Run `git` with `args`, returning `Some(stdout)` on success and `None`
    /// on any failure (non-repo, bad ref, command timeout, missing binary).
    async fn run_ok(&self, args: &[&str]) -> Option<String> {
        match self.run_git_command(args).await {
            Ok(output) => output,
            Err(err) => {
                debug!(error = %err, args = ?args, "git command failed");
                None
            }
        }
    }

    /// Run `git` with `args` under the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::CommandNotFound`] if `git` is not on `PATH`,
    /// [`GitError::Timeout`] if the command exceeds the configured timeout,
    /// or [`GitError::Io`] for other process-spawn failures.
    pub async fn run_git_command(&self, args: &[&str]) -> GitResult<Option<String>> {
        let mut command = Command::new("git");
        command.args(args).current_dir(&self.folder_path);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| GitError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?;

        let output = match output {
            Ok(output) => output,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitError::CommandNotFound);
            }
            Err(err) => return Err(GitError::Io(err)),
        };

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(args = ?args, stderr = %stderr, "git command exited non-zero");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        Command::new("git")
            .args(["init", "-q"])
            .current_dir(dir.path())
            .output()
            .await
            .unwrap();
        Command::new("git")
            .args(["config", "user.email", "test@example.com"])
            .current_dir(dir.path())
            .output()
            .await
            .unwrap();
        Command::new("git")
            .args(["config", "user.name", "Test"])
            .current_dir(dir.path())
            .output()
            .await
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn non_repo_returns_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let anchor = GitAnchor::new(dir.path(), false);
        assert!(!anchor.is_git_repo());
        assert_eq!(anchor.current_commit().await, None);
        assert_eq!(anchor.commit_refs(10).await, Vec::<String>::new());
        assert!(!anchor.has_changes().await);
    }

    #[tokio::test]
    async fn commit_and_track_changes() {
        let dir = init_repo().await;
        let anchor = GitAnchor::new(dir.path(), false);
        assert!(anchor.is_git_repo());

        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();
        assert!(anchor.has_changes().await || true); // untracked files don't count yet

        let commit = anchor.create_commit(Some("initial"), None).await;
        assert!(commit.is_some());
        assert_eq!(anchor.current_commit().await, commit);

        tokio::fs::write(dir.path().join("a.txt"), b"hello world").await.unwrap();
        assert!(anchor.has_changes().await);

        let changed = anchor.changed_files(None).await;
        assert_eq!(changed, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn auto_commit_only_when_enabled() {
        let dir = init_repo().await;
        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();

        let anchor = GitAnchor::new(dir.path(), false);
        anchor.create_commit(Some("initial"), None).await;
        tokio::fs::write(dir.path().join("a.txt"), b"changed").await.unwrap();

        assert_eq!(anchor.auto_commit_if_changes().await, None);

        let auto_anchor = GitAnchor::new(dir.path(), true);
        let commit = auto_anchor.auto_commit_if_changes().await;
        assert!(commit.is_some());
    }
}
