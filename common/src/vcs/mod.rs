// Version-control operations used by the publish step

pub mod git;
pub mod remote;

pub use git::GitCli;
pub use remote::with_access_token;

use crate::errors::VcsError;
use crate::models::CommitAuthor;
use async_trait::async_trait;
use std::path::Path;

/// Repository operations the publisher needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Point the push remote at a URL carrying `token`
    async fn configure_credentials(&self, token: &str) -> Result<(), VcsError>;

    /// Fetch `branch` and fast-forward onto it; fails if local commits and
    /// remote commits have diverged
    async fn sync(&self, branch: &str) -> Result<(), VcsError>;

    /// Whether `path` differs from the committed version (untracked counts)
    async fn has_changes(&self, path: &Path) -> Result<bool, VcsError>;

    /// Commit only `path` and return the new commit id
    async fn commit(
        &self,
        path: &Path,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<String, VcsError>;

    /// `HEAD` when it carries commits the remote `branch` does not have
    async fn unpushed_head(&self, branch: &str) -> Result<Option<String>, VcsError>;

    /// Push `HEAD` to `branch` on the configured remote
    async fn push(&self, branch: &str) -> Result<(), VcsError>;
}
