// git command-line adapter

use crate::errors::VcsError;
use crate::models::CommitAuthor;
use crate::process::{self, CommandSpec};
use crate::vcs::{with_access_token, VersionControl};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Runs `git` inside a working tree
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    remote: String,
    program: String,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            remote: remote.into(),
            program: "git".to_string(),
        }
    }

    /// Use a specific git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn git<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(self.program.clone())
            .args(args)
            .current_dir(&self.repo)
            // Never block on an interactive credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
    }

    /// Path of `path` relative to the working tree, as git pathspecs expect
    fn pathspec(&self, path: &Path) -> String {
        path.strip_prefix(&self.repo)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    pub async fn remote_url(&self) -> Result<String, VcsError> {
        let output = process::run(&self.git(["remote", "get-url", self.remote.as_str()])).await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn head(&self) -> Result<String, VcsError> {
        let output = process::run(&self.git(["rev-parse", "HEAD"])).await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Remote-tracking ref for `branch`
    fn tracking_ref(&self, branch: &str) -> String {
        format!("refs/remotes/{}/{}", self.remote, branch)
    }

    /// Commits on `HEAD` missing from the tracking ref, and the reverse
    async fn ahead_behind(&self, tracking: &str) -> Result<(u32, u32), VcsError> {
        let spec = self
            .git(["rev-list", "--left-right", "--count"])
            .arg(format!("HEAD...{}", tracking));
        let output = process::run(&spec).await?;
        parse_ahead_behind(&output.stdout).ok_or_else(|| VcsError::UnexpectedOutput {
            command: spec.display(),
            output: output.stdout.trim().to_string(),
        })
    }
}

/// Parses the `<left>\t<right>` counts printed by `rev-list --left-right --count`
fn parse_ahead_behind(stdout: &str) -> Option<(u32, u32)> {
    let mut counts = stdout.split_whitespace().map(str::parse::<u32>);
    match (counts.next(), counts.next(), counts.next()) {
        (Some(Ok(ahead)), Some(Ok(behind)), None) => Some((ahead, behind)),
        _ => None,
    }
}

#[async_trait]
impl VersionControl for GitCli {
    #[instrument(skip(self, token), fields(remote = %self.remote))]
    async fn configure_credentials(&self, token: &str) -> Result<(), VcsError> {
        let current = self.remote_url().await?;
        let authenticated = with_access_token(&current, token)?;

        let spec = self
            .git(["remote", "set-url", self.remote.as_str()])
            .arg(authenticated)
            .redact(token);
        process::run(&spec).await?;

        info!("Remote configured with access token");
        Ok(())
    }

    #[instrument(skip(self), fields(remote = %self.remote))]
    async fn sync(&self, branch: &str) -> Result<(), VcsError> {
        let tracking = self.tracking_ref(branch);
        let spec = self
            .git(["fetch", "--quiet", self.remote.as_str()])
            .arg(format!("+refs/heads/{}:{}", branch, tracking));
        process::run(&spec).await?;

        let (ahead, behind) = self.ahead_behind(&tracking).await?;
        if ahead > 0 && behind > 0 {
            return Err(VcsError::Diverged {
                remote_ref: tracking,
                ahead,
                behind,
            });
        }
        if behind > 0 {
            process::run(&self.git(["merge", "--ff-only", "--quiet"]).arg(tracking))
                .await?;
            info!(behind = behind, "Fast-forwarded to remote branch");
        } else if ahead > 0 {
            info!(ahead = ahead, "Local branch carries unpushed commits");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unpushed_head(&self, branch: &str) -> Result<Option<String>, VcsError> {
        let (ahead, _) = self.ahead_behind(&self.tracking_ref(branch)).await?;
        if ahead == 0 {
            return Ok(None);
        }
        Ok(Some(self.head().await?))
    }

    #[instrument(skip(self))]
    async fn has_changes(&self, path: &Path) -> Result<bool, VcsError> {
        let spec = self
            .git(["status", "--porcelain", "--untracked-files=all", "--"])
            .arg(self.pathspec(path));
        let output = process::run(&spec).await?;
        Ok(!output.stdout.trim().is_empty())
    }

    #[instrument(skip(self, message))]
    async fn commit(
        &self,
        path: &Path,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<String, VcsError> {
        let pathspec = self.pathspec(path);

        process::run(&self.git(["add", "--"]).arg(pathspec.clone())).await?;

        // Identity is passed per invocation so the repository config is untouched;
        // the pathspec limits the commit to the artifact even if other paths are staged.
        let spec = self
            .git(["-c"])
            .arg(format!("user.name={}", author.name))
            .arg("-c")
            .arg(format!("user.email={}", author.email))
            .args(["commit", "--quiet", "-m"])
            .arg(message)
            .arg("--")
            .arg(pathspec);
        process::run(&spec).await?;

        let commit = self.head().await?;
        info!(commit = %commit, "Created commit");
        Ok(commit)
    }

    #[instrument(skip(self))]
    async fn push(&self, branch: &str) -> Result<(), VcsError> {
        let spec = self
            .git(["push", "--quiet", self.remote.as_str()])
            .arg(format!("HEAD:{}", branch));
        process::run(&spec).await?;
        info!(remote = %self.remote, branch = branch, "Pushed");
        Ok(())
    }
}
