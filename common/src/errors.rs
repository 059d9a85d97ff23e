// Error handling framework
// One enum per concern; PublishError ties them to the pipeline step that failed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for an invalid configuration.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a credential/setup failure.
pub const EXIT_CREDENTIALS: i32 = 3;
/// Exit code for a generator failure.
pub const EXIT_GENERATE: i32 = 4;
/// Exit code for a commit/push failure.
pub const EXIT_PUBLISH: i32 = 5;
/// Exit code for a notifier failure.
pub const EXIT_NOTIFY: i32 = 6;

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("No next execution time available for '{0}'")]
    NoNextExecution(String),
}

/// Catalog (eggs.csv) errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Malformed catalog row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Catalog contains no eggs")]
    Empty,

    #[error("Invalid pull chance {chance} for egg '{name}'")]
    InvalidChance { name: String, chance: f64 },

    #[error("Catalog pull chances sum to zero")]
    ZeroTotalWeight,

    #[error("Catalog pull chances sum to a non-finite total")]
    TotalWeightOverflow,
}

/// External process errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("'{command}' exited with {}: {stderr}", display_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Empty command line")]
    EmptyCommand,
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "signal".to_string(),
    }
}

impl CommandError {
    /// Exit status of the child process, if it ran and exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Shop generation errors
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Generator secret key is not set")]
    MissingSecretKey,

    #[error("Generator did not produce {0}")]
    MissingOutput(PathBuf),

    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Failed to serialize shop: {0}")]
    Serialization(String),
}

/// Version-control errors
#[derive(Error, Debug)]
pub enum VcsError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Remote '{0}' is not an http(s) URL; cannot inject an access token")]
    UnsupportedRemote(String),

    #[error("Invalid remote URL '{url}': {reason}")]
    InvalidRemoteUrl { url: String, reason: String },

    #[error("Local branch has diverged from {remote_ref} ({ahead} ahead, {behind} behind)")]
    Diverged {
        remote_ref: String,
        ahead: u32,
        behind: u32,
    },

    #[error("Unexpected git output for {command}: {output}")]
    UnexpectedOutput { command: String, output: String },
}

/// Notification errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Missing secret: {0}")]
    MissingSecret(&'static str),

    #[error("Invalid channel id: {0}")]
    InvalidChannelId(String),

    #[error("Could not find channel with ID {0}")]
    ChannelNotFound(String),

    #[error("Discord API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to read shop artifact {path}: {reason}")]
    ArtifactUnreadable { path: PathBuf, reason: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Http(err.to_string())
    }
}

/// Pipeline step identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Credentials,
    Generate,
    Publish,
    Notify,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Credentials => "credentials",
            Step::Generate => "generate",
            Step::Publish => "publish",
            Step::Notify => "notify",
        }
    }

    /// Exit code used when the step fails without its own process status
    pub fn exit_code(&self) -> i32 {
        match self {
            Step::Credentials => EXIT_CREDENTIALS,
            Step::Generate => EXIT_GENERATE,
            Step::Publish => EXIT_PUBLISH,
            Step::Notify => EXIT_NOTIFY,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publish pipeline errors, one variant per step
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Credential setup failed: {0}")]
    Credentials(#[source] VcsError),

    #[error("Shop generation failed: {0}")]
    Generate(#[source] GenerateError),

    #[error("Publishing shop failed: {0}")]
    Publish(#[source] VcsError),

    #[error("Notification failed: {0}")]
    Notify(#[source] NotifyError),
}

impl PublishError {
    pub fn step(&self) -> Step {
        match self {
            PublishError::Credentials(_) => Step::Credentials,
            PublishError::Generate(_) => Step::Generate,
            PublishError::Publish(_) => Step::Publish,
            PublishError::Notify(_) => Step::Notify,
        }
    }

    /// Process exit code: the failing child's own status when there is one,
    /// otherwise the step's code.
    pub fn exit_code(&self) -> i32 {
        let child = match self {
            PublishError::Credentials(VcsError::Command(e))
            | PublishError::Publish(VcsError::Command(e))
            | PublishError::Generate(GenerateError::Command(e))
            | PublishError::Notify(NotifyError::Command(e)) => e.exit_code(),
            _ => None,
        };
        match child {
            Some(code) if code != 0 => code,
            _ => self.step().exit_code(),
        }
    }
}
