// External notifier process
//
// The child inherits this process's environment, which is how it receives the
// Discord secrets.

use crate::errors::NotifyError;
use crate::notifier::{Delivery, Notifier};
use crate::process::{self, CommandSpec};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: Vec<String>,
    working_dir: PathBuf,
    redact: Vec<String>,
}

impl CommandNotifier {
    pub fn new(command: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
            redact: Vec::new(),
        }
    }

    /// Values to scrub from the child's captured output
    pub fn with_redactions<I: IntoIterator<Item = String>>(mut self, secrets: I) -> Self {
        self.redact.extend(secrets);
        self
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    #[instrument(skip(self))]
    async fn notify(&self, artifact: &Path) -> Result<Delivery, NotifyError> {
        let spec = self
            .redact
            .iter()
            .fold(
                CommandSpec::from_argv(&self.command)?.current_dir(&self.working_dir),
                |spec, secret| spec.redact(secret.clone()),
            )
            .env("SHOP_ARTIFACT", artifact.to_string_lossy());

        info!(command = %spec.display(), "Running external notifier");
        let output = process::run(&spec).await?;
        if !output.stdout.trim().is_empty() {
            info!(output = %output.stdout.trim(), "Notifier output");
        }
        Ok(Delivery::default())
    }
}
