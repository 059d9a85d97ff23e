// Publish pipeline
//
// credentials -> generate -> conditional commit/push -> notify
//
// The first failing step ends the run. Notification only happens after the
// publish step succeeded, including when it was a no-op. Nothing is rolled
// back: a notify failure after a push leaves the new commit in place.

use crate::errors::{PublishError, Step};
use crate::models::{CommitAuthor, GeneratedArtifact, PublishOutcome, RunReport};
use crate::notifier::{Delivery, Notifier};
use crate::shop::ShopGenerator;
use crate::telemetry;
use crate::vcs::VersionControl;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn, Instrument};
use uuid::Uuid;

/// Static parameters of a publish run
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub artifact: PathBuf,
    pub branch: String,
    pub commit_message: String,
    pub author: CommitAuthor,
    pub access_token: Option<String>,
}

pub struct Publisher {
    vcs: Arc<dyn VersionControl>,
    generator: Arc<dyn ShopGenerator>,
    notifier: Arc<dyn Notifier>,
    settings: PublishSettings,
}

impl Publisher {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        generator: Arc<dyn ShopGenerator>,
        notifier: Arc<dyn Notifier>,
        settings: PublishSettings,
    ) -> Self {
        Self {
            vcs,
            generator,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Run all four steps once
    pub async fn run(&self) -> Result<RunReport, PublishError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("publish_run", run_id = %run_id);
        let started = Instant::now();

        let result = self.run_steps(run_id, started).instrument(span).await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(report) => telemetry::record_run_success(&report.outcome, elapsed),
            Err(e) => {
                error!(run_id = %run_id, step = %e.step(), error = %e, "Publish run failed");
                telemetry::record_run_failure(e.step(), elapsed);
            }
        }
        result
    }

    async fn run_steps(&self, run_id: Uuid, started: Instant) -> Result<RunReport, PublishError> {
        info!("Starting publish run");

        self.acquire_credentials().await?;
        let artifact = self.regenerate().await?;
        let outcome = self.publish().await?;
        self.announce().await?;

        let report = RunReport {
            run_id,
            artifact,
            outcome,
            notified: true,
            duration: started.elapsed(),
        };
        info!(
            committed = report.outcome.committed(),
            duration_ms = report.duration.as_millis() as u64,
            "Publish run finished"
        );
        Ok(report)
    }

    /// Step 1: point the remote at the access token and catch up with the
    /// remote branch
    #[instrument(skip(self), fields(step = %Step::Credentials))]
    pub async fn acquire_credentials(&self) -> Result<(), PublishError> {
        match self.settings.access_token.as_deref() {
            Some(token) => self
                .vcs
                .configure_credentials(token)
                .await
                .map_err(PublishError::Credentials)?,
            None => warn!("No access token provided; pushing with ambient credentials"),
        }
        self.vcs
            .sync(&self.settings.branch)
            .await
            .map_err(PublishError::Credentials)
    }

    /// Step 2: regenerate the artifact
    #[instrument(skip(self), fields(step = %Step::Generate))]
    pub async fn regenerate(&self) -> Result<GeneratedArtifact, PublishError> {
        let artifact = self
            .generator
            .generate(&self.settings.artifact)
            .await
            .map_err(PublishError::Generate)?;
        info!(path = %artifact.path.display(), bytes = artifact.bytes, "Artifact regenerated");
        Ok(artifact)
    }

    /// Step 3: commit and push only if the artifact changed
    #[instrument(skip(self), fields(step = %Step::Publish))]
    pub async fn publish(&self) -> Result<PublishOutcome, PublishError> {
        let artifact = &self.settings.artifact;

        let changed = self
            .vcs
            .has_changes(artifact)
            .await
            .map_err(PublishError::Publish)?;
        if !changed {
            // A commit left behind by an earlier failed push is still owed to the remote
            let pending = self
                .vcs
                .unpushed_head(&self.settings.branch)
                .await
                .map_err(PublishError::Publish)?;
            let Some(commit) = pending else {
                info!(path = %artifact.display(), "No changes to artifact; nothing to commit");
                return Ok(PublishOutcome::Unchanged);
            };
            self.vcs
                .push(&self.settings.branch)
                .await
                .map_err(PublishError::Publish)?;
            info!(commit = %commit, branch = %self.settings.branch, "Pending commit published");
            return Ok(PublishOutcome::Committed { commit });
        }

        let commit = self
            .vcs
            .commit(artifact, &self.settings.commit_message, &self.settings.author)
            .await
            .map_err(PublishError::Publish)?;
        self.vcs
            .push(&self.settings.branch)
            .await
            .map_err(PublishError::Publish)?;

        info!(commit = %commit, branch = %self.settings.branch, "Artifact published");
        Ok(PublishOutcome::Committed { commit })
    }

    /// Step 4: announce the shop
    #[instrument(skip(self), fields(step = %Step::Notify))]
    pub async fn announce(&self) -> Result<Delivery, PublishError> {
        self.notifier
            .notify(&self.settings.artifact)
            .await
            .map_err(PublishError::Notify)
    }
}
