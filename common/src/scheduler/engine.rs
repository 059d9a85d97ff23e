// Scheduler engine: fires the publish pipeline on a cron schedule
//
// Runs never overlap. A run in progress when shutdown is requested finishes
// before the loop exits.

use crate::errors::PublishError;
use crate::models::RunReport;
use crate::pipeline::Publisher;
use crate::schedule::PublishSchedule;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

/// Unit of work triggered on each fire
#[async_trait]
pub trait PublishJob: Send + Sync {
    async fn run_once(&self) -> Result<RunReport, PublishError>;
}

#[async_trait]
impl PublishJob for Publisher {
    async fn run_once(&self) -> Result<RunReport, PublishError> {
        self.run().await
    }
}

pub struct PublishScheduler {
    schedule: PublishSchedule,
    job: Arc<dyn PublishJob>,
    shutdown_tx: broadcast::Sender<()>,
    runs: AtomicU64,
    failures: AtomicU64,
}

impl PublishScheduler {
    pub fn new(schedule: PublishSchedule, job: Arc<dyn PublishJob>) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        Self {
            schedule,
            job,
            shutdown_tx,
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Runs attempted so far
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Loop until `stop` is called
    ///
    /// A failed run is logged and counted; the next fire still happens.
    #[instrument(skip(self), fields(cron = %self.schedule.expression()))]
    pub async fn start(&self) -> Result<(), PublishError> {
        info!(timezone = %self.schedule.timezone(), "Starting publish scheduler");
        let mut shutdown_rx = self.shutdown_receiver();

        loop {
            let now = Utc::now();
            let next = match self.schedule.next_run_after(now) {
                Ok(next) => next,
                Err(e) => {
                    error!(error = %e, "No further fire times; stopping scheduler");
                    break;
                }
            };
            let wait = (next - now).to_std().unwrap_or_default();
            debug!(next_run = %next, wait_ms = wait.as_millis() as u64, "Waiting for next run");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }

            self.runs.fetch_add(1, Ordering::Relaxed);
            match self.job.run_once().await {
                Ok(report) => {
                    info!(
                        run_id = %report.run_id,
                        committed = report.outcome.committed(),
                        "Scheduled run succeeded"
                    );
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    error!(step = %e.step(), error = %e, "Scheduled run failed");
                }
            }
        }

        info!(runs = self.runs(), failures = self.failures(), "Publish scheduler stopped");
        Ok(())
    }

    /// Ask the loop to exit after the current run
    pub fn stop(&self) {
        info!("Stopping publish scheduler");
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GenerateError;
    use crate::models::{GeneratedArtifact, PublishOutcome};
    use std::path::PathBuf;
    use std::time::Duration;
    use uuid::Uuid;

    struct FlakyJob {
        calls: AtomicU64,
    }

    #[async_trait]
    impl PublishJob for FlakyJob {
        async fn run_once(&self) -> Result<RunReport, PublishError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                return Err(PublishError::Generate(GenerateError::MissingSecretKey));
            }
            Ok(RunReport {
                run_id: Uuid::new_v4(),
                artifact: GeneratedArtifact {
                    path: PathBuf::from("shop.json"),
                    bytes: 1,
                },
                outcome: PublishOutcome::Unchanged,
                notified: true,
                duration: Duration::from_millis(1),
            })
        }
    }

    #[tokio::test]
    async fn test_stop_before_first_fire() {
        let schedule = PublishSchedule::new("0 0 0 1 1 *", "UTC").unwrap();
        let job = Arc::new(FlakyJob {
            calls: AtomicU64::new(0),
        });
        let scheduler = Arc::new(PublishScheduler::new(schedule, job.clone()));

        let handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.start().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(job.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_runs_do_not_stop_the_loop() {
        let schedule = PublishSchedule::new("* * * * * *", "UTC").unwrap();
        let job = Arc::new(FlakyJob {
            calls: AtomicU64::new(0),
        });
        let scheduler = Arc::new(PublishScheduler::new(schedule, job.clone()));

        let handle = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.start().await })
        };
        tokio::time::sleep(Duration::from_millis(2600)).await;
        scheduler.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap()
            .unwrap();

        assert!(scheduler.runs() >= 2);
        assert!(scheduler.failures() >= 1);
        assert!(scheduler.failures() < scheduler.runs());
    }
}
