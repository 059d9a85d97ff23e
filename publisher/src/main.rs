// Publisher binary entry point

use chrono::Utc;
use clap::{Parser, Subcommand};
use common::bootstrap;
use common::catalog::load_catalog;
use common::config::Settings;
use common::errors::{PublishError, EXIT_CONFIG};
use common::schedule::PublishSchedule;
use common::secrets::Secrets;
use common::telemetry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Regenerates shop.json, publishes it, and announces it")]
struct Cli {
    /// Extra configuration file layered over the config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding default.toml and local.toml
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the whole pipeline once (default)
    Run,
    /// Regenerate the artifact only
    Generate,
    /// Announce the current artifact only
    Notify,
    /// Run the pipeline on the configured cron schedule until interrupted
    Schedule,
    /// Validate configuration, catalog, and schedule without side effects
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match bootstrap::load_settings(Some(cli.config_dir.clone()), cli.config.clone())
    {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("publisher: {:#}", e);
            return exit_code(EXIT_CONFIG);
        }
    };

    if let Err(e) = telemetry::init(&settings.observability) {
        eprintln!("publisher: {:#}", e);
        return exit_code(EXIT_CONFIG);
    }

    let secrets = Secrets::from_env();
    info!(secrets = ?secrets, "Configuration loaded");

    let command = cli.command.unwrap_or(Command::Run);
    if command == Command::Check {
        return check(&settings);
    }

    if command == Command::Schedule {
        return schedule(&settings, &secrets).await;
    }

    let publisher = match bootstrap::init_publisher(&settings, &secrets) {
        Ok(publisher) => publisher,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to initialize publisher");
            return exit_code(EXIT_CONFIG);
        }
    };

    let result: Result<(), PublishError> = match command {
        Command::Generate => publisher.regenerate().await.map(|artifact| {
            info!(path = %artifact.path.display(), bytes = artifact.bytes, "Artifact written");
        }),
        Command::Notify => publisher.announce().await.map(|delivery| {
            info!(message_id = ?delivery.message_id, "Announcement delivered");
        }),
        _ => publisher.run().await.map(|report| {
            info!(
                run_id = %report.run_id,
                committed = report.outcome.committed(),
                "Publish run succeeded"
            );
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(step = %e.step(), error = %e, "Publisher failed");
            exit_code(e.exit_code())
        }
    }
}

async fn schedule(settings: &Settings, secrets: &Secrets) -> ExitCode {
    let scheduler = match bootstrap::init_scheduler(settings, secrets) {
        Ok(scheduler) => Arc::new(scheduler),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to initialize scheduler");
            return exit_code(EXIT_CONFIG);
        }
    };

    let scheduler_for_shutdown = scheduler.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal, initiating graceful shutdown"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C; stopping"),
        }
        scheduler_for_shutdown.stop();
    });

    match scheduler.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Scheduler error");
            exit_code(e.exit_code())
        }
    }
}

fn check(settings: &Settings) -> ExitCode {
    let catalog_path = bootstrap::catalog_path(settings);
    let catalog = match load_catalog(&catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(path = %catalog_path.display(), error = %e, "Catalog check failed");
            return exit_code(EXIT_CONFIG);
        }
    };

    let schedule = match PublishSchedule::from_config(&settings.schedule) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(error = %e, "Schedule check failed");
            return exit_code(EXIT_CONFIG);
        }
    };

    info!(
        eggs = catalog.len(),
        artifact = %settings.repository.artifact_path().display(),
        next_run = ?schedule.next_run_after(Utc::now()).ok(),
        "Configuration OK"
    );
    ExitCode::SUCCESS
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(exit_status(code))
}

/// Codes outside 1..=255 collapse to a generic failure
fn exit_status(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(0) | Err(_) => 1,
        Ok(status) => status,
    }
}
