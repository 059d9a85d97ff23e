// Bootstrap utilities for binary initialization
// Builds the publish pipeline's collaborators from Settings and Secrets.

use crate::config::{GeneratorKind, NotifierKind, Settings};
use crate::models::CommitAuthor;
use crate::notifier::{CommandNotifier, DisabledNotifier, DiscordNotifier, Notifier};
use crate::pipeline::{PublishSettings, Publisher};
use crate::schedule::PublishSchedule;
use crate::scheduler::PublishScheduler;
use crate::secrets::Secrets;
use crate::shop::{CommandGenerator, NativeGenerator, ShopGenerator};
use crate::vcs::{GitCli, VersionControl};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Load and validate settings
///
/// # Errors
/// Returns error if a configuration source cannot be read or a value is invalid
pub fn load_settings(config_dir: Option<PathBuf>, config_file: Option<PathBuf>) -> Result<Settings> {
    let config_dir = config_dir.unwrap_or_else(|| PathBuf::from("config"));
    let settings = Settings::load_from_path(&config_dir, config_file.as_deref())
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(settings)
}

pub fn catalog_path(settings: &Settings) -> PathBuf {
    settings.repository.path.join(&settings.generator.catalog)
}

pub fn init_generator(settings: &Settings, secrets: &Secrets) -> Arc<dyn ShopGenerator> {
    let config = &settings.generator;
    match config.kind {
        GeneratorKind::Native => Arc::new(
            NativeGenerator::new(catalog_path(settings), secrets.secret_key.clone())
                .with_shop_size(config.shop_size)
                .with_slot_minutes(config.slot_minutes)
                .with_timestamp(config.timestamp),
        ),
        GeneratorKind::Command => Arc::new(CommandGenerator::new(
            config.command.clone(),
            secrets.secret_key.clone(),
            config.catalog.clone(),
            settings.repository.path.clone(),
        )),
    }
}

/// # Errors
/// Returns error if the HTTP client cannot be built
pub fn init_notifier(settings: &Settings, secrets: &Secrets) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match settings.notifier.kind {
        NotifierKind::Discord => Arc::new(
            DiscordNotifier::new(
                &settings.notifier,
                catalog_path(settings),
                secrets.discord.clone(),
            )
            .context("Failed to initialize Discord notifier")?,
        ),
        NotifierKind::Command => {
            let redactions = [&secrets.discord.bot_token, &secrets.repo_token]
                .into_iter()
                .flatten()
                .cloned();
            Arc::new(
                CommandNotifier::new(
                    settings.notifier.command.clone(),
                    settings.repository.path.clone(),
                )
                .with_redactions(redactions),
            )
        }
        NotifierKind::Disabled => Arc::new(DisabledNotifier),
    };
    info!(kind = ?settings.notifier.kind, "Notifier initialized");
    Ok(notifier)
}

pub fn init_vcs(settings: &Settings) -> Arc<dyn VersionControl> {
    Arc::new(GitCli::new(
        settings.repository.path.clone(),
        settings.repository.remote.clone(),
    ))
}

pub fn publish_settings(settings: &Settings, secrets: &Secrets) -> PublishSettings {
    let repo = &settings.repository;
    PublishSettings {
        artifact: repo.artifact_path(),
        branch: repo.branch.clone(),
        commit_message: repo.commit_message.clone(),
        author: CommitAuthor {
            name: repo.author_name.clone(),
            email: repo.author_email.clone(),
        },
        access_token: secrets.repo_token.clone(),
    }
}

/// Wire the full pipeline
///
/// # Errors
/// Returns error if a collaborator cannot be initialized
#[tracing::instrument(skip(settings, secrets))]
pub fn init_publisher(settings: &Settings, secrets: &Secrets) -> Result<Publisher> {
    let publisher = Publisher::new(
        init_vcs(settings),
        init_generator(settings, secrets),
        init_notifier(settings, secrets)?,
        publish_settings(settings, secrets),
    );
    info!(
        repository = %settings.repository.path.display(),
        artifact = %settings.repository.artifact.display(),
        branch = %settings.repository.branch,
        generator = ?settings.generator.kind,
        "Publisher initialized"
    );
    Ok(publisher)
}

/// # Errors
/// Returns error if the schedule or the pipeline cannot be built
pub fn init_scheduler(settings: &Settings, secrets: &Secrets) -> Result<PublishScheduler> {
    let schedule = PublishSchedule::from_config(&settings.schedule)
        .context("Invalid publish schedule")?;
    let publisher = init_publisher(settings, secrets)?;
    Ok(PublishScheduler::new(schedule, Arc::new(publisher)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_settings_use_repository_config() {
        let mut settings = Settings::default();
        settings.repository.path = PathBuf::from("/srv/shop");
        let secrets = Secrets::from_vars([("REPO_ACCESS_TOKEN", "tok")]);

        let publish = publish_settings(&settings, &secrets);
        assert_eq!(publish.artifact, PathBuf::from("/srv/shop/shop.json"));
        assert_eq!(publish.branch, "main");
        assert_eq!(publish.author.name, "github-actions[bot]");
        assert_eq!(publish.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_catalog_path_is_inside_repository() {
        let mut settings = Settings::default();
        settings.repository.path = PathBuf::from("/srv/shop");
        assert_eq!(catalog_path(&settings), PathBuf::from("/srv/shop/eggs.csv"));
    }

    #[test]
    fn test_init_publisher_for_each_notifier_kind() {
        let secrets = Secrets::default();
        for kind in [NotifierKind::Discord, NotifierKind::Disabled] {
            let mut settings = Settings::default();
            settings.notifier.kind = kind;
            assert!(init_publisher(&settings, &secrets).is_ok());
        }

        let mut settings = Settings::default();
        settings.notifier.kind = NotifierKind::Command;
        settings.notifier.command = vec!["true".to_string()];
        assert!(init_publisher(&settings, &secrets).is_ok());
    }

    #[test]
    fn test_init_scheduler_rejects_bad_cron() {
        let mut settings = Settings::default();
        settings.schedule.cron = "not a cron".to_string();
        assert!(init_scheduler(&settings, &Secrets::default()).is_err());
    }

    #[test]
    fn test_load_settings_without_files_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = load_settings(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(settings.repository.artifact, PathBuf::from("shop.json"));
    }
}
