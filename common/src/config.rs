// Configuration management with layered configuration (defaults, files, env)

use crate::shop::TimestampMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub repository: RepositoryConfig,
    pub generator: GeneratorConfig,
    pub notifier: NotifierConfig,
    pub schedule: ScheduleConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Working tree holding the artifact
    pub path: PathBuf,
    pub remote: String,
    pub branch: String,
    /// Artifact path relative to the working tree
    pub artifact: PathBuf,
    pub commit_message: String,
    pub author_name: String,
    pub author_email: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            artifact: PathBuf::from("shop.json"),
            commit_message: "Update shop.json [CI]".to_string(),
            author_name: "github-actions[bot]".to_string(),
            author_email: "github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

impl RepositoryConfig {
    pub fn artifact_path(&self) -> PathBuf {
        self.path.join(&self.artifact)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Native,
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    /// Catalog path relative to the working tree
    pub catalog: String,
    pub shop_size: usize,
    pub slot_minutes: u32,
    pub timestamp: TimestampMode,
    /// argv for `kind = "command"`; secret key and catalog are appended
    pub command: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Native,
            catalog: "eggs.csv".to_string(),
            shop_size: 5,
            slot_minutes: 5,
            timestamp: TimestampMode::Slot,
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Discord,
    Command,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub api_base_url: String,
    pub timeout_seconds: u64,
    pub headline: String,
    pub reactions: Vec<String>,
    /// argv for `kind = "command"`
    pub command: Vec<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Discord,
            api_base_url: "https://discord.com/api/v10".to_string(),
            timeout_seconds: 30,
            headline: "🥚 **Egg Shop Refresh!**".to_string(),
            reactions: vec!["🥳".to_string(), "😒".to_string()],
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Cron expression with seconds precision
    pub cron: String,
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 */5 * * * *".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_port: None,
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config", None)
    }

    /// Load configuration from a directory plus an optional explicit file
    pub fn load_from_path<P: AsRef<Path>>(
        config_dir: P,
        extra_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false));

        if let Some(file) = extra_file {
            builder = builder.add_source(File::from(file).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("SHOP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("generator.command")
                    .with_list_parse_key("notifier.command")
                    .with_list_parse_key("notifier.reactions")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        // Validate repository config
        if self.repository.remote.is_empty() {
            return Err("Repository remote cannot be empty".to_string());
        }
        if self.repository.branch.is_empty() {
            return Err("Repository branch cannot be empty".to_string());
        }
        if self.repository.artifact.as_os_str().is_empty() {
            return Err("Artifact path cannot be empty".to_string());
        }
        if self.repository.artifact.is_absolute() {
            return Err("Artifact path must be relative to the repository".to_string());
        }
        if self.repository.commit_message.trim().is_empty() {
            return Err("Commit message cannot be empty".to_string());
        }
        if self.repository.author_name.is_empty() || self.repository.author_email.is_empty() {
            return Err("Automation author name and email are required".to_string());
        }

        // Validate generator config
        if self.generator.catalog.is_empty() {
            return Err("Generator catalog cannot be empty".to_string());
        }
        if self.generator.shop_size == 0 {
            return Err("Generator shop_size must be greater than 0".to_string());
        }
        if self.generator.slot_minutes == 0 || 60 % self.generator.slot_minutes != 0 {
            return Err("Generator slot_minutes must divide 60".to_string());
        }
        if self.generator.kind == GeneratorKind::Command && self.generator.command.is_empty() {
            return Err("Generator command required when kind is 'command'".to_string());
        }

        // Validate notifier config
        if self.notifier.kind == NotifierKind::Discord {
            if self.notifier.api_base_url.is_empty() {
                return Err("Notifier api_base_url cannot be empty".to_string());
            }
            if self.notifier.timeout_seconds == 0 {
                return Err("Notifier timeout_seconds must be greater than 0".to_string());
            }
        }
        if self.notifier.kind == NotifierKind::Command && self.notifier.command.is_empty() {
            return Err("Notifier command required when kind is 'command'".to_string());
        }

        // Validate schedule config
        if self.schedule.cron.trim().is_empty() {
            return Err("Schedule cron expression cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.repository.branch, "main");
        assert_eq!(settings.repository.commit_message, "Update shop.json [CI]");
        assert_eq!(settings.generator.catalog, "eggs.csv");
    }

    #[test]
    fn test_artifact_path_joins_repo() {
        let mut settings = Settings::default();
        settings.repository.path = PathBuf::from("/srv/shop");
        assert_eq!(
            settings.repository.artifact_path(),
            PathBuf::from("/srv/shop/shop.json")
        );
    }

    #[test]
    fn test_validation_catches_empty_branch() {
        let mut settings = Settings::default();
        settings.repository.branch = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_absolute_artifact() {
        let mut settings = Settings::default();
        settings.repository.artifact = PathBuf::from("/tmp/shop.json");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_slot() {
        let mut settings = Settings::default();
        settings.generator.slot_minutes = 7;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_command_kind_without_command() {
        let mut settings = Settings::default();
        settings.generator.kind = GeneratorKind::Command;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.notifier.kind = NotifierKind::Command;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_merges_file_over_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[repository]
branch = "trunk"

[generator]
kind = "command"
command = ["python", "generate_shop.py"]

[notifier]
kind = "disabled"
"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(dir.path(), None).unwrap();
        assert_eq!(settings.repository.branch, "trunk");
        assert_eq!(settings.repository.remote, "origin");
        assert_eq!(settings.generator.kind, GeneratorKind::Command);
        assert_eq!(settings.generator.command, vec!["python", "generate_shop.py"]);
        assert_eq!(settings.notifier.kind, NotifierKind::Disabled);
        assert_eq!(settings.generator.shop_size, 5);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Settings::load_from_path(dir.path(), Some(&missing)).is_err());
    }
}
