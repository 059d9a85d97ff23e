// Shop generator implementations
//
// NativeGenerator draws the shop in-process; CommandGenerator delegates to an
// external program called as `<command...> <secret_key> <catalog>`.

use crate::catalog::load_catalog;
use crate::errors::GenerateError;
use crate::models::{GeneratedArtifact, Shop};
use crate::process::{self, CommandSpec};
use crate::shop::{draw, derive_seed, slot_start};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Source of the `generated_at` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampMode {
    /// Start of the slot; regenerating within a slot is byte-identical
    #[default]
    Slot,
    /// Wall-clock time of the run
    Now,
}

/// Produces the shop artifact
#[async_trait]
pub trait ShopGenerator: Send + Sync {
    /// Generate the artifact at `output`, overwriting any previous content
    async fn generate(&self, output: &Path) -> Result<GeneratedArtifact, GenerateError>;
}

/// In-process generator
#[derive(Debug, Clone)]
pub struct NativeGenerator {
    catalog_path: PathBuf,
    secret_key: Option<String>,
    shop_size: usize,
    slot_minutes: u32,
    timestamp: TimestampMode,
}

impl NativeGenerator {
    pub fn new(catalog_path: impl Into<PathBuf>, secret_key: Option<String>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            secret_key,
            shop_size: 5,
            slot_minutes: 5,
            timestamp: TimestampMode::Slot,
        }
    }

    pub fn with_shop_size(mut self, shop_size: usize) -> Self {
        self.shop_size = shop_size;
        self
    }

    pub fn with_slot_minutes(mut self, slot_minutes: u32) -> Self {
        self.slot_minutes = slot_minutes;
        self
    }

    pub fn with_timestamp(mut self, timestamp: TimestampMode) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the shop for the slot containing `now`
    pub fn build_shop(&self, now: DateTime<Utc>) -> Result<Shop, GenerateError> {
        let secret = self
            .secret_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(GenerateError::MissingSecretKey)?;
        let catalog = load_catalog(&self.catalog_path)?;

        let slot = slot_start(now, self.slot_minutes);
        let mut rng = StdRng::seed_from_u64(derive_seed(secret, slot) as u64);
        let shop = draw(catalog.eggs(), self.shop_size, &mut rng);

        let generated_at = match self.timestamp {
            TimestampMode::Slot => slot,
            TimestampMode::Now => now,
        };
        Ok(Shop { generated_at, shop })
    }

    /// Generate as of `now` and write the artifact
    pub async fn generate_at(
        &self,
        output: &Path,
        now: DateTime<Utc>,
    ) -> Result<GeneratedArtifact, GenerateError> {
        let shop = self.build_shop(now)?;
        let body = serde_json::to_string_pretty(&shop)
            .map_err(|e| GenerateError::Serialization(e.to_string()))?;

        tokio::fs::write(output, body.as_bytes())
            .await
            .map_err(|e| GenerateError::WriteFailed {
                path: output.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(
            generated_at = %shop.generated_at,
            shop = ?shop.shop,
            path = %output.display(),
            "Shop generated"
        );

        Ok(GeneratedArtifact {
            path: output.to_path_buf(),
            bytes: body.len() as u64,
        })
    }
}

#[async_trait]
impl ShopGenerator for NativeGenerator {
    #[instrument(skip(self), fields(catalog = %self.catalog_path.display()))]
    async fn generate(&self, output: &Path) -> Result<GeneratedArtifact, GenerateError> {
        self.generate_at(output, Utc::now()).await
    }
}

/// External generator process
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: Vec<String>,
    secret_key: Option<String>,
    catalog: String,
    working_dir: PathBuf,
}

impl CommandGenerator {
    pub fn new(
        command: Vec<String>,
        secret_key: Option<String>,
        catalog: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command,
            secret_key,
            catalog: catalog.into(),
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl ShopGenerator for CommandGenerator {
    #[instrument(skip(self))]
    async fn generate(&self, output: &Path) -> Result<GeneratedArtifact, GenerateError> {
        let secret = self
            .secret_key
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(GenerateError::MissingSecretKey)?;

        let spec = CommandSpec::from_argv(&self.command)?
            .secret_arg(secret)
            .arg(self.catalog.clone())
            .current_dir(&self.working_dir);

        // The artifact is cleared first so a run that writes nothing cannot
        // pass off the committed file as fresh output
        let previous = take_previous(output).await?;

        match self.run_command(&spec, output).await {
            Ok(bytes) => Ok(GeneratedArtifact {
                path: output.to_path_buf(),
                bytes,
            }),
            Err(e) => {
                restore_previous(output, previous).await;
                Err(e)
            }
        }
    }
}

impl CommandGenerator {
    async fn run_command(&self, spec: &CommandSpec, output: &Path) -> Result<u64, GenerateError> {
        info!(command = %spec.display(), "Running external generator");
        let result = process::run(spec).await?;
        if !result.stdout.trim().is_empty() {
            info!(output = %result.stdout.trim(), "Generator output");
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
            _ => Err(GenerateError::MissingOutput(output.to_path_buf())),
        }
    }
}

/// Read and remove the current artifact, if any
async fn take_previous(output: &Path) -> Result<Option<Vec<u8>>, GenerateError> {
    let write_failed = |e: std::io::Error| GenerateError::WriteFailed {
        path: output.to_path_buf(),
        reason: e.to_string(),
    };
    let previous = match tokio::fs::read(output).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(write_failed(e)),
    };
    tokio::fs::remove_file(output).await.map_err(write_failed)?;
    Ok(Some(previous))
}

/// Put the working tree back the way the failed run found it
async fn restore_previous(output: &Path, previous: Option<Vec<u8>>) {
    let restored = match previous {
        Some(bytes) => tokio::fs::write(output, bytes).await,
        None => match tokio::fs::remove_file(output).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };
    if let Err(e) = restored {
        warn!(path = %output.display(), error = %e, "Failed to restore previous artifact");
    }
}
