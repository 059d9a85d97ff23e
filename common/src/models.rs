use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Catalog Models
// ============================================================================

/// One row of the egg catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Egg {
    pub name: String,
    pub chance: f64,
    pub emoji_id: Option<String>,
    pub role_id: Option<String>,
}

impl Egg {
    pub fn new(name: impl Into<String>, chance: f64) -> Self {
        Self {
            name: name.into(),
            chance,
            emoji_id: None,
            role_id: None,
        }
    }

    pub fn with_emoji(mut self, emoji_id: impl Into<String>) -> Self {
        self.emoji_id = Some(emoji_id.into());
        self
    }

    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }
}

// ============================================================================
// Shop Models
// ============================================================================

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

/// The shop document written to `shop.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shop {
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    pub shop: Vec<String>,
}

/// Lenient view of `shop.json` used by readers; accepts the legacy
/// `current_shop` key and tolerates a missing or unparsable timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopDocument {
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "current_shop")]
    pub shop: Vec<String>,
}

/// Result of a generator run
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

// ============================================================================
// Run Models
// ============================================================================

/// Outcome of the conditional publish step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was created and pushed
    Committed { commit: String },
    /// The artifact matched the committed version
    Unchanged,
}

impl PublishOutcome {
    pub fn committed(&self) -> bool {
        matches!(self, PublishOutcome::Committed { .. })
    }
}

/// Author identity for automation commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Summary of one publisher invocation
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub artifact: GeneratedArtifact,
    pub outcome: PublishOutcome,
    pub notified: bool,
    pub duration: Duration,
}
