// Egg catalog loaded from eggs.csv
//
// Columns: EggName, PullChance, and the optional EmojiID / RoleID used by
// the announcement.

use crate::errors::CatalogError;
use crate::models::Egg;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

/// Name of the row whose emoji is used for eggs without one
pub const UNKNOWN_EGG: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "EggName")]
    name: String,
    #[serde(rename = "PullChance")]
    chance: f64,
    #[serde(rename = "EmojiID", default)]
    emoji_id: Option<String>,
    #[serde(rename = "RoleID", default)]
    role_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ordered egg catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    eggs: Vec<Egg>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, validating weights
    pub fn new(eggs: Vec<Egg>) -> Result<Self, CatalogError> {
        if eggs.is_empty() {
            return Err(CatalogError::Empty);
        }
        for egg in &eggs {
            if !egg.chance.is_finite() || egg.chance < 0.0 {
                return Err(CatalogError::InvalidChance {
                    name: egg.name.clone(),
                    chance: egg.chance,
                });
            }
        }
        let total: f64 = eggs.iter().map(|e| e.chance).sum();
        if !total.is_finite() {
            return Err(CatalogError::TotalWeightOverflow);
        }
        if total <= 0.0 {
            return Err(CatalogError::ZeroTotalWeight);
        }

        // Later rows win on duplicate names, as a dict keyed by name would
        let index = eggs
            .iter()
            .enumerate()
            .map(|(i, egg)| (egg.name.clone(), i))
            .collect();

        Ok(Self { eggs, index })
    }

    /// Parse catalog CSV from an in-memory reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, CatalogError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let mut eggs = Vec::new();
        for (i, result) in reader.deserialize::<CatalogRow>().enumerate() {
            // Row numbers are 1-based and skip the header
            let row = result.map_err(|e| CatalogError::MalformedRow {
                row: i + 2,
                reason: e.to_string(),
            })?;
            eggs.push(Egg {
                name: row.name,
                chance: row.chance,
                emoji_id: non_empty(row.emoji_id),
                role_id: non_empty(row.role_id),
            });
        }

        Self::new(eggs)
    }

    pub fn eggs(&self) -> &[Egg] {
        &self.eggs
    }

    pub fn len(&self) -> usize {
        self.eggs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eggs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Egg> {
        self.index.get(name).map(|&i| &self.eggs[i])
    }

    /// Discord custom emoji markup for an egg, if the catalog has one
    pub fn emoji(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|egg| egg.emoji_id.as_ref())
            .map(|id| format!("<:{}:{}>", name, id))
    }

    /// Emoji for an egg, falling back to the `Unknown` row, then to nothing
    pub fn emoji_or_fallback(&self, name: &str) -> String {
        self.emoji(name)
            .or_else(|| self.emoji(UNKNOWN_EGG))
            .unwrap_or_default()
    }

    pub fn role(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|egg| egg.role_id.as_deref())
    }
}

/// Load the catalog from disk
#[instrument]
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let data = std::fs::read(path).map_err(|e| CatalogError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let catalog = Catalog::from_reader(data.as_slice())?;
    info!(eggs = catalog.len(), "Catalog loaded");
    Ok(catalog)
}
