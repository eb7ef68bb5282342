use crate::{
    domain::{Board, BoardConfig},
    engine::DEFAULT_COLUMN_TITLE,
    error::{Result, SyncError},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};
use tokio::fs;

/// How the controller hands snapshots to persistence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavePolicy {
    /// Every snapshot is saved by its own task; overlapping saves race and
    /// the last one to reach the store wins
    #[default]
    Detached,
    /// One writer saves the newest snapshot; snapshots issued while a save
    /// is in flight are superseded by the latest one
    Coalescing,
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub save_policy: SavePolicy,
    /// Title given to columns added without one
    pub new_column_title: String,
    /// Board used when the store has nothing to load
    pub default_board: BoardConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            save_policy: SavePolicy::default(),
            new_column_title: DEFAULT_COLUMN_TITLE.to_string(),
            default_board: BoardConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a default board whose seeds repeat a column id
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for seed in &self.default_board.columns {
            if !ids.insert(seed.id.as_str()) {
                return Err(SyncError::Config(format!(
                    "default_board repeats column id {}",
                    seed.id
                )));
            }
        }
        Ok(())
    }

    /// Reads a TOML config file, falling back to defaults if it is missing
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).await?;
        Self::from_toml_str(&contents)
    }

    pub fn default_board(&self) -> Board {
        Board::from_config(&self.default_board)
    }
}
