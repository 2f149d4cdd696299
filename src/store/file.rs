use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use super::StateStore;
use crate::constant::STATE_SCHEMA_VERSION;
use crate::state::PersistedState;

/// On-disk layout of the state file. `posted_links` is listed oldest first.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    last_check_time: BTreeMap<String, DateTime<Utc>>,
    posted_links: Vec<String>,
    daily_post_count: u32,
    last_post_day: NaiveDate,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl From<&PersistedState> for StateFile {
    fn from(state: &PersistedState) -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            last_check_time: state
                .last_check_time
                .iter()
                .map(|(name, at)| (name.clone(), *at))
                .collect(),
            posted_links: state.posted_links.iter().map(String::from).collect(),
            daily_post_count: state.daily_post_count,
            last_post_day: state.last_post_day,
        }
    }
}

impl From<StateFile> for PersistedState {
    fn from(file: StateFile) -> Self {
        Self {
            last_check_time: file.last_check_time.into_iter().collect(),
            posted_links: file.posted_links.into_iter().collect(),
            daily_post_count: file.daily_post_count,
            last_post_day: file.last_post_day,
        }
    }
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn decode(content: &str) -> Result<PersistedState> {
        let probe: VersionProbe =
            serde_json::from_str(content).context("State file has no schema version")?;
        if probe.version != STATE_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported state schema version {} (expected {})",
                probe.version,
                STATE_SCHEMA_VERSION
            );
        }

        let file: StateFile = serde_json::from_str(content)?;
        Ok(file.into())
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, today: NaiveDate) -> Result<PersistedState> {
        if !self.path.exists() {
            tracing::info!(
                "No state file at {}, starting fresh",
                self.path.display()
            );
            return Ok(PersistedState::new(today));
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {}", self.path.display()))?;
        let state = Self::decode(&content)
            .with_context(|| format!("Invalid state file {}", self.path.display()))?;
        tracing::info!(
            "Loaded state: {} feeds tracked, {} posted links, {} posts on {}",
            state.last_check_time.len(),
            state.posted_links.len(),
            state.daily_post_count,
            state.last_post_day
        );

        Ok(state)
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory {}", dir.display()))?;

        let content = serde_json::to_string_pretty(&StateFile::from(state))?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write state file {}", self.path.display()))?;

        tracing::info!("State saved to {}", self.path.display());
        Ok(())
    }
}
