//! Service settings persisted as a JSON file next to the data.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    /// Location of the SQLite database file.
    pub database_path: PathBuf,
    /// Default page size for paginated list calls.
    pub page_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("worklog.sqlite3"),
            page_size: 50,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<StoreSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            StoreSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn store(&self) -> StoreSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: StoreSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    /// Open the database this settings file points at.
    pub fn open_database(&self) -> Result<Database> {
        Database::new(self.store().database_path)
    }

    fn persist(&self, data: &StoreSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
