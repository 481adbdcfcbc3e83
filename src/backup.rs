//! Rotating backups that are written before every save.

use crate::model::Grid;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;

/// Prefix for the JSON snapshot of the stored grid, taken before it is overwritten.
pub const PRE_SAVE: &str = "pre-save";

/// Prefix for copies of the SQLite file.
pub const SQLITE: &str = "bookings.sqlite";

/// Manages backup file creation and rotation.
///
/// Create a new instance via `Config::backup()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
    sqlite_path: Option<PathBuf>,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
            sqlite_path: config.sqlite_path(),
        }
    }

    /// Saves `grid` as a pretty-printed JSON file named `{prefix}.YYYY-MM-DD-NNN.json` and rotates
    /// the older files with the same prefix. Returns the path of the new file.
    pub async fn save_json(&self, prefix: &str, grid: &Grid) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(grid).context("Failed to serialize the grid")?;
        let path = self.next_path(prefix, ".json").await?;
        utils::write(&path, json).await?;
        self.rotate(prefix, ".json").await?;
        Ok(path)
    }

    /// Copies the SQLite file, if the home has one, to `bookings.sqlite.YYYY-MM-DD-NNN`.
    pub async fn copy_sqlite(&self) -> Result<Option<PathBuf>> {
        let Some(sqlite_path) = &self.sqlite_path else {
            return Ok(None);
        };
        let path = self.next_path(SQLITE, "").await?;
        utils::copy(sqlite_path, &path).await?;
        self.rotate(SQLITE, "").await?;
        Ok(Some(path))
    }

    async fn next_path(&self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let names = self.names(prefix, suffix).await?;
        let seq = names
            .iter()
            .filter_map(|name| sequence_number(name, prefix, &date, suffix))
            .max()
            .unwrap_or_default()
            + 1;
        Ok(self
            .backups_dir
            .join(format!("{prefix}.{date}-{seq:03}{suffix}")))
    }

    /// Deletes the oldest files with `prefix` until only `backup_copies` remain.
    async fn rotate(&self, prefix: &str, suffix: &str) -> Result<()> {
        let names = self.names(prefix, suffix).await?;
        let excess = names.len().saturating_sub(self.backup_copies as usize);
        for name in names.into_iter().take(excess) {
            utils::remove(self.backups_dir.join(name)).await?;
        }
        Ok(())
    }

    /// The backup file names with `prefix`, oldest first.
    async fn names(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = utils::list_dir(&self.backups_dir)
            .await?
            .into_iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .filter(|name| is_backup_file(name, prefix, suffix))
            .collect();
        // The date and the zero padded sequence number make names sort by age.
        names.sort();
        Ok(names)
    }
}

fn sequence_number(name: &str, prefix: &str, date: &str, suffix: &str) -> Option<u32> {
    name.strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(suffix)?
        .parse()
        .ok()
}

fn is_backup_file(name: &str, prefix: &str, suffix: &str) -> bool {
    let Some(rest) = name.strip_prefix(&format!("{prefix}.")) else {
        return false;
    };
    if suffix.is_empty() {
        !rest.contains('.')
    } else {
        rest.ends_with(suffix)
    }
}
