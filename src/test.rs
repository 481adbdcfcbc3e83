//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::Period;
use crate::store::Backend;
use crate::{utils, Config};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test environment that sets up a bookings home directory with a Config and an empty store.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment backed by SQLite.
    pub async fn new() -> Self {
        Self::with_backend(Backend::Sqlite).await
    }

    pub async fn with_backend(backend: Backend) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("bookings");
        let config = Config::create(&root, backend, Period::default())
            .await
            .unwrap();
        Self { temp_dir, config }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A path for scratch files, outside of the bookings home.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// The names of the files in the backups directory.
    pub async fn backup_names(&self) -> Vec<String> {
        utils::list_dir(self.config.backups())
            .await
            .unwrap()
            .into_iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect()
    }
}
