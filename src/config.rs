//! Configuration file handling.
//!
//! The configuration file is stored at `$BOOKINGS_HOME/config.json`. It names the storage backend,
//! the months of the season and how many backups to keep.

use crate::backup::Backup;
use crate::db::Db;
use crate::model::Period;
use crate::sheets::Sheets;
use crate::store::{Backend, Store};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const APP_NAME: &str = "bookings";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const BOOKINGS_SQLITE: &str = "bookings.sqlite";
const SHEETS: &str = "sheets";

/// The `Config` object represents a bookings home directory: its `config.json`, its backups
/// directory and the store the grid is kept in. Every command other than `init` starts by calling
/// `Config::load`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    store: Arc<dyn Store>,
}

impl Config {
    /// Creates the home directory and its `.backups` subdirectory, writes an initial `config.json`
    /// and creates an empty store of the chosen `backend`.
    ///
    /// # Errors
    /// - Returns an error if a store already exists in `dir` or if any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, backend: Backend, period: Period) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the bookings home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A bookings home already exists at '{}'",
                root.display()
            );
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backend,
            months: period,
            backup_copies: BACKUP_COPIES,
        };

        let store: Arc<dyn Store> = match backend {
            Backend::Sqlite => Arc::new(
                Db::init(root.join(BOOKINGS_SQLITE))
                    .await
                    .context("Unable to create the SQLite database")?,
            ),
            Backend::Sheets => Arc::new(
                Sheets::init(root.join(SHEETS))
                    .await
                    .context("Unable to create the sheets directory")?,
            ),
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            store,
        })
    }

    /// Validates the home directory layout, loads `config.json` and opens the configured store.
    pub async fn load(bookings_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = bookings_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The bookings home is missing, run 'bookings init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let backups = root.join(BACKUPS);
        if !backups.is_dir() {
            bail!("The backups directory is missing '{}'", backups.display())
        }

        let store: Arc<dyn Store> = match config_file.backend {
            Backend::Sqlite => Arc::new(
                Db::load(root.join(BOOKINGS_SQLITE))
                    .await
                    .context("Unable to load the SQLite database")?,
            ),
            Backend::Sheets => Arc::new(Sheets::load(root.join(SHEETS)).await?),
        };

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            store,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn backend(&self) -> Backend {
        self.config_file.backend
    }

    /// The months of the season, in order.
    pub fn period(&self) -> &Period {
        &self.config_file.months
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// The SQLite file, when the home uses the SQLite backend.
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        match self.backend() {
            Backend::Sqlite => Some(self.root.join(BOOKINGS_SQLITE)),
            Backend::Sheets => None,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "bookings",
///   "config_version": 1,
///   "backend": "sqlite",
///   "months": ["APRIL", "MAY", "JUNE", "JULY", "AUGUST", "SEPTEMBER", "OCTOBER"],
///   "backup_copies": 5
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "bookings"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Where the grid is stored
    #[serde(default)]
    backend: Backend,

    /// The months of the season, in order
    #[serde(default)]
    months: Period,

    /// Number of backup copies to keep
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backend: Backend::default(),
            months: Period::default(),
            backup_copies: BACKUP_COPIES,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path.as_ref()).await?;
        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.config_version <= CONFIG_VERSION,
            "The config file version {} is newer than this program supports",
            config.config_version
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}
