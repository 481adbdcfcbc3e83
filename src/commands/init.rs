use crate::commands::Out;
use crate::model::{Month, Period};
use crate::store::Backend;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its `.backups` subdirectory, an initial `config.json` and an empty
/// store.
///
/// # Arguments
/// - `bookings_home` - The directory that will be the root of data directory, e.g. `$HOME/bookings`
/// - `backend` - Whether the grid is kept in a SQLite file or in CSV sheets.
/// - `months` - The months of the season. When empty, April through October is used.
///
/// # Errors
/// - Returns an error if the directory already holds a bookings home or a file operation fails.
pub async fn init(bookings_home: &Path, backend: Backend, months: &[Month]) -> Result<Out<()>> {
    let period = if months.is_empty() {
        Period::default()
    } else {
        Period::new(months.iter().copied())?
    };
    let config = Config::create(bookings_home, backend, period)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Created a {} bookings home at {}",
        config.backend(),
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_default_months() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        init(&home, Backend::Sqlite, &[]).await.unwrap();
        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.period(), &Period::default());
    }

    #[tokio::test]
    async fn test_init_rejects_duplicate_months() {
        let dir = TempDir::new().unwrap();
        let out = init(dir.path(), Backend::Sheets, &[Month::May, Month::May]).await;
        assert!(out.is_err());
    }
}
