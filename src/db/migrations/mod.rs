//! Versioned schema migrations for the bookings database.
//!
//! Each migration lives next to this file as a pair of SQL scripts:
//! - `migration_NN_up.sql` takes the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` takes it from `NN` back to `NN-1`
//!
//! The version the database is at is held in the single row of `schema_version`.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

/// The schema version this build of the program reads and writes.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// Creates `schema_version` in an empty database and records version 0.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create the schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(pool)
        .await
        .context("Failed to record the initial schema version")?;
    Ok(())
}

/// Reads the schema version the database is currently at.
pub(crate) async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read the schema version, is this a bookings database?")?;
    row.0.context("The schema_version table is empty")
}

/// Moves the schema from version `from` to version `to`, up or down, one migration at a time.
/// Every step runs in its own transaction together with its `schema_version` update. All of the
/// steps are checked to exist before the first one runs.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Result<()> {
    if from == to {
        debug!("Schema is at version {to}, nothing to migrate");
        return Ok(());
    }
    validate_migrations(from, to)?;

    if from < to {
        for version in (from + 1)..=to {
            let migration = find(version)?;
            debug!("Migrating schema up to version {version:02}");
            run_single_migration(pool, migration.up_sql, version).await?;
        }
    } else {
        for version in ((to + 1)..=from).rev() {
            let migration = find(version)?;
            debug!("Migrating schema down from version {version:02}");
            run_single_migration(pool, migration.down_sql, version - 1).await?;
        }
    }

    debug!("Schema is now at version {to}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn run_single_migration(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin the migration transaction")?;

    tx.execute(sql)
        .await
        .with_context(|| format!("Failed to run the SQL for schema version {new_version}"))?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit the migration transaction")?;
    Ok(())
}

fn validate_migrations(from: i32, to: i32) -> Result<()> {
    let (start, end) = if from < to {
        (from + 1, to)
    } else {
        (to + 1, from)
    };
    for version in start..=end {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is needed to go from schema version {from} to {to} but it does not exist");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn empty_db() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        (dir, pool)
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        row.0 > 0
    }

    #[tokio::test]
    async fn test_migrate_up_and_down() {
        let (_dir, pool) = empty_db().await;
        assert_eq!(current_version(&pool).await.unwrap(), 0);

        run(&pool, 0, CURRENT_VERSION).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);
        for table in ["cells", "expense_cells", "bookings", "expenses"] {
            assert!(table_exists(&pool, table).await, "{table} is missing");
        }

        run(&pool, CURRENT_VERSION, 0).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 0);
        for table in ["cells", "expense_cells", "bookings", "expenses"] {
            assert!(!table_exists(&pool, table).await, "{table} was not dropped");
        }
    }

    #[tokio::test]
    async fn test_migrate_to_same_version() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_validate_migrations() {
        assert!(validate_migrations(0, 1).is_ok());
        assert!(validate_migrations(1, 0).is_ok());
        assert!(validate_migrations(0, 2).is_err());
        assert!(validate_migrations(3, 1).is_err());
    }
}
