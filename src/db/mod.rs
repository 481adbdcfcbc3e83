//! This module is responsible for reading, writing and managing the SQLite database.

mod migrations;

use crate::model::{
    CellRef, ExpenseRef, ExpenseRow, Floor, Grid, Ledger, LedgerRow, Month, Period, Price,
};
use crate::store::Store;
use crate::Result;
use anyhow::{bail, Context};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub(crate) struct Db {
    path: PathBuf,
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Creates the schema by running every migration
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created the database at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            pool,
        })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Brings the schema up to date if it is older than this program
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let version = migrations::current_version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema is at version {version}, this program only knows up to {}",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self {
            path: path.to_path_buf(),
            pool,
        })
    }

    #[cfg(test)]
    pub(crate) async fn count_bookings(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count bookings")?;
        Ok(u64::try_from(row.0).unwrap_or_default())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to build the SQLite connection string")?
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open the SQLite database at {}", path.display()))
}

#[async_trait]
impl Store for Db {
    async fn load_grid(&self, period: &Period) -> Result<Grid> {
        let mut grid = Grid::new(period.clone());

        let rows: Vec<(String, String, i64, String)> =
            sqlx::query_as("SELECT month, floor, day, entries FROM cells WHERE entries <> ''")
                .fetch_all(&self.pool)
                .await
                .context("Failed to read the cells table")?;
        for (month, floor, day, entries) in rows {
            let Some(cell) = cell_ref(&month, &floor, day) else {
                warn!("Ignoring a stored cell with an unknown coordinate ({month}, {floor}, {day})");
                continue;
            };
            if period.contains(cell.month) {
                grid.set(cell, entries)?;
            }
        }

        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT month, category, entries FROM expense_cells WHERE entries <> ''",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read the expense_cells table")?;
        for (month, category, entries) in rows {
            let (Ok(month), Ok(category)) = (Month::from_str(&month), Floor::from_str(&category))
            else {
                warn!("Ignoring a stored expense cell with an unknown coordinate ({month}, {category})");
                continue;
            };
            if period.contains(month) {
                grid.set_expense(ExpenseRef::new(month, category), entries)?;
            }
        }

        Ok(grid)
    }

    async fn save(&self, grid: &Grid, ledger: &Ledger) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin the save transaction")?;

        for cell in grid.coordinates() {
            sqlx::query(
                "INSERT INTO cells (month, floor, day, entries) VALUES (?, ?, ?, ?) \
                 ON CONFLICT (month, floor, day) DO UPDATE SET entries = excluded.entries",
            )
            .bind(cell.month.to_string())
            .bind(cell.floor.to_string())
            .bind(i64::from(cell.day))
            .bind(grid.get(&cell))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write the cell {cell}"))?;
        }

        for cell in grid.expense_coordinates() {
            sqlx::query(
                "INSERT INTO expense_cells (month, category, entries) VALUES (?, ?, ?) \
                 ON CONFLICT (month, category) DO UPDATE SET entries = excluded.entries",
            )
            .bind(cell.month.to_string())
            .bind(cell.category.to_string())
            .bind(grid.expense(&cell))
            .execute(&mut *tx)
            .await
            .context("Failed to write an expense cell")?;
        }

        sqlx::query("DELETE FROM bookings")
            .execute(&mut *tx)
            .await
            .context("Failed to clear the bookings table")?;
        for row in &ledger.bookings {
            sqlx::query(
                "INSERT INTO bookings (year, floor, month, day, price) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(row.year)
            .bind(row.floor.to_string())
            .bind(row.month.to_string())
            .bind(i64::from(row.day))
            .bind(row.price.to_f64())
            .execute(&mut *tx)
            .await
            .context("Failed to insert a booking")?;
        }

        sqlx::query("DELETE FROM expenses")
            .execute(&mut *tx)
            .await
            .context("Failed to clear the expenses table")?;
        for row in &ledger.expenses {
            sqlx::query("INSERT INTO expenses (year, category, month, price) VALUES (?, ?, ?, ?)")
                .bind(row.year)
                .bind(row.category.to_string())
                .bind(row.month.to_string())
                .bind(row.price.to_f64())
                .execute(&mut *tx)
                .await
                .context("Failed to insert an expense")?;
        }

        tx.commit()
            .await
            .context("Failed to commit the save transaction")?;
        debug!(
            "Saved the grid with {} bookings and {} expenses to {}",
            ledger.bookings.len(),
            ledger.expenses.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn load_ledger(&self) -> Result<Ledger> {
        let rows: Vec<(i32, String, String, i64, Option<f64>)> =
            sqlx::query_as("SELECT year, floor, month, day, price FROM bookings ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to read the bookings table")?;
        let bookings = rows
            .into_iter()
            .filter_map(|(year, floor, month, day, price)| {
                Some(LedgerRow {
                    year,
                    floor: Floor::from_str(&floor).ok()?,
                    month: Month::from_str(&month).ok()?,
                    day: u8::try_from(day).ok()?,
                    price: price.and_then(Price::from_f64)?,
                })
            })
            .collect();

        let rows: Vec<(i32, String, String, f64)> =
            sqlx::query_as("SELECT year, category, month, price FROM expenses ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to read the expenses table")?;
        let expenses = rows
            .into_iter()
            .filter_map(|(year, category, month, price)| {
                Some(ExpenseRow {
                    year,
                    category: Floor::from_str(&category).ok()?,
                    month: Month::from_str(&month).ok()?,
                    price: Price::from_f64(price)?,
                })
            })
            .collect();

        Ok(Ledger::new(bookings, expenses))
    }
}

fn cell_ref(month: &str, floor: &str, day: i64) -> Option<CellRef> {
    let month = Month::from_str(month).ok()?;
    let floor = Floor::from_str(floor).ok()?;
    let day = u8::try_from(day).ok()?;
    CellRef::new(month, floor, day).ok()
}
