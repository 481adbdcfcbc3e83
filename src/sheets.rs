//! A `Store` that keeps the grid as a directory of CSV sheets, one per (year, month).
//!
//! ```text
//! sheets/
//!   bookings.csv           the booking ledger
//!   expenses_ledger.csv    the expense ledger
//!   2024/
//!     APRIL.csv            Ημέρα, Απρίλιος Ισόγειο, Απρίλιος Α, Απρίλιος Β
//!     MAY.csv
//!     expenses.csv         Μήνας, Ισόγειο, Α, Β, Γενικά
//! ```
//!
//! A sheet only holds the tokens of its own year. Loading merges the sheets of every year back
//! into a single grid. Hand edited sheets may hold bare prices, these are filed under the sheet's
//! year and month.

use crate::codec::{decode_cell, encode_cell, Kind, Token};
use crate::import::{parse_day, Table, DAY_HEADERS};
use crate::model::{
    column_name, fold, CellRef, ExpenseRef, ExpenseRow, Floor, Grid, Ledger, LedgerRow, Month,
    Period, DAYS,
};
use crate::reconcile::{merge_tokens, parse_input, EntryContext};
use crate::store::Store;
use crate::{utils, Result};
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BOOKINGS_CSV: &str = "bookings.csv";
const EXPENSES_LEDGER_CSV: &str = "expenses_ledger.csv";
const EXPENSES_CSV: &str = "expenses.csv";
const DAY_HEADER: &str = "Ημέρα";
const MONTH_HEADER: &str = "Μήνας";

#[derive(Debug, Clone)]
pub(crate) struct Sheets {
    root: PathBuf,
}

impl Sheets {
    /// Creates the sheets directory. It must not already exist.
    pub(crate) async fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            bail!("The sheets directory already exists '{}'", root.display());
        }
        utils::make_dir(&root).await?;
        Ok(Self { root })
    }

    pub(crate) async fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("The sheets directory is missing '{}'", root.display());
        }
        Ok(Self { root })
    }

    fn year_dir(&self, year: i32) -> PathBuf {
        self.root.join(year.to_string())
    }

    fn month_path(&self, year: i32, month: Month) -> PathBuf {
        self.year_dir(year).join(format!("{month}.csv"))
    }

    /// The years that have a directory of sheets, ascending.
    async fn years(&self) -> Result<Vec<(i32, PathBuf)>> {
        let mut out = Vec::new();
        for path in utils::list_dir(&self.root).await? {
            let year = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<i32>().ok());
            match year {
                Some(year) if path.is_dir() => out.push((year, path)),
                _ => {}
            }
        }
        out.sort();
        Ok(out)
    }

    async fn read_table(path: &Path) -> Result<Table> {
        let content = utils::read(path).await?;
        Table::from_reader(content.as_bytes())
            .with_context(|| format!("Unable to parse the sheet {}", path.display()))
    }

    /// Writes every sheet in `files` and removes the sheets of the period that are no longer
    /// needed. Sheets of months outside the period are never touched.
    async fn write_sheets(&self, files: BTreeMap<PathBuf, String>, period: &Period) -> Result<()> {
        let keep: BTreeSet<&PathBuf> = files.keys().collect();
        for (_, dir) in self.years().await? {
            for path in utils::list_dir(&dir).await? {
                if path.is_file() && is_period_sheet(&path, period) && !keep.contains(&path) {
                    debug!("Removing the stale sheet {}", path.display());
                    utils::remove(&path).await?;
                }
            }
            if utils::list_dir(&dir).await?.is_empty() && !keep.iter().any(|p| p.starts_with(&dir))
            {
                utils::remove_dir(&dir).await?;
            }
        }
        for (path, content) in &files {
            if let Some(parent) = path.parent() {
                utils::make_dir(parent).await?;
            }
            utils::write(path, content).await?;
        }
        Ok(())
    }

    /// The rows of each year's expense sheet that belong to months outside `period`.
    async fn expense_rows_outside(&self, period: &Period) -> Result<BTreeMap<i32, Vec<Vec<String>>>> {
        let mut out = BTreeMap::new();
        for (year, dir) in self.years().await? {
            let path = dir.join(EXPENSES_CSV);
            if !path.is_file() {
                continue;
            }
            let rows = rows_outside_period(&Self::read_table(&path).await?, period);
            if !rows.is_empty() {
                out.insert(year, rows);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Store for Sheets {
    async fn load_grid(&self, period: &Period) -> Result<Grid> {
        let mut grid = Grid::new(period.clone());
        for (year, dir) in self.years().await? {
            for &month in period.months() {
                let path = self.month_path(year, month);
                if path.is_file() {
                    let table = Self::read_table(&path).await?;
                    read_month_sheet(&mut grid, &table, year, month)?;
                }
            }
            let path = dir.join(EXPENSES_CSV);
            if path.is_file() {
                let table = Self::read_table(&path).await?;
                read_expense_sheet(&mut grid, &table, year)?;
            }
        }
        Ok(grid)
    }

    async fn save(&self, grid: &Grid, ledger: &Ledger) -> Result<()> {
        let mut by_sheet: BTreeMap<(i32, Month), BTreeMap<CellRef, Vec<Token>>> = BTreeMap::new();
        for (cell, text) in grid.cells() {
            for token in decode_cell(text) {
                by_sheet
                    .entry((token.year, cell.month))
                    .or_default()
                    .entry(*cell)
                    .or_default()
                    .push(token);
            }
        }
        let mut by_year: BTreeMap<i32, BTreeMap<ExpenseRef, Vec<Token>>> = BTreeMap::new();
        for (cell, text) in grid.expense_cells() {
            for token in decode_cell(text) {
                by_year
                    .entry(token.year)
                    .or_default()
                    .entry(*cell)
                    .or_default()
                    .push(token);
            }
        }

        let mut files = BTreeMap::new();
        for ((year, month), cells) in &by_sheet {
            files.insert(self.month_path(*year, *month), month_sheet(*month, cells)?);
        }
        let outside = self.expense_rows_outside(grid.period()).await?;
        let years: BTreeSet<i32> = by_year.keys().chain(outside.keys()).copied().collect();
        let no_cells = BTreeMap::new();
        for year in years {
            let sheet = expense_sheet(
                grid.period(),
                by_year.get(&year).unwrap_or(&no_cells),
                outside.get(&year).map(Vec::as_slice).unwrap_or_default(),
            )?;
            files.insert(self.year_dir(year).join(EXPENSES_CSV), sheet);
        }
        files.insert(self.root.join(BOOKINGS_CSV), to_csv(&ledger.bookings)?);
        files.insert(
            self.root.join(EXPENSES_LEDGER_CSV),
            to_csv(&ledger.expenses)?,
        );

        debug!("Writing {} sheets to {}", files.len(), self.root.display());
        self.write_sheets(files, grid.period()).await
    }

    async fn load_ledger(&self) -> Result<Ledger> {
        let bookings: Vec<LedgerRow> = from_csv(&self.root.join(BOOKINGS_CSV)).await?;
        let expenses: Vec<ExpenseRow> = from_csv(&self.root.join(EXPENSES_LEDGER_CSV)).await?;
        Ok(Ledger::new(bookings, expenses))
    }
}

fn month_sheet(month: Month, cells: &BTreeMap<CellRef, Vec<Token>>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![DAY_HEADER.to_string()];
    header.extend(Floor::BOOKABLE.map(|floor| column_name(month, floor)));
    writer
        .write_record(&header)
        .context("Unable to write the sheet header")?;
    for day in DAYS {
        let mut record = vec![day.to_string()];
        for floor in Floor::BOOKABLE {
            let cell = CellRef { month, floor, day };
            record.push(cells.get(&cell).map(|t| encode_cell(t)).unwrap_or_default());
        }
        writer
            .write_record(&record)
            .context("Unable to write a sheet row")?;
    }
    finish(writer)
}

fn expense_sheet(
    period: &Period,
    cells: &BTreeMap<ExpenseRef, Vec<Token>>,
    outside: &[Vec<String>],
) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![MONTH_HEADER.to_string()];
    header.extend(Floor::ALL.map(|floor| floor.display_name().to_string()));
    writer
        .write_record(&header)
        .context("Unable to write the expense sheet header")?;
    for &month in period.months() {
        let mut record = vec![month.display_name().to_string()];
        for category in Floor::ALL {
            let cell = ExpenseRef::new(month, category);
            record.push(cells.get(&cell).map(|t| encode_cell(t)).unwrap_or_default());
        }
        writer
            .write_record(&record)
            .context("Unable to write an expense sheet row")?;
    }
    for record in outside {
        writer
            .write_record(record)
            .context("Unable to write an expense sheet row")?;
    }
    finish(writer)
}

/// Month sheets of the period and the expense sheet are rewritten by every save.
fn is_period_sheet(path: &Path, period: &Period) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name == EXPENSES_CSV
        || period
            .months()
            .iter()
            .any(|month| name == format!("{month}.csv"))
}

/// The non-blank rows of an expense sheet whose month is not one of the period, in the column
/// order of `expense_sheet`.
fn rows_outside_period(table: &Table, period: &Period) -> Vec<Vec<String>> {
    let Some(month_column) = table.column(&fold(MONTH_HEADER)) else {
        return Vec::new();
    };
    let columns: Vec<Option<usize>> = Floor::ALL
        .iter()
        .map(|floor| table.column(&fold(floor.display_name())))
        .collect();
    table
        .rows()
        .iter()
        .filter(|row| {
            let month = row.get(month_column).and_then(|s| Month::from_name(s));
            !month.is_some_and(|m| period.contains(m))
        })
        .map(|row| {
            let mut record = vec![row.get(month_column).cloned().unwrap_or_default()];
            record.extend(
                columns
                    .iter()
                    .map(|c| c.and_then(|ix| row.get(ix)).cloned().unwrap_or_default()),
            );
            record
        })
        .filter(|record| record.iter().any(|v| !v.trim().is_empty()))
        .collect()
}

fn read_month_sheet(grid: &mut Grid, table: &Table, year: i32, month: Month) -> Result<()> {
    let day_column = DAY_HEADERS.iter().find_map(|h| table.column(h));
    let columns: Vec<(usize, Floor)> = Floor::BOOKABLE
        .into_iter()
        .filter_map(|floor| {
            table
                .column(&fold(&column_name(month, floor)))
                .map(|ix| (ix, floor))
        })
        .collect();
    let context = EntryContext::new(year, month, Kind::Revenue);

    for (ix, row) in table.rows().iter().enumerate() {
        let day = match day_column {
            Some(c) => row.get(c).and_then(|s| parse_day(s)),
            None => u8::try_from(ix + 1).ok().filter(|d| DAYS.contains(d)),
        };
        let Some(day) = day else {
            warn!("Skipping a row without a valid day in the {month} {year} sheet");
            continue;
        };
        for &(col, floor) in &columns {
            let text = row.get(col).map(String::as_str).unwrap_or_default();
            let tokens = parse_input(text, context);
            if tokens.is_empty() {
                continue;
            }
            let cell = CellRef::new(month, floor, day)?;
            grid.update(cell, |old| merge_tokens(old, tokens))?;
        }
    }
    Ok(())
}

fn read_expense_sheet(grid: &mut Grid, table: &Table, year: i32) -> Result<()> {
    let Some(month_column) = table.column(&fold(MONTH_HEADER)) else {
        warn!("The {year} expense sheet has no {MONTH_HEADER} column");
        return Ok(());
    };
    let columns: Vec<(usize, Floor)> = Floor::ALL
        .into_iter()
        .filter_map(|floor| table.column(&fold(floor.display_name())).map(|ix| (ix, floor)))
        .collect();

    for row in table.rows() {
        let month = row
            .get(month_column)
            .and_then(|s| Month::from_name(s))
            .filter(|m| grid.period().contains(*m));
        let Some(month) = month else {
            continue;
        };
        let context = EntryContext::new(year, month, Kind::Expense);
        for &(col, category) in &columns {
            let text = row.get(col).map(String::as_str).unwrap_or_default();
            let tokens = parse_input(text, context);
            if tokens.is_empty() {
                continue;
            }
            grid.update_expense(ExpenseRef::new(month, category), |old| {
                merge_tokens(old, tokens)
            })?;
        }
    }
    Ok(())
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Unable to serialize a row")?;
    }
    finish(writer)
}

async fn from_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = utils::read(path).await?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping a malformed row in {}: {e}", path.display()),
        }
    }
    Ok(rows)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Unable to flush the CSV writer")?;
    String::from_utf8(bytes).context("The CSV output is not UTF-8")
}
