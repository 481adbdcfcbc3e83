//! The import normalizer.
//!
//! External CSV files come in two shapes:
//!
//! - long format: one row per booking or expense with `year`, `floor`, `month`, `day` and
//!   `price` columns (header names are matched case-insensitively, `year` and `kind` are
//!   optional)
//! - wide format: one column per `"{month} {floor}"`, e.g. `Απρίλιος Α`, with an optional day
//!   column (`Ημέρα` or `day`). Cells hold bare prices or full tokens.
//!
//! Both are reduced to the same stream of `ImportRecord`s, grouped by year, which is then fed
//! through `transcode::ledger_to_grid` and therefore through the reconciler.

use crate::codec::{decode_token, Kind};
use crate::model::{fold, ExpenseRow, Floor, Grid, Ledger, LedgerRow, Month, Period, Price, DAYS};
use crate::transcode::ledger_to_grid;
use crate::Result;
use anyhow::{bail, Context};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub(crate) const DAY_HEADERS: [&str; 2] = ["ημερα", "day"];

/// How imported cells are combined with the grid that is already in the session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// For each year in the file, the imported data replaces everything stored for that year.
    Replace,
    /// For each year in the file, only the cells the file fills are rewritten.
    #[default]
    Merge,
}

serde_plain::derive_display_from_serialize!(MergePolicy);
serde_plain::derive_fromstr_from_deserialize!(MergePolicy);

/// The recognized shape of an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Long,
    Wide,
}

serde_plain::derive_display_from_serialize!(Format);

/// A headed table of strings, as read from a CSV file.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S, R>(headers: impl IntoIterator<Item = S>, rows: impl IntoIterator<Item = R>) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .context("Unable to read the CSV header row")?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for (ix, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("Unable to read CSV row {}", ix + 2))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Unable to open file {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Unable to parse {}", path.display()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub(crate) fn column(&self, folded_name: &str) -> Option<usize> {
        self.headers.iter().position(|h| fold(h) == folded_name)
    }
}

/// One booking or expense taken from an import file. Expenses have no day.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub kind: Kind,
    pub year: i32,
    pub floor: Floor,
    pub month: Month,
    pub day: Option<u8>,
    pub price: Price,
}

/// The outcome of normalizing one import file.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub format: Format,
    /// The records of the file, grouped by the year they belong to.
    pub by_year: BTreeMap<i32, Vec<ImportRecord>>,
    /// Rows or values that could not be imported.
    pub skipped: usize,
}

impl Normalized {
    pub fn imported(&self) -> usize {
        self.by_year.values().map(Vec::len).sum()
    }

    pub fn years(&self) -> Vec<i32> {
        self.by_year.keys().copied().collect()
    }

    fn push(&mut self, record: ImportRecord) {
        self.by_year.entry(record.year).or_default().push(record);
    }
}

/// Detects the shape of `table` and reduces it to import records. Values without any year of
/// their own are filed under `fallback_year`.
///
/// # Errors
/// Returns an error if the table is neither in long nor in wide format. Individual rows that do
/// not parse are counted in `skipped`, they never cause an error.
pub fn normalize(table: &Table, period: &Period, fallback_year: i32) -> Result<Normalized> {
    if let Some(columns) = LongColumns::find(table) {
        debug!("Import file is in long format");
        return Ok(normalize_long(table, &columns, period, fallback_year));
    }
    let grid_columns = wide_columns(table, period);
    if !grid_columns.is_empty() {
        debug!(
            "Import file is in wide format with {} grid columns",
            grid_columns.len()
        );
        return Ok(normalize_wide(table, &grid_columns, fallback_year));
    }
    bail!(
        "The import format was not recognized: expected the columns year, floor, month, day, \
        price, the expense columns year, category, month, price or grid columns named like '{} {}'",
        Month::April.display_name(),
        Floor::A.display_name()
    )
}

/// Builds the grid that results from importing `normalized` on top of `base`.
///
/// Each year of the file is applied on its own and only touches the tokens of that year, so a
/// cell keeps the bookings of every year the file does not mention. With `Replace` the year is
/// first cleared from the whole grid; with `Merge` only the cells the file fills are rewritten.
pub fn apply(base: &Grid, normalized: &Normalized, policy: MergePolicy) -> Result<Grid> {
    let mut out = base.clone();
    for (&year, records) in &normalized.by_year {
        debug!("Applying {} imported records for {year}", records.len());
        let imported = ledger_to_grid(&to_ledger(records), &Grid::new(base.period().clone()))?;
        if policy == MergePolicy::Replace {
            out.clear_year(year);
        }
        out.overlay_year(&imported, year);
    }
    info!(
        "Imported {} records ({} skipped) with policy {policy}",
        normalized.imported(),
        normalized.skipped
    );
    Ok(out)
}

fn to_ledger(records: &[ImportRecord]) -> Ledger {
    let mut ledger = Ledger::default();
    for record in records {
        match (record.kind, record.day) {
            (Kind::Revenue, Some(day)) => ledger.bookings.push(LedgerRow {
                year: record.year,
                floor: record.floor,
                month: record.month,
                day,
                price: record.price,
            }),
            (Kind::Expense, _) => ledger.expenses.push(ExpenseRow {
                year: record.year,
                category: record.floor,
                month: record.month,
                price: record.price,
            }),
            (Kind::Revenue, None) => debug!("Dropping a booking without a day"),
        }
    }
    ledger
}

struct LongColumns {
    year: Option<usize>,
    floor: usize,
    month: usize,
    day: Option<usize>,
    price: usize,
    kind: Option<usize>,
    /// The kind of rows that leave the kind column blank, or of every row without one.
    default_kind: Kind,
}

impl LongColumns {
    /// Matches the booking shape `year, floor, month, day, price` and the expense ledger shape
    /// `year, category, month, price`.
    fn find(table: &Table) -> Option<Self> {
        let day = table.column("day");
        let (floor, default_kind) = match (table.column("floor"), table.column("category")) {
            (Some(floor), _) => (floor, Kind::Revenue),
            (None, Some(category)) => (category, Kind::Expense),
            (None, None) => return None,
        };
        if default_kind == Kind::Revenue && day.is_none() {
            return None;
        }
        Some(Self {
            year: table.column("year"),
            floor,
            month: table.column("month")?,
            day,
            price: table.column("price")?,
            kind: table.column("kind"),
            default_kind,
        })
    }
}

fn normalize_long(
    table: &Table,
    columns: &LongColumns,
    period: &Period,
    fallback_year: i32,
) -> Normalized {
    let mut out = Normalized {
        format: Format::Long,
        by_year: BTreeMap::new(),
        skipped: 0,
    };
    for (ix, row) in table.rows().iter().enumerate() {
        match long_record(row, columns, period, fallback_year) {
            Some(record) => out.push(record),
            None => {
                debug!("Skipping import row {}: {row:?}", ix + 2);
                out.skipped += 1;
            }
        }
    }
    out
}

fn long_record(
    row: &[String],
    columns: &LongColumns,
    period: &Period,
    fallback_year: i32,
) -> Option<ImportRecord> {
    let get = |ix: usize| row.get(ix).map(|s| s.trim()).unwrap_or_default();

    let kind = match columns.kind.map(get).map(fold).as_deref() {
        None | Some("") => columns.default_kind,
        Some("revenue") | Some("booking") => Kind::Revenue,
        Some("ex") | Some("expense") => Kind::Expense,
        Some(_) => return None,
    };
    let floor = Floor::from_name(get(columns.floor))?;
    let month = Month::from_name(get(columns.month)).filter(|&m| period.contains(m))?;
    let year = match columns.year.map(get) {
        None | Some("") => fallback_year,
        Some(y) => parse_year(y)?,
    };
    let price = Price::from_str(get(columns.price)).ok()?;
    let day = match kind {
        Kind::Revenue => {
            if !floor.is_bookable() {
                return None;
            }
            Some(parse_day(columns.day.map(get).unwrap_or_default())?)
        }
        Kind::Expense => None,
    };
    Some(ImportRecord {
        kind,
        year,
        floor,
        month,
        day,
        price,
    })
}

struct WideColumn {
    index: usize,
    month: Month,
    floor: Floor,
}

fn wide_columns(table: &Table, period: &Period) -> Vec<WideColumn> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            let (month, floor) = header.trim().rsplit_once(' ')?;
            let month = Month::from_name(month).filter(|&m| period.contains(m))?;
            let floor = Floor::from_name(floor).filter(Floor::is_bookable)?;
            Some(WideColumn {
                index,
                month,
                floor,
            })
        })
        .collect()
}

fn normalize_wide(table: &Table, columns: &[WideColumn], fallback_year: i32) -> Normalized {
    let mut out = Normalized {
        format: Format::Wide,
        by_year: BTreeMap::new(),
        skipped: 0,
    };
    let day_column = DAY_HEADERS.iter().find_map(|h| table.column(h));

    for (ix, row) in table.rows().iter().enumerate() {
        let day = match day_column {
            Some(col) => parse_day(row.get(col).map(String::as_str).unwrap_or_default()),
            None => u8::try_from(ix + 1).ok().filter(|d| DAYS.contains(d)),
        };
        let Some(day) = day else {
            debug!("Skipping import row {}, it has no valid day", ix + 2);
            out.skipped += 1;
            continue;
        };

        for column in columns {
            let text = row.get(column.index).map(String::as_str).unwrap_or_default();
            for segment in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match wide_record(segment, column, day, fallback_year) {
                    Some(record) => out.push(record),
                    None => {
                        debug!(
                            "Skipping '{segment}' in column {} {} day {day}",
                            column.month, column.floor
                        );
                        out.skipped += 1;
                    }
                }
            }
        }
    }
    out
}

fn wide_record(
    segment: &str,
    column: &WideColumn,
    day: u8,
    fallback_year: i32,
) -> Option<ImportRecord> {
    if let Some(token) = decode_token(segment) {
        // A token that names a different month than its column is contamination.
        if token.month != column.month {
            return None;
        }
        return Some(ImportRecord {
            kind: token.kind,
            year: token.year,
            floor: column.floor,
            month: column.month,
            day: (token.kind == Kind::Revenue).then_some(day),
            price: token.price,
        });
    }
    let price = Price::from_str(segment).ok()?;
    Some(ImportRecord {
        kind: Kind::Revenue,
        year: fallback_year,
        floor: column.floor,
        month: column.month,
        day: Some(day),
        price,
    })
}

/// Parses a whole number that may have been written by a spreadsheet as `3.0`.
fn parse_whole(s: &str) -> Option<i64> {
    let value = Decimal::from_str(s.trim()).ok()?;
    if !value.fract().is_zero() {
        return None;
    }
    value.trunc().to_i64()
}

pub(crate) fn parse_day(s: &str) -> Option<u8> {
    let day = u8::try_from(parse_whole(s)?).ok()?;
    DAYS.contains(&day).then_some(day)
}

fn parse_year(s: &str) -> Option<i32> {
    let year = i32::try_from(parse_whole(s)?).ok()?;
    (1000..=9999).contains(&year).then_some(year)
}
