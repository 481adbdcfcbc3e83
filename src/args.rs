//! These structs provide the CLI interface for the bookings CLI.

use crate::import::MergePolicy;
use crate::model::{Floor, Month};
use crate::store::Backend;
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// bookings: record apartment bookings in a day-by-month grid.
///
/// Every cell of the grid is a (month, floor, day) coordinate. A cell can hold the bookings of
/// several years at once, each stored as a token like `120:2024;APRIL`. Saving the grid rebuilds a
/// flat ledger of bookings and expenses, which is what `export` and `stats` read.
///
/// Start with `bookings init`, then enter prices with `bookings set`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, its config file and an empty store.
    ///
    /// By default the data directory is $HOME/bookings. Pass --bookings-home or set BOOKINGS_HOME
    /// to keep it somewhere else.
    Init(InitArgs),
    /// Enter one or more prices into a day cell.
    ///
    /// The value may be a bare price (`120`), filed under --year and the cell's month, the
    /// short form `24:120` for another year, or full tokens such as `120:2024;APRIL`. Several
    /// values can be separated by commas. A value replaces the previous price of the same year
    /// and leaves other years alone.
    Set(SetArgs),
    /// Enter a monthly expense for a floor or for the general category.
    Expense(ExpenseArgs),
    /// Show the bookings of one year, by month and day.
    Show(ShowArgs),
    /// Remove entries from the grid.
    Clear(ClearArgs),
    /// Import bookings from a CSV file in long or wide format.
    ///
    /// A file written by `export expenses` (columns year, category, month, price) imports as
    /// expenses.
    Import(ImportArgs),
    /// Write the saved ledger as CSV.
    Export(ExportArgs),
    /// Print statistics computed from the saved ledger.
    Stats(StatsArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the bookings data and configuration is held. Defaults to ~/bookings
    #[arg(long, env = "BOOKINGS_HOME", default_value_t = default_bookings_home())]
    bookings_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, bookings_home: PathBuf) -> Self {
        Self {
            log_level,
            bookings_home: bookings_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn bookings_home(&self) -> &DisplayPath {
        &self.bookings_home
    }
}

/// Args for the `bookings init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Where the grid is stored.
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    backend: Backend,

    /// The months of the season, comma separated, e.g. `MAY,JUNE,JULY`. Defaults to April
    /// through October.
    #[arg(long, value_delimiter = ',', value_parser = parse_month)]
    months: Vec<Month>,
}

impl InitArgs {
    pub fn new(backend: Backend, months: Vec<Month>) -> Self {
        Self { backend, months }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }
}

/// Args for the `bookings set` command.
#[derive(Debug, Parser, Clone)]
pub struct SetArgs {
    /// The year that a bare price is filed under.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// The month, as `APRIL` or `Απρίλιος`.
    #[arg(long, value_parser = parse_month)]
    month: Month,

    /// The floor: `GROUND`, `A` or `B` (Greek names are accepted too).
    #[arg(long, value_parser = parse_floor)]
    floor: Floor,

    /// The day of the month, 1 to 31.
    #[arg(long)]
    day: u8,

    /// The value to enter.
    value: String,
}

impl SetArgs {
    pub fn new(year: i32, month: Month, floor: Floor, day: u8, value: impl Into<String>) -> Self {
        Self {
            year,
            month,
            floor,
            day,
            value: value.into(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn floor(&self) -> Floor {
        self.floor
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Args for the `bookings expense` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    /// The year that a bare amount is filed under.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    #[arg(long, value_parser = parse_month)]
    month: Month,

    /// `GROUND`, `A`, `B` or `GENERAL`.
    #[arg(long, value_parser = parse_floor, default_value = "GENERAL")]
    category: Floor,

    /// The amount to enter.
    value: String,
}

impl ExpenseArgs {
    pub fn new(year: i32, month: Month, category: Floor, value: impl Into<String>) -> Self {
        Self {
            year,
            month,
            category,
            value: value.into(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn category(&self) -> Floor {
        self.category
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Args for the `bookings show` command.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// Only show this month.
    #[arg(long, value_parser = parse_month)]
    month: Option<Month>,
}

impl ShowArgs {
    pub fn new(year: i32, month: Option<Month>) -> Self {
        Self { year, month }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }
}

/// Args for the `bookings clear` command.
#[derive(Debug, Parser, Clone)]
pub struct ClearArgs {
    #[command(subcommand)]
    target: ClearTarget,
}

impl ClearArgs {
    pub fn new(target: ClearTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &ClearTarget {
        &self.target
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ClearTarget {
    /// Remove the price of one year from a day cell.
    Cell {
        #[arg(long, default_value_t = current_year())]
        year: i32,
        #[arg(long, value_parser = parse_month)]
        month: Month,
        #[arg(long, value_parser = parse_floor)]
        floor: Floor,
        #[arg(long)]
        day: u8,
        /// Remove the expense entry instead of the booking.
        #[arg(long)]
        expense: bool,
    },
    /// Remove the expense of one year from a monthly expense cell.
    Expense {
        #[arg(long, default_value_t = current_year())]
        year: i32,
        #[arg(long, value_parser = parse_month)]
        month: Month,
        #[arg(long, value_parser = parse_floor, default_value = "GENERAL")]
        category: Floor,
    },
    /// Empty a month. Only the given year is removed when --year is passed, otherwise every year.
    Month {
        #[arg(long, value_parser = parse_month)]
        month: Month,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Empty the whole grid.
    All,
}

/// Args for the `bookings import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The CSV file to import.
    file: PathBuf,

    /// The year used for rows and bare prices that carry no year of their own.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// For each year in the file, `merge` rewrites only the cells the file fills and `replace`
    /// drops that year's stored bookings first. Other years are never touched.
    #[arg(long, value_enum, default_value_t = MergePolicy::Merge)]
    policy: MergePolicy,
}

impl ImportArgs {
    pub fn new(file: impl Into<PathBuf>, year: i32, policy: MergePolicy) -> Self {
        Self {
            file: file.into(),
            year,
            policy,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }
}

/// Which ledger to export.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    #[default]
    Bookings,
    Expenses,
}

serde_plain::derive_display_from_serialize!(LedgerKind);
serde_plain::derive_fromstr_from_deserialize!(LedgerKind);

/// Args for the `bookings export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = LedgerKind::Bookings)]
    ledger: LedgerKind,

    /// The file to write. If not supplied, the CSV is written to stdout.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn new(ledger: LedgerKind, output: Option<PathBuf>) -> Self {
        Self { ledger, output }
    }

    pub fn ledger(&self) -> LedgerKind {
        self.ledger
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// Args for the `bookings stats` command.
#[derive(Debug, Parser, Clone)]
pub struct StatsArgs {
    /// Only count these floors, comma separated. All floors by default.
    #[arg(long, value_delimiter = ',', value_parser = parse_floor)]
    floors: Vec<Floor>,

    /// The first year to count.
    #[arg(long)]
    from_year: Option<i32>,

    /// The last year to count.
    #[arg(long)]
    to_year: Option<i32>,
}

impl StatsArgs {
    pub fn new(floors: Vec<Floor>, from_year: Option<i32>, to_year: Option<i32>) -> Self {
        Self {
            floors,
            from_year,
            to_year,
        }
    }

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn from_year(&self) -> Option<i32> {
        self.from_year
    }

    pub fn to_year(&self) -> Option<i32> {
        self.to_year
    }
}

fn parse_month(s: &str) -> Result<Month, String> {
    Month::from_name(s).ok_or_else(|| format!("'{s}' is not a month"))
}

fn parse_floor(s: &str) -> Result<Floor, String> {
    Floor::from_name(s).ok_or_else(|| format!("'{s}' is not a floor"))
}

fn current_year() -> i32 {
    Local::now().year()
}

fn default_bookings_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("bookings"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --bookings-home or BOOKINGS_HOME instead of relying on the \
                default directory.",
            );
            PathBuf::from("bookings")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set() {
        let args = Args::try_parse_from([
            "bookings",
            "--bookings-home",
            "/tmp/b",
            "set",
            "--year",
            "2024",
            "--month",
            "Απρίλιος",
            "--floor",
            "Α",
            "--day",
            "3",
            "120",
        ])
        .unwrap();
        assert_eq!(args.common().bookings_home().path(), Path::new("/tmp/b"));
        let Command::Set(set) = args.command() else {
            panic!("expected the set command");
        };
        assert_eq!(set.year(), 2024);
        assert_eq!(set.month(), Month::April);
        assert_eq!(set.floor(), Floor::A);
        assert_eq!(set.day(), 3);
        assert_eq!(set.value(), "120");
    }

    #[test]
    fn test_parse_init_months() {
        let args = Args::try_parse_from([
            "bookings",
            "init",
            "--backend",
            "sheets",
            "--months",
            "JUNE,july,Αύγουστος",
        ])
        .unwrap();
        let Command::Init(init) = args.command() else {
            panic!("expected the init command");
        };
        assert_eq!(init.backend(), Backend::Sheets);
        assert_eq!(init.months(), &[Month::June, Month::July, Month::August]);
    }

    #[test]
    fn test_parse_clear_month() {
        let args =
            Args::try_parse_from(["bookings", "clear", "month", "--month", "MAY"]).unwrap();
        let Command::Clear(clear) = args.command() else {
            panic!("expected the clear command");
        };
        assert!(matches!(
            clear.target(),
            ClearTarget::Month {
                month: Month::May,
                year: None
            }
        ));
    }

    #[test]
    fn test_bad_month_is_rejected() {
        assert!(Args::try_parse_from([
            "bookings", "set", "--month", "Brumaire", "--floor", "A", "--day", "1", "5"
        ])
        .is_err());
    }
}
