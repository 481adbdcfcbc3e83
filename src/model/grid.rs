use crate::codec::decode_cell;
use crate::model::{Floor, Month, Period, DAYS};
use crate::reconcile;
use crate::Result;
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The coordinate of a day cell: the column is (month, floor), the row is the day.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub month: Month,
    pub floor: Floor,
    pub day: u8,
}

impl CellRef {
    pub fn new(month: Month, floor: Floor, day: u8) -> Result<Self> {
        ensure!(
            floor.is_bookable(),
            "Floor {floor} has no column in the booking grid"
        );
        ensure!(DAYS.contains(&day), "Day {day} is outside of 1..=31");
        Ok(Self { month, floor, day })
    }

    /// The column label, e.g. `Απρίλιος Α`.
    pub fn column_name(&self) -> String {
        column_name(self.month, self.floor)
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, day {}", self.column_name(), self.day)
    }
}

/// The coordinate of a month-level expense cell.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ExpenseRef {
    pub month: Month,
    pub category: Floor,
}

impl ExpenseRef {
    pub fn new(month: Month, category: Floor) -> Self {
        Self { month, category }
    }
}

/// Formats a grid column label from its month and floor.
pub(crate) fn column_name(month: Month, floor: Floor) -> String {
    format!("{} {}", month.display_name(), floor.display_name())
}

/// The in-memory booking grid: the day cells of every (month, floor) column in the period, plus
/// the month-level expense cells. Only non-empty cells are held, an absent cell reads as `""`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(into = "GridFile", try_from = "GridFile")]
pub struct Grid {
    period: Period,
    cells: BTreeMap<CellRef, String>,
    expenses: BTreeMap<ExpenseRef, String>,
}

impl Grid {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            cells: BTreeMap::new(),
            expenses: BTreeMap::new(),
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.expenses.is_empty()
    }

    pub fn get(&self, cell: &CellRef) -> &str {
        self.cells.get(cell).map(String::as_str).unwrap_or_default()
    }

    /// Stores `text` at `cell`. Writing blank text empties the cell.
    pub fn set(&mut self, cell: CellRef, text: impl Into<String>) -> Result<()> {
        if !self.period.contains(cell.month) {
            bail!("{} is not one of the months of the period", cell.month);
        }
        let text = text.into().trim().to_string();
        if text.is_empty() {
            self.cells.remove(&cell);
        } else {
            self.cells.insert(cell, text);
        }
        Ok(())
    }

    /// Replaces the content of `cell` with `f(old)`.
    pub fn update<F>(&mut self, cell: CellRef, f: F) -> Result<()>
    where
        F: FnOnce(&str) -> String,
    {
        let new = f(self.get(&cell));
        self.set(cell, new)
    }

    pub fn expense(&self, cell: &ExpenseRef) -> &str {
        self.expenses.get(cell).map(String::as_str).unwrap_or_default()
    }

    pub fn set_expense(&mut self, cell: ExpenseRef, text: impl Into<String>) -> Result<()> {
        if !self.period.contains(cell.month) {
            bail!("{} is not one of the months of the period", cell.month);
        }
        let text = text.into().trim().to_string();
        if text.is_empty() {
            self.expenses.remove(&cell);
        } else {
            self.expenses.insert(cell, text);
        }
        Ok(())
    }

    pub fn update_expense<F>(&mut self, cell: ExpenseRef, f: F) -> Result<()>
    where
        F: FnOnce(&str) -> String,
    {
        let new = f(self.expense(&cell));
        self.set_expense(cell, new)
    }

    /// The non-empty day cells, ordered by month, floor and day.
    pub fn cells(&self) -> impl Iterator<Item = (&CellRef, &str)> {
        self.cells.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// The non-empty expense cells, ordered by month and category.
    pub fn expense_cells(&self) -> impl Iterator<Item = (&ExpenseRef, &str)> {
        self.expenses.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Every day cell coordinate of the period, empty or not.
    pub fn coordinates(&self) -> Vec<CellRef> {
        let mut out = Vec::new();
        for &month in self.period.months() {
            for floor in Floor::BOOKABLE {
                for day in DAYS {
                    out.push(CellRef { month, floor, day });
                }
            }
        }
        out
    }

    /// Every expense cell coordinate of the period, empty or not.
    pub fn expense_coordinates(&self) -> Vec<ExpenseRef> {
        self.period
            .months()
            .iter()
            .flat_map(|&month| Floor::ALL.map(|category| ExpenseRef::new(month, category)))
            .collect()
    }

    /// Empties every cell of `month`, for all years.
    pub fn clear_month(&mut self, month: Month) {
        self.cells.retain(|cell, _| cell.month != month);
        self.expenses.retain(|cell, _| cell.month != month);
    }

    /// Removes the tokens of `year` from every cell of `month`, keeping other years.
    pub fn clear_month_year(&mut self, month: Month, year: i32) {
        self.strip_year(year, |m| m == month);
    }

    /// Removes the tokens of `year` from every cell, keeping other years.
    pub fn clear_year(&mut self, year: i32) {
        self.strip_year(year, |_| true);
    }

    fn strip_year(&mut self, year: i32, in_scope: impl Fn(Month) -> bool) {
        for (_, text) in self.cells.iter_mut().filter(|(c, _)| in_scope(c.month)) {
            *text = reconcile::clear_year(text, year);
        }
        for (_, text) in self.expenses.iter_mut().filter(|(c, _)| in_scope(c.month)) {
            *text = reconcile::clear_year(text, year);
        }
        self.cells.retain(|_, text| !text.is_empty());
        self.expenses.retain(|_, text| !text.is_empty());
    }

    pub fn clear_all(&mut self) {
        self.cells.clear();
        self.expenses.clear();
    }

    /// For every cell that is non-blank in `other`, replaces the `year` tokens of `self` with the
    /// `year` tokens of `other`. Tokens of other years, and cells that are blank in `other`, keep
    /// their current content.
    pub fn overlay_year(&mut self, other: &Grid, year: i32) {
        for (cell, text) in other.cells() {
            if self.period.contains(cell.month) {
                let merged = overlay_text(self.get(cell), text, year);
                put(&mut self.cells, *cell, merged);
            }
        }
        for (cell, text) in other.expense_cells() {
            if self.period.contains(cell.month) {
                let merged = overlay_text(self.expense(cell), text, year);
                put(&mut self.expenses, *cell, merged);
            }
        }
    }
}

fn overlay_text(existing: &str, incoming: &str, year: i32) -> String {
    let incoming = decode_cell(incoming).into_iter().filter(|t| t.year == year);
    reconcile::merge_tokens(&reconcile::clear_year(existing, year), incoming)
}

fn put<K: Ord>(cells: &mut BTreeMap<K, String>, key: K, text: String) {
    if text.is_empty() {
        cells.remove(&key);
    } else {
        cells.insert(key, text);
    }
}

/// The serialized shape of a `Grid`, used for backups.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridFile {
    period: Period,
    cells: Vec<CellEntry>,
    expenses: Vec<ExpenseEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellEntry {
    month: Month,
    floor: Floor,
    day: u8,
    entries: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExpenseEntry {
    month: Month,
    category: Floor,
    entries: String,
}

impl From<Grid> for GridFile {
    fn from(grid: Grid) -> Self {
        Self {
            cells: grid
                .cells
                .into_iter()
                .map(|(c, entries)| CellEntry {
                    month: c.month,
                    floor: c.floor,
                    day: c.day,
                    entries,
                })
                .collect(),
            expenses: grid
                .expenses
                .into_iter()
                .map(|(c, entries)| ExpenseEntry {
                    month: c.month,
                    category: c.category,
                    entries,
                })
                .collect(),
            period: grid.period,
        }
    }
}

impl TryFrom<GridFile> for Grid {
    type Error = anyhow::Error;

    fn try_from(file: GridFile) -> Result<Self> {
        let mut grid = Grid::new(file.period);
        for entry in file.cells {
            grid.set(
                CellRef::new(entry.month, entry.floor, entry.day)?,
                entry.entries,
            )?;
        }
        for entry in file.expenses {
            grid.set_expense(ExpenseRef::new(entry.month, entry.category), entry.entries)?;
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(month: Month, floor: Floor, day: u8) -> CellRef {
        CellRef::new(month, floor, day).unwrap()
    }

    #[test]
    fn test_cell_ref_validation() {
        assert!(CellRef::new(Month::April, Floor::A, 0).is_err());
        assert!(CellRef::new(Month::April, Floor::A, 32).is_err());
        assert!(CellRef::new(Month::April, Floor::General, 1).is_err());
        // 31 April is tolerated, it just stays empty in practice.
        assert!(CellRef::new(Month::April, Floor::A, 31).is_ok());
    }

    #[test]
    fn test_column_name() {
        assert_eq!(cell(Month::April, Floor::A, 1).column_name(), "Απρίλιος Α");
        assert_eq!(
            cell(Month::May, Floor::Ground, 1).column_name(),
            "Μάιος Ισόγειο"
        );
    }

    #[test]
    fn test_set_and_get() {
        let mut grid = Grid::new(Period::default());
        let c = cell(Month::June, Floor::B, 3);
        assert_eq!(grid.get(&c), "");
        grid.set(c, " 100:2024;JUNE ").unwrap();
        assert_eq!(grid.get(&c), "100:2024;JUNE");
        grid.set(c, "  ").unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_set_outside_period() {
        let mut grid = Grid::new(Period::default());
        assert!(grid.set(cell(Month::January, Floor::A, 1), "x").is_err());
        assert!(grid
            .set_expense(ExpenseRef::new(Month::December, Floor::General), "x")
            .is_err());
    }

    #[test]
    fn test_coordinates() {
        let grid = Grid::new(Period::default());
        assert_eq!(grid.coordinates().len(), 7 * 3 * 31);
        assert_eq!(grid.expense_coordinates().len(), 7 * 4);
    }

    #[test]
    fn test_clear_month() {
        let mut grid = Grid::new(Period::default());
        grid.set(cell(Month::April, Floor::A, 1), "1:2024;APRIL").unwrap();
        grid.set(cell(Month::May, Floor::A, 1), "1:2024;MAY").unwrap();
        grid.clear_month(Month::April);
        assert_eq!(grid.get(&cell(Month::April, Floor::A, 1)), "");
        assert_eq!(grid.get(&cell(Month::May, Floor::A, 1)), "1:2024;MAY");
    }

    #[test]
    fn test_clear_month_year() {
        let mut grid = Grid::new(Period::default());
        let a = cell(Month::April, Floor::A, 1);
        let b = cell(Month::April, Floor::B, 2);
        let expense = ExpenseRef::new(Month::April, Floor::General);
        grid.set(a, "80:2023;APRIL,100:2024;APRIL").unwrap();
        grid.set(b, "100:2024;APRIL").unwrap();
        grid.set_expense(expense, "40:2024;APRIL;EX").unwrap();
        grid.clear_month_year(Month::April, 2024);
        assert_eq!(grid.get(&a), "80:2023;APRIL");
        assert_eq!(grid.get(&b), "");
        assert_eq!(grid.expense(&expense), "");
        assert_eq!(grid.cells().count(), 1);
    }

    #[test]
    fn test_overlay_year_keeps_other_years() {
        let mut base = Grid::new(Period::default());
        let a = cell(Month::April, Floor::A, 1);
        let b = cell(Month::April, Floor::A, 2);
        let c = cell(Month::April, Floor::A, 3);
        base.set(a, "80:2023;APRIL,95:2024;APRIL").unwrap();
        base.set(b, "90:2023;APRIL").unwrap();
        base.set(c, "70:2024;APRIL").unwrap();

        let mut imported = Grid::new(Period::default());
        imported.set(a, "100:2024;APRIL").unwrap();
        imported.set(b, "120:2024;APRIL").unwrap();

        base.overlay_year(&imported, 2024);
        assert_eq!(base.get(&a), "80:2023;APRIL,100:2024;APRIL");
        assert_eq!(base.get(&b), "90:2023;APRIL,120:2024;APRIL");
        assert_eq!(base.get(&c), "70:2024;APRIL");
    }

    #[test]
    fn test_clear_year() {
        let mut grid = Grid::new(Period::default());
        let a = cell(Month::April, Floor::A, 1);
        let b = cell(Month::May, Floor::B, 2);
        grid.set(a, "80:2023;APRIL,100:2024;APRIL").unwrap();
        grid.set(b, "100:2024;MAY").unwrap();
        grid.clear_year(2024);
        assert_eq!(grid.get(&a), "80:2023;APRIL");
        assert_eq!(grid.get(&b), "");
        assert_eq!(grid.cells().count(), 1);
    }

    #[test]
    fn test_grid_serde() {
        let mut grid = Grid::new(Period::default());
        grid.set(cell(Month::July, Floor::Ground, 9), "60:2024;JULY")
            .unwrap();
        grid.set_expense(
            ExpenseRef::new(Month::July, Floor::General),
            "5:2024;JULY;EX",
        )
        .unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid, back);
    }
}
