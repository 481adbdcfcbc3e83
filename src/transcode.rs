//! Materialization between the grid of token cells and the flat ledger.
//!
//! `grid_to_ledger` is a pure function of the cell contents and sorts its output, so running it
//! twice over the same grid gives identical ledgers. `ledger_to_grid` goes the other way for
//! imports and restores, layering rows into an existing grid with the reconciler so that data
//! for other years survives.

use crate::codec::{decode_cell, Kind, TokenKey};
use crate::model::{
    CellRef, ExpenseRef, ExpenseRow, Floor, Grid, Ledger, LedgerRow, Month, Price,
};
use crate::reconcile::{apply_entry, dedupe_by_key};
use crate::Result;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Scans every cell and emits one ledger row per surviving token.
///
/// A cell that repeats a key counts only the last token for it. A token is only counted when its
/// embedded month equals the month of the cell it sits in.
/// Tokens that drifted into a foreign column, for example by copy and paste, are excluded.
/// Expense tokens found in either the day cells or the expense cells are summed per
/// (year, month, category).
pub fn grid_to_ledger(grid: &Grid) -> Ledger {
    let mut bookings = Vec::new();
    let mut expenses: BTreeMap<(i32, Month, Floor), Price> = BTreeMap::new();

    for (cell, text) in grid.cells() {
        for token in dedupe_by_key(decode_cell(text)) {
            if token.month != cell.month {
                debug!("Excluding token for {} found in column {cell}", token.month);
                continue;
            }
            match token.kind {
                Kind::Revenue => bookings.push(LedgerRow {
                    year: token.year,
                    floor: cell.floor,
                    month: cell.month,
                    day: cell.day,
                    price: token.price,
                }),
                Kind::Expense => {
                    let total = expenses
                        .entry((token.year, cell.month, cell.floor))
                        .or_default();
                    *total = *total + token.price;
                }
            }
        }
    }

    for (cell, text) in grid.expense_cells() {
        for token in dedupe_by_key(decode_cell(text)) {
            if token.month != cell.month || token.kind != Kind::Expense {
                debug!(
                    "Excluding token {token} found in expense cell {} {}",
                    cell.month, cell.category
                );
                continue;
            }
            let total = expenses
                .entry((token.year, cell.month, cell.category))
                .or_default();
            *total = *total + token.price;
        }
    }

    let period = grid.period();
    let month_order = |m: Month| period.position(m).unwrap_or(usize::MAX);
    bookings.sort_by_key(|r| (r.year, month_order(r.month), r.floor, r.day, r.price));
    let mut expenses: Vec<ExpenseRow> = expenses
        .into_iter()
        .map(|((year, month, category), price)| ExpenseRow {
            year,
            category,
            month,
            price,
        })
        .collect();
    expenses.sort_by_key(|r| (r.year, month_order(r.month), r.category));

    trace!(
        "Derived {} booking rows and {} expense rows",
        bookings.len(),
        expenses.len()
    );
    Ledger::new(bookings, expenses)
}

/// Layers the rows of `ledger` into a copy of `base`.
///
/// Each booking row is written into the cell at (month, floor, day) under the key
/// (year, month, revenue), each expense row into the expense cell at (month, category) under
/// (year, month, expense). Rows that share a key are resolved last one wins. Rows for months
/// outside the period of `base`, or for floors that have no day column, are skipped.
pub fn ledger_to_grid(ledger: &Ledger, base: &Grid) -> Result<Grid> {
    let mut grid = base.clone();

    for row in &ledger.bookings {
        if !grid.period().contains(row.month) {
            debug!("Skipping booking for {}, not in the period", row.month);
            continue;
        }
        let cell = match CellRef::new(row.month, row.floor, row.day) {
            Ok(cell) => cell,
            Err(e) => {
                debug!("Skipping booking row: {e}");
                continue;
            }
        };
        let key = TokenKey::revenue(row.year, row.month);
        grid.update(cell, |old| apply_entry(old, key, Some(row.price)))?;
    }

    for row in &ledger.expenses {
        if !grid.period().contains(row.month) {
            debug!("Skipping expense for {}, not in the period", row.month);
            continue;
        }
        let cell = ExpenseRef::new(row.month, row.category);
        let key = TokenKey::expense(row.year, row.month);
        grid.update_expense(cell, |old| apply_entry(old, key, Some(row.price)))?;
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;
    use std::str::FromStr;

    fn cell(month: Month, floor: Floor, day: u8) -> CellRef {
        CellRef::new(month, floor, day).unwrap()
    }

    fn price(s: &str) -> Price {
        Price::from_str(s).unwrap()
    }

    fn sample_grid() -> Grid {
        let mut grid = Grid::new(Period::default());
        grid.set(cell(Month::May, Floor::B, 2), "70:2024;MAY").unwrap();
        grid.set(cell(Month::April, Floor::A, 1), "80:2023;APRIL,100:2024;APRIL")
            .unwrap();
        grid.set(cell(Month::April, Floor::Ground, 1), "90:2024;APRIL,junk")
            .unwrap();
        grid.set(cell(Month::April, Floor::A, 3), "50:2024;MAY").unwrap();
        grid.set(cell(Month::April, Floor::B, 4), "10:2024;APRIL;EX")
            .unwrap();
        grid.set_expense(
            ExpenseRef::new(Month::April, Floor::B),
            "15:2024;APRIL;EX,999:2024;APRIL",
        )
        .unwrap();
        grid.set_expense(
            ExpenseRef::new(Month::April, Floor::General),
            "200:2024;APRIL;EX",
        )
        .unwrap();
        grid
    }

    #[test]
    fn test_grid_to_ledger_rows_and_order() {
        let ledger = grid_to_ledger(&sample_grid());
        let rows: Vec<(i32, Month, Floor, u8, String)> = ledger
            .bookings
            .iter()
            .map(|r| (r.year, r.month, r.floor, r.day, r.price.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (2023, Month::April, Floor::A, 1, "80".to_string()),
                (2024, Month::April, Floor::Ground, 1, "90".to_string()),
                (2024, Month::April, Floor::A, 1, "100".to_string()),
                (2024, Month::May, Floor::B, 2, "70".to_string()),
            ]
        );
    }

    #[test]
    fn test_grid_to_ledger_excludes_month_mismatch() {
        let mut grid = Grid::new(Period::default());
        grid.set(cell(Month::April, Floor::A, 5), "50:2024;MAY").unwrap();
        let ledger = grid_to_ledger(&grid);
        assert!(ledger.bookings.is_empty());
    }

    #[test]
    fn test_grid_to_ledger_keeps_last_token_of_a_repeated_key() {
        let mut grid = Grid::new(Period::default());
        let day = cell(Month::April, Floor::A, 1);
        let expense = ExpenseRef::new(Month::April, Floor::General);
        grid.set(day, "100:2024;APRIL,80:2023;APRIL,110:2024;APRIL,5:2024;APRIL;EX,7:2024;APRIL;EX")
            .unwrap();
        grid.set_expense(expense, "20:2024;APRIL;EX,30:2024;APRIL;EX").unwrap();

        let ledger = grid_to_ledger(&grid);
        let rows: Vec<(i32, String)> = ledger
            .bookings
            .iter()
            .map(|r| (r.year, r.price.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![(2023, "80".to_string()), (2024, "110".to_string())]
        );
        let expenses: Vec<(Floor, String)> = ledger
            .expenses
            .iter()
            .map(|r| (r.category, r.price.to_string()))
            .collect();
        assert_eq!(
            expenses,
            vec![(Floor::A, "7".to_string()), (Floor::General, "30".to_string())]
        );
    }

    #[test]
    fn test_grid_to_ledger_expenses_are_summed_per_key() {
        let ledger = grid_to_ledger(&sample_grid());
        assert_eq!(
            ledger.expenses,
            vec![
                ExpenseRow {
                    year: 2024,
                    category: Floor::B,
                    month: Month::April,
                    price: price("25"),
                },
                ExpenseRow {
                    year: 2024,
                    category: Floor::General,
                    month: Month::April,
                    price: price("200"),
                },
            ]
        );
    }

    #[test]
    fn test_grid_to_ledger_huge_expenses_do_not_overflow() {
        let huge = "79228162514264337593543950335";
        let mut grid = Grid::new(Period::default());
        grid.set(
            cell(Month::April, Floor::A, 1),
            format!("{huge}:2024;APRIL;EX"),
        )
        .unwrap();
        grid.set_expense(
            ExpenseRef::new(Month::April, Floor::A),
            format!("{huge}:2024;APRIL;EX"),
        )
        .unwrap();
        let ledger = grid_to_ledger(&grid);
        assert_eq!(ledger.expenses.len(), 1);
        assert_eq!(ledger.expenses[0].price.to_string(), huge);
    }

    #[test]
    fn test_grid_to_ledger_is_deterministic() {
        let grid = sample_grid();
        let first = serde_json::to_string(&grid_to_ledger(&grid)).unwrap();
        let second = serde_json::to_string(&grid_to_ledger(&grid.clone())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ledger_to_grid_preserves_other_years() {
        let mut base = Grid::new(Period::default());
        let c = cell(Month::June, Floor::A, 10);
        base.set(c, "80:2023;JUNE").unwrap();

        let ledger = Ledger::new(
            vec![
                LedgerRow {
                    year: 2024,
                    floor: Floor::A,
                    month: Month::June,
                    day: 10,
                    price: price("100"),
                },
                LedgerRow {
                    year: 2024,
                    floor: Floor::A,
                    month: Month::June,
                    day: 10,
                    price: price("110"),
                },
            ],
            vec![ExpenseRow {
                year: 2024,
                category: Floor::General,
                month: Month::June,
                price: price("30"),
            }],
        );
        let grid = ledger_to_grid(&ledger, &base).unwrap();
        assert_eq!(grid.get(&c), "80:2023;JUNE,110:2024;JUNE");
        assert_eq!(
            grid.expense(&ExpenseRef::new(Month::June, Floor::General)),
            "30:2024;JUNE;EX"
        );
    }

    #[test]
    fn test_ledger_to_grid_skips_months_outside_period() {
        let base = Grid::new(Period::default());
        let ledger = Ledger::new(
            vec![LedgerRow {
                year: 2024,
                floor: Floor::A,
                month: Month::January,
                day: 1,
                price: price("100"),
            }],
            Vec::new(),
        );
        let grid = ledger_to_grid(&ledger, &base).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_round_trip_through_ledger() {
        let grid = sample_grid();
        let ledger = grid_to_ledger(&grid);
        let rebuilt = ledger_to_grid(&ledger, &Grid::new(Period::default())).unwrap();
        assert_eq!(grid_to_ledger(&rebuilt).bookings, ledger.bookings);
    }
}
