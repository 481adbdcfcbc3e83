use crate::model::{Floor, Month, Price};
use serde::{Deserialize, Serialize};

/// One booked night: the flat, denormalized row that statistics and exports read.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct LedgerRow {
    pub year: i32,
    pub floor: Floor,
    pub month: Month,
    pub day: u8,
    pub price: Price,
}

/// The monthly aggregate cost of one category.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub year: i32,
    pub category: Floor,
    pub month: Month,
    pub price: Price,
}

/// The ledger derived from the grid. It has no identity of its own: every save throws the
/// previous ledger away and rebuilds it from the cells.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub bookings: Vec<LedgerRow>,
    pub expenses: Vec<ExpenseRow>,
}

impl Ledger {
    pub fn new(bookings: Vec<LedgerRow>, expenses: Vec<ExpenseRow>) -> Self {
        Self { bookings, expenses }
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty() && self.expenses.is_empty()
    }

    /// The distinct years that appear in either ledger, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .bookings
            .iter()
            .map(|r| r.year)
            .chain(self.expenses.iter().map(|r| r.year))
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}
