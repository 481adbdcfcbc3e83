//! Types that represent the core data model: months, floors, prices, the cell grid and the
//! ledger that is derived from it.
mod floor;
mod grid;
mod ledger;
mod month;
mod period;
mod price;

pub use floor::Floor;
pub(crate) use grid::column_name;
pub use grid::{CellRef, ExpenseRef, Grid};
pub use ledger::{ExpenseRow, Ledger, LedgerRow};
pub use month::Month;
pub use period::{Period, DAYS};
pub use price::{Price, PriceError};

/// Lowercases `s` and strips Greek tonos/dialytika so that `ΑΠΡΙΛΙΟΣ`, `Απρίλιος` and
/// `απριλιος` compare equal.
pub(crate) fn fold(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'ά' => 'α',
            'έ' => 'ε',
            'ή' => 'η',
            'ί' | 'ϊ' | 'ΐ' => 'ι',
            'ό' => 'ο',
            'ύ' | 'ϋ' | 'ΰ' => 'υ',
            'ώ' => 'ω',
            'ς' => 'σ',
            other => other,
        })
        .collect()
}
