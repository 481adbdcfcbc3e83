//! The editing session: the grid as last reconciled, the year new entries are filed under and
//! whether there are changes that have not been saved yet.
//!
//! The session owns no logic of its own. Every edit runs the old cell text through a reconcile
//! function and stores whatever comes back.

use crate::codec::{Kind, TokenKey};
use crate::import::{self, MergePolicy, Normalized};
use crate::model::{CellRef, ExpenseRef, Grid, Ledger, Month, Period};
use crate::reconcile::{self, EntryContext};
use crate::store::Store;
use crate::transcode::grid_to_ledger;
use crate::Result;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Session {
    grid: Grid,
    year: i32,
    dirty: bool,
}

impl Session {
    /// A session over an empty grid.
    pub fn new(period: Period, year: i32) -> Self {
        Self::with_grid(Grid::new(period), year)
    }

    pub fn with_grid(grid: Grid, year: i32) -> Self {
        Self {
            grid,
            year,
            dirty: false,
        }
    }

    /// Loads the stored grid for `period`.
    pub async fn open(store: &dyn Store, period: &Period, year: i32) -> Result<Self> {
        let grid = store.load_grid(period).await?;
        Ok(Self::with_grid(grid, year))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The year that bare prices are filed under.
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn set_year(&mut self, year: i32) {
        self.year = year;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reconciles `input` into a day cell. Returns whether the cell changed.
    pub fn submit(&mut self, cell: CellRef, input: &str) -> Result<bool> {
        let context = EntryContext::new(self.year, cell.month, Kind::Revenue);
        let before = self.grid.get(&cell).to_string();
        let after = reconcile::apply_input(&before, input, context);
        self.replace(cell, before, after)
    }

    /// Reconciles `input` into a month-level expense cell. Returns whether the cell changed.
    pub fn submit_expense(&mut self, cell: ExpenseRef, input: &str) -> Result<bool> {
        let context = EntryContext::new(self.year, cell.month, Kind::Expense);
        let before = self.grid.expense(&cell).to_string();
        let after = reconcile::apply_input(&before, input, context);
        if before == after {
            return Ok(false);
        }
        self.grid.set_expense(cell, after)?;
        self.dirty = true;
        Ok(true)
    }

    /// Removes the entry of the session year and `kind` from a day cell.
    pub fn clear_entry(&mut self, cell: CellRef, kind: Kind) -> Result<bool> {
        let key = TokenKey::new(self.year, cell.month, kind);
        let before = self.grid.get(&cell).to_string();
        let after = reconcile::clear_entry(&before, key);
        self.replace(cell, before, after)
    }

    /// Removes the expense of the session year from a month-level expense cell.
    pub fn clear_expense(&mut self, cell: ExpenseRef) -> Result<bool> {
        let key = TokenKey::expense(self.year, cell.month);
        let before = self.grid.expense(&cell).to_string();
        let after = reconcile::clear_entry(&before, key);
        if before == after {
            return Ok(false);
        }
        self.grid.set_expense(cell, after)?;
        self.dirty = true;
        Ok(true)
    }

    /// Clears `month`, either for one year or, with `None`, for every year.
    pub fn clear_month(&mut self, month: Month, year: Option<i32>) {
        match year {
            Some(year) => self.grid.clear_month_year(month, year),
            None => self.grid.clear_month(month),
        }
        self.dirty = true;
    }

    pub fn clear_all(&mut self) {
        self.grid.clear_all();
        self.dirty = true;
    }

    /// Applies normalized import records with `policy`. Nothing changes when the import fails.
    pub fn import(&mut self, normalized: &Normalized, policy: MergePolicy) -> Result<()> {
        let grid = import::apply(&self.grid, normalized, policy)?;
        if grid != self.grid {
            self.grid = grid;
            self.dirty = true;
        }
        Ok(())
    }

    /// The ledger of the current, possibly unsaved, grid.
    pub fn ledger(&self) -> Ledger {
        grid_to_ledger(&self.grid)
    }

    /// Rebuilds the ledger and writes it with the grid. When the store fails the error is returned
    /// and the session keeps its grid and stays dirty, so the save can be retried.
    pub async fn save(&mut self, store: &dyn Store) -> Result<Ledger> {
        let ledger = self.ledger();
        if let Err(e) = store.save(&self.grid, &ledger).await {
            warn!("The save failed, the unsaved changes are kept: {e}");
            return Err(e);
        }
        debug!(
            "Saved {} bookings and {} expenses",
            ledger.bookings.len(),
            ledger.expenses.len()
        );
        self.dirty = false;
        Ok(ledger)
    }

    fn replace(&mut self, cell: CellRef, before: String, after: String) -> Result<bool> {
        if before == after {
            return Ok(false);
        }
        self.grid.set(cell, after)?;
        self.dirty = true;
        Ok(true)
    }
}
