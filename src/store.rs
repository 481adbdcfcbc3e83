//! The seam between the in-memory grid and where it is persisted.

use crate::model::{Grid, Ledger, Period};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A place the grid and its ledger are kept. Implementations hold no state between calls beyond
/// their location, every call opens what it needs and releases it before returning.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    /// Reads every stored cell that belongs to a month of `period`.
    async fn load_grid(&self, period: &Period) -> Result<Grid>;

    /// Writes `grid` and replaces the stored ledger with `ledger`. Either all of it is written or,
    /// where the backend allows it, none of it.
    async fn save(&self, grid: &Grid, ledger: &Ledger) -> Result<()>;

    /// Reads the ledger as it was written by the last `save`.
    async fn load_ledger(&self) -> Result<Ledger>;
}

/// Which `Store` a home directory uses.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A single SQLite database file.
    #[default]
    Sqlite,
    /// One CSV sheet per (year, month).
    Sheets,
}

serde_plain::derive_display_from_serialize!(Backend);
serde_plain::derive_fromstr_from_deserialize!(Backend);
