//! Command handlers for the bookings CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod clear;
mod export;
mod import;
mod init;
mod set;
mod show;
mod stats;

use crate::backup::PRE_SAVE;
use crate::model::{Grid, Ledger};
use crate::{Config, Result, Session};
use chrono::{Datelike, Local};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use clear::clear;
pub use export::{export, ExportOut};
pub use import::{import, ImportOut};
pub use init::init;
pub use set::{expense, set, CellOut};
pub use show::show;
pub use stats::stats;

/// The output type for a command: a message for the user and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Opens a session over the stored grid, filing bare prices under `year`.
async fn open_session(config: &Config, year: i32) -> Result<(Session, Grid)> {
    let session = Session::open(config.store(), config.period(), year).await?;
    let stored = session.grid().clone();
    Ok((session, stored))
}

/// Backs up the stored grid, and the SQLite file when there is one, then saves the session.
async fn save_session(config: &Config, session: &mut Session, stored: &Grid) -> Result<Ledger> {
    let backup = config.backup();
    let path = backup.save_json(PRE_SAVE, stored).await?;
    debug!("Backed up the stored grid to {}", path.display());
    if let Some(path) = backup.copy_sqlite().await? {
        debug!("Backed up the database to {}", path.display());
    }
    session.save(config.store()).await
}

fn current_year() -> i32 {
    Local::now().year()
}

/// Formats an amount with thousands separators and two decimals.
fn money(value: impl Into<rust_decimal::Decimal>) -> String {
    use rust_decimal::prelude::ToPrimitive;
    format_num::format_num!(",.2", value.into().to_f64().unwrap_or_default())
}
