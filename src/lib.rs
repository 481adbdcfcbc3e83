//! Record apartment bookings in a day-by-month grid and derive a ledger and statistics from it.
//!
//! Each cell of the grid holds a comma separated list of tokens such as `120:2024;APRIL`, so one
//! physical cell carries the bookings of many years. The `codec` module reads and writes the
//! tokens, `reconcile` merges new values into a cell, and `transcode` turns the grid into the flat
//! ledger that `stats` and `export` read.

pub mod args;
mod backup;
pub mod codec;
pub mod commands;
mod config;
mod db;
mod error;
pub mod import;
pub mod model;
pub mod reconcile;
mod session;
mod sheets;
pub mod stats;
pub mod store;
pub mod transcode;
mod utils;

#[cfg(test)]
mod test;

pub use backup::Backup;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use session::Session;
pub use store::{Backend, Store};
