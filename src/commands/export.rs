use crate::args::{ExportArgs, LedgerKind};
use crate::commands::Out;
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Written at the start of exported files so that spreadsheet programs read them as UTF-8.
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExportOut {
    pub ledger: LedgerKind,
    pub rows: usize,
    pub path: Option<PathBuf>,
}

/// Writes the saved booking or expense ledger as CSV, to a file or to stdout.
pub async fn export(config: Config, args: ExportArgs) -> Result<Out<ExportOut>> {
    let ledger = config.store().load_ledger().await?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    let rows = match args.ledger() {
        LedgerKind::Bookings => {
            for row in &ledger.bookings {
                writer.serialize(row).context("Unable to serialize a booking")?;
            }
            ledger.bookings.len()
        }
        LedgerKind::Expenses => {
            for row in &ledger.expenses {
                writer.serialize(row).context("Unable to serialize an expense")?;
            }
            ledger.expenses.len()
        }
    };
    let data = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Unable to flush the CSV writer")?;

    match args.output() {
        Some(path) => {
            let mut contents = UTF8_BOM.as_bytes().to_vec();
            contents.extend(data);
            utils::write(path, contents).await?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&data)
                .and_then(|_| stdout.flush())
                .context("Unable to write to stdout")?;
        }
    }

    let out = ExportOut {
        ledger: args.ledger(),
        rows,
        path: args.output().map(|p| p.to_path_buf()),
    };
    let message = match &out.path {
        Some(path) => format!("Exported {} {} rows to {}", rows, out.ledger, path.display()),
        None => format!("Exported {} {} rows", rows, out.ledger),
    };
    Ok(Out::new(message, out))
}
