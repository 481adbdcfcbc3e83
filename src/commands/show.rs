use crate::args::ShowArgs;
use crate::commands::{open_session, Out};
use crate::model::{Floor, LedgerRow, Month};
use crate::{Config, Result};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Lists the bookings of one year, a block per month with a line per booked day.
pub async fn show(config: Config, args: ShowArgs) -> Result<Out<Vec<LedgerRow>>> {
    let (session, _) = open_session(&config, args.year()).await?;
    let rows: Vec<LedgerRow> = session
        .ledger()
        .bookings
        .into_iter()
        .filter(|r| r.year == args.year())
        .filter(|r| args.month().map(|m| m == r.month).unwrap_or(true))
        .collect();

    if rows.is_empty() {
        return Ok(Out::new(format!("No bookings in {}", args.year()), rows));
    }
    Ok(Out::new(render(args.year(), &rows), rows))
}

fn render(year: i32, rows: &[LedgerRow]) -> String {
    // Ledger rows are already in period order, so insertion order is kept per month.
    let mut months: Vec<(Month, BTreeMap<u8, BTreeMap<Floor, String>>)> = Vec::new();
    for row in rows {
        if months.last().map(|(m, _)| *m != row.month).unwrap_or(true) {
            months.push((row.month, BTreeMap::new()));
        }
        if let Some((_, days)) = months.last_mut() {
            days.entry(row.day)
                .or_default()
                .insert(row.floor, row.price.to_string());
        }
    }

    let mut out = String::new();
    for (month, days) in months {
        let _ = writeln!(out, "\n{} {year}", month.display_name());
        let _ = write!(out, "{:>5}", "");
        for floor in Floor::BOOKABLE {
            let _ = write!(out, "{:>10}", floor.display_name());
        }
        let _ = writeln!(out);
        for (day, prices) in days {
            let _ = write!(out, "{day:>5}");
            for floor in Floor::BOOKABLE {
                let price = prices.get(&floor).map(String::as_str).unwrap_or("-");
                let _ = write!(out, "{price:>10}");
            }
            let _ = writeln!(out);
        }
    }
    out
}
