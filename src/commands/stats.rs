use crate::args::StatsArgs;
use crate::commands::{money, Out};
use crate::stats::{self, Stats, StatsFilter};
use crate::{Config, Result};
use std::fmt::Write;

/// Computes statistics from the saved ledger.
pub async fn stats(config: Config, args: StatsArgs) -> Result<Out<Stats>> {
    let ledger = config.store().load_ledger().await?;
    let filter = StatsFilter {
        floors: args.floors().to_vec(),
        from_year: args.from_year(),
        to_year: args.to_year(),
    };
    let stats = stats::compute(&ledger, config.period(), &filter);
    Ok(Out::new(summary(&stats), stats))
}

fn summary(stats: &Stats) -> String {
    let mut out = String::new();
    let _ = write!(out, "{} bookings", stats.total_bookings);
    if let Some(year) = stats.latest_year {
        let _ = write!(out, ", latest year {year}");
    }
    for year in &stats.per_year {
        let _ = write!(
            out,
            "\n{}: {} bookings, revenue {}, expenses {}, net {}",
            year.year,
            year.bookings,
            money(year.revenue),
            money(year.expenses),
            money(year.net)
        );
        if let Some(mean) = year.mean_price {
            let _ = write!(out, ", mean price {}", money(mean));
        }
    }
    let busiest = stats
        .seasonality
        .iter()
        .filter(|m| m.bookings > 0)
        .max_by_key(|m| m.bookings);
    if let Some(month) = busiest {
        let _ = write!(
            out,
            "\nBusiest month: {} ({} bookings)",
            month.month.display_name(),
            month.bookings
        );
    }
    out
}
