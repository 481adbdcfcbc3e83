//! Statistics derived from the ledger: counts, revenue, expenses, seasonality and occupancy.
//!
//! Everything here is a pure function of a `Ledger`, nothing reads the grid.

use crate::model::{Floor, Ledger, LedgerRow, Month, Period, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Restricts which ledger rows are counted.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatsFilter {
    /// Only count these floors. Empty means all floors.
    pub floors: Vec<Floor>,
    /// Inclusive lower bound on the year.
    pub from_year: Option<i32>,
    /// Inclusive upper bound on the year.
    pub to_year: Option<i32>,
}

impl StatsFilter {
    fn floor_ok(&self, floor: Floor) -> bool {
        self.floors.is_empty() || self.floors.contains(&floor)
    }

    fn year_ok(&self, year: i32) -> bool {
        self.from_year.map(|y| year >= y).unwrap_or(true)
            && self.to_year.map(|y| year <= y).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub bookings: usize,
    pub revenue: Price,
    /// The mean price of a booked night, `None` when there were no bookings.
    pub mean_price: Option<Decimal>,
    pub expenses: Price,
    /// Revenue minus expenses, may be negative.
    pub net: Decimal,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FloorSummary {
    pub year: i32,
    pub floor: Floor,
    pub bookings: usize,
    pub revenue: Price,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: Month,
    pub bookings: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HeatCell {
    pub month: Month,
    pub day: u8,
    pub bookings: usize,
}

/// The share of nights in a month that a floor was booked.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub year: i32,
    pub month: Month,
    pub floor: Floor,
    pub booked_nights: usize,
    pub nights: u32,
    /// `booked_nights / nights`, rounded to four decimal places.
    pub rate: Decimal,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_bookings: usize,
    pub latest_year: Option<i32>,
    pub per_year: Vec<YearSummary>,
    pub per_year_floor: Vec<FloorSummary>,
    /// Bookings per month, all years together, in the order of the period.
    pub seasonality: Vec<MonthCount>,
    /// Bookings per (month, day), only non-zero cells.
    pub heatmap: Vec<HeatCell>,
    pub occupancy: Vec<Occupancy>,
}

/// Computes all statistics for the rows of `ledger` that pass `filter`.
pub fn compute(ledger: &Ledger, period: &Period, filter: &StatsFilter) -> Stats {
    let bookings: Vec<&LedgerRow> = ledger
        .bookings
        .iter()
        .filter(|r| filter.floor_ok(r.floor) && filter.year_ok(r.year))
        .collect();

    let mut per_year: BTreeMap<i32, (usize, Price, Price)> = BTreeMap::new();
    let mut per_year_floor: BTreeMap<(i32, Floor), (usize, Price)> = BTreeMap::new();
    let mut per_month: BTreeMap<Month, usize> = BTreeMap::new();
    let mut heat: BTreeMap<(usize, u8), (Month, usize)> = BTreeMap::new();
    let mut nights: BTreeMap<(i32, usize, Floor), (Month, usize)> = BTreeMap::new();
    let month_order = |m: Month| period.position(m).unwrap_or(usize::MAX);

    for row in &bookings {
        let year = per_year.entry(row.year).or_default();
        year.0 += 1;
        year.1 = year.1 + row.price;

        let floor = per_year_floor.entry((row.year, row.floor)).or_default();
        floor.0 += 1;
        floor.1 = floor.1 + row.price;

        *per_month.entry(row.month).or_default() += 1;
        heat.entry((month_order(row.month), row.day))
            .or_insert((row.month, 0))
            .1 += 1;
        nights
            .entry((row.year, month_order(row.month), row.floor))
            .or_insert((row.month, 0))
            .1 += 1;
    }

    for row in ledger
        .expenses
        .iter()
        .filter(|r| filter.floor_ok(r.category) && filter.year_ok(r.year))
    {
        let year = per_year.entry(row.year).or_default();
        year.2 = year.2 + row.price;
    }

    Stats {
        total_bookings: bookings.len(),
        latest_year: bookings.iter().map(|r| r.year).max(),
        per_year: per_year
            .into_iter()
            .map(|(year, (count, revenue, expenses))| YearSummary {
                year,
                bookings: count,
                revenue,
                mean_price: mean(revenue, count),
                expenses,
                net: revenue.value() - expenses.value(),
            })
            .collect(),
        per_year_floor: per_year_floor
            .into_iter()
            .map(|((year, floor), (count, revenue))| FloorSummary {
                year,
                floor,
                bookings: count,
                revenue,
            })
            .collect(),
        seasonality: period
            .months()
            .iter()
            .map(|&month| MonthCount {
                month,
                bookings: per_month.get(&month).copied().unwrap_or_default(),
            })
            .collect(),
        heatmap: heat
            .into_iter()
            .map(|((_, day), (month, count))| HeatCell {
                month,
                day,
                bookings: count,
            })
            .collect(),
        occupancy: nights
            .into_iter()
            .filter_map(|((year, _, floor), (month, booked))| {
                let nights = month.days_in(year)?;
                // Bookings on day 31 of a 30 day month are still counted, so cap the rate.
                let rate = (Decimal::from(booked as u64) / Decimal::from(nights))
                    .min(Decimal::ONE)
                    .round_dp(4);
                Some(Occupancy {
                    year,
                    month,
                    floor,
                    booked_nights: booked,
                    nights,
                    rate,
                })
            })
            .collect(),
    }
}

fn mean(total: Price, count: usize) -> Option<Decimal> {
    if count == 0 {
        return None;
    }
    Some((total.value() / Decimal::from(count as u64)).round_dp(2))
}
