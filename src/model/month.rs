use crate::model::fold;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A calendar month. The serialized form (`APRIL`) is the canonical, ASCII-safe code that is
/// embedded in tokens and stored in the database. The Greek display name is what the grid
/// columns are labelled with.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

serde_plain::derive_display_from_serialize!(Month);
serde_plain::derive_fromstr_from_deserialize!(Month);

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// The month number, 1 through 12.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Month::January => "Ιανουάριος",
            Month::February => "Φεβρουάριος",
            Month::March => "Μάρτιος",
            Month::April => "Απρίλιος",
            Month::May => "Μάιος",
            Month::June => "Ιούνιος",
            Month::July => "Ιούλιος",
            Month::August => "Αύγουστος",
            Month::September => "Σεπτέμβριος",
            Month::October => "Οκτώβριος",
            Month::November => "Νοέμβριος",
            Month::December => "Δεκέμβριος",
        }
    }

    /// Parses either the canonical code or the display name, ignoring case and accents.
    pub fn from_name(s: &str) -> Option<Month> {
        let folded = fold(s);
        Month::ALL.into_iter().find(|m| {
            folded == fold(m.display_name()) || folded == m.to_string().to_ascii_lowercase()
        })
    }

    /// The number of nights in this month for `year`, or `None` if `year` is out of range.
    pub fn days_in(&self, year: i32) -> Option<u32> {
        let first = NaiveDate::from_ymd_opt(year, self.number(), 1)?;
        let next = match self {
            Month::December => NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
            _ => NaiveDate::from_ymd_opt(year, self.number() + 1, 1)?,
        };
        let last = next.pred_opt()?;
        debug_assert_eq!(last.month(), first.month());
        Some(last.day())
    }
}
