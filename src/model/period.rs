use crate::model::Month;
use crate::Result;
use anyhow::ensure;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Every month has rows for days 1 through 31. Combinations such as 31 April are kept in the
/// grid but are expected to stay empty.
pub const DAYS: RangeInclusive<u8> = 1..=31;

/// The ordered list of months that make up a season. The season is configurable, the default
/// is April through October.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Period {
    months: Vec<Month>,
}

impl Default for Period {
    fn default() -> Self {
        Self {
            months: vec![
                Month::April,
                Month::May,
                Month::June,
                Month::July,
                Month::August,
                Month::September,
                Month::October,
            ],
        }
    }
}

impl Period {
    pub fn new(months: impl IntoIterator<Item = Month>) -> Result<Self> {
        let months: Vec<Month> = months.into_iter().collect();
        ensure!(!months.is_empty(), "A period must have at least one month");
        let unique: BTreeSet<Month> = months.iter().copied().collect();
        ensure!(
            unique.len() == months.len(),
            "A period must not list the same month twice"
        );
        Ok(Self { months })
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn contains(&self, month: Month) -> bool {
        self.months.contains(&month)
    }

    /// The position of `month` in the period, used to order months the way the season runs.
    pub fn position(&self, month: Month) -> Option<usize> {
        self.months.iter().position(|&m| m == month)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let months: Vec<Month> = Vec::deserialize(deserializer)?;
        Period::new(months).map_err(serde::de::Error::custom)
    }
}
