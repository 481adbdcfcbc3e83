//! The token codec.
//!
//! A cell of the booking grid stores its content as a comma separated list of tokens. Each token
//! is one priced record together with the key it is filed under:
//!
//! - revenue: `{price}:{year};{MONTH}`, e.g. `120:2024;APRIL`
//! - expense: `{price}:{year};{MONTH};EX`, e.g. `50:2024;APRIL;EX`
//!
//! Decoding is lenient. A token that does not match the grammar decodes to `None` and a cell
//! simply drops the segments that fail to decode.

use crate::model::{Month, Price};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::debug;

const EXPENSE_MARKER: &str = "EX";

/// Discriminates a booking (revenue) from an expense.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Revenue,
    Expense,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

/// The slot a token is filed under. A cell never holds two tokens with the same key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TokenKey {
    pub year: i32,
    pub month: Month,
    pub kind: Kind,
}

impl TokenKey {
    pub fn new(year: i32, month: Month, kind: Kind) -> Self {
        Self { year, month, kind }
    }

    pub fn revenue(year: i32, month: Month) -> Self {
        Self::new(year, month, Kind::Revenue)
    }

    pub fn expense(year: i32, month: Month) -> Self {
        Self::new(year, month, Kind::Expense)
    }
}

/// One priced record.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: Kind,
    pub year: i32,
    pub month: Month,
    pub price: Price,
}

impl Token {
    pub fn new(key: TokenKey, price: Price) -> Self {
        Self {
            kind: key.kind,
            year: key.year,
            month: key.month,
            price,
        }
    }

    pub fn key(&self) -> TokenKey {
        TokenKey::new(self.year, self.month, self.kind)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{};{}", self.price, self.year, self.month)?;
        if self.kind == Kind::Expense {
            write!(f, ";{EXPENSE_MARKER}")?;
        }
        Ok(())
    }
}

/// Matches `NUMBER:YEAR;MONTH[;EX]`. Returns `None` for anything else.
pub fn decode_token(text: &str) -> Option<Token> {
    let (price, rest) = text.trim().split_once(':')?;
    let price = Price::from_str(price).ok()?;

    let mut parts = rest.split(';');
    let year = parse_year(parts.next()?)?;
    let month = Month::from_str(parts.next()?).ok()?;
    let kind = match parts.next() {
        None => Kind::Revenue,
        Some(EXPENSE_MARKER) => Kind::Expense,
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }

    Some(Token {
        kind,
        year,
        month,
        price,
    })
}

pub fn encode_token(token: &Token) -> String {
    token.to_string()
}

/// Splits `text` on commas and decodes each segment, discarding the segments that do not decode.
pub fn decode_cell(text: &str) -> Vec<Token> {
    text.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let token = decode_token(segment);
            if token.is_none() {
                debug!("Dropping malformed token '{segment}'");
            }
            token
        })
        .collect()
}

pub fn encode_cell(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(encode_token)
        .collect::<Vec<String>>()
        .join(",")
}

/// A year is exactly four ASCII digits.
fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
