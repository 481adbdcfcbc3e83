//! The cell reconciler.
//!
//! New values are merged into a cell one key at a time. Writing a price for a
//! (year, month, kind) key replaces whatever the cell held for that key and leaves every other
//! token alone, so entries for other years that share the physical cell survive.
//!
//! Every function here takes the old cell text and returns the new cell text. Nothing is mutated
//! in place.

use crate::codec::{decode_cell, decode_token, encode_cell, Kind, Token, TokenKey};
use crate::model::{Month, Price};
use std::str::FromStr;
use tracing::debug;

/// The year, month and kind that a bare number typed into a cell is filed under. The year is
/// always supplied by the caller, it is never guessed from the text.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EntryContext {
    pub year: i32,
    pub month: Month,
    pub kind: Kind,
}

impl EntryContext {
    pub fn new(year: i32, month: Month, kind: Kind) -> Self {
        Self { year, month, kind }
    }

    fn key(&self) -> TokenKey {
        TokenKey::new(self.year, self.month, self.kind)
    }
}

/// Writes `new_price` into the slot for `key`. A `None` price leaves the cell exactly as it was.
pub fn apply_entry(existing: &str, key: TokenKey, new_price: Option<Price>) -> String {
    let Some(price) = new_price else {
        return existing.to_string();
    };
    let mut tokens = decode_cell(existing);
    tokens.retain(|t| t.key() != key);
    tokens.push(Token::new(key, price));
    encode_cell(&dedupe_by_key(tokens))
}

/// Merges already decoded tokens into the cell, each against its own key.
pub fn merge_tokens(existing: &str, incoming: impl IntoIterator<Item = Token>) -> String {
    let mut tokens = decode_cell(existing);
    tokens.extend(incoming);
    encode_cell(&dedupe_by_key(tokens))
}

/// Parses free text typed into a cell and reconciles every value it contains. Blank input, or
/// input in which nothing parses, leaves the cell unchanged.
pub fn apply_input(existing: &str, input: &str, context: EntryContext) -> String {
    let entered = parse_input(input, context);
    if entered.is_empty() {
        return existing.to_string();
    }
    entered.into_iter().fold(existing.to_string(), |text, token| {
        apply_entry(&text, token.key(), Some(token.price))
    })
}

/// Removes the token for `key`, if any. This is the explicit way to delete a value.
pub fn clear_entry(existing: &str, key: TokenKey) -> String {
    let tokens: Vec<Token> = decode_cell(existing)
        .into_iter()
        .filter(|t| t.key() != key)
        .collect();
    encode_cell(&dedupe_by_key(tokens))
}

/// Removes every token of `year`, of both kinds.
pub fn clear_year(existing: &str, year: i32) -> String {
    let tokens: Vec<Token> = decode_cell(existing)
        .into_iter()
        .filter(|t| t.year != year)
        .collect();
    encode_cell(&dedupe_by_key(tokens))
}

/// Re-encodes the cell in canonical form.
pub fn normalize(existing: &str) -> String {
    encode_cell(&dedupe_by_key(decode_cell(existing)))
}

/// Keeps only the last token for each key. The surviving token takes the position of its last
/// occurrence.
pub fn dedupe_by_key(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        out.retain(|t| t.key() != token.key());
        out.push(token);
    }
    out
}

/// Splits raw cell input on commas. Each segment may be
/// - a full token, `120:2024;APRIL`, filed under its own key
/// - a bare price, `120`, filed under the context key
/// - the two-digit year shorthand, `24:120`, filed under year 2024 and the context month/kind
///
/// Anything else is dropped.
pub fn parse_input(input: &str, context: EntryContext) -> Vec<Token> {
    input
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let token = parse_segment(segment, context);
            if token.is_none() {
                debug!("Ignoring unrecognized input '{segment}'");
            }
            token
        })
        .collect()
}

fn parse_segment(segment: &str, context: EntryContext) -> Option<Token> {
    if let Some(token) = decode_token(segment) {
        return Some(token);
    }
    if let Ok(price) = Price::from_str(segment) {
        return Some(Token::new(context.key(), price));
    }
    let (yy, price) = segment.split_once(':')?;
    let yy = yy.trim();
    if yy.len() != 2 || !yy.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = 2000 + yy.parse::<i32>().ok()?;
    let price = Price::from_str(price).ok()?;
    Some(Token::new(
        TokenKey::new(year, context.month, context.kind),
        price,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Option<Price> {
        Some(Price::from_str(s).unwrap())
    }

    fn april(year: i32) -> TokenKey {
        TokenKey::revenue(year, Month::April)
    }

    fn keys_are_unique(text: &str) -> bool {
        let tokens = decode_cell(text);
        let mut keys: Vec<TokenKey> = tokens.iter().map(Token::key).collect();
        keys.sort();
        keys.dedup();
        keys.len() == tokens.len()
    }

    #[test]
    fn test_apply_entry_into_empty_cell() {
        assert_eq!(apply_entry("", april(2024), price("100")), "100:2024;APRIL");
    }

    #[test]
    fn test_apply_entry_replaces_same_key() {
        let out = apply_entry("100:2024;APRIL", april(2024), price("150"));
        assert_eq!(out, "150:2024;APRIL");
    }

    #[test]
    fn test_apply_entry_keeps_other_years() {
        let out = apply_entry("80:2023;APRIL", april(2024), price("120"));
        assert_eq!(out, "80:2023;APRIL,120:2024;APRIL");
    }

    #[test]
    fn test_apply_entry_keeps_other_kinds() {
        let out = apply_entry(
            "100:2024;APRIL",
            TokenKey::expense(2024, Month::April),
            price("30"),
        );
        assert_eq!(out, "100:2024;APRIL,30:2024;APRIL;EX");
    }

    #[test]
    fn test_apply_entry_none_is_a_no_op() {
        let existing = "80:2023;APRIL";
        assert_eq!(apply_entry(existing, april(2023), None), existing);
        let odd = " 80:2023;APRIL , junk";
        assert_eq!(apply_entry(odd, april(2023), None), odd);
    }

    #[test]
    fn test_apply_entry_drops_garbage_and_duplicates() {
        let existing = "100:2024;APRIL,junk,110:2024;APRIL,90:2023;APRIL";
        let out = apply_entry(existing, TokenKey::revenue(2022, Month::April), price("70"));
        assert_eq!(out, "110:2024;APRIL,90:2023;APRIL,70:2022;APRIL");
    }

    #[test]
    fn test_key_uniqueness_after_many_applies() {
        let mut text = String::new();
        for (year, p) in [(2024, "1"), (2023, "2"), (2024, "3"), (2024, "4"), (2023, "5")] {
            text = apply_entry(&text, april(year), price(p));
            assert!(keys_are_unique(&text), "duplicate key in '{text}'");
        }
        assert_eq!(text, "4:2024;APRIL,5:2023;APRIL");
    }

    #[test]
    fn test_dedupe_by_key_last_wins() {
        let tokens = decode_cell("1:2024;MAY,2:2023;MAY,3:2024;MAY");
        let deduped = dedupe_by_key(tokens);
        assert_eq!(encode_cell(&deduped), "2:2023;MAY,3:2024;MAY");
    }

    #[test]
    fn test_merge_tokens() {
        let incoming = decode_cell("200:2025;JUNE");
        let out = merge_tokens("100:2024;JUNE,150:2025;JUNE", incoming);
        assert_eq!(out, "100:2024;JUNE,200:2025;JUNE");
    }

    #[test]
    fn test_parse_input_bare_number_uses_context() {
        let ctx = EntryContext::new(2025, Month::July, Kind::Revenue);
        let tokens = parse_input("95", ctx);
        assert_eq!(encode_cell(&tokens), "95:2025;JULY");
    }

    #[test]
    fn test_parse_input_mixed() {
        let ctx = EntryContext::new(2025, Month::July, Kind::Expense);
        let tokens = parse_input("95, 80:2024;JULY, 23:60, nonsense, 7:2024;JULY;EX", ctx);
        assert_eq!(
            encode_cell(&tokens),
            "95:2025;JULY;EX,80:2024;JULY,60:2023;JULY;EX,7:2024;JULY;EX"
        );
    }

    #[test]
    fn test_apply_input_blank_is_a_no_op() {
        let ctx = EntryContext::new(2024, Month::April, Kind::Revenue);
        assert_eq!(apply_input("80:2023;APRIL", "   ", ctx), "80:2023;APRIL");
        assert_eq!(apply_input("80:2023;APRIL", "n/a", ctx), "80:2023;APRIL");
    }

    #[test]
    fn test_apply_input_each_value_against_its_own_key() {
        let ctx = EntryContext::new(2024, Month::April, Kind::Revenue);
        let out = apply_input("80:2023;APRIL,100:2024;APRIL", "120, 85:2023;APRIL", ctx);
        assert_eq!(out, "120:2024;APRIL,85:2023;APRIL");
        assert!(keys_are_unique(&out));
    }

    #[test]
    fn test_apply_input_duplicate_values_last_wins() {
        let ctx = EntryContext::new(2024, Month::April, Kind::Revenue);
        assert_eq!(apply_input("", "100, 110", ctx), "110:2024;APRIL");
    }

    #[test]
    fn test_clear_entry() {
        let out = clear_entry("80:2023;APRIL,100:2024;APRIL", april(2024));
        assert_eq!(out, "80:2023;APRIL");
        assert_eq!(clear_entry("80:2023;APRIL", april(2024)), "80:2023;APRIL");
    }

    #[test]
    fn test_clear_year() {
        let out = clear_year("80:2023;APRIL,100:2024;APRIL,5:2024;APRIL;EX", 2024);
        assert_eq!(out, "80:2023;APRIL");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(" 100.00:2024;APRIL ,junk, 90:2024;APRIL"),
            "90:2024;APRIL"
        );
    }
}
