use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::utils::error::AppError;
use crate::Result;

/// Extracts a positive amount from price text scraped off a product page.
///
/// Handles grouping with spaces (including non-breaking and thin spaces), apostrophes,
/// commas or dots, and either `,` or `.` as the decimal separator. Currency symbols and
/// words around the number are ignored.
pub struct PriceParser {
    number_regex: Regex,
}

impl PriceParser {
    pub fn new() -> Self {
        PriceParser {
            number_regex: Regex::new(r"[0-9][0-9\s.,']*").unwrap(),
        }
    }

    pub fn parse(&self, text: &str) -> Result<Decimal> {
        let invalid = || AppError::InvalidPrice {
            value: text.trim().to_string(),
        };

        let run = self.number_regex.find(text).ok_or_else(invalid)?;
        let compact: String = run
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\'')
            .collect();
        let compact = compact.trim_end_matches(['.', ',']);

        let normalized = normalize_separators(compact);
        let price = Decimal::from_str(&normalized).map_err(|_| invalid())?;

        if price <= Decimal::ZERO {
            return Err(invalid());
        }

        Ok(price)
    }
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_separators(raw: &str) -> String {
    let decimal_sep = match (raw.rfind(','), raw.rfind('.')) {
        (Some(comma), Some(dot)) => Some(if comma > dot { ',' } else { '.' }),
        (Some(_), None) => lone_decimal_separator(raw, ','),
        (None, Some(_)) => lone_decimal_separator(raw, '.'),
        (None, None) => None,
    };

    raw.chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            c if Some(c) == decimal_sep => Some('.'),
            _ => None,
        })
        .collect()
}

// A separator used once and not followed by a three digit group marks decimals.
// A lone leading zero cannot start a thousands group, so `0.999` stays fractional.
fn lone_decimal_separator(raw: &str, sep: char) -> Option<char> {
    if raw.matches(sep).count() > 1 {
        return None;
    }
    let pos = raw.rfind(sep)?;
    let fraction = &raw[pos + sep.len_utf8()..];
    if fraction.len() == 3 && &raw[..pos] != "0" {
        None
    } else {
        Some(sep)
    }
}
