//! Country codes, the per-country configuration lookup and price
//! localization.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

/// Splits an ad-copy id into its base slug and country suffix.
///
/// Only a trailing segment of exactly two ASCII letters counts as a country
/// code, so slugs such as `garden-bench` stay locale-agnostic. The returned
/// code is lowercased.
pub fn split_country_suffix(id: &str) -> (&str, Option<String>) {
    match id.rsplit_once('-') {
        Some((base, suffix)) if !base.is_empty() && is_country_code(suffix) => {
            (base, Some(suffix.to_ascii_lowercase()))
        }
        _ => (id, None),
    }
}

/// Like [`split_country_suffix`], but a suffix `countries` does not know
/// stays part of the slug.
pub fn split_known_country_suffix<'a>(
    id: &'a str,
    countries: &dyn CountryDirectory,
) -> (&'a str, Option<String>) {
    match split_country_suffix(id) {
        (base, Some(code)) if countries.lookup(&code).is_some() => (base, Some(code)),
        _ => (id, None),
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Trims and lowercases a two-letter country code.
pub fn normalize_country_code(code: &str) -> Result<String, AppResponse> {
    let trimmed = code.trim();
    if !is_country_code(trimmed) {
        return Err(AppResponse::ValidationError(format!(
            "Invalid country code: '{code}'"
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryConfig {
    pub code: String,
    pub name: String,
    pub language: String,
    pub currency_symbol: String,
    pub symbol_position: SymbolPosition,
    pub decimal_separator: char,
}

impl CountryConfig {
    /// Renders `price` in this country's currency format.
    ///
    /// Anything that is not a digit or a separator is dropped first, so
    /// `"$49.99"` and `"49,99"` both work. The last separator is the decimal
    /// mark when both `.` and `,` appear. A lone kind of separator is a
    /// thousands separator when it repeats or is followed by exactly three
    /// digits (`"1,234"`), otherwise it is the decimal mark. A price with no
    /// digits is returned trimmed and untouched.
    pub fn format_price(&self, price: &str) -> String {
        let cleaned: String = price
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();
        if !cleaned.chars().any(|c| c.is_ascii_digit()) {
            return price.trim().to_string();
        }

        let decimal_at = decimal_mark_position(&cleaned);
        let amount: String = cleaned
            .char_indices()
            .filter_map(|(i, c)| match c {
                '.' | ',' if Some(i) == decimal_at => Some(self.decimal_separator),
                '.' | ',' => None,
                digit => Some(digit),
            })
            .collect();

        match self.symbol_position {
            SymbolPosition::Before => format!("{}{}", self.currency_symbol, amount),
            SymbolPosition::After => format!("{} {}", amount, self.currency_symbol),
        }
    }
}

/// Byte offset of the decimal mark in a string of digits and separators.
fn decimal_mark_position(cleaned: &str) -> Option<usize> {
    let last = cleaned.rfind(|c: char| c == '.' || c == ',')?;
    let (mark, other) = if cleaned[last..].starts_with('.') {
        ('.', ',')
    } else {
        (',', '.')
    };
    if cleaned.contains(other) {
        return Some(last);
    }

    let repeated = cleaned.matches(mark).count() > 1;
    let grouped = cleaned.len() - last - 1 == 3;
    if repeated || grouped {
        None
    } else {
        Some(last)
    }
}

/// Country configuration lookup.
pub trait CountryDirectory {
    /// `code` is already normalized to lowercase.
    fn lookup(&self, code: &str) -> Option<CountryConfig>;
}

/// The storefront's shipping countries.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCountries;

// code, name, language, symbol, position, decimal separator
const BUILTIN: [(&str, &str, &str, &str, SymbolPosition, char); 12] = [
    ("us", "United States", "en", "$", SymbolPosition::Before, '.'),
    ("ca", "Canada", "en", "CA$", SymbolPosition::Before, '.'),
    ("gb", "United Kingdom", "en", "£", SymbolPosition::Before, '.'),
    ("au", "Australia", "en", "A$", SymbolPosition::Before, '.'),
    ("ie", "Ireland", "en", "€", SymbolPosition::Before, '.'),
    ("fr", "France", "fr", "€", SymbolPosition::After, ','),
    ("de", "Germany", "de", "€", SymbolPosition::After, ','),
    ("es", "Spain", "es", "€", SymbolPosition::After, ','),
    ("it", "Italy", "it", "€", SymbolPosition::After, ','),
    ("nl", "Netherlands", "nl", "€", SymbolPosition::Before, ','),
    ("se", "Sweden", "sv", "kr", SymbolPosition::After, ','),
    ("dk", "Denmark", "da", "kr.", SymbolPosition::After, ','),
];

impl CountryDirectory for BuiltinCountries {
    fn lookup(&self, code: &str) -> Option<CountryConfig> {
        BUILTIN
            .iter()
            .find(|(c, ..)| c.eq_ignore_ascii_case(code))
            .map(
                |&(code, name, language, symbol, symbol_position, decimal_separator)| {
                    CountryConfig {
                        code: code.to_string(),
                        name: name.to_string(),
                        language: language.to_string(),
                        currency_symbol: symbol.to_string(),
                        symbol_position,
                        decimal_separator,
                    }
                },
            )
    }
}

/// A directory given explicitly, e.g. loaded from the site configuration.
impl CountryDirectory for Vec<CountryConfig> {
    fn lookup(&self, code: &str) -> Option<CountryConfig> {
        self.iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned()
    }
}
