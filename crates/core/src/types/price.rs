//! Decimal prices and the store's display conventions.
//!
//! WooCommerce reports prices in two shapes: the REST API returns plain
//! decimal strings (`"2500"`), while WooGraphQL returns display strings with
//! a currency symbol and grouping (`"&#8377;2,500.00"`). [`parse_amount`]
//! accepts both and rejects anything that is not a number, so a bad price
//! never reaches a cart total.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currency prefixes stripped before parsing, longest first.
const CURRENCY_PREFIXES: &[&str] = &["INR", "Rs.", "Rs", "₹", "$", "€", "£"];

/// Errors that can occur when parsing a price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input contains no amount.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("price is not a number: {0:?}")]
    NotANumber(String),
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Parse a price string in the store currency.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the string is empty, not a number, or
    /// negative.
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        Ok(Self::new(parse_amount(raw)?, CurrencyCode::default()))
    }

    /// Format for display with no fraction digits, e.g. `₹1,23,456`.
    ///
    /// Amounts are rounded half away from zero. Rupee amounts use Indian
    /// digit grouping (lakh, crore); other currencies group by thousands.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let digits = rounded.abs().trunc().to_string();
        let grouped = match self.currency_code {
            CurrencyCode::INR => group_indian(&digits),
            _ => group_thousands(&digits),
        };
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        format!("{sign}{}{grouped}", self.currency_code.symbol())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

/// Format an amount in the store currency, e.g. `₹2,500`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::default()).display()
}

/// Parse a price amount from a REST or GraphQL price string.
///
/// Accepts plain decimals (`"2500"`, `"2500.50"`) and display strings with a
/// leading currency symbol, HTML entities, and comma grouping
/// (`"&#8377;2,500.00"`). Price ranges such as `"₹100 - ₹200"` are rejected.
///
/// # Errors
///
/// Returns a [`PriceError`] if the input is empty, not a number, or negative.
pub fn parse_amount(raw: &str) -> Result<Decimal, PriceError> {
    let decoded = strip_entities(raw.trim());
    let mut body = decoded.trim();
    for prefix in CURRENCY_PREFIXES {
        if let Some(rest) = body.strip_prefix(prefix) {
            body = rest.trim_start();
            break;
        }
    }

    let digits: String = body.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return Err(PriceError::Empty);
    }

    let amount =
        Decimal::from_str(&digits).map_err(|_| PriceError::NotANumber(raw.to_owned()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PriceError::Negative(amount));
    }
    Ok(amount)
}

/// Remove HTML character references such as `&#8377;` or `&nbsp;`.
fn strip_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        let (before, tail) = rest.split_at(start);
        out.push_str(before);
        match tail.find(';') {
            Some(end) if end <= 10 => rest = tail.split_at(end + 1).1,
            _ => {
                out.push('&');
                rest = tail.split_at(1).1;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Group digits as `12,34,567`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_owned();
    }
    let (mut head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    while head.len() > 2 {
        let (rest, pair) = head.split_at(head.len() - 2);
        groups.push(pair);
        head = rest;
    }
    groups.push(head);
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

/// Group digits as `1,234,567`.
fn group_thousands(digits: &str) -> String {
    let mut groups = Vec::new();
    let mut head = digits;
    while head.len() > 3 {
        let (rest, triple) = head.split_at(head.len() - 3);
        groups.push(triple);
        head = rest;
    }
    groups.push(head);
    groups.reverse();
    groups.join(",")
}
