//! Spelled-out amounts for invoices and the checkout summary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 10] = [
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];
const TEENS: [&str; 10] = [
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];
const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];
const SCALES: [(u64, &str); 3] = [
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Spell out a rupee amount, e.g. `"two thousand five hundred and fifty paise"`.
///
/// The fractional part is rounded to two digits and spelled as paise.
/// Negative amounts are prefixed with `"minus"`.
///
/// ```
/// use kp_core::amount_in_words;
/// use rust_decimal::Decimal;
///
/// assert_eq!(amount_in_words(Decimal::new(2500, 0)), "two thousand five hundred");
/// assert_eq!(amount_in_words(Decimal::new(1050, 2)), "ten and fifty paise");
/// ```
#[must_use]
pub fn amount_in_words(amount: Decimal) -> String {
    let magnitude = amount.abs();
    let mut rupees = magnitude.trunc().to_u64().unwrap_or(u64::MAX);
    let mut paise = ((magnitude - magnitude.trunc()) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0);
    if paise >= 100 {
        rupees = rupees.saturating_add(1);
        paise = 0;
    }

    let mut words = match (rupees, paise) {
        (0, 0) => return "zero".to_owned(),
        (0, p) => format!("{} paise", below_thousand(p)),
        (r, 0) => integer_words(r),
        (r, p) => format!("{} and {} paise", integer_words(r), below_thousand(p)),
    };
    if amount.is_sign_negative() {
        words.insert_str(0, "minus ");
    }
    words
}

fn integer_words(mut n: u64) -> String {
    let mut parts = Vec::new();
    for (scale, name) in SCALES {
        if n >= scale {
            parts.push(format!("{} {name}", integer_words(n / scale)));
            n %= scale;
        }
    }
    if n > 0 {
        parts.push(below_thousand(n));
    }
    parts.join(" ")
}

/// Words for `0 < n < 1000`.
fn below_thousand(n: u64) -> String {
    let hundreds = digit(n / 100);
    let rest = n % 100;
    let mut out = String::new();
    if hundreds > 0 {
        out.push_str(word(&ONES, hundreds));
        out.push_str(" hundred");
    }
    let tail = if (10..20).contains(&rest) {
        word(&TEENS, digit(rest - 10)).to_owned()
    } else {
        let tens = word(&TENS, digit(rest / 10));
        let ones = word(&ONES, digit(rest % 10));
        match (tens.is_empty(), ones.is_empty()) {
            (false, false) => format!("{tens}-{ones}"),
            (false, true) => tens.to_owned(),
            _ => ones.to_owned(),
        }
    };
    if !tail.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&tail);
    }
    out
}

fn digit(n: u64) -> usize {
    usize::try_from(n % 10).unwrap_or(0)
}

fn word(table: &[&'static str; 10], index: usize) -> &'static str {
    table.get(index).copied().unwrap_or("")
}
