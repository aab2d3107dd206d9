//! Amount in words.

use kp_core::{amount_in_words, format_price, parse_amount};
use kp_storefront::StorefrontError;

/// Print the amount formatted and spelled out.
///
/// # Errors
///
/// Returns [`StorefrontError::BadRequest`] if the amount does not parse.
#[allow(clippy::print_stdout)]
pub fn run(raw: &str) -> kp_storefront::Result<()> {
    let amount = parse_amount(raw)
        .map_err(|e| StorefrontError::BadRequest(format!("invalid amount {raw:?}: {e}")))?;

    println!("{}", format_price(amount));
    println!("{}", amount_in_words(amount));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(run("abc"), Err(StorefrontError::BadRequest(_))));
    }

    #[test]
    fn test_accepts_currency_symbol() {
        assert!(run("₹2,500").is_ok());
    }
}
