// src/fx.rs
//! Fixed-point FX table for USD normalization of round amounts.
//!
//! Rates are deliberately static: amounts only feed a 10% duplicate-tolerance
//! check, so day-to-day drift is irrelevant. Unknown currencies convert to
//! `None` and the round is kept with `amount_usd = None`.

use rust_decimal::Decimal;

/// USD per one unit of `currency`. Case-insensitive ISO 4217 codes.
pub fn usd_rate(currency: &str) -> Option<Decimal> {
    let rate = match currency.trim().to_ascii_uppercase().as_str() {
        "USD" => Decimal::ONE,
        "EUR" => Decimal::new(108, 2),
        "GBP" => Decimal::new(127, 2),
        "CHF" => Decimal::new(112, 2),
        "SEK" => Decimal::new(95, 3),
        "NOK" => Decimal::new(94, 3),
        "DKK" => Decimal::new(145, 3),
        "CAD" => Decimal::new(73, 2),
        "JPY" => Decimal::new(67, 4),
        _ => return None,
    };
    Some(rate)
}

pub fn to_usd(amount: Decimal, currency: &str) -> Option<Decimal> {
    usd_rate(currency).map(|r| amount * r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eur_converts_and_usd_is_identity() {
        let m = Decimal::new(10_000_000, 0);
        assert_eq!(to_usd(m, "USD"), Some(m));
        assert_eq!(to_usd(m, "eur"), Some(Decimal::new(10_800_000, 0)));
    }

    #[test]
    fn unknown_currency_is_none() {
        assert_eq!(to_usd(Decimal::ONE, "XRP"), None);
        assert_eq!(usd_rate(""), None);
    }
}
