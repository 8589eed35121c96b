//! Conversions between client-facing decimal amounts and stored integer cents.
//!
//! Clients send prices, tax and discounts as decimal currency amounts, either as
//! JSON numbers or numeric strings. Everything is stored as integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Largest invoice amount accepted, in cents (one billion currency units).
pub const MAX_INVOICE_CENTS: i64 = 100_000_000_000;

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        // Going through the textual form keeps `0.1` exact instead of its f64 expansion.
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Decimal currency amount to cents, rounding half away from zero.
pub fn to_cents(value: &Value) -> Option<i64> {
    let amount = parse_decimal(value)?;
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Cents for an optional amount; missing, unparseable and negative values become 0.
pub fn non_negative_cents(value: Option<&Value>) -> i64 {
    value.and_then(to_cents).unwrap_or(0).max(0)
}

/// Whole quantity of at least 1. Fractions are truncated; anything unparseable is 1.
pub fn normalize_quantity(value: Option<&Value>) -> i64 {
    let quantity = value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    });

    match quantity {
        Some(q) if q >= 1 => q,
        _ => 1,
    }
}

/// Cents as a 2-place decimal for responses.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
