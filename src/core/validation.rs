//! Input validation shared by the managers.

use crate::errors::{Error, Result};

/// Trims `name` and rejects it when empty.
pub fn require_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("{what} name cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

/// Accepts finite, non-negative prices.
pub fn require_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(price)
}

/// Largest quantity a single line item may carry.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Line item quantities are whole units, between one and [`MAX_QUANTITY`].
pub fn require_quantity(quantity: i64) -> Result<i64> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(Error::Validation {
            message: format!("Quantity must be between 1 and {MAX_QUANTITY}, got {quantity}"),
        });
    }
    Ok(quantity)
}

fn units_overflow() -> Error {
    Error::Validation {
        message: "Unit count out of range".to_string(),
    }
}

/// Sums unit counts, failing instead of wrapping.
pub fn sum_units<I>(quantities: I) -> Result<i64>
where
    I: IntoIterator<Item = i64>,
{
    quantities
        .into_iter()
        .try_fold(0_i64, |total, quantity| {
            total.checked_add(quantity).ok_or_else(units_overflow)
        })
}

/// `total - quantity`, failing instead of wrapping.
pub fn subtract_units(total: i64, quantity: i64) -> Result<i64> {
    total.checked_sub(quantity).ok_or_else(units_overflow)
}

/// VAT is a percentage between 0 and 100.
pub fn require_tva(tva: f64) -> Result<f64> {
    if !tva.is_finite() || !(0.0..=100.0).contains(&tva) {
        return Err(Error::InvalidAmount { amount: tva });
    }
    Ok(tva)
}
