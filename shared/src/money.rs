//! Money formatting using rust_decimal for precision
//!
//! Amounts are rounded to 2 decimal places, half away from zero, and only at
//! the point of display.

use rust_decimal::prelude::*;

/// Rounding precision for monetary values
const DECIMAL_PLACES: u32 = 2;

/// Round to cents (half away from zero)
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total: unit price times quantity, rounded after the multiplication
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// `$12.50` style rendering with exactly two decimals
pub fn format_money(value: Decimal) -> String {
    let mut rounded = round_money(value);
    rounded.rescale(DECIMAL_PLACES);
    format!("${}", rounded)
}
