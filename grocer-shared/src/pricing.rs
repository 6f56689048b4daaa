//! Discount and currency arithmetic
//!
//! Prices are stored in major units (rupees) as decimals. The discount on a
//! product is an integer percentage, and the amount taken off is rounded up
//! to a whole major unit:
//!
//! ```text
//! discounted = price - ceil(price * discount / 100)
//! ```
//!
//! The payment gateway expects integer minor units (paise), see [`to_minor_units`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Largest accepted discount percentage
pub const MAX_DISCOUNT: i32 = 100;

/// Returns the price after applying `discount_percent`
///
/// Discounts outside `0..=100` are clamped; the result is never negative.
///
/// # Example
///
/// ```
/// use grocer_shared::pricing::discounted_price;
/// use rust_decimal::Decimal;
///
/// // 10% of 95 is 9.5, rounded up to 10
/// assert_eq!(discounted_price(Decimal::from(95), 10), Decimal::from(85));
/// ```
pub fn discounted_price(price: Decimal, discount_percent: i32) -> Decimal {
    let discount = Decimal::from(discount_percent.clamp(0, MAX_DISCOUNT));
    let off = (price * discount / Decimal::ONE_HUNDRED).ceil();

    (price - off).max(Decimal::ZERO)
}

/// Converts a major-unit amount to integer minor units (`round(amount * 100)`)
///
/// Returns `None` if the amount does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Converts integer minor units back to a major-unit amount
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// One priced line used for totals
#[derive(Debug, Clone, Copy)]
pub struct PricedLine {
    /// Unit list price
    pub price: Decimal,

    /// Discount percentage
    pub discount: i32,

    /// Quantity
    pub quantity: i32,
}

impl PricedLine {
    /// Discounted unit price
    pub fn unit_price(&self) -> Decimal {
        discounted_price(self.price, self.discount)
    }

    /// Undiscounted line amount
    pub fn sub_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Discounted line amount
    pub fn total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }
}

/// Totals over a set of cart lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Sum of quantities
    pub quantity: i64,

    /// Sum before discounts
    pub sub_total: Decimal,

    /// Sum after discounts
    pub total: Decimal,
}

impl CartTotals {
    /// Computes totals over the given lines
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = PricedLine>,
    {
        lines.into_iter().fold(
            CartTotals {
                quantity: 0,
                sub_total: Decimal::ZERO,
                total: Decimal::ZERO,
            },
            |acc, line| CartTotals {
                quantity: acc.quantity + i64::from(line.quantity),
                sub_total: acc.sub_total + line.sub_total(),
                total: acc.total + line.total(),
            },
        )
    }
}
