use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A non-negative-by-convention decimal amount, always rounded to 2 fractional
/// digits. Every monetary field on [`crate::receipt::Receipt`] and
/// [`crate::receipt::LineItem`] is a `Money`.
///
/// Reconciliation tolerances (spec: ±0.02) must never be checked in binary
/// floating point — `Decimal` carries exact base-10 fractions, so `0.10 + 0.20`
/// really is `0.30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Rounds to 2 decimal places (half-up, matching printed receipt totals).
    pub fn new(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    /// Parses a price token as it appears on a receipt: optional leading
    /// currency symbol, optional comma thousands separators, exactly two
    /// fractional digits (per spec: `\d{1,5}(,\d{3})*\.\d{2}`).
    pub fn parse_price(token: &str) -> Option<Self> {
        let cleaned: String = token
            .trim()
            .trim_start_matches(['$', '€', '£', '¥'])
            .chars()
            .filter(|c| *c != ',')
            .collect();
        Decimal::from_str(cleaned.trim()).ok().map(Money::new)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn clamp(self, min: Money, max: Money) -> Self {
        Money(self.0.clamp(min.0, max.0))
    }

    /// Subtraction that never goes below zero — used where the spec requires
    /// a non-negative result regardless of operand ordering (e.g. discount
    /// application).
    pub fn saturating_sub(self, rhs: Money) -> Self {
        if rhs.0 > self.0 {
            Money::ZERO
        } else {
            Money(self.0 - rhs.0)
        }
    }

    pub fn approx_eq(self, other: Money, tolerance: Decimal) -> bool {
        (self.0 - other.0).abs() <= tolerance
    }

    /// Ratio of `self` to `denominator`, with `denominator` floored at `floor`
    /// to avoid division by (near-)zero — mirrors spec's `max(subtotal -
    /// discount, epsilon)` construction for implicit tax-rate checks.
    pub fn ratio(self, denominator: Money, floor: Decimal) -> Decimal {
        let denom = denominator.0.max(floor);
        self.0 / denom
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Self) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Self) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_price_plain() {
        assert_eq!(Money::parse_price("49.99"), Some(Money::new(dec!(49.99))));
    }

    #[test]
    fn parse_price_with_comma_thousands() {
        assert_eq!(Money::parse_price("1,234.56"), Some(Money::new(dec!(1234.56))));
    }

    #[test]
    fn parse_price_with_currency_symbol() {
        assert_eq!(Money::parse_price("$5.00"), Some(Money::new(dec!(5.00))));
    }

    #[test]
    fn parse_price_rejects_garbage() {
        assert_eq!(Money::parse_price("NET"), None);
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        let a = Money::new(dec!(5.00));
        let b = Money::new(dec!(15.00));
        assert_eq!(a.saturating_sub(b), Money::ZERO);
    }

    #[test]
    fn approx_eq_within_tolerance() {
        let a = Money::new(dec!(10.00));
        let b = Money::new(dec!(10.01));
        assert!(a.approx_eq(b, dec!(0.02)));
        assert!(!a.approx_eq(b, dec!(0.005)));
    }

    #[test]
    fn display_always_two_fractional_digits() {
        assert_eq!(Money::new(dec!(5)).to_string(), "5.00");
    }
}
