use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Tolerance used throughout reconciliation and invariant checking. Not
/// floating-point slack — this is the real-world rounding tolerance of a
/// printed receipt.
pub const TOLERANCE: Decimal = Decimal::from_parts(2, 0, 0, false, 2); // 0.02

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Credit,
    Debit,
    Unknown,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Unknown
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Credit => write!(f, "credit"),
            PaymentMethod::Debit => write!(f, "debit"),
            PaymentMethod::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Restaurant,
    Pharmacy,
    Retail,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Groceries => write!(f, "groceries"),
            Category::Restaurant => write!(f, "restaurant"),
            Category::Pharmacy => write!(f, "pharmacy"),
            Category::Retail => write!(f, "retail"),
            Category::Other => write!(f, "other"),
        }
    }
}

/// The complete taxonomy of automated fixes the pipeline may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    MerchantLowConfidence,
    DateFallback,
    ItemMathMismatch,
    WeightPrefixStripped,
    NegativePriceZeroed,
    PriceSuspicious,
    QuantityNonNumeric,
    QuantityCapped,
    SubtotalRecomputed,
    TotalRecomputed,
    TaxEstimated,
    TaxSuspicious,
    DiscountSignFixed,
    LineDiscardedNonItem,
}

/// Before/after payload for a [`Correction`]. A closed sum type rather than a
/// dynamically-typed slot, so callers can match exhaustively instead of
/// downcasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectionValue {
    Amount(Money),
    Quantity(i64),
    Text(String),
    None,
}

impl From<Money> for CorrectionValue {
    fn from(m: Money) -> Self {
        CorrectionValue::Amount(m)
    }
}

impl From<i64> for CorrectionValue {
    fn from(q: i64) -> Self {
        CorrectionValue::Quantity(q)
    }
}

impl From<&str> for CorrectionValue {
    fn from(s: &str) -> Self {
        CorrectionValue::Text(s.to_string())
    }
}

impl From<String> for CorrectionValue {
    fn from(s: String) -> Self {
        CorrectionValue::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub kind: CorrectionKind,
    pub before: CorrectionValue,
    pub after: CorrectionValue,
    /// Short human-facing locator: a line number or field name.
    pub context: String,
}

impl Correction {
    pub fn new(
        kind: CorrectionKind,
        before: impl Into<CorrectionValue>,
        after: impl Into<CorrectionValue>,
        context: impl Into<String>,
    ) -> Self {
        Correction {
            kind,
            before: before.into(),
            after: after.into(),
            context: context.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub merchant: String,
    pub merchant_confidence: f32,
    pub date: NaiveDate,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub tax_total: Money,
    pub shipping_total: Money,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    pub corrections: Vec<Correction>,
    /// Always true for this pipeline — distinguishes the output from any
    /// record produced by an external (e.g. vision-LLM) parser.
    pub ocr_parsed: bool,
}

/// One of the universal invariants a reconciled receipt must satisfy, found
/// to be violated. `check_invariants` is used both by tests and by the
/// validator's final self-check; `TaxRatioHigh` is informational only — a
/// high tax ratio is recorded as a `tax_suspicious` correction, not
/// auto-fixed.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    ItemSumMismatch { sum: Money, subtotal: Money, tolerance: Decimal },
    GrandTotalMismatch { implied: Money, grand_total: Money },
    QuantityOutOfRange { index: usize, quantity: u32 },
    NegativeUnitPrice { index: usize },
    NegativeLineTotal { index: usize },
    TaxRatioHigh { ratio: Decimal },
    EmptyMerchant,
}

impl Receipt {
    /// Checks all universal invariants and returns every violation found. An
    /// empty vec means the record is fully reconciled.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let item_sum: Money = self.items.iter().map(|i| i.line_total).sum();
        let item_tolerance = TOLERANCE * Decimal::from(self.items.len().max(1));
        if !item_sum.approx_eq(self.subtotal, item_tolerance) {
            violations.push(InvariantViolation::ItemSumMismatch {
                sum: item_sum,
                subtotal: self.subtotal,
                tolerance: item_tolerance,
            });
        }

        let implied = (self.subtotal.saturating_sub(self.discount_total))
            + self.tax_total
            + self.shipping_total;
        if !implied.approx_eq(self.grand_total, TOLERANCE) {
            violations.push(InvariantViolation::GrandTotalMismatch {
                implied,
                grand_total: self.grand_total,
            });
        }

        for (index, item) in self.items.iter().enumerate() {
            if item.quantity < 1 || item.quantity > 100 {
                violations.push(InvariantViolation::QuantityOutOfRange {
                    index,
                    quantity: item.quantity,
                });
            }
            if item.unit_price.is_negative() {
                violations.push(InvariantViolation::NegativeUnitPrice { index });
            }
            if item.line_total.is_negative() {
                violations.push(InvariantViolation::NegativeLineTotal { index });
            }
        }

        let taxable_base = self.subtotal.saturating_sub(self.discount_total);
        let ratio = self.tax_total.ratio(taxable_base, Decimal::new(1, 2));
        if ratio > Decimal::new(20, 2) {
            violations.push(InvariantViolation::TaxRatioHigh { ratio });
        }

        if self.merchant.trim().is_empty() {
            violations.push(InvariantViolation::EmptyMerchant);
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(name: &str, qty: u32, price: Decimal) -> LineItem {
        LineItem {
            name: name.to_string(),
            quantity: qty,
            unit_price: Money::new(price),
            line_total: Money::new(price * Decimal::from(qty)),
            category: Category::Other,
        }
    }

    fn base_receipt() -> Receipt {
        Receipt {
            merchant: "Test Store".to_string(),
            merchant_confidence: 0.9,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            items: vec![item("Milk", 1, dec!(3.99))],
            subtotal: Money::new(dec!(3.99)),
            discount_total: Money::ZERO,
            tax_total: Money::ZERO,
            shipping_total: Money::ZERO,
            grand_total: Money::new(dec!(3.99)),
            payment_method: PaymentMethod::Unknown,
            corrections: vec![],
            ocr_parsed: true,
        }
    }

    #[test]
    fn balanced_receipt_has_no_violations() {
        assert!(base_receipt().check_invariants().is_empty());
    }

    #[test]
    fn item_sum_mismatch_detected() {
        let mut r = base_receipt();
        r.subtotal = Money::new(dec!(10.00));
        let v = r.check_invariants();
        assert!(matches!(v[0], InvariantViolation::ItemSumMismatch { .. }));
    }

    #[test]
    fn grand_total_mismatch_detected() {
        let mut r = base_receipt();
        r.grand_total = Money::new(dec!(99.00));
        assert!(r
            .check_invariants()
            .iter()
            .any(|v| matches!(v, InvariantViolation::GrandTotalMismatch { .. })));
    }

    #[test]
    fn quantity_out_of_range_detected() {
        let mut r = base_receipt();
        r.items[0].quantity = 0;
        assert!(r
            .check_invariants()
            .iter()
            .any(|v| matches!(v, InvariantViolation::QuantityOutOfRange { .. })));
    }

    #[test]
    fn empty_merchant_detected() {
        let mut r = base_receipt();
        r.merchant = "   ".to_string();
        assert!(r
            .check_invariants()
            .iter()
            .any(|v| matches!(v, InvariantViolation::EmptyMerchant)));
    }

    #[test]
    fn high_tax_ratio_flagged() {
        let mut r = base_receipt();
        r.tax_total = Money::new(dec!(2.00));
        r.grand_total = Money::new(dec!(5.99));
        assert!(r
            .check_invariants()
            .iter()
            .any(|v| matches!(v, InvariantViolation::TaxRatioHigh { .. })));
    }
}
