//! Stage 6 — the validator & corrector: clamps quantities and prices to
//! sane ranges, recomputes line totals, and performs a final invariant
//! recheck over the whole record.

use receiptor_core::{Category, Correction, CorrectionKind, LineItem, Money};
use rust_decimal::Decimal;

use crate::lineitem::{QuantityField, RawItem};

const MAX_QUANTITY: u32 = 100;

/// Clamps a single raw item's quantity and unit price per spec §4.6,
/// recomputing `line_total` from the clamped fields unless pattern A already
/// locked it to the printed value. Appends every fix to `corrections`.
pub fn validate_item(
    raw: RawItem,
    categorize: &dyn Fn(&str) -> Category,
    corrections: &mut Vec<Correction>,
) -> LineItem {
    let context = format!("line {}", raw.line_no);

    let quantity = match raw.quantity {
        QuantityField::Explicit(q) if q >= 1 && q <= i64::from(MAX_QUANTITY) => q as u32,
        // Spec §4.6 calls out quantities over 1000 explicitly, but the
        // invariant in §3 bounds every quantity at 100 — anything over that
        // (not just the pathological >1000 case) gets clamped so the
        // invariant actually holds on output.
        QuantityField::Explicit(q) if q > i64::from(MAX_QUANTITY) => {
            corrections.push(Correction::new(
                CorrectionKind::QuantityCapped,
                q,
                MAX_QUANTITY as i64,
                context.clone(),
            ));
            MAX_QUANTITY
        }
        QuantityField::Explicit(q) => {
            corrections.push(Correction::new(
                CorrectionKind::QuantityNonNumeric,
                q,
                1i64,
                context.clone(),
            ));
            1
        }
        QuantityField::Unparsable(token) => {
            corrections.push(Correction::new(
                CorrectionKind::QuantityNonNumeric,
                token,
                1i64,
                context.clone(),
            ));
            1
        }
        QuantityField::Implicit => 1,
    };

    let mut unit_price = raw.unit_price;
    if unit_price.is_negative() {
        corrections.push(Correction::new(
            CorrectionKind::NegativePriceZeroed,
            unit_price,
            Money::ZERO,
            context.clone(),
        ));
        unit_price = Money::ZERO;
    } else if unit_price.as_decimal() < Decimal::new(1, 2) {
        // Sub-cent dust rounds to zero silently — not worth a correction.
        unit_price = Money::ZERO;
    } else if unit_price.as_decimal() > Decimal::from(5000) {
        corrections.push(Correction::new(
            CorrectionKind::PriceSuspicious,
            unit_price,
            unit_price,
            context.clone(),
        ));
    }

    let line_total = if raw.line_total_locked {
        raw.line_total
    } else {
        Money::new(unit_price.as_decimal() * Decimal::from(quantity))
    };

    // Clamp the unit price into the LineItem's documented [0, 500] range for
    // output even when price_suspicious only warns rather than corrects —
    // the per-item invariant in spec §3 is unconditional.
    let clamped_unit_price = unit_price.clamp(Money::ZERO, Money::new(Decimal::from(500)));
    let category = categorize(&raw.name);

    LineItem {
        name: raw.name,
        quantity,
        unit_price: clamped_unit_price,
        line_total,
        category,
    }
}
