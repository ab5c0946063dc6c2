//! Stage 5 — the financial reconciler: extracting labeled subtotal,
//! discount, tax, shipping and grand-total amounts from the full transcript
//! and closing the arithmetic identity
//! `grand_total = subtotal - discount_total + tax_total + shipping_total`.

use std::sync::OnceLock;

use receiptor_core::{Correction, CorrectionKind, Money, TOLERANCE};
use regex::Regex;
use rust_decimal::Decimal;

/// The shared labeled-amount shape: an optional parenthesis/minus sign (for
/// a negative discount), an optional currency symbol, comma-thousands
/// grouping, and exactly two fractional digits. Every label regex below
/// captures one of these as its amount group.
const PRICE_PATTERN: &str = r"\(?-?\$?\d{1,5}(?:,\d{3})*\.\d{2}\)?";

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(
    re_subtotal,
    &format!(r"(?i)\bsub[\s-]?total\b[^0-9$(]*({PRICE_PATTERN})")
);
re!(
    re_tax,
    &format!(r"(?i)\b(?:tax|gst|pst|hst|qst|vat)\b[^0-9$(]*({PRICE_PATTERN})")
);
re!(
    re_shipping,
    &format!(r"(?i)\b(?:shipping|delivery|handling|service fee)\b[^0-9$(]*({PRICE_PATTERN})")
);
re!(
    re_discount,
    &format!(r"(?i)\b(?:discount|coupon|savings|loyalty|member)\b[^0-9$(-]*({PRICE_PATTERN})")
);
re!(
    re_grand_total,
    &format!(r"(?i)\b(?:grand total|amount due|balance due|total to pay|total)\b[^0-9$(]*({PRICE_PATTERN})")
);

/// Every labeled financial amount the scan could find, plus whatever
/// corrections the reconciliation algorithm had to record to close the
/// books.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub subtotal: Money,
    pub discount_total: Money,
    pub tax_total: Money,
    pub shipping_total: Money,
    pub grand_total: Money,
    pub corrections: Vec<Correction>,
}

/// Parses a labeled-amount capture, honoring a leading minus sign or
/// parenthesized amount as "negative" (used by the discount label).
fn parse_signed(token: &str) -> Option<Decimal> {
    let parenthesized = token.starts_with('(') && token.ends_with(')');
    let inner = token.trim_matches(['(', ')']);
    let money = Money::parse_price(inner)?;
    Some(if parenthesized || inner.starts_with('-') {
        -money.as_decimal()
    } else {
        money.as_decimal()
    })
}

fn find_first(re: &Regex, text: &str) -> Option<Decimal> {
    re.captures(text).and_then(|c| parse_signed(&c[1]))
}

/// Spec §4.5 step 6: estimate tax at a flat 10% of the post-discount
/// subtotal, recording the `default_rate` context so a caller can see the
/// value was guessed rather than read off the receipt.
fn estimate_default_rate_tax(subtotal: Money, discount: Money, corrections: &mut Vec<Correction>) -> Money {
    let estimated = Money::new(subtotal.saturating_sub(discount).as_decimal() * Decimal::new(10, 2));
    corrections.push(Correction::new(
        CorrectionKind::TaxEstimated,
        receiptor_core::CorrectionValue::None,
        estimated,
        "default_rate",
    ));
    estimated
}

fn find_last(re: &Regex, text: &str) -> Option<Decimal> {
    re.captures_iter(text)
        .filter_map(|c| parse_signed(&c[1]))
        .last()
}

/// Scans the full (denoised) transcript for labeled subtotal/tax/shipping/
/// discount/grand-total amounts, then runs the six-step reconciliation
/// algorithm from spec §4.5 to close the arithmetic identity. `item_sum` is
/// `Σ line_total` over the already-extracted line items.
pub fn reconcile(transcript: &str, item_sum: Money) -> Reconciliation {
    let labeled_subtotal = find_first(re_subtotal(), transcript).map(Money::new);
    let labeled_tax = find_first(re_tax(), transcript).map(Money::new);
    let labeled_shipping = find_first(re_shipping(), transcript).map(Money::new);
    let labeled_grand = find_last(re_grand_total(), transcript).map(Money::new);

    let mut corrections = Vec::new();

    // Discount magnitude is always stored positive; a raw token written
    // without a leading minus or parens (e.g. "Discount 5.00" rather than
    // "Discount -5.00") still means a subtraction, so its sign is normalized
    // and the fix recorded.
    let labeled_discount = find_first(re_discount(), transcript).map(|raw| {
        if raw.is_sign_negative() {
            Money::new(raw.abs())
        } else {
            let magnitude = Money::new(raw);
            corrections.push(Correction::new(
                CorrectionKind::DiscountSignFixed,
                magnitude,
                magnitude,
                "discount",
            ));
            magnitude
        }
    });

    let discount = labeled_discount.unwrap_or(Money::ZERO);
    let shipping = labeled_shipping.unwrap_or(Money::ZERO);

    let mut subtotal = labeled_subtotal;
    let mut tax = labeled_tax;
    let mut grand = labeled_grand;

    // Step 1: if all four are known and the identity already closes, accept
    // as-is — nothing to reconcile.
    let all_known_and_closed = match (subtotal, tax, grand) {
        (Some(s), Some(t), Some(g)) => {
            let implied = s.saturating_sub(discount) + t + shipping;
            implied.approx_eq(g, TOLERANCE)
        }
        _ => false,
    };

    if !all_known_and_closed {
        // Step 2: missing subtotal, derive from item sum.
        if subtotal.is_none() && !item_sum.is_zero() {
            corrections.push(Correction::new(
                CorrectionKind::SubtotalRecomputed,
                receiptor_core::CorrectionValue::None,
                item_sum,
                "subtotal",
            ));
            subtotal = Some(item_sum);
        }

        // Step 3: grand total and subtotal both known but disagree — trust
        // the grand total (customer-facing number) and close the gap on tax,
        // unless tax was itself labeled explicitly, in which case adjust
        // subtotal instead.
        if let (Some(s), Some(g)) = (subtotal, grand) {
            let implied = s.saturating_sub(discount) + tax.unwrap_or(Money::ZERO) + shipping;
            if !implied.approx_eq(g, TOLERANCE) {
                if labeled_tax.is_none() {
                    let adjusted_tax = g.saturating_sub(s.saturating_sub(discount) + shipping);
                    corrections.push(Correction::new(
                        CorrectionKind::TaxEstimated,
                        tax.unwrap_or(Money::ZERO),
                        adjusted_tax,
                        "tax",
                    ));
                    tax = Some(adjusted_tax);
                } else {
                    let adjusted_subtotal =
                        (g - tax.unwrap_or(Money::ZERO) - shipping) + discount;
                    corrections.push(Correction::new(
                        CorrectionKind::SubtotalRecomputed,
                        s,
                        adjusted_subtotal,
                        "subtotal",
                    ));
                    subtotal = Some(adjusted_subtotal);
                }
            }
        }

        // Step 4: grand total still missing — derive it.
        if grand.is_none() {
            let s = subtotal.unwrap_or(Money::ZERO);
            let t = tax.unwrap_or(Money::ZERO);
            let derived = s.saturating_sub(discount) + t + shipping;
            corrections.push(Correction::new(
                CorrectionKind::TotalRecomputed,
                receiptor_core::CorrectionValue::None,
                derived,
                "grand_total",
            ));
            grand = Some(derived);
        }

        // Step 5: tax still missing, but subtotal and grand total both
        // known — solve for it.
        if tax.is_none() {
            if let (Some(s), Some(g)) = (subtotal, grand) {
                let solved = g.saturating_sub(s.saturating_sub(discount).saturating_sub(shipping));
                tax = Some(solved);
            }
        }

        // Step 6: tax still missing and subtotal known but grand_total is
        // not — estimate at the default 10% rate. Under the strict
        // sequential reading above, step 4 always resolves grand_total
        // before this point is reached, so in practice step 5's formula
        // settles tax first (to 0 when nothing else pins it down — see
        // seed scenario 1). This branch is kept as the literal fallback
        // spec.md §4.5 describes, for the degenerate case where subtotal
        // is known but no grand_total could be derived at all.
        if tax.is_none() {
            if let Some(s) = subtotal {
                tax = Some(estimate_default_rate_tax(s, discount, &mut corrections));
            }
        }
    }

    let subtotal = subtotal.unwrap_or(Money::ZERO);
    let tax = tax.unwrap_or(Money::ZERO);
    let grand = grand.unwrap_or_else(|| subtotal.saturating_sub(discount) + tax + shipping);

    // Sanity clamp: an implausibly high implicit tax rate is flagged but
    // never auto-corrected — some jurisdictions really do tax this heavily.
    let taxable_base = subtotal.saturating_sub(discount);
    let ratio = tax.ratio(taxable_base, Decimal::new(1, 2));
    if ratio > Decimal::new(20, 2) {
        corrections.push(Correction::new(
            CorrectionKind::TaxSuspicious,
            receiptor_core::CorrectionValue::None,
            tax,
            "tax",
        ));
    }

    Reconciliation {
        subtotal,
        discount_total: discount,
        tax_total: tax,
        shipping_total: shipping,
        grand_total: grand,
        corrections,
    }
}
