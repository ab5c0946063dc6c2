//! The top-level `interpret` entry point — wires the five stages plus the
//! validator into the single deterministic pipeline spec.md §2 describes:
//! `Denoising → MerchantResolving → DateExtracting → ItemExtracting →
//! Reconciling → Validating → Done`. Never fails; always returns a
//! [`Receipt`].

use chrono::NaiveDate;
use receiptor_core::{Category, Correction, CorrectionKind, CorrectionValue, Money, Receipt};
use tracing::debug;

use crate::date_extract::{self, LocaleHint};
use crate::denoise::denoise;
use crate::financial::reconcile;
use crate::lineitem::extract_line_items;
use crate::merchant::MerchantTable;
use crate::payment::detect_payment_method;
use crate::validate::validate_item;

const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Runs the full receipt-text interpretation pipeline over `transcript`.
///
/// `today` is the fallback purchase date used when none can be located.
/// `locale_hint` biases the ambiguous `NN/NN/YYYY` date form. `merchant_table`
/// is the (caller-owned, read-only) pattern table used for merchant
/// resolution. `categorize` is the caller-supplied pure function mapping a
/// cleaned item name to a [`Category`] — see [`crate::categorize::default_categorizer`]
/// for a reference implementation.
pub fn interpret(
    transcript: &str,
    today: NaiveDate,
    locale_hint: LocaleHint,
    merchant_table: &MerchantTable,
    categorize: impl Fn(&str) -> Category,
) -> Receipt {
    let denoised = denoise(transcript);
    debug!(input_len = transcript.len(), denoised_len = denoised.len(), "denoised transcript");

    let mut corrections = Vec::new();

    let merchant_resolution = merchant_table.resolve(&denoised);
    debug!(merchant = %merchant_resolution.name, confidence = merchant_resolution.confidence, "merchant resolved");
    if merchant_resolution.confidence < LOW_CONFIDENCE_THRESHOLD {
        corrections.push(Correction::new(
            CorrectionKind::MerchantLowConfidence,
            CorrectionValue::None,
            merchant_resolution.name.clone(),
            "merchant",
        ));
    }

    let date = date_extract::extract_date(&denoised, today, locale_hint);
    debug!(%date, "date extracted");

    let extraction = extract_line_items(&denoised);
    debug!(item_count = extraction.items.len(), "line items extracted");
    corrections.extend(extraction.corrections);

    let item_sum: Money = extraction.items.iter().map(|i| i.line_total).sum();

    let reconciliation = reconcile(&denoised, item_sum);
    for c in &reconciliation.corrections {
        if matches!(c.kind, CorrectionKind::TaxSuspicious | CorrectionKind::PriceSuspicious) {
            tracing::warn!(kind = ?c.kind, context = %c.context, "suspicious amount flagged");
        }
    }
    corrections.extend(reconciliation.corrections);

    let payment_method = detect_payment_method(&denoised);

    let mut items = Vec::with_capacity(extraction.items.len());
    for raw in extraction.items {
        items.push(validate_item(raw, &categorize, &mut corrections));
    }
    let item_sum_after_validation: Money = items.iter().map(|i| i.line_total).sum();

    let mut receipt = Receipt {
        merchant: merchant_resolution.name,
        merchant_confidence: merchant_resolution.confidence,
        date,
        items,
        subtotal: reconciliation.subtotal,
        discount_total: reconciliation.discount_total,
        tax_total: reconciliation.tax_total,
        shipping_total: reconciliation.shipping_total,
        grand_total: reconciliation.grand_total,
        payment_method,
        corrections,
        ocr_parsed: true,
    };

    absorb_validator_drift(&mut receipt, item_sum, item_sum_after_validation);

    debug!(
        items = receipt.items.len(),
        subtotal = %receipt.subtotal,
        grand_total = %receipt.grand_total,
        corrections = receipt.corrections.len(),
        "pipeline complete"
    );

    receipt
}

/// Validator clamping (capped quantities, zeroed/clamped prices) can shift
/// item line totals *after* the financial reconciler already settled on a
/// `subtotal` — including cases where the reconciler deliberately chose a
/// subtotal that diverges from the raw item sum (§4.5 step 3). Only the
/// delta the validator itself introduced belongs here; re-diffing the whole
/// subtotal against the item sum would stomp on that deliberate choice.
fn absorb_validator_drift(receipt: &mut Receipt, pre_validation_sum: Money, post_validation_sum: Money) {
    if pre_validation_sum.approx_eq(post_validation_sum, receiptor_core::TOLERANCE) {
        return;
    }
    let delta = post_validation_sum.as_decimal() - pre_validation_sum.as_decimal();
    let adjusted = Money::new(receipt.subtotal.as_decimal() + delta);
    receipt.corrections.push(Correction::new(
        CorrectionKind::SubtotalRecomputed,
        receipt.subtotal,
        adjusted,
        "subtotal (post-validation clamping)",
    ));
    receipt.subtotal = adjusted;
}
