//! End-to-end tests against the public `interpret` entry point — one full
//! transcript in, one reconciled `Receipt` out. Complements the per-stage
//! unit tests colocated in each module with full-pipeline fixtures closer to
//! a real OCR transcript.

use chrono::NaiveDate;
use receiptor_core::{CorrectionKind, Money};
use receiptor_interpreter::{default_categorizer, interpret, LocaleHint, MerchantTable};
use rust_decimal_macros::dec;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 28).unwrap()
}

fn run(transcript: &str) -> receiptor_core::Receipt {
    interpret(
        transcript,
        today(),
        LocaleHint::None,
        &MerchantTable::default_table(),
        default_categorizer,
    )
}

#[test]
fn weight_priced_grocery_with_loyalty_discount_balances() {
    let transcript = "WHOLE FOODS MARKET\n\
        0.778kg NET @ $5.99/kg BANANA CAVENDISH $1.32\n\
        Milk 3.99\n\
        Bread 2.49\n\
        Eggs 4.50\n\
        Cheese 5.25\n\
        Yogurt 3.75\n\
        Juice 2.61\n\
        Butter 2.00\n\
        Rice 2.00\n\
        Beans 2.00\n\
        Pasta 2.00\n\
        Sauce 7.29\n\
        Subtotal $39.20\n\
        Loyalty -$15.00";
    let r = run(transcript);

    assert_eq!(r.merchant, "Whole Foods Market");
    assert_eq!(r.items.len(), 12);
    assert!(r.items.iter().any(|i| i.name == "BANANA CAVENDISH" && i.line_total == Money::new(dec!(1.32))));
    assert_eq!(r.subtotal, Money::new(dec!(39.20)));
    assert_eq!(r.discount_total, Money::new(dec!(15.00)));
    assert_eq!(r.tax_total, Money::ZERO);
    assert_eq!(r.grand_total, Money::new(dec!(24.20)));
    assert!(r.corrections.iter().any(|c| c.kind == CorrectionKind::TotalRecomputed));
    assert!(r.check_invariants().is_empty());
}

#[test]
fn fast_food_receipt_has_no_corrections() {
    let transcript = "MCDONALD'S\n\
        4 Cheese Burger 5.99 23.96\n\
        2 Soda 2.49 4.98\n\
        1 Fries 3.49 3.49\n\
        Subtotal 31.43\n\
        Tax 2.59\n\
        Total 34.02";
    let r = run(transcript);

    assert_eq!(r.merchant, "McDonald's");
    assert_eq!(r.items.len(), 3);
    assert_eq!(r.subtotal, Money::new(dec!(31.43)));
    assert_eq!(r.tax_total, Money::new(dec!(2.59)));
    assert_eq!(r.grand_total, Money::new(dec!(34.02)));
    assert!(r.corrections.is_empty());
    assert!(r.check_invariants().is_empty());
}

#[test]
fn mismatched_line_math_trusts_printed_line_total() {
    let r = run("JOE'S DINER\n4 Burger 5.99 23.99\nTotal 23.99");
    assert_eq!(r.items.len(), 1);
    assert_eq!(r.items[0].quantity, 4);
    assert_eq!(r.items[0].unit_price, Money::new(dec!(6.00)));
    assert_eq!(r.items[0].line_total, Money::new(dec!(23.99)));
    assert!(r.corrections.iter().any(|c| c.kind == CorrectionKind::ItemMathMismatch));
}

#[test]
fn missing_subtotal_present_tax_and_total_resolves_deterministically() {
    let r = run("CORNER STORE\nMilk 3.99\nBread 2.49\nTax 0.52\nTotal 6.00");
    assert_eq!(r.items.len(), 2);
    assert_eq!(r.subtotal, Money::new(dec!(5.48)));
    assert_eq!(r.tax_total, Money::new(dec!(0.52)));
    assert_eq!(r.grand_total, Money::new(dec!(6.00)));
    assert!(r.check_invariants().is_empty());
}

#[test]
fn unknown_merchant_with_clean_items_flags_low_confidence() {
    let transcript = "JOE'S CORNER SHOP\nMilk 3.99\nBread 2.49\nEggs 4.50\nTotal 10.98";
    let r = run(transcript);
    assert_eq!(r.merchant, "Unknown Store");
    assert_eq!(r.merchant_confidence, 0.0);
    assert!(r.corrections.iter().any(|c| c.kind == CorrectionKind::MerchantLowConfidence));
    assert_eq!(r.items.len(), 3);
}

#[test]
fn empty_transcript_yields_empty_receipt() {
    let r = run("");
    assert!(r.items.is_empty());
    assert_eq!(r.subtotal, Money::ZERO);
    assert_eq!(r.discount_total, Money::ZERO);
    assert_eq!(r.tax_total, Money::ZERO);
    assert_eq!(r.shipping_total, Money::ZERO);
    assert_eq!(r.grand_total, Money::ZERO);
    assert_eq!(r.merchant, "Unknown Store");
    assert!(r.ocr_parsed);
    assert!(r.check_invariants().is_empty());
}

#[test]
fn promotional_text_only_yields_empty_items() {
    let r = run("BIGGEST SALE OF THE YEAR\nEVERYTHING MUST GO\nSEE STORE FOR DETAILS");
    assert!(r.items.is_empty());
}

#[test]
fn comma_thousands_price_round_trips() {
    let r = run("BEST BUY\nTelevision 1,234.56\nTotal 1,234.56");
    assert_eq!(r.items.len(), 1);
    assert_eq!(r.items[0].unit_price, Money::new(dec!(1234.56)));
    assert_eq!(r.items[0].line_total, Money::new(dec!(1234.56)));
}

#[test]
fn price_wrapped_across_two_lines_is_fused() {
    let r = run("GADGET SHOP\nExpensive Gadget 10\n.99\nTotal 10.99");
    assert_eq!(r.items.len(), 1);
    assert_eq!(r.items[0].unit_price, Money::new(dec!(10.99)));
}

#[test]
fn pipeline_never_panics_across_a_corpus_of_odd_inputs() {
    let inputs = [
        "",
        "\n\n\n",
        "$$$ ---- 99999",
        "100 x Item -1.00",
        "Total Total Total 5.00 5.00 5.00",
        "0.001kg NET @ $0.00/kg Mystery $0.00",
        ".99\n10",
    ];
    for input in inputs {
        let r = run(input);
        assert!(r.ocr_parsed);
    }
}

#[test]
fn reconciliation_is_a_fixed_point_when_rerun_on_its_own_summary() {
    let transcript = "TARGET\n2 Widget 3.00 6.00\nSubtotal 6.00\nTax 0.60\nTotal 6.60";
    let first = run(transcript);

    let replay = format!(
        "TARGET\n2 Widget 3.00 6.00\nSubtotal {}\nTax {}\nTotal {}",
        first.subtotal, first.tax_total, first.grand_total
    );
    let second = run(&replay);

    assert_eq!(first.subtotal, second.subtotal);
    assert_eq!(first.tax_total, second.tax_total);
    assert_eq!(first.grand_total, second.grand_total);
    assert_eq!(first.items.len(), second.items.len());
}
