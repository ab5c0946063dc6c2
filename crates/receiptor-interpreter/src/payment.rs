//! Payment-method detection — an ambient addition spec.md §3 requires on
//! the `Receipt` record but does not otherwise design a stage for. Scans
//! the transcript for common tender keywords, reusing the skip-keyword
//! classification idiom from the line-item extractor.

use std::sync::OnceLock;

use receiptor_core::PaymentMethod;
use regex::Regex;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Word-boundary matches — `cash` must not fire on `cashier`, `debit` on a
// hypothetical `debiting`, and so on.
re!(
    re_credit,
    r"(?i)\b(visa|mastercard|amex|american express|discover|credit)\b"
);
re!(re_debit, r"(?i)\b(debit|eftpos|interac)\b");
re!(re_cash, r"(?i)\bcash\b");

/// Looks for the first tender keyword to appear in the transcript, in
/// priority order credit > debit > cash, falling back to `Unknown` when
/// none is present.
pub fn detect_payment_method(transcript: &str) -> PaymentMethod {
    if re_credit().is_match(transcript) {
        PaymentMethod::Credit
    } else if re_debit().is_match(transcript) {
        PaymentMethod::Debit
    } else if re_cash().is_match(transcript) {
        PaymentMethod::Cash
    } else {
        PaymentMethod::Unknown
    }
}
