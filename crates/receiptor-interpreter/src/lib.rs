pub mod categorize;
pub mod date_extract;
pub mod denoise;
pub mod financial;
pub mod lineitem;
pub mod merchant;
pub mod payment;
pub mod pipeline;
pub mod validate;

pub use categorize::default_categorizer;
pub use date_extract::{extract_date, LocaleHint};
pub use denoise::denoise;
pub use financial::{reconcile, Reconciliation};
pub use lineitem::{extract_line_items, LineItemExtraction, QuantityField, RawItem};
pub use merchant::{MerchantPattern, MerchantResolution, MerchantTable, MerchantTableError};
pub use payment::detect_payment_method;
pub use pipeline::interpret;
pub use validate::validate_item;
