pub mod money;
pub mod receipt;

pub use money::Money;
pub use receipt::{
    Category, Correction, CorrectionKind, CorrectionValue, InvariantViolation, LineItem,
    PaymentMethod, Receipt, TOLERANCE,
};
