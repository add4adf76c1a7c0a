pub mod money;
pub mod pii;
pub mod models;

pub use money::{line_total, round_money, tax_for, DEFAULT_CURRENCY};
pub use pii::Masked;
