pub mod product;
pub mod pricing;
pub mod inventory;

pub use product::ensure_sellable;
pub use pricing::{CartTotals, PricingConfig, PricingEngine};
pub use inventory::InventoryAdjuster;
